// Mock ZenseHome controller for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use zensehome::protocol::frame_end;
use zensehome::{ClientConfig, RateConfig, RetryPolicy, ZenseClient};

pub const CODE: u32 = 4711;

/// What the mock does with one request frame
pub enum Reply {
    Frame(String),
    Silent,
    Hangup,
}

impl Reply {
    pub fn frame(body: &str) -> Self {
        Reply::Frame(format!(">>{}<<", body))
    }
}

type Responder = dyn Fn(&str) -> Reply + Send + Sync;

pub struct MockController {
    pub port: u16,
    requests: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    overlaps: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockController {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let responder: Arc<Responder> = Arc::new(responder);

        let handle = {
            let requests = requests.clone();
            let connections = connections.clone();
            let overlaps = overlaps.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(
                        stream,
                        responder.clone(),
                        requests.clone(),
                        overlaps.clone(),
                    ));
                }
            })
        };

        Self {
            port,
            requests,
            connections,
            overlaps,
            handle,
        }
    }

    /// Client settings tuned for fast tests
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new("127.0.0.1", self.port, CODE)
            .with_io_timeout(Duration::from_millis(300))
            .with_settle_delay(Duration::ZERO)
            .with_rate(RateConfig {
                min_gap: Duration::ZERO,
                capacity: 1000.0,
                refill_per_sec: 1000.0,
            })
            .with_retry(RetryPolicy {
                initial_backoff: Duration::from_millis(10),
                max_backoff: Duration::from_millis(40),
                ..RetryPolicy::default()
            })
    }

    pub fn client(&self) -> ZenseClient {
        ZenseClient::new(self.config())
    }

    /// Every request frame received so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, frame: &str) -> usize {
        self.requests().iter().filter(|r| r.as_str() == frame).count()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Requests that arrived before the previous one was answered
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

impl Drop for MockController {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    responder: Arc<Responder>,
    requests: Arc<Mutex<Vec<String>>>,
    overlaps: Arc<AtomicUsize>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 256];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        while let Some(end) = frame_end(&buf) {
            let frame: Vec<u8> = buf.drain(..end).collect();
            if !buf.is_empty() {
                overlaps.fetch_add(1, Ordering::SeqCst);
            }
            let frame = String::from_utf8_lossy(&frame).into_owned();
            requests.lock().unwrap().push(frame.clone());

            match responder(&frame) {
                Reply::Frame(reply) => {
                    if stream.write_all(reply.as_bytes()).await.is_err() {
                        return;
                    }
                }
                Reply::Silent => {}
                Reply::Hangup => return,
            }
        }
    }
}

/// A well-behaved controller with devices 10, 20 and 30
pub fn healthy(frame: &str) -> Reply {
    let body = frame.trim_start_matches(">>").trim_end_matches("<<");
    if body == format!("Login {}", CODE) {
        Reply::frame("Login Ok")
    } else if body.starts_with("Login ") {
        Reply::frame("Login Failed")
    } else if body == "Logout" {
        Reply::frame("Logout Ok")
    } else if body == "Get Devices" {
        Reply::frame("Get Devices 10,20,abc,30")
    } else if let Some(id) = body.strip_prefix("Get Name ") {
        Reply::frame(&format!("Get Name 'Lamp {}'", id))
    } else if let Some(id) = body.strip_prefix("Get ") {
        Reply::frame(&format!("Get {}", id.parse::<u32>().unwrap_or(0) / 10))
    } else {
        Reply::frame(body)
    }
}
