use crate::config::ClientConfig;
use crate::error::{Result, ZenseError};
use crate::protocol::{self, Command};
use crate::rate_limit::RateLimiter;
use crate::types::SessionState;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

const READ_CHUNK: usize = 1024;

/// One open socket to the controller
struct Session {
    stream: TcpStream,
    authenticated: bool,
}

/// Low-level TCP connection handler
///
/// Owns at most one session. Any failure discards the whole session;
/// it is never repaired in place.
pub struct Connection {
    addr: String,
    io_timeout: Duration,
    settle_delay: Duration,
    limiter: RateLimiter,
    session: Option<Session>,
}

impl Connection {
    /// Create a disconnected handler for the configured controller
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            addr: config.addr(),
            io_timeout: config.io_timeout,
            settle_delay: config.settle_delay,
            limiter: RateLimiter::new(config.rate.clone()),
            session: None,
        }
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        match &self.session {
            None => SessionState::Disconnected,
            Some(s) if s.authenticated => SessionState::Authenticated,
            Some(_) => SessionState::Connected,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Open the socket, replacing any existing session
    pub async fn connect(&mut self) -> Result<()> {
        self.close().await;
        tracing::info!("Connecting to {}", self.addr);

        let stream = timeout(self.io_timeout, TcpStream::connect(self.addr.as_str()))
            .await
            .map_err(|_| ZenseError::ConnectTimeout(self.addr.clone()))?
            .map_err(|source| ZenseError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        let _ = stream.set_nodelay(true);

        self.session = Some(Session {
            stream,
            authenticated: false,
        });
        Ok(())
    }

    /// Drop the session; never fails
    pub async fn close(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        tracing::debug!("Closing connection to {}", self.addr);
        match timeout(self.io_timeout, session.stream.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Ignoring error on close: {}", e),
            Err(_) => tracing::debug!("Ignoring timeout on close"),
        }
    }

    /// Authenticate with `code`, connecting first if needed
    ///
    /// Returns `false` (with the connection closed) on any failure.
    pub async fn login(&mut self, code: u32) -> bool {
        match self.try_login(code).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Login to {} failed: {}", self.addr, e);
                self.close().await;
                false
            }
        }
    }

    async fn try_login(&mut self, code: u32) -> Result<()> {
        if self.session.is_none() {
            self.connect().await?;
        }

        let frame = self.send_and_receive(&Command::Login(code)).await?;
        if !protocol::is_login_ok(&frame) {
            return Err(ZenseError::AuthRejected);
        }

        if let Some(session) = self.session.as_mut() {
            session.authenticated = true;
        }
        tracing::info!("Logged in to {}", self.addr);

        if !self.settle_delay.is_zero() {
            sleep(self.settle_delay).await;
        }
        Ok(())
    }

    /// Rate-limited write of one command followed by one frame read
    pub async fn send_and_receive(&mut self, command: &Command) -> Result<String> {
        if self.session.is_none() {
            return Err(ZenseError::NotConnected);
        }

        self.limiter.acquire().await;

        let encoded = command.encode();
        tracing::debug!("Sending: {}", command.redacted());
        let io_timeout = self.io_timeout;
        let session = self.session.as_mut().ok_or(ZenseError::NotConnected)?;

        let written = timeout(io_timeout, async {
            session.stream.write_all(encoded.as_bytes()).await?;
            session.stream.flush().await
        })
        .await;
        self.limiter.mark_sent();
        written.map_err(|_| ZenseError::Timeout)??;

        let frame = self.receive_frame().await?;
        tracing::debug!("Received: {}", frame);
        Ok(frame)
    }

    /// Read until the first `<<` or until the peer closes
    ///
    /// Bytes after the terminator are dropped. A peer that closes without
    /// sending anything yields an empty frame.
    pub async fn receive_frame(&mut self) -> Result<String> {
        let io_timeout = self.io_timeout;
        let session = self.session.as_mut().ok_or(ZenseError::NotConnected)?;

        let mut buf = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = timeout(io_timeout, session.stream.read(&mut chunk))
                .await
                .map_err(|_| ZenseError::Timeout)??;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = protocol::frame_end(&buf) {
                buf.truncate(end);
                break;
            }
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
