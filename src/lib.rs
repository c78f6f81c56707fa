//! Rust library for controlling ZenseHome home-automation controllers
//!
//! The controller speaks a small text protocol over TCP (`>>Get 12<<`,
//! `>>Fade 12 60<<`, ...) and is easily overwhelmed. This library provides an
//! async client that:
//!
//! - Keeps one authenticated session open and re-logs in after any failure
//! - Sends strictly one command at a time, however many tasks share it
//! - Throttles outbound commands (minimum gap plus token bucket)
//! - Retries failed exchanges with exponential backoff
//! - Exposes typed operations: discover, read name and level, on/off, fade
//!
//! # Quick Start
//!
//! ```no_run
//! use zensehome::{ClientConfig, DiscoveryOrder, ZenseClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = ZenseClient::new(ClientConfig::new("192.168.1.50", 10001, 1234));
//!
//!     if !client.test_connection().await {
//!         eprintln!("controller not reachable");
//!         return;
//!     }
//!
//!     for device in client.discover(DiscoveryOrder::Ascending).await {
//!         match client.get_level(device.id).await {
//!             Some(level) => println!("{}: {}", device.name, level),
//!             None => println!("{}: unknown", device.name),
//!         }
//!     }
//!
//!     client.set_on(12).await;
//!     client.fade(14, 40).await;
//! }
//! ```
//!
//! # Errors
//!
//! Operations never return transport errors. A level of `None`, an empty
//! device list or a `false` acknowledgement means the controller could not
//! be reached after all retries; treat it as "unknown", not "off".
//!
//! # Architecture
//!
//! - **Client**: typed device operations
//! - **Executor**: single in-flight command, login on demand, retry/backoff
//! - **Connection**: TCP session, login handshake, frame reads
//! - **Rate limit**: minimum gap and token bucket before each send
//! - **Protocol**: frame encoding and lenient response parsing
//! - **Adapter** / **Debounce**: helpers for host integrations

pub mod adapter;
mod client;
mod config;
mod connection;
pub mod debounce;
mod error;
mod executor;
pub mod protocol;
mod rate_limit;
mod types;

// Public exports
pub use client::ZenseClient;
pub use config::{ClientConfig, RateConfig, RetryPolicy, DEFAULT_PORT};
pub use connection::Connection;
pub use debounce::{FadeDebouncer, PendingWrite};
pub use error::{Result, ZenseError};
pub use executor::CommandExecutor;
pub use protocol::Command;
pub use rate_limit::RateLimiter;
pub use types::{clamp_level, Device, DeviceId, DiscoveryOrder, Level, SessionState, LEVEL_SCALE};
