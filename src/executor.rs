use crate::config::{ClientConfig, RetryPolicy};
use crate::connection::Connection;
use crate::error::{Result, ZenseError};
use crate::protocol::{self, Command};
use crate::types::SessionState;
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Serializes every exchange with the controller
///
/// The connection lives behind one async mutex, so the lock that orders
/// callers is also the one that guards the socket and the rate state.
/// Only one command is ever on the wire, and waiting callers are served
/// in the order they asked.
pub struct CommandExecutor {
    code: u32,
    retry: RetryPolicy,
    connection: Mutex<Connection>,
}

impl CommandExecutor {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            code: config.code,
            retry: config.retry.clone(),
            connection: Mutex::new(Connection::new(config)),
        }
    }

    /// Current state of the underlying session
    pub async fn state(&self) -> SessionState {
        self.connection.lock().await.state()
    }

    /// Run `command` with the configured retry count
    pub async fn execute(&self, command: &Command) -> Option<String> {
        self.execute_with_retries(command, self.retry.max_retries).await
    }

    /// Run `command`, logging in first if needed
    ///
    /// Returns the raw response frame, or `None` once `max_retries` retries
    /// have failed. Every failure closes the connection so the next attempt
    /// starts from a fresh login.
    pub async fn execute_with_retries(&self, command: &Command, max_retries: u32) -> Option<String> {
        let mut conn = self.connection.lock().await;
        let mut backoff = self.retry.delays();

        for attempt in 0..=max_retries {
            match self.attempt(&mut conn, command).await {
                Ok(frame) => return Some(frame),
                Err(e) => {
                    tracing::warn!(
                        "Command {} failed (attempt {}/{}): {}",
                        command.redacted(),
                        attempt + 1,
                        max_retries + 1,
                        e
                    );
                    conn.close().await;
                    if attempt < max_retries {
                        if let Some(delay) = backoff.next() {
                            sleep(delay).await;
                        }
                    }
                }
            }
        }

        tracing::warn!("Giving up on command {}", command.redacted());
        None
    }

    async fn attempt(&self, conn: &mut Connection, command: &Command) -> Result<String> {
        if !conn.is_authenticated() && !conn.login(self.code).await {
            return Err(ZenseError::AuthRejected);
        }

        let frame = conn.send_and_receive(command).await?;
        if frame.trim().is_empty() {
            return Err(ZenseError::EmptyFrame);
        }
        if protocol::is_timeout(&frame) {
            return Err(ZenseError::ControllerTimeout(frame));
        }
        Ok(frame)
    }

    /// Log in, list devices once, then tear the session down
    pub async fn check_connection(&self) -> bool {
        let mut conn = self.connection.lock().await;

        let ok = conn.login(self.code).await
            && matches!(
                conn.send_and_receive(&Command::GetDevices).await,
                Ok(frame) if !frame.trim().is_empty() && !protocol::is_timeout(&frame)
            );

        Self::logout_locked(&mut conn).await;
        ok
    }

    /// Best-effort `Logout`, then close
    pub async fn logout(&self) {
        let mut conn = self.connection.lock().await;
        Self::logout_locked(&mut conn).await;
    }

    async fn logout_locked(conn: &mut Connection) {
        if conn.state() != SessionState::Disconnected {
            if let Err(e) = conn.send_and_receive(&Command::Logout).await {
                tracing::debug!("Ignoring logout failure: {}", e);
            }
        }
        conn.close().await;
    }

    /// Close without logging out
    pub async fn close(&self) {
        self.connection.lock().await.close().await;
    }
}
