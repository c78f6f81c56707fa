use thiserror::Error;

/// Result type for ZenseHome operations
pub type Result<T> = std::result::Result<T, ZenseError>;

/// Errors that can occur when talking to a ZenseHome controller
///
/// These never escape the typed client operations: the command executor
/// retries them and degrades to an empty result once attempts run out.
#[derive(Error, Debug)]
pub enum ZenseError {
    /// TCP connection could not be opened
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        /// `host:port` that was dialled
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// TCP connect did not complete in time
    #[error("Connection to {0} timed out")]
    ConnectTimeout(String),

    /// Controller did not answer `Login Ok`
    #[error("Login rejected by controller")]
    AuthRejected,

    /// No transport is open
    #[error("Not connected")]
    NotConnected,

    /// Read or write did not complete in time
    #[error("Request timeout")]
    Timeout,

    /// Nothing came back before the peer closed
    #[error("Empty response frame")]
    EmptyFrame,

    /// Controller answered with its own `Timeout` payload
    #[error("Controller reported a timeout: {0}")]
    ControllerTimeout(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entity type overrides could not be parsed
    #[error("Invalid entity map: {0}")]
    InvalidEntityMap(String),
}

impl From<serde_json::Error> for ZenseError {
    fn from(e: serde_json::Error) -> Self {
        ZenseError::InvalidEntityMap(e.to_string())
    }
}
