/// Shared error type used across all console crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Network unreachable, DNS failure, connection reset, client timeout.
    #[error("transport: {0}")]
    Transport(String),

    /// Non-2xx response; `detail` is the server-provided message when the
    /// body carried one, otherwise the status reason.
    #[error("server returned {status}: {detail}")]
    Server { status: u16, detail: String },

    /// The caller aborted the request.
    #[error("cancelled")]
    Cancelled,

    #[error("persistence: {0}")]
    Persistence(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this failure came from the network layer rather than the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
