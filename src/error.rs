#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("empty daemon address {input:?}")]
    EmptyInput { input: String },
    #[error("malformed daemon address {input:?}")]
    MalformedEndpoint { input: String },
    #[error("invalid address {addr:?} in {input:?}")]
    InvalidAddress { input: String, addr: String },
    #[error("invalid port {port:?} in {input:?}")]
    InvalidPort { input: String, port: String },
    #[error("no port in {input:?} and no default port configured")]
    PortRequired { input: String },
    #[error("host {host:?} in {input:?} did not resolve to any address")]
    HostNotFound { input: String, host: String },
    #[error("invalid default port {0}")]
    InvalidDefaultPort(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("segment of {0} bytes exceeds one datagram")]
    OversizeSegment(usize),
    #[error("{0}")]
    SendError(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

use tokio::sync::mpsc::error::SendError;

impl<T> From<SendError<T>> for Error {
    fn from(e: SendError<T>) -> Self {
        Self::SendError(e.to_string())
    }
}
