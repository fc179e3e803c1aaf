use thiserror::Error;

/// Field-bus transport failures. `Timeout` and `Connection` are recoverable
/// from the orchestrator's point of view; `Protocol` usually means a
/// misconfigured register map.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("read timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<std::io::Error> for BusError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => BusError::Timeout,
            _ => BusError::Connection(e.to_string()),
        }
    }
}
