use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum PollError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timeout reading registers")]
    Timeout,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("persistence error: {0}")]
    Persistence(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// Map any boxed transport error to a typed PollError, with special handling
/// for field-bus errors.
pub fn map_bus_error_dyn(e: &(dyn std::error::Error + 'static)) -> PollError {
    #[cfg(feature = "bus-errors")]
    if let Some(bus) = e.downcast_ref::<dwp_modbus::BusError>() {
        return match bus {
            dwp_modbus::BusError::Timeout => PollError::Timeout,
            other => PollError::Transport(other.to_string()),
        };
    }
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        PollError::Timeout
    } else {
        PollError::Transport(s)
    }
}
