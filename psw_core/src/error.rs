use thiserror::Error;

/// Fault taxonomy of the control core. None of these stop the loop; they are
/// counted, logged and surfaced through diagnostics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SwitchError {
    #[error("timeout waiting for sensor")]
    SensorTimeout,
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("calibration record corrupt: {0}")]
    StorageCorruption(String),
    #[error("calibration write did not verify after {attempts} attempt(s)")]
    StorageWriteMismatch { attempts: u8 },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing sensor bridge")]
    MissingBridge,
    #[error("missing input panel")]
    MissingInputs,
    #[error("missing outputs")]
    MissingOutputs,
    #[error("missing non-volatile store")]
    MissingStore,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
