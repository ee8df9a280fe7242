use gform_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error("run cancelled")]
    Cancelled,
}
