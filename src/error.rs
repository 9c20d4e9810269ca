use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("camera {0} is not accessible")]
    CameraUnavailable(i32),

    #[error("failed to load {}: {}", .path.display(), .reason)]
    Asset { path: PathBuf, reason: String },

    #[error("audio output unavailable: {0}")]
    Audio(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    OpenCv(#[from] opencv::Error),
}

impl Error {
    pub fn asset(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Asset {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
