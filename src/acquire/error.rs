use std::time::Duration;

use thiserror::Error;

use crate::acquire::controller::ControllerState;

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("unknown data source '{0}'")]
    UnknownSource(String),
    #[error("invalid value for option '{key}': {reason}")]
    InvalidConfig { key: String, reason: String },
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("block lengths differ across channels: channel {channel} has {actual} samples, expected {expected}")]
    RaggedBlock {
        channel: usize,
        expected: usize,
        actual: usize,
    },
    #[error("{op} is not valid in the {state:?} state")]
    InvalidState {
        op: &'static str,
        state: ControllerState,
    },
    #[error("data source did not quiesce within {0:?}")]
    ShutdownTimeout(Duration),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to render plot: {0}")]
    Plot(String),
}

impl ScopeError {
    pub fn invalid_config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ScopeError::InvalidConfig {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for ScopeError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ScopeError::Plot(format!("{value:?}"))
    }
}

impl From<image::ImageError> for ScopeError {
    fn from(value: image::ImageError) -> Self {
        ScopeError::Plot(value.to_string())
    }
}
