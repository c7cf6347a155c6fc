//! Error types for starting a run

use thiserror::Error;

/// Reasons a run could not be started. Once running, the engine never fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid {timer_type} configuration: {reason}")]
    InvalidConfig {
        timer_type: &'static str,
        reason: &'static str,
    },

    #[error("workout could not be parsed: {message}")]
    Parse { message: String },

    #[error("no phases to run")]
    NoPhases,
}
