//! Error types
//!
//! Nothing here is fatal. Race commands never fail (inapplicable commands are
//! ignored), so errors only cross the collaborator boundaries: the prediction
//! service, settings and position files, and the asset folder.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by the external prediction service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Service could not be reached
    #[error("prediction service unavailable: {0}")]
    Unavailable(String),

    /// Service refused the request
    #[error("prediction service rejected request: {0}")]
    Rejected(String),
}

/// Reasons a prediction could not be created right now
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredictionError {
    /// Auth state still loading, retry later
    #[error("prediction service is not ready yet")]
    NotReady,

    /// User has to finish logging in through the browser
    #[error("log in at {uri} to enable predictions")]
    AuthenticationRequired { uri: String },

    /// A prediction is already being created or is open
    #[error("a prediction is already active")]
    AlreadyActive,

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Settings file problems
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Position file problems
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("position file i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("position file format: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Asset folder problems
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("asset missing: {}", .0.display())]
    Missing(PathBuf),

    #[error("asset unreadable: {}", .0.display())]
    Unreadable(PathBuf),
}

/// Bad line in an input script
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("line {line}: bad time {value:?}")]
    BadTime { line: usize, value: String },

    #[error("line {line}: unknown command {command:?}")]
    UnknownCommand { line: usize, command: String },
}
