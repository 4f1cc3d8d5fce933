//! Error types for requests, wizard transitions and local file handling.

use crate::model::Field;
use crate::wizard::WizardState;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single HTTP exchange with the shaping service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Connection failure, or a success body that could not be decoded.
    #[error("{0}")]
    Transport(String),
    /// Non-success status; `message` comes from the `{"error": ...}` body when present.
    #[error("{message}")]
    Server { status: u16, message: String },
}

impl RequestError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        RequestError::Transport(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Request(#[from] RequestError),
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("cannot save spreadsheet: {0}")]
    Save(#[source] std::io::Error),
}

/// Operation rejected by the wizard state machine. State is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: WizardState,
    },
    #[error("{field} has no item at index {index}")]
    NoSuchItem { field: Field, index: usize },
}
