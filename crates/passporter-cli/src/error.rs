use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] passporter_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Border point ID cannot be empty")]
    EmptyPointId,
    #[error("Invalid {what} '{value}': {reason}")]
    InvalidArgument {
        what: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("Missing {0}")]
    MissingArgument(&'static str),
    #[error("Not signed in. Run `passporter auth login` first.")]
    NotSignedIn,
    #[error(
        "Firebase is not configured. Set PASSPORTER_FIREBASE_PROJECT_ID and PASSPORTER_FIREBASE_API_KEY, or pass --config."
    )]
    NotConfigured,
}
