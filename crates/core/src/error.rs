//! Error types for dalvikrun
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Top-level error for a dalvikrun invocation
#[derive(Error, Debug)]
pub enum DalvikRunError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is not configured")]
    MissingConfiguration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// adb could not be used to discover devices
    #[error("Device bridge error: {0}")]
    Device(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type alias for dalvikrun operations
pub type Result<T> = std::result::Result<T, DalvikRunError>;

impl DalvikRunError {
    /// Whether this error happened before any external tool was started
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            DalvikRunError::MissingConfiguration(_) | DalvikRunError::Config(_)
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            DalvikRunError::MissingConfiguration(what) => format!(
                "{} is not set. Add it to the config file or pass it on the command line.",
                what
            ),
            DalvikRunError::Io(e) => format!("File operation failed: {}", e),
            DalvikRunError::Device(e) => format!("Cannot list devices: {}", e),
            _ => self.to_string(),
        }
    }
}
