//! Error types for the restyle-core library.
//!
//! Three layers of failure are modelled here:
//!
//! - [`EditError`]: why a single transformation request failed. Stored in the
//!   session state, so it is `Clone` and comparable.
//! - [`DeviceError`]: why a capture provider could not deliver a photo.
//! - [`AppError`]: everything the library surfaces through `Result`.

use thiserror::Error;

/// Generic message shown to the user for any failed transformation.
pub const EDIT_FAILED_MESSAGE: &str = "Could not edit the image. Please try again.";

/// Message shown when a style is chosen before any photo.
pub const NO_PHOTO_MESSAGE: &str = "Select a photo before applying a style.";

/// Failure of a single edit request against the transformation service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// The photo could not be read, fetched, or decoded before upload.
    #[error("Photo source unavailable: {0}")]
    SourceUnavailable(String),

    /// No response was received from the service.
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("Server error: status {status}")]
    Server { status: u16 },

    /// The response body did not carry a usable result locator.
    #[error("Could not decode response: {0}")]
    Decode(String),
}

impl EditError {
    /// Creates a source-unavailable error with the given message.
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Creates a network error with the given message.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a decode error with the given message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Short name of the failure kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::Network(_) => "network",
            Self::Server { .. } => "server",
            Self::Decode(_) => "decode",
        }
    }

    /// The message presented to the user. Every kind maps to the same text.
    pub fn user_message(&self) -> &'static str {
        EDIT_FAILED_MESSAGE
    }
}

/// Failure reported by a capture provider (library picker or camera).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Access to the device or file was refused.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The requested device or photo does not exist.
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    /// The device exists but the capture itself failed.
    #[error("Capture failed: {0}")]
    Hardware(String),
}

impl DeviceError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn hardware(msg: impl Into<String>) -> Self {
        Self::Hardware(msg.into())
    }
}

/// Errors that can occur within the restyle-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A style was requested while no photo is selected.
    #[error("Select a photo before applying a style.")]
    NoPhotoSelected,

    /// A capture provider failed.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// A transformation request failed.
    #[error(transparent)]
    Edit(#[from] EditError),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
