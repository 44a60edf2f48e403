//! Restyle Core Library
//!
//! This library drives stylized photo edits performed by a remote
//! transformation service: it acquires a photo, submits it with a style, and
//! keeps a session state that always reflects the latest request.
//!
//! # Overview
//!
//! - **Capture**: library picks and camera captures via [`capture`]
//! - **Transformation Client**: the multipart upload contract via [`client`]
//! - **Orchestration**: the request state machine via [`orchestrator`] and
//!   [`session`]
//!
//! # Quick Start
//!
//! ```ignore
//! use restyle_core::{Restyle, StyleId};
//! use restyle_core::capture::{CaptureSource, DesktopCapture};
//!
//! let mut app = Restyle::new()?;
//! let picker = DesktopCapture::new().with_library_choice("cat.jpg");
//! app.orchestrator_mut().acquire(&picker, CaptureSource::Library).await;
//! app.orchestrator_mut().request_edit(StyleId::PixelArt)?;
//! let state = app.orchestrator_mut().settle().await;
//! println!("{:?}", state.result);
//! ```
//!
//! # Module Structure
//!
//! - [`capture`]: Capture provider contract and desktop implementation
//! - [`client`]: Transformation service client
//! - [`config`]: Configuration loading and management
//! - [`error`]: Error types and result aliases
//! - [`image_processing`]: JPEG re-encoding for uploads and captures
//! - [`orchestrator`]: Edit request orchestrator
//! - [`photo`]: Photo references
//! - [`session`]: Session state and transitions
//! - [`settings`]: Persisted user preferences
//! - [`style`]: Style catalog

pub mod capture;
pub mod client;
pub mod config;
pub mod error;
pub mod image_processing;
pub mod orchestrator;
pub mod photo;
pub mod session;
pub mod settings;
pub mod style;

// Re-export primary types for convenience
pub use client::{TransformClient, Transformer};
pub use config::Config;
pub use error::{AppError, DeviceError, EditError, Result};
pub use orchestrator::Orchestrator;
pub use photo::PhotoRef;
pub use session::{Phase, RequestId, ResultRef, SessionState};
pub use settings::Settings;
pub use style::StyleId;

/// Main entry point wiring configuration, client and orchestrator together.
pub struct Restyle {
    config: Config,
    orchestrator: Orchestrator<TransformClient>,
}

impl Restyle {
    /// Creates an instance from the environment plus saved settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new() -> Result<Self> {
        let config = Settings::load().apply_to(&Config::load()?)?;
        Self::with_config(config)
    }

    /// Creates an instance with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_config(config: Config) -> Result<Self> {
        let client = TransformClient::new(&config)?;
        let orchestrator = Orchestrator::new(client).with_abort_superseded(config.abort_superseded);
        Ok(Self {
            config,
            orchestrator,
        })
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator<TransformClient> {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator<TransformClient> {
        &mut self.orchestrator
    }
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup. This loads `.env` files if present.
pub fn init() {
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn app_for(server: &MockServer) -> Restyle {
        let config = Config::builder()
            .with_endpoint(&server.url("/api/editar-imagem"))
            .build()
            .unwrap();
        Restyle::with_config(config).unwrap()
    }

    fn photo_on_disk(dir: &tempfile::TempDir) -> PhotoRef {
        let path = dir.path().join("selfie.jpg");
        std::fs::write(&path, b"jpeg-bytes").unwrap();
        PhotoRef::file(path)
    }

    #[tokio::test]
    async fn end_to_end_success_completes_session() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/editar-imagem")
                .body_includes("name=\"tema\"\r\n\r\nCyberpunk\r\n");
            then.status(200)
                .json_body(json!({ "novaImagemUrl": "https://x/y.png" }));
        });

        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(&server);
        let orch = app.orchestrator_mut();
        orch.select_photo(photo_on_disk(&dir));
        orch.request_edit(StyleId::Cyberpunk).unwrap();
        assert_eq!(orch.state().phase(), Phase::Pending);

        let state = orch.settle().await;
        assert_eq!(state.phase(), Phase::Completed);
        assert_eq!(state.result.as_ref().unwrap().as_str(), "https://x/y.png");
    }

    #[tokio::test]
    async fn end_to_end_server_error_fails_session_and_stays_usable() {
        let server = MockServer::start_async().await;
        let mut failing = server.mock(|when, then| {
            when.method(POST).path("/api/editar-imagem");
            then.status(500);
        });

        let dir = tempfile::tempdir().unwrap();
        let mut app = app_for(&server);
        let orch = app.orchestrator_mut();
        orch.select_photo(photo_on_disk(&dir));
        orch.request_edit(StyleId::Vintage).unwrap();

        let state = orch.settle().await;
        assert_eq!(state.phase(), Phase::Failed);
        assert_eq!(state.error, Some(EditError::Server { status: 500 }));
        assert_eq!(state.result, None);

        failing.delete();
        server.mock(|when, then| {
            when.method(POST).path("/api/editar-imagem");
            then.status(200)
                .json_body(json!({ "novaImagemUrl": "https://x/retry.png" }));
        });

        orch.request_edit(StyleId::Vintage).unwrap();
        assert_eq!(orch.settle().await.phase(), Phase::Completed);
    }
}
