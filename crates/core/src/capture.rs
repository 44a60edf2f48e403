//! Photo acquisition.
//!
//! A [`CaptureProvider`] answers two questions: "which photo did the user pick
//! from their library?" and "what did the camera see?". Both answers share
//! one type, [`CaptureOutcome`], so a cancelled picker and a broken camera
//! are handled the same way by the caller.
//!
//! On the desktop the "library" is a path or URL given by the user and the
//! "camera" is a screen grab.
//!
//! # Example
//!
//! ```ignore
//! use restyle_core::capture::{CaptureProvider, DesktopCapture};
//!
//! let capture = DesktopCapture::new().with_library_choice("~/Pictures/cat.jpg");
//! let outcome = capture.pick_from_library().await;
//! ```

use crate::error::DeviceError;
use crate::image_processing::{ImageProcessor, CAPTURE_QUALITY};
use crate::photo::PhotoRef;
use directories::ProjectDirs;
use futures::future::BoxFuture;
use image::{DynamicImage, ImageFormat};
use screenshots::Screen;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Result of asking a provider for a photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The user chose or captured a photo.
    Selected(PhotoRef),
    /// The user backed out. Not an error.
    Cancelled,
    /// The device could not deliver a photo.
    Failed(DeviceError),
}

/// Which provider operation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    Library,
    Camera,
}

/// Supplier of photo references.
pub trait CaptureProvider: Send + Sync {
    fn pick_from_library(&self) -> BoxFuture<'_, CaptureOutcome>;
    fn capture_from_camera(&self) -> BoxFuture<'_, CaptureOutcome>;

    /// Dispatches to the operation named by `source`.
    fn acquire(&self, source: CaptureSource) -> BoxFuture<'_, CaptureOutcome> {
        match source {
            CaptureSource::Library => self.pick_from_library(),
            CaptureSource::Camera => self.capture_from_camera(),
        }
    }
}

/// Desktop provider: library picks come from a user-supplied locator, camera
/// captures grab a monitor.
#[derive(Debug, Clone, Default)]
pub struct DesktopCapture {
    library_choice: Option<String>,
    monitor: usize,
    output_dir: Option<PathBuf>,
}

impl DesktopCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the locator the next library pick returns.
    pub fn with_library_choice(mut self, choice: impl Into<String>) -> Self {
        self.library_choice = Some(choice.into());
        self
    }

    /// Selects the monitor used as camera.
    pub fn with_monitor(mut self, index: usize) -> Self {
        self.monitor = index;
        self
    }

    /// Overrides where captures are written (defaults to the cache dir).
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Lists available monitors with their dimensions.
    pub fn list_monitors() -> Result<Vec<String>, DeviceError> {
        let screens = Screen::all()
            .map_err(|e| DeviceError::unavailable(format!("Failed to enumerate screens: {}", e)))?;
        Ok(screens
            .iter()
            .enumerate()
            .map(|(i, s)| {
                format!(
                    "Monitor {}: {}x{} (scale: {})",
                    i, s.display_info.width, s.display_info.height, s.display_info.scale_factor
                )
            })
            .collect())
    }

    fn pick(&self) -> CaptureOutcome {
        let Some(choice) = self.library_choice.as_deref() else {
            return CaptureOutcome::Cancelled;
        };
        let Some(photo) = PhotoRef::parse(choice) else {
            if choice.trim().is_empty() {
                return CaptureOutcome::Cancelled;
            }
            return CaptureOutcome::Failed(DeviceError::unavailable(format!(
                "Unsupported photo location: {}",
                choice
            )));
        };

        if let Some(path) = photo.as_path() {
            if !path.is_file() {
                return CaptureOutcome::Failed(DeviceError::unavailable(format!(
                    "No photo at {}",
                    path.display()
                )));
            }
            if ImageFormat::from_path(path).is_err() {
                return CaptureOutcome::Failed(DeviceError::unavailable(format!(
                    "Not a recognized image file: {}",
                    path.display()
                )));
            }
        }

        CaptureOutcome::Selected(photo)
    }

    fn capture(&self) -> Result<PhotoRef, DeviceError> {
        let screens = Screen::all()
            .map_err(|e| DeviceError::unavailable(format!("Failed to enumerate screens: {}", e)))?;
        let screen = screens
            .get(self.monitor)
            .ok_or_else(|| DeviceError::unavailable(format!("Screen not found: index {}", self.monitor)))?;

        let captured = screen
            .capture()
            .map_err(|e| DeviceError::hardware(format!("Failed to capture screen: {}", e)))?;

        // Convert screenshots::Image to image::DynamicImage
        let width = captured.width();
        let height = captured.height();
        let img_buffer = image::ImageBuffer::from_raw(width, height, captured.into_raw())
            .ok_or_else(|| DeviceError::hardware("Failed to create image buffer"))?;
        let jpeg = ImageProcessor::encode_jpeg(&DynamicImage::ImageRgba8(img_buffer), CAPTURE_QUALITY)
            .map_err(|e| DeviceError::hardware(format!("Failed to encode capture: {}", e)))?;

        let dir = self.capture_dir()?;
        std::fs::create_dir_all(&dir).map_err(|e| {
            DeviceError::PermissionDenied(format!("Cannot create {}: {}", dir.display(), e))
        })?;
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let path = dir.join(format!("capture-{}.jpg", stamp));
        std::fs::write(&path, jpeg).map_err(|e| {
            DeviceError::PermissionDenied(format!("Cannot write {}: {}", path.display(), e))
        })?;

        Ok(PhotoRef::file(path))
    }

    fn capture_dir(&self) -> Result<PathBuf, DeviceError> {
        if let Some(dir) = &self.output_dir {
            return Ok(dir.clone());
        }
        ProjectDirs::from("", "restyle", "restyle")
            .map(|dirs| dirs.cache_dir().join("captures"))
            .ok_or_else(|| DeviceError::unavailable("No cache directory available"))
    }
}

impl CaptureProvider for DesktopCapture {
    fn pick_from_library(&self) -> BoxFuture<'_, CaptureOutcome> {
        Box::pin(async move { self.pick() })
    }

    fn capture_from_camera(&self) -> BoxFuture<'_, CaptureOutcome> {
        Box::pin(async move {
            let this = self.clone();
            // Screen grabs block; keep them off the async workers.
            match tokio::task::spawn_blocking(move || this.capture()).await {
                Ok(Ok(photo)) => CaptureOutcome::Selected(photo),
                Ok(Err(err)) => CaptureOutcome::Failed(err),
                Err(e) => CaptureOutcome::Failed(DeviceError::hardware(format!(
                    "Capture task failed: {}",
                    e
                ))),
            }
        })
    }
}
