//! Configuration loading and management.
//!
//! Every field defaults to the transformation service's documented contract,
//! so an empty environment yields a working configuration.

use crate::error::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use url::Url;

/// Default transformation endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api-mural.onrender.com/api/editar-imagem";
/// Multipart field carrying the image payload.
pub const DEFAULT_IMAGE_FIELD: &str = "imagem";
/// Multipart field carrying the style name.
pub const DEFAULT_STYLE_FIELD: &str = "tema";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Where edit requests are POSTed.
    pub endpoint_url: Url,
    pub image_field_name: String,
    pub style_field_name: String,
    /// Overall request timeout. `None` waits as long as the transport allows.
    pub timeout: Option<Duration>,
    /// Re-encode uploads as JPEG at this quality (1-100) when set.
    pub upload_quality: Option<u8>,
    /// Abort the transport of superseded requests instead of only ignoring them.
    pub abort_superseded: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint(),
            image_field_name: DEFAULT_IMAGE_FIELD.to_string(),
            style_field_name: DEFAULT_STYLE_FIELD.to_string(),
            timeout: None,
            upload_quality: None,
            abort_superseded: false,
        }
    }
}

impl Config {
    /// Loads configuration from the environment, honouring a `.env` file.
    ///
    /// Recognized variables: `RESTYLE_ENDPOINT_URL`, `RESTYLE_IMAGE_FIELD`,
    /// `RESTYLE_STYLE_FIELD`, `RESTYLE_TIMEOUT_SECS`, `RESTYLE_UPLOAD_QUALITY`,
    /// `RESTYLE_ABORT_SUPERSEDED`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if any variable holds an invalid value.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();

        if let Some(url) = lookup("RESTYLE_ENDPOINT_URL") {
            builder = builder.with_endpoint(&url);
        }
        if let Some(field) = lookup("RESTYLE_IMAGE_FIELD") {
            builder = builder.with_image_field(&field);
        }
        if let Some(field) = lookup("RESTYLE_STYLE_FIELD") {
            builder = builder.with_style_field(&field);
        }
        if let Some(secs) = lookup("RESTYLE_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                AppError::config(format!("RESTYLE_TIMEOUT_SECS must be a whole number, got '{}'", secs))
            })?;
            builder = builder.with_timeout(Duration::from_secs(secs));
        }
        if let Some(quality) = lookup("RESTYLE_UPLOAD_QUALITY") {
            let quality: u8 = quality.trim().parse().map_err(|_| {
                AppError::config(format!("RESTYLE_UPLOAD_QUALITY must be 1-100, got '{}'", quality))
            })?;
            builder = builder.with_upload_quality(quality);
        }
        if let Some(flag) = lookup("RESTYLE_ABORT_SUPERSEDED") {
            builder = builder.with_abort_superseded(parse_flag(&flag)?);
        }

        builder.build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Fluent builder validating every field on [`ConfigBuilder::build`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    endpoint: Option<String>,
    image_field: Option<String>,
    style_field: Option<String>,
    timeout: Option<Duration>,
    upload_quality: Option<u8>,
    abort_superseded: bool,
}

impl ConfigBuilder {
    pub fn with_endpoint(mut self, url: &str) -> Self {
        self.endpoint = Some(url.to_string());
        self
    }

    pub fn with_image_field(mut self, name: &str) -> Self {
        self.image_field = Some(name.to_string());
        self
    }

    pub fn with_style_field(mut self, name: &str) -> Self {
        self.style_field = Some(name.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_upload_quality(mut self, quality: u8) -> Self {
        self.upload_quality = Some(quality);
        self
    }

    pub fn with_abort_superseded(mut self, abort: bool) -> Self {
        self.abort_superseded = abort;
        self
    }

    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the endpoint is not an `http(s)` URL, a
    /// field name is blank, the timeout is zero, or the quality is outside 1-100.
    pub fn build(self) -> Result<Config> {
        let endpoint_url = match self.endpoint {
            Some(raw) => {
                let url = Url::parse(raw.trim())
                    .map_err(|e| AppError::config(format!("Invalid endpoint URL '{}': {}", raw, e)))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(AppError::config(format!(
                        "Endpoint must use http or https, got '{}'",
                        url.scheme()
                    )));
                }
                url
            }
            None => default_endpoint(),
        };

        let image_field_name = field_name(self.image_field, DEFAULT_IMAGE_FIELD, "image")?;
        let style_field_name = field_name(self.style_field, DEFAULT_STYLE_FIELD, "style")?;

        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(AppError::config("Timeout must be greater than zero"));
        }

        if let Some(quality) = self.upload_quality {
            if !(1..=100).contains(&quality) {
                return Err(AppError::config(format!(
                    "Upload quality must be 1-100, got {}",
                    quality
                )));
            }
        }

        Ok(Config {
            endpoint_url,
            image_field_name,
            style_field_name,
            timeout: self.timeout,
            upload_quality: self.upload_quality,
            abort_superseded: self.abort_superseded,
        })
    }
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL")
}

fn field_name(value: Option<String>, default: &str, what: &str) -> Result<String> {
    match value {
        Some(name) if name.trim().is_empty() => Err(AppError::config(format!(
            "The {} field name cannot be empty",
            what
        ))),
        Some(name) => Ok(name.trim().to_string()),
        None => Ok(default.to_string()),
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::config(format!(
            "RESTYLE_ABORT_SUPERSEDED must be true or false, got '{}'",
            other
        ))),
    }
}
