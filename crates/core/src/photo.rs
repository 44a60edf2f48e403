//! Photo references and the bytes behind them.
//!
//! A [`PhotoRef`] is only a locator. The bytes are loaded lazily by the
//! transformation client right before upload, so a reference stays cheap to
//! clone and hold in the session state.

use crate::error::EditError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::ImageFormat;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Filename sent with the upload when the locator has none.
pub const DEFAULT_FILE_NAME: &str = "imagem.jpg";

/// Locator of an image available to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoRef {
    /// A file on the local filesystem.
    File(PathBuf),
    /// An `http` or `https` URL fetched before upload.
    Remote(Url),
    /// A `data:` URI carrying the image inline.
    Inline(Url),
}

/// The raw payload of a photo, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoData {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

impl PhotoRef {
    /// Builds a reference from a path.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Parses a user-supplied locator.
    ///
    /// `http(s)` and `data:` URLs keep their scheme, `file://` URLs and bare
    /// strings become local paths. Anything else with an unknown scheme is
    /// rejected unless it names an existing file.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        match Url::parse(input) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Some(Self::Remote(url)),
                "data" => Some(Self::Inline(url)),
                "file" => url.to_file_path().ok().map(Self::File),
                // Single-letter schemes are Windows drive letters.
                scheme if scheme.len() == 1 => Some(Self::File(PathBuf::from(input))),
                _ if Path::new(input).exists() => Some(Self::File(PathBuf::from(input))),
                _ => None,
            },
            Err(_) => Some(Self::File(PathBuf::from(input))),
        }
    }

    /// Name of the file as the upload should present it.
    pub fn file_name(&self) -> String {
        let name = match self {
            Self::File(path) => path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string),
            Self::Remote(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .map(str::to_string),
            Self::Inline(url) => inline_file_name(url.as_str()),
        };
        name.filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
    }

    /// Local path, if this reference points at a file.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            _ => None,
        }
    }

    /// Loads the image bytes behind this reference.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::SourceUnavailable`] if the file cannot be read, the
    /// remote fetch fails or answers with a non-success status, or the inline
    /// payload is not valid base64.
    pub async fn load(&self, http: &reqwest::Client) -> Result<PhotoData, EditError> {
        let bytes = match self {
            Self::File(path) => tokio::fs::read(path).await.map_err(|e| {
                EditError::source_unavailable(format!("Failed to read {}: {}", path.display(), e))
            })?,
            Self::Remote(url) => {
                let response = http.get(url.clone()).send().await.map_err(|e| {
                    EditError::source_unavailable(format!("Failed to fetch {}: {}", url, e))
                })?;
                if !response.status().is_success() {
                    return Err(EditError::source_unavailable(format!(
                        "Fetching {} returned status {}",
                        url,
                        response.status().as_u16()
                    )));
                }
                response
                    .bytes()
                    .await
                    .map_err(|e| {
                        EditError::source_unavailable(format!("Failed to read {}: {}", url, e))
                    })?
                    .to_vec()
            }
            Self::Inline(url) => decode_data_uri(url.as_str())?,
        };

        Ok(PhotoData {
            bytes,
            file_name: self.file_name(),
        })
    }
}

impl fmt::Display for PhotoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{}", url),
            Self::Inline(_) => f.write_str("<inline image>"),
        }
    }
}

/// `imagem.<ext>` for a data URI whose media type is a known image format.
fn inline_file_name(uri: &str) -> Option<String> {
    let header = uri.strip_prefix("data:")?.split_once(',')?.0;
    let mime = header.split(';').next()?.trim();
    let format = ImageFormat::from_mime_type(mime)?;
    let ext = format.extensions_str().first()?;
    Some(format!("imagem.{}", ext))
}

/// Decodes the payload of a base64 `data:` URI.
fn decode_data_uri(uri: &str) -> Result<Vec<u8>, EditError> {
    let (header, payload) = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| EditError::source_unavailable("Malformed data URI"))?;

    if !header.ends_with(";base64") {
        return Err(EditError::source_unavailable(
            "Only base64 data URIs are supported",
        ));
    }

    BASE64
        .decode(payload)
        .map_err(|e| EditError::source_unavailable(format!("Invalid base64 payload: {}", e)))
}
