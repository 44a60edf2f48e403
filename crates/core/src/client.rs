//! Client for the remote image-transformation service.
//!
//! The wire contract is deliberately small: one multipart POST carrying the
//! image and the style name, answered by a JSON body holding the URL of the
//! transformed image.

use crate::config::Config;
use crate::error::{EditError, Result};
use crate::image_processing::ImageProcessor;
use crate::photo::PhotoData;
use crate::session::{EditOutcome, EditRequest, ResultRef};
use futures::future::BoxFuture;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// Anything that can turn an [`EditRequest`] into an [`EditOutcome`].
///
/// The returned future owns everything it needs, so the orchestrator can run
/// it on a spawned task while it keeps accepting intents.
pub trait Transformer: Send + Sync + 'static {
    fn submit(&self, request: EditRequest) -> BoxFuture<'static, EditOutcome>;
}

/// The success body returned by the service.
#[derive(Debug, Deserialize)]
struct EditResponse {
    #[serde(rename = "novaImagemUrl")]
    nova_imagem_url: String,
}

/// HTTP implementation of [`Transformer`].
#[derive(Clone)]
pub struct TransformClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    config: Config,
}

impl TransformClient {
    /// Builds a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Http`](crate::AppError::Http) if the underlying
    /// HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self::with_http(http, config.clone()))
    }

    /// Wraps an existing `reqwest` client.
    pub fn with_http(http: reqwest::Client, config: Config) -> Self {
        Self {
            inner: Arc::new(Inner { http, config }),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.inner.config.endpoint_url
    }

    /// Sends one edit request and decodes the answer.
    ///
    /// No retries happen here; a failed request is reported once.
    pub async fn edit(&self, request: &EditRequest) -> EditOutcome {
        let Inner { http, config } = self.inner.as_ref();

        let photo = prepare_upload(request.photo.load(http).await?, config.upload_quality)?;

        let mut part = Part::bytes(photo.bytes).file_name(photo.file_name.clone());
        if let Some(mime) = ImageProcessor::mime_for(&photo.file_name) {
            part = part.mime_str(mime).map_err(|e| {
                EditError::source_unavailable(format!("Invalid MIME type '{}': {}", mime, e))
            })?;
        }

        // The boundary and Content-Type header come from reqwest.
        let form = Form::new()
            .part(config.image_field_name.clone(), part)
            .text(config.style_field_name.clone(), request.style.as_str());

        tracing::debug!(
            request_id = request.request_id.get(),
            style = request.style.as_str(),
            file_name = %photo.file_name,
            endpoint = %config.endpoint_url,
            "submitting edit request"
        );

        let response = http
            .post(config.endpoint_url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| EditError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EditError::Server {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| EditError::network(format!("Failed to read response body: {}", e)))?;

        decode_response(&body, &config.endpoint_url)
    }
}

impl Transformer for TransformClient {
    fn submit(&self, request: EditRequest) -> BoxFuture<'static, EditOutcome> {
        let client = self.clone();
        Box::pin(async move { client.edit(&request).await })
    }
}

/// Re-encodes the photo as JPEG when an upload quality is configured.
fn prepare_upload(
    mut photo: PhotoData,
    quality: Option<u8>,
) -> std::result::Result<PhotoData, EditError> {
    if let Some(quality) = quality {
        photo.bytes = ImageProcessor::reencode_jpeg(&photo.bytes, quality)?;
        photo.file_name = ImageProcessor::jpeg_file_name(&photo.file_name);
    }
    Ok(photo)
}

/// Extracts the result locator from a success body.
///
/// Relative locators resolve against the endpoint.
fn decode_response(body: &[u8], endpoint: &Url) -> EditOutcome {
    let parsed: EditResponse =
        serde_json::from_slice(body).map_err(|e| EditError::decode(e.to_string()))?;

    let locator = parsed.nova_imagem_url.trim();
    if locator.is_empty() {
        return Err(EditError::decode("Empty result URL"));
    }

    let url = endpoint.join(locator).map_err(|e| {
        EditError::decode(format!("Invalid result URL '{}': {}", locator, e))
    })?;

    Ok(ResultRef::new(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::PhotoRef;
    use crate::session::RequestId;
    use crate::style::StyleId;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::io::Write;

    fn client_for(server: &MockServer) -> TransformClient {
        let config = Config::builder()
            .with_endpoint(&server.url("/api/editar-imagem"))
            .build()
            .unwrap();
        TransformClient::new(&config).unwrap()
    }

    fn photo_file(name: &str, contents: &[u8]) -> (tempfile::TempDir, PhotoRef) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(contents)
            .unwrap();
        (dir, PhotoRef::file(path))
    }

    fn request(photo: PhotoRef, style: StyleId) -> EditRequest {
        EditRequest {
            request_id: RequestId::default(),
            photo,
            style,
        }
    }

    #[tokio::test]
    async fn posts_multipart_fields_and_decodes_result() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/editar-imagem")
                .header_exists("content-type")
                .body_includes("Content-Disposition: form-data; name=\"imagem\"; filename=\"cat.png\"")
                .body_includes("Content-Type: image/png")
                .body_includes("fake-png-bytes")
                .body_includes("Content-Disposition: form-data; name=\"tema\"\r\n\r\nPixel-Art\r\n");
            then.status(200)
                .json_body(json!({ "novaImagemUrl": "https://x/y.png" }));
        });

        let (_dir, photo) = photo_file("cat.png", b"fake-png-bytes");
        let outcome = client_for(&server)
            .edit(&request(photo, StyleId::PixelArt))
            .await;

        mock.assert();
        assert_eq!(outcome.unwrap().as_str(), "https://x/y.png");
    }

    #[tokio::test]
    async fn sends_exact_non_ascii_style_name() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/editar-imagem")
                .body_includes("name=\"tema\"\r\n\r\nEstúdio Ghibli\r\n");
            then.status(200)
                .json_body(json!({ "novaImagemUrl": "https://x/ghibli.png" }));
        });

        let (_dir, photo) = photo_file("portrait.jpg", b"jpeg");
        let outcome = client_for(&server)
            .submit(request(photo, StyleId::Ghibli))
            .await;

        mock.assert();
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn uses_configured_field_names() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/edit")
                .body_includes("name=\"photo\"; filename=\"cat.png\"")
                .body_includes("name=\"style\"\r\n\r\nVintage\r\n");
            then.status(200)
                .json_body(json!({ "novaImagemUrl": "https://x/v.png" }));
        });

        let config = Config::builder()
            .with_endpoint(&server.url("/edit"))
            .with_image_field("photo")
            .with_style_field("style")
            .build()
            .unwrap();
        let (_dir, photo) = photo_file("cat.png", b"bytes");
        let outcome = TransformClient::new(&config)
            .unwrap()
            .edit(&request(photo, StyleId::Vintage))
            .await;

        mock.assert();
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn server_status_becomes_server_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/editar-imagem");
            then.status(500).body("boom");
        });

        let (_dir, photo) = photo_file("cat.png", b"bytes");
        let outcome = client_for(&server)
            .edit(&request(photo, StyleId::Cyberpunk))
            .await;

        assert_eq!(outcome.unwrap_err(), EditError::Server { status: 500 });
    }

    #[tokio::test]
    async fn malformed_body_becomes_decode_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/editar-imagem");
            then.status(200).body("<html>not json</html>");
        });

        let (_dir, photo) = photo_file("cat.png", b"bytes");
        let outcome = client_for(&server)
            .edit(&request(photo, StyleId::Cyberpunk))
            .await;

        assert!(matches!(outcome, Err(EditError::Decode(_))));
    }

    #[tokio::test]
    async fn missing_or_invalid_locator_is_decode_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/editar-imagem");
            then.status(200).json_body(json!({ "url": "https://x/y.png" }));
        });
        let (_dir, photo) = photo_file("cat.png", b"bytes");
        let outcome = client_for(&server)
            .edit(&request(photo.clone(), StyleId::Vintage))
            .await;
        assert!(matches!(outcome, Err(EditError::Decode(_))));

        let endpoint = Url::parse("https://api.example.com/api/editar-imagem").unwrap();
        assert!(matches!(
            decode_response(br#"{"novaImagemUrl":"http://[::1"}"#, &endpoint),
            Err(EditError::Decode(_))
        ));
        assert!(matches!(
            decode_response(br#"{"novaImagemUrl":"  "}"#, &endpoint),
            Err(EditError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        // Bind and drop a listener so the port is very likely closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = Config::builder()
            .with_endpoint(&format!("http://127.0.0.1:{}/api/editar-imagem", port))
            .build()
            .unwrap();

        let (_dir, photo) = photo_file("cat.png", b"bytes");
        let outcome = TransformClient::new(&config)
            .unwrap()
            .edit(&request(photo, StyleId::Vintage))
            .await;

        assert!(matches!(outcome, Err(EditError::Network(_))));
    }

    #[tokio::test]
    async fn unreadable_photo_is_source_unavailable_without_posting() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/editar-imagem");
            then.status(200);
        });

        let outcome = client_for(&server)
            .edit(&request(PhotoRef::file("/no/such/photo.jpg"), StyleId::Vintage))
            .await;

        assert!(matches!(outcome, Err(EditError::SourceUnavailable(_))));
        mock.assert_calls(0);
    }

    #[tokio::test]
    async fn fetches_remote_photo_before_upload() {
        let server = MockServer::start_async().await;
        let source = server.mock(|when, then| {
            when.method(GET).path("/photos/dog.jpg");
            then.status(200).body("remote-jpeg-bytes");
        });
        let edit = server.mock(|when, then| {
            when.method(POST)
                .path("/api/editar-imagem")
                .body_includes("filename=\"dog.jpg\"")
                .body_includes("remote-jpeg-bytes");
            then.status(200)
                .json_body(json!({ "novaImagemUrl": "https://x/dog.png" }));
        });

        let photo = PhotoRef::parse(&server.url("/photos/dog.jpg")).unwrap();
        let outcome = client_for(&server)
            .edit(&request(photo, StyleId::Vintage))
            .await;

        source.assert();
        edit.assert();
        assert_eq!(outcome.unwrap().as_str(), "https://x/dog.png");
    }

    #[tokio::test]
    async fn remote_photo_failure_is_source_unavailable() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/photos/gone.jpg");
            then.status(404);
        });

        let photo = PhotoRef::parse(&server.url("/photos/gone.jpg")).unwrap();
        let outcome = client_for(&server)
            .edit(&request(photo, StyleId::Vintage))
            .await;

        assert!(matches!(outcome, Err(EditError::SourceUnavailable(_))));
    }

    #[test]
    fn relative_locator_resolves_against_endpoint() {
        let endpoint = Url::parse("https://api.example.com/api/editar-imagem").unwrap();
        let relative = br#"{"novaImagemUrl":"/uploads/x.png"}"#;
        let result = decode_response(relative, &endpoint).unwrap();
        assert_eq!(result.as_str(), "https://api.example.com/uploads/x.png");

        let absolute = br#"{"novaImagemUrl":"https://cdn.example.com/y.png"}"#;
        let absolute = decode_response(absolute, &endpoint).unwrap();
        assert_eq!(absolute.as_str(), "https://cdn.example.com/y.png");
    }

    #[tokio::test]
    async fn inline_png_keeps_its_type() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/editar-imagem")
                .body_includes("name=\"imagem\"; filename=\"imagem.png\"")
                .body_includes("Content-Type: image/png")
                .body_includes("hello");
            then.status(200)
                .json_body(json!({ "novaImagemUrl": "https://x/inline.png" }));
        });

        let photo = PhotoRef::parse("data:image/png;base64,aGVsbG8=").unwrap();
        let outcome = client_for(&server)
            .edit(&request(photo, StyleId::Pistache))
            .await;

        mock.assert();
        assert_eq!(outcome.unwrap().as_str(), "https://x/inline.png");
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 200, 10, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn upload_quality_reencodes_as_jpeg() {
        let photo = PhotoData {
            bytes: png_bytes(),
            file_name: "cat.png".to_string(),
        };

        let prepared = prepare_upload(photo.clone(), Some(50)).unwrap();
        assert_eq!(prepared.file_name, "cat.jpg");
        assert_eq!(ImageProcessor::mime_for(&prepared.file_name), Some("image/jpeg"));
        assert_eq!(
            image::guess_format(&prepared.bytes).unwrap(),
            image::ImageFormat::Jpeg
        );

        assert_eq!(prepare_upload(photo.clone(), None).unwrap(), photo);
    }

    #[tokio::test]
    async fn upload_quality_applies_to_edit_requests() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/editar-imagem");
            then.status(200)
                .json_body(json!({ "novaImagemUrl": "https://x/q.png" }));
        });

        let config = Config::builder()
            .with_endpoint(&server.url("/api/editar-imagem"))
            .with_upload_quality(50)
            .build()
            .unwrap();
        let (_dir, photo) = photo_file("cat.png", &png_bytes());
        let outcome = TransformClient::new(&config)
            .unwrap()
            .edit(&request(photo, StyleId::Vintage))
            .await;
        mock.assert();
        assert!(outcome.is_ok());

        let (_dir, broken) = photo_file("broken.png", b"not an image");
        let outcome = TransformClient::new(&config)
            .unwrap()
            .edit(&request(broken, StyleId::Vintage))
            .await;
        assert!(matches!(outcome, Err(EditError::SourceUnavailable(_))));
    }
}
