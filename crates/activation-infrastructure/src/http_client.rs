//! HTTP client for the remote activation service.

use std::time::Duration;

use activation_core::config::ApiSettings;
use activation_core::document::{DocumentType, LocalFile};
use activation_core::error::{ActivationError, Result};
use activation_core::profile::{ProfileEnvelope, RemoteProfile};
use activation_core::remote::{DocumentUploader, ProfileGateway, StepUpdate, UploadReceipt};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

/// Response body of the upload endpoint.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Remote sync client.
///
/// Keeps a cookie store so session cookies set by the service are sent back;
/// a bearer token is attached when configured.
#[derive(Clone)]
pub struct HttpActivationClient {
    client: Client,
    settings: ApiSettings,
}

impl HttpActivationClient {
    pub fn new(settings: ApiSettings) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ActivationError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, settings })
    }

    /// Uses an existing client, e.g. one sharing a cookie jar with login.
    pub fn with_client(client: Client, settings: ApiSettings) -> Self {
        Self { client, settings }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Applies credentials and the optional timeout.
    fn prepare(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.settings.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        match self.settings.request_timeout_secs {
            Some(secs) => request.timeout(Duration::from_secs(secs)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = self
            .prepare(request)
            .send()
            .await
            .map_err(|e| ActivationError::remote(format!("{} failed: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ActivationError::remote_status(
            status.as_u16(),
            format!("{} failed: {}", what, error_text),
        ))
    }
}

#[async_trait]
impl ProfileGateway for HttpActivationClient {
    async fn fetch_profile(&self) -> Result<Option<RemoteProfile>> {
        let url = self.url(&self.settings.profile_path);
        tracing::debug!("[HttpActivationClient] GET {}", url);

        let response = self.send(self.client.get(&url), "Profile fetch").await?;
        let body: ProfileEnvelope = response.json().await.map_err(|e| {
            ActivationError::remote(format!("Profile fetch returned invalid body: {}", e))
        })?;
        Ok(body.profile)
    }

    async fn submit_step(&self, update: StepUpdate) -> Result<()> {
        let url = self.url(&self.settings.update_path);
        tracing::debug!("[HttpActivationClient] POST {} (step {})", url, update.step);

        self.send(self.client.post(&url).json(&update), "Step update")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentUploader for HttpActivationClient {
    async fn upload_document(
        &self,
        document_type: DocumentType,
        file: &LocalFile,
    ) -> Result<UploadReceipt> {
        let url = self.url(&self.settings.upload_path);
        tracing::debug!(
            "[HttpActivationClient] POST {} ({}, {} bytes)",
            url,
            document_type,
            file.len()
        );

        let part = Part::bytes(file.bytes().to_vec())
            .file_name(file.file_name().to_string())
            .mime_str(file.content_type())
            .map_err(|e| ActivationError::remote(format!("Invalid content type: {}", e)))?;
        let form = Form::new()
            .part("file", part)
            .text("documentType", document_type.as_tag());

        let response = self
            .send(self.client.post(&url).multipart(form), "Document upload")
            .await?;
        let body: UploadResponse = response.json().await.map_err(|e| {
            ActivationError::remote(format!("Document upload returned invalid body: {}", e))
        })?;

        if !body.success {
            return Err(ActivationError::remote(format!(
                "Document upload rejected: {}",
                body.message.unwrap_or_else(|| "no reason given".to_string())
            )));
        }

        Ok(UploadReceipt {
            document_type,
            message: body.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves exactly one HTTP response and returns the raw request.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{}", addr), handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        if text[..header_end]
            .to_ascii_lowercase()
            .contains("transfer-encoding: chunked")
        {
            return text.ends_with("0\r\n\r\n");
        }
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let lower = line.to_ascii_lowercase();
                lower
                    .strip_prefix("content-length:")
                    .and_then(|v| v.trim().parse::<usize>().ok())
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn client_for(base_url: String) -> HttpActivationClient {
        HttpActivationClient::new(ApiSettings {
            base_url,
            bearer_token: Some("token-123".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_profile() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"profile":{"fullName":"John Doe","currentStep":3}}"#,
        )
        .await;

        let profile = client_for(base).fetch_profile().await.unwrap().unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("John Doe"));
        assert_eq!(profile.current_step, Some(3));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/activation/profile "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer token-123"));
    }

    #[tokio::test]
    async fn test_fetch_profile_none() {
        let (base, _server) = serve_once("200 OK", r#"{"profile":null}"#).await;
        assert!(client_for(base).fetch_profile().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_profile_error_status() {
        let (base, _server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let err = client_for(base).fetch_profile().await.unwrap_err();
        assert!(matches!(
            err,
            ActivationError::Remote {
                status: Some(500),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_profile_unreachable() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(format!("http://{}", addr))
            .fetch_profile()
            .await
            .unwrap_err();
        assert!(matches!(err, ActivationError::Remote { status: None, .. }));
    }

    #[tokio::test]
    async fn test_submit_step_body() {
        let (base, server) = serve_once("200 OK", r#"{"ok":true}"#).await;
        let update = StepUpdate {
            step: 6,
            data: serde_json::json!({ "iban": "PK36SCBL0000001123456702" }),
        };

        client_for(base).submit_step(update).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/activation/update "));
        assert!(request.contains(r#"{"step":6,"data":{"iban":"PK36SCBL0000001123456702"}}"#));
    }

    #[tokio::test]
    async fn test_upload_document_multipart() {
        let (base, server) = serve_once("200 OK", r#"{"success":true,"message":"stored"}"#).await;
        let file = LocalFile::new("front.jpg", b"jpeg".to_vec());

        let receipt = client_for(base)
            .upload_document(DocumentType::IdFront, &file)
            .await
            .unwrap();
        assert_eq!(receipt.document_type, DocumentType::IdFront);
        assert_eq!(receipt.message.as_deref(), Some("stored"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/activation/upload-document "));
        assert!(request.contains("multipart/form-data"));
        assert!(request.contains(r#"name="documentType""#));
        assert!(request.contains("id_front"));
        assert!(request.contains(r#"filename="front.jpg""#));
    }

    #[tokio::test]
    async fn test_upload_rejected_by_service() {
        let (base, _server) =
            serve_once("200 OK", r#"{"success":false,"message":"blurry image"}"#).await;
        let file = LocalFile::new("selfie.png", b"png".to_vec());

        let err = client_for(base)
            .upload_document(DocumentType::Selfie, &file)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("blurry image"));
    }
}
