use std::time::Duration;

use futures::TryStreamExt;
use paper_core::chat::{ChatError, ChatStream, UploadError, Uploaded};
use reqwest::{Client, StatusCode};
use tracing::{error, info};

use crate::backend::config::BackendConfig;
use crate::backend::stream::read_chat_stream;
use crate::backend::upload::{self, PdfFile, PDF_MEDIA_TYPE};

/// HTTP client for the document-chat service. One instance covers both
/// operations the service exposes: the streaming chat request and the
/// PDF upload.
#[derive(Clone)]
pub struct Backend {
    http: Client,
    cfg: BackendConfig,
}

impl Backend {
    pub fn new(cfg: BackendConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2)
            .connect_timeout(cfg.connect_timeout)
            .build()?;
        Ok(Self { http, cfg })
    }

    pub fn base_url(&self) -> &str {
        &self.cfg.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    /// Open the streaming chat request for one user message and return the
    /// delta stream. The service owns conversation memory, so only the
    /// newest message goes over the wire.
    pub async fn stream_chat(&self, message: &str) -> Result<ChatStream, ChatError> {
        let url = self.endpoint("chat");
        info!(target: "client::backend", "start chat stream url={} input_len={}", url, message.len());
        let body = serde_json::json!({ "message": message });
        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.ok();
            error!(target: "client::backend", "chat non-2xx status={} body={:?}", status, body);
            return Err(map_status_err(status, body));
        }
        let bytes = resp.bytes_stream().map_err(map_reqwest_err);
        Ok(read_chat_stream(bytes, self.cfg.stream_idle_timeout))
    }

    /// Upload one PDF. The declared media type is checked before any
    /// request is issued; a rejected file never touches the network.
    pub async fn upload_pdf(&self, file: &PdfFile) -> Result<Uploaded, UploadError> {
        upload::validate(file)?;
        let url = self.endpoint("upload-pdf");
        info!(target: "client::backend", "upload pdf url={} file={} size={}", url, file.file_name(), file.size);
        let data = tokio::fs::read(&file.path)
            .await
            .map_err(|e| UploadError::Io(format!("read {}: {}", file.path.display(), e)))?;
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file.file_name())
            .mime_str(PDF_MEDIA_TYPE)
            .map_err(|e| UploadError::Io(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            error!(target: "client::backend", "upload non-2xx status={} body={:?}", status, body);
            return Err(UploadError::Server(upload::server_message(&body)));
        }
        upload::parse_uploaded(&body)
    }
}

pub(crate) fn map_reqwest_err(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout(e.to_string())
    } else {
        ChatError::Network(e.to_string())
    }
}

// Prefer the service's own `{"error": ...}` message when the body carries one.
pub(crate) fn map_status_err(status: StatusCode, body: Option<String>) -> ChatError {
    let msg = body
        .as_deref()
        .and_then(server_error_message)
        .unwrap_or_else(|| format!("status {}", status.as_u16()));
    ChatError::Server(msg)
}

pub(crate) fn server_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::config::BackendConfig;
    use paper_core::chat::UploadError;

    #[test]
    fn server_error_message_reads_the_error_field() {
        assert_eq!(
            server_error_message("{\"error\":\"no documents ingested\"}"),
            Some("no documents ingested".to_string())
        );
        assert_eq!(server_error_message("{\"detail\":\"other\"}"), None);
        assert_eq!(server_error_message("not json"), None);
    }

    #[test]
    fn status_mapping_falls_back_to_the_status_code() {
        let err = map_status_err(StatusCode::BAD_GATEWAY, Some("<html>".into()));
        match err {
            ChatError::Server(msg) => assert_eq!(msg, "status 502"),
            other => panic!("expected Server, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejected_file_never_touches_the_network() {
        // Unroutable base: any attempted request would surface as Network.
        let cfg = BackendConfig {
            base_url: "http://192.0.2.1:9".into(),
            ..BackendConfig::default()
        };
        let backend = Backend::new(cfg).expect("client build");
        let file = PdfFile {
            path: "screenshot.png".into(),
            media_type: "image/png".into(),
            size: 12,
        };
        match backend.upload_pdf(&file).await {
            Err(UploadError::InvalidType(_)) => {}
            other => panic!("expected InvalidType, got {:?}", other),
        }
    }
}
