use super::WizardBackend;
use crate::error::RequestError;
use crate::model::{ProcessRequest, UploadFile, WizardConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

pub struct HttpBackend {
    http: reqwest::Client,
    upload_url: String,
    process_url: String,
}

impl HttpBackend {
    pub fn new(cfg: &WizardConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("build HTTP client")?;
        Ok(Self::with_client(http, cfg))
    }

    pub fn with_client(http: reqwest::Client, cfg: &WizardConfig) -> Self {
        Self {
            http,
            upload_url: cfg.upload_url(),
            process_url: cfg.process_url(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Message from a `{"error": ...}` body, or a generic one naming the status.
fn server_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Unknown error (HTTP {})", status.as_u16()))
}

async fn ensure_success(resp: Response) -> Result<Response, RequestError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.bytes().await.unwrap_or_default();
    Err(RequestError::Server {
        status: status.as_u16(),
        message: server_message(status, &body),
    })
}

#[async_trait]
impl WizardBackend for HttpBackend {
    async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<String>, RequestError> {
        let mut form = Form::new();
        for f in files {
            let mime = f.mime_type();
            let part = Part::stream_with_length(Body::from(f.file), f.len)
                .file_name(f.file_name)
                .mime_str(mime)
                .map_err(RequestError::transport)?;
            form = form.part("file", part);
        }

        debug!(url = %self.upload_url, "uploading");
        let resp = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(RequestError::transport)?;
        let resp = ensure_success(resp).await?;
        resp.json::<Vec<String>>()
            .await
            .map_err(|e| RequestError::Transport(format!("malformed column list: {e}")))
    }

    async fn process(&self, request: &ProcessRequest) -> Result<Bytes, RequestError> {
        debug!(url = %self.process_url, ?request, "processing");
        let resp = self
            .http
            .post(&self.process_url)
            .form(&request.form_pairs())
            .send()
            .await
            .map_err(RequestError::transport)?;
        let resp = ensure_success(resp).await?;
        resp.bytes().await.map_err(RequestError::transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::open_upload_files;
    use crate::model::AggregationChoice;
    use axum::{
        extract::{Multipart, State},
        http::StatusCode,
        routing::post,
        Json, Router,
    };
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    type Seen = Arc<Mutex<Vec<String>>>;

    async fn spawn_server(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    // Local servers only; skip any proxy configured in the environment.
    fn backend(base_url: &str) -> HttpBackend {
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .expect("client");
        HttpBackend::with_client(
            http,
            &WizardConfig {
                base_url: base_url.to_string(),
                upload_path: "/upload".into(),
                process_path: "/process".into(),
                download_dir: PathBuf::from("."),
                user_agent: "sheet-wizard-test".into(),
            },
        )
    }

    async fn record_upload(
        State(seen): State<Seen>,
        mut multipart: Multipart,
    ) -> Json<Vec<String>> {
        while let Ok(Some(field)) = multipart.next_field().await {
            let head = format!(
                "{}={}",
                field.name().unwrap_or_default(),
                field.file_name().unwrap_or_default()
            );
            let body = field.bytes().await.unwrap_or_default();
            let entry = format!("{head}:{}", String::from_utf8_lossy(&body));
            seen.lock().unwrap().push(entry);
        }
        Json(vec!["b".into(), "a".into(), "c".into()])
    }

    async fn record_form(State(seen): State<Seen>, body: String) -> Vec<u8> {
        seen.lock().unwrap().push(body);
        b"PK\x03\x04".to_vec()
    }

    async fn files(dir: &tempfile::TempDir, names: &[&str]) -> Vec<UploadFile> {
        let mut paths = Vec::new();
        for name in names {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("{name}\n")).unwrap();
            paths.push(path);
        }
        open_upload_files(&paths).await.unwrap()
    }

    #[tokio::test]
    async fn upload_sends_one_file_part_per_file() {
        let seen = Seen::default();
        let app = Router::new()
            .route("/upload", post(record_upload))
            .with_state(seen.clone());
        let url = spawn_server(app).await;
        let dir = tempfile::tempdir().unwrap();

        let cols = backend(&url)
            .upload(files(&dir, &["DE.csv", "FR.xlsx"]).await)
            .await
            .expect("upload");
        assert_eq!(cols, ["b", "a", "c"]);
        assert_eq!(
            *seen.lock().unwrap(),
            ["file=DE.csv:DE.csv\n", "file=FR.xlsx:FR.xlsx\n"]
        );
    }

    #[tokio::test]
    async fn upload_rejection_carries_server_message() {
        let app = Router::new().route(
            "/upload",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "Invalid file format: notes.txt"})),
                )
            }),
        );
        let url = spawn_server(app).await;
        let dir = tempfile::tempdir().unwrap();
        let err = backend(&url)
            .upload(files(&dir, &["notes.txt"]).await)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RequestError::Server {
                status: 400,
                message: "Invalid file format: notes.txt".into()
            }
        );
    }

    #[tokio::test]
    async fn malformed_column_list_is_a_transport_error() {
        let app = Router::new().route("/upload", post(|| async { Json(json!({"cols": 1})) }));
        let url = spawn_server(app).await;
        let dir = tempfile::tempdir().unwrap();
        let err = backend(&url)
            .upload(files(&dir, &["a.csv"]).await)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Transport(ref m) if m.contains("malformed")));
    }

    #[tokio::test]
    async fn process_posts_url_encoded_form() {
        let seen = Seen::default();
        let app = Router::new()
            .route("/process", post(record_form))
            .with_state(seen.clone());
        let url = spawn_server(app).await;

        let req = ProcessRequest {
            columns: vec!["x".into(), "y".into()],
            group_by: vec!["x".into()],
            aggregations: vec![AggregationChoice::sum("y")],
            order_by: Some("y".into()),
            column_order: vec!["y".into(), "x".into()],
        };
        let body = backend(&url).process(&req).await.expect("process");
        assert_eq!(&body[..], b"PK\x03\x04");
        assert_eq!(
            seen.lock().unwrap()[0],
            "columns=x&columns=y&group_by=x&aggregations=y%3Asum&order_by=y&column_order=y&column_order=x"
        );
    }

    #[tokio::test]
    async fn empty_process_request_is_well_formed() {
        let seen = Seen::default();
        let app = Router::new()
            .route("/process", post(record_form))
            .with_state(seen.clone());
        let url = spawn_server(app).await;

        backend(&url)
            .process(&ProcessRequest::default())
            .await
            .expect("process");
        assert_eq!(seen.lock().unwrap()[0], "order_by=");
    }

    #[tokio::test]
    async fn process_error_message_is_surfaced() {
        let app = Router::new().route(
            "/process",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "bad column"})),
                )
            }),
        );
        let url = spawn_server(app).await;
        let err = backend(&url)
            .process(&ProcessRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bad column");
    }

    #[tokio::test]
    async fn non_json_error_falls_back_to_generic_message() {
        let app = Router::new().route(
            "/process",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let url = spawn_server(app).await;
        let err = backend(&url)
            .process(&ProcessRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown error (HTTP 502)");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        let err = backend(&format!("http://{addr}"))
            .process(&ProcessRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Transport(_)));
    }

    #[test]
    fn server_message_ignores_blank_error_field() {
        assert_eq!(
            server_message(StatusCode::BAD_REQUEST, br#"{"error": ""}"#),
            "Unknown error (HTTP 400)"
        );
        assert_eq!(
            server_message(StatusCode::BAD_REQUEST, br#"{"error": "No files uploaded"}"#),
            "No files uploaded"
        );
    }
}
