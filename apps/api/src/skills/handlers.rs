use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::extraction::DocumentKind;
use crate::skills::pipeline::extract_resume_info;
use crate::state::AppState;
use crate::worker::WorkerError;

const FILE_FIELD: &str = "file";
const UNKNOWN_FILENAME: &str = "unknown";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub extension: String,
    pub skills: Vec<String>,
    pub is_resume: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadFailure {
    pub filename: String,
    pub extension: String,
    pub skills: Vec<String>,
    pub error: String,
    pub ai_raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_used: Option<String>,
}

struct Upload {
    filename: String,
    bytes: Bytes,
}

/// POST /upload
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let multipart =
        multipart.map_err(|e| AppError::BadRequest(format!("Failed to read uploaded file: {e}")))?;
    let upload = read_upload(multipart).await?;

    let filename = upload.filename;
    let extension = DocumentKind::extension_of(&filename);
    let kind = DocumentKind::from_extension(&extension).ok_or_else(|| {
        AppError::BadRequest("Unsupported file type. Use .pdf or .docx".to_string())
    })?;

    // Extraction and the model call share one worker slot.
    let bytes = upload.bytes;
    let pool = state.pool.clone();
    let max_attempts = state.config.max_attempts_per_client;
    let outcome = state
        .workers
        .run(async move {
            let text = tokio::task::spawn_blocking(move || kind.extractor().extract(&bytes))
                .await
                .map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Document parsing task failed: {e}"))
                })??;
            Ok::<_, AppError>(extract_resume_info(&pool, &text, max_attempts).await)
        })
        .await;

    let report = match outcome {
        Ok(result) => result?,
        Err(WorkerError::Failed(e)) => {
            error!("AI parsing worker failed: {e}");
            return Ok(failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                filename,
                extension,
                Vec::new(),
                format!("AI parsing execution failed: {e}"),
                None,
                None,
            ));
        }
        Err(WorkerError::Closed) => {
            error!("AI parser returned no usable result");
            return Ok(failure(
                StatusCode::BAD_GATEWAY,
                filename,
                extension,
                Vec::new(),
                "AI parser returned no usable result".to_string(),
                None,
                None,
            ));
        }
    };

    let record = report.record;
    if let Some(err) = record.error {
        warn!(
            "AI parser reported an error for {filename}: {err} (snippet: {:?})",
            report.snippet
        );
        return Ok(failure(
            StatusCode::BAD_GATEWAY,
            filename,
            extension,
            record.skills,
            format!("AI parsing error: {err}"),
            report.raw,
            report.client_used,
        ));
    }

    info!("Extracted {} skills from {filename}", record.skills.len());
    Ok(Json(UploadResponse {
        filename,
        extension,
        skills: record.skills,
        is_resume: record.is_resume,
    })
    .into_response())
}

/// Picks the `file` field, or failing that the first field that carries a filename.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let read_error = |e: axum::extract::multipart::MultipartError| {
        AppError::BadRequest(format!("Failed to read uploaded file: {e}"))
    };

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        let is_file_field = field.name() == Some(FILE_FIELD);
        if !is_file_field && field.file_name().is_none() {
            continue;
        }
        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_FILENAME)
            .to_string();
        let bytes = field.bytes().await.map_err(read_error)?;
        return Ok(Upload { filename, bytes });
    }

    Err(AppError::BadRequest(
        "Failed to read uploaded file: no file field in request".to_string(),
    ))
}

fn failure(
    status: StatusCode,
    filename: String,
    extension: String,
    skills: Vec<String>,
    error: String,
    ai_raw: Option<String>,
    client_used: Option<String>,
) -> Response {
    let body = UploadFailure {
        filename,
        extension,
        skills,
        error,
        ai_raw,
        client_used,
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::extraction::docx::tests::docx_bytes;
    use crate::llm_client::pool::tests::{pool_of, ScriptedBackend};
    use crate::llm_client::{ChatBackend, ClientPool, LlmError};
    use crate::routes::build_router;
    use crate::state::AppState;
    use crate::worker::WorkerPool;

    const BOUNDARY: &str = "X-SKILL-EXTRACTOR-BOUNDARY";

    fn test_state(pool: ClientPool) -> AppState {
        let config = Config::from_lookup(|_| None).unwrap();
        AppState {
            pool: Arc::new(pool),
            workers: WorkerPool::default(),
            config: Arc::new(config),
        }
    }

    fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn resume_docx() -> Vec<u8> {
        docx_bytes(
            r#"<w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p><w:p><w:r><w:t>Skills: Rust, Kafka</w:t></w:r></w:p>"#,
        )
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_successful_upload() {
        let backend = ScriptedBackend::replying(
            r#"{"skills": ["Rust", "Kafka", "rust"], "is_resume": true, "confidence": 0.93}"#,
        );
        let state = test_state(pool_of(vec![backend]));

        let (status, body) = send(state, multipart_request("file", "Jane.DOCX", &resume_docx())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "filename": "Jane.DOCX",
                "extension": "docx",
                "skills": ["rust", "kafka"],
                "is_resume": true
            })
        );
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_rejected() {
        let state = test_state(ClientPool::new(Vec::new()));
        let (status, body) = send(state, multipart_request("file", "resume.txt", b"hello")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Unsupported file type. Use .pdf or .docx");
        assert_eq!(body["skills"], json!([]));
    }

    #[tokio::test]
    async fn test_malformed_document_is_a_server_error() {
        let state = test_state(ClientPool::new(Vec::new()));
        let (status, body) = send(state, multipart_request("file", "resume.pdf", b"not a pdf")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("PDF parsing failed:"));
    }

    #[tokio::test]
    async fn test_no_configured_clients_is_bad_gateway() {
        let state = test_state(ClientPool::new(Vec::new()));
        let (status, body) = send(state, multipart_request("file", "cv.docx", &resume_docx())).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["skills"], json!([]));
        assert_eq!(body["error"], "AI parsing error: no model response");
        assert_eq!(body["ai_raw"], Value::Null);
        assert!(body.get("client_used").is_none());
    }

    #[tokio::test]
    async fn test_unparseable_model_output_is_bad_gateway_with_raw_text() {
        let backend = ScriptedBackend::replying("Sorry, I can't read this resume.");
        let state = test_state(pool_of(vec![backend]));

        let (status, body) = send(state, multipart_request("file", "cv.docx", &resume_docx())).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "AI parsing error: no JSON object found");
        assert_eq!(body["ai_raw"], "Sorry, I can't read this resume.");
        assert_eq!(body["client_used"], "client1");
        assert_eq!(body["skills"], json!([]));
    }

    #[tokio::test]
    async fn test_closed_worker_pool_is_bad_gateway() {
        let state = test_state(ClientPool::new(Vec::new()));
        state.workers.close();

        let (status, body) = send(state, multipart_request("file", "cv.docx", &resume_docx())).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "AI parser returned no usable result");
        assert_eq!(body["skills"], json!([]));
    }

    #[tokio::test]
    async fn test_closed_worker_pool_does_not_extract() {
        let state = test_state(ClientPool::new(Vec::new()));
        state.workers.close();

        let (status, body) = send(state, multipart_request("file", "cv.pdf", b"not a pdf")).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "AI parser returned no usable result");
    }

    struct PanickingBackend;

    #[async_trait]
    impl ChatBackend for PanickingBackend {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            panic!("backend crashed");
        }
    }

    #[tokio::test]
    async fn test_crashed_worker_is_server_error() {
        let backend: Arc<dyn ChatBackend> = Arc::new(PanickingBackend);
        let state = test_state(ClientPool::new(vec![backend]));

        let (status, body) = send(state, multipart_request("file", "cv.docx", &resume_docx())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("AI parsing execution failed:"));
        assert_eq!(body["skills"], json!([]));
        assert_eq!(body["filename"], "cv.docx");
        assert_eq!(body["ai_raw"], Value::Null);
        assert!(body.get("client_used").is_none());
    }

    #[tokio::test]
    async fn test_first_named_file_is_used_when_field_name_differs() {
        let backend = ScriptedBackend::replying(r#"{"skills": ["Go"], "is_resume": false}"#);
        let state = test_state(pool_of(vec![backend]));

        let (status, body) =
            send(state, multipart_request("resume", "cv.docx", &resume_docx())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["skills"], json!(["go"]));
        assert_eq!(body["is_resume"], false);
    }

    #[tokio::test]
    async fn test_missing_multipart_body_is_rejected() {
        let state = test_state(ClientPool::new(Vec::new()));
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["skills"], json!([]));
    }
}
