//! Document ingestion handlers

use crate::handlers::AppState;
use crate::service::BatchSummary;
use axum::extract::{Multipart, State};
use axum::Json;
use docforge_common::{AppError, Result};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

/// File extensions accepted for upload
const SUPPORTED_EXTENSIONS: [&str; 3] = ["md", "txt", "html"];

#[derive(Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub document_uri: String,
    pub chunks_created: usize,
    pub message: String,
}

/// POST /ingest
///
/// Accepts multipart form data with one of three sources, in order of
/// precedence: `text_content` (inline text), `file` (upload), or
/// `document_uri` (server-local path). An optional `metadata` field
/// carries a JSON object attached to every chunk.
pub async fn ingest_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let mut text_content: Option<String> = None;
    let mut document_uri: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut metadata = json!({});

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text_content" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid text_content: {e}")))?;
                text_content = Some(value);
            }
            "document_uri" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid document_uri: {e}")))?;
                document_uri = Some(value);
            }
            "file" => {
                let filename = field.file_name().unwrap_or("upload.txt").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
                file = Some((filename, bytes.to_vec()));
            }
            "metadata" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid metadata: {e}")))?;
                metadata = parse_metadata(&raw);
            }
            other => {
                warn!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    let (uri, chunks_created) = match select_source(text_content, file, document_uri)? {
        DocumentSource::Inline { uri, text } => {
            let count = state.service.ingest_text(&uri, &text, metadata).await?;
            (uri, count)
        }
        DocumentSource::Upload { filename, bytes } => {
            if let Some(obj) = metadata.as_object_mut() {
                obj.insert("filename".to_string(), json!(filename));
            }
            let text = String::from_utf8_lossy(&bytes);
            let count = state.service.ingest_text(&filename, &text, metadata).await?;
            (filename, count)
        }
        DocumentSource::Path(path) => {
            let count = state.service.ingest_path(&path, metadata).await?;
            (path, count)
        }
    };

    Ok(Json(IngestResponse {
        success: true,
        document_uri: uri.clone(),
        chunks_created,
        message: format!("Successfully ingested {chunks_created} chunks from {uri}"),
    }))
}

/// POST /ingest/batch
///
/// Takes a JSON array of document paths and ingests each one,
/// reporting per-document success or failure.
pub async fn ingest_batch(
    State(state): State<AppState>,
    Json(uris): Json<Vec<String>>,
) -> Json<BatchSummary> {
    Json(state.service.ingest_batch(uris).await)
}

/// Content source resolved from the multipart fields
#[derive(Debug, PartialEq)]
enum DocumentSource {
    Inline { uri: String, text: String },
    Upload { filename: String, bytes: Vec<u8> },
    Path(String),
}

/// Pick the content source. Precedence when several are present:
/// inline text, then file upload, then server-local path.
fn select_source(
    text_content: Option<String>,
    file: Option<(String, Vec<u8>)>,
    document_uri: Option<String>,
) -> Result<DocumentSource> {
    if let Some(text) = text_content {
        return Ok(DocumentSource::Inline {
            uri: document_uri.unwrap_or_else(|| "direct_input".to_string()),
            text,
        });
    }
    if let Some((filename, bytes)) = file {
        if !is_supported_extension(&filename) {
            return Err(AppError::UnsupportedFileType(filename));
        }
        return Ok(DocumentSource::Upload { filename, bytes });
    }
    if let Some(path) = document_uri {
        return Ok(DocumentSource::Path(path));
    }
    Err(AppError::Validation(
        "Provide one of: file, document_uri, or text_content".to_string(),
    ))
}

/// Unparseable metadata degrades to an empty object rather than
/// rejecting the whole upload.
fn parse_metadata(raw: &str) -> serde_json::Value {
    match serde_json::from_str(raw) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        Ok(_) | Err(_) => {
            warn!("Metadata was not a JSON object, using empty metadata");
            json!({})
        }
    }
}

fn is_supported_extension(filename: &str) -> bool {
    filename
        .rsplit('.')
        .next()
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::IngestService;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use docforge_common::config::ChunkingConfig;
    use docforge_common::{ChunkStore, NewChunk, Result};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Accepts every insert without persisting anything.
    struct NullStore;

    #[async_trait]
    impl ChunkStore for NullStore {
        async fn insert_chunk(&self, _chunk: &NewChunk) -> Result<()> {
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    fn test_app() -> Router {
        let state = AppState {
            service: IngestService::new(Arc::new(NullStore), ChunkingConfig::default()),
        };
        Router::new()
            .route("/ingest", post(ingest_document))
            .with_state(state)
    }

    fn multipart_request(fields: &[(&str, &str)]) -> Request<Body> {
        let boundary = "docforge-test-boundary";
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));

        Request::builder()
            .method("POST")
            .uri("/ingest")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn empty_text_content_succeeds_with_zero_chunks() {
        let response = test_app()
            .oneshot(multipart_request(&[("text_content", "   ")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["chunks_created"], 0);
        assert_eq!(body["document_uri"], "direct_input");
    }

    #[tokio::test]
    async fn missing_source_is_a_bad_request() {
        let response = test_app()
            .oneshot(multipart_request(&[("metadata", "{}")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["error"]["status"], 400);
    }

    #[test]
    fn inline_text_takes_precedence_over_other_sources() {
        let source = select_source(
            Some("the text".to_string()),
            Some(("notes.md".to_string(), b"file body".to_vec())),
            Some("/some/path.txt".to_string()),
        )
        .unwrap();
        assert_eq!(
            source,
            DocumentSource::Inline {
                uri: "/some/path.txt".to_string(),
                text: "the text".to_string(),
            }
        );
    }

    #[test]
    fn upload_takes_precedence_over_path() {
        let source = select_source(
            None,
            Some(("notes.md".to_string(), b"file body".to_vec())),
            Some("/some/path.txt".to_string()),
        )
        .unwrap();
        assert!(matches!(source, DocumentSource::Upload { .. }));
    }

    #[test]
    fn inline_text_without_uri_is_labeled_direct_input() {
        let source = select_source(Some("the text".to_string()), None, None).unwrap();
        assert_eq!(
            source,
            DocumentSource::Inline {
                uri: "direct_input".to_string(),
                text: "the text".to_string(),
            }
        );
    }

    #[test]
    fn no_source_is_a_validation_error() {
        let err = select_source(None, None, None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn unsupported_upload_extension_is_rejected() {
        let err = select_source(None, Some(("report.pdf".to_string(), Vec::new())), None)
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType(_)));
    }

    #[test]
    fn accepts_known_extensions() {
        assert!(is_supported_extension("notes.md"));
        assert!(is_supported_extension("readme.TXT"));
        assert!(is_supported_extension("page.html"));
    }

    #[test]
    fn rejects_unknown_extensions() {
        assert!(!is_supported_extension("binary.pdf"));
        assert!(!is_supported_extension("archive.tar.gz"));
        assert!(!is_supported_extension("noextension"));
    }

    #[test]
    fn metadata_parses_json_objects() {
        let value = parse_metadata(r#"{"source": "test"}"#);
        assert_eq!(value["source"], "test");
    }

    #[test]
    fn bad_metadata_defaults_to_empty_object() {
        assert_eq!(parse_metadata("not json"), json!({}));
        assert_eq!(parse_metadata("[1, 2, 3]"), json!({}));
        assert_eq!(parse_metadata("42"), json!({}));
    }
}
