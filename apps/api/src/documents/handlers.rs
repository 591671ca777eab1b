use axum::extract::Multipart;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::documents::{extract_document, ParsedDocument};
use crate::errors::AppError;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct ParseResumeResponse {
    pub success: bool,
    #[serde(flatten)]
    pub document: ParsedDocument,
}

/// POST /api/parse-resume
pub async fn handle_parse_resume(
    mut multipart: Multipart,
) -> Result<Json<ParseResumeResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;

        let document = extract_document(bytes, &file_name)
            .await
            .inspect_err(|e| warn!("Resume parsing failed for {file_name}: {e}"))?;

        return Ok(Json(ParseResumeResponse {
            success: true,
            document,
        }));
    }

    Err(AppError::Validation("No file provided".to_string()))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::jobs::store::JobStore;
    use crate::outreach::orchestrator::tests::{orchestrator_with, ScriptedRunner};
    use crate::routes::build_router;
    use crate::state::AppState;

    const BOUNDARY: &str = "coldreach-boundary";

    fn upload(field: &str, file_name: &str, contents: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {contents}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/parse-resume")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let app = build_router(AppState {
            jobs: JobStore::new(),
            orchestrator: orchestrator_with(ScriptedRunner::replying("")),
        });
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_parse_txt_upload() {
        let (status, body) = send(upload("file", "cv.txt", "  Jane Doe\nRust  ")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["text"], "Jane Doe\nRust");
        assert_eq!(body["fileName"], "cv.txt");
        assert_eq!(body["fileType"], "txt");
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_rejected() {
        let (status, body) = send(upload("file", "cv.rtf", "x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Unsupported file type: rtf");
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let (status, body) = send(upload("attachment", "cv.txt", "x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "No file provided");
    }
}
