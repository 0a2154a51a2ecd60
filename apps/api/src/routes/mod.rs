pub mod enhance;
pub mod form;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Uploads larger than this are rejected before the handler runs.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(form::form_handler))
        .route("/health", get(health::health_handler))
        .route("/api/v1/enhance", post(enhance::handle_enhance))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::llm_client::{Enhancer, LlmError};
    use crate::loader::test_fixtures::pdf_with_pages;
    use crate::loader::DocumentLoader;
    use crate::pipeline::test_enhancers::{EchoEnhancer, FailingEnhancer};
    use crate::pipeline::Pipeline;
    use crate::render::test_converters::{FailingConverter, RecordingConverter};
    use crate::render::{PdfConverter, Renderer};

    const BOUNDARY: &str = "cv-enhancer-test-boundary";

    fn test_state(
        enhancer: Arc<dyn Enhancer>,
        converter: Arc<dyn PdfConverter>,
        output_dir: &Path,
    ) -> AppState {
        let output_dir = output_dir.display().to_string();
        let config = Config::from_lookup(|key| match key {
            "OUTPUT_DIR" => Some(output_dir.clone()),
            "LOGO_PATH" => Some(String::new()),
            _ => None,
        })
        .unwrap();
        let pipeline = Pipeline::new(
            DocumentLoader::new(Duration::from_secs(5)).unwrap(),
            enhancer,
            Renderer::new(converter).unwrap(),
            config.logo_path.clone(),
        );
        AppState {
            config,
            pipeline: Arc::new(pipeline),
        }
    }

    struct FilePart<'a> {
        name: &'a str,
        content_type: &'a str,
        data: Vec<u8>,
    }

    fn multipart_request(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> Request<Body> {
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(file) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    file.name, file.content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(&file.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/v1/enhance")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn cv_pdf() -> FilePart<'static> {
        FilePart {
            name: "cv.pdf",
            content_type: "application/pdf",
            data: pdf_with_pages(&[&["John Doe", "Acme Corp, 2019-2022"]]),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(
            Arc::new(EchoEnhancer::default()),
            Arc::new(RecordingConverter::default()),
            dir.path(),
        ));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_form_page_served() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(
            Arc::new(EchoEnhancer::default()),
            Arc::new(RecordingConverter::default()),
            dir.path(),
        ));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page = String::from_utf8_lossy(&bytes);
        assert!(page.contains("action=\"/api/v1/enhance\""));
        assert!(page.contains("name=\"job_description\""));
    }

    #[tokio::test]
    async fn test_enhance_upload_returns_html() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(
            Arc::new(EchoEnhancer::default()),
            Arc::new(RecordingConverter::default()),
            dir.path(),
        ));

        let request = multipart_request(
            &[
                ("job_description", "Rust backend engineer"),
                ("focus_areas", "Rust, Kafka"),
                ("include_metrics", "on"),
            ],
            Some(cv_pdf()),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert!(body["enhanced_text"].as_str().unwrap().contains("Acme Corp"));
        assert!(body["html"].as_str().unwrap().contains("Acme Corp"));
        assert_eq!(body["is_pdf"], false);
        assert!(body.get("pdf_base64").is_none());
        assert!(body.get("warning").is_none());

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_enhance_leaves_no_artifacts_behind() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(
            Arc::new(EchoEnhancer::default()),
            Arc::new(RecordingConverter::default()),
            dir.path(),
        );

        for _ in 0..3 {
            let request = multipart_request(
                &[("job_description", "Rust engineer"), ("generate_pdf", "true")],
                Some(cv_pdf()),
            );
            let response = build_router(state.clone()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["is_pdf"], true);
        }

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_enhance_unusable_output_dir_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let app = build_router(test_state(
            Arc::new(EchoEnhancer::default()),
            Arc::new(RecordingConverter::default()),
            &blocker,
        ));

        let request = multipart_request(&[("job_description", "Rust engineer")], Some(cv_pdf()));
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"]["code"], "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_enhance_with_pdf_returns_base64() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(
            Arc::new(EchoEnhancer::default()),
            Arc::new(RecordingConverter::default()),
            dir.path(),
        ));

        let request = multipart_request(
            &[("job_description", "Rust engineer"), ("generate_pdf", "true")],
            Some(cv_pdf()),
        );
        let body = json_body(app.oneshot(request).await.unwrap()).await;
        assert_eq!(body["is_pdf"], true);
        let pdf = BASE64
            .decode(body["pdf_base64"].as_str().unwrap())
            .unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_enhance_pdf_failure_is_success_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(
            Arc::new(EchoEnhancer::default()),
            Arc::new(FailingConverter),
            dir.path(),
        ));

        let request = multipart_request(
            &[("job_description", "Rust engineer"), ("generate_pdf", "on")],
            Some(cv_pdf()),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["is_pdf"], false);
        assert!(body["warning"].as_str().is_some());
        assert!(!body["html"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enhance_validation_errors() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(
            Arc::new(EchoEnhancer::default()),
            Arc::new(RecordingConverter::default()),
            dir.path(),
        );

        let cases = [
            multipart_request(&[("job_description", "  ")], Some(cv_pdf())),
            multipart_request(&[("job_description", "Rust engineer")], None),
            multipart_request(
                &[
                    ("job_description", "Rust engineer"),
                    ("url", "https://example.com/cv"),
                ],
                Some(cv_pdf()),
            ),
            multipart_request(
                &[
                    ("job_description", "Rust engineer"),
                    ("url", "/etc/cv.pdf"),
                ],
                None,
            ),
            multipart_request(
                &[("job_description", "Rust engineer"), ("generate_pdf", "maybe")],
                Some(cv_pdf()),
            ),
        ];

        for request in cases {
            let response = build_router(state.clone()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_enhance_unsupported_upload_is_415() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(
            Arc::new(EchoEnhancer::default()),
            Arc::new(RecordingConverter::default()),
            dir.path(),
        ));

        let request = multipart_request(
            &[("job_description", "Rust engineer")],
            Some(FilePart {
                name: "cv.txt",
                content_type: "text/plain",
                data: b"John Doe".to_vec(),
            }),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json_body(response).await["error"]["code"], "UNSUPPORTED_FORMAT");
    }

    #[tokio::test]
    async fn test_enhance_auth_failure_is_401_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(
            Arc::new(FailingEnhancer(|| LlmError::Auth("no credential".to_string()))),
            Arc::new(RecordingConverter::default()),
            dir.path(),
        ));

        let request = multipart_request(&[("job_description", "Rust engineer")], Some(cv_pdf()));
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["code"], "AUTH_ERROR");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
