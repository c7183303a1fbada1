//! Router configuration for the web server.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use super::handlers;
use super::{AppState, MAX_UPLOAD_BYTES};

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // HTML form
        .route("/", get(handlers::index))
        .route("/process", post(handlers::process_form))
        // JSON / CSV API
        .route("/api/process", post(handlers::process_api))
        // Multipart framing needs a little room above the file itself
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use invex_core::{InvexConfig, InvoicePipeline, PipelineOptions};
    use tower::ServiceExt;

    const BOUNDARY: &str = "invex-test-boundary";

    const INVOICE: &str = "\
Acme Supplies Ltd
Invoice #INV-1001
Date: 2024-01-15

Description        Qty    Unit Price    Amount
Widget               2        100.00    200.00
Shipping             1         45.00     45.00

Total: $245.00
";

    fn app() -> Router {
        let pipeline = InvoicePipeline::new(InvexConfig::default(), PipelineOptions::default());
        create_router(AppState::new(pipeline))
    }

    fn multipart_body(file_name: Option<&str>, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(name) = file_name {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"use_llm\"\r\n\r\non\r\n").as_bytes(),
        );
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload(uri: &str, file_name: Option<&str>, content: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(file_name, content)))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_index_form() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_text(response).await;
        assert!(html.contains("enctype=\"multipart/form-data\""));
        // No credential configured, so no LLM switch
        assert!(!html.contains("name=\"use_llm\""));
    }

    #[tokio::test]
    async fn test_form_upload_shows_results() {
        let response = app()
            .oneshot(upload("/process", Some("invoice.txt"), INVOICE.as_bytes()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_text(response).await;
        assert!(html.contains("Extracted 2 items from invoice.txt"));
        assert!(html.contains("<td>INV-1001</td>"));
        assert!(html.contains("href=\"data:text/csv;base64,"));
        assert!(html.contains("download=\"invoice.csv\""));
    }

    #[tokio::test]
    async fn test_form_upload_reports_failed_stage() {
        let response = app()
            .oneshot(upload("/process", Some("scan.pdf"), b"definitely not a pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_text(response).await;
        assert!(html.contains("normalize stage failed"));
        // The empty row keeps the table shape
        assert!(html.contains("<th>invoice_number</th>"));
    }

    #[tokio::test]
    async fn test_api_json() {
        let response = app()
            .oneshot(upload("/api/process?format=json", Some("invoice.txt"), INVOICE.as_bytes()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let value: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(value["record"]["invoice_number"], "INV-1001");
        assert_eq!(value["record"]["line_items"].as_array().unwrap().len(), 2);
        assert_eq!(value["format"], "text");
        assert!(value["error"].is_null());
    }

    #[tokio::test]
    async fn test_api_csv() {
        let response = app()
            .oneshot(upload("/api/process?format=csv", Some("invoice.txt"), INVOICE.as_bytes()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );

        let csv = body_text(response).await;
        assert!(csv.starts_with("invoice_number,date,vendor,description"));
        assert_eq!(csv.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_api_input_error_status() {
        let response = app()
            .oneshot(upload("/api/process", Some("photo.png"), b"\x89PNG\r\n\x1a\n"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let value: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(value["error"].as_str().unwrap().contains("unsupported format"));
        assert!(value["record"]["total"].is_null());
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let response = app()
            .oneshot(upload("/api/process", None, b""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_truncated_body_reports_cause() {
        let mut body = multipart_body(Some("invoice.txt"), INVOICE.as_bytes());
        // Drop the closing delimiter
        body.truncate(body.len() - format!("--{BOUNDARY}--\r\n").len());
        let request = Request::builder()
            .method("POST")
            .uri("/api/process")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let text = body_text(response).await;
        assert!(text.contains("Failed to read upload"));
        assert!(!text.contains("No file uploaded"));
    }

    #[tokio::test]
    async fn test_oversize_upload_is_rejected() {
        let content = vec![b'a'; MAX_UPLOAD_BYTES + 128 * 1024];
        let response = app()
            .oneshot(upload("/api/process", Some("big.txt"), &content))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
