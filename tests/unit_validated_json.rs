use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::post,
};
use http_body_util::BodyExt;
use serde::Deserialize;
use tower::util::ServiceExt;
use validator::Validate;

use ehtimami::validator::ValidatedJson;

#[derive(Debug, Deserialize, Validate)]
struct CreateItem {
    #[validate(length(min = 3, message = "Code must be at least 3 characters"))]
    code: String,
    #[validate(email(message = "Email must be a valid email address"))]
    email: String,
}

async fn create_item(ValidatedJson(item): ValidatedJson<CreateItem>) -> String {
    format!("{}:{}", item.code, item.email)
}

fn test_router() -> Router {
    Router::new().route("/items", post(create_item))
}

async fn send(router: Router, body: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/items")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| serde_json::json!(String::from_utf8_lossy(&bytes)));
    (status, value)
}

#[tokio::test]
async fn test_valid_payload_reaches_handler() {
    let (status, body) = send(
        test_router(),
        r#"{"code": "ABC-1", "email": "a@example.com"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!("ABC-1:a@example.com"));
}

#[tokio::test]
async fn test_missing_field_is_bad_request() {
    let (status, body) = send(test_router(), r#"{"code": "ABC-1"}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert_eq!(body["message"], "email is required");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (status, body) = send(test_router(), "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_failed_validation_is_unprocessable() {
    let (status, body) = send(
        test_router(),
        r#"{"code": "AB", "email": "not-an-email"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], 422);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Validation failed:"));
    assert!(message.contains("Code must be at least 3 characters"));
    assert!(message.contains("Email must be a valid email address"));
}
