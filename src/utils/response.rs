use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

/// Success envelope: `{status, message, data}`.
///
/// Errors use the matching `{status, message}` shape from
/// [`crate::utils::errors::AppError`].
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T: Serialize> {
    pub status: u16,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: message.into(),
            data,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED.as_u16(),
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Success envelope without a payload.
pub fn message_response(message: impl Into<String>) -> Response {
    Json(json!({
        "status": 200,
        "message": message.into(),
        "data": null,
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope_shape() {
        let resp = ApiResponse::ok("School created successfully.", json!({"id": 1}));
        let serialized = serde_json::to_value(&resp).unwrap();
        assert_eq!(serialized["status"], 200);
        assert_eq!(serialized["message"], "School created successfully.");
        assert_eq!(serialized["data"]["id"], 1);
    }

    #[test]
    fn test_created_envelope_status() {
        let resp = ApiResponse::created("Created", json!(null));
        assert_eq!(resp.status, 201);
    }
}
