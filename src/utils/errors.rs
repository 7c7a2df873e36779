use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application error carrying the HTTP status it should surface as.
///
/// Services construct these with the helpers below; the `IntoResponse`
/// impl renders the uniform `{status, message}` error envelope. Internal
/// errors are logged with full detail and surfaced with a generic message.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    pub fn unprocessable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    /// Uniqueness violation: duplicate email, class code, student number.
    pub fn conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::CONFLICT, err)
    }

    /// Structural invariant blocks the operation (school owns classes,
    /// role still has users).
    pub fn precondition<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::PRECONDITION_FAILED, err)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, anyhow::anyhow!(message.into()))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, anyhow::anyhow!(message.into()))
    }

    pub fn database<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.error, "Internal server error");
            "An unexpected error occurred.".to_string()
        } else {
            self.error.to_string()
        };

        let body = Json(json!({
            "status": self.status.as_u16(),
            "message": message,
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_status() {
        let err = AppError::conflict(anyhow::anyhow!("Class code already exists"));
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_precondition_status() {
        let err = AppError::precondition(anyhow::anyhow!("Role still has users"));
        assert_eq!(err.status, StatusCode::PRECONDITION_FAILED);
    }

    #[test]
    fn test_forbidden_from_str() {
        let err = AppError::forbidden("Only the school manager can do this");
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.error.to_string(), "Only the school manager can do this");
    }

    #[test]
    fn test_from_sqlx_error_is_internal() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
