use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::modules::auth::model::Claims;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::verify_token;

/// Extractor that validates the bearer token and exposes the caller's
/// claims (user id, email, role names, verification flag).
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.0.roles.iter().any(|r| r == role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|r| self.has_role(r))
    }

    pub fn user_id(&self) -> Result<i64, AppError> {
        self.0
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Route-layer guard that restricts a subtree to callers holding at least
/// one of the given role names.
pub async fn require_roles(
    State(state): State<AppState>,
    req: Request,
    next: Next,
    allowed_roles: &[&str],
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await?;

    if !auth_user.has_any_role(allowed_roles) {
        return Err(AppError::forbidden(format!(
            "Access denied. Required roles: {:?}",
            allowed_roles
        )));
    }

    let req = Request::from_parts(parts, body);
    Ok(next.run(req).await)
}

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match require_roles(State(state), req, next, &["admin"]).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

pub async fn require_authenticated(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    match AuthUser::from_request_parts(&mut parts, &state).await {
        Ok(_) => next.run(Request::from_parts(parts, body)).await,
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with_roles(roles: Vec<&str>) -> Claims {
        Claims {
            sub: "42".to_string(),
            email: "test@example.com".to_string(),
            roles: roles.into_iter().map(String::from).collect(),
            is_verified: true,
            exp: 9999999999,
            iat: 1234567890,
        }
    }

    #[test]
    fn test_has_role() {
        let auth_user = AuthUser(claims_with_roles(vec!["teacher", "employee"]));
        assert!(auth_user.has_role("teacher"));
        assert!(!auth_user.has_role("admin"));
    }

    #[test]
    fn test_has_any_role() {
        let auth_user = AuthUser(claims_with_roles(vec!["parent"]));
        assert!(auth_user.has_any_role(&["admin", "parent"]));
        assert!(!auth_user.has_any_role(&["admin", "school_manager"]));
    }

    #[test]
    fn test_user_id_parses_integer_sub() {
        let auth_user = AuthUser(claims_with_roles(vec![]));
        assert_eq!(auth_user.user_id().unwrap(), 42);
    }

    #[test]
    fn test_user_id_rejects_non_numeric_sub() {
        let mut claims = claims_with_roles(vec![]);
        claims.sub = "not-a-number".to_string();
        assert!(AuthUser(claims).user_id().is_err());
    }
}
