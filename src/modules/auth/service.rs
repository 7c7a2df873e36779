use anyhow::anyhow;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::jwt::JwtConfig;
use crate::modules::users::model::{User, UserDto, user_status};
use crate::modules::users::service::UserService;
use crate::utils::email::EmailService;
use crate::utils::errors::AppError;
use crate::utils::jwt::create_access_token;
use crate::utils::password::{hash_password, verify_password};

use super::model::{LoginResponse, RegisterRequest, ResetPasswordRequest};

const RESET_TOKEN_TTL_MINUTES: i64 = 30;

pub struct AuthService;

impl AuthService {
    /// Registers a user with the given roles. Accounts start INACTIVE and
    /// unverified until an admin verifies them.
    #[instrument(skip(db, req), fields(user.email = %req.email))]
    pub async fn register(db: &PgPool, req: RegisterRequest) -> Result<UserDto, AppError> {
        let email_taken =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
                .bind(&req.email)
                .fetch_one(db)
                .await?;
        if email_taken > 0 {
            return Err(AppError::conflict(anyhow!(
                "A user with email {} already exists",
                req.email
            )));
        }

        let valid_role_ids =
            sqlx::query_scalar::<_, i64>("SELECT id FROM roles WHERE id = ANY($1)")
                .bind(&req.role_ids)
                .fetch_all(db)
                .await?;
        let invalid: Vec<String> = req
            .role_ids
            .iter()
            .filter(|id| !valid_role_ids.contains(id))
            .map(|id| id.to_string())
            .collect();
        if !invalid.is_empty() {
            return Err(AppError::unprocessable(anyhow!(
                "Invalid role IDs: {}",
                invalid.join(", ")
            )));
        }

        let hashed = hash_password(&req.password)?;

        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (first_name, last_name, email, password, status, is_verified)
             VALUES ($1, $2, $3, $4, $5, FALSE)
             RETURNING *",
        )
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(&req.email)
        .bind(&hashed)
        .bind(user_status::INACTIVE)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id)
             SELECT $1, rid FROM UNNEST($2::bigint[]) AS rid",
        )
        .bind(user.id)
        .bind(&req.role_ids)
        .execute(&mut *tx)
        .await?;

        if req.bio.is_some() || req.avatar.is_some() {
            sqlx::query("INSERT INTO user_profiles (user_id, bio, avatar) VALUES ($1, $2, $3)")
                .bind(user.id)
                .bind(&req.bio)
                .bind(&req.avatar)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(user.id = user.id, "User registered");
        UserService::build_user_dto(db, user).await
    }

    /// Verifies the credentials and issues a JWT carrying the user's role
    /// names. Unknown email and wrong password are indistinguishable to the
    /// caller.
    #[instrument(skip(db, jwt_config, password))]
    pub async fn login(
        db: &PgPool,
        jwt_config: &JwtConfig,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

        if !verify_password(password, &user.password)? {
            warn!(user.id = user.id, "Failed login attempt");
            return Err(AppError::unauthorized("Invalid credentials"));
        }

        let roles = UserService::get_role_names(db, user.id).await?;
        let token =
            create_access_token(user.id, &user.email, roles, user.is_verified, jwt_config)?;

        debug!(user.id = user.id, "User logged in");
        Ok(LoginResponse { token })
    }

    /// Issues a single-use reset token valid for 30 minutes. Any earlier
    /// tokens for the user are superseded. The reset link is emailed after
    /// the token is stored.
    #[instrument(skip(db, email_svc))]
    pub async fn request_password_reset(
        db: &PgPool,
        email_svc: &EmailService,
        email: &str,
    ) -> Result<(), AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("No user found with this email")))?;

        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user.id)
        .bind(&token)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let to_email = user.email.clone();
        let first_name = user.first_name.clone();
        email_svc.send_in_background(move |svc| async move {
            svc.send_password_reset_email(&to_email, &first_name, &token)
                .await
        });

        info!(user.id = user.id, "Password reset requested");
        Ok(())
    }

    /// Consumes a reset token: checks expiry, stores the new password hash
    /// and deletes the token so it cannot be replayed.
    #[instrument(skip(db, email_svc, req))]
    pub async fn reset_password_with_token(
        db: &PgPool,
        email_svc: &EmailService,
        req: ResetPasswordRequest,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let row = sqlx::query_as::<_, ResetTokenRow>(
            "SELECT prt.user_id, prt.expires_at, u.email, u.first_name
             FROM password_reset_tokens prt
             INNER JOIN users u ON u.id = prt.user_id
             WHERE prt.token = $1",
        )
        .bind(&req.token)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::bad_request(anyhow!("Invalid or expired token")))?;

        if row.expires_at < Utc::now() {
            return Err(AppError::bad_request(anyhow!("Invalid or expired token")));
        }

        let hashed = hash_password(&req.new_password)?;

        sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(&hashed)
            .bind(row.user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM password_reset_tokens WHERE token = $1")
            .bind(&req.token)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        email_svc.send_in_background(move |svc| async move {
            svc.send_password_reset_confirmation(&row.email, &row.first_name)
                .await
        });

        info!(user.id = row.user_id, "Password reset completed");
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ResetTokenRow {
    user_id: i64,
    expires_at: chrono::DateTime<Utc>,
    email: String,
    first_name: String,
}
