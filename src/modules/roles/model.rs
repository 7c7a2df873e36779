use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct RoleWithUserCount {
    pub id: i64,
    pub name: String,
    pub user_count: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRoleDto {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Role name must be between 1 and 100 characters"
    ))]
    pub name: String,
}
