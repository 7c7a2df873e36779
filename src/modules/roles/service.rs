use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::utils::errors::AppError;

use super::model::{CreateRoleDto, Role, RoleWithUserCount};

pub struct RoleService;

impl RoleService {
    #[instrument(skip(db))]
    pub async fn get_all_roles_with_user_count(
        db: &PgPool,
    ) -> Result<Vec<RoleWithUserCount>, AppError> {
        let roles = sqlx::query_as::<_, RoleWithUserCount>(
            "SELECT r.id, r.name, COUNT(ur.id) AS user_count
             FROM roles r
             LEFT JOIN user_roles ur ON ur.role_id = r.id
             GROUP BY r.id, r.name
             ORDER BY r.id",
        )
        .fetch_all(db)
        .await?;

        Ok(roles)
    }

    #[instrument(skip(db))]
    pub async fn create_role(db: &PgPool, dto: CreateRoleDto) -> Result<Role, AppError> {
        let role = sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(&dto.name)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                warn!(role.name = %dto.name, "Attempted to create duplicate role");
                return AppError::conflict(anyhow!("Role '{}' already exists", dto.name));
            }
            AppError::from(e)
        })?;

        info!(role.id = role.id, role.name = %role.name, "Role created");
        Ok(role)
    }

    /// A role can only be deleted while no user holds it.
    #[instrument(skip(db))]
    pub async fn delete_role(db: &PgPool, role_id: i64) -> Result<(), AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name, created_at FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Role not found")))?;

        let user_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_roles WHERE role_id = $1",
        )
        .bind(role_id)
        .fetch_one(db)
        .await?;

        if user_count > 0 {
            return Err(AppError::precondition(anyhow!(
                "Cannot delete role '{}' while {} user(s) hold it",
                role.name,
                user_count
            )));
        }

        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id)
            .execute(db)
            .await?;

        info!(role.id = role_id, role.name = %role.name, "Role deleted");
        Ok(())
    }
}
