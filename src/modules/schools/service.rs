use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};

use crate::modules::users::model::{User, UserDto, role_names};
use crate::modules::users::service::UserService;
use crate::utils::email::EmailService;
use crate::utils::errors::AppError;
use crate::utils::password::{generate_random_password, hash_password};

use super::model::{CreateSchoolDto, School, SchoolUsersByRole, SchoolWithManager, UpdateSchoolDto};

pub struct SchoolService;

impl SchoolService {
    /// Creates a school. When no manager is supplied a dedicated
    /// school_manager account (user + role link + profile) is created in
    /// the same transaction, so a school is never observable without a
    /// manager. The generated credentials are emailed after commit,
    /// best-effort.
    #[instrument(skip(db, email, dto), fields(school.unique_id = %dto.school_unique_id))]
    pub async fn create_school(
        db: &PgPool,
        email: &EmailService,
        dto: CreateSchoolDto,
    ) -> Result<School, AppError> {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM schools WHERE school_unique_id = $1",
        )
        .bind(&dto.school_unique_id)
        .fetch_one(db)
        .await?;
        if existing > 0 {
            return Err(AppError::conflict(anyhow!(
                "A school with unique id '{}' already exists",
                dto.school_unique_id
            )));
        }

        let mut tx = db.begin().await?;

        let mut manager_credentials: Option<(String, String, String)> = None;

        let manager_id = match dto.manager_id {
            Some(id) => {
                let exists =
                    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = $1")
                        .bind(id)
                        .fetch_one(&mut *tx)
                        .await?;
                if exists == 0 {
                    return Err(AppError::not_found(anyhow!(
                        "Manager user with ID {} not found",
                        id
                    )));
                }
                id
            }
            None => {
                let manager_email = derive_manager_email(&dto.school_unique_id, &dto.school_email);
                let password = generate_random_password();
                let hashed = hash_password(&password)?;

                let manager = sqlx::query_as::<_, User>(
                    "INSERT INTO users (first_name, last_name, email, password, status, is_verified)
                     VALUES ($1, $2, $3, $4, 'ACTIVE', TRUE)
                     RETURNING *",
                )
                .bind(&dto.school_name)
                .bind("Manager")
                .bind(&manager_email)
                .bind(&hashed)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    if let sqlx::Error::Database(db_err) = &e
                        && db_err.is_unique_violation()
                    {
                        return AppError::conflict(anyhow!(
                            "A user with email {} already exists",
                            manager_email
                        ));
                    }
                    AppError::from(e)
                })?;

                sqlx::query(
                    "INSERT INTO user_roles (user_id, role_id)
                     SELECT $1, id FROM roles WHERE name = $2",
                )
                .bind(manager.id)
                .bind(role_names::SCHOOL_MANAGER)
                .execute(&mut *tx)
                .await?;

                sqlx::query("INSERT INTO user_profiles (user_id, bio) VALUES ($1, $2)")
                    .bind(manager.id)
                    .bind(format!("Manager of {}", dto.school_name))
                    .execute(&mut *tx)
                    .await?;

                warn!(
                    manager.email = %manager_email,
                    "Auto-created school manager account; credentials sent by email"
                );
                manager_credentials =
                    Some((manager_email, manager.first_name.clone(), password));
                manager.id
            }
        };

        let school = sqlx::query_as::<_, School>(
            "INSERT INTO schools (
                school_unique_id, school_name, school_address, school_email,
                school_phone, school_region, school_city, school_district,
                school_logo, latitude, longitude, school_type, education_level,
                curriculum, manager_id
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING *",
        )
        .bind(&dto.school_unique_id)
        .bind(&dto.school_name)
        .bind(&dto.school_address)
        .bind(&dto.school_email)
        .bind(&dto.school_phone)
        .bind(&dto.school_region)
        .bind(&dto.school_city)
        .bind(&dto.school_district)
        .bind(&dto.school_logo)
        .bind(dto.latitude)
        .bind(dto.longitude)
        .bind(&dto.school_type)
        .bind(&dto.education_level)
        .bind(&dto.curriculum)
        .bind(manager_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict(anyhow!(
                    "A school with unique id '{}' already exists",
                    dto.school_unique_id
                ));
            }
            AppError::from(e)
        })?;

        sqlx::query(
            "INSERT INTO user_schools (user_id, school_id, role)
             VALUES ($1, $2, 'school_manager')
             ON CONFLICT (user_id, school_id) DO UPDATE SET role = 'school_manager'",
        )
        .bind(manager_id)
        .bind(school.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if let Some((to_email, first_name, password)) = manager_credentials {
            email.send_in_background(move |svc| async move {
                svc.send_welcome_email(&to_email, &first_name, &password).await
            });
        }

        info!(
            school.id = school.id,
            school.name = %school.school_name,
            manager.id = manager_id,
            "School created"
        );
        Ok(school)
    }

    #[instrument(skip(db))]
    pub async fn get_all_schools(db: &PgPool) -> Result<Vec<SchoolWithManager>, AppError> {
        let schools =
            sqlx::query_as::<_, School>("SELECT * FROM schools ORDER BY created_at DESC")
                .fetch_all(db)
                .await?;

        let mut result = Vec::with_capacity(schools.len());
        for school in schools {
            let manager = Self::load_manager(db, school.manager_id).await?;
            result.push(SchoolWithManager { school, manager });
        }
        Ok(result)
    }

    #[instrument(skip(db))]
    pub async fn get_school_by_id(db: &PgPool, school_id: i64) -> Result<SchoolWithManager, AppError> {
        let school = Self::find_school(db, school_id).await?;
        let manager = Self::load_manager(db, school.manager_id).await?;
        Ok(SchoolWithManager { school, manager })
    }

    pub async fn find_school(db: &PgPool, school_id: i64) -> Result<School, AppError> {
        sqlx::query_as::<_, School>("SELECT * FROM schools WHERE id = $1")
            .bind(school_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("School not found")))
    }

    async fn load_manager(db: &PgPool, manager_id: Option<i64>) -> Result<Option<UserDto>, AppError> {
        let Some(id) = manager_id else {
            return Ok(None);
        };
        match UserService::find_user(db, id).await {
            Ok(user) => Ok(Some(UserService::build_user_dto(db, user).await?)),
            Err(_) => Ok(None),
        }
    }

    /// Partial field update. Invariants beyond the store's constraints are
    /// not re-validated here.
    #[instrument(skip(db, patch))]
    pub async fn update_school(
        db: &PgPool,
        school_id: i64,
        patch: UpdateSchoolDto,
    ) -> Result<School, AppError> {
        let school = sqlx::query_as::<_, School>(
            "UPDATE schools SET
                school_name = COALESCE($1, school_name),
                school_address = COALESCE($2, school_address),
                school_email = COALESCE($3, school_email),
                school_phone = COALESCE($4, school_phone),
                school_region = COALESCE($5, school_region),
                school_city = COALESCE($6, school_city),
                school_district = COALESCE($7, school_district),
                school_logo = COALESCE($8, school_logo),
                latitude = COALESCE($9, latitude),
                longitude = COALESCE($10, longitude),
                school_type = COALESCE($11, school_type),
                education_level = COALESCE($12, education_level),
                curriculum = COALESCE($13, curriculum),
                status = COALESCE($14, status),
                updated_at = NOW()
             WHERE id = $15
             RETURNING *",
        )
        .bind(&patch.school_name)
        .bind(&patch.school_address)
        .bind(&patch.school_email)
        .bind(&patch.school_phone)
        .bind(&patch.school_region)
        .bind(&patch.school_city)
        .bind(&patch.school_district)
        .bind(&patch.school_logo)
        .bind(patch.latitude)
        .bind(patch.longitude)
        .bind(&patch.school_type)
        .bind(&patch.education_level)
        .bind(&patch.curriculum)
        .bind(&patch.status)
        .bind(school_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("School not found")))?;

        debug!(school.id = school_id, "School updated");
        Ok(school)
    }

    /// Deleting a school is blocked while it owns classes or still has
    /// students or employees registered to it. On success the
    /// dedicated manager account (profile + role links + user) is removed
    /// in the same transaction, unless that manager is still linked to
    /// another school.
    #[instrument(skip(db))]
    pub async fn delete_school(db: &PgPool, school_id: i64) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let school = sqlx::query_as::<_, School>("SELECT * FROM schools WHERE id = $1")
            .bind(school_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("School not found")))?;

        let class_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM classes WHERE school_id = $1")
                .bind(school_id)
                .fetch_one(&mut *tx)
                .await?;
        if class_count > 0 {
            return Err(AppError::precondition(anyhow!(
                "Cannot delete school '{}' while it owns {} class(es)",
                school.school_name,
                class_count
            )));
        }

        let student_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE school_id = $1")
                .bind(school_id)
                .fetch_one(&mut *tx)
                .await?;
        if student_count > 0 {
            return Err(AppError::precondition(anyhow!(
                "Cannot delete school '{}' while {} student(s) are registered to it",
                school.school_name,
                student_count
            )));
        }

        let employee_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE school_id = $1")
                .bind(school_id)
                .fetch_one(&mut *tx)
                .await?;
        if employee_count > 0 {
            return Err(AppError::precondition(anyhow!(
                "Cannot delete school '{}' while {} employee(s) are registered to it",
                school.school_name,
                employee_count
            )));
        }

        sqlx::query("DELETE FROM schools WHERE id = $1")
            .bind(school_id)
            .execute(&mut *tx)
            .await?;

        if let Some(manager_id) = school.manager_id {
            let remaining_links = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM user_schools WHERE user_id = $1",
            )
            .bind(manager_id)
            .fetch_one(&mut *tx)
            .await?;

            if remaining_links == 0 {
                sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
                    .bind(manager_id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
                    .bind(manager_id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("DELETE FROM users WHERE id = $1")
                    .bind(manager_id)
                    .execute(&mut *tx)
                    .await?;
                debug!(manager.id = manager_id, "Cascaded manager account removal");
            } else {
                debug!(
                    manager.id = manager_id,
                    remaining_links, "Manager kept, still linked elsewhere"
                );
            }
        }

        tx.commit().await?;

        info!(school.id = school_id, school.name = %school.school_name, "School deleted");
        Ok(())
    }

    /// Returns the users of the caller's school grouped by role. Fails
    /// with an authorization error when the caller is not a registered
    /// school manager.
    #[instrument(skip(db))]
    pub async fn get_school_users_by_role(
        db: &PgPool,
        manager_user_id: i64,
    ) -> Result<SchoolUsersByRole, AppError> {
        let school_id = sqlx::query_scalar::<_, i64>(
            "SELECT school_id FROM user_schools
             WHERE user_id = $1 AND role = 'school_manager'
             LIMIT 1",
        )
        .bind(manager_user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::forbidden("Caller is not a registered school manager"))?;

        let school = Self::find_school(db, school_id).await?;

        let teachers = Self::users_with_role_in_school(db, school_id, role_names::TEACHER).await?;
        let managers =
            Self::users_with_role_in_school(db, school_id, role_names::SCHOOL_MANAGER).await?;

        let student_users = sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u
             INNER JOIN students st ON st.user_id = u.id
             WHERE st.school_id = $1
             ORDER BY u.id",
        )
        .bind(school_id)
        .fetch_all(db)
        .await?;

        let parent_users = sqlx::query_as::<_, User>(
            "SELECT DISTINCT u.* FROM users u
             INNER JOIN parents p ON p.user_id = u.id
             INNER JOIN parent_students ps ON ps.parent_id = p.id
             INNER JOIN students st ON st.id = ps.student_id
             WHERE st.school_id = $1",
        )
        .bind(school_id)
        .fetch_all(db)
        .await?;

        let mut students = Vec::with_capacity(student_users.len());
        for user in student_users {
            students.push(UserService::build_user_dto(db, user).await?);
        }
        let mut parents = Vec::with_capacity(parent_users.len());
        for user in parent_users {
            parents.push(UserService::build_user_dto(db, user).await?);
        }

        Ok(SchoolUsersByRole {
            school_id,
            school_name: school.school_name,
            teachers,
            students,
            parents,
            managers,
        })
    }

    async fn users_with_role_in_school(
        db: &PgPool,
        school_id: i64,
        role: &str,
    ) -> Result<Vec<UserDto>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u
             INNER JOIN user_schools us ON us.user_id = u.id
             INNER JOIN user_roles ur ON ur.user_id = u.id
             INNER JOIN roles r ON r.id = ur.role_id
             WHERE us.school_id = $1 AND r.name = $2
             ORDER BY u.id",
        )
        .bind(school_id)
        .bind(role)
        .fetch_all(db)
        .await?;

        let mut dtos = Vec::with_capacity(users.len());
        for user in users {
            dtos.push(UserService::build_user_dto(db, user).await?);
        }
        Ok(dtos)
    }
}

/// Manager accounts created alongside a school get a derived address:
/// `manager.<school unique id>@<school email domain>`.
fn derive_manager_email(school_unique_id: &str, school_email: &str) -> String {
    let domain = school_email.split('@').nth(1).unwrap_or("ehtimami.com");
    format!(
        "manager.{}@{}",
        school_unique_id.to_lowercase().replace(' ', "-"),
        domain
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_manager_email_uses_school_domain() {
        let email = derive_manager_email("SCH-1", "contact@riyadh1.edu.sa");
        assert_eq!(email, "manager.sch-1@riyadh1.edu.sa");
    }

    #[test]
    fn test_derive_manager_email_falls_back_on_bad_address() {
        let email = derive_manager_email("SCH-2", "broken");
        assert_eq!(email, "manager.sch-2@ehtimami.com");
    }
}
