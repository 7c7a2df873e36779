use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::modules::users::model::{User, UserDto, role_names, user_status};
use crate::modules::users::service::{UserService, grant_role, upsert_profile};
use crate::utils::email::EmailService;
use crate::utils::errors::AppError;
use crate::utils::password::{generate_random_password, hash_password};

use super::model::{AssignClassesDto, RegisterTeacherDto, UpdateTeacherDto};

pub struct TeacherService;

impl TeacherService {
    /// Registers a teacher: user account with a generated password, teacher
    /// role, school link and profile in one transaction. The credentials go
    /// out by email after commit; a failed send never fails registration.
    #[instrument(skip(db, email, dto), fields(teacher.email = %dto.email))]
    pub async fn register_teacher(
        db: &PgPool,
        email: &EmailService,
        dto: RegisterTeacherDto,
    ) -> Result<UserDto, AppError> {
        let email_taken =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
                .bind(&dto.email)
                .fetch_one(db)
                .await?;
        if email_taken > 0 {
            return Err(AppError::conflict(anyhow!(
                "A user with email {} already exists",
                dto.email
            )));
        }

        let school_name = sqlx::query_scalar::<_, String>(
            "SELECT school_name FROM schools WHERE id = $1",
        )
        .bind(dto.school_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("School not found")))?;

        let password = generate_random_password();
        let hashed = hash_password(&password)?;
        let phone = dto.phone.as_ref().map(|p| p.replace(char::is_whitespace, ""));

        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (first_name, last_name, email, password, phone, status, is_verified)
             VALUES ($1, $2, $3, $4, $5, $6, FALSE)
             RETURNING *",
        )
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.email)
        .bind(&hashed)
        .bind(&phone)
        .bind(user_status::ACTIVE)
        .fetch_one(&mut *tx)
        .await?;

        grant_role(&mut tx, user.id, role_names::TEACHER).await?;

        sqlx::query(
            "INSERT INTO user_schools (user_id, school_id, role) VALUES ($1, $2, 'teacher')
             ON CONFLICT (user_id, school_id) DO NOTHING",
        )
        .bind(user.id)
        .bind(dto.school_id)
        .execute(&mut *tx)
        .await?;

        let mut profile = dto.profile.unwrap_or_default();
        if profile.bio.is_none() {
            profile.bio = Some(format!("Teacher at {school_name}"));
        }
        upsert_profile(&mut tx, user.id, &profile).await?;

        tx.commit().await?;

        let to_email = user.email.clone();
        let first_name = user.first_name.clone();
        email.send_in_background(move |svc| async move {
            svc.send_welcome_email(&to_email, &first_name, &password).await
        });

        info!(teacher.id = user.id, school.id = dto.school_id, "Teacher registered");
        UserService::build_user_dto(db, user).await
    }

    /// Bulk-links a teacher to classes. Duplicate links are ignored; every
    /// class must belong to one of the teacher's schools.
    #[instrument(skip(db, dto), fields(teacher.id = dto.teacher_id))]
    pub async fn assign_teacher_to_classes(
        db: &PgPool,
        dto: AssignClassesDto,
    ) -> Result<(), AppError> {
        Self::require_teacher(db, dto.teacher_id).await?;

        let found = sqlx::query_scalar::<_, i64>("SELECT id FROM classes WHERE id = ANY($1)")
            .bind(&dto.class_ids)
            .fetch_all(db)
            .await?;
        let missing: Vec<String> = dto
            .class_ids
            .iter()
            .filter(|id| !found.contains(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::unprocessable(anyhow!(
                "Invalid class IDs: {}",
                missing.join(", ")
            )));
        }

        let outside = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM classes c
             WHERE c.id = ANY($1)
               AND c.school_id NOT IN (
                   SELECT school_id FROM user_schools WHERE user_id = $2
               )",
        )
        .bind(&dto.class_ids)
        .bind(dto.teacher_id)
        .fetch_one(db)
        .await?;
        if outside > 0 {
            return Err(AppError::unprocessable(anyhow!(
                "All classes must belong to one of the teacher's schools"
            )));
        }

        sqlx::query(
            "INSERT INTO class_teachers (teacher_id, class_id)
             SELECT $1, cid FROM UNNEST($2::bigint[]) AS cid
             ON CONFLICT (teacher_id, class_id) DO NOTHING",
        )
        .bind(dto.teacher_id)
        .bind(&dto.class_ids)
        .execute(db)
        .await?;

        debug!(
            teacher.id = dto.teacher_id,
            classes = dto.class_ids.len(),
            "Teacher assigned to classes"
        );
        Ok(())
    }

    /// Sparse update split between user scalar fields and the profile;
    /// only provided keys are written.
    #[instrument(skip(db, patch))]
    pub async fn update_teacher(
        db: &PgPool,
        teacher_id: i64,
        patch: UpdateTeacherDto,
    ) -> Result<UserDto, AppError> {
        Self::require_teacher(db, teacher_id).await?;

        let mut tx = db.begin().await?;

        if let Some(new_email) = &patch.email {
            let taken = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM users WHERE email = $1 AND id != $2",
            )
            .bind(new_email)
            .bind(teacher_id)
            .fetch_one(&mut *tx)
            .await?;
            if taken > 0 {
                return Err(AppError::conflict(anyhow!(
                    "A user with email {} already exists",
                    new_email
                )));
            }
        }

        let phone = patch.phone.as_ref().map(|p| p.replace(char::is_whitespace, ""));

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET
                first_name = COALESCE($1, first_name),
                last_name = COALESCE($2, last_name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                updated_at = NOW()
             WHERE id = $5
             RETURNING *",
        )
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(&patch.email)
        .bind(&phone)
        .bind(teacher_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(school_id) = patch.school_id {
            let exists =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schools WHERE id = $1")
                    .bind(school_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if exists == 0 {
                return Err(AppError::not_found(anyhow!("School not found")));
            }
            sqlx::query(
                "INSERT INTO user_schools (user_id, school_id, role) VALUES ($1, $2, 'teacher')
                 ON CONFLICT (user_id, school_id) DO NOTHING",
            )
            .bind(teacher_id)
            .bind(school_id)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(profile) = &patch.profile {
            upsert_profile(&mut tx, teacher_id, profile).await?;
        }

        tx.commit().await?;

        debug!(teacher.id = teacher_id, "Teacher updated");
        UserService::build_user_dto(db, user).await
    }

    /// Transactional cascade: class links, school links, profile, role
    /// links and the user record.
    #[instrument(skip(db))]
    pub async fn delete_teacher(db: &PgPool, teacher_id: i64) -> Result<(), AppError> {
        Self::require_teacher(db, teacher_id).await?;

        let mut tx = db.begin().await?;

        sqlx::query("DELETE FROM class_teachers WHERE teacher_id = $1")
            .bind(teacher_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_schools WHERE user_id = $1")
            .bind(teacher_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
            .bind(teacher_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(teacher_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(teacher_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(teacher.id = teacher_id, "Teacher deleted");
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn get_all_teachers(db: &PgPool) -> Result<Vec<UserDto>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u
             INNER JOIN user_roles ur ON ur.user_id = u.id
             INNER JOIN roles r ON r.id = ur.role_id
             WHERE r.name = $1
             ORDER BY u.id",
        )
        .bind(role_names::TEACHER)
        .fetch_all(db)
        .await?;

        let mut dtos = Vec::with_capacity(users.len());
        for user in users {
            dtos.push(UserService::build_user_dto(db, user).await?);
        }
        Ok(dtos)
    }

    #[instrument(skip(db))]
    pub async fn get_teachers_by_school(
        db: &PgPool,
        school_id: i64,
    ) -> Result<Vec<UserDto>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u
             INNER JOIN user_roles ur ON ur.user_id = u.id
             INNER JOIN roles r ON r.id = ur.role_id
             INNER JOIN user_schools us ON us.user_id = u.id
             WHERE r.name = $1 AND us.school_id = $2
             ORDER BY u.id",
        )
        .bind(role_names::TEACHER)
        .bind(school_id)
        .fetch_all(db)
        .await?;

        let mut dtos = Vec::with_capacity(users.len());
        for user in users {
            dtos.push(UserService::build_user_dto(db, user).await?);
        }
        Ok(dtos)
    }

    #[instrument(skip(db))]
    pub async fn get_teacher_by_id(db: &PgPool, teacher_id: i64) -> Result<UserDto, AppError> {
        let user = Self::require_teacher(db, teacher_id).await?;
        UserService::build_user_dto(db, user).await
    }

    /// Looks up the user and confirms the teacher role.
    async fn require_teacher(db: &PgPool, teacher_id: i64) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(teacher_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Teacher not found")))?;

        let roles = UserService::get_role_names(db, user.id).await?;
        if !roles.iter().any(|r| r == role_names::TEACHER) {
            return Err(AppError::unprocessable(anyhow!(
                "User with ID {} is not a teacher",
                teacher_id
            )));
        }
        Ok(user)
    }
}
