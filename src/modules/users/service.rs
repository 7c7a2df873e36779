use anyhow::anyhow;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, instrument};

use crate::modules::schools::model::School;
use crate::utils::errors::AppError;
use crate::utils::pagination::{PaginationMeta, PaginationParams};

use super::model::{ClassSummary, ProfileInput, UpdateUserProfileDto, User, UserDto, UserProfile};

pub struct UserService;

impl UserService {
    #[instrument(skip(db, params))]
    pub async fn get_all_users(
        db: &PgPool,
        params: &PaginationParams,
    ) -> Result<(Vec<UserDto>, PaginationMeta), AppError> {
        let limit = params.limit();
        let offset = params.offset();

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await?;

        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        let mut dtos = Vec::with_capacity(users.len());
        for user in users {
            dtos.push(Self::build_user_dto(db, user).await?);
        }

        let meta = PaginationMeta {
            total,
            limit,
            offset,
            has_more: offset + (dtos.len() as i64) < total,
        };
        Ok((dtos, meta))
    }

    #[instrument(skip(db))]
    pub async fn get_user_by_id(db: &PgPool, user_id: i64) -> Result<UserDto, AppError> {
        let user = Self::find_user(db, user_id).await?;
        Self::build_user_dto(db, user).await
    }

    pub async fn find_user(db: &PgPool, user_id: i64) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    pub async fn get_role_names(db: &PgPool, user_id: i64) -> Result<Vec<String>, AppError> {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT r.name FROM roles r
             INNER JOIN user_roles ur ON ur.role_id = r.id
             WHERE ur.user_id = $1
             ORDER BY r.name",
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(roles)
    }

    /// Hydrates the API-facing shape: role names, profile, primary school
    /// (first linked school), teacher classes. Sequential queries plus
    /// in-memory assembly, the relational equivalent of a nested include.
    pub async fn build_user_dto(db: &PgPool, user: User) -> Result<UserDto, AppError> {
        let roles = Self::get_role_names(db, user.id).await?;

        let profile =
            sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = $1")
                .bind(user.id)
                .fetch_optional(db)
                .await?;

        let school = sqlx::query_as::<_, School>(
            "SELECT s.* FROM schools s
             INNER JOIN user_schools us ON us.school_id = s.id
             WHERE us.user_id = $1
             ORDER BY us.id
             LIMIT 1",
        )
        .bind(user.id)
        .fetch_optional(db)
        .await?;

        let classes = sqlx::query_as::<_, (i64, String)>(
            "SELECT c.id, c.name FROM classes c
             INNER JOIN class_teachers ct ON ct.class_id = c.id
             WHERE ct.teacher_id = $1
             ORDER BY c.id",
        )
        .bind(user.id)
        .fetch_all(db)
        .await?
        .into_iter()
        .map(|(id, name)| ClassSummary { id, name })
        .collect();

        Ok(UserDto {
            user_id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            status: user.status,
            roles,
            is_verified: user.is_verified,
            school,
            profile,
            classes,
        })
    }

    #[instrument(skip(db))]
    pub async fn verify_user_by_id(
        db: &PgPool,
        user_id: i64,
        is_verified: bool,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET is_verified = $1, updated_at = NOW()
             WHERE id = $2
             RETURNING *",
        )
        .bind(is_verified)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

        info!(user.id = user_id, is_verified, "User verification flag updated");
        Ok(user)
    }

    /// Combined partial update of user scalars and the profile sub-entity.
    /// Phone uniqueness across other users is checked inside the
    /// transaction before any write.
    #[instrument(skip(db, dto))]
    pub async fn update_user_profile(
        db: &PgPool,
        user_id: i64,
        dto: UpdateUserProfileDto,
    ) -> Result<UserDto, AppError> {
        let mut tx = db.begin().await?;

        let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

        if let Some(phone) = &dto.phone {
            let taken = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM users WHERE phone = $1 AND id != $2",
            )
            .bind(phone)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
            if taken > 0 {
                return Err(AppError::conflict(anyhow!(
                    "Phone number {} is already in use",
                    phone
                )));
            }
        }

        sqlx::query(
            "UPDATE users SET
                first_name = COALESCE($1, first_name),
                last_name = COALESCE($2, last_name),
                phone = COALESCE($3, phone),
                updated_at = NOW()
             WHERE id = $4",
        )
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.phone)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        upsert_profile(&mut tx, user_id, &dto.profile).await?;

        tx.commit().await?;

        debug!(user.id = existing.id, "User profile updated");
        Self::get_user_by_id(db, user_id).await
    }
}

/// Creates or sparsely updates the user's profile row. Only provided keys
/// are written; the profile is created on first touch (the User owns it).
pub async fn upsert_profile(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    profile: &ProfileInput,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO user_profiles (
            user_id, bio, avatar, middle_name, nickname, occupation, company,
            website, marital_status, nationality, birth_date, join_date,
            gender, address, latitude, longitude, social_links, interests,
            emergency_contacts, profile_visibility
         )
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                 $15, $16, $17, $18, $19, COALESCE($20, 'public'))
         ON CONFLICT (user_id) DO UPDATE SET
            bio = COALESCE(EXCLUDED.bio, user_profiles.bio),
            avatar = COALESCE(EXCLUDED.avatar, user_profiles.avatar),
            middle_name = COALESCE(EXCLUDED.middle_name, user_profiles.middle_name),
            nickname = COALESCE(EXCLUDED.nickname, user_profiles.nickname),
            occupation = COALESCE(EXCLUDED.occupation, user_profiles.occupation),
            company = COALESCE(EXCLUDED.company, user_profiles.company),
            website = COALESCE(EXCLUDED.website, user_profiles.website),
            marital_status = COALESCE(EXCLUDED.marital_status, user_profiles.marital_status),
            nationality = COALESCE(EXCLUDED.nationality, user_profiles.nationality),
            birth_date = COALESCE(EXCLUDED.birth_date, user_profiles.birth_date),
            join_date = COALESCE(EXCLUDED.join_date, user_profiles.join_date),
            gender = COALESCE(EXCLUDED.gender, user_profiles.gender),
            address = COALESCE(EXCLUDED.address, user_profiles.address),
            latitude = COALESCE(EXCLUDED.latitude, user_profiles.latitude),
            longitude = COALESCE(EXCLUDED.longitude, user_profiles.longitude),
            social_links = COALESCE(EXCLUDED.social_links, user_profiles.social_links),
            interests = COALESCE(EXCLUDED.interests, user_profiles.interests),
            emergency_contacts = COALESCE(EXCLUDED.emergency_contacts, user_profiles.emergency_contacts),
            profile_visibility = COALESCE($20, user_profiles.profile_visibility),
            updated_at = NOW()",
    )
    .bind(user_id)
    .bind(&profile.bio)
    .bind(&profile.avatar)
    .bind(&profile.middle_name)
    .bind(&profile.nickname)
    .bind(&profile.occupation)
    .bind(&profile.company)
    .bind(&profile.website)
    .bind(&profile.marital_status)
    .bind(&profile.nationality)
    .bind(profile.birth_date)
    .bind(profile.join_date)
    .bind(profile.gender)
    .bind(&profile.address)
    .bind(profile.latitude)
    .bind(profile.longitude)
    .bind(&profile.social_links)
    .bind(&profile.interests)
    .bind(&profile.emergency_contacts)
    .bind(&profile.profile_visibility)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Grants a role by name if the user does not already hold it.
pub async fn grant_role(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    role_name: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         SELECT $1, id FROM roles WHERE name = $2
         ON CONFLICT (user_id, role_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(role_name)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
