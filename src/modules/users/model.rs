use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::modules::schools::model::School;

/// Well-known global role names (seeded by migration).
pub mod role_names {
    pub const ADMIN: &str = "admin";
    pub const TEACHER: &str = "teacher";
    pub const STUDENT: &str = "student";
    pub const PARENT: &str = "parent";
    pub const SCHOOL_MANAGER: &str = "school_manager";
    pub const EMPLOYEE: &str = "employee";
}

/// User lifecycle states. ACTIVE <-> INACTIVE via activate/deactivate;
/// TERMINATED is only reachable by direct store intervention.
pub mod user_status {
    pub const ACTIVE: &str = "ACTIVE";
    pub const INACTIVE: &str = "INACTIVE";
    pub const TERMINATED: &str = "TERMINATED";
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub phone: Option<String>,
    pub status: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub middle_name: Option<String>,
    pub nickname: Option<String>,
    pub occupation: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub marital_status: Option<String>,
    pub nationality: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub join_date: Option<NaiveDate>,
    pub gender: Option<i16>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub social_links: Option<serde_json::Value>,
    pub interests: Option<serde_json::Value>,
    pub emergency_contacts: Option<serde_json::Value>,
    pub profile_visibility: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedUsersResponse {
    pub users: Vec<UserDto>,
    pub meta: crate::utils::pagination::PaginationMeta,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ClassSummary {
    pub id: i64,
    pub name: String,
}

/// API-facing user shape: role names flattened, nested profile, single
/// primary school (first linked school), teacher classes.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserDto {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    pub roles: Vec<String>,
    pub is_verified: bool,
    pub school: Option<School>,
    pub profile: Option<UserProfile>,
    pub classes: Vec<ClassSummary>,
}

/// Nested profile payload shared by the user, student and teacher flows.
/// Shape/range checks only; everything is optional.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ProfileInput {
    pub bio: Option<String>,
    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar: Option<String>,
    pub middle_name: Option<String>,
    pub nickname: Option<String>,
    pub occupation: Option<String>,
    pub company: Option<String>,
    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,
    pub marital_status: Option<String>,
    pub nationality: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub join_date: Option<NaiveDate>,
    #[validate(range(min = 1, max = 3, message = "Gender must be 1, 2 or 3"))]
    pub gender: Option<i16>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub social_links: Option<serde_json::Value>,
    pub interests: Option<serde_json::Value>,
    pub emergency_contacts: Option<serde_json::Value>,
    pub profile_visibility: Option<String>,
}

/// Combined partial update of user scalar fields and the profile sub-entity.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserProfileDto {
    #[validate(length(min = 1, message = "First name must not be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name must not be empty"))]
    pub last_name: Option<String>,
    pub phone: Option<String>,
    #[serde(flatten)]
    #[validate(nested)]
    pub profile: ProfileInput,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyUserDto {
    pub is_verified: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_profile_input_rejects_bad_gender() {
        let input = ProfileInput {
            gender: Some(7),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_profile_input_rejects_bad_avatar_url() {
        let input = ProfileInput {
            avatar: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_user_serialization_skips_password() {
        let user = User {
            id: 1,
            first_name: "Khalid".to_string(),
            last_name: "Ali".to_string(),
            email: "khalid@example.com".to_string(),
            password: "hashed".to_string(),
            phone: None,
            status: user_status::ACTIVE.to_string(),
            is_verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "khalid@example.com");
    }
}
