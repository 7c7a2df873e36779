use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct School {
    pub id: i64,
    pub school_unique_id: String,
    pub school_name: String,
    pub school_address: String,
    pub school_email: String,
    pub school_phone: Option<String>,
    pub school_region: Option<String>,
    pub school_city: Option<String>,
    pub school_district: Option<String>,
    pub school_logo: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub school_type: String,
    pub education_level: String,
    pub curriculum: String,
    pub status: String,
    pub manager_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const SCHOOL_TYPES: &[&str] = &["PUBLIC", "PRIVATE", "INTERNATIONAL"];
pub const EDUCATION_LEVELS: &[&str] = &["KINDERGARTEN", "PRIMARY", "INTERMEDIATE", "SECONDARY"];
pub const CURRICULA: &[&str] = &["SAUDI_NATIONAL", "IB", "AMERICAN", "BRITISH"];

fn validate_school_type(value: &str) -> Result<(), validator::ValidationError> {
    if SCHOOL_TYPES.contains(&value) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("school_type"))
    }
}

fn validate_education_level(value: &str) -> Result<(), validator::ValidationError> {
    if EDUCATION_LEVELS.contains(&value) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("education_level"))
    }
}

fn validate_curriculum(value: &str) -> Result<(), validator::ValidationError> {
    if CURRICULA.contains(&value) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("curriculum"))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSchoolDto {
    #[validate(length(min = 1, message = "School unique id is required"))]
    pub school_unique_id: String,
    #[validate(length(min = 1, message = "School name is required"))]
    pub school_name: String,
    #[validate(length(min = 1, message = "School address is required"))]
    pub school_address: String,
    #[validate(email(message = "A valid school email is required"))]
    pub school_email: String,
    pub school_phone: Option<String>,
    pub school_region: Option<String>,
    pub school_city: Option<String>,
    pub school_district: Option<String>,
    #[validate(url(message = "School logo must be a valid URL"))]
    pub school_logo: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[validate(custom(function = "validate_school_type", message = "Invalid school type"))]
    pub school_type: String,
    #[validate(custom(
        function = "validate_education_level",
        message = "Invalid education level"
    ))]
    pub education_level: String,
    #[validate(custom(function = "validate_curriculum", message = "Invalid curriculum"))]
    pub curriculum: String,
    /// Existing user to install as manager. When absent a dedicated
    /// school_manager account is created inside the same transaction.
    pub manager_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSchoolDto {
    pub school_name: Option<String>,
    pub school_address: Option<String>,
    #[validate(email(message = "A valid school email is required"))]
    pub school_email: Option<String>,
    pub school_phone: Option<String>,
    pub school_region: Option<String>,
    pub school_city: Option<String>,
    pub school_district: Option<String>,
    pub school_logo: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub school_type: Option<String>,
    pub education_level: Option<String>,
    pub curriculum: Option<String>,
    pub status: Option<String>,
}

/// School plus its manager, the shape reads return.
#[derive(Debug, Serialize, ToSchema)]
pub struct SchoolWithManager {
    #[serde(flatten)]
    pub school: School,
    pub manager: Option<crate::modules::users::model::UserDto>,
}

/// Users of a school grouped by role membership.
#[derive(Debug, Serialize, ToSchema)]
pub struct SchoolUsersByRole {
    pub school_id: i64,
    pub school_name: String,
    pub teachers: Vec<crate::modules::users::model::UserDto>,
    pub students: Vec<crate::modules::users::model::UserDto>,
    pub parents: Vec<crate::modules::users::model::UserDto>,
    pub managers: Vec<crate::modules::users::model::UserDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_dto() -> CreateSchoolDto {
        CreateSchoolDto {
            school_unique_id: "SCH-1".to_string(),
            school_name: "Riyadh-1".to_string(),
            school_address: "Riyadh".to_string(),
            school_email: "contact@riyadh1.edu.sa".to_string(),
            school_phone: None,
            school_region: None,
            school_city: None,
            school_district: None,
            school_logo: None,
            latitude: None,
            longitude: None,
            school_type: "PUBLIC".to_string(),
            education_level: "PRIMARY".to_string(),
            curriculum: "SAUDI_NATIONAL".to_string(),
            manager_id: None,
        }
    }

    #[test]
    fn test_valid_school_dto() {
        assert!(base_dto().validate().is_ok());
    }

    #[test]
    fn test_invalid_school_type_rejected() {
        let mut dto = base_dto();
        dto.school_type = "HOMESCHOOL".to_string();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut dto = base_dto();
        dto.school_email = "not-an-email".to_string();
        assert!(dto.validate().is_err());
    }
}
