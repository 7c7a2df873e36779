use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::modules::schools::model::School;
use crate::modules::users::model::{ClassSummary, ProfileInput, UserDto};

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Student {
    pub id: i64,
    pub user_id: i64,
    pub school_id: i64,
    pub student_no: String,
    pub grade: String,
    pub section: Option<String>,
    pub main_class_id: Option<i64>,
    pub admission_date: Option<NaiveDate>,
    pub health_notes: Option<String>,
    pub is_special_needs: bool,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parent details supplied inline with a student payload. Matched against
/// existing users by email; unmatched entries get a new account.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ParentInfoDto {
    #[validate(length(min = 1, message = "Parent first name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Parent last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Parent email must be a valid email address"))]
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    /// A secure random password is generated when omitted.
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub phone: Option<String>,
    pub school_id: i64,
    #[validate(length(min = 1, message = "Grade is required"))]
    pub grade: String,
    pub section: Option<String>,
    #[validate(length(min = 1, message = "Student number is required"))]
    pub student_no: String,
    pub admission_date: Option<NaiveDate>,
    pub health_notes: Option<String>,
    #[serde(default)]
    pub is_special_needs: bool,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    #[validate(nested)]
    pub profile: Option<ProfileInput>,
    #[serde(default)]
    pub class_ids: Vec<i64>,
    #[validate(nested)]
    #[serde(default)]
    pub parents: Vec<ParentInfoDto>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub last_name: Option<String>,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub grade: Option<String>,
    pub section: Option<String>,
    pub student_no: Option<String>,
    pub school_id: Option<i64>,
    pub admission_date: Option<NaiveDate>,
    pub health_notes: Option<String>,
    pub is_special_needs: Option<bool>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    #[validate(nested)]
    pub profile: Option<ProfileInput>,
    /// When present, replaces the student's enrollments wholesale.
    pub class_ids: Option<Vec<i64>>,
    #[validate(nested)]
    pub parents: Option<Vec<ParentInfoDto>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ConnectParentsDto {
    #[validate(length(min = 1, message = "At least one parent user id is required"))]
    pub parent_user_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ParentSummary {
    pub parent_id: i64,
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentWithRelations {
    #[serde(flatten)]
    pub student: Student,
    pub user: UserDto,
    pub school: Option<School>,
    pub classes: Vec<ClassSummary>,
    pub parents: Vec<ParentSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_student_dto_minimal() {
        let dto: CreateStudentDto = serde_json::from_value(serde_json::json!({
            "first_name": "Sara",
            "last_name": "Alqahtani",
            "email": "sara@example.com",
            "school_id": 1,
            "grade": "4",
            "student_no": "STU-0042"
        }))
        .unwrap();
        assert!(dto.validate().is_ok());
        assert!(dto.password.is_none());
        assert!(dto.class_ids.is_empty());
        assert!(!dto.is_special_needs);
    }

    #[test]
    fn test_create_student_dto_rejects_bad_parent_email() {
        let dto: CreateStudentDto = serde_json::from_value(serde_json::json!({
            "first_name": "Sara",
            "last_name": "Alqahtani",
            "email": "sara@example.com",
            "school_id": 1,
            "grade": "4",
            "student_no": "STU-0042",
            "parents": [{
                "first_name": "Omar",
                "last_name": "Alqahtani",
                "email": "not-an-email"
            }]
        }))
        .unwrap();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_connect_parents_dto_requires_ids() {
        let dto = ConnectParentsDto { parent_user_ids: vec![] };
        assert!(dto.validate().is_err());
    }
}
