use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::modules::schools::model::School;

pub const CLASS_STATUSES: &[&str] = &["active", "inactive"];

pub fn validate_class_status(status: &str) -> Result<(), validator::ValidationError> {
    if CLASS_STATUSES.contains(&status) {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("class_status");
        err.message = Some("status must be one of: active, inactive".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Class {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub grade_level: String,
    pub subject: Option<String>,
    pub semester: Option<i32>,
    pub academic_year: Option<String>,
    pub teaching_method: Option<String>,
    pub capacity: i32,
    pub max_students: i32,
    pub room_number: String,
    pub class_logo: Option<String>,
    pub status: String,
    /// Day name to "HH:MM-HH:MM" range.
    pub schedule: serde_json::Value,
    /// Derived from `schedule`: the days that have a non-empty time range.
    pub days_of_week: serde_json::Value,
    pub credits: Option<i32>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub school_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateClassDto {
    #[validate(length(min = 3, message = "Class code must be at least 3 characters"))]
    pub code: String,
    #[validate(length(min = 1, message = "Class name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Grade level is required"))]
    pub grade_level: String,
    pub subject: Option<String>,
    #[validate(range(min = 1, max = 4, message = "Semester must be between 1 and 4"))]
    pub semester: Option<i32>,
    pub academic_year: Option<String>,
    pub teaching_method: Option<String>,
    #[validate(range(min = 1, message = "Capacity must be positive"))]
    pub capacity: Option<i32>,
    #[validate(range(min = 1, message = "max_students must be positive"))]
    pub max_students: Option<i32>,
    pub room_number: Option<String>,
    pub class_logo: Option<String>,
    #[validate(custom(function = "validate_class_status"))]
    #[serde(default = "default_class_status")]
    pub status: String,
    /// Day name to "HH:MM-HH:MM"; empty values mean no lesson that day.
    pub schedule: Option<BTreeMap<String, String>>,
    pub credits: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub school_id: i64,
    pub teacher_id: Option<i64>,
    #[serde(default)]
    pub student_ids: Vec<i64>,
}

fn default_class_status() -> String {
    "active".to_string()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateClassDto {
    #[validate(length(min = 1, message = "Class name cannot be empty"))]
    pub name: Option<String>,
    pub grade_level: Option<String>,
    pub subject: Option<String>,
    pub semester: Option<i32>,
    pub academic_year: Option<String>,
    pub teaching_method: Option<String>,
    #[validate(range(min = 1, message = "Capacity must be positive"))]
    pub capacity: Option<i32>,
    pub max_students: Option<i32>,
    pub room_number: Option<String>,
    pub class_logo: Option<String>,
    #[validate(custom(function = "validate_class_status"))]
    pub status: Option<String>,
    pub schedule: Option<BTreeMap<String, String>>,
    pub credits: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub school_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignTeacherDto {
    #[validate(range(min = 1, message = "teacher_id must be positive"))]
    pub teacher_id: i64,
}

/// Teacher row as embedded in class responses.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ClassTeacherSummary {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar: Option<String>,
}

/// Enrolled student row as embedded in class responses.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct EnrolledStudentSummary {
    pub student_id: i64,
    pub user_id: i64,
    pub student_no: String,
    pub grade: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_main_class: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClassWithRelations {
    #[serde(flatten)]
    pub class: Class,
    pub school: Option<School>,
    pub teachers: Vec<ClassTeacherSummary>,
    pub students: Vec<EnrolledStudentSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_class_dto_rejects_short_code() {
        let dto: CreateClassDto = serde_json::from_value(serde_json::json!({
            "code": "M1",
            "name": "Math",
            "grade_level": "5",
            "school_id": 1
        }))
        .unwrap();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_create_class_dto_defaults() {
        let dto: CreateClassDto = serde_json::from_value(serde_json::json!({
            "code": "MATH-5A",
            "name": "Mathematics 5A",
            "grade_level": "5",
            "school_id": 1
        }))
        .unwrap();
        assert!(dto.validate().is_ok());
        assert_eq!(dto.status, "active");
        assert!(dto.student_ids.is_empty());
    }

    #[test]
    fn test_class_status_validator() {
        assert!(validate_class_status("active").is_ok());
        assert!(validate_class_status("inactive").is_ok());
        assert!(validate_class_status("archived").is_err());
    }
}
