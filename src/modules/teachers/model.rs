use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::modules::users::model::ProfileInput;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterTeacherDto {
    #[validate(length(min = 2, message = "First name must be at least 2 characters"))]
    pub first_name: String,
    #[validate(length(min = 2, message = "Last name must be at least 2 characters"))]
    pub last_name: String,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    pub school_id: i64,
    pub phone: Option<String>,
    #[validate(nested)]
    pub profile: Option<ProfileInput>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignClassesDto {
    #[validate(range(min = 1, message = "teacher_id must be positive"))]
    pub teacher_id: i64,
    #[validate(length(min = 1, message = "At least one class id is required"))]
    pub class_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTeacherDto {
    #[validate(length(min = 2, message = "First name must be at least 2 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, message = "Last name must be at least 2 characters"))]
    pub last_name: Option<String>,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Linking to a new school keeps existing links (upsert).
    pub school_id: Option<i64>,
    #[validate(nested)]
    pub profile: Option<ProfileInput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_teacher_dto_rejects_short_names() {
        let dto: RegisterTeacherDto = serde_json::from_value(serde_json::json!({
            "first_name": "A",
            "last_name": "Hassan",
            "email": "a.hassan@example.com",
            "school_id": 1
        }))
        .unwrap();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_assign_classes_dto_requires_class_ids() {
        let dto = AssignClassesDto {
            teacher_id: 7,
            class_ids: vec![],
        };
        assert!(dto.validate().is_err());
    }
}
