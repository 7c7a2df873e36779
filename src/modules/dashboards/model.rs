use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::modules::users::model::UserDto;

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboardStats {
    pub total_students: i64,
    pub total_teachers: i64,
    pub total_parents: i64,
    pub total_employees: i64,
    pub total_schools: i64,
    pub total_users: i64,
    pub active_users: i64,
    pub inactive_users: i64,
    pub terminated_users: i64,
    pub verified_users: i64,
    pub users_last_month: i64,
    pub total_classes: i64,
    pub full_classes: i64,
    pub upcoming_classes: i64,
    pub students_with_health_notes: i64,
    pub special_needs_students: i64,
    pub students_without_parents: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub stats: AdminDashboardStats,
    pub recent_users: Vec<UserDto>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct SchoolStudentCount {
    pub school_name: String,
    pub student_count: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct SchoolTeacherCount {
    pub school_name: String,
    pub teacher_count: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct ClassUtilization {
    pub class_name: String,
    /// Enrollment as a percentage of `max_students`, rounded to two
    /// decimals.
    pub utilization: f64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct MonthlyRegistrations {
    /// "YYYY-MM".
    pub month: String,
    pub count: i64,
}
