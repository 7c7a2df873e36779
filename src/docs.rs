use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::auth::model::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest, ResetPasswordRequest,
};
use crate::modules::classes::model::{
    AssignTeacherDto, Class, ClassTeacherSummary, ClassWithRelations, CreateClassDto,
    EnrolledStudentSummary, UpdateClassDto,
};
use crate::modules::dashboards::model::{
    AdminDashboard, AdminDashboardStats, ClassUtilization, MonthlyRegistrations,
    SchoolStudentCount, SchoolTeacherCount,
};
use crate::modules::roles::model::{CreateRoleDto, Role, RoleWithUserCount};
use crate::modules::schools::model::{
    CreateSchoolDto, School, SchoolUsersByRole, SchoolWithManager, UpdateSchoolDto,
};
use crate::modules::students::model::{
    ConnectParentsDto, CreateStudentDto, ParentInfoDto, ParentSummary, Student,
    StudentWithRelations, UpdateStudentDto,
};
use crate::modules::teachers::model::{AssignClassesDto, RegisterTeacherDto, UpdateTeacherDto};
use crate::modules::users::model::{
    ClassSummary, PaginatedUsersResponse, ProfileInput, UpdateUserProfileDto, User, UserDto,
    UserProfile, VerifyUserDto,
};
use crate::utils::pagination::{PaginationMeta, PaginationParams};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::register,
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::forgot_password,
        crate::modules::auth::controller::reset_password,
        crate::modules::users::controller::get_all_users,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::verify_user,
        crate::modules::users::controller::update_user_profile,
        crate::modules::roles::controller::get_all_roles,
        crate::modules::roles::controller::create_role,
        crate::modules::roles::controller::delete_role,
        crate::modules::schools::controller::create_school,
        crate::modules::schools::controller::get_all_schools,
        crate::modules::schools::controller::get_school,
        crate::modules::schools::controller::update_school,
        crate::modules::schools::controller::delete_school,
        crate::modules::schools::controller::get_school_users_by_role,
        crate::modules::classes::controller::create_class,
        crate::modules::classes::controller::get_all_classes,
        crate::modules::classes::controller::get_class,
        crate::modules::classes::controller::get_classes_by_school,
        crate::modules::classes::controller::assign_teacher,
        crate::modules::classes::controller::update_class,
        crate::modules::classes::controller::delete_class,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::get_all_students,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::get_students_by_school,
        crate::modules::students::controller::get_students_by_class,
        crate::modules::students::controller::get_students_with_medical_conditions,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
        crate::modules::students::controller::activate_student,
        crate::modules::students::controller::deactivate_student,
        crate::modules::students::controller::connect_student_with_parents,
        crate::modules::teachers::controller::register_teacher,
        crate::modules::teachers::controller::get_all_teachers,
        crate::modules::teachers::controller::get_teachers_by_school,
        crate::modules::teachers::controller::get_teacher,
        crate::modules::teachers::controller::assign_teacher_to_classes,
        crate::modules::teachers::controller::update_teacher,
        crate::modules::teachers::controller::delete_teacher,
        crate::modules::dashboards::controller::admin_summary,
        crate::modules::dashboards::controller::students_per_school,
        crate::modules::dashboards::controller::teachers_per_school,
        crate::modules::dashboards::controller::class_utilization,
        crate::modules::dashboards::controller::recent_registrations,
    ),
    components(
        schemas(
            User,
            UserProfile,
            UserDto,
            ClassSummary,
            ProfileInput,
            UpdateUserProfileDto,
            VerifyUserDto,
            PaginatedUsersResponse,
            Role,
            RoleWithUserCount,
            CreateRoleDto,
            School,
            CreateSchoolDto,
            UpdateSchoolDto,
            SchoolWithManager,
            SchoolUsersByRole,
            Class,
            CreateClassDto,
            UpdateClassDto,
            AssignTeacherDto,
            ClassTeacherSummary,
            EnrolledStudentSummary,
            ClassWithRelations,
            Student,
            CreateStudentDto,
            UpdateStudentDto,
            ParentInfoDto,
            ParentSummary,
            ConnectParentsDto,
            StudentWithRelations,
            RegisterTeacherDto,
            AssignClassesDto,
            UpdateTeacherDto,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            AdminDashboard,
            AdminDashboardStats,
            SchoolStudentCount,
            SchoolTeacherCount,
            ClassUtilization,
            MonthlyRegistrations,
            PaginationMeta,
            PaginationParams,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and password reset"),
        (name = "Users", description = "User management endpoints"),
        (name = "Roles", description = "Role management endpoints"),
        (name = "Schools", description = "School management endpoints"),
        (name = "Classes", description = "Class management endpoints"),
        (name = "Students", description = "Student management endpoints"),
        (name = "Teachers", description = "Teacher management endpoints"),
        (name = "Dashboards", description = "Read-only reporting endpoints")
    ),
    info(
        title = "Ehtimami API",
        version = "0.1.0",
        description = "Multi-tenant school management REST API built with Rust, Axum and PostgreSQL.",
        contact(
            name = "API Support",
            email = "support@ehtimami.com"
        ),
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
