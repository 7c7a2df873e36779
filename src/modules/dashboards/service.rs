use sqlx::PgPool;
use tracing::instrument;

use crate::modules::users::model::role_names;
use crate::modules::users::service::UserService;
use crate::utils::errors::AppError;

use super::model::{
    AdminDashboard, AdminDashboardStats, ClassUtilization, MonthlyRegistrations,
    SchoolStudentCount, SchoolTeacherCount,
};

/// Read-only reporting; no invariants live here.
pub struct DashboardService;

impl DashboardService {
    #[instrument(skip(db))]
    pub async fn admin_summary(db: &PgPool) -> Result<AdminDashboard, AppError> {
        let count = |sql: &'static str| sqlx::query_scalar::<_, i64>(sql).fetch_one(db);

        let (
            total_students,
            total_teachers,
            total_parents,
            total_employees,
            total_schools,
            total_users,
            active_users,
            inactive_users,
            terminated_users,
            verified_users,
            users_last_month,
            total_classes,
        ) = tokio::try_join!(
            count("SELECT COUNT(*) FROM students"),
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(DISTINCT u.id) FROM users u
                 INNER JOIN user_roles ur ON ur.user_id = u.id
                 INNER JOIN roles r ON r.id = ur.role_id
                 WHERE r.name = $1",
            )
            .bind(role_names::TEACHER)
            .fetch_one(db),
            count("SELECT COUNT(*) FROM parents"),
            count("SELECT COUNT(*) FROM employees"),
            count("SELECT COUNT(*) FROM schools"),
            count("SELECT COUNT(*) FROM users"),
            count("SELECT COUNT(*) FROM users WHERE status = 'ACTIVE'"),
            count("SELECT COUNT(*) FROM users WHERE status = 'INACTIVE'"),
            count("SELECT COUNT(*) FROM users WHERE status = 'TERMINATED'"),
            count("SELECT COUNT(*) FROM users WHERE is_verified"),
            count(
                "SELECT COUNT(*) FROM users
                 WHERE created_at >= date_trunc('month', NOW()) - INTERVAL '1 month'
                   AND created_at < date_trunc('month', NOW())",
            ),
            count("SELECT COUNT(*) FROM classes"),
        )?;

        let (
            full_classes,
            upcoming_classes,
            students_with_health_notes,
            special_needs_students,
            students_without_parents,
        ) = tokio::try_join!(
            count(
                "SELECT COUNT(*) FROM classes c
                 WHERE c.max_students > 0
                   AND (SELECT COUNT(*) FROM student_classes sc WHERE sc.class_id = c.id)
                       >= c.max_students",
            ),
            count("SELECT COUNT(*) FROM classes WHERE start_date > NOW()"),
            count(
                "SELECT COUNT(*) FROM students
                 WHERE health_notes IS NOT NULL AND btrim(health_notes) != ''",
            ),
            count("SELECT COUNT(*) FROM students WHERE is_special_needs"),
            count(
                "SELECT COUNT(*) FROM students st
                 WHERE NOT EXISTS (
                     SELECT 1 FROM parent_students ps WHERE ps.student_id = st.id
                 )",
            ),
        )?;

        let recent = sqlx::query_as::<_, crate::modules::users::model::User>(
            "SELECT * FROM users ORDER BY created_at DESC LIMIT 5",
        )
        .fetch_all(db)
        .await?;
        let mut recent_users = Vec::with_capacity(recent.len());
        for user in recent {
            recent_users.push(UserService::build_user_dto(db, user).await?);
        }

        Ok(AdminDashboard {
            stats: AdminDashboardStats {
                total_students,
                total_teachers,
                total_parents,
                total_employees,
                total_schools,
                total_users,
                active_users,
                inactive_users,
                terminated_users,
                verified_users,
                users_last_month,
                total_classes,
                full_classes,
                upcoming_classes,
                students_with_health_notes,
                special_needs_students,
                students_without_parents,
            },
            recent_users,
        })
    }

    #[instrument(skip(db))]
    pub async fn students_per_school(db: &PgPool) -> Result<Vec<SchoolStudentCount>, AppError> {
        let rows = sqlx::query_as::<_, SchoolStudentCount>(
            "SELECT s.school_name, COUNT(st.id) AS student_count
             FROM schools s
             LEFT JOIN students st ON st.school_id = s.id
             GROUP BY s.id, s.school_name
             ORDER BY s.school_name",
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(db))]
    pub async fn teachers_per_school(db: &PgPool) -> Result<Vec<SchoolTeacherCount>, AppError> {
        let rows = sqlx::query_as::<_, SchoolTeacherCount>(
            "SELECT s.school_name, COUNT(DISTINCT us.user_id) AS teacher_count
             FROM schools s
             LEFT JOIN user_schools us ON us.school_id = s.id
                 AND EXISTS (
                     SELECT 1 FROM user_roles ur
                     INNER JOIN roles r ON r.id = ur.role_id
                     WHERE ur.user_id = us.user_id AND r.name = $1
                 )
             GROUP BY s.id, s.school_name
             ORDER BY s.school_name",
        )
        .bind(role_names::TEACHER)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    #[instrument(skip(db))]
    pub async fn class_utilization(db: &PgPool) -> Result<Vec<ClassUtilization>, AppError> {
        let rows = sqlx::query_as::<_, ClassUtilization>(
            "SELECT c.name AS class_name,
                    ROUND(COUNT(sc.id)::numeric * 100 / c.max_students, 2)::float8
                        AS utilization
             FROM classes c
             LEFT JOIN student_classes sc ON sc.class_id = c.id
             WHERE c.max_students > 0
             GROUP BY c.id, c.name, c.max_students
             ORDER BY c.name",
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Registration counts for the six most recent months with activity,
    /// oldest first.
    #[instrument(skip(db))]
    pub async fn recent_registrations(db: &PgPool) -> Result<Vec<MonthlyRegistrations>, AppError> {
        let mut rows = sqlx::query_as::<_, MonthlyRegistrations>(
            "SELECT to_char(created_at, 'YYYY-MM') AS month, COUNT(*) AS count
             FROM users
             GROUP BY month
             ORDER BY month DESC
             LIMIT 6",
        )
        .fetch_all(db)
        .await?;
        rows.reverse();
        Ok(rows)
    }
}
