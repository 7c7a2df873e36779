use std::collections::BTreeMap;

use anyhow::anyhow;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::modules::users::model::role_names;
use crate::utils::errors::AppError;

use super::model::{
    Class, ClassTeacherSummary, ClassWithRelations, CreateClassDto, EnrolledStudentSummary,
    UpdateClassDto,
};

pub struct ClassService;

impl ClassService {
    /// Creates a class together with its teacher link, enrollments and
    /// main-class markers in one transaction. Reference checks run in
    /// parallel beforehand; the first failing check wins.
    #[instrument(skip(db, dto), fields(class.code = %dto.code))]
    pub async fn create_class(db: &PgPool, dto: CreateClassDto) -> Result<Class, AppError> {
        Self::validate_references(db, &dto).await?;

        let schedule = dto.schedule.unwrap_or_default();
        let days_of_week = derive_days_of_week(&schedule);
        let now = Utc::now();

        let mut tx = db.begin().await?;

        let class = sqlx::query_as::<_, Class>(
            "INSERT INTO classes (
                code, name, grade_level, subject, semester, academic_year,
                teaching_method, capacity, max_students, room_number,
                class_logo, status, schedule, days_of_week, credits,
                start_date, end_date, school_id
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
             RETURNING *",
        )
        .bind(&dto.code)
        .bind(&dto.name)
        .bind(&dto.grade_level)
        .bind(&dto.subject)
        .bind(dto.semester)
        .bind(&dto.academic_year)
        .bind(&dto.teaching_method)
        .bind(dto.capacity.unwrap_or(30))
        .bind(dto.max_students.or(dto.capacity).unwrap_or(30))
        .bind(dto.room_number.as_deref().unwrap_or(""))
        .bind(&dto.class_logo)
        .bind(&dto.status)
        .bind(serde_json::to_value(&schedule)?)
        .bind(serde_json::to_value(&days_of_week)?)
        .bind(dto.credits)
        .bind(dto.start_date.unwrap_or(now))
        .bind(dto.end_date.unwrap_or(now))
        .bind(dto.school_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict(anyhow!(
                    "A class with code '{}' already exists",
                    dto.code
                ));
            }
            AppError::from(e)
        })?;

        if let Some(teacher_id) = dto.teacher_id {
            sqlx::query(
                "INSERT INTO class_teachers (teacher_id, class_id) VALUES ($1, $2)
                 ON CONFLICT (teacher_id, class_id) DO NOTHING",
            )
            .bind(teacher_id)
            .bind(class.id)
            .execute(&mut *tx)
            .await?;
        }

        if !dto.student_ids.is_empty() {
            sqlx::query(
                "INSERT INTO student_classes (student_id, class_id)
                 SELECT sid, $2 FROM UNNEST($1::bigint[]) AS sid
                 ON CONFLICT (student_id, class_id) DO NOTHING",
            )
            .bind(&dto.student_ids)
            .bind(class.id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE students SET main_class_id = $2, updated_at = NOW() WHERE id = ANY($1)")
                .bind(&dto.student_ids)
                .bind(class.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(
            class.id = class.id,
            class.code = %class.code,
            enrolled = dto.student_ids.len(),
            "Class created"
        );
        Ok(class)
    }

    /// Runs the create-time reference checks in parallel and reports the
    /// first applicable failure: taken code, missing school, invalid
    /// teacher, unknown student ids.
    async fn validate_references(db: &PgPool, dto: &CreateClassDto) -> Result<(), AppError> {
        let code_taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM classes WHERE code = $1")
            .bind(&dto.code)
            .fetch_one(db);
        let school_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schools WHERE id = $1")
                .bind(dto.school_id)
                .fetch_one(db);
        let teacher_ok = async {
            match dto.teacher_id {
                Some(teacher_id) => {
                    sqlx::query_scalar::<_, i64>(
                        "SELECT COUNT(*) FROM users u
                         INNER JOIN user_roles ur ON ur.user_id = u.id
                         INNER JOIN roles r ON r.id = ur.role_id
                         WHERE u.id = $1 AND r.name = $2",
                    )
                    .bind(teacher_id)
                    .bind(role_names::TEACHER)
                    .fetch_one(db)
                    .await
                }
                None => Ok(1),
            }
        };
        let found_students = async {
            if dto.student_ids.is_empty() {
                Ok(Vec::new())
            } else {
                sqlx::query_scalar::<_, i64>("SELECT id FROM students WHERE id = ANY($1)")
                    .bind(&dto.student_ids)
                    .fetch_all(db)
                    .await
            }
        };

        let (code_taken, school_exists, teacher_ok, found_students) =
            tokio::try_join!(code_taken, school_exists, teacher_ok, found_students)?;

        if code_taken > 0 {
            return Err(AppError::conflict(anyhow!(
                "A class with code '{}' already exists",
                dto.code
            )));
        }
        if school_exists == 0 {
            return Err(AppError::not_found(anyhow!("School not found")));
        }
        if teacher_ok == 0 {
            return Err(AppError::unprocessable(anyhow!(
                "Teacher with ID {} not found or is not a teacher",
                dto.teacher_id.unwrap_or_default()
            )));
        }

        let missing: Vec<String> = dto
            .student_ids
            .iter()
            .filter(|id| !found_students.contains(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::unprocessable(anyhow!(
                "Invalid student IDs: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn assign_teacher_to_class(
        db: &PgPool,
        class_id: i64,
        teacher_id: i64,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let class_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM classes WHERE id = $1")
            .bind(class_id)
            .fetch_one(&mut *tx)
            .await?;
        if class_exists == 0 {
            return Err(AppError::not_found(anyhow!("Class not found")));
        }

        let is_teacher = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users u
             INNER JOIN user_roles ur ON ur.user_id = u.id
             INNER JOIN roles r ON r.id = ur.role_id
             WHERE u.id = $1 AND r.name = $2",
        )
        .bind(teacher_id)
        .bind(role_names::TEACHER)
        .fetch_one(&mut *tx)
        .await?;
        if is_teacher == 0 {
            return Err(AppError::unprocessable(anyhow!(
                "Assigned user is not a teacher"
            )));
        }

        sqlx::query(
            "INSERT INTO class_teachers (teacher_id, class_id) VALUES ($1, $2)
             ON CONFLICT (teacher_id, class_id) DO NOTHING",
        )
        .bind(teacher_id)
        .bind(class_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(class.id = class_id, teacher.id = teacher_id, "Teacher assigned to class");
        Ok(())
    }

    /// Partial update. When a new schedule is given `days_of_week` is
    /// re-derived from it; when `school_id` is given the school must exist.
    #[instrument(skip(db, patch))]
    pub async fn update_class(
        db: &PgPool,
        class_id: i64,
        patch: UpdateClassDto,
    ) -> Result<Class, AppError> {
        if let Some(school_id) = patch.school_id {
            let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schools WHERE id = $1")
                .bind(school_id)
                .fetch_one(db)
                .await?;
            if exists == 0 {
                return Err(AppError::not_found(anyhow!("School not found")));
            }
        }

        let schedule_json = patch
            .schedule
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let days_json = patch
            .schedule
            .as_ref()
            .map(|s| serde_json::to_value(derive_days_of_week(s)))
            .transpose()?;

        let class = sqlx::query_as::<_, Class>(
            "UPDATE classes SET
                name = COALESCE($1, name),
                grade_level = COALESCE($2, grade_level),
                subject = COALESCE($3, subject),
                semester = COALESCE($4, semester),
                academic_year = COALESCE($5, academic_year),
                teaching_method = COALESCE($6, teaching_method),
                capacity = COALESCE($7, capacity),
                max_students = COALESCE($8, max_students),
                room_number = COALESCE($9, room_number),
                class_logo = COALESCE($10, class_logo),
                status = COALESCE($11, status),
                schedule = COALESCE($12, schedule),
                days_of_week = COALESCE($13, days_of_week),
                credits = COALESCE($14, credits),
                start_date = COALESCE($15, start_date),
                end_date = COALESCE($16, end_date),
                school_id = COALESCE($17, school_id),
                updated_at = NOW()
             WHERE id = $18
             RETURNING *",
        )
        .bind(&patch.name)
        .bind(&patch.grade_level)
        .bind(&patch.subject)
        .bind(patch.semester)
        .bind(&patch.academic_year)
        .bind(&patch.teaching_method)
        .bind(patch.capacity)
        .bind(patch.max_students)
        .bind(&patch.room_number)
        .bind(&patch.class_logo)
        .bind(&patch.status)
        .bind(schedule_json)
        .bind(days_json)
        .bind(patch.credits)
        .bind(patch.start_date)
        .bind(patch.end_date)
        .bind(patch.school_id)
        .bind(class_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Class not found")))?;

        debug!(class.id = class_id, "Class updated");
        Ok(class)
    }

    /// Hard delete. Enrollment and teacher-link rows go with the class;
    /// students pointing at it as their main class are unset by the store.
    #[instrument(skip(db))]
    pub async fn delete_class(db: &PgPool, class_id: i64) -> Result<(), AppError> {
        let deleted = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(class_id)
            .execute(db)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Class not found")));
        }
        info!(class.id = class_id, "Class deleted");
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn get_all_classes(db: &PgPool) -> Result<Vec<ClassWithRelations>, AppError> {
        let classes = sqlx::query_as::<_, Class>("SELECT * FROM classes ORDER BY created_at DESC")
            .fetch_all(db)
            .await?;
        Self::hydrate_all(db, classes).await
    }

    #[instrument(skip(db))]
    pub async fn get_class_by_id(db: &PgPool, class_id: i64) -> Result<ClassWithRelations, AppError> {
        let class = sqlx::query_as::<_, Class>("SELECT * FROM classes WHERE id = $1")
            .bind(class_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Class not found")))?;
        Self::hydrate(db, class).await
    }

    #[instrument(skip(db))]
    pub async fn get_classes_by_school(
        db: &PgPool,
        school_id: i64,
    ) -> Result<Vec<ClassWithRelations>, AppError> {
        let classes = sqlx::query_as::<_, Class>(
            "SELECT * FROM classes WHERE school_id = $1 ORDER BY created_at DESC",
        )
        .bind(school_id)
        .fetch_all(db)
        .await?;
        Self::hydrate_all(db, classes).await
    }

    async fn hydrate_all(
        db: &PgPool,
        classes: Vec<Class>,
    ) -> Result<Vec<ClassWithRelations>, AppError> {
        let mut result = Vec::with_capacity(classes.len());
        for class in classes {
            result.push(Self::hydrate(db, class).await?);
        }
        Ok(result)
    }

    async fn hydrate(db: &PgPool, class: Class) -> Result<ClassWithRelations, AppError> {
        let school = sqlx::query_as::<_, crate::modules::schools::model::School>(
            "SELECT * FROM schools WHERE id = $1",
        )
        .bind(class.school_id)
        .fetch_optional(db)
        .await?;

        let teachers = sqlx::query_as::<_, ClassTeacherSummary>(
            "SELECT u.id AS user_id, u.first_name, u.last_name, u.email, p.avatar
             FROM class_teachers ct
             INNER JOIN users u ON u.id = ct.teacher_id
             LEFT JOIN user_profiles p ON p.user_id = u.id
             WHERE ct.class_id = $1
             ORDER BY u.id",
        )
        .bind(class.id)
        .fetch_all(db)
        .await?;

        let students = sqlx::query_as::<_, EnrolledStudentSummary>(
            "SELECT st.id AS student_id, u.id AS user_id, st.student_no, st.grade,
                    u.first_name, u.last_name, u.email,
                    COALESCE(st.main_class_id = sc.class_id, FALSE) AS is_main_class
             FROM student_classes sc
             INNER JOIN students st ON st.id = sc.student_id
             INNER JOIN users u ON u.id = st.user_id
             WHERE sc.class_id = $1
             ORDER BY st.id",
        )
        .bind(class.id)
        .fetch_all(db)
        .await?;

        Ok(ClassWithRelations {
            class,
            school,
            teachers,
            students,
        })
    }
}

/// The days a class meets are the schedule keys whose time range is
/// non-empty.
pub fn derive_days_of_week(schedule: &BTreeMap<String, String>) -> Vec<String> {
    schedule
        .iter()
        .filter(|(_, range)| !range.trim().is_empty())
        .map(|(day, _)| day.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(d, r)| (d.to_string(), r.to_string()))
            .collect()
    }

    #[test]
    fn test_days_of_week_skips_empty_ranges() {
        let s = schedule(&[
            ("monday", "08:00-09:30"),
            ("tuesday", ""),
            ("wednesday", "10:00-11:30"),
            ("thursday", "   "),
        ]);
        assert_eq!(derive_days_of_week(&s), vec!["monday", "wednesday"]);
    }

    #[test]
    fn test_days_of_week_empty_schedule() {
        assert!(derive_days_of_week(&BTreeMap::new()).is_empty());
    }
}
