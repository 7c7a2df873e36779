use anyhow::anyhow;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, instrument};

use crate::modules::users::model::{ClassSummary, ProfileInput, User, role_names, user_status};
use crate::modules::users::service::{UserService, grant_role, upsert_profile};
use crate::utils::email::EmailService;
use crate::utils::errors::AppError;
use crate::utils::password::{generate_random_password, hash_password};

use super::model::{
    ConnectParentsDto, CreateStudentDto, ParentInfoDto, ParentSummary, Student,
    StudentWithRelations, UpdateStudentDto,
};

/// Credentials of a parent account created as a side effect of a student
/// mutation. Welcome emails for these go out after the transaction commits.
struct CreatedParent {
    email: String,
    first_name: String,
    password: String,
}

pub struct StudentService;

impl StudentService {
    /// Creates the student's user account (student role, active and
    /// verified), profile, student record, enrollments and parent links in
    /// one transaction. Parents are matched by email and created when
    /// missing; newly created parents get their credentials by email after
    /// commit.
    #[instrument(skip(db, email, dto), fields(student.no = %dto.student_no))]
    pub async fn create_student(
        db: &PgPool,
        email: &EmailService,
        dto: CreateStudentDto,
    ) -> Result<Student, AppError> {
        let mut tx = db.begin().await?;

        let email_taken =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
                .bind(&dto.email)
                .fetch_one(&mut *tx)
                .await?;
        if email_taken > 0 {
            return Err(AppError::conflict(anyhow!(
                "A user with email {} already exists",
                dto.email
            )));
        }

        let student_no_taken =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE student_no = $1")
                .bind(&dto.student_no)
                .fetch_one(&mut *tx)
                .await?;
        if student_no_taken > 0 {
            return Err(AppError::conflict(anyhow!(
                "A student with number '{}' already exists",
                dto.student_no
            )));
        }

        let school_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schools WHERE id = $1")
                .bind(dto.school_id)
                .fetch_one(&mut *tx)
                .await?;
        if school_exists == 0 {
            return Err(AppError::not_found(anyhow!("School not found")));
        }

        let password = match &dto.password {
            Some(p) => p.clone(),
            None => generate_random_password(),
        };
        let hashed = hash_password(&password)?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (first_name, last_name, email, password, phone, status, is_verified)
             VALUES ($1, $2, $3, $4, $5, $6, TRUE)
             RETURNING *",
        )
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.email)
        .bind(&hashed)
        .bind(&dto.phone)
        .bind(user_status::ACTIVE)
        .fetch_one(&mut *tx)
        .await?;

        grant_role(&mut tx, user.id, role_names::STUDENT).await?;

        let profile = dto.profile.clone().unwrap_or_default();
        upsert_profile(&mut tx, user.id, &profile).await?;

        let main_class_id = if dto.class_ids.is_empty() {
            None
        } else {
            Self::check_class_ids(&mut tx, &dto.class_ids).await?;
            Some(dto.class_ids[0])
        };

        let student = sqlx::query_as::<_, Student>(
            "INSERT INTO students (
                user_id, school_id, student_no, grade, section, main_class_id,
                admission_date, health_notes, is_special_needs,
                guardian_name, guardian_phone
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(user.id)
        .bind(dto.school_id)
        .bind(&dto.student_no)
        .bind(&dto.grade)
        .bind(&dto.section)
        .bind(main_class_id)
        .bind(dto.admission_date)
        .bind(&dto.health_notes)
        .bind(dto.is_special_needs)
        .bind(&dto.guardian_name)
        .bind(&dto.guardian_phone)
        .fetch_one(&mut *tx)
        .await?;

        if !dto.class_ids.is_empty() {
            Self::enroll(&mut tx, student.id, &dto.class_ids).await?;
        }

        let created_parents = Self::link_parents(&mut tx, student.id, &dto.parents).await?;

        tx.commit().await?;

        Self::send_parent_welcomes(email, created_parents);

        info!(
            student.id = student.id,
            student.no = %student.student_no,
            user.id = user.id,
            "Student created"
        );
        Ok(student)
    }

    /// Mirrors creation: sparse user/student/profile updates, wholesale
    /// enrollment replacement when `class_ids` is given, and the same
    /// parent find-or-create handling.
    #[instrument(skip(db, email, patch))]
    pub async fn update_student(
        db: &PgPool,
        email: &EmailService,
        student_id: i64,
        patch: UpdateStudentDto,
    ) -> Result<Student, AppError> {
        let mut tx = db.begin().await?;

        let student = Self::find_student_tx(&mut tx, student_id).await?;

        if let Some(new_email) = &patch.email {
            let taken = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM users WHERE email = $1 AND id != $2",
            )
            .bind(new_email)
            .bind(student.user_id)
            .fetch_one(&mut *tx)
            .await?;
            if taken > 0 {
                return Err(AppError::conflict(anyhow!(
                    "A user with email {} already exists",
                    new_email
                )));
            }
        }

        if let Some(new_no) = &patch.student_no {
            let taken = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM students WHERE student_no = $1 AND id != $2",
            )
            .bind(new_no)
            .bind(student_id)
            .fetch_one(&mut *tx)
            .await?;
            if taken > 0 {
                return Err(AppError::conflict(anyhow!(
                    "A student with number '{}' already exists",
                    new_no
                )));
            }
        }

        if let Some(school_id) = patch.school_id {
            let exists =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schools WHERE id = $1")
                    .bind(school_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if exists == 0 {
                return Err(AppError::not_found(anyhow!("School not found")));
            }
        }

        sqlx::query(
            "UPDATE users SET
                first_name = COALESCE($1, first_name),
                last_name = COALESCE($2, last_name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                updated_at = NOW()
             WHERE id = $5",
        )
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(&patch.email)
        .bind(&patch.phone)
        .bind(student.user_id)
        .execute(&mut *tx)
        .await?;

        if let Some(profile) = &patch.profile {
            upsert_profile(&mut tx, student.user_id, profile).await?;
        }

        let student = sqlx::query_as::<_, Student>(
            "UPDATE students SET
                school_id = COALESCE($1, school_id),
                grade = COALESCE($2, grade),
                section = COALESCE($3, section),
                student_no = COALESCE($4, student_no),
                admission_date = COALESCE($5, admission_date),
                health_notes = COALESCE($6, health_notes),
                is_special_needs = COALESCE($7, is_special_needs),
                guardian_name = COALESCE($8, guardian_name),
                guardian_phone = COALESCE($9, guardian_phone),
                updated_at = NOW()
             WHERE id = $10
             RETURNING *",
        )
        .bind(patch.school_id)
        .bind(&patch.grade)
        .bind(&patch.section)
        .bind(&patch.student_no)
        .bind(patch.admission_date)
        .bind(&patch.health_notes)
        .bind(patch.is_special_needs)
        .bind(&patch.guardian_name)
        .bind(&patch.guardian_phone)
        .bind(student_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(class_ids) = &patch.class_ids {
            if !class_ids.is_empty() {
                Self::check_class_ids(&mut tx, class_ids).await?;
            }
            sqlx::query("DELETE FROM student_classes WHERE student_id = $1")
                .bind(student_id)
                .execute(&mut *tx)
                .await?;
            if !class_ids.is_empty() {
                Self::enroll(&mut tx, student_id, class_ids).await?;
            }
            sqlx::query("UPDATE students SET main_class_id = $2 WHERE id = $1")
                .bind(student_id)
                .bind(class_ids.first())
                .execute(&mut *tx)
                .await?;
        }

        let created_parents = match &patch.parents {
            Some(parents) => Self::link_parents(&mut tx, student_id, parents).await?,
            None => Vec::new(),
        };

        tx.commit().await?;

        Self::send_parent_welcomes(email, created_parents);

        debug!(student.id = student_id, "Student updated");
        Ok(student)
    }

    /// Cascading delete: enrollments, parent links, profile, student and
    /// user go in one transaction. Parents left with no remaining children
    /// are removed too, along with their own profile and user account.
    #[instrument(skip(db))]
    pub async fn delete_student(db: &PgPool, student_id: i64) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let student = Self::find_student_tx(&mut tx, student_id).await?;

        let linked_parent_ids = sqlx::query_scalar::<_, i64>(
            "SELECT parent_id FROM parent_students WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM student_classes WHERE student_id = $1")
            .bind(student_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM parent_students WHERE student_id = $1")
            .bind(student_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
            .bind(student.user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(student_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(student.user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(student.user_id)
            .execute(&mut *tx)
            .await?;

        let mut orphaned = 0;
        for parent_id in linked_parent_ids {
            let remaining = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM parent_students WHERE parent_id = $1",
            )
            .bind(parent_id)
            .fetch_one(&mut *tx)
            .await?;
            if remaining > 0 {
                continue;
            }

            let parent_user_id =
                sqlx::query_scalar::<_, i64>("SELECT user_id FROM parents WHERE id = $1")
                    .bind(parent_id)
                    .fetch_one(&mut *tx)
                    .await?;

            sqlx::query("DELETE FROM parents WHERE id = $1")
                .bind(parent_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
                .bind(parent_user_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
                .bind(parent_user_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(parent_user_id)
                .execute(&mut *tx)
                .await?;
            orphaned += 1;
        }

        tx.commit().await?;

        info!(
            student.id = student_id,
            orphaned_parents_removed = orphaned,
            "Student deleted"
        );
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn activate_student(db: &PgPool, student_id: i64) -> Result<(), AppError> {
        Self::set_student_status(db, student_id, user_status::ACTIVE).await
    }

    #[instrument(skip(db))]
    pub async fn deactivate_student(db: &PgPool, student_id: i64) -> Result<(), AppError> {
        Self::set_student_status(db, student_id, user_status::INACTIVE).await
    }

    async fn set_student_status(
        db: &PgPool,
        student_id: i64,
        status: &str,
    ) -> Result<(), AppError> {
        let updated = sqlx::query(
            "UPDATE users SET status = $2, updated_at = NOW()
             WHERE id = (SELECT user_id FROM students WHERE id = $1)",
        )
        .bind(student_id)
        .bind(status)
        .execute(db)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Student not found")));
        }
        debug!(student.id = student_id, status, "Student status changed");
        Ok(())
    }

    /// Replaces the student's parent set with the given parent users:
    /// links not in the set are removed, the rest are upserted.
    #[instrument(skip(db, dto))]
    pub async fn connect_student_with_parents(
        db: &PgPool,
        student_id: i64,
        dto: ConnectParentsDto,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        Self::find_student_tx(&mut tx, student_id).await?;

        let found_users =
            sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = ANY($1)")
                .bind(&dto.parent_user_ids)
                .fetch_all(&mut *tx)
                .await?;
        let missing: Vec<String> = dto
            .parent_user_ids
            .iter()
            .filter(|id| !found_users.contains(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::unprocessable(anyhow!(
                "Invalid parent user IDs: {}",
                missing.join(", ")
            )));
        }

        sqlx::query(
            "DELETE FROM parent_students ps
             USING parents p
             WHERE ps.parent_id = p.id
               AND ps.student_id = $1
               AND p.user_id != ALL($2)",
        )
        .bind(student_id)
        .bind(&dto.parent_user_ids)
        .execute(&mut *tx)
        .await?;

        for user_id in &dto.parent_user_ids {
            grant_role(&mut tx, *user_id, role_names::PARENT).await?;
            let parent_id = Self::ensure_parent_record(&mut tx, *user_id).await?;
            sqlx::query(
                "INSERT INTO parent_students (parent_id, student_id) VALUES ($1, $2)
                 ON CONFLICT (parent_id, student_id) DO NOTHING",
            )
            .bind(parent_id)
            .bind(student_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            student.id = student_id,
            parents = dto.parent_user_ids.len(),
            "Student parent links replaced"
        );
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn get_all_students(db: &PgPool) -> Result<Vec<StudentWithRelations>, AppError> {
        let students =
            sqlx::query_as::<_, Student>("SELECT * FROM students ORDER BY created_at DESC")
                .fetch_all(db)
                .await?;
        Self::hydrate_all(db, students).await
    }

    #[instrument(skip(db))]
    pub async fn get_student_by_id(
        db: &PgPool,
        student_id: i64,
    ) -> Result<StudentWithRelations, AppError> {
        let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(student_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))?;
        Self::hydrate(db, student).await
    }

    #[instrument(skip(db))]
    pub async fn get_students_by_school(
        db: &PgPool,
        school_id: i64,
    ) -> Result<Vec<StudentWithRelations>, AppError> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT * FROM students WHERE school_id = $1 ORDER BY created_at DESC",
        )
        .bind(school_id)
        .fetch_all(db)
        .await?;
        Self::hydrate_all(db, students).await
    }

    #[instrument(skip(db))]
    pub async fn get_students_by_class(
        db: &PgPool,
        class_id: i64,
    ) -> Result<Vec<StudentWithRelations>, AppError> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT st.* FROM students st
             INNER JOIN student_classes sc ON sc.student_id = st.id
             WHERE sc.class_id = $1
             ORDER BY st.id",
        )
        .bind(class_id)
        .fetch_all(db)
        .await?;
        Self::hydrate_all(db, students).await
    }

    /// Students whose health notes are non-empty, optionally scoped to a
    /// school.
    #[instrument(skip(db))]
    pub async fn get_students_with_medical_conditions(
        db: &PgPool,
        school_id: Option<i64>,
    ) -> Result<Vec<StudentWithRelations>, AppError> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT * FROM students
             WHERE health_notes IS NOT NULL
               AND btrim(health_notes) != ''
               AND ($1::bigint IS NULL OR school_id = $1)
             ORDER BY created_at DESC",
        )
        .bind(school_id)
        .fetch_all(db)
        .await?;
        Self::hydrate_all(db, students).await
    }

    async fn find_student_tx(
        tx: &mut Transaction<'_, Postgres>,
        student_id: i64,
    ) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(student_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))
    }

    async fn check_class_ids(
        tx: &mut Transaction<'_, Postgres>,
        class_ids: &[i64],
    ) -> Result<(), AppError> {
        let found = sqlx::query_scalar::<_, i64>("SELECT id FROM classes WHERE id = ANY($1)")
            .bind(class_ids)
            .fetch_all(&mut **tx)
            .await?;
        let missing: Vec<String> = class_ids
            .iter()
            .filter(|id| !found.contains(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::unprocessable(anyhow!(
                "Invalid class IDs: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    async fn enroll(
        tx: &mut Transaction<'_, Postgres>,
        student_id: i64,
        class_ids: &[i64],
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO student_classes (student_id, class_id)
             SELECT $1, cid FROM UNNEST($2::bigint[]) AS cid
             ON CONFLICT (student_id, class_id) DO NOTHING",
        )
        .bind(student_id)
        .bind(class_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Finds each parent user by email or creates a fresh account (parent
    /// role, random password, empty profile), ensures a parent record and
    /// the link to the student. Returns the credentials of accounts that
    /// were created.
    async fn link_parents(
        tx: &mut Transaction<'_, Postgres>,
        student_id: i64,
        parents: &[ParentInfoDto],
    ) -> Result<Vec<CreatedParent>, AppError> {
        let mut created = Vec::new();

        for info in parents {
            let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(&info.email)
                .fetch_optional(&mut **tx)
                .await?;

            let user_id = match existing {
                Some(user) => user.id,
                None => {
                    let password = generate_random_password();
                    let hashed = hash_password(&password)?;
                    let user_id = sqlx::query_scalar::<_, i64>(
                        "INSERT INTO users (first_name, last_name, email, password, phone, status, is_verified)
                         VALUES ($1, $2, $3, $4, $5, $6, TRUE)
                         RETURNING id",
                    )
                    .bind(&info.first_name)
                    .bind(&info.last_name)
                    .bind(&info.email)
                    .bind(&hashed)
                    .bind(&info.phone)
                    .bind(user_status::ACTIVE)
                    .fetch_one(&mut **tx)
                    .await?;
                    upsert_profile(tx, user_id, &ProfileInput::default()).await?;
                    created.push(CreatedParent {
                        email: info.email.clone(),
                        first_name: info.first_name.clone(),
                        password,
                    });
                    user_id
                }
            };

            grant_role(tx, user_id, role_names::PARENT).await?;
            let parent_id = Self::ensure_parent_record(tx, user_id).await?;

            sqlx::query(
                "INSERT INTO parent_students (parent_id, student_id) VALUES ($1, $2)
                 ON CONFLICT (parent_id, student_id) DO NOTHING",
            )
            .bind(parent_id)
            .bind(student_id)
            .execute(&mut **tx)
            .await?;
        }

        Ok(created)
    }

    async fn ensure_parent_record(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
    ) -> Result<i64, AppError> {
        sqlx::query("INSERT INTO parents (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        let parent_id =
            sqlx::query_scalar::<_, i64>("SELECT id FROM parents WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&mut **tx)
                .await?;
        Ok(parent_id)
    }

    fn send_parent_welcomes(email: &EmailService, created: Vec<CreatedParent>) {
        for parent in created {
            email.send_in_background(move |svc| async move {
                svc.send_welcome_email(&parent.email, &parent.first_name, &parent.password)
                    .await
            });
        }
    }

    async fn hydrate_all(
        db: &PgPool,
        students: Vec<Student>,
    ) -> Result<Vec<StudentWithRelations>, AppError> {
        let mut result = Vec::with_capacity(students.len());
        for student in students {
            result.push(Self::hydrate(db, student).await?);
        }
        Ok(result)
    }

    async fn hydrate(db: &PgPool, student: Student) -> Result<StudentWithRelations, AppError> {
        let user = UserService::find_user(db, student.user_id).await?;
        let user = UserService::build_user_dto(db, user).await?;

        let school = sqlx::query_as::<_, crate::modules::schools::model::School>(
            "SELECT * FROM schools WHERE id = $1",
        )
        .bind(student.school_id)
        .fetch_optional(db)
        .await?;

        let classes = sqlx::query_as::<_, ClassSummary>(
            "SELECT c.id, c.name FROM classes c
             INNER JOIN student_classes sc ON sc.class_id = c.id
             WHERE sc.student_id = $1
             ORDER BY c.id",
        )
        .bind(student.id)
        .fetch_all(db)
        .await?;

        let parents = sqlx::query_as::<_, ParentSummary>(
            "SELECT p.id AS parent_id, u.id AS user_id, u.first_name, u.last_name,
                    u.email, u.phone
             FROM parent_students ps
             INNER JOIN parents p ON p.id = ps.parent_id
             INNER JOIN users u ON u.id = p.user_id
             WHERE ps.student_id = $1
             ORDER BY p.id",
        )
        .bind(student.id)
        .fetch_all(db)
        .await?;

        Ok(StudentWithRelations {
            student,
            user,
            school,
            classes,
            parents,
        })
    }
}
