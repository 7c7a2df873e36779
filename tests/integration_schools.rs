mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use common::{auth_token, seed_admin, seed_class, seed_school, seed_student, send, setup_app};

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_school_blocked_by_owned_class(pool: PgPool) {
    let admin = seed_admin(&pool).await;
    let school_id = seed_school(&pool).await;
    seed_class(&pool, school_id).await;

    let app = setup_app(pool.clone());
    let token = auth_token(app.clone(), &admin.email, &admin.password).await;

    let (status, body) = send(
        app,
        "DELETE",
        &format!("/api/schools/{school_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert!(body["message"].as_str().unwrap().contains("class"));

    let schools: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schools WHERE id = $1")
        .bind(school_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(schools, 1);

    let classes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM classes WHERE school_id = $1")
        .bind(school_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(classes, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_school_blocked_by_registered_students(pool: PgPool) {
    let admin = seed_admin(&pool).await;
    let school_id = seed_school(&pool).await;
    let student_id = seed_student(&pool, school_id).await;

    let app = setup_app(pool.clone());
    let token = auth_token(app.clone(), &admin.email, &admin.password).await;

    let (status, body) = send(
        app,
        "DELETE",
        &format!("/api/schools/{school_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert!(body["message"].as_str().unwrap().contains("student"));

    let schools: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schools WHERE id = $1")
        .bind(school_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(schools, 1);

    let students: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE id = $1")
        .bind(student_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(students, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_school_cascades_dedicated_manager(pool: PgPool) {
    let admin = seed_admin(&pool).await;
    let app = setup_app(pool.clone());
    let token = auth_token(app.clone(), &admin.email, &admin.password).await;

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/schools",
        Some(&token),
        Some(json!({
            "school_unique_id": format!("SCH-{}", Uuid::new_v4().simple()),
            "school_name": "Riyadh First",
            "school_address": "1 King Fahd Road",
            "school_email": "contact@riyadh-first.example.com",
            "school_type": "PUBLIC",
            "education_level": "PRIMARY",
            "curriculum": "SAUDI_NATIONAL"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let school_id = body["data"]["id"].as_i64().unwrap();
    let manager_id = body["data"]["manager_id"].as_i64().unwrap();

    let (status, _) = send(
        app,
        "DELETE",
        &format!("/api/schools/{school_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let schools: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schools WHERE id = $1")
        .bind(school_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(schools, 0);

    let manager_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = $1")
        .bind(manager_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(manager_users, 0);

    let manager_roles: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_roles WHERE user_id = $1")
            .bind(manager_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(manager_roles, 0);

    let manager_profiles: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_profiles WHERE user_id = $1")
            .bind(manager_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(manager_profiles, 0);
}
