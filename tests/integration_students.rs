mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use common::{auth_token, seed_admin, seed_school, send, setup_app, unique_email};

fn student_payload(school_id: i64, parent_email: Option<&str>) -> serde_json::Value {
    let mut payload = json!({
        "first_name": "Sara",
        "last_name": "Hassan",
        "email": unique_email("student"),
        "school_id": school_id,
        "grade": "7",
        "student_no": format!("STU-{}", Uuid::new_v4().simple()),
    });
    if let Some(parent_email) = parent_email {
        payload["parents"] = json!([{
            "first_name": "Omar",
            "last_name": "Hassan",
            "email": parent_email,
        }]);
    }
    payload
}

async fn parent_user_count(pool: &PgPool, email: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn parent_link_count(pool: &PgPool, email: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM parent_students ps
         INNER JOIN parents p ON p.id = ps.parent_id
         INNER JOIN users u ON u.id = p.user_id
         WHERE u.email = $1",
    )
    .bind(email)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_account_reused_across_students(pool: PgPool) {
    let admin = seed_admin(&pool).await;
    let school_id = seed_school(&pool).await;
    let app = setup_app(pool.clone());
    let token = auth_token(app.clone(), &admin.email, &admin.password).await;

    let parent_email = unique_email("parent");

    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/students",
        Some(&token),
        Some(student_payload(school_id, Some(&parent_email))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        app,
        "POST",
        "/api/students",
        Some(&token),
        Some(student_payload(school_id, Some(&parent_email))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(parent_user_count(&pool, &parent_email).await, 1);

    let parent_rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM parents p
         INNER JOIN users u ON u.id = p.user_id
         WHERE u.email = $1",
    )
    .bind(&parent_email)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(parent_rows, 1);

    assert_eq!(parent_link_count(&pool, &parent_email).await, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_student_removes_orphaned_parent(pool: PgPool) {
    let admin = seed_admin(&pool).await;
    let school_id = seed_school(&pool).await;
    let app = setup_app(pool.clone());
    let token = auth_token(app.clone(), &admin.email, &admin.password).await;

    let parent_email = unique_email("parent");
    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/students",
        Some(&token),
        Some(student_payload(school_id, Some(&parent_email))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let student_id = body["data"]["id"].as_i64().unwrap();
    let student_user_id = body["data"]["user_id"].as_i64().unwrap();

    let (status, _) = send(
        app,
        "DELETE",
        &format!("/api/students/{student_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let students: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE id = $1")
        .bind(student_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(students, 0);

    let student_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = $1")
        .bind(student_user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(student_users, 0);

    // The parent's only child is gone, so the parent account goes too.
    assert_eq!(parent_user_count(&pool, &parent_email).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_shared_parent_survives_sibling_delete(pool: PgPool) {
    let admin = seed_admin(&pool).await;
    let school_id = seed_school(&pool).await;
    let app = setup_app(pool.clone());
    let token = auth_token(app.clone(), &admin.email, &admin.password).await;

    let parent_email = unique_email("parent");

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/students",
        Some(&token),
        Some(student_payload(school_id, Some(&parent_email))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let first_student_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/students",
        Some(&token),
        Some(student_payload(school_id, Some(&parent_email))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        app,
        "DELETE",
        &format!("/api/students/{first_student_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(parent_user_count(&pool, &parent_email).await, 1);
    assert_eq!(parent_link_count(&pool, &parent_email).await, 1);
}
