mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

use common::{auth_token, seed_admin, seed_class, seed_school, send, setup_app, unique_email};

#[sqlx::test(migrations = "./migrations")]
async fn test_assign_classes_is_idempotent(pool: PgPool) {
    let admin = seed_admin(&pool).await;
    let school_id = seed_school(&pool).await;
    let class_id = seed_class(&pool, school_id).await;
    let app = setup_app(pool.clone());
    let token = auth_token(app.clone(), &admin.email, &admin.password).await;

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/teachers",
        Some(&token),
        Some(json!({
            "first_name": "Nora",
            "last_name": "Saleh",
            "email": unique_email("teacher"),
            "school_id": school_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let teacher_id = body["data"]["user_id"].as_i64().unwrap();

    for _ in 0..2 {
        let (status, _) = send(
            app.clone(),
            "POST",
            "/api/teachers/assign-classes",
            Some(&token),
            Some(json!({
                "teacher_id": teacher_id,
                "class_ids": [class_id],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let links: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM class_teachers WHERE teacher_id = $1 AND class_id = $2",
    )
    .bind(teacher_id)
    .bind(class_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(links, 1);
}
