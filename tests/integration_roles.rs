mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use common::{auth_token, seed_admin, send, setup_app};

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_role_blocked_while_held(pool: PgPool) {
    let admin = seed_admin(&pool).await;
    let app = setup_app(pool.clone());
    let token = auth_token(app.clone(), &admin.email, &admin.password).await;

    let role_name = format!("librarian-{}", Uuid::new_v4().simple());
    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/roles",
        Some(&token),
        Some(json!({"name": role_name})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let role_id = body["data"]["id"].as_i64().unwrap();

    sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
        .bind(admin.user_id)
        .bind(role_id)
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = send(
        app.clone(),
        "DELETE",
        &format!("/api/roles/{role_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert!(body["message"].as_str().unwrap().contains(&role_name));

    let roles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE id = $1")
        .bind(role_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(roles, 1);

    sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
        .bind(admin.user_id)
        .bind(role_id)
        .execute(&pool)
        .await
        .unwrap();

    let (status, _) = send(
        app,
        "DELETE",
        &format!("/api/roles/{role_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let roles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE id = $1")
        .bind(role_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(roles, 0);
}
