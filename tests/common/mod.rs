use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use sqlx::PgPool;
use uuid::Uuid;

use ehtimami::config::cors::CorsConfig;
use ehtimami::config::email::EmailConfig;
use ehtimami::config::jwt::JwtConfig;
use ehtimami::config::server::ServerConfig;
use ehtimami::router::init_router;
use ehtimami::state::AppState;
use ehtimami::utils::email::EmailService;
use ehtimami::utils::password::hash_password;

#[allow(dead_code)]
pub struct TestAdmin {
    pub user_id: i64,
    pub email: String,
    pub password: String,
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}.{}@example.com", prefix, Uuid::new_v4().simple())
}

/// Full application router over the test pool. Email dispatch is disabled
/// so background welcome mails become no-ops.
pub fn setup_app(pool: PgPool) -> Router {
    let state = AppState {
        db: pool,
        jwt_config: JwtConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        server_config: ServerConfig::from_env(),
        email: EmailService::new(EmailConfig {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@ehtimami.com".to_string(),
            from_name: "Ehtimami".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
        }),
    };
    init_router(state)
}

pub async fn seed_admin(pool: &PgPool) -> TestAdmin {
    let email = unique_email("admin");
    let password = "adminpass123".to_string();
    let hashed = hash_password(&password).unwrap();

    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (first_name, last_name, email, password, status, is_verified)
         VALUES ('Test', 'Admin', $1, $2, 'ACTIVE', TRUE)
         RETURNING id",
    )
    .bind(&email)
    .bind(&hashed)
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         SELECT $1, id FROM roles WHERE name = 'admin'",
    )
    .bind(user_id)
    .execute(pool)
    .await
    .unwrap();

    TestAdmin {
        user_id,
        email,
        password,
    }
}

#[allow(dead_code)]
pub async fn seed_school(pool: &PgPool) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO schools (school_unique_id, school_name, school_address, school_email)
         VALUES ($1, $2, '12 Test Street', $3)
         RETURNING id",
    )
    .bind(format!("SCH-{}", Uuid::new_v4().simple()))
    .bind(format!("Test School {}", Uuid::new_v4().simple()))
    .bind(unique_email("school"))
    .fetch_one(pool)
    .await
    .unwrap()
}

#[allow(dead_code)]
pub async fn seed_class(pool: &PgPool, school_id: i64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO classes (code, name, grade_level, school_id)
         VALUES ($1, 'Algebra', '7', $2)
         RETURNING id",
    )
    .bind(format!("CLS-{}", Uuid::new_v4().simple()))
    .bind(school_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Raw student row plus its backing user, bypassing the service layer.
#[allow(dead_code)]
pub async fn seed_student(pool: &PgPool, school_id: i64) -> i64 {
    let hashed = hash_password("studentpass1").unwrap();
    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (first_name, last_name, email, password, status, is_verified)
         VALUES ('Test', 'Student', $1, $2, 'ACTIVE', TRUE)
         RETURNING id",
    )
    .bind(unique_email("student"))
    .bind(&hashed)
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query_scalar(
        "INSERT INTO students (user_id, school_id, student_no, grade)
         VALUES ($1, $2, $3, '7')
         RETURNING id",
    )
    .bind(user_id)
    .bind(school_id)
    .bind(format!("STU-{}", Uuid::new_v4().simple()))
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn auth_token(app: Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({"email": email, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    use tower::util::ServiceExt;

    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = builder
        .body(match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
