//! Database configuration and connection pool initialization.
//!
//! The database URL is read from the `DATABASE_URL` environment variable.
//! The returned pool is cheaply cloneable and lives in the application
//! state for the process lifetime; there is no ambient global client.

use sqlx::PgPool;
use std::env;

/// Initializes the PostgreSQL connection pool.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is not set or the connection fails. This runs
/// once at startup; a service without a database cannot do anything useful.
pub async fn init_db_pool() -> PgPool {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    pool
}
