use dotenvy::dotenv;

use ehtimami::logging::init_tracing;
use ehtimami::router::init_router;
use ehtimami::state::init_app_state;

#[tokio::main]
async fn main() {
    dotenv().ok();

    init_tracing();

    let state = init_app_state().await;
    let port = state.server_config.port;
    let app = init_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .unwrap_or_else(|e| panic!("Failed to bind port {port}: {e}"));
    println!("🚀 Server running on http://localhost:{port}");
    println!("📚 Swagger UI available at http://localhost:{port}/swagger-ui");
    println!("📖 Scalar UI available at http://localhost:{port}/scalar");
    axum::serve(listener, app)
        .await
        .unwrap_or_else(|e| panic!("Server error: {e}"));
}
