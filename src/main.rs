use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use scribe_api_rust::{config, database};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Scribe API in {:?} mode", config.environment);

    // Best-effort schema bootstrap; requests report degraded service until
    // the store is reachable.
    match database::manager::DatabaseManager::pool().await {
        Ok(pool) => {
            if let Err(e) = database::schema::ensure_schema(&pool).await {
                tracing::warn!("Schema bootstrap failed: {}", e);
            }
        }
        Err(e) => tracing::warn!("Database unavailable at startup: {}", e),
    }

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("SCRIBE_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Scribe API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Resource routers
        .merge(auth_routes())
        .merge(post_routes())
        .merge(category_routes())
        // Uploaded images are served from a static path
        .nest_service("/uploads", ServeDir::new(&config::config().uploads.dir))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn auth_routes() -> Router {
    use axum::routing::post;
    use scribe_api_rust::handlers::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
}

fn post_routes() -> Router {
    use axum::routing::post;
    use scribe_api_rust::handlers::posts;

    Router::new()
        .route("/api/posts", get(posts::list).post(posts::create))
        .route(
            "/api/posts/:id",
            get(posts::get).put(posts::update).delete(posts::delete),
        )
        .route("/api/posts/:id/comments", post(posts::add_comment))
}

fn category_routes() -> Router {
    use scribe_api_rust::handlers::categories;

    Router::new()
        .route(
            "/api/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/api/categories/:id",
            get(categories::get)
                .put(categories::update)
                .delete(categories::delete),
        )
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Scribe API (Rust)",
            "version": version,
            "description": "Blogging platform backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/register, /auth/login (public), /api/auth/me (protected)",
                "posts": "/api/posts[/:idOrSlug] (GET public, mutations protected)",
                "comments": "/api/posts/:id/comments (protected)",
                "categories": "/api/categories[/:idOrSlug] (GET public, mutations admin)",
                "uploads": "/uploads/:filename (public, static)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
