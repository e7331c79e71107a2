use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use docbank_api::handlers::{auth, documents, protocols};
use docbank_api::middleware::auth::jwt_auth_middleware;
use docbank_api::middleware::authorize::authorize_middleware;
use docbank_api::middleware::logging::request_logging_middleware;
use docbank_api::state::AppState;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = docbank_api::config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting docbank API in {:?} mode", config.environment);

    let state = AppState::initialize().await;
    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("DOCBANK_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("docbank API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected API
        .merge(document_routes())
        .merge(protocol_routes())
        .with_state(state)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_logging_middleware))
}

fn auth_public_routes() -> Router<AppState> {
    use axum::routing::post;

    Router::new().route("/auth/login", post(auth::login))
}

fn document_routes() -> Router<AppState> {
    use axum::routing::{post, put};

    let max_upload = docbank_api::config::config().api.max_upload_size_bytes;

    Router::new()
        .route("/documents", post(documents::create))
        .route(
            "/documents/:id",
            get(documents::get)
                .patch(documents::update_metadata)
                .delete(documents::delete),
        )
        .route("/documents/:id/content", put(documents::replace_content))
        .layer(DefaultBodyLimit::max(max_upload))
        .route_layer(middleware::from_fn(authorize_middleware))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

fn protocol_routes() -> Router<AppState> {
    use axum::routing::post;

    Router::new()
        .route("/protocols", post(protocols::create))
        .route("/protocols/:id", get(protocols::get).put(protocols::update_all))
        .route("/protocols/:id/state", axum::routing::patch(protocols::update_state))
        .route_layer(middleware::from_fn(authorize_middleware))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "docbank API",
            "version": version,
            "description": "Document and protocol management backend",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/login (public - token acquisition)",
                "documents": "/documents[/:id][/content] (protected)",
                "protocols": "/protocols[/:id][/state] (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match docbank_api::database::manager::DatabaseManager::health_check().await {
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
