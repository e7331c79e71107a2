use axum::{extract::Request, middleware::Next, response::Response};

use crate::config;

/// Logs every incoming request as a single info line.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    if config::config().api.enable_request_logging {
        tracing::info!("Incoming {} request to: {}", request.method(), request.uri().path());
    }
    next.run(request).await
}
