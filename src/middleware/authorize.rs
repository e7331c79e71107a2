use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

use super::auth::AuthUser;

/// Authority required for a protected route. `None` means the route is not in
/// the table and is denied outright.
pub fn required_authority(method: &str, path: &str) -> Option<&'static str> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        ("POST", ["documents"]) => Some("CREATE_DOCUMENT"),
        ("GET", ["documents", _]) => Some("VIEW_DOCUMENT"),
        ("PATCH", ["documents", _]) => Some("EDIT_DOCUMENT"),
        ("PUT", ["documents", _, "content"]) => Some("EDIT_DOCUMENT"),
        ("DELETE", ["documents", _]) => Some("DELETE_DOCUMENT"),
        ("POST", ["protocols"]) => Some("CREATE_PROTOCOL"),
        ("GET", ["protocols", _]) => Some("VIEW_PROTOCOL"),
        ("PUT", ["protocols", _]) => Some("EDIT_PROTOCOL"),
        ("PATCH", ["protocols", _, "state"]) => Some("EDIT_PROTOCOL"),
        _ => None,
    }
}

/// Per-route capability check. Runs after `jwt_auth_middleware`, so an absent
/// `AuthUser` extension means the request never authenticated.
pub async fn authorize_middleware(request: Request, next: Next) -> Result<Response, Response> {
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();

    let Some(user) = request.extensions().get::<AuthUser>().cloned() else {
        return Err(ApiError::unauthorized("Missing authentication").into_response());
    };

    match required_authority(&method, &path) {
        Some(authority) if user.authorities.iter().any(|a| a == authority) => {
            Ok(next.run(request).await)
        }
        _ => Err(ApiError::forbidden("Access is denied").into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_routes_map_to_document_authorities() {
        assert_eq!(required_authority("POST", "/documents"), Some("CREATE_DOCUMENT"));
        assert_eq!(required_authority("GET", "/documents/abc"), Some("VIEW_DOCUMENT"));
        assert_eq!(required_authority("PATCH", "/documents/abc"), Some("EDIT_DOCUMENT"));
        assert_eq!(required_authority("PUT", "/documents/abc/content"), Some("EDIT_DOCUMENT"));
        assert_eq!(required_authority("DELETE", "/documents/abc"), Some("DELETE_DOCUMENT"));
    }

    #[test]
    fn protocol_routes_map_to_protocol_authorities() {
        assert_eq!(required_authority("POST", "/protocols"), Some("CREATE_PROTOCOL"));
        assert_eq!(required_authority("GET", "/protocols/abc"), Some("VIEW_PROTOCOL"));
        assert_eq!(required_authority("PUT", "/protocols/abc"), Some("EDIT_PROTOCOL"));
        assert_eq!(required_authority("PATCH", "/protocols/abc/state"), Some("EDIT_PROTOCOL"));
    }

    #[test]
    fn unlisted_routes_are_denied_by_default() {
        assert_eq!(required_authority("GET", "/documents"), None);
        assert_eq!(required_authority("DELETE", "/protocols/abc"), None);
        assert_eq!(required_authority("POST", "/documents/abc/content"), None);
        assert_eq!(required_authority("GET", "/anything/else"), None);
    }
}
