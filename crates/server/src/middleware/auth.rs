//! Bearer-token guard for staff-only routes.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use deployment::Deployment;
use secrecy::ExposeSecret;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::{DeploymentImpl, error::ApiError};

/// Extract the token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Constant-time comparison so response timing does not leak the token.
pub fn token_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

pub async fn require_admin(
    State(deployment): State<DeploymentImpl>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(request.headers()) else {
        warn!(path = %request.uri().path(), "Admin request without bearer token");
        return Err(ApiError::Unauthorized);
    };

    if !token_matches(token, deployment.config().admin_token.expose_secret()) {
        warn!(path = %request.uri().path(), "Admin request with invalid token");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}
