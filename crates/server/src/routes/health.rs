use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// GET /api/health
/// Liveness plus a trivial store round-trip
pub async fn health_check(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<HealthStatus>>, ApiError> {
    sqlx::query("SELECT 1").execute(&deployment.db().pool).await?;

    Ok(ResponseJson(ApiResponse::success(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/health", get(health_check))
}
