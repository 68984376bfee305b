//! Staff-only listing and editing of leads.

use axum::{
    Router,
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::get,
};
use db::models::lead::{Lead, LeadPage};
use deployment::Deployment;
use services::services::leads::{LeadQuery, NotificationStatus, SaveLead, SavedLead};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::require_admin};

/// GET /api/leads?page=&status=
/// One newest-first page with the matching total
pub async fn list_leads(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<LeadQuery>,
) -> Result<ResponseJson<ApiResponse<LeadPage>>, ApiError> {
    let page = deployment.leads().list_page(&query).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

/// GET /api/leads/{lead_id}
pub async fn get_lead(
    State(deployment): State<DeploymentImpl>,
    Path(lead_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Lead>>, ApiError> {
    let lead = deployment.leads().get(lead_id).await?;
    Ok(ResponseJson(ApiResponse::success(lead)))
}

/// PUT /api/leads/{lead_id}
/// Save proposals and status. When the update fails after the lead was
/// notified, the error response carries the notification in `error_data`.
pub async fn save_lead(
    State(deployment): State<DeploymentImpl>,
    Path(lead_id): Path<Uuid>,
    axum::Json(payload): axum::Json<SaveLead>,
) -> Result<Response, ApiError> {
    let outcome = deployment.leads().save(lead_id, &payload).await?;
    let notification = outcome.notification.as_ref().map(NotificationStatus::from);

    match (outcome.update, notification) {
        (Ok(lead), notification) => Ok(ResponseJson(ApiResponse::<SavedLead>::success(SavedLead {
            lead,
            notification,
        }))
        .into_response()),
        (Err(e), Some(notification)) => Ok(ApiError::from(e).with_error_data(notification)),
        (Err(e), None) => Err(e.into()),
    }
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/leads", get(list_leads))
        .route("/leads/{lead_id}", get(get_lead).put(save_lead))
        .route_layer(from_fn_with_state(deployment.clone(), require_admin))
}
