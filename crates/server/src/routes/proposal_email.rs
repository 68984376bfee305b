use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::post,
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::proposal_email::ProposalEmail;
use tracing::{error, warn};

use crate::{DeploymentImpl, middleware::auth::require_admin};

#[derive(Debug, Serialize, Deserialize)]
pub struct EmailSent {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmailFailed {
    pub error: String,
}

/// POST /api/send-proposal-email
/// `{ success: true }` on 200, `{ error }` otherwise
pub async fn send_proposal_email(
    State(deployment): State<DeploymentImpl>,
    payload: Result<Json<ProposalEmail>, JsonRejection>,
) -> Response {
    let email = match payload {
        Ok(Json(email)) => email,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected proposal email request");
            return (
                StatusCode::BAD_REQUEST,
                Json(EmailFailed {
                    error: "Invalid request body".to_string(),
                }),
            )
                .into_response();
        }
    };

    match deployment.mailer().send(&email).await {
        Ok(_) => (StatusCode::OK, Json(EmailSent { success: true })).into_response(),
        Err(e) => {
            error!(error = %e, "Email error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(EmailFailed {
                    error: "Failed to send email".to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/send-proposal-email", post(send_proposal_email))
        .route_layer(from_fn_with_state(deployment.clone(), require_admin))
}
