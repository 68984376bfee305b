//! Public lead intake: a JSON endpoint and a server-rendered form.

use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json as ResponseJson, Response},
    routing::{get, post},
};
use db::models::lead::{CreateLead, Lead};
use deployment::Deployment;
use services::services::leads::LeadError;
use tracing::error;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

pub const ACKNOWLEDGMENT: &str = "Thank you! Your property has been submitted.";

#[derive(Template)]
#[template(path = "intake_form.html")]
struct IntakeFormTemplate<'a> {
    error: Option<String>,
    property_link: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
}

impl<'a> IntakeFormTemplate<'a> {
    fn blank() -> Self {
        Self {
            error: None,
            property_link: "",
            first_name: "",
            last_name: "",
            email: "",
        }
    }

    fn retry(data: &'a CreateLead, error: String) -> Self {
        Self {
            error: Some(error),
            property_link: &data.property_link,
            first_name: &data.first_name,
            last_name: &data.last_name,
            email: &data.email,
        }
    }
}

#[derive(Template)]
#[template(path = "intake_thanks.html")]
struct IntakeThanksTemplate<'a> {
    message: &'a str,
}

/// POST /api/intake
pub async fn submit_intake(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<CreateLead>,
) -> Result<ResponseJson<ApiResponse<Lead>>, ApiError> {
    let lead = deployment.leads().submit_intake(&payload).await?;
    Ok(ResponseJson(ApiResponse::success(lead)))
}

/// GET /intake
pub async fn intake_form() -> Result<Html<String>, ApiError> {
    Ok(Html(IntakeFormTemplate::blank().render()?))
}

/// POST /intake
/// Store failures are shown to the visitor rather than swallowed.
pub async fn submit_intake_form(
    State(deployment): State<DeploymentImpl>,
    Form(payload): Form<CreateLead>,
) -> Result<Response, ApiError> {
    match deployment.leads().submit_intake(&payload).await {
        Ok(_) => {
            let page = IntakeThanksTemplate {
                message: ACKNOWLEDGMENT,
            }
            .render()?;
            Ok(Html(page).into_response())
        }
        Err(e) => {
            let (status, message) = match &e {
                LeadError::Invalid { .. } => (StatusCode::BAD_REQUEST, format!("Please check your details: {e}")),
                _ => {
                    error!(error = %e, "Intake form submission failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "We couldn't save your submission. Please try again.".to_string(),
                    )
                }
            };
            let page = IntakeFormTemplate::retry(&payload, message).render()?;
            Ok((status, Html(page)).into_response())
        }
    }
}

pub fn api_router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/intake", post(submit_intake))
}

pub fn form_router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/intake", get(intake_form).post(submit_intake_form))
}
