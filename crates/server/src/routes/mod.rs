use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::DeploymentImpl;

pub mod health;
pub mod intake;
pub mod leads;
pub mod proposal_email;

pub fn router(deployment: DeploymentImpl) -> Router {
    let api_routes = Router::new()
        .merge(health::router(&deployment))
        .merge(intake::api_router(&deployment))
        .merge(leads::router(&deployment))
        .merge(proposal_email::router(&deployment));

    Router::new()
        .nest("/api", api_routes)
        .merge(intake::form_router(&deployment))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
