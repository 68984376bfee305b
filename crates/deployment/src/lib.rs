use db::{DBError, DBService};
use services::services::{
    config::Config,
    email::EmailError,
    leads::LeadService,
    proposal_email::ProposalMailer,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Database(#[from] DBError),
    #[error("email client: {0}")]
    Email(#[from] EmailError),
}

/// Everything a request handler needs, built once per process and shared.
pub trait Deployment: Clone + Send + Sync + 'static {
    fn config(&self) -> &Config;

    fn db(&self) -> &DBService;

    fn mailer(&self) -> &ProposalMailer;

    fn leads(&self) -> LeadService {
        LeadService::new(self.db().pool.clone(), self.mailer().clone())
    }
}
