use std::sync::Arc;

use db::DBService;
use deployment::{Deployment, DeploymentError};
use secrecy::{ExposeSecret, SecretString};
use services::services::{
    config::Config,
    email::{EmailSender, ResendClient},
    proposal_email::ProposalMailer,
};
use tracing::info;

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<Config>,
    db: DBService,
    mailer: ProposalMailer,
}

impl LocalDeployment {
    /// Open the store and build the provider client described by `config`.
    pub async fn from_config(config: Config) -> Result<Self, DeploymentError> {
        let db = DBService::new(&config.database_url).await?;
        let api_key = SecretString::from(config.resend_api_key.expose_secret().to_string());
        let sender = ResendClient::new(api_key, &config.resend_base_url)?;

        info!(
            database_url = %config.database_url,
            provider = %config.resend_base_url,
            "Deployment initialised"
        );

        Ok(Self::from_parts(config, db, Arc::new(sender)))
    }

    /// Assemble from already-built parts, e.g. an in-memory store and a
    /// recording sender.
    pub fn from_parts(config: Config, db: DBService, sender: Arc<dyn EmailSender>) -> Self {
        let mailer = ProposalMailer::new(sender, config.email_from.clone());
        Self {
            config: Arc::new(config),
            db,
            mailer,
        }
    }
}

impl Deployment for LocalDeployment {
    fn config(&self) -> &Config {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn mailer(&self) -> &ProposalMailer {
        &self.mailer
    }
}
