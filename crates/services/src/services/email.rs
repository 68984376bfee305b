//! Transactional email delivery through the Resend HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error)]
pub enum EmailError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("json error: {0}")]
    Serde(String),
}

/// A fully rendered message ready for the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Provider acknowledgement for an accepted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub id: String,
}

/// Anything that can hand a rendered message to a delivery provider.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, EmailError>;
}

/// Resend API client. Delivery, retries and bounces are the provider's job,
/// so a failed call is reported once and never repeated here.
#[derive(Debug)]
pub struct ResendClient {
    http: Client,
    api_key: SecretString,
    endpoint: Url,
}

impl ResendClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(api_key: SecretString, base_url: &Url) -> Result<Self, EmailError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("leads-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        let endpoint = base_url
            .join("emails")
            .map_err(|e| EmailError::Transport(format!("bad provider url: {e}")))?;

        Ok(Self {
            http,
            api_key,
            endpoint,
        })
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, EmailError> {
        let res = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(email)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<SendReceipt>()
                .await
                .map_err(|e| EmailError::Serde(e.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(EmailError::InvalidApiKey),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(EmailError::Http { status, body })
            }
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> EmailError {
    if e.is_timeout() {
        EmailError::Timeout
    } else {
        EmailError::Transport(e.to_string())
    }
}
