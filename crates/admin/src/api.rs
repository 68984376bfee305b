use std::time::Duration;

use db::models::lead::{CreateLead, Lead, LeadPage};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use services::services::{
    leads::{LeadQuery, NotificationStatus, SaveLead, SavedLead},
    proposal_email::ProposalEmail,
};
use thiserror::Error;
use url::Url;
use utils::response::ApiResponse;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum AdminClientError {
    #[error("invalid API url: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Api {
        status: StatusCode,
        message: String,
        notification: Option<NotificationStatus>,
    },
    #[error("unexpected response ({status}): {body}")]
    Unexpected { status: StatusCode, body: String },
}

impl AdminClientError {
    /// The lead changed since it was loaded.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == StatusCode::CONFLICT)
    }

    /// Notification attempted by a save that still failed.
    pub fn notification(&self) -> Option<&NotificationStatus> {
        match self {
            Self::Api { notification, .. } => notification.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmailReply {
    #[serde(default)]
    success: bool,
    error: Option<String>,
}

/// Thin client over the leads HTTP API.
#[derive(Debug)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl AdminClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, AdminClientError> {
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()).map(SecretString::from),
        })
    }

    fn url(&self, path: &str) -> Result<Url, AdminClientError> {
        Ok(self.base_url.join(path)?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    pub async fn list(&self, query: &LeadQuery) -> Result<LeadPage, AdminClientError> {
        let request = self.http.get(self.url("api/leads")?).query(query);
        let response = self.authorized(request).send().await?;
        decode(response).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Lead, AdminClientError> {
        let request = self.http.get(self.url(&format!("api/leads/{id}"))?);
        let response = self.authorized(request).send().await?;
        decode(response).await
    }

    pub async fn save(&self, id: Uuid, save: &SaveLead) -> Result<SavedLead, AdminClientError> {
        let request = self.http.put(self.url(&format!("api/leads/{id}"))?).json(save);
        let response = self.authorized(request).send().await?;
        decode(response).await
    }

    /// Intake is public; no token is sent.
    pub async fn submit(&self, data: &CreateLead) -> Result<Lead, AdminClientError> {
        let response = self.http.post(self.url("api/intake")?).json(data).send().await?;
        decode(response).await
    }

    pub async fn send_proposal_email(&self, email: &ProposalEmail) -> Result<(), AdminClientError> {
        let request = self
            .http
            .post(self.url("api/send-proposal-email")?)
            .json(email);
        let response = self.authorized(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<EmailReply>(&body) {
            Ok(reply) if status.is_success() && reply.success => Ok(()),
            Ok(EmailReply {
                error: Some(message),
                ..
            }) => Err(AdminClientError::Api {
                status,
                message,
                notification: None,
            }),
            _ => Err(unexpected_or_envelope(status, body)),
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AdminClientError> {
    let status = response.status();
    let body = response.text().await?;

    let envelope: ApiResponse<T, Value> = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(_) => return Err(unexpected_or_envelope(status, body)),
    };

    if envelope.is_success() {
        return envelope
            .into_data()
            .ok_or(AdminClientError::Unexpected { status, body });
    }

    Err(api_error(status, &envelope))
}

fn api_error<T>(status: StatusCode, envelope: &ApiResponse<T, Value>) -> AdminClientError {
    AdminClientError::Api {
        status,
        message: envelope.message().unwrap_or("request failed").to_string(),
        notification: envelope
            .error_data()
            .and_then(|data| serde_json::from_value(data.clone()).ok()),
    }
}

// Falls back to the untyped envelope so the server's message survives.
fn unexpected_or_envelope(status: StatusCode, body: String) -> AdminClientError {
    match serde_json::from_str::<ApiResponse<(), Value>>(&body) {
        Ok(envelope) if !envelope.is_success() => api_error(status, &envelope),
        _ => AdminClientError::Unexpected { status, body },
    }
}
