//! Renders the "your proposals are ready" email and hands it to the provider.

use std::sync::Arc;

use askama::Template;
use db::models::lead::{Lead, UpdateLeadProposals};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use ts_rs::TS;

use super::email::{EmailError, EmailSender, OutboundEmail, SendReceipt};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("template error: {0}")]
    Render(#[from] askama::Error),
    #[error("email delivery failed: {0}")]
    Delivery(#[from] EmailError),
    #[error("recipient address is empty")]
    MissingRecipient,
}

/// Payload of the proposal notification, also the JSON body accepted by the
/// send-proposal-email endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ProposalEmail {
    pub to: String,
    pub first_name: String,
    pub proposal_1: String,
    pub proposal_2: String,
    pub proposal_3: String,
}

impl ProposalEmail {
    /// Addressed to the lead, carrying the proposals being saved.
    pub fn for_lead(lead: &Lead, proposals: &UpdateLeadProposals) -> Self {
        Self {
            to: lead.email.clone(),
            first_name: lead.first_name.clone(),
            proposal_1: proposals.proposal_1.clone(),
            proposal_2: proposals.proposal_2.clone(),
            proposal_3: proposals.proposal_3.clone(),
        }
    }

    pub fn subject(&self) -> String {
        format!("{} – 3 picks for your property", self.first_name)
    }
}

// Every interpolation is HTML-escaped by askama.
#[derive(Template)]
#[template(path = "proposal_email.html")]
struct ProposalEmailTemplate<'a> {
    first_name: &'a str,
    proposals: [&'a str; 3],
}

/// Renders proposal notifications and submits them through an
/// [`EmailSender`]. Shared by the save flow and the HTTP endpoint.
#[derive(Clone)]
pub struct ProposalMailer {
    sender: Arc<dyn EmailSender>,
    from: String,
}

impl ProposalMailer {
    pub fn new(sender: Arc<dyn EmailSender>, from: impl Into<String>) -> Self {
        Self {
            sender,
            from: from.into(),
        }
    }

    pub fn render(&self, email: &ProposalEmail) -> Result<OutboundEmail, NotificationError> {
        if email.to.trim().is_empty() {
            return Err(NotificationError::MissingRecipient);
        }

        let html = ProposalEmailTemplate {
            first_name: &email.first_name,
            proposals: [
                email.proposal_1.as_str(),
                email.proposal_2.as_str(),
                email.proposal_3.as_str(),
            ],
        }
        .render()?;

        Ok(OutboundEmail {
            from: self.from.clone(),
            to: email.to.trim().to_string(),
            subject: email.subject(),
            html,
        })
    }

    /// Render and submit once. Failures are logged here and returned.
    pub async fn send(&self, email: &ProposalEmail) -> Result<SendReceipt, NotificationError> {
        let outbound = self.render(email)?;

        match self.sender.send(&outbound).await {
            Ok(receipt) => {
                info!(
                    email_id = %receipt.id,
                    to = %outbound.to,
                    "Proposal email accepted by provider"
                );
                Ok(receipt)
            }
            Err(e) => {
                error!(to = %outbound.to, error = %e, "Proposal email failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Capture {
        sent: Mutex<Vec<OutboundEmail>>,
    }

    #[async_trait]
    impl EmailSender for Capture {
        async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, EmailError> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(SendReceipt {
                id: "em_test".to_string(),
            })
        }
    }

    fn payload() -> ProposalEmail {
        ProposalEmail {
            to: "jo@x.com".to_string(),
            first_name: "Jo".to_string(),
            proposal_1: "A".to_string(),
            proposal_2: "B".to_string(),
            proposal_3: "C".to_string(),
        }
    }

    fn mailer() -> (ProposalMailer, Arc<Capture>) {
        let capture = Arc::new(Capture::default());
        (
            ProposalMailer::new(capture.clone(), "noreply@syncworkflow.com"),
            capture,
        )
    }

    #[test]
    fn test_render_fills_template() {
        let (mailer, _) = mailer();
        let out = mailer.render(&payload()).unwrap();

        assert_eq!(out.from, "noreply@syncworkflow.com");
        assert_eq!(out.to, "jo@x.com");
        assert_eq!(out.subject, "Jo – 3 picks for your property");
        assert!(out.html.contains("Hi Jo,"));
        assert!(out.html.contains("<li>A</li>"));
        assert!(out.html.contains("<li>B</li>"));
        assert!(out.html.contains("<li>C</li>"));
    }

    #[test]
    fn test_render_escapes_proposal_markup() {
        let (mailer, _) = mailer();
        let mut email = payload();
        email.proposal_2 = "<script>alert(1)</script> & co".to_string();
        email.first_name = "<b>Jo</b>".to_string();

        let out = mailer.render(&email).unwrap();
        assert!(!out.html.contains("<script>"));
        assert!(out.html.contains("&lt;script&gt;alert(1)&lt;"));
        assert!(out.html.contains("&amp; co"));
        assert!(out.html.contains("Hi &lt;b&gt;Jo&lt;"));
    }

    #[test]
    fn test_render_keeps_empty_proposals() {
        let (mailer, _) = mailer();
        let mut email = payload();
        email.proposal_3 = String::new();
        let out = mailer.render(&email).unwrap();
        assert_eq!(out.html.matches("<li>").count(), 3);
        assert!(out.html.contains("<li></li>"));
    }

    #[test]
    fn test_render_rejects_blank_recipient() {
        let (mailer, _) = mailer();
        let mut email = payload();
        email.to = "  ".to_string();
        assert!(matches!(
            mailer.render(&email),
            Err(NotificationError::MissingRecipient)
        ));
    }

    #[tokio::test]
    async fn test_send_submits_once() {
        let (mailer, capture) = mailer();
        let receipt = mailer.send(&payload()).await.unwrap();
        assert_eq!(receipt.id, "em_test");
        assert_eq!(capture.sent.lock().unwrap().len(), 1);
    }
}
