//! Intake, listing and editing of leads.

use std::sync::LazyLock;

use db::models::lead::{CreateLead, Lead, LeadPage, LeadStatus, UpdateLeadProposals};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    email::SendReceipt,
    proposal_email::{NotificationError, ProposalEmail, ProposalMailer},
};

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

#[derive(Debug, Error)]
pub enum LeadError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
    #[error("lead not found")]
    NotFound,
    #[error("lead was changed by someone else (expected version {expected}, found {actual})")]
    Conflict { expected: i64, actual: i64 },
}

/// Listing parameters. `page` is 1-indexed and defaults to 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct LeadQuery {
    pub page: Option<u32>,
    pub status: Option<LeadStatus>,
}

/// Edited snapshot submitted by the admin view.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SaveLead {
    #[serde(flatten)]
    #[ts(flatten)]
    pub fields: UpdateLeadProposals,
    pub expected_version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent { id: String },
    Failed { message: String },
}

impl From<&Result<SendReceipt, NotificationError>> for NotificationStatus {
    fn from(result: &Result<SendReceipt, NotificationError>) -> Self {
        match result {
            Ok(receipt) => Self::Sent {
                id: receipt.id.clone(),
            },
            Err(e) => Self::Failed {
                message: e.to_string(),
            },
        }
    }
}

/// Response body of a successful save.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SavedLead {
    pub lead: Lead,
    pub notification: Option<NotificationStatus>,
}

/// Result of a save: the update and the notification are independent, the
/// notification is attempted even when the update failed.
#[derive(Debug)]
pub struct SaveOutcome {
    pub update: Result<Lead, LeadError>,
    pub notification: Option<Result<SendReceipt, NotificationError>>,
}

/// A notification goes out only on the transition into "proposals complete".
pub fn should_notify(previous: LeadStatus, next: LeadStatus) -> bool {
    next == LeadStatus::ProposalsComplete && previous != LeadStatus::ProposalsComplete
}

/// Trim all fields and check presence plus email shape.
pub fn validate_intake(data: &CreateLead) -> Result<CreateLead, LeadError> {
    let required = |field: &'static str, value: &str| -> Result<String, LeadError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(LeadError::Invalid {
                field,
                reason: "is required",
            });
        }
        Ok(value.to_string())
    };

    let normalized = CreateLead {
        property_link: required("property_link", &data.property_link)?,
        first_name: required("first_name", &data.first_name)?,
        last_name: required("last_name", &data.last_name)?,
        email: required("email", &data.email)?,
    };

    if !EMAIL_SHAPE.is_match(&normalized.email) {
        return Err(LeadError::Invalid {
            field: "email",
            reason: "must be a valid email address",
        });
    }

    Ok(normalized)
}

#[derive(Clone)]
pub struct LeadService {
    pool: SqlitePool,
    mailer: ProposalMailer,
}

impl LeadService {
    pub fn new(pool: SqlitePool, mailer: ProposalMailer) -> Self {
        Self { pool, mailer }
    }

    /// Create a lead from the public intake form.
    pub async fn submit_intake(&self, data: &CreateLead) -> Result<Lead, LeadError> {
        let data = validate_intake(data)?;
        let lead = Lead::create(&self.pool, Uuid::new_v4(), &data)
            .await
            .inspect_err(|e| error!(error = %e, "Lead intake insert failed"))?;

        info!(lead_id = %lead.id, "Lead submitted");
        Ok(lead)
    }

    pub async fn list_page(&self, query: &LeadQuery) -> Result<LeadPage, LeadError> {
        let page = query.page.unwrap_or(1);
        if page == 0 {
            return Err(LeadError::Invalid {
                field: "page",
                reason: "must be 1 or greater",
            });
        }

        Lead::find_page(&self.pool, query.status, page)
            .await
            .inspect_err(|e| error!(page, status = ?query.status, error = %e, "Lead listing failed"))
            .map_err(LeadError::from)
    }

    pub async fn get(&self, id: Uuid) -> Result<Lead, LeadError> {
        Lead::find_by_id(&self.pool, id)
            .await?
            .ok_or(LeadError::NotFound)
    }

    /// Apply an edited snapshot and, on the transition into
    /// "proposals complete", notify the lead whatever the update's outcome.
    ///
    /// The outer error covers only the initial lookup; a lead that cannot be
    /// read has no address to notify.
    pub async fn save(&self, id: Uuid, request: &SaveLead) -> Result<SaveOutcome, LeadError> {
        let current = self.get(id).await?;

        let update = match Lead::update_proposals(
            &self.pool,
            id,
            request.expected_version,
            &request.fields,
        )
        .await
        {
            Ok(Some(lead)) => Ok(lead),
            Ok(None) => Err(self.missing_or_conflict(id, request.expected_version).await),
            Err(e) => Err(LeadError::Database(e)),
        };

        match &update {
            Ok(lead) => info!(
                lead_id = %id,
                status = %lead.status,
                version = lead.version,
                "Lead updated"
            ),
            Err(e) => error!(lead_id = %id, error = %e, "Lead update failed"),
        }

        let notification = if should_notify(current.status, request.fields.status) {
            let email = ProposalEmail::for_lead(&current, &request.fields);
            let result = self.mailer.send(&email).await;
            if result.is_err() {
                warn!(lead_id = %id, "Proposals saved but the lead was not notified");
            }
            Some(result)
        } else {
            None
        };

        Ok(SaveOutcome {
            update,
            notification,
        })
    }

    async fn missing_or_conflict(&self, id: Uuid, expected: i64) -> LeadError {
        match Lead::find_by_id(&self.pool, id).await {
            Ok(Some(lead)) => LeadError::Conflict {
                expected,
                actual: lead.version,
            },
            Ok(None) => LeadError::NotFound,
            Err(e) => LeadError::Database(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use async_trait::async_trait;
    use db::DBService;

    use super::*;
    use crate::services::email::{EmailError, EmailSender, OutboundEmail};

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<OutboundEmail>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl EmailSender for Recorder {
        async fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, EmailError> {
            self.sent.lock().unwrap().push(email.clone());
            if self.fail.load(Ordering::SeqCst) {
                return Err(EmailError::Http {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(SendReceipt {
                id: format!("em_{}", self.sent.lock().unwrap().len()),
            })
        }
    }

    async fn service() -> (LeadService, Arc<Recorder>) {
        let db = DBService::new_in_memory().await.unwrap();
        let recorder = Arc::new(Recorder::default());
        let mailer = ProposalMailer::new(recorder.clone(), "noreply@syncworkflow.com");
        (LeadService::new(db.pool, mailer), recorder)
    }

    fn jo() -> CreateLead {
        CreateLead {
            property_link: "https://a.com".to_string(),
            first_name: "Jo".to_string(),
            last_name: "Li".to_string(),
            email: "jo@x.com".to_string(),
        }
    }

    fn complete(version: i64) -> SaveLead {
        SaveLead {
            fields: UpdateLeadProposals {
                proposal_1: "A".to_string(),
                proposal_2: "B".to_string(),
                proposal_3: "C".to_string(),
                status: LeadStatus::ProposalsComplete,
            },
            expected_version: version,
        }
    }

    #[test]
    fn test_should_notify_only_on_transition() {
        use LeadStatus::*;
        assert!(should_notify(NewLead, ProposalsComplete));
        assert!(!should_notify(NewLead, NewLead));
        assert!(!should_notify(ProposalsComplete, ProposalsComplete));
        assert!(!should_notify(ProposalsComplete, NewLead));
    }

    #[test]
    fn test_validate_intake() {
        let mut data = jo();
        data.first_name = "  Jo ".to_string();
        assert_eq!(validate_intake(&data).unwrap().first_name, "Jo");

        data.last_name = " ".to_string();
        assert!(matches!(
            validate_intake(&data),
            Err(LeadError::Invalid {
                field: "last_name",
                ..
            })
        ));

        let mut data = jo();
        data.email = "jo.x.com".to_string();
        assert!(matches!(
            validate_intake(&data),
            Err(LeadError::Invalid { field: "email", .. })
        ));
    }

    #[tokio::test]
    async fn test_intake_then_first_page_round_trip() {
        let (service, _) = service().await;
        service.submit_intake(&jo()).await.unwrap();
        let mut second = jo();
        second.first_name = "Newest".to_string();
        let newest = service.submit_intake(&second).await.unwrap();

        let page = service.list_page(&LeadQuery::default()).await.unwrap();
        assert_eq!(page.leads[0].id, newest.id);
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn test_page_zero_rejected() {
        let (service, _) = service().await;
        let err = service
            .list_page(&LeadQuery {
                page: Some(0),
                status: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LeadError::Invalid { field: "page", .. }));
    }

    #[tokio::test]
    async fn test_scenario_complete_proposals_notifies_and_persists() {
        let (service, recorder) = service().await;
        let lead = service.submit_intake(&jo()).await.unwrap();
        assert_eq!(lead.status, LeadStatus::NewLead);

        let outcome = service.save(lead.id, &complete(lead.version)).await.unwrap();
        let saved = outcome.update.unwrap();
        assert_eq!(saved.status, LeadStatus::ProposalsComplete);
        assert!(matches!(outcome.notification, Some(Ok(_))));

        let sent = recorder.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jo@x.com");
        assert!(sent[0].html.contains("Hi Jo,"));
        for p in ["<li>A</li>", "<li>B</li>", "<li>C</li>"] {
            assert!(sent[0].html.contains(p));
        }

        let page = service.list_page(&LeadQuery::default()).await.unwrap();
        assert_eq!(page.leads[0].status, LeadStatus::ProposalsComplete);
    }

    #[tokio::test]
    async fn test_notifies_even_when_update_conflicts() {
        let (service, recorder) = service().await;
        let lead = service.submit_intake(&jo()).await.unwrap();

        let outcome = service.save(lead.id, &complete(lead.version + 5)).await.unwrap();
        assert!(matches!(
            outcome.update,
            Err(LeadError::Conflict {
                expected: 6,
                actual: 1
            })
        ));
        assert!(matches!(outcome.notification, Some(Ok(_))));
        assert_eq!(recorder.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_notification_without_transition() {
        let (service, recorder) = service().await;
        let lead = service.submit_intake(&jo()).await.unwrap();

        let mut edit = complete(lead.version);
        edit.fields.status = LeadStatus::NewLead;
        let outcome = service.save(lead.id, &edit).await.unwrap();
        assert!(outcome.update.is_ok());
        assert!(outcome.notification.is_none());

        let outcome = service.save(lead.id, &complete(2)).await.unwrap();
        assert!(outcome.notification.is_some());

        // Already complete: saving again changes nothing about status.
        let outcome = service.save(lead.id, &complete(3)).await.unwrap();
        assert!(outcome.update.is_ok());
        assert!(outcome.notification.is_none());
        assert_eq!(recorder.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_fail_update() {
        let (service, recorder) = service().await;
        recorder.fail.store(true, Ordering::SeqCst);
        let lead = service.submit_intake(&jo()).await.unwrap();

        let outcome = service.save(lead.id, &complete(lead.version)).await.unwrap();
        assert!(outcome.update.is_ok());
        let status = NotificationStatus::from(outcome.notification.as_ref().unwrap());
        assert!(matches!(status, NotificationStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_save_unknown_lead() {
        let (service, recorder) = service().await;
        let err = service.save(Uuid::new_v4(), &complete(1)).await.unwrap_err();
        assert!(matches!(err, LeadError::NotFound));
        assert!(recorder.sent.lock().unwrap().is_empty());
    }
}
