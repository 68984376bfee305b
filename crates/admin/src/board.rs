//! Client-side state of the lead table: page, filter, last applied rows,
//! error banner and the open edit draft.
//!
//! Fetches are split into "issue a ticket" and "apply the response" so a
//! slow response for an older page or filter can never overwrite newer
//! state: only the ticket with the latest generation is applied.

use std::fmt::Display;

use db::models::lead::{Lead, LeadPage, LeadStatus, UpdateLeadProposals};
use services::services::leads::{LeadQuery, SaveLead, SavedLead};
use tracing::{debug, error};
use uuid::Uuid;

use crate::api::AdminClientError;

pub const FETCH_ERROR_BANNER: &str = "Failed to fetch leads";

/// Identifies one issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub page: u32,
    pub status: Option<LeadStatus>,
}

impl FetchTicket {
    pub fn query(&self) -> LeadQuery {
        LeadQuery {
            page: Some(self.page),
            status: self.status,
        }
    }
}

/// Editable snapshot of one lead. Concurrent edits elsewhere are caught by
/// the version on save, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadDraft {
    pub id: Uuid,
    pub first_name: String,
    pub email: String,
    pub proposals: [String; 3],
    pub status: LeadStatus,
    pub version: i64,
}

impl LeadDraft {
    pub fn from_lead(lead: &Lead) -> Self {
        Self {
            id: lead.id,
            first_name: lead.first_name.clone(),
            email: lead.email.clone(),
            proposals: [
                lead.proposal_1.clone(),
                lead.proposal_2.clone(),
                lead.proposal_3.clone(),
            ],
            status: lead.status,
            version: lead.version,
        }
    }

    pub fn to_save(&self) -> SaveLead {
        let [proposal_1, proposal_2, proposal_3] = self.proposals.clone();
        SaveLead {
            fields: UpdateLeadProposals {
                proposal_1,
                proposal_2,
                proposal_3,
                status: self.status,
            },
            expected_version: self.version,
        }
    }
}

/// What the caller does after a save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFollowUp {
    /// Saved; fetch the current page again.
    Refresh(FetchTicket),
    /// The lead changed elsewhere. Load it and call `rebase_draft` before
    /// saving again, otherwise the retry carries the same stale version.
    Reload(Uuid),
    /// Draft stays open as it was.
    Retry,
}

#[derive(Debug)]
pub struct LeadBoard {
    page: u32,
    status: Option<LeadStatus>,
    generation: u64,
    leads: Vec<Lead>,
    total_count: i64,
    total_pages: u32,
    error: Option<String>,
    draft: Option<LeadDraft>,
}

impl Default for LeadBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl LeadBoard {
    pub fn new() -> Self {
        Self {
            page: 1,
            status: None,
            generation: 0,
            leads: Vec::new(),
            total_count: 0,
            total_pages: 0,
            error: None,
            draft: None,
        }
    }

    fn issue(&mut self) -> FetchTicket {
        self.generation += 1;
        FetchTicket {
            generation: self.generation,
            page: self.page,
            status: self.status,
        }
    }

    /// Re-fetch the current page and filter.
    pub fn refresh(&mut self) -> FetchTicket {
        self.issue()
    }

    /// Changing the filter always returns to page 1.
    pub fn set_filter(&mut self, status: Option<LeadStatus>) -> FetchTicket {
        self.status = status;
        self.page = 1;
        self.issue()
    }

    pub fn first_page(&mut self) -> FetchTicket {
        self.page = 1;
        self.issue()
    }

    pub fn next_page(&mut self) -> Option<FetchTicket> {
        if self.page >= self.total_pages {
            return None;
        }
        self.page += 1;
        Some(self.issue())
    }

    pub fn previous_page(&mut self) -> Option<FetchTicket> {
        if self.page <= 1 {
            return None;
        }
        self.page -= 1;
        Some(self.issue())
    }

    pub fn go_to_page(&mut self, page: u32) -> Option<FetchTicket> {
        if page == 0 || page > self.total_pages.max(1) {
            return None;
        }
        self.page = page;
        Some(self.issue())
    }

    /// Apply a fetch result. Returns false when the ticket is stale and the
    /// result was dropped.
    pub fn apply<E: Display>(&mut self, ticket: FetchTicket, result: Result<LeadPage, E>) -> bool {
        if ticket.generation != self.generation {
            debug!(
                generation = ticket.generation,
                latest = self.generation,
                "Discarding stale lead page"
            );
            return false;
        }

        match result {
            Ok(page) => {
                self.leads = page.leads;
                self.total_count = page.total_count;
                self.total_pages = page.total_pages;
                self.error = None;
            }
            Err(e) => {
                error!(page = ticket.page, error = %e, "Lead fetch failed");
                self.error = Some(FETCH_ERROR_BANNER.to_string());
            }
        }
        true
    }

    /// Open the edit draft for the row at `index` of the current page.
    pub fn select(&mut self, index: usize) -> Option<&LeadDraft> {
        let lead = self.leads.get(index)?;
        self.draft = Some(LeadDraft::from_lead(lead));
        self.draft.as_ref()
    }

    pub fn draft(&self) -> Option<&LeadDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut LeadDraft> {
        self.draft.as_mut()
    }

    pub fn close_draft(&mut self) {
        self.draft = None;
    }

    /// Success closes the draft and asks for a refresh of the current page;
    /// failure is logged and the draft stays open as it was.
    pub fn finish_save(&mut self, result: Result<SavedLead, AdminClientError>) -> SaveFollowUp {
        match result {
            Ok(saved) => {
                debug!(lead_id = %saved.lead.id, "Lead saved");
                self.draft = None;
                SaveFollowUp::Refresh(self.refresh())
            }
            Err(e) => {
                let lead_id = self.draft.as_ref().map(|d| d.id);
                error!(lead_id = ?lead_id, error = %e, "Lead update failed");
                match lead_id {
                    Some(id) if e.is_conflict() => SaveFollowUp::Reload(id),
                    _ => SaveFollowUp::Retry,
                }
            }
        }
    }

    /// Move the open draft onto the stored row's version, keeping the edited
    /// proposals and status. Returns false when no draft for that lead is open.
    pub fn rebase_draft(&mut self, fresh: &Lead) -> bool {
        match self.draft.as_mut() {
            Some(draft) if draft.id == fresh.id => {
                debug!(
                    lead_id = %fresh.id,
                    from = draft.version,
                    to = fresh.version,
                    "Rebasing draft"
                );
                draft.version = fresh.version;
                draft.first_name = fresh.first_name.clone();
                draft.email = fresh.email.clone();
                true
            }
            _ => false,
        }
    }

    pub fn show_pagination(&self) -> bool {
        self.total_pages > 0
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn status(&self) -> Option<LeadStatus> {
        self.status
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn total_count(&self) -> i64 {
        self.total_count
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
