use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Rows per listing page.
pub const PAGE_SIZE: u32 = 10;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "lead_status")]
pub enum LeadStatus {
    #[default]
    #[sqlx(rename = "new lead")]
    #[serde(rename = "new lead", alias = "new_lead")]
    #[strum(to_string = "new lead", serialize = "new_lead")]
    NewLead,
    #[sqlx(rename = "proposals complete")]
    #[serde(rename = "proposals complete", alias = "proposals_complete")]
    #[strum(to_string = "proposals complete", serialize = "proposals_complete")]
    ProposalsComplete,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, TS)]
pub struct Lead {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub property_link: String,
    pub status: LeadStatus,
    pub proposal_1: String,
    pub proposal_2: String,
    pub proposal_3: String,
    pub version: i64, // Bumped on every successful update; compare-and-swap key
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Intake payload: the four visitor-supplied fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateLead {
    pub property_link: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// The only fields an update may touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct UpdateLeadProposals {
    pub proposal_1: String,
    pub proposal_2: String,
    pub proposal_3: String,
    pub status: LeadStatus,
}

/// One page of the newest-first listing plus the exact matching count.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LeadPage {
    pub leads: Vec<Lead>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: i64,
    pub total_pages: u32,
}

/// `ceil(count / PAGE_SIZE)`; zero when nothing matches.
pub fn total_pages(total_count: i64) -> u32 {
    let count = u64::try_from(total_count).unwrap_or(0);
    u32::try_from(count.div_ceil(u64::from(PAGE_SIZE))).unwrap_or(u32::MAX)
}

/// Zero-based row offset of a 1-indexed page.
pub fn page_offset(page: u32) -> i64 {
    i64::from(page.saturating_sub(1)) * i64::from(PAGE_SIZE)
}

impl Lead {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Insert a fresh lead. Status and proposals always start at their
    /// defaults regardless of what the caller holds.
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateLead,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Lead>(
            r#"INSERT INTO leads (id, property_link, first_name, last_name, email, status, proposal_1, proposal_2, proposal_3)
               VALUES ($1, $2, $3, $4, $5, $6, '', '', '')
               RETURNING id, first_name, last_name, email, property_link, status, proposal_1, proposal_2, proposal_3, version, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&data.property_link)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(LeadStatus::NewLead)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lead>(
            r#"SELECT id, first_name, last_name, email, property_link, status, proposal_1, proposal_2, proposal_3, version, created_at, updated_at
               FROM leads
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Fetch one newest-first page, optionally restricted to `status`.
    ///
    /// Rows and count are read inside one transaction so the page and its
    /// total always agree.
    pub async fn find_page(
        pool: &SqlitePool,
        status: Option<LeadStatus>,
        page: u32,
    ) -> Result<LeadPage, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let total_count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM leads
               WHERE ($1 IS NULL OR status = $1)"#,
        )
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        // rowid breaks ties between rows created within the same millisecond
        let leads = sqlx::query_as::<_, Lead>(
            r#"SELECT id, first_name, last_name, email, property_link, status, proposal_1, proposal_2, proposal_3, version, created_at, updated_at
               FROM leads
               WHERE ($1 IS NULL OR status = $1)
               ORDER BY created_at DESC, rowid DESC
               LIMIT $2 OFFSET $3"#,
        )
        .bind(status)
        .bind(i64::from(PAGE_SIZE))
        .bind(page_offset(page))
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(LeadPage {
            leads,
            page,
            page_size: PAGE_SIZE,
            total_count,
            total_pages: total_pages(total_count),
        })
    }

    /// Write the mutable fields if the stored version still equals
    /// `expected_version`. `None` means no row matched the id and version.
    pub async fn update_proposals(
        pool: &SqlitePool,
        id: Uuid,
        expected_version: i64,
        data: &UpdateLeadProposals,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lead>(
            r#"UPDATE leads
               SET proposal_1 = $3,
                   proposal_2 = $4,
                   proposal_3 = $5,
                   status = $6,
                   version = version + 1,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1 AND version = $2
               RETURNING id, first_name, last_name, email, property_link, status, proposal_1, proposal_2, proposal_3, version, created_at, updated_at"#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(&data.proposal_1)
        .bind(&data.proposal_2)
        .bind(&data.proposal_3)
        .bind(data.status)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::DBService;

    fn intake(first_name: &str, email: &str) -> CreateLead {
        CreateLead {
            property_link: "https://a.com".to_string(),
            first_name: first_name.to_string(),
            last_name: "Li".to_string(),
            email: email.to_string(),
        }
    }

    async fn seed(pool: &SqlitePool, n: usize) -> Vec<Lead> {
        let mut created = Vec::with_capacity(n);
        for i in 0..n {
            let lead = Lead::create(pool, Uuid::new_v4(), &intake(&format!("Lead{i}"), "x@y.com"))
                .await
                .unwrap();
            created.push(lead);
        }
        created
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0), 0);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(10), 1);
        assert_eq!(total_pages(11), 2);
        assert_eq!(total_pages(-3), 0);
    }

    #[test]
    fn test_page_offset_is_ten_per_page() {
        assert_eq!(page_offset(1), 0);
        assert_eq!(page_offset(3), 20);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(LeadStatus::NewLead.to_string(), "new lead");
        assert_eq!(LeadStatus::ProposalsComplete.to_string(), "proposals complete");
        assert_eq!(
            LeadStatus::from_str("proposals_complete").unwrap(),
            LeadStatus::ProposalsComplete
        );
        assert_eq!(
            serde_json::to_string(&LeadStatus::ProposalsComplete).unwrap(),
            r#""proposals complete""#
        );
        let parsed: LeadStatus = serde_json::from_str(r#""new_lead""#).unwrap();
        assert_eq!(parsed, LeadStatus::NewLead);
    }

    #[tokio::test]
    async fn test_create_sets_defaults() {
        let db = DBService::new_in_memory().await.unwrap();
        let lead = Lead::create(&db.pool, Uuid::new_v4(), &intake("Jo", "jo@x.com"))
            .await
            .unwrap();

        assert_eq!(lead.status, LeadStatus::NewLead);
        assert_eq!(lead.proposal_1, "");
        assert_eq!(lead.proposal_2, "");
        assert_eq!(lead.proposal_3, "");
        assert_eq!(lead.version, 1);
        assert_eq!(lead.full_name(), "Jo Li");

        let found = Lead::find_by_id(&db.pool, lead.id).await.unwrap().unwrap();
        assert_eq!(found, lead);
    }

    #[tokio::test]
    async fn test_find_page_orders_newest_first_across_pages() {
        let db = DBService::new_in_memory().await.unwrap();
        let created = seed(&db.pool, 23).await;

        let first = Lead::find_page(&db.pool, None, 1).await.unwrap();
        let second = Lead::find_page(&db.pool, None, 2).await.unwrap();
        let third = Lead::find_page(&db.pool, None, 3).await.unwrap();

        assert_eq!(first.total_count, 23);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.leads.len(), 10);
        assert_eq!(second.leads.len(), 10);
        assert_eq!(third.leads.len(), 3);

        let listed: Vec<Uuid> = first
            .leads
            .iter()
            .chain(&second.leads)
            .chain(&third.leads)
            .map(|l| l.id)
            .collect();
        let expected: Vec<Uuid> = created.iter().rev().map(|l| l.id).collect();
        assert_eq!(listed, expected);
    }

    #[tokio::test]
    async fn test_find_page_filters_by_status() {
        let db = DBService::new_in_memory().await.unwrap();
        let created = seed(&db.pool, 4).await;

        let complete = UpdateLeadProposals {
            proposal_1: "A".to_string(),
            proposal_2: "B".to_string(),
            proposal_3: "C".to_string(),
            status: LeadStatus::ProposalsComplete,
        };
        Lead::update_proposals(&db.pool, created[1].id, 1, &complete)
            .await
            .unwrap()
            .unwrap();

        let page = Lead::find_page(&db.pool, Some(LeadStatus::ProposalsComplete), 1)
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.leads[0].id, created[1].id);

        let page = Lead::find_page(&db.pool, Some(LeadStatus::NewLead), 1)
            .await
            .unwrap();
        assert_eq!(page.total_count, 3);
        assert!(page.leads.iter().all(|l| l.status == LeadStatus::NewLead));
    }

    #[tokio::test]
    async fn test_find_page_empty_store() {
        let db = DBService::new_in_memory().await.unwrap();
        let page = Lead::find_page(&db.pool, None, 1).await.unwrap();
        assert!(page.leads.is_empty());
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn test_update_requires_matching_version() {
        let db = DBService::new_in_memory().await.unwrap();
        let lead = seed(&db.pool, 1).await.remove(0);

        let edit = UpdateLeadProposals {
            proposal_1: "first".to_string(),
            proposal_2: String::new(),
            proposal_3: String::new(),
            status: LeadStatus::NewLead,
        };
        let updated = Lead::update_proposals(&db.pool, lead.id, 1, &edit)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.proposal_1, "first");
        assert_eq!(updated.email, lead.email);

        // Second writer still holding version 1 loses.
        let stale = Lead::update_proposals(&db.pool, lead.id, 1, &edit)
            .await
            .unwrap();
        assert!(stale.is_none());
    }
}
