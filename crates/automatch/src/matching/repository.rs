use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{CdeId, CdeInput, DealId, DealInput, MatchRecord};

/// Storage abstraction so the service can be exercised without the hosted database.
pub trait AutoMatchRepository: Send + Sync {
    fn insert_deal(&self, deal: DealInput) -> Result<DealInput, RepositoryError>;
    fn fetch_deal(&self, id: &DealId) -> Result<Option<DealInput>, RepositoryError>;
    fn insert_cde(&self, cde: CdeInput) -> Result<CdeInput, RepositoryError>;
    fn candidate_cdes(&self) -> Result<Vec<CdeInput>, RepositoryError>;
    /// Replace every stored match for `deal_id` with `records`.
    fn replace_matches(
        &self,
        deal_id: &DealId,
        records: Vec<MatchRecord>,
    ) -> Result<(), RepositoryError>;
    fn matches_for(&self, deal_id: &DealId) -> Result<Vec<MatchRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail, in-app feed, webhook).
pub trait AlertPublisher: Send + Sync {
    fn publish(&self, alert: MatchAlert) -> Result<(), AlertError>;
}

/// Payload handed to the notification dispatcher when a run produces a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAlert {
    pub template: String,
    pub deal_id: DealId,
    pub cde_id: CdeId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}

/// Client-facing summary of a stored match.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRecordView {
    pub cde_id: CdeId,
    pub cde_name: String,
    pub score: u8,
    pub strength: &'static str,
    pub reasons: Vec<String>,
    pub reference_year: i32,
    pub matched_at: String,
}

impl MatchRecord {
    pub fn view(&self) -> MatchRecordView {
        MatchRecordView {
            cde_id: self.cde_id.clone(),
            cde_name: self.cde_name.clone(),
            score: self.result.score,
            strength: self.result.strength.label(),
            reasons: self.result.reasons.clone(),
            reference_year: self.reference_year,
            matched_at: self.matched_at.to_rfc3339(),
        }
    }
}
