use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::{CdeInput, DealId, DealInput, MatchRecord, MatchResult};
use super::intake::{CdeSubmission, DealSubmission, IntakeGuard, IntakeViolation};
use super::ranking::{rank_matches, RankingPolicy};
use super::repository::{
    AlertError, AlertPublisher, AutoMatchRepository, MatchAlert, MatchRecordView, RepositoryError,
};
use super::scorer::{format_dollars, MatchScorer};

/// Alert template emitted once per persisted match.
pub const MATCH_FOUND_TEMPLATE: &str = "automatch_match_found";

/// Knobs for the AutoMatch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoMatchConfig {
    pub reference_year: i32,
    pub ranking: RankingPolicy,
}

/// Service composing intake validation, the shared scorer, storage, and alert hooks.
pub struct AutoMatchService<R, A> {
    guard: IntakeGuard,
    repository: Arc<R>,
    alerts: Arc<A>,
    scorer: MatchScorer,
    ranking: RankingPolicy,
}

impl<R, A> AutoMatchService<R, A>
where
    R: AutoMatchRepository + 'static,
    A: AlertPublisher + 'static,
{
    pub fn new(repository: Arc<R>, alerts: Arc<A>, config: AutoMatchConfig) -> Self {
        Self {
            guard: IntakeGuard,
            repository,
            alerts,
            scorer: MatchScorer::new(config.reference_year),
            ranking: config.ranking,
        }
    }

    pub fn reference_year(&self) -> i32 {
        self.scorer.reference_year()
    }

    /// Validate and store a sponsor deal.
    pub fn register_deal(
        &self,
        submission: DealSubmission,
    ) -> Result<DealInput, AutoMatchServiceError> {
        let deal = self.guard.deal_from_submission(submission)?;
        let stored = self.repository.insert_deal(deal)?;
        info!(deal_id = %stored.deal_id, state = %stored.state, "deal registered");
        Ok(stored)
    }

    /// Validate and store a CDE candidate.
    pub fn register_cde(&self, submission: CdeSubmission) -> Result<CdeInput, AutoMatchServiceError> {
        let cde = self.guard.cde_from_submission(submission)?;
        self.store_cde(cde)
    }

    /// Store a CDE that already passed intake, e.g. from a roster import.
    pub fn store_cde(&self, cde: CdeInput) -> Result<CdeInput, AutoMatchServiceError> {
        let stored = self.repository.insert_cde(cde)?;
        info!(cde_id = %stored.cde_id, "cde registered");
        Ok(stored)
    }

    /// Score a single pair without touching storage.
    pub fn preview(&self, deal: &DealInput, cde: &CdeInput) -> MatchResult {
        self.scorer.score(deal, cde)
    }

    /// Validate raw payloads and score them, optionally against another underserved round.
    pub fn preview_submissions(
        &self,
        deal: DealSubmission,
        cde: CdeSubmission,
        reference_year: Option<i32>,
    ) -> Result<MatchResult, AutoMatchServiceError> {
        let deal = self.guard.deal_from_submission(deal)?;
        let cde = self.guard.cde_from_submission(cde)?;
        let scorer = reference_year.map(MatchScorer::new).unwrap_or(self.scorer);
        Ok(scorer.score(&deal, &cde))
    }

    /// Score every candidate for `deal_id`, persist the top matches, and alert on each.
    pub fn run(&self, deal_id: &DealId) -> Result<AutoMatchRun, AutoMatchServiceError> {
        let deal = self
            .repository
            .fetch_deal(deal_id)?
            .ok_or(RepositoryError::NotFound)?;
        let candidates = self.repository.candidate_cdes()?;
        let reference_year = self.scorer.reference_year();

        let ranked = rank_matches(&deal, &candidates, reference_year, &self.ranking);
        debug!(
            deal_id = %deal_id,
            candidates = candidates.len(),
            ranked = ranked.len(),
            "automatch candidates scored"
        );

        let matched_at = Utc::now();
        let records: Vec<MatchRecord> = ranked
            .into_iter()
            .map(|ranked| MatchRecord {
                deal_id: deal.deal_id.clone(),
                cde_id: ranked.cde_id,
                cde_name: ranked.cde_name,
                reference_year,
                result: ranked.result,
                matched_at,
            })
            .collect();

        self.repository
            .replace_matches(&deal.deal_id, records.clone())?;

        for record in &records {
            self.alerts.publish(match_alert(&deal, record))?;
        }

        info!(
            deal_id = %deal_id,
            matches = records.len(),
            top_score = records.first().map(|record| record.result.score).unwrap_or(0),
            "automatch run complete"
        );

        Ok(AutoMatchRun {
            deal_id: deal.deal_id,
            reference_year,
            candidates_scored: candidates.len(),
            matches: records,
        })
    }

    /// Stored matches for a known deal.
    pub fn matches(&self, deal_id: &DealId) -> Result<Vec<MatchRecord>, AutoMatchServiceError> {
        if self.repository.fetch_deal(deal_id)?.is_none() {
            return Err(RepositoryError::NotFound.into());
        }
        Ok(self.repository.matches_for(deal_id)?)
    }
}

fn match_alert(deal: &DealInput, record: &MatchRecord) -> MatchAlert {
    let mut details = BTreeMap::new();
    details.insert("cde_name".to_string(), record.cde_name.clone());
    details.insert("score".to_string(), record.result.score.to_string());
    details.insert(
        "strength".to_string(),
        record.result.strength.label().to_string(),
    );
    details.insert(
        "financing_amount".to_string(),
        format_dollars(deal.financing_amount),
    );
    if let Some(name) = &deal.project_name {
        details.insert("project_name".to_string(), name.clone());
    }

    MatchAlert {
        template: MATCH_FOUND_TEMPLATE.to_string(),
        deal_id: record.deal_id.clone(),
        cde_id: record.cde_id.clone(),
        details,
    }
}

/// Outcome of one AutoMatch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoMatchRun {
    pub deal_id: DealId,
    pub reference_year: i32,
    pub candidates_scored: usize,
    pub matches: Vec<MatchRecord>,
}

impl AutoMatchRun {
    pub fn view(&self) -> AutoMatchRunView {
        AutoMatchRunView {
            deal_id: self.deal_id.clone(),
            reference_year: self.reference_year,
            candidates_scored: self.candidates_scored,
            matches: self.matches.iter().map(MatchRecord::view).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoMatchRunView {
    pub deal_id: DealId,
    pub reference_year: i32,
    pub candidates_scored: usize,
    pub matches: Vec<MatchRecordView>,
}

/// Error raised by the AutoMatch service.
#[derive(Debug, thiserror::Error)]
pub enum AutoMatchServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeViolation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Alert(#[from] AlertError),
}
