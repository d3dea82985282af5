//! AutoMatch: compatibility scoring between sponsor deals and Community Development Entities.
//!
//! Every caller (HTTP preview, batch runs, the CLI) goes through [`score_match`], so the
//! criterion logic exists in exactly one place. Raw payloads pass through [`IntakeGuard`] once
//! at the boundary; the scorer itself assumes well-formed input and never fails.

pub mod domain;
pub mod intake;
mod normalize;
pub mod ranking;
pub mod repository;
pub mod router;
mod scorer;
pub mod service;
pub mod states;
pub mod underserved;

#[cfg(test)]
mod tests;

pub use domain::{
    AllocationType, AreaFocus, AreaType, CdeId, CdeInput, Criterion, CriterionOutcome,
    CriterionStatus, DealId, DealInput, EntityType, FinancingFocus, MatchRecord, MatchResult,
    MatchStrength, ServiceArea, VentureType,
};
pub use intake::{CdeSubmission, DealSubmission, IntakeGuard, IntakeViolation};
pub use normalize::normalize_key;
pub use ranking::{rank_matches, RankedMatch, RankingPolicy};
pub use repository::{
    AlertError, AlertPublisher, AutoMatchRepository, MatchAlert, MatchRecordView, RepositoryError,
};
pub use router::{automatch_router, ScoreRequest};
pub use scorer::{format_dollars, score_match, MatchScorer, SMALL_DEAL_THRESHOLD};
pub use service::{
    AutoMatchConfig, AutoMatchRun, AutoMatchRunView, AutoMatchService, AutoMatchServiceError,
    MATCH_FOUND_TEMPLATE,
};
pub use states::StateCode;
