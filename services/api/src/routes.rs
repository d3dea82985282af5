use crate::infra::AppState;
use automatch::error::AppError;
use automatch::matching::{
    automatch_router, rank_matches, AlertPublisher, AutoMatchRepository, AutoMatchService,
    DealSubmission, IntakeGuard, RankedMatch, RankingPolicy,
};
use automatch::roster::CdeRosterImporter;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

/// Ad hoc ranking of one deal against a roster pasted into the request.
#[derive(Debug, Deserialize)]
pub(crate) struct RosterRankRequest {
    pub(crate) deal: DealSubmission,
    pub(crate) roster_csv: String,
    #[serde(default)]
    pub(crate) reference_year: Option<i32>,
    #[serde(default)]
    pub(crate) top_n: Option<usize>,
    #[serde(default)]
    pub(crate) minimum_score: Option<u8>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RosterRankResponse {
    pub(crate) reference_year: i32,
    pub(crate) candidates_scored: usize,
    pub(crate) matches: Vec<RankedMatch>,
}

pub(crate) fn with_automatch_routes<R, A>(service: Arc<AutoMatchService<R, A>>) -> axum::Router
where
    R: AutoMatchRepository + 'static,
    A: AlertPublisher + 'static,
{
    let reference_year = service.reference_year();
    automatch_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/automatch/roster/rank",
            axum::routing::post(move |payload: Json<RosterRankRequest>| {
                roster_rank_endpoint(payload, reference_year)
            }),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn roster_rank_endpoint(
    Json(payload): Json<RosterRankRequest>,
    default_year: i32,
) -> Result<Json<RosterRankResponse>, AppError> {
    let RosterRankRequest {
        deal,
        roster_csv,
        reference_year,
        top_n,
        minimum_score,
    } = payload;

    let deal = IntakeGuard.deal_from_submission(deal)?;
    let candidates = CdeRosterImporter::from_reader(Cursor::new(roster_csv.into_bytes()))?;

    let defaults = RankingPolicy::default();
    let policy = RankingPolicy {
        top_n: top_n.unwrap_or(defaults.top_n),
        minimum_score: minimum_score.unwrap_or(defaults.minimum_score),
    };
    let reference_year = reference_year.unwrap_or(default_year);
    let matches = rank_matches(&deal, &candidates, reference_year, &policy);

    Ok(Json(RosterRankResponse {
        reference_year,
        candidates_scored: candidates.len(),
        matches,
    }))
}
