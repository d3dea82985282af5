use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::DealId;
use super::intake::{CdeSubmission, DealSubmission};
use super::repository::{AlertPublisher, AutoMatchRepository, RepositoryError};
use super::service::{AutoMatchService, AutoMatchServiceError};

/// Body of a one-off score preview.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub deal: DealSubmission,
    pub cde: CdeSubmission,
    #[serde(default)]
    pub reference_year: Option<i32>,
}

/// Router builder exposing the AutoMatch endpoints.
pub fn automatch_router<R, A>(service: Arc<AutoMatchService<R, A>>) -> Router
where
    R: AutoMatchRepository + 'static,
    A: AlertPublisher + 'static,
{
    Router::new()
        .route("/api/v1/automatch/score", post(score_handler::<R, A>))
        .route("/api/v1/automatch/deals", post(register_deal_handler::<R, A>))
        .route("/api/v1/automatch/cdes", post(register_cde_handler::<R, A>))
        .route(
            "/api/v1/automatch/deals/:deal_id/run",
            post(run_handler::<R, A>),
        )
        .route(
            "/api/v1/automatch/deals/:deal_id/matches",
            get(matches_handler::<R, A>),
        )
        .with_state(service)
}

pub(crate) async fn score_handler<R, A>(
    State(service): State<Arc<AutoMatchService<R, A>>>,
    axum::Json(request): axum::Json<ScoreRequest>,
) -> Response
where
    R: AutoMatchRepository + 'static,
    A: AlertPublisher + 'static,
{
    let ScoreRequest {
        deal,
        cde,
        reference_year,
    } = request;

    match service.preview_submissions(deal, cde, reference_year) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_deal_handler<R, A>(
    State(service): State<Arc<AutoMatchService<R, A>>>,
    axum::Json(submission): axum::Json<DealSubmission>,
) -> Response
where
    R: AutoMatchRepository + 'static,
    A: AlertPublisher + 'static,
{
    match service.register_deal(submission) {
        Ok(deal) => (StatusCode::CREATED, axum::Json(deal)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_cde_handler<R, A>(
    State(service): State<Arc<AutoMatchService<R, A>>>,
    axum::Json(submission): axum::Json<CdeSubmission>,
) -> Response
where
    R: AutoMatchRepository + 'static,
    A: AlertPublisher + 'static,
{
    match service.register_cde(submission) {
        Ok(cde) => (StatusCode::CREATED, axum::Json(cde)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn run_handler<R, A>(
    State(service): State<Arc<AutoMatchService<R, A>>>,
    Path(deal_id): Path<String>,
) -> Response
where
    R: AutoMatchRepository + 'static,
    A: AlertPublisher + 'static,
{
    match service.run(&DealId(deal_id)) {
        Ok(run) => (StatusCode::OK, axum::Json(run.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn matches_handler<R, A>(
    State(service): State<Arc<AutoMatchService<R, A>>>,
    Path(deal_id): Path<String>,
) -> Response
where
    R: AutoMatchRepository + 'static,
    A: AlertPublisher + 'static,
{
    let id = DealId(deal_id);
    match service.matches(&id) {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(|record| record.view()).collect();
            let payload = json!({
                "deal_id": id.0,
                "matches": views,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn error_response(error: AutoMatchServiceError) -> Response {
    let status = match &error {
        AutoMatchServiceError::Intake(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AutoMatchServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        AutoMatchServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AutoMatchServiceError::Repository(RepositoryError::Unavailable(_))
        | AutoMatchServiceError::Alert(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
