use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use super::common::*;
use crate::matching::router::{automatch_router, ScoreRequest};
use crate::matching::service::AutoMatchService;
use crate::matching::{score_match, IntakeGuard, MatchResult};

fn json_request(method: &str, uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .expect("request builds")
}

#[tokio::test]
async fn score_route_matches_direct_scorer_output() {
    let (service, _, _) = build_service();
    let router = automatch_router(Arc::new(service));
    let request = ScoreRequest {
        deal: deal_submission(),
        cde: cde_submission(),
        reference_year: None,
    };

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/automatch/score",
            serde_json::to_vec(&request).expect("serialize"),
        ))
        .await
        .expect("route responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let from_http: MatchResult = serde_json::from_value(body).expect("match result payload");

    let guard = IntakeGuard;
    let direct = score_match(
        &guard.deal_from_submission(deal_submission()).expect("deal"),
        &guard.cde_from_submission(cde_submission()).expect("cde"),
        REFERENCE_YEAR,
    );
    assert_eq!(from_http, direct);
}

#[tokio::test]
async fn score_handler_rejects_invalid_payloads() {
    let (service, _, _) = build_service();
    let mut deal = deal_submission();
    deal.state = Some("Narnia".to_string());

    let response = crate::matching::router::score_handler::<MemoryRepository, MemoryAlerts>(
        State(Arc::new(service)),
        axum::Json(ScoreRequest {
            deal,
            cde: cde_submission(),
            reference_year: None,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("Narnia"));
}

#[tokio::test]
async fn register_then_run_round_trip() {
    let (service, _, _) = build_service();
    let router = automatch_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/automatch/deals",
            serde_json::to_vec(&deal_submission()).expect("serialize"),
        ))
        .await
        .expect("deal route");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/automatch/cdes",
            serde_json::to_vec(&cde_submission()).expect("serialize"),
        ))
        .await
        .expect("cde route");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/automatch/deals/deal-ca-001/run",
            Vec::new(),
        ))
        .await
        .expect("run route");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["candidates_scored"], 1);
    assert_eq!(body["matches"][0]["score"], 100);
    assert_eq!(body["matches"][0]["strength"], "excellent");

    let response = router
        .oneshot(
            Request::get("/api/v1/automatch/deals/deal-ca-001/matches")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("matches route");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["deal_id"], "deal-ca-001");
    assert_eq!(body["matches"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn duplicate_deal_returns_conflict() {
    let (service, _, _) = build_service();
    service
        .register_deal(deal_submission())
        .expect("first registration");
    let router = automatch_router(Arc::new(service));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/automatch/deals",
            serde_json::to_vec(&deal_submission()).expect("serialize"),
        ))
        .await
        .expect("deal route");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn run_for_unknown_deal_returns_not_found() {
    let (service, _, _) = build_service();
    let router = automatch_router(Arc::new(service));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/automatch/deals/missing/run",
            Vec::new(),
        ))
        .await
        .expect("run route");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn repository_outage_returns_internal_error() {
    let service = Arc::new(AutoMatchService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryAlerts::default()),
        service_config(),
    ));

    let response = crate::matching::router::register_cde_handler::<
        UnavailableRepository,
        MemoryAlerts,
    >(State(service), axum::Json(cde_submission()))
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
