use super::common::*;
use crate::matching::domain::{CdeInput, Criterion};
use crate::matching::ranking::{rank_matches, RankingPolicy};

fn candidates() -> Vec<CdeInput> {
    vec![
        CdeInput {
            remaining_allocation: 0,
            ..open_cde("cde-b")
        },
        new_york_only_cde(),
        open_cde("cde-c"),
        CdeInput {
            small_deal_fund: false,
            remaining_allocation: 0,
            ..open_cde("cde-d")
        },
        open_cde("cde-a"),
    ]
}

#[test]
fn ranking_drops_eliminated_and_orders_by_score() {
    let ranked = rank_matches(
        &california_deal(),
        &candidates(),
        REFERENCE_YEAR,
        &RankingPolicy {
            top_n: 10,
            minimum_score: 0,
        },
    );

    let ids: Vec<&str> = ranked.iter().map(|entry| entry.cde_id.0.as_str()).collect();
    assert_eq!(ids, vec!["cde-a", "cde-c", "cde-b", "cde-d"]);
    assert_eq!(
        ranked.iter().map(|entry| entry.rank).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert!(ranked
        .iter()
        .all(|entry| entry.result.satisfied(Criterion::Geographic)));
}

#[test]
fn ranking_keeps_top_three_by_default() {
    let ranked = rank_matches(
        &california_deal(),
        &candidates(),
        REFERENCE_YEAR,
        &RankingPolicy::default(),
    );

    assert_eq!(ranked.len(), 3);
    assert!(ranked
        .windows(2)
        .all(|pair| pair[0].result.score >= pair[1].result.score));
}

#[test]
fn ranking_applies_minimum_score() {
    let ranked = rank_matches(
        &california_deal(),
        &candidates(),
        REFERENCE_YEAR,
        &RankingPolicy {
            top_n: 10,
            minimum_score: 95,
        },
    );

    assert_eq!(ranked.len(), 2);
    assert!(ranked.iter().all(|entry| entry.result.score == 100));
}

#[test]
fn ranking_empty_candidates_is_empty() {
    let ranked = rank_matches(
        &california_deal(),
        &[],
        REFERENCE_YEAR,
        &RankingPolicy::default(),
    );
    assert!(ranked.is_empty());
}
