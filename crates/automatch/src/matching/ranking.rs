use serde::{Deserialize, Serialize};

use super::domain::{CdeId, CdeInput, DealInput, MatchResult};
use super::scorer::score_match;

/// Limits applied when an AutoMatch run narrows scored candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingPolicy {
    pub top_n: usize,
    pub minimum_score: u8,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            top_n: 3,
            minimum_score: 0,
        }
    }
}

/// A scored candidate that survived ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedMatch {
    pub rank: usize,
    pub cde_id: CdeId,
    pub cde_name: String,
    pub result: MatchResult,
}

/// Score every candidate independently and keep the strongest.
///
/// Eliminated candidates never rank. Ties on score fall back to CDE id so the same inputs always
/// produce the same order.
pub fn rank_matches(
    deal: &DealInput,
    candidates: &[CdeInput],
    reference_year: i32,
    policy: &RankingPolicy,
) -> Vec<RankedMatch> {
    let mut scored: Vec<(&CdeInput, MatchResult)> = candidates
        .iter()
        .map(|cde| (cde, score_match(deal, cde, reference_year)))
        .filter(|(_, result)| !result.is_eliminated() && result.score >= policy.minimum_score)
        .collect();

    scored.sort_by(|(left_cde, left), (right_cde, right)| {
        right
            .score
            .cmp(&left.score)
            .then_with(|| left_cde.cde_id.cmp(&right_cde.cde_id))
    });

    scored
        .into_iter()
        .take(policy.top_n)
        .enumerate()
        .map(|(index, (cde, result))| RankedMatch {
            rank: index + 1,
            cde_id: cde.cde_id.clone(),
            cde_name: cde.name.clone(),
            result,
        })
        .collect()
}
