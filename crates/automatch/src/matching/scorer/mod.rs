mod criteria;

pub use criteria::format_dollars;

use super::domain::{
    CdeInput, Criterion, CriterionOutcome, CriterionStatus, DealInput, MatchResult, MatchStrength,
};

/// Requests below this amount only score `smallDealFund` when the CDE runs a small-deal fund.
pub const SMALL_DEAL_THRESHOLD: u64 = 5_000_000;

const CRITERIA_COUNT: u32 = Criterion::ALL.len() as u32;

/// Score `deal` against one candidate CDE.
///
/// Pure and total: every field combination yields a result. A failed `geographic` or `financing`
/// check forces the score to zero and skips the remaining criteria. `reference_year` selects the
/// underserved-state edition used by `utsFocus`.
pub fn score_match(deal: &DealInput, cde: &CdeInput, reference_year: i32) -> MatchResult {
    let mut breakdown = Vec::with_capacity(Criterion::ALL.len());
    let mut reasons = Vec::new();
    let mut eliminated = false;

    for criterion in Criterion::ALL {
        if eliminated {
            breakdown.push(CriterionOutcome {
                criterion,
                status: CriterionStatus::Skipped,
                points: 0,
            });
            continue;
        }

        let verdict = criteria::evaluate(criterion, deal, cde, reference_year);

        if criterion.is_eliminator() {
            if verdict.status == CriterionStatus::Failed {
                eliminated = true;
                reasons.extend(verdict.reason);
            }
        } else if verdict.status == CriterionStatus::Passed {
            reasons.extend(verdict.reason);
        }

        breakdown.push(CriterionOutcome {
            criterion,
            status: verdict.status,
            points: u8::from(verdict.status.is_satisfied()),
        });
    }

    let score = if eliminated {
        0
    } else {
        let points: u32 = breakdown.iter().map(|outcome| u32::from(outcome.points)).sum();
        percentage(points)
    };

    MatchResult {
        score,
        strength: MatchStrength::from_score(score),
        breakdown,
        reasons,
    }
}

/// `round(points / 15 * 100)` in integer arithmetic.
fn percentage(points: u32) -> u8 {
    let points = points.min(CRITERIA_COUNT);
    ((points * 200 + CRITERIA_COUNT) / (CRITERIA_COUNT * 2)) as u8
}

/// Scorer bound to a fixed underserved-state round, shared by preview and batch callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchScorer {
    reference_year: i32,
}

impl MatchScorer {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    pub fn score(&self, deal: &DealInput, cde: &CdeInput) -> MatchResult {
        score_match(deal, cde, self.reference_year)
    }
}
