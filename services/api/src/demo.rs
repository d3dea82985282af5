use automatch::error::AppError;
use automatch::matching::{
    format_dollars, rank_matches, CdeSubmission, CriterionStatus, DealInput, DealSubmission,
    IntakeGuard, MatchResult, MatchScorer, RankedMatch, RankingPolicy,
};
use automatch::roster::CdeRosterImporter;
use chrono::{Datelike, Utc};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct MatchArgs {
    /// Deal submission as a JSON file
    #[arg(long)]
    pub(crate) deal: PathBuf,
    /// CDE roster CSV export
    #[arg(long)]
    pub(crate) roster: PathBuf,
    /// Reference year for the underserved-states list (defaults to the current year)
    #[arg(long)]
    pub(crate) year: Option<i32>,
    /// Number of matches to print
    #[arg(long, default_value_t = 3)]
    pub(crate) top: usize,
    /// Drop matches scoring below this value
    #[arg(long, default_value_t = 0)]
    pub(crate) min_score: u8,
    /// Print the per-criterion breakdown for each match
    #[arg(long)]
    pub(crate) breakdown: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference year for the underserved-states list (defaults to the current year)
    #[arg(long)]
    pub(crate) year: Option<i32>,
}

pub(crate) fn run_match(args: MatchArgs) -> Result<(), AppError> {
    let MatchArgs {
        deal,
        roster,
        year,
        top,
        min_score,
        breakdown,
    } = args;

    let submission: DealSubmission = serde_json::from_str(&std::fs::read_to_string(&deal)?)?;
    let deal = IntakeGuard.deal_from_submission(submission)?;
    let candidates = CdeRosterImporter::from_path(&roster)?;
    let year = year.unwrap_or_else(|| Utc::now().year());

    let ranked = rank_matches(
        &deal,
        &candidates,
        year,
        &RankingPolicy {
            top_n: top,
            minimum_score: min_score,
        },
    );

    print!("{}", render_ranking(&deal, candidates.len(), year, &ranked, breakdown));
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let year = args.year.unwrap_or_else(|| Utc::now().year());
    let guard = IntakeGuard;
    let deal = guard.deal_from_submission(demo_deal())?;
    let scorer = MatchScorer::new(year);

    println!("AutoMatch scoring demo");
    println!("{}", describe_deal(&deal));
    for submission in demo_cdes() {
        let cde = guard.cde_from_submission(submission)?;
        let result = scorer.score(&deal, &cde);
        println!("\n{} ({})", cde.name, cde.cde_id);
        print!("{}", render_result(&result, true));
    }

    Ok(())
}

pub(crate) fn render_ranking(
    deal: &DealInput,
    candidates: usize,
    year: i32,
    ranked: &[RankedMatch],
    breakdown: bool,
) -> String {
    let mut out = String::new();
    out.push_str(&describe_deal(deal));
    out.push('\n');
    out.push_str(&format!(
        "Scored {candidates} CDEs against the {year} underserved-states list\n"
    ));

    if ranked.is_empty() {
        out.push_str("No eligible CDEs\n");
        return out;
    }

    for entry in ranked {
        out.push_str(&format!(
            "\n#{} {} ({})\n",
            entry.rank, entry.cde_name, entry.cde_id
        ));
        out.push_str(&render_result(&entry.result, breakdown));
    }
    out
}

fn describe_deal(deal: &DealInput) -> String {
    format!(
        "Deal {}{}: {} {} financing in {}",
        deal.deal_id,
        deal.project_name
            .as_deref()
            .map(|name| format!(" ({name})"))
            .unwrap_or_default(),
        format_dollars(deal.financing_amount),
        deal.venture_type.label(),
        deal.state.name(),
    )
}

fn render_result(result: &MatchResult, breakdown: bool) -> String {
    let mut out = format!(
        "  Score {} ({})\n",
        result.score,
        result.strength.label()
    );
    for reason in &result.reasons {
        out.push_str(&format!("  - {reason}\n"));
    }
    if breakdown {
        for outcome in &result.breakdown {
            let marker = match outcome.status {
                CriterionStatus::Passed => "pass",
                CriterionStatus::Waived => "open",
                CriterionStatus::Failed => "FAIL",
                CriterionStatus::Skipped => "skip",
            };
            out.push_str(&format!(
                "    [{marker}] {:<20} {:>2} pts\n",
                outcome.criterion.key(),
                outcome.points
            ));
        }
    }
    out
}

fn demo_deal() -> DealSubmission {
    DealSubmission {
        deal_id: "demo-ca-001".to_string(),
        project_name: Some("Eastside Community Health Center".to_string()),
        state: Some("California".to_string()),
        sector: Some("Health Care".to_string()),
        financing_amount: Some(2_000_000.0),
        venture_type: Some("real estate".to_string()),
        owner_occupied: Some(true),
        urban_rural: Some("urban".to_string()),
        severely_distressed: Some(true),
        distress_percentile: Some(60.0),
        minority_owned: Some(true),
        entity_type: Some("nonprofit".to_string()),
        allocation_type: Some("federal".to_string()),
        ..DealSubmission::default()
    }
}

fn demo_cdes() -> Vec<CdeSubmission> {
    vec![
        CdeSubmission {
            cde_id: "demo-pacific".to_string(),
            name: "Pacific Community Capital".to_string(),
            service_states: vec!["National".to_string(), "CA".to_string()],
            financing_focus: Some("real estate".to_string()),
            sectors: vec!["health care".to_string()],
            min_deal_size: Some(1_000_000.0),
            max_deal_size: Some(10_000_000.0),
            small_deal_fund: Some(true),
            requires_severely_distressed: Some(true),
            min_distress_percentile: Some(50.0),
            minority_focus: Some(true),
            nonprofit_preferred: Some(true),
            allocation_type: Some("federal".to_string()),
            remaining_allocation: Some(5_000_000.0),
            ..CdeSubmission::default()
        },
        CdeSubmission {
            cde_id: "demo-empire".to_string(),
            name: "Empire State Development Fund".to_string(),
            service_states: vec!["NY".to_string()],
            financing_focus: Some("both".to_string()),
            remaining_allocation: Some(8_000_000.0),
            ..CdeSubmission::default()
        },
        CdeSubmission {
            cde_id: "demo-heartland".to_string(),
            name: "Heartland Rural Fund".to_string(),
            service_states: vec!["National".to_string()],
            financing_focus: Some("both".to_string()),
            urban_rural_focus: Some("rural".to_string()),
            min_deal_size: Some(5_000_000.0),
            allocation_type: Some("state".to_string()),
            remaining_allocation: Some(0.0),
            ..CdeSubmission::default()
        },
    ]
}
