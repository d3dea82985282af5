use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::states::StateCode;

/// Identifier wrapper for sponsor deals.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DealId(pub String);

/// Identifier wrapper for Community Development Entities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CdeId(pub String);

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CdeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Venture type of the financing a deal requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VentureType {
    RealEstate,
    Business,
}

impl VentureType {
    pub const fn label(self) -> &'static str {
        match self {
            VentureType::RealEstate => "Real Estate",
            VentureType::Business => "Business",
        }
    }
}

/// Venture types a CDE is willing to finance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancingFocus {
    RealEstate,
    Business,
    Both,
}

impl FinancingFocus {
    pub fn includes(self, venture: VentureType) -> bool {
        matches!(
            (self, venture),
            (FinancingFocus::Both, _)
                | (FinancingFocus::RealEstate, VentureType::RealEstate)
                | (FinancingFocus::Business, VentureType::Business)
        )
    }

    pub const fn label(self) -> &'static str {
        match self {
            FinancingFocus::RealEstate => "Real Estate",
            FinancingFocus::Business => "Business",
            FinancingFocus::Both => "Real Estate and Business",
        }
    }
}

/// Census designation of the project location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaType {
    Urban,
    Rural,
}

impl AreaType {
    pub const fn label(self) -> &'static str {
        match self {
            AreaType::Urban => "urban",
            AreaType::Rural => "rural",
        }
    }
}

/// Urban/rural emphasis stated by a CDE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaFocus {
    Urban,
    Rural,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Nonprofit,
    ForProfit,
}

impl EntityType {
    pub const fn label(self) -> &'static str {
        match self {
            EntityType::Nonprofit => "nonprofit",
            EntityType::ForProfit => "for-profit",
        }
    }
}

/// Source of the tax-credit allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationType {
    Federal,
    State,
}

impl AllocationType {
    pub const fn label(self) -> &'static str {
        match self {
            AllocationType::Federal => "federal",
            AllocationType::State => "state",
        }
    }
}

/// Validated deal attributes consumed by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealInput {
    pub deal_id: DealId,
    pub project_name: Option<String>,
    pub state: StateCode,
    /// Normalized sector key, see [`normalize_key`](super::normalize_key).
    pub sector: Option<String>,
    /// Requested financing in whole dollars.
    pub financing_amount: u64,
    pub venture_type: VentureType,
    pub owner_occupied: bool,
    pub area: Option<AreaType>,
    pub severely_distressed: bool,
    pub distress_percentile: u8,
    pub minority_owned: bool,
    pub tribal: bool,
    pub underserved_target: bool,
    pub entity_type: Option<EntityType>,
    pub allocation_type: Option<AllocationType>,
}

/// States a CDE is authorized to serve.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceArea {
    pub national: bool,
    pub states: BTreeSet<StateCode>,
}

impl ServiceArea {
    pub fn national() -> Self {
        Self {
            national: true,
            states: BTreeSet::new(),
        }
    }

    pub fn states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = StateCode>,
    {
        Self {
            national: false,
            states: states.into_iter().collect(),
        }
    }

    pub fn covers(&self, state: StateCode) -> bool {
        self.national || self.states.contains(&state)
    }

    pub fn describe(&self) -> String {
        if self.national {
            return "national".to_string();
        }
        if self.states.is_empty() {
            return "no states".to_string();
        }
        self.states
            .iter()
            .map(|state| state.code())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Validated CDE profile consumed by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdeInput {
    pub cde_id: CdeId,
    pub name: String,
    pub service_area: ServiceArea,
    pub financing_focus: FinancingFocus,
    pub area_focus: Option<AreaFocus>,
    /// Normalized sector keys; empty means no sector restriction.
    pub sectors: Vec<String>,
    pub min_deal_size: Option<u64>,
    pub max_deal_size: Option<u64>,
    pub small_deal_fund: bool,
    pub requires_severely_distressed: bool,
    /// Zero means no minimum.
    pub min_distress_percentile: u8,
    pub minority_focus: bool,
    pub underserved_states_focus: bool,
    pub nonprofit_preferred: bool,
    pub for_profit_accepted: bool,
    pub owner_occupied_preference: Option<bool>,
    pub tribal_focus: bool,
    /// Empty means the CDE did not state an allocation source.
    pub allocation_types: BTreeSet<AllocationType>,
    pub remaining_allocation: u64,
}

/// The fifteen scored criteria, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Criterion {
    Geographic,
    Financing,
    UrbanRural,
    Sector,
    DealSize,
    SmallDealFund,
    SeverelyDistressed,
    DistressPercentile,
    MinorityFocus,
    UtsFocus,
    EntityType,
    OwnerOccupied,
    Tribal,
    AllocationType,
    HasAllocation,
}

impl Criterion {
    pub const ALL: [Criterion; 15] = [
        Criterion::Geographic,
        Criterion::Financing,
        Criterion::UrbanRural,
        Criterion::Sector,
        Criterion::DealSize,
        Criterion::SmallDealFund,
        Criterion::SeverelyDistressed,
        Criterion::DistressPercentile,
        Criterion::MinorityFocus,
        Criterion::UtsFocus,
        Criterion::EntityType,
        Criterion::OwnerOccupied,
        Criterion::Tribal,
        Criterion::AllocationType,
        Criterion::HasAllocation,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Criterion::Geographic => "geographic",
            Criterion::Financing => "financing",
            Criterion::UrbanRural => "urbanRural",
            Criterion::Sector => "sector",
            Criterion::DealSize => "dealSize",
            Criterion::SmallDealFund => "smallDealFund",
            Criterion::SeverelyDistressed => "severelyDistressed",
            Criterion::DistressPercentile => "distressPercentile",
            Criterion::MinorityFocus => "minorityFocus",
            Criterion::UtsFocus => "utsFocus",
            Criterion::EntityType => "entityType",
            Criterion::OwnerOccupied => "ownerOccupied",
            Criterion::Tribal => "tribal",
            Criterion::AllocationType => "allocationType",
            Criterion::HasAllocation => "hasAllocation",
        }
    }

    pub const fn is_eliminator(self) -> bool {
        matches!(self, Criterion::Geographic | Criterion::Financing)
    }
}

/// How a single criterion resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionStatus {
    /// Satisfied on the merits of the deal.
    Passed,
    /// Satisfied because the CDE states no restriction.
    Waived,
    Failed,
    /// Not evaluated because an eliminator failed first.
    Skipped,
}

impl CriterionStatus {
    pub const fn is_satisfied(self) -> bool {
        matches!(self, CriterionStatus::Passed | CriterionStatus::Waived)
    }
}

/// Audit entry for one criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionOutcome {
    pub criterion: Criterion,
    pub status: CriterionStatus,
    pub points: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrength {
    Weak,
    Fair,
    Good,
    Excellent,
}

impl MatchStrength {
    pub const fn from_score(score: u8) -> Self {
        if score >= 80 {
            MatchStrength::Excellent
        } else if score >= 65 {
            MatchStrength::Good
        } else if score >= 50 {
            MatchStrength::Fair
        } else {
            MatchStrength::Weak
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            MatchStrength::Excellent => "excellent",
            MatchStrength::Good => "good",
            MatchStrength::Fair => "fair",
            MatchStrength::Weak => "weak",
        }
    }
}

/// Scorer output: the composite score plus the trail that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: u8,
    pub strength: MatchStrength,
    pub breakdown: Vec<CriterionOutcome>,
    pub reasons: Vec<String>,
}

impl MatchResult {
    pub fn total_points(&self) -> u8 {
        self.breakdown.iter().map(|outcome| outcome.points).sum()
    }

    pub fn outcome(&self, criterion: Criterion) -> Option<&CriterionOutcome> {
        self.breakdown
            .iter()
            .find(|outcome| outcome.criterion == criterion)
    }

    pub fn satisfied(&self, criterion: Criterion) -> bool {
        self.outcome(criterion)
            .map(|outcome| outcome.status.is_satisfied())
            .unwrap_or(false)
    }

    pub fn is_eliminated(&self) -> bool {
        self.breakdown
            .iter()
            .any(|outcome| outcome.criterion.is_eliminator() && outcome.status == CriterionStatus::Failed)
    }
}

/// Persisted outcome of an AutoMatch run for one deal/CDE pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub deal_id: DealId,
    pub cde_id: CdeId,
    pub cde_name: String,
    pub reference_year: i32,
    pub result: MatchResult,
    pub matched_at: DateTime<Utc>,
}
