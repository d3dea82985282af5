use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{
    AllocationType, AreaFocus, AreaType, CdeId, CdeInput, DealId, DealInput, EntityType,
    FinancingFocus, ServiceArea, VentureType,
};
use super::normalize::normalize_key;
use super::states::StateCode;

/// Deal payload as it arrives from the deal repository or an HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DealSubmission {
    pub deal_id: String,
    pub project_name: Option<String>,
    pub state: Option<String>,
    pub sector: Option<String>,
    pub financing_amount: Option<f64>,
    pub venture_type: Option<String>,
    pub owner_occupied: Option<bool>,
    pub urban_rural: Option<String>,
    pub severely_distressed: Option<bool>,
    pub distress_percentile: Option<f64>,
    pub minority_owned: Option<bool>,
    pub tribal: Option<bool>,
    pub underserved_target: Option<bool>,
    pub entity_type: Option<String>,
    pub allocation_type: Option<String>,
}

/// CDE payload as it arrives from the CDE repository, roster import, or HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdeSubmission {
    pub cde_id: String,
    pub name: String,
    pub service_states: Vec<String>,
    pub national: Option<bool>,
    pub financing_focus: Option<String>,
    pub urban_rural_focus: Option<String>,
    pub sectors: Vec<String>,
    pub min_deal_size: Option<f64>,
    pub max_deal_size: Option<f64>,
    pub small_deal_fund: Option<bool>,
    pub requires_severely_distressed: Option<bool>,
    pub min_distress_percentile: Option<f64>,
    pub minority_focus: Option<bool>,
    pub underserved_states_focus: Option<bool>,
    pub nonprofit_preferred: Option<bool>,
    pub for_profit_accepted: Option<bool>,
    pub owner_occupied_preference: Option<bool>,
    pub tribal_focus: Option<bool>,
    pub allocation_type: Option<String>,
    pub remaining_allocation: Option<f64>,
}

/// Structural problems found while validating a submission.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntakeViolation {
    #[error("{0} id must not be blank")]
    MissingId(&'static str),
    #[error("deal is missing a requested financing amount")]
    MissingFinancingAmount,
    #[error("{field} must be a non-negative finite amount (found {value})")]
    InvalidAmount { field: &'static str, value: f64 },
    #[error("deal is missing a state")]
    MissingState,
    #[error("unknown state or territory '{0}'")]
    UnknownState(String),
    #[error("deal is missing a financing venture type")]
    MissingVentureType,
    #[error("unrecognized {field} value '{value}'")]
    UnrecognizedValue { field: &'static str, value: String },
    #[error("{field} must be between 0 and 100 (found {value})")]
    PercentileOutOfRange { field: &'static str, value: f64 },
    #[error("minimum deal size {min} exceeds maximum {max}")]
    InvertedDealSizeRange { min: u64, max: u64 },
}

/// Boundary that turns loosely-typed submissions into scorer inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    pub fn deal_from_submission(
        &self,
        submission: DealSubmission,
    ) -> Result<DealInput, IntakeViolation> {
        let deal_id = submission.deal_id.trim();
        if deal_id.is_empty() {
            return Err(IntakeViolation::MissingId("deal"));
        }

        let amount = submission
            .financing_amount
            .ok_or(IntakeViolation::MissingFinancingAmount)?;
        let financing_amount = whole_dollars("financing_amount", amount)?;

        let raw_state = submission
            .state
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .ok_or(IntakeViolation::MissingState)?;
        let state = parse_state(raw_state)?;

        let venture_type = match non_blank(submission.venture_type.as_deref()) {
            Some(raw) => parse_venture_type(raw)?,
            None => return Err(IntakeViolation::MissingVentureType),
        };

        let area = non_blank(submission.urban_rural.as_deref())
            .map(|raw| {
                parse_area_type(&normalize_key(raw)).ok_or_else(|| unrecognized("urban_rural", raw))
            })
            .transpose()?;

        let distress_percentile =
            percentile("distress_percentile", submission.distress_percentile.unwrap_or(0.0))?;

        let entity_type = non_blank(submission.entity_type.as_deref())
            .map(parse_entity_type)
            .transpose()?;

        let allocation_type = non_blank(submission.allocation_type.as_deref())
            .map(|raw| match parse_allocation_types(raw)?.as_slice() {
                [single] => Ok(*single),
                _ => Err(unrecognized("allocation_type", raw)),
            })
            .transpose()?;

        Ok(DealInput {
            deal_id: DealId(deal_id.to_string()),
            project_name: submission
                .project_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            state,
            sector: non_blank(submission.sector.as_deref()).map(normalize_key),
            financing_amount,
            venture_type,
            owner_occupied: submission.owner_occupied.unwrap_or(true),
            area,
            severely_distressed: submission.severely_distressed.unwrap_or(false),
            distress_percentile,
            minority_owned: submission.minority_owned.unwrap_or(false),
            tribal: submission.tribal.unwrap_or(false),
            underserved_target: submission.underserved_target.unwrap_or(false),
            entity_type,
            allocation_type,
        })
    }

    pub fn cde_from_submission(
        &self,
        submission: CdeSubmission,
    ) -> Result<CdeInput, IntakeViolation> {
        let cde_id = submission.cde_id.trim();
        if cde_id.is_empty() {
            return Err(IntakeViolation::MissingId("cde"));
        }

        let mut national = submission.national.unwrap_or(false);
        let mut states = BTreeSet::new();
        for raw in &submission.service_states {
            let key = normalize_key(raw);
            if key.is_empty() {
                continue;
            }
            if key == "national" || key == "nationwide" || key == "all states" {
                national = true;
                continue;
            }
            states.insert(parse_state(raw)?);
        }
        let service_area = ServiceArea { national, states };

        let financing_focus = match non_blank(submission.financing_focus.as_deref()) {
            Some(raw) => parse_financing_focus(raw)?,
            None => FinancingFocus::Both,
        };

        let area_focus = non_blank(submission.urban_rural_focus.as_deref())
            .map(parse_area_focus)
            .transpose()?;

        let sectors = submission
            .sectors
            .iter()
            .map(|sector| normalize_key(sector))
            .filter(|sector| !sector.is_empty())
            .collect();

        let min_deal_size = submission
            .min_deal_size
            .map(|value| whole_dollars("min_deal_size", value))
            .transpose()?;
        let max_deal_size = submission
            .max_deal_size
            .map(|value| whole_dollars("max_deal_size", value))
            .transpose()?;
        if let (Some(min), Some(max)) = (min_deal_size, max_deal_size) {
            if min > max {
                return Err(IntakeViolation::InvertedDealSizeRange { min, max });
            }
        }

        let min_distress_percentile = percentile(
            "min_distress_percentile",
            submission.min_distress_percentile.unwrap_or(0.0),
        )?;

        let allocation_types = match non_blank(submission.allocation_type.as_deref()) {
            Some(raw) => parse_allocation_types(raw)?.into_iter().collect(),
            None => BTreeSet::new(),
        };

        let remaining_allocation = whole_dollars(
            "remaining_allocation",
            submission.remaining_allocation.unwrap_or(0.0),
        )?;

        let name = submission.name.trim();

        Ok(CdeInput {
            cde_id: CdeId(cde_id.to_string()),
            name: if name.is_empty() {
                cde_id.to_string()
            } else {
                name.to_string()
            },
            service_area,
            financing_focus,
            area_focus,
            sectors,
            min_deal_size,
            max_deal_size,
            small_deal_fund: submission.small_deal_fund.unwrap_or(false),
            requires_severely_distressed: submission.requires_severely_distressed.unwrap_or(false),
            min_distress_percentile,
            minority_focus: submission.minority_focus.unwrap_or(false),
            underserved_states_focus: submission.underserved_states_focus.unwrap_or(false),
            nonprofit_preferred: submission.nonprofit_preferred.unwrap_or(false),
            for_profit_accepted: submission.for_profit_accepted.unwrap_or(false),
            owner_occupied_preference: submission.owner_occupied_preference,
            tribal_focus: submission.tribal_focus.unwrap_or(false),
            allocation_types,
            remaining_allocation,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

fn unrecognized(field: &'static str, raw: &str) -> IntakeViolation {
    IntakeViolation::UnrecognizedValue {
        field,
        value: raw.to_string(),
    }
}

fn parse_state(raw: &str) -> Result<StateCode, IntakeViolation> {
    StateCode::parse(raw).ok_or_else(|| IntakeViolation::UnknownState(raw.trim().to_string()))
}

fn whole_dollars(field: &'static str, value: f64) -> Result<u64, IntakeViolation> {
    if !value.is_finite() || value < 0.0 {
        return Err(IntakeViolation::InvalidAmount { field, value });
    }
    Ok(value.round() as u64)
}

fn percentile(field: &'static str, value: f64) -> Result<u8, IntakeViolation> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(IntakeViolation::PercentileOutOfRange { field, value });
    }
    Ok(value.round() as u8)
}

fn parse_venture_type(raw: &str) -> Result<VentureType, IntakeViolation> {
    let key = normalize_key(raw);
    venture_from_key(&key).ok_or_else(|| unrecognized("venture_type", raw))
}

fn venture_from_key(key: &str) -> Option<VentureType> {
    if key == "re" || key.contains("real estate") || key.contains("realestate") {
        Some(VentureType::RealEstate)
    } else if key.contains("business") || key == "qalicb" {
        Some(VentureType::Business)
    } else {
        None
    }
}

fn parse_financing_focus(raw: &str) -> Result<FinancingFocus, IntakeViolation> {
    let key = normalize_key(raw);
    if matches!(key.as_str(), "both" | "all" | "any") {
        return Ok(FinancingFocus::Both);
    }

    let real_estate = key == "re" || key.contains("real estate") || key.contains("realestate");
    let business = key.contains("business");
    match (real_estate, business) {
        (true, true) => Ok(FinancingFocus::Both),
        (true, false) => Ok(FinancingFocus::RealEstate),
        (false, true) => Ok(FinancingFocus::Business),
        (false, false) => Err(unrecognized("financing_focus", raw)),
    }
}

fn parse_area_type(key: &str) -> Option<AreaType> {
    if key.contains("rural") || key.contains("non metro") || key.contains("nonmetro") {
        Some(AreaType::Rural)
    } else if key.contains("urban") || key.contains("metro") {
        Some(AreaType::Urban)
    } else {
        None
    }
}

fn parse_area_focus(raw: &str) -> Result<AreaFocus, IntakeViolation> {
    let key = normalize_key(raw);
    let urban = key.contains("urban");
    let rural = key.contains("rural");
    if matches!(key.as_str(), "both" | "all" | "any") || (urban && rural) {
        return Ok(AreaFocus::Both);
    }

    match parse_area_type(&key) {
        Some(AreaType::Urban) => Ok(AreaFocus::Urban),
        Some(AreaType::Rural) => Ok(AreaFocus::Rural),
        None => Err(unrecognized("urban_rural_focus", raw)),
    }
}

fn parse_entity_type(raw: &str) -> Result<EntityType, IntakeViolation> {
    let key = normalize_key(raw).replace(' ', "");
    if key.contains("nonprofit") || key.contains("notforprofit") || key.contains("501") {
        Ok(EntityType::Nonprofit)
    } else if key.contains("forprofit") || key == "llc" || key.contains("corporation") {
        Ok(EntityType::ForProfit)
    } else {
        Err(unrecognized("entity_type", raw))
    }
}

fn parse_allocation_types(raw: &str) -> Result<Vec<AllocationType>, IntakeViolation> {
    let key = normalize_key(raw);
    if key == "both" {
        return Ok(vec![AllocationType::Federal, AllocationType::State]);
    }

    let state = key.contains("state");
    let mut types = Vec::new();
    // Bare "NMTC" means the federal program; "State NMTC" is a state allocation.
    if key.contains("federal") || (key.contains("nmtc") && !state) {
        types.push(AllocationType::Federal);
    }
    if state {
        types.push(AllocationType::State);
    }

    if types.is_empty() {
        Err(unrecognized("allocation_type", raw))
    } else {
        Ok(types)
    }
}
