use super::super::domain::{
    AreaFocus, AreaType, CdeInput, Criterion, CriterionStatus, DealInput, EntityType,
};
use super::super::normalize::keys_overlap;
use super::super::underserved;
use super::SMALL_DEAL_THRESHOLD;

/// Result of a single rule before it is folded into the breakdown.
pub(crate) struct Verdict {
    pub status: CriterionStatus,
    pub reason: Option<String>,
}

impl Verdict {
    fn passed(reason: String) -> Self {
        Self {
            status: CriterionStatus::Passed,
            reason: Some(reason),
        }
    }

    fn waived() -> Self {
        Self {
            status: CriterionStatus::Waived,
            reason: None,
        }
    }

    fn failed() -> Self {
        Self {
            status: CriterionStatus::Failed,
            reason: None,
        }
    }

    fn failed_because(reason: String) -> Self {
        Self {
            status: CriterionStatus::Failed,
            reason: Some(reason),
        }
    }

    fn check(satisfied: bool, reason: impl FnOnce() -> String) -> Self {
        if satisfied {
            Self::passed(reason())
        } else {
            Self::failed()
        }
    }
}

pub(crate) fn evaluate(
    criterion: Criterion,
    deal: &DealInput,
    cde: &CdeInput,
    reference_year: i32,
) -> Verdict {
    match criterion {
        Criterion::Geographic => geographic(deal, cde),
        Criterion::Financing => financing(deal, cde),
        Criterion::UrbanRural => urban_rural(deal, cde),
        Criterion::Sector => sector(deal, cde),
        Criterion::DealSize => deal_size(deal, cde),
        Criterion::SmallDealFund => small_deal_fund(deal, cde),
        Criterion::SeverelyDistressed => severely_distressed(deal, cde),
        Criterion::DistressPercentile => distress_percentile(deal, cde),
        Criterion::MinorityFocus => minority_focus(deal, cde),
        Criterion::UtsFocus => uts_focus(deal, cde, reference_year),
        Criterion::EntityType => entity_type(deal, cde),
        Criterion::OwnerOccupied => owner_occupied(deal, cde),
        Criterion::Tribal => tribal(deal, cde),
        Criterion::AllocationType => allocation_type(deal, cde),
        Criterion::HasAllocation => has_allocation(cde),
    }
}

fn geographic(deal: &DealInput, cde: &CdeInput) -> Verdict {
    if cde.service_area.covers(deal.state) {
        return Verdict {
            status: CriterionStatus::Passed,
            reason: None,
        };
    }

    Verdict::failed_because(format!(
        "{} does not serve {} ({}); service area: {}",
        cde.name,
        deal.state.name(),
        deal.state.code(),
        cde.service_area.describe()
    ))
}

fn financing(deal: &DealInput, cde: &CdeInput) -> Verdict {
    if cde.financing_focus.includes(deal.venture_type) {
        return Verdict {
            status: CriterionStatus::Passed,
            reason: None,
        };
    }

    Verdict::failed_because(format!(
        "{} finances {} deals only; deal requests {} financing",
        cde.name,
        cde.financing_focus.label(),
        deal.venture_type.label()
    ))
}

fn urban_rural(deal: &DealInput, cde: &CdeInput) -> Verdict {
    let required = match cde.area_focus {
        None | Some(AreaFocus::Both) => return Verdict::waived(),
        Some(AreaFocus::Urban) => AreaType::Urban,
        Some(AreaFocus::Rural) => AreaType::Rural,
    };

    Verdict::check(deal.area == Some(required), || {
        format!("CDE focuses on {} projects", required.label())
    })
}

fn sector(deal: &DealInput, cde: &CdeInput) -> Verdict {
    if cde.sectors.is_empty() {
        return Verdict::waived();
    }

    let matched = deal.sector.as_deref().and_then(|sector| {
        cde.sectors
            .iter()
            .find(|target| keys_overlap(sector, target))
            .map(|_| sector)
    });

    match matched {
        Some(sector) => Verdict::passed(format!("CDE targets the {sector} sector")),
        None => Verdict::failed(),
    }
}

fn deal_size(deal: &DealInput, cde: &CdeInput) -> Verdict {
    if cde.min_deal_size.is_none() && cde.max_deal_size.is_none() {
        return Verdict::waived();
    }

    let amount = deal.financing_amount;
    let above_min = cde.min_deal_size.map(|min| amount >= min).unwrap_or(true);
    let below_max = cde.max_deal_size.map(|max| amount <= max).unwrap_or(true);

    Verdict::check(above_min && below_max, || {
        format!(
            "{} request fits the CDE deal-size range ({})",
            format_dollars(amount),
            describe_range(cde.min_deal_size, cde.max_deal_size)
        )
    })
}

fn small_deal_fund(deal: &DealInput, cde: &CdeInput) -> Verdict {
    if deal.financing_amount >= SMALL_DEAL_THRESHOLD {
        return Verdict::waived();
    }

    Verdict::check(cde.small_deal_fund, || {
        format!(
            "Small-deal fund available for a {} request",
            format_dollars(deal.financing_amount)
        )
    })
}

fn severely_distressed(deal: &DealInput, cde: &CdeInput) -> Verdict {
    if !cde.requires_severely_distressed {
        return Verdict::waived();
    }

    Verdict::check(deal.severely_distressed, || {
        "Project is in a severely distressed census tract".to_string()
    })
}

fn distress_percentile(deal: &DealInput, cde: &CdeInput) -> Verdict {
    let minimum = cde.min_distress_percentile;
    if minimum == 0 {
        return Verdict::waived();
    }

    Verdict::check(deal.distress_percentile >= minimum, || {
        format!(
            "Distress percentile {} meets the CDE minimum of {}",
            deal.distress_percentile, minimum
        )
    })
}

fn minority_focus(deal: &DealInput, cde: &CdeInput) -> Verdict {
    if !cde.minority_focus {
        return Verdict::waived();
    }

    Verdict::check(deal.minority_owned, || {
        "Minority-owned project aligns with the CDE minority focus".to_string()
    })
}

fn uts_focus(deal: &DealInput, cde: &CdeInput, reference_year: i32) -> Verdict {
    if !cde.underserved_states_focus {
        return Verdict::waived();
    }

    if underserved::is_underserved(deal.state, reference_year) {
        return Verdict::passed(format!(
            "{} is a designated underserved state for the {} round",
            deal.state.name(),
            underserved::edition_for(reference_year)
        ));
    }

    Verdict::check(deal.underserved_target, || {
        "Deal is flagged as targeting an underserved state".to_string()
    })
}

fn entity_type(deal: &DealInput, cde: &CdeInput) -> Verdict {
    if cde.nonprofit_preferred == cde.for_profit_accepted {
        return Verdict::waived();
    }

    let accepted = if cde.nonprofit_preferred {
        EntityType::Nonprofit
    } else {
        EntityType::ForProfit
    };

    Verdict::check(deal.entity_type == Some(accepted), || {
        format!("CDE works with {} sponsors", accepted.label())
    })
}

fn owner_occupied(deal: &DealInput, cde: &CdeInput) -> Verdict {
    let Some(preference) = cde.owner_occupied_preference else {
        return Verdict::waived();
    };

    Verdict::check(deal.owner_occupied == preference, || {
        if preference {
            "Owner-occupied project matches the CDE preference".to_string()
        } else {
            "Non-owner-occupied project matches the CDE preference".to_string()
        }
    })
}

fn tribal(deal: &DealInput, cde: &CdeInput) -> Verdict {
    if !cde.tribal_focus {
        return Verdict::waived();
    }

    Verdict::check(deal.tribal, || {
        "Tribal or Native American project aligns with the CDE tribal focus".to_string()
    })
}

fn allocation_type(deal: &DealInput, cde: &CdeInput) -> Verdict {
    if cde.allocation_types.is_empty() {
        return Verdict::waived();
    }

    match deal.allocation_type {
        Some(needed) if cde.allocation_types.contains(&needed) => {
            Verdict::passed(format!("CDE offers {} allocation", needed.label()))
        }
        _ => Verdict::failed(),
    }
}

fn has_allocation(cde: &CdeInput) -> Verdict {
    Verdict::check(cde.remaining_allocation > 0, || {
        format!(
            "{} of allocation remaining",
            format_dollars(cde.remaining_allocation)
        )
    })
}

fn describe_range(min: Option<u64>, max: Option<u64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("{} to {}", format_dollars(min), format_dollars(max)),
        (Some(min), None) => format!("at least {}", format_dollars(min)),
        (None, Some(max)) => format!("up to {}", format_dollars(max)),
        (None, None) => "any size".to_string(),
    }
}

pub fn format_dollars(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}")
}
