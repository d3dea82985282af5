use serde::{Deserialize, Deserializer};
use std::io::Read;

use crate::matching::{CdeSubmission, StateCode};

use super::RosterImportError;

/// One roster row with its 1-based line number in the source file.
#[derive(Debug)]
pub(crate) struct RosterEntry {
    pub(crate) line: usize,
    pub(crate) submission: CdeSubmission,
}

pub(crate) fn parse_entries<R: Read>(reader: R) -> Result<Vec<RosterEntry>, RosterImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut entries = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        // Quoted cells may span lines, so take the line the record starts on.
        let line = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or_default();
        let row: RosterRow = record.deserialize(Some(&headers))?;
        let submission = row.into_submission(line)?;
        entries.push(RosterEntry { line, submission });
    }

    Ok(entries)
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "CDE ID")]
    cde_id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Service Area", default, deserialize_with = "empty_string_as_none")]
    service_area: Option<String>,
    #[serde(rename = "Financing Focus", default, deserialize_with = "empty_string_as_none")]
    financing_focus: Option<String>,
    #[serde(rename = "Urban Rural Focus", default, deserialize_with = "empty_string_as_none")]
    urban_rural_focus: Option<String>,
    #[serde(rename = "Sectors", default, deserialize_with = "empty_string_as_none")]
    sectors: Option<String>,
    #[serde(rename = "Min Deal Size", default, deserialize_with = "empty_string_as_none")]
    min_deal_size: Option<String>,
    #[serde(rename = "Max Deal Size", default, deserialize_with = "empty_string_as_none")]
    max_deal_size: Option<String>,
    #[serde(rename = "Small Deal Fund", default, deserialize_with = "empty_string_as_none")]
    small_deal_fund: Option<String>,
    #[serde(
        rename = "Requires Severely Distressed",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    requires_severely_distressed: Option<String>,
    #[serde(
        rename = "Min Distress Percentile",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    min_distress_percentile: Option<String>,
    #[serde(rename = "Minority Focus", default, deserialize_with = "empty_string_as_none")]
    minority_focus: Option<String>,
    #[serde(rename = "UTS Focus", default, deserialize_with = "empty_string_as_none")]
    uts_focus: Option<String>,
    #[serde(
        rename = "Nonprofit Preferred",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    nonprofit_preferred: Option<String>,
    #[serde(
        rename = "For Profit Accepted",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    for_profit_accepted: Option<String>,
    #[serde(
        rename = "Owner Occupied Preference",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    owner_occupied_preference: Option<String>,
    #[serde(rename = "Tribal Focus", default, deserialize_with = "empty_string_as_none")]
    tribal_focus: Option<String>,
    #[serde(rename = "Allocation Type", default, deserialize_with = "empty_string_as_none")]
    allocation_type: Option<String>,
    #[serde(
        rename = "Remaining Allocation",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    remaining_allocation: Option<String>,
}

impl RosterRow {
    fn into_submission(self, line: usize) -> Result<CdeSubmission, RosterImportError> {
        Ok(CdeSubmission {
            cde_id: self.cde_id,
            name: self.name,
            service_states: split_service_area(self.service_area.as_deref()),
            national: None,
            financing_focus: self.financing_focus,
            urban_rural_focus: self.urban_rural_focus,
            sectors: split_list(self.sectors.as_deref()),
            min_deal_size: amount(line, "Min Deal Size", self.min_deal_size)?,
            max_deal_size: amount(line, "Max Deal Size", self.max_deal_size)?,
            small_deal_fund: flag(line, "Small Deal Fund", self.small_deal_fund)?,
            requires_severely_distressed: flag(
                line,
                "Requires Severely Distressed",
                self.requires_severely_distressed,
            )?,
            min_distress_percentile: amount(
                line,
                "Min Distress Percentile",
                self.min_distress_percentile,
            )?,
            minority_focus: flag(line, "Minority Focus", self.minority_focus)?,
            underserved_states_focus: flag(line, "UTS Focus", self.uts_focus)?,
            nonprofit_preferred: flag(line, "Nonprofit Preferred", self.nonprofit_preferred)?,
            for_profit_accepted: flag(line, "For Profit Accepted", self.for_profit_accepted)?,
            owner_occupied_preference: flag(
                line,
                "Owner Occupied Preference",
                self.owner_occupied_preference,
            )?,
            tribal_focus: flag(line, "Tribal Focus", self.tribal_focus)?,
            allocation_type: self.allocation_type,
            remaining_allocation: amount(line, "Remaining Allocation", self.remaining_allocation)?,
        })
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|raw| {
            raw.split([';', ','])
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Splits a service-area cell, keeping comma-bearing names such as "Washington, D.C." whole.
fn split_service_area(value: Option<&str>) -> Vec<String> {
    let mut entries = Vec::new();
    for segment in value.unwrap_or_default().split(';') {
        let parts: Vec<&str> = segment
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        let mut index = 0;
        while index < parts.len() {
            if let Some(next) = parts.get(index + 1) {
                let joined = format!("{}, {}", parts[index], next);
                if StateCode::parse(&joined).is_some() {
                    entries.push(joined);
                    index += 2;
                    continue;
                }
            }
            entries.push(parts[index].to_string());
            index += 1;
        }
    }
    entries
}

fn flag(
    line: usize,
    column: &'static str,
    value: Option<String>,
) -> Result<Option<bool>, RosterImportError> {
    let Some(raw) = value else {
        return Ok(None);
    };

    match raw.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "x" => Ok(Some(true)),
        "no" | "n" | "false" | "0" => Ok(Some(false)),
        _ => Err(RosterImportError::InvalidValue {
            line,
            column,
            value: raw,
        }),
    }
}

fn amount(
    line: usize,
    column: &'static str,
    value: Option<String>,
) -> Result<Option<f64>, RosterImportError> {
    let Some(raw) = value else {
        return Ok(None);
    };

    let cleaned: String = raw
        .chars()
        .filter(|ch| !matches!(ch, '$' | ',' | '%' | ' '))
        .collect();
    cleaned
        .parse::<f64>()
        .map(Some)
        .map_err(|_| RosterImportError::InvalidValue {
            line,
            column,
            value: raw,
        })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

#[cfg(test)]
pub(crate) fn split_list_for_tests(value: &str) -> Vec<String> {
    split_list(Some(value))
}

#[cfg(test)]
pub(crate) fn split_service_area_for_tests(value: &str) -> Vec<String> {
    split_service_area(Some(value))
}
