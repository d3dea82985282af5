use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;

use super::states::StateCode;

/// Underserved states and territories published with each NMTC allocation round.
const EDITIONS: &[(i32, &[&str])] = &[
    (
        2022,
        &[
            "AK", "AZ", "CT", "DE", "HI", "ID", "KS", "NV", "NH", "NJ", "ND", "OK", "RI", "SC",
            "SD", "UT", "VA", "WA", "WV", "WY", "AS", "GU", "MP", "PR", "VI",
        ],
    ),
    (
        2023,
        &[
            "AK", "AZ", "CT", "DE", "HI", "ID", "KS", "NV", "NH", "NJ", "NC", "ND", "OK", "RI",
            "SC", "SD", "UT", "VA", "WA", "WY", "AS", "GU", "MP", "PR", "VI",
        ],
    ),
    (
        2024,
        &[
            "AK", "AZ", "CT", "DE", "FL", "HI", "ID", "KS", "NV", "NH", "NC", "ND", "OK", "SC",
            "SD", "TX", "UT", "VA", "WA", "WY", "AS", "GU", "MP", "PR", "VI",
        ],
    ),
    (
        2025,
        &[
            "AK", "AZ", "CT", "DE", "FL", "HI", "ID", "KS", "NV", "NH", "NC", "ND", "OK", "SC",
            "SD", "TN", "TX", "UT", "VA", "WA", "AS", "GU", "MP", "PR", "VI",
        ],
    ),
];

static TABLE: Lazy<BTreeMap<i32, BTreeSet<StateCode>>> = Lazy::new(|| {
    EDITIONS
        .iter()
        .map(|(year, codes)| {
            let states = codes.iter().filter_map(|code| StateCode::parse(code)).collect();
            (*year, states)
        })
        .collect()
});

/// Round year of the edition that applies to `reference_year`.
///
/// Years before the first published round use the first edition; years after the latest use the
/// latest.
pub fn edition_for(reference_year: i32) -> i32 {
    let first = EDITIONS.first().map(|(year, _)| *year).unwrap_or(reference_year);
    TABLE
        .range(..=reference_year)
        .next_back()
        .map(|(year, _)| *year)
        .unwrap_or(first)
}

/// Whether `state` is designated underserved in the edition covering `reference_year`.
pub fn is_underserved(state: StateCode, reference_year: i32) -> bool {
    TABLE
        .get(&edition_for(reference_year))
        .map(|states| states.contains(&state))
        .unwrap_or(false)
}
