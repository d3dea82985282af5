//! CSV import of CDE allocatee rosters.
//!
//! Each row becomes a [`CdeSubmission`](crate::matching::CdeSubmission) and passes through the
//! same [`IntakeGuard`] used by the HTTP surface, so a roster entry and a posted CDE resolve to
//! identical [`CdeInput`] values.

mod parser;

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use crate::matching::{CdeInput, IntakeGuard, IntakeViolation};

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidValue {
        line: usize,
        column: &'static str,
        value: String,
    },
    InvalidRow {
        line: usize,
        source: IntakeViolation,
    },
    DuplicateCde {
        line: usize,
        cde_id: String,
    },
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read CDE roster: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid CDE roster CSV data: {}", err),
            RosterImportError::InvalidValue {
                line,
                column,
                value,
            } => write!(f, "line {line}: column '{column}' has unusable value '{value}'"),
            RosterImportError::InvalidRow { line, source } => {
                write!(f, "line {line}: {source}")
            }
            RosterImportError::DuplicateCde { line, cde_id } => {
                write!(f, "line {line}: CDE '{cde_id}' appears more than once")
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::InvalidRow { source, .. } => Some(source),
            RosterImportError::InvalidValue { .. } | RosterImportError::DuplicateCde { .. } => {
                None
            }
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct CdeRosterImporter;

impl CdeRosterImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<CdeInput>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<CdeInput>, RosterImportError> {
        let guard = IntakeGuard;
        let mut seen = BTreeSet::new();
        let mut cdes = Vec::new();

        for entry in parser::parse_entries(reader)? {
            let line = entry.line;
            let cde = guard
                .cde_from_submission(entry.submission)
                .map_err(|source| RosterImportError::InvalidRow { line, source })?;
            if !seen.insert(cde.cde_id.clone()) {
                return Err(RosterImportError::DuplicateCde {
                    line,
                    cde_id: cde.cde_id.0,
                });
            }
            cdes.push(cde);
        }

        tracing::debug!(count = cdes.len(), "loaded CDE roster");
        Ok(cdes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::{AllocationType, AreaFocus, FinancingFocus, StateCode};

    const HEADER: &str = "CDE ID,Name,Service Area,Financing Focus,Urban Rural Focus,Sectors,Min Deal Size,Max Deal Size,Small Deal Fund,Requires Severely Distressed,Min Distress Percentile,Minority Focus,UTS Focus,Nonprofit Preferred,For Profit Accepted,Owner Occupied Preference,Tribal Focus,Allocation Type,Remaining Allocation";

    fn roster(rows: &[&str]) -> String {
        let mut body = String::from(HEADER);
        for row in rows {
            body.push('\n');
            body.push_str(row);
        }
        body
    }

    #[test]
    fn imports_rows_through_intake() {
        let csv = roster(&[
            r#"cde-pacific,Pacific Community Capital,"CA; OR; WA",Real Estate,Urban,"health care, education","$1,000,000","$10,000,000",yes,yes,50,yes,no,yes,yes,,no,Federal,"$5,000,000""#,
            "cde-national,National Impact Fund,National,Both,,,,,no,no,,no,yes,,,,no,Both,0",
        ]);

        let cdes = CdeRosterImporter::from_reader(csv.as_bytes()).expect("roster imports");

        assert_eq!(cdes.len(), 2);
        let pacific = &cdes[0];
        assert_eq!(pacific.name, "Pacific Community Capital");
        assert_eq!(pacific.service_area.states.len(), 3);
        assert!(pacific
            .service_area
            .covers(StateCode::parse("Oregon").expect("known state")));
        assert_eq!(pacific.financing_focus, FinancingFocus::RealEstate);
        assert_eq!(pacific.area_focus, Some(AreaFocus::Urban));
        assert_eq!(pacific.sectors, vec!["health care", "education"]);
        assert_eq!(pacific.min_deal_size, Some(1_000_000));
        assert_eq!(pacific.max_deal_size, Some(10_000_000));
        assert!(pacific.small_deal_fund);
        assert_eq!(pacific.min_distress_percentile, 50);
        assert_eq!(pacific.remaining_allocation, 5_000_000);

        let national = &cdes[1];
        assert!(national.service_area.national);
        assert!(national.underserved_states_focus);
        assert_eq!(national.financing_focus, FinancingFocus::Both);
        assert!(national.allocation_types.contains(&AllocationType::State));
    }

    #[test]
    fn unknown_flag_value_reports_line_and_column() {
        let csv = roster(&["cde-a,A,CA,Both,,,,,maybe,,,,,,,,,,"]);

        match CdeRosterImporter::from_reader(csv.as_bytes()) {
            Err(RosterImportError::InvalidValue {
                line,
                column,
                value,
            }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "Small Deal Fund");
                assert_eq!(value, "maybe");
            }
            other => panic!("expected invalid value, got {other:?}"),
        }
    }

    #[test]
    fn intake_violations_carry_the_row() {
        let csv = roster(&[
            "cde-a,A,CA,Both,,,,,,,,,,,,,,,",
            "cde-b,B,Gondor,Both,,,,,,,,,,,,,,,",
        ]);

        match CdeRosterImporter::from_reader(csv.as_bytes()) {
            Err(RosterImportError::InvalidRow { line, source }) => {
                assert_eq!(line, 3);
                assert_eq!(source, IntakeViolation::UnknownState("Gondor".to_string()));
            }
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let csv = roster(&[
            "cde-a,A,CA,Both,,,,,,,,,,,,,,,",
            "cde-a,A again,NY,Both,,,,,,,,,,,,,,,",
        ]);

        assert!(matches!(
            CdeRosterImporter::from_reader(csv.as_bytes()),
            Err(RosterImportError::DuplicateCde { line: 3, .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            CdeRosterImporter::from_path("/nonexistent/roster.csv"),
            Err(RosterImportError::Io(_))
        ));
    }

    #[test]
    fn errors_report_the_physical_line_after_multiline_cells() {
        let csv = roster(&[
            "cde-a,\"Alpha Fund\nCommunity Lending Division\",CA,Both,,,,,,,,,,,,,,,",
            "cde-b,B,CA,Both,,,,,perhaps,,,,,,,,,,",
        ]);

        match CdeRosterImporter::from_reader(csv.as_bytes()) {
            Err(RosterImportError::InvalidValue { line, column, .. }) => {
                assert_eq!(line, 4);
                assert_eq!(column, "Small Deal Fund");
            }
            other => panic!("expected invalid value, got {other:?}"),
        }
    }

    #[test]
    fn service_area_keeps_the_district_whole() {
        let csv = roster(&[r#"cde-dc,Capital Fund,"Washington, D.C.; MD, VA",Both,,,,,,,,,,,,,,,"#]);

        let cdes = CdeRosterImporter::from_reader(csv.as_bytes()).expect("roster imports");
        let area = &cdes[0].service_area;
        assert_eq!(area.states.len(), 3);
        for code in ["DC", "MD", "VA"] {
            assert!(area.covers(StateCode::parse(code).expect("known state")));
        }
        assert!(!area.covers(StateCode::parse("WA").expect("known state")));

        assert_eq!(
            parser::split_service_area_for_tests("CA, Washington, DC;National"),
            vec!["CA", "Washington, DC", "National"]
        );
    }

    #[test]
    fn lists_split_on_semicolons_and_commas() {
        assert_eq!(
            parser::split_list_for_tests(" CA ;OR, , WA"),
            vec!["CA", "OR", "WA"]
        );
    }
}
