/// Comparison key for free-text program values.
///
/// Upstream rows mix `Real Estate`, `real-estate` and `REAL_ESTATE`; all of them collapse to
/// `real estate` here.
pub fn normalize_key(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let spaced: String = cleaned
        .chars()
        .map(|ch| if ch == '_' || ch == '-' { ' ' } else { ch })
        .collect();
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

/// Loose equality used for sector lists: exact key match or containment either way.
pub(crate) fn keys_overlap(left: &str, right: &str) -> bool {
    if left.is_empty() || right.is_empty() {
        return false;
    }
    left == right || left.contains(right) || right.contains(left)
}
