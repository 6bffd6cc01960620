//! Post-processing of parsed suggestions: severity filtering and truncation.

use crate::suggestion::Suggestion;

/// Filter value that keeps every suggestion.
pub const ALL_SEVERITIES: &str = "all";

/// Keep the suggestions whose severity equals `severity`, ignoring case.
///
/// `"all"` (any case) returns the input untouched. Order is preserved and no
/// match simply yields an empty list.
pub fn filter_by_severity(suggestions: Vec<Suggestion>, severity: &str) -> Vec<Suggestion> {
    if severity.eq_ignore_ascii_case(ALL_SEVERITIES) {
        return suggestions;
    }
    suggestions
        .into_iter()
        .filter(|s| s.severity.matches(severity))
        .collect()
}

/// Keep at most the first `max` suggestions. `max <= 0` means no limit.
pub fn limit(mut suggestions: Vec<Suggestion>, max: i64) -> Vec<Suggestion> {
    if let Ok(max) = usize::try_from(max) {
        if max > 0 {
            suggestions.truncate(max);
        }
    }
    suggestions
}
