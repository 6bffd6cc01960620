//! Turn free-form model output into an ordered list of [`Suggestion`]s.
//!
//! Two independent passes:
//!
//! - [`parse_structured`] looks for `N. [SEVERITY] Title` headings and folds
//!   the lines under each heading into its description. Lines before the first
//!   heading are dropped.
//! - [`parse_fallback`] turns every non-blank line into its own suggestion,
//!   guessing the severity from a bracketed tag anywhere in the line.
//!
//! [`parse_suggestions`] runs the fallback only when the structured pass finds
//! nothing. Neither pass can fail.

use std::sync::LazyLock;

use regex::Regex;

use crate::suggestion::{Severity, Suggestion};

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s*\[([^\]]+)\]\s*(.+)").expect("valid regex"));

static LEADING_ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("valid regex"));

static SEVERITY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[(?:HIGH|MEDIUM|LOW)\]\s*").expect("valid regex"));

/// Parse model output, falling back to line-by-line extraction when no
/// `N. [SEVERITY] Title` heading is present.
///
/// Empty or all-blank input yields an empty list.
pub fn parse_suggestions(text: &str) -> Vec<Suggestion> {
    let suggestions = parse_structured(text);
    if !suggestions.is_empty() {
        return suggestions;
    }
    parse_fallback(text)
}

/// Strict pass: numbered, bracketed headings with continuation lines.
pub fn parse_structured(text: &str) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    let mut current: Option<Suggestion> = None;

    for line in non_blank_lines(text) {
        if let Some(caps) = HEADING.captures(line) {
            if let Some(done) = current.take() {
                suggestions.push(done);
            }
            let position = suggestions.len() as u32 + 1;
            let number = caps[1]
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .unwrap_or(position);
            current = Some(Suggestion {
                number,
                severity: Severity::from_label(&caps[2]),
                title: caps[3].trim().to_string(),
                description: String::new(),
            });
        } else if let Some(suggestion) = current.as_mut() {
            if !suggestion.description.is_empty() {
                suggestion.description.push(' ');
            }
            suggestion.description.push_str(line);
        }
    }

    if let Some(done) = current {
        suggestions.push(done);
    }
    suggestions
}

/// Permissive pass: one suggestion per non-blank line.
///
/// Severity is `HIGH` if the line contains `[HIGH]`, else `LOW` if it
/// contains `[LOW]`, else `MEDIUM` (tags matched case-insensitively). A
/// leading `N.` and every bracketed severity tag are removed from the title.
/// Lines left empty by that are skipped; ordinals count from 1 over the
/// lines kept.
pub fn parse_fallback(text: &str) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for line in non_blank_lines(text) {
        let upper = line.to_uppercase();
        let severity = if upper.contains("[HIGH]") {
            Severity::High
        } else if upper.contains("[LOW]") {
            Severity::Low
        } else {
            Severity::Medium
        };

        let without_ordinal = LEADING_ORDINAL.replace(line, "");
        let title = SEVERITY_TAG.replace_all(&without_ordinal, "");
        let title = title.trim();
        if title.is_empty() {
            continue;
        }

        suggestions.push(Suggestion {
            number: suggestions.len() as u32 + 1,
            severity,
            title: title.to_string(),
            description: String::new(),
        });
    }
    suggestions
}

fn non_blank_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn severities(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.severity.as_str()).collect()
    }

    #[test]
    fn structured_headings_with_descriptions() {
        let text = "1. [HIGH] Add error handling\n   The divide function should check zero.\n\n2. [MEDIUM] Use range loop\n   Replace the loop.";
        let suggestions = parse_suggestions(text);
        assert_eq!(
            suggestions,
            vec![
                Suggestion {
                    number: 1,
                    severity: Severity::High,
                    title: "Add error handling".into(),
                    description: "The divide function should check zero.".into(),
                },
                Suggestion {
                    number: 2,
                    severity: Severity::Medium,
                    title: "Use range loop".into(),
                    description: "Replace the loop.".into(),
                },
            ]
        );
    }

    #[test]
    fn three_structured_suggestions() {
        let text = "1. [HIGH] Add error handling for division by zero
   The divide function should check if the divisor is zero before performing division.

2. [MEDIUM] Use range loop instead of traditional for loop
   Replace the traditional for loop with a range loop for better readability.

3. [LOW] Add documentation for public functions
   Functions should have proper documentation comments.";
        let suggestions = parse_suggestions(text);
        assert_eq!(suggestions.len(), 3);
        assert_eq!(severities(&suggestions), vec!["HIGH", "MEDIUM", "LOW"]);
        assert!(suggestions[0].description.contains("divide function"));
    }

    #[test]
    fn multi_line_description_joined_with_spaces() {
        let text = "1. [LOW] Rename variable\nfirst line\n  second line  \nthird line";
        let suggestions = parse_structured(text);
        assert_eq!(suggestions[0].description, "first line second line third line");
    }

    #[test]
    fn preamble_before_first_heading_is_dropped() {
        let text = "Here are my suggestions:\n\n1. [HIGH] Fix bug\nDetails.";
        let suggestions = parse_suggestions(text);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].title, "Fix bug");
        assert_eq!(suggestions[0].description, "Details.");
    }

    #[test]
    fn structured_severity_uppercased_and_unknown_kept() {
        let text = "1. [high] One\n2.[ Critical ]Two\n3. [nit] Three";
        let suggestions = parse_structured(text);
        assert_eq!(severities(&suggestions), vec!["HIGH", "CRITICAL", "NIT"]);
        assert_eq!(suggestions[1].title, "Two");
    }

    #[test]
    fn ordinals_are_advisory_and_order_follows_text() {
        let text = "7. [LOW] Seventh\n2. [HIGH] Second";
        let suggestions = parse_structured(text);
        assert_eq!(suggestions[0].number, 7);
        assert_eq!(suggestions[0].title, "Seventh");
        assert_eq!(suggestions[1].number, 2);
    }

    #[test]
    fn zero_or_overflowing_ordinal_gets_position() {
        let text = "0. [LOW] Zero\n99999999999999999999. [HIGH] Huge";
        let suggestions = parse_structured(text);
        assert_eq!(suggestions[0].number, 1);
        assert_eq!(suggestions[1].number, 2);
    }

    #[test]
    fn fallback_without_ordinals() {
        let suggestions = parse_suggestions("[HIGH] Critical issue\n[LOW] Style nit\nsome context");
        assert_eq!(suggestions.len(), 3);
        assert_eq!(severities(&suggestions), vec!["HIGH", "LOW", "MEDIUM"]);
        assert_eq!(suggestions[0].title, "Critical issue");
        assert_eq!(suggestions[1].title, "Style nit");
        assert_eq!(suggestions[2].title, "some context");
        let numbers: Vec<u32> = suggestions.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(suggestions.iter().all(|s| s.description.is_empty()));
    }

    #[test]
    fn fallback_finds_all_three_severities() {
        let text = "[HIGH] Critical security issue found
[MEDIUM] Performance can be improved
[LOW] Code style suggestion
Additional context line";
        let suggestions = parse_suggestions(text);
        assert_eq!(suggestions.len(), 4);
        assert_eq!(
            severities(&suggestions),
            vec!["HIGH", "MEDIUM", "LOW", "MEDIUM"]
        );
    }

    #[test]
    fn fallback_strips_ordinal_and_tags_anywhere() {
        let suggestions = parse_fallback("3. Validate input [high] before use");
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].severity, Severity::High);
        assert_eq!(suggestions[0].title, "Validate input before use");
    }

    #[test]
    fn fallback_high_beats_low_when_both_present() {
        let suggestions = parse_fallback("[LOW] minor but [HIGH] urgent");
        assert_eq!(suggestions[0].severity, Severity::High);
    }

    #[test]
    fn fallback_skips_lines_that_are_only_tags() {
        let suggestions = parse_fallback("[HIGH]\n1. [LOW]\nreal line");
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].number, 1);
        assert_eq!(suggestions[0].title, "real line");
    }

    #[test]
    fn unstructured_prose_still_yields_suggestion() {
        let suggestions =
            parse_suggestions("This is just some random text without any structured suggestions.");
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].severity, Severity::Medium);
    }

    #[test]
    fn empty_and_blank_input_yield_nothing() {
        assert!(parse_suggestions("").is_empty());
        assert!(parse_suggestions("  \n\n\t\n").is_empty());
    }

    #[test]
    fn parsing_is_deterministic() {
        let text = "1. [HIGH] A\nmore\n2. [LOW] B";
        assert_eq!(parse_suggestions(text), parse_suggestions(text));
        let prose = "no structure\nat all";
        assert_eq!(parse_suggestions(prose), parse_suggestions(prose));
    }

    #[test]
    fn crlf_input_is_handled() {
        let suggestions = parse_suggestions("1. [HIGH] Title\r\nbody\r\n");
        assert_eq!(suggestions[0].title, "Title");
        assert_eq!(suggestions[0].description, "body");
    }
}
