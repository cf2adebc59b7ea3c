//! Normalization of circular-comparison results into display text.
//!
//! The service asks its model for a five-field JSON object, but what comes
//! back ranges from a proper object to prose with an object buried inside it,
//! Python-style quoting, or markdown fences. Every function here degrades to
//! plain text instead of failing.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::QueryResult;

pub const COMPARISON_FIELDS: [&str; 5] = [
    "purpose_and_scope",
    "key_differences",
    "timeline_and_amendments",
    "institutional_impact",
    "recommendations",
];

pub const NO_COMPARISON_TEXT: &str = "No comparison available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub purpose_and_scope: String,
    pub key_differences: String,
    pub timeline_and_amendments: String,
    pub institutional_impact: String,
    pub recommendations: String,
}

impl ComparisonReport {
    fn is_complete(&self) -> bool {
        self.sections().iter().all(|(_, body)| !body.trim().is_empty())
    }

    /// Section headings paired with their bodies, in report order.
    pub fn sections(&self) -> [(&'static str, &str); 5] {
        [
            ("Purpose and Scope", self.purpose_and_scope.as_str()),
            ("Key Differences", self.key_differences.as_str()),
            ("Timeline and Amendments", self.timeline_and_amendments.as_str()),
            ("Institutional Impact", self.institutional_impact.as_str()),
            ("Recommendations", self.recommendations.as_str()),
        ]
    }
}

static FENCE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z0-9_-]*[ \t]*\r?$\n?").expect("fence regex"));

static CIRCULAR_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)CSSF\s+\d{1,2}[-/]\d{3}").expect("circular id regex"));

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\}").expect("trailing comma regex"));

/// Candidate locations of the object inside free text, most specific last.
/// When a pattern has a capture group, the group is the object.
static OBJECT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\{[\s\S]*\}",
        r#"\{\s*"purpose_and_scope"[\s\S]*?"recommendations"[^}]*\}"#,
        r#"response\s*=\s*(\{[\s\S]*?"recommendations"[^}]*\})"#,
        r#"(\{[^{}]*"purpose_and_scope"[^{}]*"key_differences"[^{}]*"timeline_and_amendments"[^{}]*"institutional_impact"[^{}]*"recommendations"[^{}]*\})"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("object regex"))
    .collect()
});

static FIELD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    COMPARISON_FIELDS
        .iter()
        .map(|field| Regex::new(&format!(r#"(?i)"{field}"\s*:\s*"([^"]*)""#)).expect("field regex"))
        .collect()
});

/// Produces the display string for a result's comparison payload.
///
/// Falls back to the plain answer when there is no payload, and to the
/// payload text itself when it does not parse.
pub fn format_comparison_result(result: &QueryResult) -> String {
    let Some(payload) = result.comparison.as_ref() else {
        return match result.answer.as_deref().map(str::trim) {
            Some(answer) if !answer.is_empty() => answer.to_string(),
            _ => NO_COMPARISON_TEXT.to_string(),
        };
    };

    let (raw_text, report) = match payload {
        Value::String(text) => (text.clone(), extract_comparison(text)),
        Value::Object(_) => (
            payload.to_string(),
            serde_json::from_value::<ComparisonReport>(payload.clone())
                .ok()
                .filter(ComparisonReport::is_complete),
        ),
        other => (other.to_string(), None),
    };

    match report {
        Some(report) => {
            let (found1, found2) = extract_circular_ids(&raw_text);
            let c1 = result.circular1.clone().or(found1);
            let c2 = result.circular2.clone().or(found2);
            render_comparison_markdown(&report, c1.as_deref(), c2.as_deref())
        }
        None => {
            let cleaned = strip_fences(&raw_text);
            if cleaned.is_empty() {
                NO_COMPARISON_TEXT.to_string()
            } else {
                cleaned
            }
        }
    }
}

/// Renders the five-section report.
pub fn render_comparison_markdown(
    report: &ComparisonReport,
    circular1: Option<&str>,
    circular2: Option<&str>,
) -> String {
    let header = match (circular1, circular2) {
        (None, None) => "**Circular Comparison**".to_string(),
        (c1, c2) => format!(
            "**Comparison: {} vs {}**",
            c1.unwrap_or("unknown circular"),
            c2.unwrap_or("unknown circular")
        ),
    };

    let mut out = header;
    for (title, body) in report.sections() {
        out.push_str("\n\n**");
        out.push_str(title);
        out.push_str(":**\n");
        out.push_str(body);
    }
    out
}

/// Finds a complete five-field comparison object in `text`.
pub fn extract_comparison(text: &str) -> Option<ComparisonReport> {
    let text = strip_fences(text);
    if let Some(report) = parse_report(&text) {
        return Some(report);
    }

    for pattern in OBJECT_PATTERNS.iter() {
        let Some(captures) = pattern.captures(&text) else {
            continue;
        };
        let candidate = captures
            .get(1)
            .or_else(|| captures.get(0))
            .map(|m| m.as_str())
            .unwrap_or_default();
        if let Some(report) = parse_report(candidate).or_else(|| parse_report(&repair(candidate))) {
            return Some(report);
        }
    }

    extract_fields(&text)
}

/// True when `text` mentions every comparison field and a circular.
pub fn looks_like_comparison(text: &str) -> bool {
    let has_fields = COMPARISON_FIELDS.iter().all(|field| text.contains(field));
    let has_circular_context =
        text.contains("CSSF") || text.contains("circular") || text.contains("Circular");
    has_fields && has_circular_context
}

/// First two circular identifiers such as `CSSF 22/806` found in `text`.
pub fn extract_circular_ids(text: &str) -> (Option<String>, Option<String>) {
    let mut found = CIRCULAR_ID.find_iter(text).map(|m| m.as_str().to_string());
    let first = found.next();
    let second = found.next();
    (first, second)
}

/// Removes markdown code-fence lines and surrounding whitespace.
pub fn strip_fences(text: &str) -> String {
    FENCE_LINE.replace_all(text, "").trim().to_string()
}

fn parse_report(candidate: &str) -> Option<ComparisonReport> {
    serde_json::from_str::<ComparisonReport>(candidate.trim())
        .ok()
        .filter(ComparisonReport::is_complete)
}

/// Python-style quoting and trailing commas are the usual model slips.
fn repair(candidate: &str) -> String {
    let quoted = candidate.replace('\'', "\"");
    TRAILING_COMMA.replace_all(&quoted, "}").into_owned()
}

fn extract_fields(text: &str) -> Option<ComparisonReport> {
    let mut values = FIELD_PATTERNS
        .iter()
        .map(|pattern| pattern.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str().to_string()));

    let report = ComparisonReport {
        purpose_and_scope: values.next()??,
        key_differences: values.next()??,
        timeline_and_amendments: values.next()??,
        institutional_impact: values.next()??,
        recommendations: values.next()??,
    };
    report.is_complete().then_some(report)
}
