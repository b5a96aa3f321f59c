// Report Formatter
// Pure shaping of verdict + section outcomes into the externally consumed report

use crate::models::{
    AggregateVerdict, ClassificationOutcome, ComplianceReport, Document, KeyFinding, RiskLevel,
    Section, SectionReport,
};
use crate::services::analysis::catalog::{search_regulatory_sources, DEFAULT_RELEVANCE_THRESHOLD};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

const CONTEXT_CHARS: usize = 50;
const MAX_KEY_FINDINGS: usize = 10;

const HIGH_RISK_KEYWORDS: &[&str] = &[
    "violation", "non-compliance", "breach", "illegal", "prohibited",
    "penalty", "fine", "lawsuit", "litigation", "criminal",
];
const MEDIUM_RISK_KEYWORDS: &[&str] = &[
    "requirement", "regulation", "policy", "standard", "guideline",
    "law", "rule", "compliance", "mandatory", "obligation",
];
const LOW_RISK_KEYWORDS: &[&str] = &[
    "recommendation", "best practice", "suggestion", "advisory",
    "optional", "consideration", "may", "might", "could",
];

static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

fn whitespace_re() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Shape the final report. No I/O; everything is derived from the document,
/// the verdict and the per-section outcomes.
pub fn format_report(
    document: &Document,
    results: &[(Section, ClassificationOutcome)],
    verdict: &AggregateVerdict,
    preview_chars: usize,
) -> ComplianceReport {
    let sections: Vec<SectionReport> = results
        .iter()
        .map(|(section, outcome)| SectionReport {
            index: section.index,
            start: section.start,
            end: section.end,
            preview: clean_preview(&section.text, preview_chars),
            outcome: outcome.clone(),
        })
        .collect();

    let truncated_sections = results
        .iter()
        .filter(|(_, outcome)| outcome.is_truncated())
        .count();
    let warning = if truncated_sections > 0 {
        Some(format!(
            "{} section(s) exceeded the classifier input limit and were truncated before analysis",
            truncated_sections
        ))
    } else {
        None
    };

    ComplianceReport {
        id: document.id.clone(),
        source: document.source.clone(),
        status: verdict.status,
        confidence: verdict.confidence,
        all_scores: mean_scores(results),
        sections,
        risk_distribution: verdict.risk_distribution,
        sections_with_errors: verdict.sections_with_errors,
        problematic_sections: verdict.problematic_sections.clone(),
        key_findings: extract_key_findings(&document.text),
        recommendations: search_regulatory_sources(&document.text, DEFAULT_RELEVANCE_THRESHOLD),
        analyzed_length: document.length,
        truncated_sections,
        warning,
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Per-label mean confidence over classified sections.
fn mean_scores(results: &[(Section, ClassificationOutcome)]) -> HashMap<String, f64> {
    let mut sums: HashMap<String, f64> = HashMap::new();
    let mut classified = 0usize;

    for (_, outcome) in results {
        if let ClassificationOutcome::Classified { scores, .. } = outcome {
            classified += 1;
            for (label, score) in scores {
                *sums.entry(label.clone()).or_insert(0.0) += score;
            }
        }
    }

    if classified > 0 {
        for value in sums.values_mut() {
            *value /= classified as f64;
        }
    }
    sums
}

/// Scan the document for compliance-loaded keywords, highest risk tier
/// first, with surrounding context. Capped so a keyword-dense document does
/// not flood the report.
pub fn extract_key_findings(text: &str) -> Vec<KeyFinding> {
    let mut findings = Vec::new();
    let tiers: [(&[&str], RiskLevel); 3] = [
        (HIGH_RISK_KEYWORDS, RiskLevel::High),
        (MEDIUM_RISK_KEYWORDS, RiskLevel::Medium),
        (LOW_RISK_KEYWORDS, RiskLevel::Low),
    ];

    for (keywords, risk_level) in tiers {
        for keyword in keywords {
            if findings.len() >= MAX_KEY_FINDINGS {
                return findings;
            }
            if let Some(position) = find_ascii_ci(text, keyword) {
                findings.push(KeyFinding {
                    finding: format!("Contains reference to '{}'", keyword),
                    risk_level,
                    context: extract_context(text, position, keyword.len()),
                });
            }
        }
    }

    findings
}

/// Case-insensitive ASCII substring search. Any hit starts on an ASCII byte,
/// so the returned offset is always a char boundary.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Context window of `CONTEXT_CHARS` characters on each side of the match,
/// with ellipses marking truncation.
fn extract_context(text: &str, position: usize, keyword_len: usize) -> String {
    let start = text[..position]
        .char_indices()
        .rev()
        .take(CONTEXT_CHARS)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(position);

    let keyword_end = position + keyword_len;
    let end = text[keyword_end..]
        .char_indices()
        .nth(CONTEXT_CHARS)
        .map(|(idx, _)| keyword_end + idx)
        .unwrap_or(text.len());

    let mut context = text[start..end].to_string();
    if start > 0 {
        context = format!("...{}", context);
    }
    if end < text.len() {
        context.push_str("...");
    }
    context
}

/// Sanitize text for display: drop control characters, collapse whitespace,
/// trim to `max_chars` on a word boundary with an ellipsis.
pub fn clean_preview(text: &str, max_chars: usize) -> String {
    let replaced: String = text
        .chars()
        .map(|c| if c.is_control() && c != '\n' && c != '\t' { ' ' } else { c })
        .collect();
    let collapsed = whitespace_re().replace_all(replaced.trim(), " ").to_string();

    if collapsed.is_empty() {
        return "[no printable content]".to_string();
    }

    let char_count = collapsed.chars().count();
    if char_count <= max_chars {
        return collapsed;
    }

    let cut = collapsed
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(collapsed.len());
    let head = &collapsed[..cut];

    match head.rfind(' ') {
        Some(last_space) => format!("{}...", &head[..last_space]),
        None => format!("{}...", head),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RiskThresholds, VerdictStatus, COMPLIANT_LABEL, NON_COMPLIANT_LABEL};
    use crate::services::analysis::aggregation::aggregate;

    fn classified(label: &str, confidence: f64) -> ClassificationOutcome {
        let mut scores = HashMap::new();
        scores.insert(label.to_string(), confidence);
        scores.insert(
            if label == COMPLIANT_LABEL {
                NON_COMPLIANT_LABEL.to_string()
            } else {
                COMPLIANT_LABEL.to_string()
            },
            1.0 - confidence,
        );
        ClassificationOutcome::Classified {
            scores,
            label: label.to_string(),
            confidence,
            truncated: false,
        }
    }

    fn section(index: usize, text: &str) -> Section {
        Section {
            index,
            start: 0,
            end: text.len(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_clean_preview_collapses_whitespace() {
        let cleaned = clean_preview("  hello\u{0000}\t\n   world  ", 100);
        assert_eq!(cleaned, "hello world");
    }

    #[test]
    fn test_clean_preview_trims_on_word_boundary() {
        let cleaned = clean_preview("alpha beta gamma delta", 12);
        assert_eq!(cleaned, "alpha beta...");
    }

    #[test]
    fn test_clean_preview_handles_empty_input() {
        assert_eq!(clean_preview("\u{0001}\u{0002}", 50), "[no printable content]");
    }

    #[test]
    fn test_key_findings_carry_risk_tier_and_context() {
        let text = "Any breach of this agreement triggers a penalty. The policy \
                    further defines a mandatory obligation for all parties.";
        let findings = extract_key_findings(text);

        let breach = findings.iter().find(|f| f.finding.contains("breach")).unwrap();
        assert_eq!(breach.risk_level, RiskLevel::High);
        assert!(breach.context.contains("breach of this agreement"));
        assert!(breach.context.ends_with("..."));

        let policy = findings.iter().find(|f| f.finding.contains("policy")).unwrap();
        assert_eq!(policy.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_key_findings_are_capped() {
        let text = "violation non-compliance breach illegal prohibited penalty \
                    fine lawsuit litigation criminal requirement regulation policy";
        let findings = extract_key_findings(text);
        assert_eq!(findings.len(), 10);
    }

    #[test]
    fn test_key_findings_match_case_insensitively() {
        let findings = extract_key_findings("A VIOLATION was recorded.");
        assert!(findings.iter().any(|f| f.finding.contains("violation")));
    }

    #[test]
    fn test_mean_scores_ignore_failed_sections() {
        let results = vec![
            (section(0, "a"), classified(COMPLIANT_LABEL, 0.9)),
            (section(1, "b"), classified(COMPLIANT_LABEL, 0.7)),
            (
                section(2, "c"),
                ClassificationOutcome::Failed {
                    reason: "x".to_string(),
                    truncated: false,
                },
            ),
        ];
        let scores = mean_scores(&results);
        assert!((scores[COMPLIANT_LABEL] - 0.8).abs() < 1e-9);
        assert!((scores[NON_COMPLIANT_LABEL] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_format_report_shapes_all_fields() {
        let doc = Document::from_text(
            "This policy covers data privacy and personal data handling. \
             Any breach is a violation subject to penalty.",
        );
        let results = vec![
            (section(0, "This policy covers data privacy."), classified(COMPLIANT_LABEL, 0.9)),
            (section(1, "Any breach is a violation."), classified(NON_COMPLIANT_LABEL, 0.8)),
            (section(2, "Subject to penalty."), classified(COMPLIANT_LABEL, 0.7)),
        ];
        let verdict = aggregate(&results, &RiskThresholds::default(), 150);
        let report = format_report(&doc, &results, &verdict, 150);

        assert_eq!(report.id, doc.id);
        assert_eq!(report.status, VerdictStatus::Compliant);
        assert_eq!(report.sections.len(), 3);
        assert_eq!(report.truncated_sections, 0);
        assert!(report.warning.is_none());
        assert!(!report.key_findings.is_empty());
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.source_name.contains("GDPR")));
        assert!(!report.created_at.is_empty());
    }

    #[test]
    fn test_truncated_sections_produce_warning() {
        let doc = Document::from_text("Some text.");
        let outcome = ClassificationOutcome::Classified {
            scores: HashMap::new(),
            label: COMPLIANT_LABEL.to_string(),
            confidence: 0.9,
            truncated: true,
        };
        let results = vec![(section(0, "Some text."), outcome)];
        let verdict = aggregate(&results, &RiskThresholds::default(), 150);
        let report = format_report(&doc, &results, &verdict, 150);

        assert_eq!(report.truncated_sections, 1);
        assert!(report.warning.as_deref().unwrap_or("").contains("1 section"));
    }

    #[test]
    fn test_truncated_failed_section_still_counts_toward_warning() {
        let doc = Document::from_text("Some text.");
        let outcome = ClassificationOutcome::Failed {
            reason: "rejected".to_string(),
            truncated: true,
        };
        let results = vec![(section(0, "Some text."), outcome)];
        let verdict = aggregate(&results, &RiskThresholds::default(), 150);
        let report = format_report(&doc, &results, &verdict, 150);

        assert_eq!(report.status, VerdictStatus::Error);
        assert_eq!(report.truncated_sections, 1);
        assert!(report.warning.is_some());
    }
}
