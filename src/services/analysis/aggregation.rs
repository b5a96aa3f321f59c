// Aggregation Logic
// Folds per-section classification outcomes into one document-level verdict

use crate::models::{
    AggregateVerdict, ClassificationOutcome, ProblematicSection, RiskDistribution, RiskLevel,
    RiskThresholds, Section, VerdictStatus, COMPLIANT_LABEL,
};

/// Aggregate section outcomes into an overall verdict.
///
/// Majority vote by section count; a document is compliant only on strict
/// majority, so a tie lands on non-compliant. Failed sections never vote:
/// they are counted separately, and a document where nothing classified gets
/// an error verdict rather than a fabricated call. Pure over its inputs.
pub fn aggregate(
    results: &[(Section, ClassificationOutcome)],
    thresholds: &RiskThresholds,
    preview_chars: usize,
) -> AggregateVerdict {
    let mut compliant = 0usize;
    let mut non_compliant = 0usize;
    let mut errors = 0usize;
    let mut distribution = RiskDistribution::default();
    let mut problematic: Vec<ProblematicSection> = Vec::new();

    for (section, outcome) in results {
        match outcome {
            ClassificationOutcome::Failed { .. } => errors += 1,
            ClassificationOutcome::Classified {
                label, confidence, ..
            } => {
                if label == COMPLIANT_LABEL {
                    compliant += 1;
                } else {
                    non_compliant += 1;
                    let risk = thresholds.bucket(*confidence);
                    match risk {
                        RiskLevel::High => distribution.high += 1,
                        RiskLevel::Medium => distribution.medium += 1,
                        RiskLevel::Low => distribution.low += 1,
                    }
                    problematic.push(ProblematicSection {
                        index: section.index,
                        confidence: *confidence,
                        risk,
                        preview: preview_of(&section.text, preview_chars),
                    });
                }
            }
        }
    }

    let classified = compliant + non_compliant;
    if classified == 0 {
        return AggregateVerdict {
            status: VerdictStatus::Error,
            confidence: 0.0,
            compliant_sections: 0,
            non_compliant_sections: 0,
            sections_with_errors: errors,
            risk_distribution: distribution,
            problematic_sections: problematic,
        };
    }

    let status = if compliant > non_compliant {
        VerdictStatus::Compliant
    } else {
        VerdictStatus::NonCompliant
    };

    // Mean confidence over the sections that agree with the overall label.
    let mut agreeing_sum = 0.0f64;
    let mut agreeing_count = 0usize;
    for (_, outcome) in results {
        if let ClassificationOutcome::Classified {
            label, confidence, ..
        } = outcome
        {
            let agrees = match status {
                VerdictStatus::Compliant => label == COMPLIANT_LABEL,
                VerdictStatus::NonCompliant => label != COMPLIANT_LABEL,
                VerdictStatus::Error => false,
            };
            if agrees {
                agreeing_sum += confidence;
                agreeing_count += 1;
            }
        }
    }
    let confidence = if agreeing_count > 0 {
        agreeing_sum / agreeing_count as f64
    } else {
        0.0
    };

    // Highest-confidence problems first; stable on index for equal scores.
    problematic.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });

    AggregateVerdict {
        status,
        confidence,
        compliant_sections: compliant,
        non_compliant_sections: non_compliant,
        sections_with_errors: errors,
        risk_distribution: distribution,
        problematic_sections: problematic,
    }
}

/// First `max_chars` characters, cut on a UTF-8 boundary.
fn preview_of(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
