// Analysis Pipeline
// Orchestrates segment -> classify (bounded concurrency) -> aggregate -> report

use crate::models::{AnalysisOptions, ClassificationOutcome, ComplianceReport, Document, Section};
use crate::services::analysis::aggregation::aggregate;
use crate::services::analysis::report::format_report;
use crate::services::classifier::SectionClassifier;
use crate::services::persistence::PersistenceSink;
use crate::services::segmenter::{segment, SegmentError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("document contains no analyzable text")]
    EmptyDocument,
    #[error("invalid analysis options: {0}")]
    InvalidOptions(String),
    #[error("failed to persist report")]
    Sink(#[source] anyhow::Error),
}

impl From<SegmentError> for AnalysisError {
    fn from(err: SegmentError) -> Self {
        match err {
            SegmentError::EmptyDocument => AnalysisError::EmptyDocument,
            SegmentError::InvalidSectionLength => AnalysisError::InvalidOptions(err.to_string()),
        }
    }
}

/// Run the full analysis for one document.
///
/// Sections are classified concurrently, bounded by a semaphore; results are
/// restored to section-index order before aggregation, so completion order
/// never leaks into the report. A failed section degrades the verdict
/// instead of aborting the run.
pub async fn analyze_document<C>(
    client: Arc<C>,
    document: &Document,
    options: &AnalysisOptions,
) -> Result<ComplianceReport, AnalysisError>
where
    C: SectionClassifier + Send + Sync + 'static,
{
    let sections = segment(&document.text, options.max_section_length)?;
    info!(
        "[PIPELINE] analyzing document {} ({} sections, concurrency {})",
        document.id,
        sections.len(),
        options.concurrency
    );

    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let labels = Arc::new(options.candidate_labels.clone());
    let mut join_set = JoinSet::new();

    for section in &sections {
        let semaphore = semaphore.clone();
        let client = client.clone();
        let labels = labels.clone();
        let text = section.text.clone();
        let index = section.index;

        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let outcome = client.classify_section(&text, &labels).await;
            (index, outcome)
        });
    }

    let mut by_index: HashMap<usize, ClassificationOutcome> =
        HashMap::with_capacity(sections.len());
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, outcome)) => {
                by_index.insert(index, outcome);
            }
            Err(e) => {
                warn!("[PIPELINE] classification task aborted: {}", e);
            }
        }
    }

    // Sections drive the ordering; a task that never reported becomes a
    // failed outcome rather than a hole in the report.
    let results: Vec<(Section, ClassificationOutcome)> = sections
        .into_iter()
        .map(|section| {
            let outcome = by_index.remove(&section.index).unwrap_or_else(|| {
                ClassificationOutcome::Failed {
                    reason: "classification task aborted".to_string(),
                    truncated: false,
                }
            });
            (section, outcome)
        })
        .collect();

    let verdict = aggregate(&results, &options.risk_thresholds, options.preview_chars);
    info!(
        "[PIPELINE] document {} -> {} (confidence {:.3}, {} errors)",
        document.id,
        verdict.status.as_str(),
        verdict.confidence,
        verdict.sections_with_errors
    );

    Ok(format_report(document, &results, &verdict, options.preview_chars))
}

/// Analyze and hand the finished report to the persistence sink.
pub async fn analyze_and_store<C, S>(
    client: Arc<C>,
    sink: &S,
    document: &Document,
    options: &AnalysisOptions,
) -> Result<ComplianceReport, AnalysisError>
where
    C: SectionClassifier + Send + Sync + 'static,
    S: PersistenceSink,
{
    let report = analyze_document(client, document, options).await?;
    sink.store(&report).await.map_err(AnalysisError::Sink)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{VerdictStatus, COMPLIANT_LABEL, NON_COMPLIANT_LABEL};
    use std::time::Duration;

    /// Content-driven stub: the marker word in a section decides its outcome
    /// and an artificial delay, so completion order can be forced.
    struct StubClassifier;

    fn outcome_of(label: &str, confidence: f64) -> ClassificationOutcome {
        let mut scores = HashMap::new();
        scores.insert(label.to_string(), confidence);
        ClassificationOutcome::Classified {
            scores,
            label: label.to_string(),
            confidence,
            truncated: false,
        }
    }

    impl SectionClassifier for StubClassifier {
        async fn classify_section(
            &self,
            text: &str,
            _candidate_labels: &[String],
        ) -> ClassificationOutcome {
            if text.contains("alpha") {
                // Finishes last even though it is the first section.
                tokio::time::sleep(Duration::from_millis(50)).await;
                outcome_of(COMPLIANT_LABEL, 0.9)
            } else if text.contains("beta") {
                tokio::time::sleep(Duration::from_millis(20)).await;
                outcome_of(COMPLIANT_LABEL, 0.8)
            } else if text.contains("gamma") {
                outcome_of(NON_COMPLIANT_LABEL, 0.6)
            } else if text.contains("broken") {
                ClassificationOutcome::Failed {
                    reason: "upstream unavailable".to_string(),
                    truncated: false,
                }
            } else {
                outcome_of(COMPLIANT_LABEL, 0.5)
            }
        }
    }

    fn three_section_options() -> AnalysisOptions {
        AnalysisOptions {
            max_section_length: 15,
            ..AnalysisOptions::default()
        }
    }

    #[tokio::test]
    async fn test_results_follow_section_order_not_completion_order() {
        let doc = Document::from_text("alpha one.\n\nbeta two.\n\ngamma three.");
        let report = analyze_document(Arc::new(StubClassifier), &doc, &three_section_options())
            .await
            .unwrap();

        assert_eq!(report.sections.len(), 3);
        let indices: Vec<usize> = report.sections.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        // The slowest section is still reported first.
        match &report.sections[0].outcome {
            ClassificationOutcome::Classified { confidence, .. } => {
                assert!((confidence - 0.9).abs() < 1e-9)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_three_section_verdict_and_confidence() {
        let doc = Document::from_text("alpha one.\n\nbeta two.\n\ngamma three.");
        let report = analyze_document(Arc::new(StubClassifier), &doc, &three_section_options())
            .await
            .unwrap();

        assert_eq!(report.status, VerdictStatus::Compliant);
        assert!((report.confidence - 0.85).abs() < 1e-9);
        assert_eq!(report.risk_distribution.medium, 1);
        assert_eq!(report.problematic_sections.len(), 1);
        assert_eq!(report.problematic_sections[0].index, 2);
    }

    #[tokio::test]
    async fn test_all_failed_sections_yield_error_report() {
        let doc = Document::from_text("broken a.\n\nbroken b.\n\nbroken c.");
        let report = analyze_document(Arc::new(StubClassifier), &doc, &three_section_options())
            .await
            .unwrap();

        assert_eq!(report.status, VerdictStatus::Error);
        assert_eq!(report.sections_with_errors, 3);
    }

    #[tokio::test]
    async fn test_partial_failure_degrades_without_aborting() {
        let doc = Document::from_text("alpha one.\n\nbroken b.");
        let report = analyze_document(Arc::new(StubClassifier), &doc, &three_section_options())
            .await
            .unwrap();

        assert_eq!(report.status, VerdictStatus::Compliant);
        assert_eq!(report.sections_with_errors, 1);
    }

    #[tokio::test]
    async fn test_empty_document_is_rejected() {
        let doc = Document::from_text("   \n\n  ");
        let err = analyze_document(Arc::new(StubClassifier), &doc, &AnalysisOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyDocument));
    }

    #[tokio::test]
    async fn test_zero_section_length_is_invalid_options() {
        let doc = Document::from_text("text");
        let options = AnalysisOptions {
            max_section_length: 0,
            ..AnalysisOptions::default()
        };
        let err = analyze_document(Arc::new(StubClassifier), &doc, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidOptions(_)));
    }
}
