// Compliscan Data Models
// Shapes shared across the segmentation, classification and reporting pipeline

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const COMPLIANT_LABEL: &str = "compliant";
pub const NON_COMPLIANT_LABEL: &str = "non-compliant";

// ============ Document & Sections ============

/// Where the analyzed text came from. File decoding happens outside the
/// pipeline; by the time a `Document` exists the text is already plain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DocumentSource {
    Upload { filename: String },
    DirectText,
}

/// Raw submitted content. Immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub text: String,
    pub source: DocumentSource,
    pub length: usize,
}

impl Document {
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            length: text.chars().count(),
            text,
            source: DocumentSource::DirectText,
        }
    }

    pub fn from_upload(filename: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            length: text.chars().count(),
            text,
            source: DocumentSource::Upload {
                filename: filename.into(),
            },
        }
    }
}

/// A bounded contiguous slice of a document's text, the unit of
/// classification. Offsets are UTF-8 byte positions into the document text
/// (start inclusive, end exclusive). Sections partition the document:
/// concatenating all section texts reconstructs it exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

// ============ Classification Results ============

/// Output of one classifier call. Tagged explicitly so callers never have
/// to sniff loosely-typed JSON for an error shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ClassificationOutcome {
    Classified {
        /// Label name -> confidence in [0, 1].
        scores: HashMap<String, f64>,
        /// Top-scoring label.
        label: String,
        /// Confidence of the top label.
        confidence: f64,
        #[serde(default)]
        truncated: bool,
    },
    Failed {
        reason: String,
        /// Truncation happened before the failure; kept so report totals
        /// still count the section.
        #[serde(default)]
        truncated: bool,
    },
}

impl ClassificationOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ClassificationOutcome::Failed { .. })
    }

    pub fn is_truncated(&self) -> bool {
        matches!(
            self,
            ClassificationOutcome::Classified { truncated: true, .. }
                | ClassificationOutcome::Failed { truncated: true, .. }
        )
    }

    /// Confidence for a specific label, if this outcome carries scores.
    pub fn score_for(&self, label_name: &str) -> Option<f64> {
        match self {
            ClassificationOutcome::Classified { scores, .. } => scores.get(label_name).copied(),
            ClassificationOutcome::Failed { .. } => None,
        }
    }
}

// ============ Risk Buckets ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

/// Bucket boundaries for non-compliant sections. Observed defaults, not a
/// documented standard, so they stay configurable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskThresholds {
    #[serde(default = "default_high_risk")]
    pub high: f64,
    #[serde(default = "default_medium_risk")]
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high: 0.75,
            medium: 0.4,
        }
    }
}

impl RiskThresholds {
    pub fn bucket(&self, non_compliant_confidence: f64) -> RiskLevel {
        if non_compliant_confidence >= self.high {
            RiskLevel::High
        } else if non_compliant_confidence >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

// ============ Aggregate Verdict ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictStatus {
    #[serde(rename = "compliant")]
    Compliant,
    #[serde(rename = "non-compliant")]
    NonCompliant,
    #[serde(rename = "error")]
    Error,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStatus::Compliant => COMPLIANT_LABEL,
            VerdictStatus::NonCompliant => NON_COMPLIANT_LABEL,
            VerdictStatus::Error => "error",
        }
    }
}

/// A non-compliant section surfaced for review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblematicSection {
    pub index: usize,
    pub confidence: f64,
    pub risk: RiskLevel,
    pub preview: String,
}

/// Document-level rollup of section results. Derived purely from the
/// classification outcomes; recomputed each run, never persisted on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateVerdict {
    pub status: VerdictStatus,
    pub confidence: f64,
    pub compliant_sections: usize,
    pub non_compliant_sections: usize,
    pub sections_with_errors: usize,
    pub risk_distribution: RiskDistribution,
    pub problematic_sections: Vec<ProblematicSection>,
}

// ============ Report ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionReport {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub preview: String,
    pub outcome: ClassificationOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFinding {
    pub finding: String,
    pub risk_level: RiskLevel,
    pub context: String,
}

/// A regulatory framework matched against the document content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub source_name: String,
    pub source_url: String,
    pub description: String,
    pub relevance_score: f64,
    #[serde(default)]
    pub matched_categories: Vec<String>,
}

/// The externally consumed analysis result, handed to the persistence sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub id: String,
    pub source: DocumentSource,
    pub status: VerdictStatus,
    pub confidence: f64,
    pub all_scores: HashMap<String, f64>,
    pub sections: Vec<SectionReport>,
    pub risk_distribution: RiskDistribution,
    pub sections_with_errors: usize,
    pub problematic_sections: Vec<ProblematicSection>,
    pub key_findings: Vec<KeyFinding>,
    pub recommendations: Vec<Recommendation>,
    pub analyzed_length: usize,
    pub truncated_sections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub created_at: String,
}

// ============ Analysis Options ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Upper bound on section size, in characters.
    #[serde(default = "default_max_section_length")]
    pub max_section_length: usize,
    #[serde(default = "default_candidate_labels")]
    pub candidate_labels: Vec<String>,
    /// Concurrent in-flight classifier calls.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub risk_thresholds: RiskThresholds,
    /// Characters kept in section previews.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_section_length: default_max_section_length(),
            candidate_labels: default_candidate_labels(),
            concurrency: default_concurrency(),
            risk_thresholds: RiskThresholds::default(),
            preview_chars: default_preview_chars(),
        }
    }
}

// ============ Default Value Functions ============

fn default_max_section_length() -> usize { 1500 }
fn default_concurrency() -> usize { 4 }
fn default_preview_chars() -> usize { 150 }
fn default_high_risk() -> f64 { 0.75 }
fn default_medium_risk() -> f64 { 0.4 }
fn default_candidate_labels() -> Vec<String> {
    vec![COMPLIANT_LABEL.to_string(), NON_COMPLIANT_LABEL.to_string()]
}
