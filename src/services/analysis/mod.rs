// Analysis Module
// Aggregation, report shaping and the orchestrating pipeline

pub mod aggregation;
pub mod catalog;
pub mod pipeline;
pub mod report;

pub use aggregation::aggregate;
pub use catalog::{search_regulatory_sources, DEFAULT_RELEVANCE_THRESHOLD};
pub use pipeline::{analyze_and_store, analyze_document, AnalysisError};
pub use report::{clean_preview, extract_key_findings, format_report};
