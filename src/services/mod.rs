// Compliscan Core Services

pub mod analysis;
pub mod classifier;
pub mod config_store;
pub mod persistence;
pub mod segmenter;

pub use classifier::*;
pub use config_store::*;
pub use persistence::*;
pub use segmenter::*;

// Re-export analysis module functions
pub use analysis::{
    aggregate,
    analyze_and_store,
    analyze_document,
    extract_key_findings,
    format_report,
    search_regulatory_sources,
    AnalysisError,
};
