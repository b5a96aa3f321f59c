pub mod models;
pub mod services;

pub use models::{
    AnalysisOptions, ClassificationOutcome, ComplianceReport, Document, DocumentSource, Section,
    VerdictStatus,
};
pub use services::analysis::{analyze_and_store, analyze_document, AnalysisError};
pub use services::classifier::{ClassifierOptions, SectionClassifier, ZeroShotClient};
pub use services::persistence::{LocalJsonSink, PersistenceSink};
pub use services::segmenter::segment;

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize console logging. Call once from the embedding binary; level is
/// controlled by `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();

    info!("=== Compliscan Started ===");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
}
