// Regulatory Source Catalog
// Curated regulatory frameworks matched against document content by keyword

use crate::models::Recommendation;

pub const DEFAULT_RELEVANCE_THRESHOLD: f64 = 0.3;

struct RegulatorySource {
    keyword: &'static str,
    title: &'static str,
    url: &'static str,
    description: &'static str,
    categories: &'static [&'static str],
}

static REGULATORY_SOURCES: &[RegulatorySource] = &[
    RegulatorySource {
        keyword: "money laundering",
        title: "Bank Secrecy Act",
        url: "https://www.fincen.gov/resources/statutes-regulations/bank-secrecy-act",
        description: "Regulations to combat money laundering and terrorist financing.",
        categories: &["financial", "banking", "anti_money_laundering"],
    },
    RegulatorySource {
        keyword: "lending",
        title: "Truth in Lending Act",
        url: "https://www.consumerfinance.gov/policy-compliance/guidance/implementation-guidance/taft/",
        description: "Guidelines ensuring transparency in lending practices.",
        categories: &["financial", "lending", "consumer_protection"],
    },
    RegulatorySource {
        keyword: "data privacy",
        title: "General Data Protection Regulation (GDPR)",
        url: "https://gdpr-info.eu/",
        description: "Comprehensive data privacy regulation in the EU.",
        categories: &["data_privacy", "personal_data", "data_protection"],
    },
    RegulatorySource {
        keyword: "health information",
        title: "Health Insurance Portability and Accountability Act (HIPAA)",
        url: "https://www.hhs.gov/hipaa/for-professionals/index.html",
        description: "Regulations for protecting sensitive patient health information.",
        categories: &["healthcare", "medical_data", "patient_privacy"],
    },
    RegulatorySource {
        keyword: "payment processing",
        title: "Payment Card Industry Data Security Standard (PCI DSS)",
        url: "https://www.pcisecuritystandards.org/",
        description: "Security standards for organizations that handle credit card information.",
        categories: &["payment_processing", "financial_data", "credit_card"],
    },
    RegulatorySource {
        keyword: "financial reporting",
        title: "Sarbanes-Oxley Act (SOX)",
        url: "https://www.sec.gov/spotlight/sarbanes-oxley.htm",
        description: "Regulations for financial disclosure and corporate governance.",
        categories: &["financial_reporting", "accounting", "corporate_governance"],
    },
    RegulatorySource {
        keyword: "information security",
        title: "ISO 27001 Standards",
        url: "https://www.iso.org/isoiec-27001-information-security.html",
        description: "Information security management standards.",
        categories: &["information_security", "risk_management", "security_controls"],
    },
];

/// Match the catalog against document text, returning frameworks whose
/// relevance clears `threshold`, sorted highest first.
///
/// Scoring is additive per match: keyword 0.5, each category term 0.3 (both
/// the spaced and the underscored spelling count), title 0.4, capped at 1.0.
/// This is a plain lookup, not a learned ranking.
pub fn search_regulatory_sources(text: &str, threshold: f64) -> Vec<Recommendation> {
    let text_lower = text.to_lowercase();
    let mut results: Vec<Recommendation> = Vec::new();

    for source in REGULATORY_SOURCES {
        let mut relevance = 0.0f64;
        let mut matched_categories: Vec<String> = Vec::new();

        if text_lower.contains(source.keyword) {
            relevance += 0.5;
        }

        for category in source.categories {
            let category_term = category.replace('_', " ");
            if text_lower.contains(&category_term) {
                relevance += 0.3;
                matched_categories.push(category.to_string());
            }
            if text_lower.contains(category) {
                relevance += 0.3;
                if !matched_categories.iter().any(|c| c == category) {
                    matched_categories.push(category.to_string());
                }
            }
        }

        if text_lower.contains(&source.title.to_lowercase()) {
            relevance += 0.4;
        }

        if relevance >= threshold {
            results.push(Recommendation {
                source_name: source.title.to_string(),
                source_url: source.url.to_string(),
                description: source.description.to_string(),
                relevance_score: relevance.min(1.0),
                matched_categories,
            });
        }
    }

    results.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_match_scores_half() {
        let results = search_regulatory_sources(
            "This policy addresses money laundering controls.",
            DEFAULT_RELEVANCE_THRESHOLD,
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_name, "Bank Secrecy Act");
        assert!((results[0].relevance_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_category_match_records_category() {
        let results = search_regulatory_sources(
            "We store personal data of EU residents.",
            DEFAULT_RELEVANCE_THRESHOLD,
        );
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].source_name,
            "General Data Protection Regulation (GDPR)"
        );
        assert_eq!(results[0].matched_categories, vec!["personal_data"]);
    }

    #[test]
    fn test_score_is_capped_at_one() {
        let text = "General Data Protection Regulation (GDPR): data privacy, \
                    personal data, data protection obligations.";
        let results = search_regulatory_sources(text, DEFAULT_RELEVANCE_THRESHOLD);
        assert_eq!(results[0].relevance_score, 1.0);
    }

    #[test]
    fn test_below_threshold_is_excluded() {
        let results =
            search_regulatory_sources("Nothing regulatory in here at all.", DEFAULT_RELEVANCE_THRESHOLD);
        assert!(results.is_empty());
    }

    #[test]
    fn test_results_sorted_by_relevance() {
        let text = "Payment processing rules and lending transparency; payment \
                    processing with credit card data.";
        let results = search_regulatory_sources(text, DEFAULT_RELEVANCE_THRESHOLD);
        assert!(results.len() >= 2);
        for pair in results.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
        assert_eq!(
            results[0].source_name,
            "Payment Card Industry Data Security Standard (PCI DSS)"
        );
    }
}
