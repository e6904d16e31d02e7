//! Run-scoped counters, created at build start and threaded through every stage.

use log::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    // Sources
    pub missing_sources: u64,

    // Lexicon loader
    pub lexicon_records: u64,
    pub lexicon_malformed: u64,

    // Translation ingestor
    pub raw_records: u64,
    pub malformed_records: u64,
    pub skipped_inflections: u64,
    pub skipped_technical: u64,
    pub skipped_self_or_empty: u64,
    pub skipped_language: u64,
    pub duplicate_records: u64,
    pub accepted_records: u64,

    // Direction augmenter
    pub mirrored_records: u64,

    // Concept clusterer
    pub excluded_pivot_source: u64,
    pub excluded_cross_pair: u64,
    pub clustered_records: u64,
    pub lemmas_from_translations: u64,
}

impl BuildStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records dropped by the ingestor for any reason.
    pub fn total_skipped(&self) -> u64 {
        self.malformed_records
            + self.skipped_inflections
            + self.skipped_technical
            + self.skipped_self_or_empty
            + self.skipped_language
            + self.duplicate_records
    }

    pub fn log_summary(&self) {
        info!(
            "Lexicon: {} records ({} malformed), {} missing sources",
            self.lexicon_records, self.lexicon_malformed, self.missing_sources
        );
        info!(
            "Translations: {} raw, {} accepted; skipped {} inflections, {} technical, {} self/empty, {} unsupported language, {} duplicates, {} malformed",
            self.raw_records,
            self.accepted_records,
            self.skipped_inflections,
            self.skipped_technical,
            self.skipped_self_or_empty,
            self.skipped_language,
            self.duplicate_records,
            self.malformed_records
        );
        info!(
            "Clustering: {} records clustered, {} mirrored, {} pivot-source excluded, {} cross-pair excluded, {} lemmas introduced",
            self.clustered_records,
            self.mirrored_records,
            self.excluded_pivot_source,
            self.excluded_cross_pair,
            self.lemmas_from_translations
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_skipped() {
        let stats = BuildStats {
            malformed_records: 1,
            skipped_inflections: 2,
            skipped_technical: 3,
            skipped_self_or_empty: 4,
            skipped_language: 5,
            duplicate_records: 6,
            accepted_records: 100,
            ..BuildStats::new()
        };
        assert_eq!(stats.total_skipped(), 21);
    }
}
