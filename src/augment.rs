//! Direction Augmenter: fills a sparse translation direction by mirroring its rich reverse.

use crate::ingest::DirectionTable;
use crate::models::{Direction, Translation};
use crate::stats::BuildStats;
use log::{debug, info};

/// Below this many records a direction is sparse.
pub const DEFAULT_SPARSE_THRESHOLD: usize = 10_000;
/// Above this many records a direction is rich.
pub const DEFAULT_RICH_THRESHOLD: usize = 100_000;

/// One applied augmentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Augmentation {
    /// The direction that received mirrored records.
    pub sparse: Direction,
    /// The direction the records were mirrored from.
    pub rich: Direction,
    pub original: usize,
    pub mirrored: usize,
}

/// `true` when a direction holding `count` records should be filled from a
/// reverse direction holding `reverse_count`.
pub fn needs_augmentation(count: usize, reverse_count: usize, sparse_threshold: usize, rich_threshold: usize) -> bool {
    count < sparse_threshold && reverse_count > rich_threshold
}

/// Mirrors rich directions into their sparse reverse, at most once per language pair.
/// Mirrored records are appended after the sparse direction's own records.
pub fn augment_sparse_directions(
    table: &mut DirectionTable,
    sparse_threshold: usize,
    rich_threshold: usize,
    stats: &mut BuildStats,
) -> Vec<Augmentation> {
    let mut applied = Vec::new();

    for (a, b) in table.language_pairs() {
        let forward = Direction::new(&a, &b);
        let backward = forward.reversed();
        let forward_count = table.count(&forward);
        let backward_count = table.count(&backward);
        debug!("{}: {} / {}: {}", forward, forward_count, backward, backward_count);

        let (sparse, rich, original) =
            if needs_augmentation(forward_count, backward_count, sparse_threshold, rich_threshold) {
                (forward, backward, forward_count)
            } else if needs_augmentation(backward_count, forward_count, sparse_threshold, rich_threshold) {
                (backward, forward, backward_count)
            } else {
                continue;
            };

        let mirrored: Vec<Translation> = table.get(&rich).iter().map(Translation::mirrored).collect();
        let count = mirrored.len();
        table.append(&sparse, mirrored);
        stats.mirrored_records += count as u64;
        info!(
            "{} is sparse ({} records); mirrored {} records from {}",
            sparse, original, count, rich
        );
        applied.push(Augmentation {
            sparse,
            rich,
            original,
            mirrored: count,
        });
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(table: &mut DirectionTable, from: &str, to: &str, prefix: &str, n: usize) {
        let records = (0..n)
            .map(|i| Translation {
                source_lemma: format!("{}src{}", prefix, i),
                source_lang: from.to_string(),
                gloss: format!("{}dst{}", prefix, i),
                target_lang: to.to_string(),
            })
            .collect();
        table.append(&Direction::new(from, to), records);
    }

    #[test]
    fn test_sparse_direction_is_mirrored() {
        let mut table = DirectionTable::new();
        fill(&mut table, "en", "es", "x", 500);
        fill(&mut table, "es", "en", "y", 150_000);
        let mut stats = BuildStats::new();

        let applied = augment_sparse_directions(
            &mut table,
            DEFAULT_SPARSE_THRESHOLD,
            DEFAULT_RICH_THRESHOLD,
            &mut stats,
        );

        let en_es = Direction::new("en", "es");
        assert_eq!(table.count(&en_es), 150_500);
        assert_eq!(table.count(&Direction::new("es", "en")), 150_000);
        assert_eq!(stats.mirrored_records, 150_000);
        assert_eq!(
            applied,
            vec![Augmentation {
                sparse: en_es.clone(),
                rich: Direction::new("es", "en"),
                original: 500,
                mirrored: 150_000,
            }]
        );

        // Originals stay first, mirrored records follow.
        let records = table.get(&en_es);
        assert_eq!(records[0].source_lemma, "xsrc0");
        assert_eq!(records[500].source_lemma, "ydst0");
        assert_eq!(records[500].gloss, "ysrc0");
        assert_eq!(records[500].source_lang, "en");
    }

    #[test]
    fn test_sparse_reverse_orientation() {
        let mut table = DirectionTable::new();
        fill(&mut table, "fr", "en", "a", 100_001);
        let mut stats = BuildStats::new();

        let applied = augment_sparse_directions(&mut table, 10_000, 100_000, &mut stats);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].sparse, Direction::new("en", "fr"));
        assert_eq!(table.count(&Direction::new("en", "fr")), 100_001);
    }

    #[test]
    fn test_balanced_pair_is_untouched() {
        let mut table = DirectionTable::new();
        fill(&mut table, "en", "es", "x", 50_000);
        fill(&mut table, "es", "en", "y", 50_000);
        let mut stats = BuildStats::new();

        let applied = augment_sparse_directions(&mut table, 10_000, 100_000, &mut stats);
        assert!(applied.is_empty());
        assert_eq!(table.total(), 100_000);
        assert_eq!(stats.mirrored_records, 0);
    }

    #[test]
    fn test_thresholds_are_strict() {
        assert!(needs_augmentation(9_999, 100_001, 10_000, 100_000));
        assert!(!needs_augmentation(10_000, 100_001, 10_000, 100_000));
        assert!(!needs_augmentation(9_999, 100_000, 10_000, 100_000));
        assert!(!needs_augmentation(0, 0, 10_000, 100_000));
    }

    #[test]
    fn test_applies_once_per_pair() {
        let mut table = DirectionTable::new();
        fill(&mut table, "es", "en", "y", 20);
        let mut stats = BuildStats::new();

        let first = augment_sparse_directions(&mut table, 10, 15, &mut stats);
        assert_eq!(first.len(), 1);
        assert_eq!(table.count(&Direction::new("en", "es")), 20);
        // Both directions now exceed the sparse threshold.
        let second = augment_sparse_directions(&mut table, 10, 15, &mut stats);
        assert!(second.is_empty());
        assert_eq!(table.total(), 40);
    }
}
