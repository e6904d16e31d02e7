//! Concept Clusterer.
//!
//! Records translated into the pivot language are grouped by the canonical
//! pivot lemma and the source word's part of speech. Each group becomes one
//! concept, linked to the pivot lemma at rank 1 and to up to `max_senses`
//! lemmas per other language, shortest first.

use crate::canonical::canonicalize;
use crate::ingest::DirectionTable;
use crate::lexicon::{LemmaRegistry, PosCache};
use crate::models::{Concept, ConceptId, LemmaKey, Sense, UNKNOWN_POS};
use crate::stats::BuildStats;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};

/// Default cap on senses per language and concept.
pub const DEFAULT_MAX_SENSES: usize = 3;

/// Concepts and senses produced by one build.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConceptGraph {
    pub concepts: Vec<Concept>,
    pub senses: Vec<Sense>,
}

impl ConceptGraph {
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

/// Hub bucket key: `(pivot lemma, part of speech)`.
type HubKey = (String, String);

/// Source words collected under one hub key.
#[derive(Debug, Default)]
struct HubBucket {
    /// `(lang, lemma) -> character length`, first write wins.
    members: HashMap<(String, String), usize>,
}

impl HubBucket {
    fn add(&mut self, lang: &str, lemma: &str) {
        self.members
            .entry((lang.to_string(), lemma.to_string()))
            .or_insert_with(|| lemma.chars().count());
    }

    /// Members grouped by language (sorted), each group ordered by
    /// `(length, lemma)`.
    fn ranked_by_language(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut sorted: Vec<(usize, &str, &str)> = self
            .members
            .iter()
            .map(|((lang, lemma), &len)| (len, lemma.as_str(), lang.as_str()))
            .collect();
        sorted.sort_unstable();

        let mut by_lang: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (_, lemma, lang) in sorted {
            by_lang.entry(lang).or_default().push(lemma);
        }
        by_lang
    }
}

/// Builds concepts from every `X -> pivot` record in `table`.
///
/// Lemmas seen only in translations are added to `registry`. Concept ids
/// follow the sorted order of hub keys, so identical inputs give identical ids.
pub fn build_concepts(
    table: &DirectionTable,
    registry: &mut LemmaRegistry,
    pivot: &str,
    max_senses: usize,
    stats: &mut BuildStats,
) -> ConceptGraph {
    info!("Clustering translations into concepts via the {} hub...", pivot);
    let pos_cache = registry.pos_cache();
    let hubs = collect_hubs(table, &pos_cache, pivot, stats);
    info!("Creating concepts from {} {} hubs", hubs.len(), pivot);

    let lemmas_before = registry.len();
    let mut graph = ConceptGraph::default();

    for ((pivot_lemma, pos), bucket) in &hubs {
        let concept_id = graph.concepts.len() as ConceptId + 1;
        graph.concepts.push(Concept {
            id: concept_id,
            pos: pos.clone(),
            gloss: pivot_lemma.clone(),
        });

        for (lang, lemmas) in bucket.ranked_by_language() {
            for (idx, lemma) in lemmas.into_iter().take(max_senses).enumerate() {
                let (lemma_id, _) = registry.intern(LemmaKey::new(lang, lemma, pos.as_str()));
                graph.senses.push(Sense {
                    lemma_id,
                    concept_id,
                    rank: idx as u32 + 1,
                });
            }
        }

        let (pivot_id, _) = registry.intern(LemmaKey::new(pivot, pivot_lemma.as_str(), pos.as_str()));
        graph.senses.push(Sense {
            lemma_id: pivot_id,
            concept_id,
            rank: 1,
        });
    }

    stats.lemmas_from_translations += (registry.len() - lemmas_before) as u64;
    info!(
        "Created {} concepts, {} senses ({} lemmas introduced by translations)",
        graph.concepts.len(),
        graph.senses.len(),
        registry.len() - lemmas_before
    );
    graph
}

fn collect_hubs(
    table: &DirectionTable,
    pos_cache: &PosCache,
    pivot: &str,
    stats: &mut BuildStats,
) -> BTreeMap<HubKey, HubBucket> {
    let mut hubs: BTreeMap<HubKey, HubBucket> = BTreeMap::new();

    for (direction, records) in table.iter() {
        if direction.from == pivot {
            stats.excluded_pivot_source += records.len() as u64;
            continue;
        }
        if direction.to != pivot {
            // Cross pairs carry pivot-language text mislabelled as the target language.
            debug!("Excluding {} cross-pair records for {}", records.len(), direction);
            stats.excluded_cross_pair += records.len() as u64;
            continue;
        }

        for record in records {
            let pivot_lemma = canonicalize(&record.gloss);
            if pivot_lemma.is_empty() {
                continue;
            }
            let pos = pos_cache
                .get(&record.source_lang, &record.source_lemma)
                .unwrap_or(UNKNOWN_POS);
            hubs.entry((pivot_lemma, pos.to_string()))
                .or_default()
                .add(&record.source_lang, &record.source_lemma);
            stats.clustered_records += 1;
        }
    }
    hubs
}
