// Declare modules
pub mod augment;
pub mod canonical;
pub mod classify;
pub mod cluster;
pub mod data;
pub mod db;
pub mod error;
pub mod ingest;
pub mod lexicon;
pub mod models;
pub mod parse;
pub mod progress;
pub mod stats;

// Re-export key types for easier use
pub use augment::Augmentation;
pub use canonical::canonicalize;
pub use classify::{Classification, GlossClassifier, Rule, RuleTable};
pub use cluster::ConceptGraph;
pub use db::{StoreMetadata, StoreSummary};
pub use error::{ConceptError, Result};
pub use models::{
    Concept, ConceptId, Direction, Form, Lemma, LemmaId, LemmaKey, LexiconRecord, RawGloss, Sense,
    Translation, UNKNOWN_POS,
};
pub use progress::{ProgressCallback, ProgressUpdate};
pub use stats::BuildStats;

use crate::ingest::TranslationIngestor;
use crate::lexicon::Lexicon;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const DEFAULT_LANGUAGES: [&str; 5] = ["en", "es", "fr", "de", "it"];
pub const DEFAULT_PIVOT: &str = "en";

/// Options for building a concept store.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Root of the input tree. Defaults to the per-user data directory.
    pub base_dir: Option<PathBuf>,
    /// Where the store is written. Defaults to `<base_dir>/concepts.db`.
    pub output_path: Option<PathBuf>,
    pub languages: Vec<String>,
    /// Hub language for clustering; must be one of `languages`.
    pub pivot: String,
    pub sparse_threshold: usize,
    pub rich_threshold: usize,
    pub max_senses_per_language: usize,
    pub max_glosses_per_sense: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            base_dir: None,
            output_path: None,
            languages: DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect(),
            pivot: DEFAULT_PIVOT.to_string(),
            sparse_threshold: augment::DEFAULT_SPARSE_THRESHOLD,
            rich_threshold: augment::DEFAULT_RICH_THRESHOLD,
            max_senses_per_language: cluster::DEFAULT_MAX_SENSES,
            max_glosses_per_sense: 3,
        }
    }
}

impl BuildOptions {
    /// Lower-cased, trimmed languages without duplicates, in the given order.
    pub fn normalized_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = Vec::with_capacity(self.languages.len());
        for lang in &self.languages {
            let lang = lang.trim().to_lowercase();
            if !lang.is_empty() && !languages.contains(&lang) {
                languages.push(lang);
            }
        }
        languages
    }

    pub fn validate(&self) -> Result<()> {
        let languages = self.normalized_languages();
        if languages.is_empty() {
            return Err(ConceptError::InvalidArgument(
                "at least one language is required".to_string(),
            ));
        }
        let pivot = self.pivot.trim().to_lowercase();
        if !languages.contains(&pivot) {
            return Err(ConceptError::InvalidArgument(format!(
                "pivot language '{}' is not one of the configured languages ({})",
                self.pivot,
                languages.join(", ")
            )));
        }
        if self.max_senses_per_language == 0 || self.max_glosses_per_sense == 0 {
            return Err(ConceptError::InvalidArgument(
                "sense and gloss limits must be at least 1".to_string(),
            ));
        }
        if self.sparse_threshold > self.rich_threshold {
            return Err(ConceptError::InvalidArgument(format!(
                "sparse threshold ({}) exceeds rich threshold ({})",
                self.sparse_threshold, self.rich_threshold
            )));
        }
        Ok(())
    }

    pub fn resolve_base_dir(&self) -> Result<PathBuf> {
        match &self.base_dir {
            Some(dir) => Ok(dir.clone()),
            None => data::default_base_dir(),
        }
    }

    pub fn resolve_output_path(&self, base_dir: &Path) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| base_dir.join(data::STORE_FILENAME))
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub output_path: PathBuf,
    pub stats: BuildStats,
    pub augmentations: Vec<Augmentation>,
    pub summary: StoreSummary,
}

/// Runs the whole pipeline and replaces the store at the output path.
///
/// Nothing is written unless every stage succeeds. A build that filters
/// everything away fails with [`ConceptError::NoData`].
pub fn build_concept_graph(
    options: &BuildOptions,
    progress: Option<ProgressCallback>,
) -> Result<BuildReport> {
    options.validate()?;
    let start_time = Instant::now();
    let languages = options.normalized_languages();
    let pivot = options.pivot.trim().to_lowercase();
    let base_dir = options.resolve_base_dir()?;
    let output_path = options.resolve_output_path(&base_dir);
    info!(
        "Building concept store from {:?} (languages: {}, pivot: {})",
        base_dir,
        languages.join(", "),
        pivot
    );

    let mut stats = BuildStats::new();

    // 1. Lexicons
    let Lexicon {
        mut registry,
        forms,
    } = Lexicon::load_all(&base_dir, &languages, &mut stats)?;

    // 2. Translations
    let ingestor = TranslationIngestor::new(&languages, &pivot, options.max_glosses_per_sense);
    let mut table = ingestor.ingest_all(&base_dir, &languages, &mut stats)?;

    // 3. Sparse directions
    let augmentations = augment::augment_sparse_directions(
        &mut table,
        options.sparse_threshold,
        options.rich_threshold,
        &mut stats,
    );

    if table.is_empty() {
        error!("No translations survived filtering; refusing to write an empty store");
        return Err(ConceptError::NoData("translations".to_string()));
    }

    // 4. Concepts
    let graph = cluster::build_concepts(
        &table,
        &mut registry,
        &pivot,
        options.max_senses_per_language,
        &mut stats,
    );
    drop(table);
    if graph.is_empty() {
        return Err(ConceptError::NoData("concepts".to_string()));
    }
    if registry.is_empty() {
        return Err(ConceptError::NoData("lemmas".to_string()));
    }

    // 5. Store
    let metadata = StoreMetadata {
        pivot_language: pivot,
        languages,
    };
    db::write_store(&output_path, &registry, &forms, &graph, &metadata, progress)?;
    let summary = db::read_summary(&output_path)?;

    stats.log_summary();
    info!("Build finished in {:?}", start_time.elapsed());
    Ok(BuildReport {
        output_path,
        stats,
        augmentations,
        summary,
    })
}

/// Default store location: `<user data dir>/concepts.db`.
pub fn default_store_path() -> Result<PathBuf> {
    Ok(data::default_base_dir()?.join(data::STORE_FILENAME))
}

/// Deletes the store at `path` together with its SQLite sidecar files.
/// Returns `false` if there was nothing to delete.
pub fn clear_store(path: &Path) -> Result<bool> {
    if !path.exists() {
        info!("Store not found, nothing to clear: {:?}", path);
        return Ok(false);
    }
    fs::remove_file(path).map_err(|e| {
        error!("Failed to delete store {:?}: {}", path, e);
        ConceptError::Io(e)
    })?;
    for suffix in ["-wal", "-shm", "-journal"] {
        let sidecar = db::sidecar_path(path, suffix);
        if sidecar.exists() {
            let _ = fs::remove_file(sidecar);
        }
    }
    info!("Deleted store {:?}", path);
    Ok(true)
}
