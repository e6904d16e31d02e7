//! Translation Ingestor: raw bilingual records in, accepted records partitioned by direction out.

use crate::canonical::canonicalize;
use crate::classify::{Classification, GlossClassifier};
use crate::data;
use crate::error::Result;
use crate::lexicon::table_exists;
use crate::models::{Direction, RawGloss, Translation};
use crate::parse::{DumpEntry, normalize_word, parse_dump_line};
use crate::stats::BuildStats;
use log::{debug, info, warn};
use rusqlite::{Connection, OpenFlags};
use std::collections::hash_map::RandomState;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::BuildHasher;
use std::io::BufRead;
use std::path::Path;

const LOG_EVERY_LINES: usize = 100_000;

/// Accepted translations keyed by direction. Iteration is ordered by direction.
///
/// Ingested records are deduplicated by hash; the records themselves are only
/// stored once.
#[derive(Debug, Default, Clone)]
pub struct DirectionTable {
    directions: BTreeMap<Direction, Vec<Translation>>,
    seen: HashSet<u64>,
    hasher: RandomState,
}

impl DirectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an ingested record. Returns `false` if an identical record was already pushed.
    pub fn push(&mut self, translation: Translation) -> bool {
        if !self.seen.insert(self.hasher.hash_one(&translation)) {
            return false;
        }
        self.directions
            .entry(translation.direction())
            .or_default()
            .push(translation);
        true
    }

    /// Appends records to `direction` as they are, without deduplication.
    /// Appended records are not seen by later calls to [`push`](Self::push).
    pub fn append(&mut self, direction: &Direction, records: Vec<Translation>) {
        if records.is_empty() {
            return;
        }
        self.directions
            .entry(direction.clone())
            .or_default()
            .extend(records);
    }

    pub fn get(&self, direction: &Direction) -> &[Translation] {
        self.directions
            .get(direction)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn count(&self, direction: &Direction) -> usize {
        self.get(direction).len()
    }

    pub fn total(&self) -> usize {
        self.directions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Direction, &[Translation])> {
        self.directions.iter().map(|(d, v)| (d, v.as_slice()))
    }

    /// Language pairs with records in at least one direction, each reported once
    /// as `(smaller, larger)`.
    pub fn language_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .directions
            .keys()
            .map(|d| {
                if d.from <= d.to {
                    (d.from.clone(), d.to.clone())
                } else {
                    (d.to.clone(), d.from.clone())
                }
            })
            .collect();
        pairs.sort();
        pairs.dedup();
        pairs
    }
}

/// Why a raw record was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Language,
    Malformed,
    Inflection,
    Technical,
    SelfOrEmpty,
}

/// Applies the classifier and the acceptance rules to raw records.
#[derive(Debug, Clone)]
pub struct TranslationIngestor {
    pivot: String,
    max_glosses_per_sense: usize,
    classifiers: HashMap<String, GlossClassifier>,
}

impl TranslationIngestor {
    pub fn new(languages: &[String], pivot: &str, max_glosses_per_sense: usize) -> Self {
        let classifiers = languages
            .iter()
            .map(|lang| (lang.clone(), GlossClassifier::for_language(lang)))
            .collect();
        TranslationIngestor {
            pivot: pivot.to_string(),
            max_glosses_per_sense,
            classifiers,
        }
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.classifiers.contains_key(lang)
    }

    /// Decides whether one raw record becomes a translation.
    ///
    /// The returned translation carries the lower-cased, trimmed gloss text;
    /// canonicalization happens later, during clustering.
    pub fn evaluate(&self, raw: &RawGloss) -> std::result::Result<Translation, Rejection> {
        self.check(raw, true)
    }

    /// Like [`evaluate`](Self::evaluate), for records whose gloss is a bare
    /// translation word rather than a definition. The gloss classifier is not
    /// applied to these.
    pub fn evaluate_word(&self, raw: &RawGloss) -> std::result::Result<Translation, Rejection> {
        self.check(raw, false)
    }

    fn check(&self, raw: &RawGloss, classify: bool) -> std::result::Result<Translation, Rejection> {
        if raw.source_lang == raw.target_lang {
            return Err(Rejection::Language);
        }
        let Some(classifier) = self.classifiers.get(&raw.source_lang) else {
            return Err(Rejection::Language);
        };
        if !self.supports(&raw.target_lang) {
            return Err(Rejection::Language);
        }

        let source_lemma = normalize_word(&raw.source_lemma);
        let gloss = normalize_word(&raw.gloss);
        if source_lemma.is_empty() || gloss.is_empty() {
            return Err(Rejection::Malformed);
        }

        if classify {
            match classifier.classify(&raw.gloss, &raw.categories) {
                Classification::Genuine => {}
                Classification::InflectionReference => return Err(Rejection::Inflection),
                Classification::Technical => return Err(Rejection::Technical),
            }
        }

        if gloss == source_lemma || canonicalize(&gloss).is_empty() {
            return Err(Rejection::SelfOrEmpty);
        }

        Ok(Translation {
            source_lemma,
            source_lang: raw.source_lang.clone(),
            gloss,
            target_lang: raw.target_lang.clone(),
        })
    }

    /// Evaluates `raw`, counts the outcome and stores accepted records.
    /// Returns `true` if the record was added to `table`.
    pub fn accept(&self, raw: &RawGloss, table: &mut DirectionTable, stats: &mut BuildStats) -> bool {
        Self::record(self.evaluate(raw), table, stats)
    }

    fn record(
        outcome: std::result::Result<Translation, Rejection>,
        table: &mut DirectionTable,
        stats: &mut BuildStats,
    ) -> bool {
        stats.raw_records += 1;
        match outcome {
            Ok(translation) => {
                if table.push(translation) {
                    stats.accepted_records += 1;
                    true
                } else {
                    stats.duplicate_records += 1;
                    false
                }
            }
            Err(rejection) => {
                match rejection {
                    Rejection::Language => stats.skipped_language += 1,
                    Rejection::Malformed => stats.malformed_records += 1,
                    Rejection::Inflection => stats.skipped_inflections += 1,
                    Rejection::Technical => stats.skipped_technical += 1,
                    Rejection::SelfOrEmpty => stats.skipped_self_or_empty += 1,
                }
                false
            }
        }
    }

    /// Reads a Wiktionary extraction dump written in `lang`.
    ///
    /// Pivot-language dumps contribute their `translations` lists; every other
    /// dump contributes its sense glosses, which are written in the pivot language.
    pub fn read_dump<R: BufRead>(
        &self,
        reader: R,
        lang: &str,
        table: &mut DirectionTable,
        stats: &mut BuildStats,
    ) -> Result<()> {
        let from_pivot = lang == self.pivot;
        data::for_each_line(reader, |line_num, line| {
            if line_num > 0 && line_num % LOG_EVERY_LINES == 0 {
                debug!("{}: {} lines read, {} records accepted so far", lang, line_num, stats.accepted_records);
            }
            if line.is_some_and(|l| l.trim().is_empty()) {
                return;
            }

            let Some(entry) = line.and_then(parse_dump_line) else {
                stats.raw_records += 1;
                stats.malformed_records += 1;
                return;
            };
            let word = normalize_word(&entry.word);
            if word.is_empty() {
                stats.raw_records += 1;
                stats.malformed_records += 1;
                return;
            }
            // Alphabet entries.
            if word.chars().count() == 1 {
                stats.raw_records += 1;
                stats.skipped_technical += 1;
                return;
            }

            if from_pivot {
                self.read_entry_translations(&entry, &word, table, stats);
            } else {
                self.read_entry_glosses(&entry, &word, lang, table, stats);
            }
        })
    }

    fn read_entry_translations(
        &self,
        entry: &DumpEntry,
        word: &str,
        table: &mut DirectionTable,
        stats: &mut BuildStats,
    ) {
        let mut added: HashMap<&str, usize> = HashMap::new();
        for item in &entry.translations {
            let Some(code) = item.language_code() else {
                continue;
            };
            if code == self.pivot || !self.supports(code) {
                continue;
            }
            if added.get(code).is_some_and(|&n| n >= self.max_glosses_per_sense) {
                continue;
            }
            let target = item.word.as_deref().unwrap_or_default();
            if normalize_word(target).chars().count() == 1 {
                stats.raw_records += 1;
                stats.skipped_technical += 1;
                continue;
            }
            let raw = RawGloss {
                source_lemma: word.to_string(),
                source_lang: self.pivot.clone(),
                gloss: target.to_string(),
                target_lang: code.to_string(),
                categories: Vec::new(),
            };
            if Self::record(self.evaluate_word(&raw), table, stats) {
                *added.entry(code).or_default() += 1;
            }
        }
    }

    fn read_entry_glosses(
        &self,
        entry: &DumpEntry,
        word: &str,
        lang: &str,
        table: &mut DirectionTable,
        stats: &mut BuildStats,
    ) {
        for sense in &entry.senses {
            let categories = sense.category_names();
            let mut added = 0;
            for gloss in sense.gloss_texts() {
                if added >= self.max_glosses_per_sense {
                    break;
                }
                let raw = RawGloss {
                    source_lemma: word.to_string(),
                    source_lang: lang.to_string(),
                    gloss: gloss.to_string(),
                    target_lang: self.pivot.clone(),
                    categories: categories.clone(),
                };
                if self.accept(&raw, table, stats) {
                    added += 1;
                }
            }
        }
    }

    /// Reads a pre-built pairwise store with a
    /// `translations(lemma_from, lang_from, translation, lang_to)` table.
    pub fn read_translation_store(
        &self,
        path: &Path,
        table: &mut DirectionTable,
        stats: &mut BuildStats,
    ) -> Result<()> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        if !table_exists(&conn, "translations")? {
            warn!("Skipping {:?}: no translations table", path);
            stats.missing_sources += 1;
            return Ok(());
        }

        let mut stmt =
            conn.prepare("SELECT lemma_from, lang_from, translation, lang_to FROM translations")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let accepted_before = stats.accepted_records;
        for row in rows {
            let (lemma_from, lang_from, translation, lang_to) = row?;
            let raw = RawGloss {
                source_lemma: lemma_from.unwrap_or_default(),
                source_lang: lang_from.unwrap_or_default().trim().to_string(),
                gloss: translation.unwrap_or_default(),
                target_lang: lang_to.unwrap_or_default().trim().to_string(),
                categories: Vec::new(),
            };
            self.accept(&raw, table, stats);
        }
        debug!(
            "{:?}: {} records accepted",
            path,
            stats.accepted_records - accepted_before
        );
        Ok(())
    }

    /// Ingests every dump and translation store found under `base_dir`.
    pub fn ingest_all(
        &self,
        base_dir: &Path,
        languages: &[String],
        stats: &mut BuildStats,
    ) -> Result<DirectionTable> {
        info!("Ingesting translations...");
        let mut table = DirectionTable::new();

        for lang in languages {
            match data::find_dump(base_dir, lang) {
                Some(path) => {
                    info!("Reading dump {:?}", path);
                    let reader = data::open_text(&path)?;
                    self.read_dump(reader, lang, &mut table, stats)?;
                }
                None => debug!("No dump for {}", lang),
            }
        }

        let stores = data::find_translation_stores(base_dir)?;
        for path in &stores {
            info!("Reading translation store {:?}", path);
            self.read_translation_store(path, &mut table, stats)?;
        }

        for (direction, records) in table.iter() {
            info!("{}: {} translations", direction, records.len());
        }
        info!(
            "Accepted {} of {} raw records ({} skipped)",
            stats.accepted_records,
            stats.raw_records,
            stats.total_skipped()
        );
        Ok(table)
    }
}
