//! Lexicon loading: tagger output `(form, lemma, pos)` into a language-scoped lemma registry.

use crate::data::{self, LexiconSource};
use crate::error::Result;
use crate::models::{Form, Lemma, LemmaId, LemmaKey, LexiconRecord, UNKNOWN_POS};
use crate::parse::{LexiconLine, normalize_word, parse_lexicon_line};
use crate::stats::BuildStats;
use log::{debug, info, warn};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Every lemma known to a build. Identifiers start at 1, grow monotonically
/// and are never reused.
#[derive(Debug, Default, Clone)]
pub struct LemmaRegistry {
    lemmas: Vec<Lemma>,
    index: HashMap<LemmaKey, LemmaId>,
}

impl LemmaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lemmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
    }

    pub fn get(&self, key: &LemmaKey) -> Option<LemmaId> {
        self.index.get(key).copied()
    }

    pub fn lemma(&self, id: LemmaId) -> Option<&Lemma> {
        usize::try_from(id - 1).ok().and_then(|idx| self.lemmas.get(idx))
    }

    /// Returns the id for `key`, allocating one if the key is new.
    /// The boolean is `true` when a lemma was created.
    pub fn intern(&mut self, key: LemmaKey) -> (LemmaId, bool) {
        if let Some(&id) = self.index.get(&key) {
            return (id, false);
        }
        let id = self.lemmas.len() as LemmaId + 1;
        self.index.insert(key.clone(), id);
        self.lemmas.push(Lemma {
            id,
            key,
            freq_rank: None,
        });
        (id, true)
    }

    /// Lemmas in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Lemma> {
        self.lemmas.iter()
    }

    /// Builds the `(lang, lemma) -> pos` lookup used by the clusterer.
    /// When a lemma carries several tags, the one registered first wins.
    pub fn pos_cache(&self) -> PosCache {
        let mut cache = PosCache::default();
        for lemma in &self.lemmas {
            cache.insert_if_absent(&lemma.key.lang, &lemma.key.lemma, &lemma.key.pos);
        }
        cache
    }
}

/// `(lang, lemma) -> pos` with first-write-wins semantics.
#[derive(Debug, Default, Clone)]
pub struct PosCache {
    by_lang: HashMap<String, HashMap<String, String>>,
}

impl PosCache {
    /// Stores `pos` unless the key already has a value. Returns `true` if stored.
    pub fn insert_if_absent(&mut self, lang: &str, lemma: &str, pos: &str) -> bool {
        let lemmas = self.by_lang.entry(lang.to_string()).or_default();
        if lemmas.contains_key(lemma) {
            return false;
        }
        lemmas.insert(lemma.to_string(), pos.to_string());
        true
    }

    pub fn get(&self, lang: &str, lemma: &str) -> Option<&str> {
        self.by_lang.get(lang)?.get(lemma).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_lang.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Forms and lemmas from all configured languages.
#[derive(Debug, Default, Clone)]
pub struct Lexicon {
    pub registry: LemmaRegistry,
    pub forms: Vec<Form>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one tagger record. Absent pos is stored as [`UNKNOWN_POS`].
    pub fn add_record(&mut self, lang: &str, record: LexiconRecord) {
        let pos = record.pos.unwrap_or_else(|| UNKNOWN_POS.to_string());
        let (lemma_id, _) = self
            .registry
            .intern(LemmaKey::new(lang, record.lemma, pos));
        self.forms.push(Form {
            lang: lang.to_string(),
            form: record.form,
            lemma_id,
        });
    }

    /// Loads the lexicon of every language found under `base_dir`.
    /// Languages without a lexicon are skipped.
    pub fn load_all(base_dir: &Path, languages: &[String], stats: &mut BuildStats) -> Result<Self> {
        info!("Extracting forms and lemmas from lexicon sources...");
        let mut lexicon = Lexicon::new();

        for lang in languages {
            let Some(source) = data::find_lexicon(base_dir, lang) else {
                warn!("Skipping lexicon for {}: no lemmas.db or lemmas.tsv found", lang);
                stats.missing_sources += 1;
                continue;
            };

            let forms_before = lexicon.forms.len();
            let lemmas_before = lexicon.registry.len();
            match &source {
                LexiconSource::Sqlite(path) => lexicon.load_sqlite(path, lang, stats)?,
                LexiconSource::Tsv(path) => {
                    let reader = data::open_text(path)?;
                    lexicon.load_lines(reader, lang, stats)?;
                }
            }
            info!(
                "{}: {} forms, {} new lemmas",
                lang,
                lexicon.forms.len() - forms_before,
                lexicon.registry.len() - lemmas_before
            );
        }

        info!(
            "Lexicon total: {} forms, {} unique lemmas",
            lexicon.forms.len(),
            lexicon.registry.len()
        );
        Ok(lexicon)
    }

    /// Reads `form<TAB>lemma[<TAB>pos]` lines.
    pub fn load_lines<R: BufRead>(&mut self, reader: R, lang: &str, stats: &mut BuildStats) -> Result<()> {
        data::for_each_line(reader, |_, line| {
            let parsed = match line {
                Some(line) => parse_lexicon_line(line),
                None => LexiconLine::Malformed,
            };
            match parsed {
                LexiconLine::Record(record) => {
                    stats.lexicon_records += 1;
                    self.add_record(lang, record);
                }
                LexiconLine::Skip => {}
                LexiconLine::Malformed => {
                    stats.lexicon_records += 1;
                    stats.lexicon_malformed += 1;
                }
            }
        })
    }

    /// Reads the tagger's `lemmas(word, lemma, pos)` table.
    pub fn load_sqlite(&mut self, path: &Path, lang: &str, stats: &mut BuildStats) -> Result<()> {
        debug!("Reading lexicon store {:?}", path);
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        if !table_exists(&conn, "lemmas")? {
            warn!("Skipping {:?}: no lemmas table", path);
            stats.missing_sources += 1;
            return Ok(());
        }

        let mut stmt = conn.prepare("SELECT word, lemma, pos FROM lemmas")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        for row in rows {
            let (word, lemma, pos) = row?;
            stats.lexicon_records += 1;
            let form = word.as_deref().map(normalize_word).unwrap_or_default();
            let lemma = lemma.as_deref().map(normalize_word).unwrap_or_default();
            if form.is_empty() || lemma.is_empty() {
                stats.lexicon_malformed += 1;
                continue;
            }
            let pos = pos
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty());
            self.add_record(lang, LexiconRecord { form, lemma, pos });
        }
        Ok(())
    }
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record(form: &str, lemma: &str, pos: Option<&str>) -> LexiconRecord {
        LexiconRecord {
            form: form.to_string(),
            lemma: lemma.to_string(),
            pos: pos.map(str::to_string),
        }
    }

    #[test]
    fn test_intern_is_stable_and_monotonic() {
        let mut registry = LemmaRegistry::new();
        let (a, created_a) = registry.intern(LemmaKey::new("es", "perro", "NOUN"));
        let (b, created_b) = registry.intern(LemmaKey::new("es", "gato", "NOUN"));
        let (a2, created_a2) = registry.intern(LemmaKey::new("es", "perro", "NOUN"));
        assert_eq!((a, b, a2), (1, 2, 1));
        assert!(created_a && created_b && !created_a2);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lemma(2).unwrap().key.lemma, "gato");
        assert!(registry.lemma(0).is_none());
        assert!(registry.lemma(3).is_none());
    }

    #[test]
    fn test_absent_pos_becomes_unknown() {
        let mut lexicon = Lexicon::new();
        lexicon.add_record("es", record("casas", "casa", None));
        let lemma = lexicon.registry.lemma(1).unwrap();
        assert_eq!(lemma.key.pos, UNKNOWN_POS);
        assert_eq!(lexicon.forms[0].lemma_id, 1);
    }

    #[test]
    fn test_inflections_share_a_lemma() {
        let mut lexicon = Lexicon::new();
        lexicon.add_record("es", record("corro", "correr", Some("VERB")));
        lexicon.add_record("es", record("corriendo", "correr", Some("VERB")));
        lexicon.add_record("es", record("corre", "correr", Some("NOUN")));
        assert_eq!(lexicon.registry.len(), 2);
        assert_eq!(lexicon.forms.len(), 3);
        assert_eq!(lexicon.forms[0].lemma_id, lexicon.forms[1].lemma_id);
        assert_ne!(lexicon.forms[0].lemma_id, lexicon.forms[2].lemma_id);
    }

    #[test]
    fn test_pos_cache_first_seen_wins() {
        let mut registry = LemmaRegistry::new();
        registry.intern(LemmaKey::new("es", "corre", "VERB"));
        registry.intern(LemmaKey::new("es", "corre", "NOUN"));
        registry.intern(LemmaKey::new("fr", "corre", "ADJ"));
        let cache = registry.pos_cache();
        assert_eq!(cache.get("es", "corre"), Some("VERB"));
        assert_eq!(cache.get("fr", "corre"), Some("ADJ"));
        assert_eq!(cache.get("de", "corre"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_insert_if_absent_never_overwrites() {
        let mut cache = PosCache::default();
        assert!(cache.insert_if_absent("es", "ser", "AUX"));
        assert!(!cache.insert_if_absent("es", "ser", "VERB"));
        assert_eq!(cache.get("es", "ser"), Some("AUX"));
    }

    #[test]
    fn test_load_lines_counts_malformed() {
        let mut lexicon = Lexicon::new();
        let mut stats = BuildStats::new();
        let input = "# es lexicon\ncasas\tcasa\tNOUN\nbroken\n\nfue\tser\n";
        lexicon
            .load_lines(input.as_bytes(), "es", &mut stats)
            .unwrap();
        assert_eq!(stats.lexicon_records, 3);
        assert_eq!(stats.lexicon_malformed, 1);
        assert_eq!(lexicon.forms.len(), 2);
        assert!(lexicon.registry.get(&LemmaKey::new("es", "ser", UNKNOWN_POS)).is_some());
    }

    #[test]
    fn test_load_lines_survives_invalid_utf8() {
        let mut lexicon = Lexicon::new();
        let mut stats = BuildStats::new();
        let input: &[u8] = b"casas\tcasa\tNOUN\ncaf\xe9s\tcaf\xe9\tNOUN\nfue\tser\tAUX\n";
        lexicon.load_lines(input, "es", &mut stats).unwrap();
        assert_eq!(stats.lexicon_records, 3);
        assert_eq!(stats.lexicon_malformed, 1);
        assert_eq!(lexicon.forms.len(), 2);
        assert!(lexicon.registry.get(&LemmaKey::new("es", "ser", "AUX")).is_some());
    }

    #[test]
    fn test_load_sqlite_lexicon() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("lemmas.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE lemmas (id INTEGER PRIMARY KEY AUTOINCREMENT, word TEXT NOT NULL UNIQUE, lemma TEXT NOT NULL, pos TEXT);
             INSERT INTO lemmas (word, lemma, pos) VALUES ('Perros', 'perro', 'NOUN');
             INSERT INTO lemmas (word, lemma, pos) VALUES ('fue', 'ser', NULL);
             INSERT INTO lemmas (word, lemma, pos) VALUES ('era', 'ser', '');
             INSERT INTO lemmas (word, lemma, pos) VALUES ('vacío', '  ', 'NOUN');",
        )
        .unwrap();
        drop(conn);

        let mut lexicon = Lexicon::new();
        let mut stats = BuildStats::new();
        lexicon.load_sqlite(&path, "es", &mut stats).unwrap();
        assert_eq!(stats.lexicon_records, 4);
        assert_eq!(stats.lexicon_malformed, 1);
        assert_eq!(lexicon.forms.len(), 3);
        assert_eq!(lexicon.registry.len(), 2);
        assert_eq!(lexicon.forms[0].form, "perros");
        assert!(lexicon.registry.get(&LemmaKey::new("es", "ser", UNKNOWN_POS)).is_some());
    }

    #[test]
    fn test_load_all_skips_missing_languages() {
        let temp_dir = tempdir().unwrap();
        let base = temp_dir.path();
        let es = base.join("langpacks").join("es");
        fs::create_dir_all(&es).unwrap();
        fs::write(es.join("lemmas.tsv"), "casas\tcasa\tNOUN\n").unwrap();

        let mut stats = BuildStats::new();
        let languages = vec!["es".to_string(), "fr".to_string()];
        let lexicon = Lexicon::load_all(base, &languages, &mut stats).unwrap();
        assert_eq!(stats.missing_sources, 1);
        assert_eq!(lexicon.registry.len(), 1);
    }
}
