use crate::cluster::ConceptGraph;
use crate::error::{ConceptError, Result};
use crate::lexicon::LemmaRegistry;
use crate::models::Form;
use crate::progress::{ProgressCallback, ProgressUpdate, report};
use log::{debug, info, warn};
use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, Transaction, params};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// --- Schema Definition ---

pub const SCHEMA_VERSION: u32 = 1;

/// Rows per progress report.
const BATCH_SIZE: usize = 10_000;

const CREATE_METADATA_TABLE: &str = "
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);";

const CREATE_LEMMAS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS lemmas (
    id INTEGER PRIMARY KEY,
    lang TEXT NOT NULL,
    lemma TEXT NOT NULL,
    pos TEXT NOT NULL,
    freq_rank INTEGER,
    UNIQUE (lang, lemma, pos)
);";

const CREATE_FORMS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS forms (
    lang TEXT NOT NULL,
    form TEXT NOT NULL,
    lemma_id INTEGER NOT NULL,
    feats TEXT,
    PRIMARY KEY (lang, form, lemma_id),
    FOREIGN KEY (lemma_id) REFERENCES lemmas(id)
);";

const CREATE_CONCEPTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS concepts (
    id INTEGER PRIMARY KEY,
    pos TEXT NOT NULL,
    gloss TEXT NOT NULL, -- the pivot lemma that seeded the concept
    UNIQUE (gloss, pos)
);";

const CREATE_SENSES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS senses (
    lemma_id INTEGER NOT NULL,
    concept_id INTEGER NOT NULL,
    rank INTEGER NOT NULL, -- 1 = preferred
    PRIMARY KEY (lemma_id, concept_id),
    FOREIGN KEY (lemma_id) REFERENCES lemmas(id),
    FOREIGN KEY (concept_id) REFERENCES concepts(id)
);";

// Written by the consuming application, never by the build.
const CREATE_USER_OVERRIDES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS user_overrides (
    user_id TEXT NOT NULL,
    lang TEXT NOT NULL,
    lemma_id INTEGER NOT NULL,
    concept_id INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, lang, lemma_id),
    FOREIGN KEY (lemma_id) REFERENCES lemmas(id),
    FOREIGN KEY (concept_id) REFERENCES concepts(id)
);";

// --- Indices ---

const CREATE_FORMS_LOOKUP_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_forms_lookup ON forms (lang, form);";
const CREATE_LEMMAS_LOOKUP_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_lemmas_lookup ON lemmas (lang, lemma);";
const CREATE_SENSES_LEMMA_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_senses_lemma ON senses (lemma_id, rank);";
const CREATE_SENSES_CONCEPT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_senses_concept ON senses (concept_id);";

/// Names of the secondary indices every store carries.
pub const INDEX_NAMES: [&str; 4] = [
    "idx_forms_lookup",
    "idx_lemmas_lookup",
    "idx_senses_lemma",
    "idx_senses_concept",
];

const COUNTED_TABLES: [&str; 5] = ["forms", "lemmas", "concepts", "senses", "user_overrides"];

/// Build parameters recorded in the `metadata` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMetadata {
    pub pivot_language: String,
    pub languages: Vec<String>,
}

// --- Initialization Function ---

/// Creates all tables on an empty database.
pub fn initialize_database(conn: &mut Connection) -> Result<()> {
    info!("Initializing database schema (version {})...", SCHEMA_VERSION);
    let tx = conn.transaction()?;
    tx.execute(CREATE_METADATA_TABLE, [])?;
    tx.execute(CREATE_LEMMAS_TABLE, [])?;
    tx.execute(CREATE_FORMS_TABLE, [])?;
    tx.execute(CREATE_CONCEPTS_TABLE, [])?;
    tx.execute(CREATE_SENSES_TABLE, [])?;
    tx.execute(CREATE_USER_OVERRIDES_TABLE, [])?;
    tx.commit()?;
    Ok(())
}

/// Creates the lookup indices. Run after the bulk load.
pub fn create_indexes(conn: &Connection) -> Result<()> {
    debug!("Creating lookup indices...");
    conn.execute(CREATE_FORMS_LOOKUP_INDEX, [])?;
    conn.execute(CREATE_LEMMAS_LOOKUP_INDEX, [])?;
    conn.execute(CREATE_SENSES_LEMMA_INDEX, [])?;
    conn.execute(CREATE_SENSES_CONCEPT_INDEX, [])?;
    Ok(())
}

/// Converts a constraint violation into [`ConceptError::Integrity`].
fn integrity_error(err: rusqlite::Error, detail: impl FnOnce() -> String) -> ConceptError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            ConceptError::Integrity(detail())
        }
        _ => ConceptError::Database(err),
    }
}

// --- Data Population Function ---

/// Bulk-loads lemmas, concepts, forms and senses into an initialized database.
///
/// Lemma and concept keys must be unique; a duplicate fails the whole load.
/// Duplicate forms and senses are ignored.
pub fn populate_database(
    conn: &mut Connection,
    registry: &LemmaRegistry,
    forms: &[Form],
    graph: &ConceptGraph,
    metadata: &StoreMetadata,
    progress: &mut Option<ProgressCallback>,
) -> Result<()> {
    info!(
        "Populating database: {} lemmas, {} concepts, {} forms, {} senses",
        registry.len(),
        graph.concepts.len(),
        forms.len(),
        graph.senses.len()
    );
    let start_time = Instant::now();
    let tx = conn.transaction()?;

    insert_lemmas(&tx, registry, progress)?;
    insert_concepts(&tx, graph, progress)?;
    insert_forms(&tx, forms, progress)?;
    insert_senses(&tx, graph, progress)?;
    insert_metadata(&tx, metadata)?;

    tx.commit()?;
    info!("Database population finished in {:?}", start_time.elapsed());
    Ok(())
}

/// Reports the start of a stage, then one update per full batch and a final one.
struct BatchReporter {
    stage: ProgressUpdate,
    total: u64,
}

impl BatchReporter {
    fn start(description: &str, total: usize, progress: &mut Option<ProgressCallback>) -> Self {
        let stage = ProgressUpdate::new_stage(description, Some(total as u64));
        report(progress, stage.clone());
        BatchReporter {
            stage,
            total: total as u64,
        }
    }

    fn row_done(&self, done: usize, progress: &mut Option<ProgressCallback>) {
        if done % BATCH_SIZE == 0 {
            debug!("{}: {}/{}", self.stage.stage_description, done, self.total);
            report(progress, self.stage.at(done as u64));
        }
    }

    fn finish(&self, inserted: usize, progress: &mut Option<ProgressCallback>) {
        report(
            progress,
            self.stage
                .at(self.total)
                .with_message(format!("{} rows inserted", inserted)),
        );
    }
}

fn insert_lemmas(
    tx: &Transaction,
    registry: &LemmaRegistry,
    progress: &mut Option<ProgressCallback>,
) -> Result<()> {
    let reporter = BatchReporter::start("Writing lemmas", registry.len(), progress);
    let mut stmt =
        tx.prepare("INSERT INTO lemmas (id, lang, lemma, pos, freq_rank) VALUES (?1, ?2, ?3, ?4, ?5)")?;
    let mut done = 0;
    for lemma in registry.iter() {
        stmt.execute(params![
            lemma.id,
            lemma.key.lang,
            lemma.key.lemma,
            lemma.key.pos,
            lemma.freq_rank,
        ])
        .map_err(|e| integrity_error(e, || format!("duplicate lemma {} (id {})", lemma.key, lemma.id)))?;
        done += 1;
        reporter.row_done(done, progress);
    }
    reporter.finish(done, progress);
    Ok(())
}

fn insert_concepts(
    tx: &Transaction,
    graph: &ConceptGraph,
    progress: &mut Option<ProgressCallback>,
) -> Result<()> {
    let reporter = BatchReporter::start("Writing concepts", graph.concepts.len(), progress);
    let mut stmt = tx.prepare("INSERT INTO concepts (id, pos, gloss) VALUES (?1, ?2, ?3)")?;
    let mut done = 0;
    for concept in &graph.concepts {
        stmt.execute(params![concept.id, concept.pos, concept.gloss])
            .map_err(|e| {
                integrity_error(e, || {
                    format!("duplicate concept {}/{} (id {})", concept.gloss, concept.pos, concept.id)
                })
            })?;
        done += 1;
        reporter.row_done(done, progress);
    }
    reporter.finish(done, progress);
    Ok(())
}

fn insert_forms(tx: &Transaction, forms: &[Form], progress: &mut Option<ProgressCallback>) -> Result<()> {
    let reporter = BatchReporter::start("Writing forms", forms.len(), progress);
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO forms (lang, form, lemma_id, feats) VALUES (?1, ?2, ?3, NULL)",
    )?;
    let mut inserted = 0;
    for (idx, form) in forms.iter().enumerate() {
        inserted += stmt.execute(params![form.lang, form.form, form.lemma_id])?;
        reporter.row_done(idx + 1, progress);
    }
    if inserted < forms.len() {
        debug!("Ignored {} duplicate forms", forms.len() - inserted);
    }
    reporter.finish(inserted, progress);
    Ok(())
}

fn insert_senses(
    tx: &Transaction,
    graph: &ConceptGraph,
    progress: &mut Option<ProgressCallback>,
) -> Result<()> {
    let reporter = BatchReporter::start("Writing senses", graph.senses.len(), progress);
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO senses (lemma_id, concept_id, rank) VALUES (?1, ?2, ?3)",
    )?;
    let mut inserted = 0;
    for (idx, sense) in graph.senses.iter().enumerate() {
        inserted += stmt.execute(params![sense.lemma_id, sense.concept_id, sense.rank])?;
        reporter.row_done(idx + 1, progress);
    }
    if inserted < graph.senses.len() {
        debug!("Ignored {} duplicate senses", graph.senses.len() - inserted);
    }
    reporter.finish(inserted, progress);
    Ok(())
}

fn insert_metadata(tx: &Transaction, metadata: &StoreMetadata) -> Result<()> {
    let built_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let mut stmt = tx.prepare("INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)")?;
    stmt.execute(params!["schema_version", SCHEMA_VERSION.to_string()])?;
    stmt.execute(params!["pivot_language", metadata.pivot_language])?;
    stmt.execute(params!["languages", metadata.languages.join(",")])?;
    stmt.execute(params!["built_at", built_at.to_string()])?;
    Ok(())
}

// --- Store replacement ---

/// Path of a SQLite sidecar file, e.g. `concepts.db-wal`.
pub fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_sidecars(path: &Path) {
    for suffix in ["-wal", "-shm", "-journal"] {
        let sidecar = sidecar_path(path, suffix);
        if sidecar.exists() {
            debug!("Removing stale {:?}", sidecar);
            if let Err(e) = fs::remove_file(&sidecar) {
                warn!("Failed to remove {:?}: {}", sidecar, e);
            }
        }
    }
}

/// Writes a complete store to `path`, replacing whatever was there.
///
/// The store is built in a temporary file next to `path` and renamed over it
/// only after every row is committed, so a failed build leaves any previous
/// store untouched.
pub fn write_store(
    path: &Path,
    registry: &LemmaRegistry,
    forms: &[Form],
    graph: &ConceptGraph,
    metadata: &StoreMetadata,
    mut progress: Option<ProgressCallback>,
) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let staged = tempfile::Builder::new()
        .prefix(".concepts-")
        .suffix(".db.tmp")
        .tempfile_in(&parent)?;
    debug!("Staging store at {:?}", staged.path());

    {
        let mut conn = Connection::open(staged.path())?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "MEMORY", |row| row.get(0))?;
        debug!("Staging journal mode: {}", mode);
        conn.pragma_update(None, "synchronous", "OFF")?;

        initialize_database(&mut conn)?;
        populate_database(&mut conn, registry, forms, graph, metadata, &mut progress)?;
        create_indexes(&conn)?;
        conn.close().map_err(|(_, e)| ConceptError::Database(e))?;
    }

    if path.exists() {
        info!("Replacing existing store at {:?}", path);
    }
    remove_sidecars(path);
    staged.persist(path).map_err(|e| ConceptError::Io(e.error))?;
    info!("Store written to {:?}", path);
    Ok(())
}

// --- Summary ---

/// Row counts and build metadata of a finished store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub path: PathBuf,
    pub file_size: u64,
    pub forms: u64,
    pub lemmas: u64,
    pub concepts: u64,
    pub senses: u64,
    pub user_overrides: u64,
    /// `(lang, lemma count)`, sorted by language.
    pub lemmas_per_language: Vec<(String, u64)>,
    pub schema_version: Option<u32>,
    pub pivot_language: Option<String>,
    pub languages: Vec<String>,
    pub built_at: Option<u64>,
}

fn metadata_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| row.get(0))
        .optional()?)
}

/// Reads the summary of the store at `path`.
pub fn read_summary(path: &Path) -> Result<StoreSummary> {
    if !path.is_file() {
        return Err(ConceptError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no store at {}", path.display()),
        )));
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let mut counts = [0u64; COUNTED_TABLES.len()];
    for (count, table) in counts.iter_mut().zip(COUNTED_TABLES) {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        *count = n as u64;
    }
    let [forms, lemmas, concepts, senses, user_overrides] = counts;

    let mut stmt = conn.prepare("SELECT lang, COUNT(*) FROM lemmas GROUP BY lang ORDER BY lang")?;
    let lemmas_per_language = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let schema_version = metadata_value(&conn, "schema_version")?.and_then(|v| v.parse().ok());
    let pivot_language = metadata_value(&conn, "pivot_language")?;
    let languages = metadata_value(&conn, "languages")?
        .map(|v| {
            v.split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let built_at = metadata_value(&conn, "built_at")?.and_then(|v| v.parse().ok());

    Ok(StoreSummary {
        path: path.to_path_buf(),
        file_size: fs::metadata(path)?.len(),
        forms,
        lemmas,
        concepts,
        senses,
        user_overrides,
        lemmas_per_language,
        schema_version,
        pivot_language,
        languages,
        built_at,
    })
}
