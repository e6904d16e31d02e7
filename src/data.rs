//! Input discovery and file access.
//!
//! Inputs live under a base directory:
//! - `langpacks/<lang>/lemmas.db` or `langpacks/<lang>/lemmas.tsv`
//! - `dumps/kaikki-<lang>.jsonl.gz` or `dumps/kaikki-<lang>.jsonl`
//! - `translations/*.db`
//!
//! Acquiring these files is somebody else's job; this module only finds and opens them.

use crate::error::{ConceptError, Result};
use directories_next::ProjectDirs;
use flate2::read::GzDecoder;
use log::debug;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Subdirectory name within user's data directory
pub const DATA_SUBDIR: &str = "concepts-rs";
/// File name of the consolidated store.
pub const STORE_FILENAME: &str = "concepts.db";

const LANGPACKS_DIR: &str = "langpacks";
const DUMPS_DIR: &str = "dumps";
const TRANSLATIONS_DIR: &str = "translations";

/// Gets the project's data directory path.
/// Creates the directory if it doesn't exist.
pub fn default_base_dir() -> Result<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("org", "ConceptsRs", DATA_SUBDIR).ok_or(ConceptError::DataDirNotFound)?;
    let data_dir = proj_dirs.data_dir().to_path_buf();
    fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}

/// Where a language's lexicon comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexiconSource {
    Sqlite(PathBuf),
    Tsv(PathBuf),
}

/// Finds the lexicon for `lang`. The SQLite file wins when both exist.
pub fn find_lexicon(base_dir: &Path, lang: &str) -> Option<LexiconSource> {
    let dir = base_dir.join(LANGPACKS_DIR).join(lang);
    let db = dir.join("lemmas.db");
    if db.is_file() {
        return Some(LexiconSource::Sqlite(db));
    }
    let tsv = dir.join("lemmas.tsv");
    if tsv.is_file() {
        return Some(LexiconSource::Tsv(tsv));
    }
    None
}

/// Finds the Wiktionary dump for `lang`, preferring the compressed file.
pub fn find_dump(base_dir: &Path, lang: &str) -> Option<PathBuf> {
    let dir = base_dir.join(DUMPS_DIR);
    [
        dir.join(format!("kaikki-{}.jsonl.gz", lang)),
        dir.join(format!("kaikki-{}.jsonl", lang)),
    ]
    .into_iter()
    .find(|p| p.is_file())
}

/// Lists pre-built pairwise translation stores, sorted by path.
pub fn find_translation_stores(base_dir: &Path) -> Result<Vec<PathBuf>> {
    let dir = base_dir.join(TRANSLATIONS_DIR);
    if !dir.is_dir() {
        debug!("No translation store directory at {:?}", dir);
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "db"))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Opens a text file for line reading, decompressing `.gz` files on the fly.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        debug!("Opening {:?} as gzip stream", path);
        Ok(Box::new(BufReader::new(GzDecoder::new(BufReader::new(file)))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Calls `f` with each line of `reader` and its zero-based line number, without
/// the line terminator. A line that is not valid UTF-8 is passed as `None`; only
/// read failures end the loop with an error.
pub fn for_each_line<R, F>(mut reader: R, mut f: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(usize, Option<&str>),
{
    let mut buf = Vec::new();
    let mut line_num = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = std::str::from_utf8(&buf)
            .ok()
            .map(|text| text.trim_end_matches(['\n', '\r']));
        f(line_num, line);
        line_num += 1;
    }
    Ok(())
}
