//! Line-level parsers for the text input formats.
//!
//! - Wiktionary extraction dumps (one JSON object per line, Kaikki layout).
//! - Tab-separated lexicon files produced by the tagger: `form<TAB>lemma[<TAB>pos]`.

use crate::models::LexiconRecord;
use serde::Deserialize;

// --- Wiktionary dump entries ---

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DumpEntry {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub senses: Vec<DumpSense>,
    #[serde(default)]
    pub translations: Vec<DumpTranslation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DumpSense {
    #[serde(default)]
    pub glosses: Vec<serde_json::Value>,
    #[serde(default)]
    pub categories: Vec<DumpCategory>,
}

impl DumpSense {
    /// Non-string gloss values are ignored.
    pub fn gloss_texts(&self) -> impl Iterator<Item = &str> {
        self.glosses.iter().filter_map(|g| g.as_str())
    }

    pub fn category_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .filter_map(DumpCategory::name)
            .map(str::to_string)
            .collect()
    }
}

/// Categories appear either as bare strings or as objects.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DumpCategory {
    Name(String),
    Tagged {
        #[serde(default)]
        orig: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    Other(serde_json::Value),
}

impl DumpCategory {
    pub fn name(&self) -> Option<&str> {
        match self {
            DumpCategory::Name(name) => Some(name),
            DumpCategory::Tagged { orig, name } => orig.as_deref().or(name.as_deref()),
            DumpCategory::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DumpTranslation {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub lang_code: Option<String>,
    #[serde(default)]
    pub word: Option<String>,
}

impl DumpTranslation {
    /// Older dumps use `code`, newer ones `lang_code`.
    pub fn language_code(&self) -> Option<&str> {
        self.lang_code.as_deref().or(self.code.as_deref())
    }
}

/// Parses one dump line. Returns `None` for lines that are not a JSON object.
pub fn parse_dump_line(line: &str) -> Option<DumpEntry> {
    serde_json::from_str(line).ok()
}

// --- Lexicon lines ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexiconLine {
    Record(LexiconRecord),
    /// Blank line or `#` comment.
    Skip,
    Malformed,
}

/// Parses a `form<TAB>lemma[<TAB>pos]` line. Values are trimmed and lower-cased;
/// an empty pos column counts as absent.
pub fn parse_lexicon_line(line: &str) -> LexiconLine {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return LexiconLine::Skip;
    }

    let mut columns = line.split('\t');
    let form = columns.next().map(normalize_word).unwrap_or_default();
    let lemma = columns.next().map(normalize_word).unwrap_or_default();
    let pos = columns
        .next()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    if form.is_empty() || lemma.is_empty() {
        return LexiconLine::Malformed;
    }
    LexiconLine::Record(LexiconRecord { form, lemma, pos })
}

pub(crate) fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPANISH_ENTRY: &str = r#"{"word": "Perro", "pos": "noun", "senses": [{"glosses": ["dog"], "categories": [{"name": "Mammals", "kind": "topical", "orig": "es:Mammals"}, "Spanish nouns", 42]}, {"glosses": [17, "hound"]}]}"#;

    #[test]
    fn test_parse_gloss_entry() {
        let entry = parse_dump_line(SPANISH_ENTRY).unwrap();
        assert_eq!(entry.word, "Perro");
        assert_eq!(entry.senses.len(), 2);
        assert_eq!(entry.senses[0].gloss_texts().collect::<Vec<_>>(), vec!["dog"]);
        assert_eq!(
            entry.senses[0].category_names(),
            vec!["es:Mammals".to_string(), "Spanish nouns".to_string()]
        );
        assert_eq!(entry.senses[1].gloss_texts().collect::<Vec<_>>(), vec!["hound"]);
        assert!(entry.translations.is_empty());
    }

    #[test]
    fn test_parse_translation_entry() {
        let line = r#"{"word": "dog", "translations": [{"code": "es", "word": "perro"}, {"lang_code": "fr", "word": "chien"}, {"lang": "German"}]}"#;
        let entry = parse_dump_line(line).unwrap();
        assert_eq!(entry.translations.len(), 3);
        assert_eq!(entry.translations[0].language_code(), Some("es"));
        assert_eq!(entry.translations[1].language_code(), Some("fr"));
        assert_eq!(entry.translations[1].word.as_deref(), Some("chien"));
        assert_eq!(entry.translations[2].language_code(), None);
    }

    #[test]
    fn test_category_name_falls_back_to_name() {
        let line = r#"{"word": "x", "senses": [{"glosses": ["y"], "categories": [{"name": "Latin letter names"}]}]}"#;
        let entry = parse_dump_line(line).unwrap();
        assert_eq!(entry.senses[0].category_names(), vec!["Latin letter names".to_string()]);
    }

    #[test]
    fn test_parse_dump_line_rejects_garbage() {
        assert!(parse_dump_line("not json").is_none());
        assert!(parse_dump_line("[1, 2]").is_none());
        assert!(parse_dump_line("").is_none());
    }

    #[test]
    fn test_parse_lexicon_line() {
        assert_eq!(
            parse_lexicon_line("Corriendo\tcorrer\tVERB"),
            LexiconLine::Record(LexiconRecord {
                form: "corriendo".to_string(),
                lemma: "correr".to_string(),
                pos: Some("VERB".to_string()),
            })
        );
        assert_eq!(
            parse_lexicon_line("casas\tcasa"),
            LexiconLine::Record(LexiconRecord {
                form: "casas".to_string(),
                lemma: "casa".to_string(),
                pos: None,
            })
        );
        assert_eq!(
            parse_lexicon_line("casas\tcasa\t "),
            LexiconLine::Record(LexiconRecord {
                form: "casas".to_string(),
                lemma: "casa".to_string(),
                pos: None,
            })
        );
        assert_eq!(parse_lexicon_line("# comment"), LexiconLine::Skip);
        assert_eq!(parse_lexicon_line("   "), LexiconLine::Skip);
        assert_eq!(parse_lexicon_line("lonely"), LexiconLine::Malformed);
        assert_eq!(parse_lexicon_line("\tcasa\tNOUN"), LexiconLine::Malformed);
    }
}
