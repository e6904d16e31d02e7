use std::fmt;

/// Part-of-speech tag used when the tagger left a form untagged.
pub const UNKNOWN_POS: &str = "UNKNOWN";

/// Identifier of a row in the `lemmas` table.
pub type LemmaId = i64;
/// Identifier of a row in the `concepts` table.
pub type ConceptId = i64;

// --- Lexicon ---

/// Identity of a lemma: `(language, base string, part of speech)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LemmaKey {
    pub lang: String,
    pub lemma: String,
    pub pos: String,
}

impl LemmaKey {
    pub fn new(lang: impl Into<String>, lemma: impl Into<String>, pos: impl Into<String>) -> Self {
        LemmaKey {
            lang: lang.into(),
            lemma: lemma.into(),
            pos: pos.into(),
        }
    }
}

impl fmt::Display for LemmaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.lang, self.lemma, self.pos)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lemma {
    pub id: LemmaId,
    pub key: LemmaKey,
    /// Reserved for downstream consumers; never computed by the build.
    pub freq_rank: Option<u32>,
}

/// One `(form, lemma, pos)` triple as emitted by the external tagger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconRecord {
    pub form: String,
    pub lemma: String,
    pub pos: Option<String>,
}

/// An inflected surface form resolved to its lemma.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Form {
    pub lang: String,
    pub form: String,
    pub lemma_id: LemmaId,
}

// --- Concept graph ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    pub id: ConceptId,
    pub pos: String,
    /// The pivot-language lemma that seeded the concept.
    pub gloss: String,
}

/// Ranked link between a lemma and a concept. Rank 1 is the preferred lemma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sense {
    pub lemma_id: LemmaId,
    pub concept_id: ConceptId,
    pub rank: u32,
}

// --- Translations ---

/// A bilingual gloss as read from a dictionary source, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawGloss {
    pub source_lemma: String,
    pub source_lang: String,
    pub gloss: String,
    pub target_lang: String,
    /// Topic categories of the sense the gloss belongs to, if known.
    pub categories: Vec<String>,
}

/// An accepted translation record. Ephemeral: never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Translation {
    pub source_lemma: String,
    pub source_lang: String,
    pub gloss: String,
    pub target_lang: String,
}

impl Translation {
    /// Swaps both sides: `(a, la, b, lb)` becomes `(b, lb, a, la)`.
    pub fn mirrored(&self) -> Translation {
        Translation {
            source_lemma: self.gloss.clone(),
            source_lang: self.target_lang.clone(),
            gloss: self.source_lemma.clone(),
            target_lang: self.source_lang.clone(),
        }
    }

    pub fn direction(&self) -> Direction {
        Direction::new(&self.source_lang, &self.target_lang)
    }
}

/// A directed language pair, e.g. `es -> en`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Direction {
    pub from: String,
    pub to: String,
}

impl Direction {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Direction {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn reversed(&self) -> Direction {
        Direction {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrored_swaps_both_sides() {
        let t = Translation {
            source_lemma: "perro".to_string(),
            source_lang: "es".to_string(),
            gloss: "dog".to_string(),
            target_lang: "en".to_string(),
        };
        let m = t.mirrored();
        assert_eq!(m.source_lemma, "dog");
        assert_eq!(m.source_lang, "en");
        assert_eq!(m.gloss, "perro");
        assert_eq!(m.target_lang, "es");
        assert_eq!(m.direction(), t.direction().reversed());
        assert_eq!(m.mirrored(), t);
    }

    #[test]
    fn test_display() {
        assert_eq!(Direction::new("es", "en").to_string(), "es->en");
        assert_eq!(LemmaKey::new("es", "perro", "NOUN").to_string(), "es:perro/NOUN");
    }
}
