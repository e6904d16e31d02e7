//! Reduces a free-text gloss to a single comparable lemma.

const INFINITIVE_MARKER: &str = "to ";

/// Glosses containing one of these list the grammatical description first
/// and the actual translation after the last comma.
const JARGON_MARKERS: &[&str] = &[
    "apocopic form of",
    "feminine form of",
    "masculine form of",
    "plural form of",
    "diminutive of",
    "augmentative of",
    "alternative form of",
    "archaic form of",
];

const SEPARATORS: [char; 3] = [',', ';', '/'];

/// Canonicalizes a genuine gloss into a lower-cased, trimmed lemma.
///
/// ```
/// use concepts_rs::canonical::canonicalize;
/// assert_eq!(canonicalize("to be (copula)"), "be");
/// assert_eq!(canonicalize("apocopic form of mío, my"), "my");
/// ```
///
/// The result may be empty; callers decide whether to discard it.
pub fn canonicalize(gloss: &str) -> String {
    let text = strip_infinitive(gloss);

    let text = match text.find('(') {
        Some(idx) => &text[..idx],
        None => text,
    };

    let lower = text.to_lowercase();
    let text = if JARGON_MARKERS.iter().any(|marker| lower.contains(marker)) {
        match text.rfind(',') {
            Some(idx) => &text[idx + 1..],
            None => text,
        }
    } else {
        text
    };

    // Enumerated synonyms: keep the first, presumed primary, member.
    let text = match text.find(SEPARATORS) {
        Some(idx) => &text[..idx],
        None => text,
    };

    let lowered = text.to_lowercase();
    // A segment taken after a comma may itself start with the marker.
    strip_infinitive(lowered.trim()).to_string()
}

fn strip_infinitive(text: &str) -> &str {
    let mut text = text.trim_start();
    while text
        .get(..INFINITIVE_MARKER.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(INFINITIVE_MARKER))
    {
        text = text[INFINITIVE_MARKER.len()..].trim_start();
    }
    text
}
