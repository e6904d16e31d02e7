//! Gloss classification.
//!
//! A gloss is either a genuine translation, a cross-reference to another
//! inflected form ("plural of casa"), or a technical / non-lexical entry
//! ("a city in Lombardy"). The decision is driven entirely by the ordered
//! rule tables below; the first rule that fires decides the verdict.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Genuine,
    InflectionReference,
    Technical,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::Genuine => "genuine",
            Classification::InflectionReference => "inflection-reference",
            Classification::Technical => "technical",
        };
        write!(f, "{}", s)
    }
}

/// The table a rule belongs to. Tables are evaluated in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleTable {
    Keyword,
    SpecificForm,
    Inflection,
    /// Grammatical-form descriptions that only mean "inflection" for one source language.
    LanguageForm(&'static str),
    TechnicalCategory,
    TechnicalText,
}

#[derive(Debug)]
pub enum Matcher {
    Substring(&'static str),
    Pattern(Regex),
}

impl Matcher {
    /// `text` must already be lower-cased.
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Substring(needle) => text.contains(needle),
            Matcher::Pattern(re) => re.is_match(text),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Matcher::Substring(needle) => needle,
            Matcher::Pattern(re) => re.as_str(),
        }
    }
}

#[derive(Debug)]
pub struct Rule {
    pub table: RuleTable,
    pub matcher: Matcher,
    pub verdict: Classification,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} `{}` => {}", self.table, self.matcher.as_str(), self.verdict)
    }
}

// --- Rule Tables ---

const INFLECTION_KEYWORDS: &[&str] = &[
    "inflection of",
    "plural of",
    "singular of",
    "masculine of",
    "feminine of",
    "neuter of",
    "genitive of",
    "dative of",
    "nominative of",
    "accusative of",
    "past participle of",
    "gerund of",
    "present participle of",
    "imperative of",
    "combined with",
    "alternative spelling of",
    "alternative form of",
    "obsolete spelling of",
    "archaic form of",
    "female equivalent",
    "male equivalent",
    "voseo",
];

// "form of" alone is too broad: it would catch "apocopic form of mío, my".
const SPECIFIC_FORM_PATTERNS: &[&str] = &[
    r"\b(superlative|comparative|diminutive|augmentative) form of\b",
    r"\b(short|long|contracted|elided) form of\b",
];

const INFLECTION_PATTERNS: &[&str] = &[
    r"\b\w+-person .+? (singular|plural) .+? of \w+$",
    r"\b\w+-person .+? of \w+$",
    r"subjunctive of",
    r"indicative of",
    r"conditional of",
    r"preterite of",
    r"imperfect of",
    r"future .+? of \w+",
];

// German glosses describe case, degree and person without naming the base form.
const GERMAN_FORM_PATTERNS: &[&str] = &[
    r"^(weak|strong|mixed)(/\w+)* (nominative|genitive|dative|accusative)",
    r"^(nominative|genitive|dative|accusative) (singular|plural)",
    r"\b(singular|plural) (nominative|genitive|dative|accusative)\b",
    r"(nominative|genitive|dative|accusative)/(nominative|genitive|dative|accusative)",
    r"^(comparative|superlative) degree",
    r"\b(comparative|superlative) degree of\b",
    r"^(first|second|third)-person (singular|plural)",
    r"\b(first|second|third)-person .+? (present|past|future|subjunctive|imperative|preterite)$",
    r"(first|second|third)/(first|second|third)-person",
    r"\ball-case (singular|plural)\b",
    r"\ball-gender (singular|plural)\b",
    r"^(singular|plural) imperative$",
    r"^(weak|strong|mixed) .+? (singular|plural) (comparative|superlative)",
    r"\b(comparative|superlative|positive) degree of \w+$",
    r"\bdependent (subjunctive|preterite|imperative)\b",
];

const LANGUAGE_FORM_PATTERNS: &[(&str, &[&str])] = &[("de", GERMAN_FORM_PATTERNS)];

const TECHNICAL_CATEGORIES: &[&str] = &[
    "letter names",
    "psychoanalysis",
    "cities",
    "provinces",
    "countries",
    "place names",
    "toponyms",
];

const TECHNICAL_PATTERNS: &[&str] = &[
    // letters and alphabets
    "letter of the",
    "name of the letter",
    "the name of the",
    "called ye",
    "called i griega",
    "called ef",
    "alphabet",
    "written in the latin script",
    "written in the",
    // jargon
    "freud",
    "jung",
    "psychoanalysis",
    "concept of the",
    "greek letter",
    "latin letter",
    "latin-script letter",
    // meta-definitions
    "initialism",
    "abbreviation",
    "misspelling",
    "diminutive of",
    "augmentative of",
    // geography
    "a city",
    "a suburb",
    "a town",
    "a village",
    "a census-designated place",
    "a comune",
    "a province",
    "capital of",
    "a state of",
    "a number of places",
    "county,",
    "a country",
    "a region",
];

fn substring_rules(
    table: RuleTable,
    needles: &'static [&'static str],
    verdict: Classification,
) -> impl Iterator<Item = Rule> {
    needles.iter().map(move |needle| Rule {
        table,
        matcher: Matcher::Substring(needle),
        verdict,
    })
}

fn pattern_rules(
    table: RuleTable,
    patterns: &'static [&'static str],
    verdict: Classification,
) -> impl Iterator<Item = Rule> {
    patterns.iter().map(move |pattern| Rule {
        table,
        matcher: Matcher::Pattern(Regex::new(pattern).unwrap()),
        verdict,
    })
}

static INFLECTION_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    substring_rules(
        RuleTable::Keyword,
        INFLECTION_KEYWORDS,
        Classification::InflectionReference,
    )
    .chain(pattern_rules(
        RuleTable::SpecificForm,
        SPECIFIC_FORM_PATTERNS,
        Classification::InflectionReference,
    ))
    .chain(pattern_rules(
        RuleTable::Inflection,
        INFLECTION_PATTERNS,
        Classification::InflectionReference,
    ))
    .collect()
});

static LANGUAGE_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    LANGUAGE_FORM_PATTERNS
        .iter()
        .flat_map(|&(lang, patterns)| {
            pattern_rules(
                RuleTable::LanguageForm(lang),
                patterns,
                Classification::InflectionReference,
            )
        })
        .collect()
});

static CATEGORY_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    substring_rules(
        RuleTable::TechnicalCategory,
        TECHNICAL_CATEGORIES,
        Classification::Technical,
    )
    .collect()
});

static TEXT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    substring_rules(
        RuleTable::TechnicalText,
        TECHNICAL_PATTERNS,
        Classification::Technical,
    )
    .collect()
});

// --- Classifier ---

/// Classifies glosses written for one source language.
///
/// The language only selects which [`RuleTable::LanguageForm`] rules apply;
/// all other tables are shared.
#[derive(Debug, Clone, Default)]
pub struct GlossClassifier {
    language: Option<String>,
}

impl GlossClassifier {
    /// A classifier with no language-specific rules.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_language(lang: &str) -> Self {
        GlossClassifier {
            language: Some(lang.to_string()),
        }
    }

    pub fn classify(&self, gloss: &str, categories: &[String]) -> Classification {
        self.classify_with_rule(gloss, categories).0
    }

    /// Classifies a gloss and returns the rule that decided it
    /// (`None` when the gloss is genuine).
    pub fn classify_with_rule(
        &self,
        gloss: &str,
        categories: &[String],
    ) -> (Classification, Option<&'static Rule>) {
        let lower = gloss.to_lowercase();

        if let Some(rule) = self.inflection_rules().find(|r| r.matcher.is_match(&lower)) {
            return (rule.verdict, Some(rule));
        }

        for category in categories {
            let category = category.to_lowercase();
            if let Some(rule) = CATEGORY_RULES.iter().find(|r| r.matcher.is_match(&category)) {
                return (rule.verdict, Some(rule));
            }
        }

        if let Some(rule) = TEXT_RULES.iter().find(|r| r.matcher.is_match(&lower)) {
            return (rule.verdict, Some(rule));
        }

        (Classification::Genuine, None)
    }

    /// Inflection rules in evaluation order, including this language's own table.
    fn inflection_rules(&self) -> impl Iterator<Item = &'static Rule> + '_ {
        let language = self.language.as_deref();
        INFLECTION_RULES.iter().chain(
            LANGUAGE_RULES
                .iter()
                .filter(move |r| matches!(r.table, RuleTable::LanguageForm(l) if Some(l) == language)),
        )
    }

    /// Every rule this classifier evaluates, in order.
    pub fn rules(&self) -> impl Iterator<Item = &'static Rule> + '_ {
        self.inflection_rules()
            .chain(CATEGORY_RULES.iter())
            .chain(TEXT_RULES.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(gloss: &str) -> Classification {
        GlossClassifier::for_language("es").classify(gloss, &[])
    }

    #[test]
    fn test_documented_examples() {
        assert_eq!(
            classify("third-person plural future indicative of muñir"),
            Classification::InflectionReference
        );
        assert_eq!(classify("a city in Lombardy"), Classification::Technical);
        assert_eq!(
            classify("first-person singular pronoun; I"),
            Classification::Genuine
        );
    }

    #[test]
    fn test_genuine_glosses() {
        for gloss in ["to be", "dog", "hello, hi, hey", "apocopic form of mío, my"] {
            assert_eq!(classify(gloss), Classification::Genuine, "{}", gloss);
        }
    }

    #[test]
    fn test_inflection_references() {
        for gloss in [
            "inflection of correr:",
            "gerund of acoderar combined with las",
            "masculine plural of limeño",
            "Plural of casa",
            "superlative form of grande",
            "present subjunctive of ir",
        ] {
            assert_eq!(classify(gloss), Classification::InflectionReference, "{}", gloss);
        }
    }

    #[test]
    fn test_technical_text() {
        for gloss in [
            "The name of the Latin-script letter D/d.",
            "Freud's concept of the ego",
            "initialism of América Latina",
            "a town in Hertford County, England",
        ] {
            assert_eq!(classify(gloss), Classification::Technical, "{}", gloss);
        }
    }

    #[test]
    fn test_category_takes_precedence_over_text() {
        let classifier = GlossClassifier::new();
        let categories = vec!["es:Cities in Italy".to_string()];
        let (verdict, rule) = classifier.classify_with_rule("como", &categories);
        assert_eq!(verdict, Classification::Technical);
        assert_eq!(rule.unwrap().table, RuleTable::TechnicalCategory);

        let categories = vec!["Spanish nouns".to_string()];
        assert_eq!(classifier.classify("como", &categories), Classification::Genuine);
    }

    #[test]
    fn test_inflection_checked_before_categories() {
        let classifier = GlossClassifier::new();
        let categories = vec!["Latin letter names".to_string()];
        let (verdict, rule) = classifier.classify_with_rule("plural of a", &categories);
        assert_eq!(verdict, Classification::InflectionReference);
        assert_eq!(rule.unwrap().table, RuleTable::Keyword);
    }

    #[test]
    fn test_language_specific_table() {
        let gloss = "genitive singular";
        assert_eq!(
            GlossClassifier::for_language("es").classify(gloss, &[]),
            Classification::Genuine
        );
        let (verdict, rule) = GlossClassifier::for_language("de").classify_with_rule(gloss, &[]);
        assert_eq!(verdict, Classification::InflectionReference);
        assert_eq!(rule.unwrap().table, RuleTable::LanguageForm("de"));

        // German person descriptions shadow pronoun glosses.
        assert_eq!(
            GlossClassifier::for_language("de").classify("first-person singular pronoun; I", &[]),
            Classification::InflectionReference
        );
    }

    #[test]
    fn test_first_rule_wins() {
        let (_, rule) = classify_rule("third-person plural future indicative of muñir");
        let rule = rule.unwrap();
        assert_eq!(rule.table, RuleTable::Inflection);
        assert_eq!(rule.matcher.as_str(), r"\b\w+-person .+? of \w+$");
    }

    fn classify_rule(gloss: &str) -> (Classification, Option<&'static Rule>) {
        GlossClassifier::for_language("es").classify_with_rule(gloss, &[])
    }

    #[test]
    fn test_every_substring_rule_matches_itself() {
        let classifier = GlossClassifier::for_language("de");
        for rule in classifier.rules() {
            if let Matcher::Substring(needle) = rule.matcher {
                assert!(rule.matcher.is_match(&format!("x {} y", needle)), "{}", rule);
            }
        }
    }

    #[test]
    fn test_every_pattern_rule_has_a_match() {
        let samples: &[(&str, &str)] = &[
            (SPECIFIC_FORM_PATTERNS[0], "superlative form of grande"),
            (SPECIFIC_FORM_PATTERNS[1], "contracted form of para"),
            (INFLECTION_PATTERNS[0], "first-person formal singular present of hacer"),
            (INFLECTION_PATTERNS[1], "third-person plural future indicative of muñir"),
            (INFLECTION_PATTERNS[2], "present subjunctive of ir"),
            (INFLECTION_PATTERNS[3], "present indicative of ser"),
            (INFLECTION_PATTERNS[4], "conditional of poder"),
            (INFLECTION_PATTERNS[5], "preterite of ir"),
            (INFLECTION_PATTERNS[6], "imperfect of estar"),
            (INFLECTION_PATTERNS[7], "future perfect of haber"),
            (GERMAN_FORM_PATTERNS[0], "strong/mixed nominative masculine singular"),
            (GERMAN_FORM_PATTERNS[1], "genitive singular"),
            (GERMAN_FORM_PATTERNS[2], "the plural dative"),
            (GERMAN_FORM_PATTERNS[3], "nominative/accusative"),
            (GERMAN_FORM_PATTERNS[4], "comparative degree"),
            (GERMAN_FORM_PATTERNS[5], "the superlative degree of gut"),
            (GERMAN_FORM_PATTERNS[6], "first-person singular present"),
            (GERMAN_FORM_PATTERNS[7], "the second-person familiar present"),
            (GERMAN_FORM_PATTERNS[8], "first/third-person singular"),
            (GERMAN_FORM_PATTERNS[9], "all-case plural"),
            (GERMAN_FORM_PATTERNS[10], "all-gender plural"),
            (GERMAN_FORM_PATTERNS[11], "singular imperative"),
            (GERMAN_FORM_PATTERNS[12], "weak feminine singular comparative"),
            (GERMAN_FORM_PATTERNS[13], "positive degree of gut"),
            (GERMAN_FORM_PATTERNS[14], "dependent preterite"),
        ];

        let classifier = GlossClassifier::for_language("de");
        let mut checked = 0;
        for rule in classifier.rules() {
            if let Matcher::Pattern(ref re) = rule.matcher {
                let (_, sample) = samples
                    .iter()
                    .find(|(pattern, _)| *pattern == re.as_str())
                    .unwrap_or_else(|| panic!("no sample for {}", rule));
                assert!(rule.matcher.is_match(sample), "{} vs {}", rule, sample);
                checked += 1;
            }
        }
        assert_eq!(checked, samples.len());
    }

    #[test]
    fn test_genuine_has_no_rule() {
        let (verdict, rule) = classify_rule("dog");
        assert_eq!(verdict, Classification::Genuine);
        assert!(rule.is_none());
    }
}
