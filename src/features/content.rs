use crate::assessment::SuspiciousSpan;
use regex::Regex;

/// Curated lexicon of urgency/credential/financial-action terms with
/// weights. Multi-word phrases are matched as substrings; single words are
/// matched on word boundaries.
const PHISHING_LEXICON: &[(&str, f64)] = &[
    ("verify your account", 3.0),
    ("account suspended", 3.0),
    ("password expired", 3.0),
    ("update payment", 3.0),
    ("confirm your identity", 3.0),
    ("wire transfer", 2.5),
    ("click here", 2.5),
    ("verify now", 2.5),
    ("action required", 2.0),
    ("act now", 2.0),
    ("limited time", 1.5),
    ("urgent", 1.5),
    ("verify", 1.5),
    ("suspended", 1.5),
    ("suspend", 1.5),
    ("locked", 1.5),
    ("expire", 1.0),
    ("immediately", 1.0),
    ("password", 1.0),
    ("login", 1.0),
    ("confirm", 1.0),
    ("update", 1.0),
    ("account", 1.0),
    ("click", 1.0),
    ("security", 1.0),
    ("bank", 1.0),
    ("paypal", 1.0),
    ("amazon", 1.0),
    ("ebay", 1.0),
    ("irs", 1.0),
    ("tax", 1.0),
    ("refund", 1.0),
];

/// Phrases strong enough to count separately from the general lexicon.
const HIGH_RISK_PHRASES: &[&str] = &[
    "verify your account",
    "click here",
    "verify now",
    "account suspended",
    "password expired",
    "update payment",
    "confirm your identity",
];

/// Smaller "act now" lexicon for the urgency score.
const URGENCY_WORDS: &[&str] = &[
    "urgent",
    "immediate",
    "immediately",
    "asap",
    "act now",
    "right now",
    "today",
    "expire",
    "expires",
    "expired",
    "suspended",
    "locked",
    "verify",
    "confirm",
    "action required",
];

/// Content feature sub-vector plus the lexicon-match spans recorded as a
/// side effect for highlighting.
pub struct ContentFeatures {
    pub entries: Vec<(&'static str, f64)>,
    pub spans: Vec<SuspiciousSpan>,
}

struct LexiconMatcher {
    term: &'static str,
    weight: f64,
    regex: Regex,
}

/// NLP-style lexical features from subject and body. Pure function of the
/// input text; empty or whitespace-only input yields zeroed features.
pub struct ContentFeatureExtractor {
    phishing: Vec<LexiconMatcher>,
    urgency: Vec<LexiconMatcher>,
}

impl Default for ContentFeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentFeatureExtractor {
    pub fn new() -> Self {
        ContentFeatureExtractor {
            phishing: PHISHING_LEXICON
                .iter()
                .map(|&(term, weight)| LexiconMatcher {
                    term,
                    weight,
                    regex: compile_term(term),
                })
                .collect(),
            urgency: URGENCY_WORDS
                .iter()
                .map(|&term| LexiconMatcher {
                    term,
                    weight: 1.0,
                    regex: compile_term(term),
                })
                .collect(),
        }
    }

    pub fn extract(&self, subject: &str, body: &str) -> ContentFeatures {
        // Spans are byte offsets into this combined text; the same layout
        // the assessment documents for suspicious_spans.
        let text = format!("{subject}\n\n{body}");
        let trimmed = text.trim();

        let mut entries = Vec::with_capacity(15);
        let mut spans = Vec::new();

        if trimmed.is_empty() {
            for name in FEATURE_NAMES {
                entries.push((*name, 0.0));
            }
            return ContentFeatures { entries, spans };
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        let word_count = words.len();
        let char_count = text.chars().count();
        let sentence_count = text
            .split(['.', '!', '?'])
            .filter(|s| !s.trim().is_empty())
            .count()
            .max(1);

        let avg_word_length = if word_count > 0 {
            words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / word_count as f64
        } else {
            0.0
        };
        let avg_sentence_length = word_count as f64 / sentence_count as f64;

        let uppercase = text.chars().filter(|c| c.is_uppercase()).count();
        let uppercase_ratio = uppercase as f64 / char_count.max(1) as f64;
        let punctuation = text
            .chars()
            .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
            .count();
        let punctuation_ratio = punctuation as f64 / char_count.max(1) as f64;
        let exclamation_count = text.matches('!').count();
        let question_count = text.matches('?').count();

        let mut keyword_count = 0usize;
        let mut keyword_weight = 0.0;
        for matcher in &self.phishing {
            let mut matched = false;
            for m in matcher.regex.find_iter(&text) {
                matched = true;
                spans.push(SuspiciousSpan {
                    start: m.start(),
                    end: m.end(),
                    reason: "suspicious phrase".to_string(),
                });
            }
            if matched {
                keyword_count += 1;
                keyword_weight += matcher.weight;
            }
        }
        let phishing_keyword_score = keyword_weight / word_count.max(1) as f64;

        let high_risk_phrase_count = HIGH_RISK_PHRASES
            .iter()
            .filter(|phrase| text.to_lowercase().contains(*phrase))
            .count();

        let mut urgency_count = 0usize;
        for matcher in &self.urgency {
            if let Some(m) = matcher.regex.find(&text) {
                urgency_count += 1;
                spans.push(SuspiciousSpan {
                    start: m.start(),
                    end: m.end(),
                    reason: "urgency cue".to_string(),
                });
            }
        }
        let urgency_score = urgency_count as f64 / word_count.max(1) as f64;

        // Distinct-word ratio: templated mass mail repeats itself, natural
        // writing does not.
        let tokens: Vec<String> = words
            .iter()
            .map(|w| {
                w.chars()
                    .filter(|c| c.is_alphabetic())
                    .collect::<String>()
                    .to_lowercase()
            })
            .filter(|t| !t.is_empty())
            .collect();
        let vocabulary_richness = if tokens.is_empty() {
            0.0
        } else {
            let distinct: std::collections::HashSet<&str> =
                tokens.iter().map(|t| t.as_str()).collect();
            distinct.len() as f64 / tokens.len() as f64
        };

        spans.sort_by_key(|s| (s.start, s.end));
        spans.dedup();

        entries.push(("char_count", char_count as f64));
        entries.push(("word_count", word_count as f64));
        entries.push(("sentence_count", sentence_count as f64));
        entries.push(("avg_word_length", avg_word_length));
        entries.push(("avg_sentence_length", avg_sentence_length));
        entries.push(("uppercase_ratio", uppercase_ratio));
        entries.push(("punctuation_ratio", punctuation_ratio));
        entries.push(("exclamation_count", exclamation_count as f64));
        entries.push(("question_count", question_count as f64));
        entries.push(("phishing_keyword_count", keyword_count as f64));
        entries.push(("phishing_keyword_score", phishing_keyword_score));
        entries.push(("high_risk_phrase_count", high_risk_phrase_count as f64));
        entries.push(("urgency_word_count", urgency_count as f64));
        entries.push(("urgency_score", urgency_score));
        entries.push(("vocabulary_richness", vocabulary_richness));

        ContentFeatures { entries, spans }
    }
}

/// Canonical content feature names, in vector order.
pub const FEATURE_NAMES: &[&str] = &[
    "char_count",
    "word_count",
    "sentence_count",
    "avg_word_length",
    "avg_sentence_length",
    "uppercase_ratio",
    "punctuation_ratio",
    "exclamation_count",
    "question_count",
    "phishing_keyword_count",
    "phishing_keyword_score",
    "high_risk_phrase_count",
    "urgency_word_count",
    "urgency_score",
    "vocabulary_richness",
];

fn compile_term(term: &str) -> Regex {
    let escaped = regex::escape(term);
    let pattern = if term.contains(' ') {
        format!("(?i){escaped}")
    } else {
        format!(r"(?i)\b{escaped}\b")
    };
    Regex::new(&pattern).expect("lexicon terms are valid patterns")
}
