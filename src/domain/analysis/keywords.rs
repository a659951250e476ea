//! Keyword frequency and domain-term mention counting.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*(),]|%[0-9a-fA-F]{2})+")
        .expect("url pattern")
});
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\w+").expect("mention pattern"));
static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\w+").expect("hashtag pattern"));
/// Contiguous Latin or Cyrillic letters.
static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[а-яёА-ЯЁa-zA-Z]+").expect("word pattern"));

/// Russian and English function words excluded from keyword tables.
pub const STOP_WORDS: &[&str] = &[
    "это", "что", "как", "для", "или", "при", "все", "так", "уже", "еще", "где", "кто", "его",
    "она", "они", "мне", "нас", "вас", "них", "тут", "там", "тоже", "если", "чтобы", "когда",
    "после", "перед", "между", "через", "под", "над", "без", "про", "the", "and", "for", "are",
    "but", "not", "you", "all", "can", "had", "her", "was", "one", "our", "out", "day", "get",
    "has", "him", "his", "how", "man", "new", "now", "old", "see", "two", "way", "who", "boy",
    "did", "its", "let", "put", "say", "she", "too", "use",
];

/// Industrial automation vocabulary tracked in mention counts.
pub const TECH_TERMS: &[&str] = &[
    "scada", "plc", "асу", "тп", "кипиа", "контроллер", "датчик", "привод", "модуль", "siemens",
    "schneider", "abb", "omron", "mitsubishi", "allen", "bradley", "wincc", "tia", "portal",
    "step", "codesys", "unity", "vijeo", "citect", "modbus", "profibus", "profinet", "ethernet",
    "rs485", "can", "hart", "hmi", "панель", "оператор", "визуализация", "мнемосхема", "тренд",
    "аварийный", "сигнализация", "блокировка", "защита", "автоматика",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

/// Frequency-ranked keywords across `texts`.
///
/// URLs, `@mentions` and `#hashtags` are stripped before tokenizing. Tokens shorter
/// than `min_len` characters or in [`STOP_WORDS`] are dropped. Equal counts keep
/// first-encountered order.
pub fn extract_keywords<'a>(
    texts: impl IntoIterator<Item = &'a str>,
    min_len: usize,
    top_n: usize,
) -> Vec<KeywordCount> {
    let joined = texts.into_iter().collect::<Vec<_>>().join(" ");
    let text = URL_RE.replace_all(&joined, "");
    let text = MENTION_RE.replace_all(&text, "");
    let text = HASHTAG_RE.replace_all(&text, "").to_lowercase();

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<KeywordCount> = Vec::new();
    for m in WORD_RE.find_iter(&text) {
        let word = m.as_str();
        if word.chars().count() < min_len || STOP_WORDS.contains(&word) {
            continue;
        }
        match index.get(word) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(word, counts.len());
                counts.push(KeywordCount {
                    word: word.to_string(),
                    count: 1,
                });
            }
        }
    }

    // stable: ties stay in first-seen order
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(top_n);
    counts
}

/// Whole-word, case-insensitive mentions of each term; zero-count terms are dropped.
/// Sorted by count descending, ties in vocabulary order.
pub fn count_term_mentions<'a>(
    texts: impl IntoIterator<Item = &'a str>,
    terms: &[&str],
) -> Vec<TermCount> {
    let text = texts.into_iter().collect::<Vec<_>>().join(" ").to_lowercase();

    let mut mentions: Vec<TermCount> = terms
        .iter()
        .filter_map(|term| {
            let pattern = format!(r"\b{}\b", regex::escape(&term.to_lowercase()));
            let re = Regex::new(&pattern).ok()?;
            let count = re.find_iter(&text).count();
            (count > 0).then(|| TermCount {
                term: term.to_string(),
                count,
            })
        })
        .collect();
    mentions.sort_by(|a, b| b.count.cmp(&a.count));
    mentions
}
