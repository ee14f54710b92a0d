use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::{Arc, LazyLock};
use tokio::sync::OnceCell;

use crate::retriever::Retriever;

pub const SIMILARITY_THRESHOLD: f64 = 0.7;
pub const MIN_FUZZY_LEN: usize = 4;

const NAMES_QUERY: &str = "MATCH (c:Card) RETURN c.name AS name ORDER BY c.name";

static CAPITALIZED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z.\-']*(?:[ \t]+[A-Z][A-Za-z.\-']*)*").unwrap()
});

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Za-z][A-Za-z.\-']*").unwrap());

/// Question grammar and game vocabulary that is never treated as a card name.
const STOP_WORDS: &[&str] = &[
    "a", "about", "against", "air", "all", "an", "analyze", "and", "any", "are", "arena",
    "archetype", "at", "attack", "be", "beat", "best", "better", "building", "buildings",
    "can", "card", "cards", "check", "cheap", "cheapest", "common", "compare", "condition",
    "cost", "costs", "could", "counter", "counters", "damage", "deck", "defeat", "defense",
    "do", "does", "dps", "elixir", "epic", "find", "for", "from", "give", "good", "ground",
    "has", "have", "health", "highest", "hit", "hitpoints", "hits", "how", "i", "in", "is",
    "it", "its", "legendary", "like", "list", "lowest", "many", "me", "more", "most", "much",
    "my", "of", "on", "or", "play", "rare", "rarity", "rate", "should", "show", "some",
    "spell", "spells", "stats", "strong", "synergies", "synergize", "synergizes", "synergy",
    "tell", "than", "that", "the", "their", "them", "then", "there", "they", "this", "to",
    "troop", "troops", "type", "unit", "units", "use", "validate", "versus", "vs", "weak",
    "well", "what", "when", "where", "which", "who", "why", "win", "with", "work", "works",
    "would", "your",
];

pub fn is_stop_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

fn trim_token(token: &str) -> &str {
    token.trim_end_matches(['.', '-', '\''])
}

/// Edit distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// `1 - distance / longer length`, case-insensitive, in [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

pub fn exact_match<'a>(candidate: &str, known: &'a [String]) -> Option<&'a str> {
    let lower = candidate.to_lowercase();
    known
        .iter()
        .find(|name| name.to_lowercase() == lower)
        .map(String::as_str)
}

/// Closest known name at or above `cutoff`; ties keep the earlier name.
pub fn best_match<'a>(candidate: &str, known: &'a [String], cutoff: f64) -> Option<&'a str> {
    let mut best: Option<(&str, f64)> = None;
    for name in known {
        let score = similarity(candidate, name);
        if score >= cutoff && best.is_none_or(|(_, s)| score > s) {
            best = Some((name.as_str(), score));
        }
    }
    best.map(|(name, _)| name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub original: String,
    pub canonical: String,
}

impl std::fmt::Display for Correction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' -> '{}'", self.original, self.canonical)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub text: String,
    pub corrections: Vec<Correction>,
}

enum Lookup<'a> {
    Same,
    Corrected(&'a str),
    Unknown,
}

fn lookup<'a>(candidate: &str, known: &'a [String]) -> Lookup<'a> {
    if let Some(name) = exact_match(candidate, known) {
        return if name == candidate { Lookup::Same } else { Lookup::Corrected(name) };
    }
    if candidate.chars().count() >= MIN_FUZZY_LEN {
        if let Some(name) = best_match(candidate, known, SIMILARITY_THRESHOLD) {
            return Lookup::Corrected(name);
        }
    }
    Lookup::Unknown
}

/// Capitalized word runs with leading and trailing stop-words removed, in text order.
pub fn capitalized_runs(text: &str) -> Vec<String> {
    CAPITALIZED_RUN
        .find_iter(text)
        .filter_map(|m| {
            let words: Vec<&str> = m.as_str().split_whitespace().map(trim_token).collect();
            let start = words.iter().position(|w| !is_stop_word(w))?;
            let end = words.iter().rposition(|w| !is_stop_word(w))?;
            Some(words[start..=end].join(" "))
        })
        .collect()
}

struct Collector<'a> {
    known: &'a [String],
    seen: HashSet<String>,
    corrections: Vec<Correction>,
}

impl<'a> Collector<'a> {
    fn push(&mut self, original: &str, canonical: &str) {
        if self.seen.insert(original.to_lowercase()) {
            self.corrections.push(Correction {
                original: original.to_string(),
                canonical: canonical.to_string(),
            });
        }
    }

    /// Longest-first windows of at least two words, left to right; leftovers become singles.
    fn scan_run(&mut self, words: &[&str], singles: &mut Vec<String>) {
        let mut i = 0;
        'outer: while i < words.len() {
            for len in (2..=words.len() - i).rev() {
                let window = &words[i..i + len];
                if is_stop_word(window[0]) || is_stop_word(window[len - 1]) {
                    continue;
                }
                let phrase = window.join(" ");
                match lookup(&phrase, self.known) {
                    Lookup::Same => {}
                    Lookup::Corrected(name) => self.push(&phrase, name),
                    Lookup::Unknown => continue,
                }
                i += len;
                continue 'outer;
            }
            singles.push(words[i].to_string());
            i += 1;
        }
    }

    fn single(&mut self, word: &str) {
        if word.chars().count() < 3 || is_stop_word(word) {
            return;
        }
        if let Lookup::Corrected(name) = lookup(word, self.known) {
            self.push(word, name);
        }
    }
}

fn replace_whole_word(text: &str, original: &str, canonical: &str) -> String {
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let mut pattern = String::new();
    if is_word(original.chars().next()) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(original));
    if is_word(original.chars().last()) {
        pattern.push_str(r"\b");
    }

    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re.replace_all(text, NoExpand(canonical)).into_owned(),
        Err(_) => text.to_string(),
    }
}

/// Find card-name typos and casing mistakes in `text` and rewrite them.
pub fn resolve_names(text: &str, known: &[String]) -> Resolution {
    if known.is_empty() {
        return Resolution {
            text: text.to_string(),
            corrections: Vec::new(),
        };
    }

    let mut collector = Collector {
        known,
        seen: HashSet::new(),
        corrections: Vec::new(),
    };

    let mut run_spans: Vec<Range<usize>> = Vec::new();
    let mut singles = Vec::new();
    for m in CAPITALIZED_RUN.find_iter(text) {
        run_spans.push(m.range());
        let words: Vec<&str> = m.as_str().split_whitespace().map(trim_token).collect();
        collector.scan_run(&words, &mut singles);
    }
    for word in &singles {
        collector.single(word);
    }

    for m in WORD.find_iter(text) {
        if run_spans.iter().any(|span| span.contains(&m.start())) {
            continue;
        }
        let token = trim_token(m.as_str());
        if !token.starts_with(|c: char| c.is_lowercase()) {
            continue;
        }
        if token.chars().count() < MIN_FUZZY_LEN || is_stop_word(token) {
            continue;
        }
        if let Lookup::Corrected(name) = lookup(token, known) {
            collector.push(token, name);
        }
    }

    let corrected = collector
        .corrections
        .iter()
        .fold(text.to_string(), |acc, c| replace_whole_word(&acc, &c.original, &c.canonical));

    Resolution {
        text: corrected,
        corrections: collector.corrections,
    }
}

/// Resolver bound to the store's card names, fetched once per process.
pub struct EntityResolver {
    retriever: Arc<Retriever>,
    names: OnceCell<Vec<String>>,
}

impl EntityResolver {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self {
            retriever,
            names: OnceCell::new(),
        }
    }

    /// Card names in the store. Failed or empty loads are not cached.
    pub async fn known_names(&self) -> &[String] {
        let loaded = self
            .names
            .get_or_try_init(|| async {
                let result = self.retriever.retrieve(NAMES_QUERY).await;
                if let Some(error) = result.error {
                    return Err(error);
                }
                let names: Vec<String> = result
                    .records
                    .iter()
                    .filter_map(|r| r.get("name").and_then(|v| v.as_str()))
                    .map(str::to_string)
                    .collect();
                if names.is_empty() {
                    return Err("no cards in store".to_string());
                }
                tracing::debug!(count = names.len(), "card names cached");
                Ok(names)
            })
            .await;

        match loaded {
            Ok(names) => names.as_slice(),
            Err(e) => {
                tracing::warn!(error = %e, "card names unavailable");
                &[]
            }
        }
    }

    pub async fn resolve(&self, text: &str) -> Resolution {
        resolve_names(text, self.known_names().await)
    }

    /// The store's spelling of `name`, matched case-insensitively.
    pub async fn canonical(&self, name: &str) -> Option<String> {
        exact_match(name.trim(), self.known_names().await).map(str::to_string)
    }
}
