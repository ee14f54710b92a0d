use deck::DECK_SIZE;
use regex::Regex;
use std::sync::LazyLock;

use crate::resolver::{best_match, exact_match};

pub const DECK_MATCH_CUTOFF: f64 = 0.6;

static DECK_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(analy[sz]e|check|validate|deck|rate)\b").unwrap());

static WITH_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bwith\b").unwrap());

pub fn is_deck_analysis_query(question: &str) -> bool {
    DECK_KEYWORD.is_match(question)
}

/// The part of the question that lists the cards.
fn deck_part(question: &str) -> &str {
    if let Some((_, rest)) = question.split_once(':') {
        return rest;
    }
    if let Some(m) = WITH_WORD.find(question) {
        return &question[m.end()..];
    }
    if let (Some(open), Some(close)) = (question.find('['), question.rfind(']')) {
        if open < close {
            return &question[open + 1..close];
        }
    }
    question
}

const MAX_NAME_WORDS: usize = 4;

fn clean(candidate: &str) -> &str {
    candidate
        .trim()
        .trim_matches(|c: char| matches!(c, '[' | ']' | '.' | '?' | '!'))
        .trim()
}

fn resolve<'a>(candidate: &str, known: &'a [String]) -> Option<&'a str> {
    exact_match(candidate, known).or_else(|| best_match(candidate, known, DECK_MATCH_CUTOFF))
}

/// Greedy longest windows over a space-separated list: exact names first, then fuzzy.
fn resolve_words<'a>(part: &str, known: &'a [String]) -> Vec<&'a str> {
    let words: Vec<&str> = part.split_whitespace().map(clean).filter(|w| !w.is_empty()).collect();
    let mut found = Vec::new();
    let mut i = 0;

    while i < words.len() {
        let longest = MAX_NAME_WORDS.min(words.len() - i);
        let window = |len: usize| words[i..i + len].join(" ");

        let hit = (1..=longest)
            .rev()
            .find_map(|len| exact_match(&window(len), known).map(|name| (name, len)))
            .or_else(|| {
                (1..=longest).rev().find_map(|len| {
                    let phrase = window(len);
                    if phrase.chars().count() < 2 {
                        return None;
                    }
                    best_match(&phrase, known, DECK_MATCH_CUTOFF).map(|name| (name, len))
                })
            });

        match hit {
            Some((name, len)) => {
                found.push(name);
                i += len;
            }
            None => i += 1,
        }
    }

    found
}

/// Eight canonical card names from the question, or `None` when any other count resolves.
pub fn extract_deck(question: &str, known: &[String]) -> Option<Vec<String>> {
    let part = deck_part(question);

    let deck: Vec<String> = if part.contains(',') {
        part.split(',')
            .map(clean)
            .filter(|c| c.chars().count() >= 2)
            .filter_map(|c| resolve(c, known))
            .map(str::to_string)
            .collect()
    } else {
        resolve_words(part, known).into_iter().map(str::to_string).collect()
    };

    if deck.len() == DECK_SIZE { Some(deck) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> Vec<String> {
        [
            "Hog Rider", "Musketeer", "Ice Spirit", "Skeletons", "Cannon", "Fireball", "The Log",
            "Ice Golem", "Giant", "Golem", "Mini P.E.K.K.A",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_intent_keywords_are_whole_words() {
        assert!(is_deck_analysis_query("Analyze my deck: a, b"));
        assert!(is_deck_analysis_query("Can you RATE this"));
        assert!(is_deck_analysis_query("please check it"));
        assert!(!is_deck_analysis_query("What counters Giant?"));
        assert!(!is_deck_analysis_query("Which cards are decked out"));
    }

    #[test]
    fn test_colon_comma_list_with_typos() {
        let deck = extract_deck(
            "Analyze my deck: hog rider, Muskateer, Ice Spirit, skeletons, Cannon, Fireball, The Log, Ice Golem",
            &known(),
        )
        .unwrap();
        assert_eq!(deck[0], "Hog Rider");
        assert_eq!(deck[1], "Musketeer");
        assert_eq!(deck[7], "Ice Golem");
    }

    #[test]
    fn test_space_separated_after_with() {
        let deck = extract_deck(
            "Check deck with Hog Rider Musketeer Ice Spirit Skeletons Cannon Fireball The Log Ice Golem",
            &known(),
        )
        .unwrap();
        assert_eq!(
            deck,
            vec![
                "Hog Rider", "Musketeer", "Ice Spirit", "Skeletons", "Cannon", "Fireball", "The Log",
                "Ice Golem",
            ]
        );
    }

    #[test]
    fn test_bracket_list() {
        let deck = extract_deck(
            "Rate my deck [Giant, Musketeer, Ice Spirit, Skeletons, Cannon, Fireball, The Log, Golem]",
            &known(),
        )
        .unwrap();
        assert_eq!(deck[0], "Giant");
        assert_eq!(deck[7], "Golem");
    }

    #[test]
    fn test_wrong_count_is_none() {
        assert!(extract_deck("Analyze my deck: Giant, Golem", &known()).is_none());
        assert!(extract_deck("Is this deck good?", &known()).is_none());
    }
}
