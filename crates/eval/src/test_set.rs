use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QAPair {
    pub question: String,
    pub expected_answer_contains: Vec<String>,
    pub category: QuestionType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QuestionType {
    Attribute,  // Single card property lookup
    Filter,     // Cards matching a property constraint
    Counter,    // COUNTERS edges
    Synergy,    // SYNERGIZES_WITH edges
    Archetype,  // Archetype membership
    Deck,       // Rule-based deck analysis
}

fn qa(question: &str, expected: &[&str], category: QuestionType) -> QAPair {
    QAPair {
        question: question.to_string(),
        expected_answer_contains: expected.iter().map(|s| s.to_string()).collect(),
        category,
    }
}

pub fn get_test_set() -> Vec<QAPair> {
    use QuestionType::*;

    vec![
        qa("What is the elixir cost of the Giant?", &["5"], Attribute),
        qa("How much elixir does the Hog Rider cost?", &["4"], Attribute),
        qa("What rarity is the Mega Knight?", &["legendary"], Attribute),
        qa("What does the Inferno Tower target?", &["ground", "air"], Attribute),

        qa("Which spells cost 2 elixir or less?", &["log", "zap"], Filter),
        qa("Show me all legendary cards", &["legendary"], Filter),
        qa("Which buildings are in the game?", &["cannon", "tesla"], Filter),

        qa("Which cards counter P.E.K.K.A?", &["counter"], Counter),
        qa("What beats Minion Horde?", &["arrows"], Counter),
        qa("How do I defend against Balloon?", &["musketeer"], Counter),

        qa("What cards synergize with Golem?", &["night witch"], Synergy),
        qa("What works well with Hog Rider?", &["synerg"], Synergy),

        qa("Which cards belong to the Cycle archetype?", &["cycle"], Archetype),
        qa("Which archetype does X-Bow belong to?", &["siege"], Archetype),

        qa(
            "Analyze my deck: Hog Rider, Musketeer, Ice Spirit, Skeletons, Cannon, Fireball, The Log, Ice Golem",
            &["cycle", "counters"],
            Deck,
        ),
        qa(
            "Check this deck: Golem, Night Witch, Baby Dragon, Mega Minion, Lumberjack, Tornado, Lightning, Barbarian Barrel",
            &["beatdown"],
            Deck,
        ),
    ]
}

/// Fraction of expected keywords present in the answer, case-insensitive.
pub fn score_answer(answer: &str, expected: &[String]) -> f64 {
    if expected.is_empty() {
        return 1.0;
    }

    let answer = answer.to_lowercase();
    let hits = expected
        .iter()
        .filter(|keyword| answer.contains(&keyword.to_lowercase()))
        .count();

    hits as f64 / expected.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_answer() {
        let expected = vec!["Night Witch".to_string(), "golem".to_string()];
        assert_eq!(score_answer("Golem pairs with night witch.", &expected), 1.0);
        assert_eq!(score_answer("Golem is a tank.", &expected), 0.5);
        assert_eq!(score_answer("No idea.", &expected), 0.0);
        assert_eq!(score_answer("anything", &[]), 1.0);
    }

    #[test]
    fn test_set_covers_every_category() {
        let set = get_test_set();
        for category in [
            QuestionType::Attribute,
            QuestionType::Filter,
            QuestionType::Counter,
            QuestionType::Synergy,
            QuestionType::Archetype,
            QuestionType::Deck,
        ] {
            assert!(set.iter().any(|qa| qa.category == category), "{:?} missing", category);
        }
        assert!(set.iter().all(|qa| !qa.expected_answer_contains.is_empty()));
    }
}
