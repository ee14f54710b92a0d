use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, LazyLock};

use crate::resolver::capitalized_runs;
use crate::retriever::Retriever;
use crate::store::{params, Record};

static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'([^']+)'").unwrap());

const CARD_COST_QUERY: &str =
    "MATCH (c:Card {name: $name}) RETURN c.elixir AS cost, c.type AS type, c.transport AS transport";

const CHEAPER_CARDS_QUERY: &str = "MATCH (c:Card) WHERE c.elixir <= $cost AND c.name <> $name \
     RETURN c.name AS card, c.elixir AS cost, c.type AS type ORDER BY c.elixir LIMIT 5";

const CARD_ARCHETYPE_QUERY: &str =
    "MATCH (c:Card {name: $name})-[:FITS_ARCHETYPE]->(a:Archetype) RETURN a.name AS archetype";

const ARCHETYPE_MEMBERS_QUERY: &str = "MATCH (c:Card)-[:FITS_ARCHETYPE]->(a:Archetype {name: $archetype}) \
     WHERE c.name <> $name RETURN c.name AS card, c.elixir AS cost ORDER BY c.elixir LIMIT 5";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackIntent {
    Counter,
    Synergy,
}

impl FallbackIntent {
    pub fn detect(question: &str) -> Option<Self> {
        let lower = question.to_lowercase();
        if ["counter", "beat", "defeat"].iter().any(|k| lower.contains(k)) {
            Some(Self::Counter)
        } else if ["synerg", "work with", "combo"].iter().any(|k| lower.contains(k)) {
            Some(Self::Synergy)
        } else {
            None
        }
    }
}

/// Replacement records for a question whose translated query found nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    pub records: Vec<Record>,
    pub explanation: String,
    pub cypher: String,
}

/// The card a question is about: a quoted name, else the longest capitalized run.
pub fn focus_card(question: &str) -> Option<String> {
    if let Some(quoted) = QUOTED.captures(question).and_then(|c| c.get(1)) {
        return Some(quoted.as_str().to_string());
    }

    capitalized_runs(question)
        .into_iter()
        .fold(None, |best: Option<String>, run| match best {
            Some(b) if b.len() >= run.len() => Some(b),
            _ => Some(run),
        })
}

pub struct FallbackSearch {
    retriever: Arc<Retriever>,
}

impl FallbackSearch {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self { retriever }
    }

    pub async fn find_alternative(&self, question: &str) -> Option<Alternative> {
        let intent = FallbackIntent::detect(question)?;
        let card = focus_card(question)?;

        let alternative = match intent {
            FallbackIntent::Counter => self.cheaper_cards(&card).await,
            FallbackIntent::Synergy => self.archetype_mates(&card).await,
        };

        if let Some(alt) = &alternative {
            tracing::info!(stage = "fallback", card = %card, records = alt.records.len(), "alternative found");
        }
        alternative
    }

    async fn cheaper_cards(&self, card: &str) -> Option<Alternative> {
        let info = self
            .retriever
            .retrieve_with(CARD_COST_QUERY, params([("name", card)]))
            .await;
        let cost = info.records.first()?.get("cost").and_then(Value::as_i64)?;

        let result = self
            .retriever
            .retrieve_with(
                CHEAPER_CARDS_QUERY,
                params([("cost", Value::from(cost)), ("name", Value::from(card))]),
            )
            .await;
        if result.records.is_empty() {
            return None;
        }

        Some(Alternative {
            records: result.records,
            explanation: format!(
                "While there's no specific counter data for {}, here are some lower-cost cards that might work effectively against it",
                card
            ),
            cypher: CHEAPER_CARDS_QUERY.to_string(),
        })
    }

    async fn archetype_mates(&self, card: &str) -> Option<Alternative> {
        let info = self
            .retriever
            .retrieve_with(CARD_ARCHETYPE_QUERY, params([("name", card)]))
            .await;
        let archetype = info
            .records
            .first()?
            .get("archetype")
            .and_then(Value::as_str)?
            .to_string();

        let result = self
            .retriever
            .retrieve_with(
                ARCHETYPE_MEMBERS_QUERY,
                params([("archetype", archetype.as_str()), ("name", card)]),
            )
            .await;
        if result.records.is_empty() {
            return None;
        }

        Some(Alternative {
            records: result.records,
            explanation: format!(
                "While there's no specific synergy data for {}, here are cards from the same '{}' archetype that typically work well together",
                card, archetype
            ),
            cypher: ARCHETYPE_MEMBERS_QUERY.to_string(),
        })
    }
}
