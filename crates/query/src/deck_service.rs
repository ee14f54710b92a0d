use dashmap::DashMap;
use deck::{format_report, Deck, DeckAnalysis, DeckAnalyzer, DeckCounter, DeckError};
use ingest::{Card, CardType, Rarity, TargetType, Transport};
use relations::SynergyEdge;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::retriever::Retriever;
use crate::store::{params, Record};

pub const DECK_QUERY_TAG: &str = "DECK_ANALYSIS_HYBRID";

const CARD_QUERY: &str = r#"
MATCH (c:Card {name: $name})
OPTIONAL MATCH (c)-[:CAN_HIT]->(t:Target)
RETURN c.name AS name, c.elixir AS elixir, c.type AS type, c.rarity AS rarity,
       c.arena AS arena, c.transport AS transport, c.hitpoints AS hitpoints,
       c.damage AS damage, c.dps AS dps, c.description AS description,
       collect(DISTINCT t.name) AS targets
"#;

const COUNTERS_QUERY: &str = "MATCH (c1:Card {name: $name})-[ct:COUNTERS]->(c2:Card) \
     RETURN c1.name AS from_card, c2.name AS counters, ct.reason AS reason LIMIT 3";

#[derive(Debug, Clone, Serialize)]
pub struct DeckOutcome {
    pub analysis: DeckAnalysis,
    pub synergies: Vec<SynergyEdge>,
    pub counters: Vec<DeckCounter>,
    pub report: String,
}

fn text(record: &Record, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

fn int(record: &Record, key: &str) -> Option<i64> {
    record.get(key).and_then(Value::as_i64)
}

/// Rebuild a card from a `CARD_QUERY` row. Rows without a name or cost are rejected.
pub fn card_from_record(record: &Record) -> Option<Card> {
    let name = text(record, "name")?;
    let elixir = int(record, "elixir")?;
    let card_type = CardType::parse(&text(record, "type").unwrap_or_default());

    let mut card = Card::new(name, elixir, card_type).with_stats(
        int(record, "hitpoints"),
        int(record, "damage"),
        int(record, "dps"),
    );
    card.rarity = Rarity::parse(&text(record, "rarity").unwrap_or_default());
    card.arena = text(record, "arena").unwrap_or_default();
    card.description = text(record, "description").unwrap_or_default();
    card.transport = text(record, "transport").as_deref().and_then(Transport::parse);
    card.targets = record
        .get("targets")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(TargetType::parse)
                .collect()
        })
        .unwrap_or_default();

    Some(card)
}

/// Deck analysis backed by the graph, with a process-lifetime card cache.
pub struct DeckService {
    retriever: Arc<Retriever>,
    analyzer: DeckAnalyzer,
    cards: DashMap<String, Card>,
}

impl DeckService {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self {
            retriever,
            analyzer: DeckAnalyzer::default(),
            cards: DashMap::new(),
        }
    }

    /// `Ok(None)` means the graph has no such card. Store failures are `DeckError::Lookup`.
    pub async fn card(&self, name: &str) -> Result<Option<Card>, DeckError> {
        if let Some(card) = self.cards.get(name) {
            return Ok(Some(card.clone()));
        }

        let result = self.retriever.retrieve_with(CARD_QUERY, params([("name", name)])).await;
        if let Some(error) = result.error {
            tracing::warn!(stage = "deck_analysis", card = %name, %error, "card lookup failed");
            return Err(DeckError::Lookup(error));
        }

        let Some(card) = result.records.first().and_then(card_from_record) else {
            return Ok(None);
        };
        self.cards.insert(name.to_string(), card.clone());
        Ok(Some(card))
    }

    async fn graph_counters(&self, names: &[String]) -> Vec<DeckCounter> {
        let mut counters = Vec::new();
        for name in names {
            let result = self
                .retriever
                .retrieve_with(COUNTERS_QUERY, params([("name", name.as_str())]))
                .await;
            if let Some(error) = &result.error {
                tracing::warn!(stage = "deck_analysis", card = %name, %error, "counter lookup failed");
                continue;
            }
            counters.extend(result.records.iter().filter_map(|r| {
                Some(DeckCounter {
                    from: text(r, "from_card")?,
                    to: text(r, "counters")?,
                    reason: text(r, "reason"),
                })
            }));
        }
        counters
    }

    pub async fn analyze(&self, names: Vec<String>) -> Result<DeckOutcome, DeckError> {
        let deck = Deck::new(names)?;

        let mut members = Vec::with_capacity(deck.cards().len());
        for name in deck.cards() {
            let card = self
                .card(name)
                .await?
                .ok_or_else(|| DeckError::UnknownCard(name.clone()))?;
            members.push(card);
        }

        let analysis = self.analyzer.analyze_members(&members)?;
        let synergies = relations::infer_synergies(&members);
        let counters = self.graph_counters(deck.cards()).await;
        let report = format_report(&analysis, &synergies, &counters);

        tracing::info!(
            stage = "deck_analysis",
            archetype = analysis.archetype.label(),
            avg_elixir = analysis.avg_elixir,
            warnings = analysis.general_warnings.len() + analysis.archetype_warnings.len(),
            "deck analyzed"
        );

        Ok(DeckOutcome {
            analysis,
            synergies,
            counters,
            report,
        })
    }
}
