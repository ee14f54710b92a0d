pub mod config;
pub mod neo4j_index;
pub mod schema;

pub use config::Neo4jConfig;
pub use neo4j_index::{EdgeLimits, EdgeReport, GraphStats, Neo4jIndexer};
pub use schema::{examples_text, schema_description, CypherExample, CYPHER_EXAMPLES};

use anyhow::Result;
use ingest::Card;
use relations::KnowledgeBase;
use serde::Serialize;

#[derive(Debug, Default, Serialize)]
pub struct LoadSummary {
    pub cards_indexed: usize,
    pub cards_failed: Vec<String>,
    pub edges: EdgeReport,
}

/// Full load: constraints, cards, then every derived and curated relation.
pub async fn load_cards(
    indexer: &Neo4jIndexer,
    cards: &[Card],
    kb: &KnowledgeBase,
    limits: EdgeLimits,
) -> Result<LoadSummary> {
    indexer.init_schema().await?;

    let mut summary = LoadSummary::default();
    let mut indexed = Vec::with_capacity(cards.len());

    for card in cards {
        match indexer.index_card(card).await {
            Ok(()) => {
                tracing::debug!(card = %card.name, "card indexed");
                summary.cards_indexed += 1;
                indexed.push(card.clone());
            }
            Err(e) => {
                tracing::warn!(card = %card.name, error = %e, "card not indexed");
                summary.cards_failed.push(card.name.clone());
            }
        }
    }

    let inference = relations::infer(&indexed, kb);
    summary.edges = indexer.index_relations(&inference, kb, limits).await;

    tracing::info!(
        cards = summary.cards_indexed,
        counters = summary.edges.counters,
        synergies = summary.edges.synergies,
        archetype_fits = summary.edges.archetype_fits,
        failed = summary.edges.failed,
        "load complete"
    );

    Ok(summary)
}
