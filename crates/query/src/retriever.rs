use anyhow::{Context, Result};
use index::GraphStats;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::store::{params, GraphStore, Params, Record};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub records: Vec<Record>,
    pub cypher: String,
    pub elapsed_ms: f64,
    pub error: Option<String>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

const CONTEXT_QUERY: &str = r#"
MATCH (c:Card {name: $card_name})
OPTIONAL MATCH (c)-[counters_rel:COUNTERS]->(countered:Card)
WITH c, collect({card: countered.name, effectiveness: counters_rel.effectiveness}) AS counters
OPTIONAL MATCH (counter:Card)-[counter_rel:COUNTERS]->(c)
WITH c, counters, collect({card: counter.name, effectiveness: counter_rel.effectiveness}) AS countered_by
OPTIONAL MATCH (c)-[syn_rel:SYNERGIZES_WITH]->(syn:Card)
WITH c, counters, countered_by, collect({card: syn.name, synergy_type: syn_rel.synergy_type}) AS synergies
OPTIONAL MATCH (c)-[fit_rel:FITS_ARCHETYPE]->(arch:Archetype)
WITH c, counters, countered_by, synergies, collect({archetype: arch.name, role: fit_rel.role}) AS archetypes
RETURN {
    counters: counters,
    countered_by: countered_by,
    synergies: synergies,
    archetypes: archetypes
} AS context
"#;

const STATS_QUERY: &str = r#"
MATCH (c:Card) WITH count(c) AS cards
OPTIONAL MATCH (r:Rarity) WITH cards, count(r) AS rarities
OPTIONAL MATCH (a:Arena) WITH cards, rarities, count(a) AS arenas
OPTIONAL MATCH ()-[ct:COUNTERS]->() WITH cards, rarities, arenas, count(ct) AS counter_relationships
OPTIONAL MATCH ()-[sy:SYNERGIZES_WITH]->()
WITH cards, rarities, arenas, counter_relationships, count(sy) AS synergy_relationships
OPTIONAL MATCH ()-[fit:FITS_ARCHETYPE]->()
RETURN cards, rarities, arenas, counter_relationships, synergy_relationships,
       count(fit) AS archetype_fits
"#;

/// Executes queries against the store and never lets a store failure escape.
pub struct Retriever {
    store: Arc<dyn GraphStore>,
}

impl Retriever {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub async fn retrieve(&self, cypher: &str) -> QueryResult {
        self.retrieve_with(cypher, Params::new()).await
    }

    pub async fn retrieve_with(&self, cypher: &str, params: Params) -> QueryResult {
        let start = Instant::now();
        let outcome = self.store.run(cypher, params).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(records) => {
                tracing::debug!(stage = "retrieve", records = records.len(), elapsed_ms, "query executed");
                QueryResult {
                    records,
                    cypher: cypher.to_string(),
                    elapsed_ms,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(stage = "retrieve", error = %e, elapsed_ms, "query failed");
                QueryResult {
                    records: Vec::new(),
                    cypher: cypher.to_string(),
                    elapsed_ms,
                    error: Some(format!("Query execution error: {}", e)),
                }
            }
        }
    }

    /// Run `cypher`, then attach the focal card's neighborhood to the first row as `_context`.
    pub async fn retrieve_with_context(&self, cypher: &str, card_name: Option<&str>) -> QueryResult {
        let mut result = self.retrieve(cypher).await;

        let Some(card_name) = card_name else {
            return result;
        };
        if result.error.is_some() || result.records.is_empty() {
            return result;
        }

        match self.fetch_card_context(card_name).await {
            Ok(Some(context)) => {
                if let Some(first) = result.records.first_mut() {
                    first.insert("_context".to_string(), context);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(card = card_name, error = %e, "context enrichment failed"),
        }

        result
    }

    pub async fn fetch_card_context(&self, card_name: &str) -> Result<Option<Value>> {
        let records = self
            .store
            .run(CONTEXT_QUERY, params([("card_name", card_name)]))
            .await?;

        Ok(records
            .into_iter()
            .next()
            .and_then(|mut record| record.remove("context")))
    }

    pub async fn test_connection(&self) -> bool {
        match self.store.run("RETURN 1 AS test", Params::new()).await {
            Ok(records) => records
                .first()
                .and_then(|r| r.get("test"))
                .and_then(Value::as_i64)
                == Some(1),
            Err(e) => {
                tracing::warn!(error = %e, "connection test failed");
                false
            }
        }
    }

    pub async fn get_stats(&self) -> Result<GraphStats> {
        let records = self.store.run(STATS_QUERY, Params::new()).await?;
        let Some(record) = records.into_iter().next() else {
            return Ok(GraphStats::default());
        };

        serde_json::from_value(Value::Object(record)).context("Failed to decode graph statistics")
    }
}
