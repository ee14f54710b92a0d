use anyhow::{Context, Result};
use ingest::Card;
use neo4rs::{Graph, Query};
use relations::{ArchetypeFit, CounterEdge, Inference, KnowledgeBase, SynergyEdge};
use serde::Serialize;

/// Caps applied when writing inferred edges, so a large card pool does not
/// flood the graph with weak heuristics.
#[derive(Debug, Clone, Copy)]
pub struct EdgeLimits {
    pub counters: usize,
    pub synergies: usize,
    pub per_archetype: usize,
}

impl Default for EdgeLimits {
    fn default() -> Self {
        Self {
            counters: 50,
            synergies: 50,
            per_archetype: 10,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct EdgeReport {
    pub counters: usize,
    pub synergies: usize,
    pub archetype_fits: usize,
    pub failed: usize,
}

pub struct Neo4jIndexer {
    graph: Graph,
}

impl Neo4jIndexer {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    /// Uniqueness constraints on every named node label
    pub async fn init_schema(&self) -> Result<()> {
        tracing::info!("Creating Neo4j constraints...");

        let constraints = [
            ("card_name", "Card"),
            ("rarity_name", "Rarity"),
            ("arena_name", "Arena"),
            ("target_name", "Target"),
            ("type_name", "Type"),
            ("archetype_name", "Archetype"),
        ];

        for (name, label) in constraints {
            let query = Query::new(format!(
                "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.name IS UNIQUE",
                name, label
            ));
            self.graph.run(query).await
                .context(format!("Failed to create constraint on {}.name", label))?;
        }

        tracing::info!("Neo4j constraints created successfully");
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.graph.run(Query::new("MATCH (n) DETACH DELETE n".to_string())).await
            .context("Failed to clear database")?;
        tracing::warn!("Database cleared");
        Ok(())
    }

    /// Upsert a card with its rarity, arena, type and target nodes
    pub async fn index_card(&self, card: &Card) -> Result<()> {
        let targets: Vec<String> = card.targets.iter().map(|t| t.as_str().to_string()).collect();
        let stats = serde_json::to_string(&card.level11_stats)
            .context("Failed to serialize level 11 stats")?;

        let query = Query::new(
            r#"
            MERGE (c:Card {name: $name})
            SET c.elixir = $elixir,
                c.type = $type,
                c.rarity = $rarity,
                c.arena = $arena,
                c.transport = $transport,
                c.hitpoints = $hitpoints,
                c.damage = $damage,
                c.dps = $dps,
                c.description = $description,
                c.level11_stats = $level11_stats
            MERGE (r:Rarity {name: $rarity})
            MERGE (c)-[:HAS_RARITY]->(r)
            MERGE (a:Arena {name: $arena})
            MERGE (c)-[:UNLOCKS_IN]->(a)
            MERGE (ty:Type {name: $type})
            MERGE (c)-[:HAS_TYPE]->(ty)
            WITH c, $targets AS target_list
            UNWIND target_list AS target_name
                MERGE (t:Target {name: target_name})
                MERGE (c)-[:CAN_HIT]->(t)
            "#.to_string()
        )
        .param("name", card.name.clone())
        .param("elixir", card.elixir)
        .param("type", card.card_type.as_str())
        .param("rarity", card.rarity.as_str())
        .param("arena", card.arena.clone())
        .param("transport", card.transport.map(|t| t.as_str().to_string()))
        .param("hitpoints", card.hitpoints)
        .param("damage", card.damage)
        .param("dps", card.dps)
        .param("description", card.description.clone())
        .param("level11_stats", stats)
        .param("targets", targets);

        self.graph.run(query).await
            .context(format!("Failed to index card {}", card.name))?;

        Ok(())
    }

    pub async fn index_counter(&self, edge: &CounterEdge) -> Result<()> {
        let query = Query::new(
            r#"
            MATCH (from:Card {name: $from})
            MATCH (to:Card {name: $to})
            MERGE (from)-[r:COUNTERS]->(to)
            SET r.effectiveness = $effectiveness,
                r.reason = $reason
            "#.to_string()
        )
        .param("from", edge.from.clone())
        .param("to", edge.to.clone())
        .param("effectiveness", edge.effectiveness.as_str())
        .param("reason", edge.reason.clone());

        self.graph.run(query).await
            .context(format!("Failed to index counter {} -> {}", edge.from, edge.to))?;

        Ok(())
    }

    pub async fn index_synergy(&self, edge: &SynergyEdge) -> Result<()> {
        let query = Query::new(
            r#"
            MATCH (c1:Card {name: $from})
            MATCH (c2:Card {name: $to})
            MERGE (c1)-[r:SYNERGIZES_WITH]->(c2)
            SET r.synergy_type = $synergy_type,
                r.strength = $strength
            "#.to_string()
        )
        .param("from", edge.from.clone())
        .param("to", edge.to.clone())
        .param("synergy_type", edge.synergy_type.clone())
        .param("strength", edge.strength.as_str());

        self.graph.run(query).await
            .context(format!("Failed to index synergy {} -> {}", edge.from, edge.to))?;

        Ok(())
    }

    pub async fn index_archetype_fit(&self, archetype: &str, fit: &ArchetypeFit) -> Result<()> {
        let query = Query::new(
            r#"
            MATCH (c:Card {name: $card})
            MERGE (a:Archetype {name: $archetype})
            MERGE (c)-[r:FITS_ARCHETYPE]->(a)
            SET r.role = $role
            "#.to_string()
        )
        .param("card", fit.card.clone())
        .param("archetype", archetype.to_string())
        .param("role", fit.role.clone());

        self.graph.run(query).await
            .context(format!("Failed to index {} into {}", fit.card, archetype))?;

        Ok(())
    }

    /// Write inferred edges (capped) followed by the curated ones.
    /// A failing edge is logged and counted; it never aborts the batch.
    pub async fn index_relations(
        &self,
        inference: &Inference,
        kb: &KnowledgeBase,
        limits: EdgeLimits,
    ) -> EdgeReport {
        let mut report = EdgeReport::default();

        let counters = inference.counters.iter().take(limits.counters)
            .chain(kb.known_counter_edges().iter())
            .cloned()
            .collect::<Vec<_>>();
        for edge in &counters {
            match self.index_counter(edge).await {
                Ok(()) => report.counters += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "counter edge skipped");
                    report.failed += 1;
                }
            }
        }

        let synergies = inference.synergies.iter().take(limits.synergies)
            .chain(kb.known_synergy_edges().iter())
            .cloned()
            .collect::<Vec<_>>();
        for edge in &synergies {
            match self.index_synergy(edge).await {
                Ok(()) => report.synergies += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "synergy edge skipped");
                    report.failed += 1;
                }
            }
        }

        for (archetype, fits) in &inference.archetypes {
            for fit in fits.iter().take(limits.per_archetype) {
                match self.index_archetype_fit(archetype.name(), fit).await {
                    Ok(()) => report.archetype_fits += 1,
                    Err(e) => {
                        tracing::warn!(error = %e, "archetype fit skipped");
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }

    async fn count(&self, cypher: &str) -> Result<usize> {
        let mut result = self.graph.execute(Query::new(cypher.to_string())).await?;
        let count = if let Some(row) = result.next().await? {
            row.get::<i64>("count").unwrap_or(0) as usize
        } else {
            0
        };
        Ok(count)
    }

    /// Get graph statistics
    pub async fn get_stats(&self) -> Result<GraphStats> {
        Ok(GraphStats {
            cards: self.count("MATCH (c:Card) RETURN count(c) as count").await?,
            rarities: self.count("MATCH (r:Rarity) RETURN count(r) as count").await?,
            arenas: self.count("MATCH (a:Arena) RETURN count(a) as count").await?,
            counter_relationships: self.count("MATCH ()-[r:COUNTERS]->() RETURN count(r) as count").await?,
            synergy_relationships: self.count("MATCH ()-[r:SYNERGIZES_WITH]->() RETURN count(r) as count").await?,
            archetype_fits: self.count("MATCH ()-[r:FITS_ARCHETYPE]->() RETURN count(r) as count").await?,
        })
    }
}

#[derive(Debug, Default, Clone, Serialize, serde::Deserialize, PartialEq)]
pub struct GraphStats {
    pub cards: usize,
    pub rarities: usize,
    pub arenas: usize,
    pub counter_relationships: usize,
    pub synergy_relationships: usize,
    pub archetype_fits: usize,
}
