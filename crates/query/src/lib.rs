pub mod config;
pub mod deck_intent;
pub mod deck_service;
pub mod fallback;
pub mod generator;
pub mod llm;
pub mod pipeline;
pub mod resolver;
pub mod retriever;
pub mod store;
pub mod telemetry;
pub mod translator;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AppConfig, LlmConfig, Provider};
pub use deck_service::{DeckOutcome, DeckService, DECK_QUERY_TAG};
pub use generator::{AnswerGenerator, Response};
pub use llm::{build_model, Completion, GeminiClient, LanguageModel, OllamaClient, OpenRouterClient};
pub use pipeline::{DoneSummary, Pipeline, PipelineError, PipelineEvent, PipelineOptions};
pub use resolver::{Correction, EntityResolver, Resolution};
pub use retriever::{QueryResult, Retriever};
pub use store::{GraphStore, Neo4jStore, Params, Record};
pub use translator::QueryTranslator;
pub use index::GraphStats;

use std::sync::Arc;

/// Connect to Neo4j and the configured model, and assemble the pipeline.
pub async fn connect(config: &AppConfig) -> anyhow::Result<Pipeline> {
    let graph = config.neo4j.connect().await?;
    let store = Arc::new(Neo4jStore::new(graph, config.query_timeout()));
    let model = build_model(&config.llm);

    tracing::info!(model = %model.describe(), neo4j = %config.neo4j.uri, "pipeline ready");

    Ok(Pipeline::new(
        model,
        store,
        PipelineOptions {
            word_delay: config.word_delay(),
        },
    ))
}
