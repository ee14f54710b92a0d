use futures::Stream;
use index::GraphStats;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::deck_intent::{extract_deck, is_deck_analysis_query};
use crate::deck_service::{DeckOutcome, DeckService, DECK_QUERY_TAG};
use crate::fallback::{focus_card, FallbackSearch};
use crate::generator::{AnswerGenerator, Response};
use crate::llm::LanguageModel;
use crate::resolver::{exact_match, EntityResolver};
use crate::retriever::{QueryResult, Retriever};
use crate::store::GraphStore;

pub const DECK_FORMAT_HINT: &str = "Could not extract 8 cards from query. Please provide deck as: \
     card1, card2, card3, card4, card5, card6, card7, card8";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error(transparent)]
    Deck(#[from] deck::DeckError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoneSummary {
    pub sources: Vec<String>,
    pub confidence: f64,
    pub cypher: String,
}

/// One step of a streamed answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum PipelineEvent {
    Info(String),
    Cypher(String),
    Retrieval(String),
    Generation(String),
    Error(String),
    Done(DoneSummary),
}

impl PipelineEvent {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Info(_) => "info",
            Self::Cypher(_) => "cypher",
            Self::Retrieval(_) => "retrieval",
            Self::Generation(_) => "generation",
            Self::Error(_) => "error",
            Self::Done(_) => "done",
        }
    }

    /// Payload as text; `done` is rendered as JSON.
    pub fn data(&self) -> String {
        match self {
            Self::Info(s) | Self::Cypher(s) | Self::Retrieval(s) | Self::Generation(s) | Self::Error(s) => {
                s.clone()
            }
            Self::Done(summary) => serde_json::to_string(summary).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Pause between streamed answer words.
    pub word_delay: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            word_delay: Duration::from_millis(20),
        }
    }
}

enum DeckRoute {
    NotDeck,
    Unparsed,
    Deck(Vec<String>),
}

fn deck_response(question: &str, names: Vec<String>, outcome: DeckOutcome) -> Response {
    Response {
        question: question.to_string(),
        answer: outcome.report,
        cypher: DECK_QUERY_TAG.to_string(),
        records: Vec::new(),
        sources: names,
        confidence: 1.0,
        note: None,
    }
}

pub struct Pipeline {
    llm: Arc<dyn LanguageModel>,
    retriever: Arc<Retriever>,
    resolver: EntityResolver,
    translator: crate::translator::QueryTranslator,
    generator: AnswerGenerator,
    fallback: FallbackSearch,
    decks: DeckService,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(llm: Arc<dyn LanguageModel>, store: Arc<dyn GraphStore>, options: PipelineOptions) -> Self {
        let retriever = Arc::new(Retriever::new(store));
        Self {
            resolver: EntityResolver::new(retriever.clone()),
            translator: crate::translator::QueryTranslator::new(llm.clone()),
            generator: AnswerGenerator::new(llm.clone()),
            fallback: FallbackSearch::new(retriever.clone()),
            decks: DeckService::new(retriever.clone()),
            llm,
            retriever,
            options,
        }
    }

    pub fn model_name(&self) -> String {
        self.llm.describe()
    }

    pub async fn test_connection(&self) -> bool {
        self.retriever.test_connection().await
    }

    /// Round-trip a trivial prompt; the failure text on error.
    pub async fn test_model(&self) -> Result<(), String> {
        let completion = self.llm.invoke("Reply with the single word OK.").await;
        if completion.content.starts_with("Error:") {
            Err(completion.content)
        } else {
            Ok(())
        }
    }

    pub async fn get_stats(&self) -> anyhow::Result<GraphStats> {
        self.retriever.get_stats().await
    }

    async fn deck_route(&self, question: &str) -> DeckRoute {
        if !is_deck_analysis_query(question) {
            return DeckRoute::NotDeck;
        }
        match extract_deck(question, self.resolver.known_names().await) {
            Some(names) => DeckRoute::Deck(names),
            None => DeckRoute::Unparsed,
        }
    }

    /// Analyze an explicit list of card names, matching the store's spelling when possible.
    pub async fn analyze_deck(&self, names: Vec<String>) -> Result<DeckOutcome, PipelineError> {
        let mut canonical = Vec::with_capacity(names.len());
        for name in names {
            let resolved = self.resolver.canonical(&name).await;
            canonical.push(resolved.unwrap_or_else(|| name.trim().to_string()));
        }
        Ok(self.decks.analyze(canonical).await?)
    }

    async fn translate(&self, question: &str) -> Result<String, PipelineError> {
        let cypher = self.translator.translate(question).await.map_err(|e| {
            tracing::warn!(stage = "translate", error = %e, "translation failed");
            PipelineError::Translation(e.to_string())
        })?;

        if cypher.is_empty() {
            return Err(PipelineError::Translation("model returned no query".to_string()));
        }
        Ok(cypher)
    }

    async fn retrieve(&self, question: &str, cypher: &str) -> QueryResult {
        let known = self.resolver.known_names().await;
        let focus = focus_card(question).and_then(|card| exact_match(&card, known).map(str::to_string));
        self.retriever.retrieve_with_context(cypher, focus.as_deref()).await
    }

    /// Swap an empty result for a fallback search, returning its explanation.
    async fn apply_fallback(&self, question: &str, result: &mut QueryResult) -> Option<String> {
        if result.error.is_some() || !result.is_empty() {
            return None;
        }

        let alternative = self.fallback.find_alternative(question).await?;
        result.records = alternative.records;
        result.cypher = alternative.cypher;
        Some(alternative.explanation)
    }

    async fn answer(&self, question: &str, result: &QueryResult) -> Result<Response, PipelineError> {
        self.generator.generate(question, result).await.map_err(|e| {
            tracing::warn!(stage = "generate", error = %e, "generation failed");
            PipelineError::Generation(e.to_string())
        })
    }

    pub async fn query(&self, question: &str) -> Result<Response, PipelineError> {
        match self.deck_route(question).await {
            DeckRoute::Deck(names) => {
                let outcome = self.decks.analyze(names.clone()).await?;
                return Ok(deck_response(question, names, outcome));
            }
            DeckRoute::Unparsed => tracing::info!(stage = "deck_analysis", "{}", DECK_FORMAT_HINT),
            DeckRoute::NotDeck => {}
        }

        let resolution = self.resolver.resolve(question).await;
        for correction in &resolution.corrections {
            tracing::info!(stage = "resolve", %correction, "auto-corrected");
        }
        let question = resolution.text.as_str();

        let cypher = self.translate(question).await?;
        let mut result = self.retrieve(question, &cypher).await;
        let note = self.apply_fallback(question, &mut result).await;

        let mut response = self.answer(question, &result).await?;
        response.note = note;

        tracing::info!(
            stage = "done",
            records = response.records.len(),
            confidence = response.confidence,
            "question answered"
        );
        Ok(response)
    }

    /// Incremental mode: every transition is reported as an event, the answer word by word.
    pub fn stream(self: Arc<Self>, question: String) -> impl Stream<Item = PipelineEvent> + Send + 'static {
        async_stream::stream! {
            match self.deck_route(&question).await {
                DeckRoute::Deck(names) => {
                    yield PipelineEvent::Info(format!("Detected deck analysis request for: {}", names.join(", ")));
                    yield PipelineEvent::Generation("Running rule-based analysis...".to_string());

                    match self.decks.analyze(names.clone()).await {
                        Ok(outcome) => {
                            yield PipelineEvent::Generation("\nChecking synergies and graph counters...\n\n".to_string());
                            yield PipelineEvent::Generation(outcome.report);
                            yield PipelineEvent::Done(DoneSummary {
                                sources: names,
                                confidence: 1.0,
                                cypher: DECK_QUERY_TAG.to_string(),
                            });
                        }
                        Err(e) => yield PipelineEvent::Error(PipelineError::from(e).to_string()),
                    }
                    return;
                }
                DeckRoute::Unparsed => yield PipelineEvent::Info(DECK_FORMAT_HINT.to_string()),
                DeckRoute::NotDeck => {}
            }

            let resolution = self.resolver.resolve(&question).await;
            if !resolution.corrections.is_empty() {
                let listed: Vec<String> = resolution.corrections.iter().map(ToString::to_string).collect();
                yield PipelineEvent::Info(format!("Auto-corrected: {}", listed.join(", ")));
            }
            let question = resolution.text;

            yield PipelineEvent::Cypher("Translating question to graph query...".to_string());
            let cypher = match self.translate(&question).await {
                Ok(cypher) => cypher,
                Err(e) => {
                    yield PipelineEvent::Error(e.to_string());
                    return;
                }
            };
            yield PipelineEvent::Cypher(cypher.clone());

            yield PipelineEvent::Retrieval("Searching knowledge graph...".to_string());
            let mut result = self.retrieve(&question, &cypher).await;
            if let Some(error) = result.error.clone() {
                yield PipelineEvent::Error(error);
                return;
            }
            yield PipelineEvent::Retrieval(format!("Found {} results", result.records.len()));

            if let Some(note) = self.apply_fallback(&question, &mut result).await {
                yield PipelineEvent::Info(note);
            }

            let response = match self.answer(&question, &result).await {
                Ok(response) => response,
                Err(e) => {
                    yield PipelineEvent::Error(e.to_string());
                    return;
                }
            };
            if response.answer.trim().is_empty() {
                yield PipelineEvent::Error("Failed to generate answer".to_string());
                return;
            }

            for chunk in word_chunks(&response.answer) {
                yield PipelineEvent::Generation(chunk);
                if !self.options.word_delay.is_zero() {
                    tokio::time::sleep(self.options.word_delay).await;
                }
            }

            yield PipelineEvent::Done(DoneSummary {
                sources: response.sources,
                confidence: response.confidence,
                cypher: response.cypher,
            });
        }
    }
}

/// Splits an answer on spaces for streaming. Line breaks stay inside the chunks.
fn word_chunks(text: &str) -> Vec<String> {
    text.split(' ')
        .filter(|word| !word.is_empty())
        .enumerate()
        .map(|(i, word)| if i == 0 { word.to_string() } else { format!(" {}", word) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::NO_INFORMATION;
    use crate::testing::{cycle_deck, cycle_store, ScriptedModel, ScriptedStore};
    use futures::StreamExt;
    use serde_json::json;

    const GIANT_QUERY: &str = "MATCH (c:Card {name: 'Giant'}) RETURN c.name AS name, c.elixir AS cost";

    fn pipeline(model: Arc<ScriptedModel>, store: ScriptedStore) -> Arc<Pipeline> {
        let options = PipelineOptions { word_delay: Duration::ZERO };
        Arc::new(Pipeline::new(model, Arc::new(store), options))
    }

    fn giant_store() -> ScriptedStore {
        ScriptedStore::new()
            .on("{name: 'Giant'}", vec![json!({"name": "Giant", "cost": 5})])
            .on("RETURN c.name AS name ORDER BY", vec![json!({"name": "Giant"}), json!({"name": "Golem"})])
    }

    async fn events(pipeline: Arc<Pipeline>, question: &str) -> Vec<PipelineEvent> {
        pipeline.stream(question.to_string()).collect().await
    }

    fn tags(events: &[PipelineEvent]) -> Vec<&'static str> {
        events.iter().map(PipelineEvent::tag).collect()
    }

    #[tokio::test]
    async fn test_end_to_end_elixir_question() {
        let model = Arc::new(ScriptedModel::replying(&[
            GIANT_QUERY,
            "The Giant costs 5 elixir to deploy.",
        ]));
        let pipeline = pipeline(model, giant_store());

        let response = pipeline.query("What is the elixir cost of the Giant?").await.unwrap();
        assert!(response.cypher.contains("{name: 'Giant'}"));
        assert_eq!(response.records.len(), 1);
        assert_eq!(response.records[0]["cost"], 5);
        assert!(response.answer.contains('5'));
        assert!(response.confidence >= 0.7);
        assert_eq!(response.sources, vec!["Giant"]);
    }

    #[test]
    fn test_word_chunks_keep_line_breaks() {
        let answer = "Counters:\n- Fireball beats Musketeer\n- Log  beats Goblins";
        let chunks = word_chunks(answer);
        assert_eq!(chunks[0], "Counters:\n-");
        assert_eq!(chunks.concat(), "Counters:\n- Fireball beats Musketeer\n- Log beats Goblins");
        assert!(word_chunks("   ").is_empty());
    }

    #[tokio::test]
    async fn test_stream_event_order_and_word_chunks() {
        let fenced = format!("```cypher\n{}\n```", GIANT_QUERY);
        let model = Arc::new(ScriptedModel::replying(&[fenced.as_str(), "The Giant costs 5 elixir."]));
        let events = events(pipeline(model, giant_store()), "What is the elixir cost of the Giant?").await;

        assert_eq!(
            tags(&events),
            vec![
                "cypher", "cypher", "retrieval", "retrieval",
                "generation", "generation", "generation", "generation", "generation",
                "done",
            ]
        );
        assert_eq!(events[1], PipelineEvent::Cypher(GIANT_QUERY.to_string()));
        assert_eq!(events[3], PipelineEvent::Retrieval("Found 1 results".to_string()));

        let text: String = events.iter().filter_map(|e| match e {
            PipelineEvent::Generation(chunk) => Some(chunk.as_str()),
            _ => None,
        }).collect();
        assert_eq!(text, "The Giant costs 5 elixir.");

        match events.last() {
            Some(PipelineEvent::Done(summary)) => {
                assert_eq!(summary.sources, vec!["Giant"]);
                assert_eq!(summary.cypher, GIANT_QUERY);
            }
            other => panic!("expected done, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_corrections_reported_before_translation() {
        let model = Arc::new(ScriptedModel::replying(&[GIANT_QUERY, "It costs 5 elixir, like always."]));
        let events = events(pipeline(model.clone(), giant_store()), "how much elixir does giantt cost").await;

        assert_eq!(events[0], PipelineEvent::Info("Auto-corrected: 'giantt' -> 'Giant'".to_string()));
        assert!(model.prompts()[0].contains("Question: how much elixir does Giant cost"));
    }

    #[tokio::test]
    async fn test_empty_counter_result_uses_fallback() {
        let store = ScriptedStore::new()
            .on("RETURN c.name AS name ORDER BY", vec![json!({"name": "Golem"})])
            .on("RETURN c.elixir AS cost, c.type", vec![json!({"cost": 8})])
            .on("c.elixir <= $cost", vec![
                json!({"card": "Skeletons", "cost": 1}),
                json!({"card": "Minions", "cost": 3}),
            ]);
        let model = Arc::new(ScriptedModel::replying(&[
            "MATCH (c:Card)-[:COUNTERS]->(g:Card {name: 'Golem'}) RETURN c.name AS card",
            "Skeletons and Minions are cheap options against Golem.",
        ]));
        let pipeline = pipeline(model.clone(), store);

        let events = events(pipeline, "What counters Golem?").await;
        assert!(events.contains(&PipelineEvent::Retrieval("Found 0 results".to_string())));
        assert!(events.iter().any(|e| matches!(e,
            PipelineEvent::Info(note) if note.starts_with("While there's no specific counter data for Golem"))));
        assert!(!events.iter().any(|e| matches!(e, PipelineEvent::Generation(g) if g.contains(NO_INFORMATION))));

        match events.last() {
            Some(PipelineEvent::Done(summary)) => {
                assert_eq!(summary.sources, vec!["Minions", "Skeletons"]);
                assert!(summary.cypher.contains("LIMIT 5"));
            }
            other => panic!("expected done, got {:?}", other),
        }
        assert!(model.prompts()[1].contains("Skeletons"));
    }

    #[tokio::test]
    async fn test_sync_fallback_sets_note() {
        let store = ScriptedStore::new()
            .on("RETURN c.elixir AS cost, c.type", vec![json!({"cost": 8})])
            .on("c.elixir <= $cost", vec![json!({"card": "Skeletons", "cost": 1})]);
        let model = Arc::new(ScriptedModel::replying(&["MATCH (x) RETURN x", "Try Skeletons against it."]));

        let response = pipeline(model, store).query("How do I beat 'Golem'?").await.unwrap();
        assert!(response.note.is_some());
        assert_eq!(response.records.len(), 1);
    }

    #[tokio::test]
    async fn test_translation_failure_is_an_error_event() {
        let model = Arc::new(ScriptedModel::new(vec![Err("model offline".to_string())]));
        let events = events(pipeline(model, giant_store()), "What is the Giant?").await;

        assert_eq!(tags(&events), vec!["cypher", "error"]);
        assert_eq!(events[1], PipelineEvent::Error("Translation error: model offline".to_string()));

        let model = Arc::new(ScriptedModel::replying(&["// nothing useful"]));
        let err = pipeline(model, giant_store()).query("What is the Giant?").await.unwrap_err();
        assert!(matches!(err, PipelineError::Translation(_)));
    }

    #[tokio::test]
    async fn test_retrieval_failure_stops_stream() {
        let store = ScriptedStore::new().failing("BROKEN", "Invalid input 'BROKEN'");
        let model = Arc::new(ScriptedModel::replying(&["BROKEN QUERY"]));
        let events = events(pipeline(model, store), "What is the Giant?").await;

        assert_eq!(tags(&events), vec!["cypher", "cypher", "retrieval", "error"]);
        assert!(events[3].data().starts_with("Query execution error:"));
    }

    #[tokio::test]
    async fn test_sync_retrieval_failure_is_apologetic_answer() {
        let store = ScriptedStore::new().failing("BROKEN", "Invalid input");
        let model = Arc::new(ScriptedModel::replying(&["BROKEN QUERY"]));

        let response = pipeline(model, store).query("What is the Giant?").await.unwrap();
        assert!(response.answer.starts_with("I encountered an error while searching"));
        assert_eq!(response.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_generation_failure_is_an_error_event() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(GIANT_QUERY.to_string()),
            Err("rate limited".to_string()),
        ]));
        let events = events(pipeline(model, giant_store()), "What is the elixir cost of the Giant?").await;

        assert_eq!(events.last(), Some(&PipelineEvent::Error("Generation error: rate limited".to_string())));
        assert!(!tags(&events).contains(&"done"));
    }

    fn deck_store() -> ScriptedStore {
        let names: Vec<serde_json::Value> = cycle_deck().into_iter().map(|n| json!({"name": n})).collect();
        cycle_store().on("RETURN c.name AS name ORDER BY", names)
    }

    #[tokio::test]
    async fn test_deck_branch_skips_translation() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let question = format!("Analyze my deck: {}", cycle_deck().join(", "));
        let events = events(pipeline(model.clone(), deck_store()), &question).await;

        assert_eq!(tags(&events).first(), Some(&"info"));
        assert!(events[0].data().starts_with("Detected deck analysis request for: Hog Rider, Musketeer"));
        assert!(events.iter().any(|e| e.data().contains("Archetype: cycle")));

        match events.last() {
            Some(PipelineEvent::Done(summary)) => {
                assert_eq!(summary.cypher, "DECK_ANALYSIS_HYBRID");
                assert_eq!(summary.confidence, 1.0);
                assert_eq!(summary.sources, cycle_deck());
            }
            other => panic!("expected done, got {:?}", other),
        }
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_unparsed_deck_falls_through_with_hint() {
        let model = Arc::new(ScriptedModel::replying(&["MATCH (c:Card) RETURN c.name AS card LIMIT 0"]));
        let events = events(pipeline(model, deck_store()), "Rate my deck please").await;

        assert_eq!(events[0], PipelineEvent::Info(DECK_FORMAT_HINT.to_string()));
        assert_eq!(events[1].tag(), "cypher");
    }

    #[tokio::test]
    async fn test_unknown_deck_card_reported() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let err = pipeline(model, deck_store())
            .analyze_deck(vec!["Giant".to_string(); 8])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Card 'Giant' not found in database");
    }

    #[tokio::test]
    async fn test_model_probe() {
        let healthy = pipeline(Arc::new(ScriptedModel::replying(&["OK"])), ScriptedStore::new());
        assert!(healthy.test_model().await.is_ok());

        let down = pipeline(Arc::new(ScriptedModel::new(vec![])), ScriptedStore::new());
        assert_eq!(down.test_model().await.unwrap_err(), "Error: no scripted reply left");
    }

    #[test]
    fn test_event_serialization() {
        let event = PipelineEvent::Done(DoneSummary {
            sources: vec!["Giant".to_string()],
            confidence: 0.7,
            cypher: "MATCH".to_string(),
        });
        assert_eq!(event.data(), r#"{"sources":["Giant"],"confidence":0.7,"cypher":"MATCH"}"#);
        assert_eq!(
            serde_json::to_value(PipelineEvent::Info("hi".to_string())).unwrap(),
            json!({"type": "info", "data": "hi"})
        );
    }
}
