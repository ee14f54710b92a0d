use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::llm::LanguageModel;
use crate::retriever::QueryResult;
use crate::store::Record;

pub const NO_INFORMATION: &str = "I couldn't find any information about that in the database.";

const BOILERPLATE_PREFIXES: &[&str] = &["Answer:", "Based on the data,", "According to the graph data,"];

const SOURCE_KEYS: &[&str] = &["card", "name", "from", "to"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub question: String,
    pub answer: String,
    pub cypher: String,
    pub records: Vec<Record>,
    pub sources: Vec<String>,
    pub confidence: f64,
    /// Set when the records came from a fallback search rather than the translated query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub struct AnswerGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Errors and empty results short-circuit without calling the model.
    pub async fn generate(&self, question: &str, result: &QueryResult) -> Result<Response> {
        let mut response = Response {
            question: question.to_string(),
            answer: String::new(),
            cypher: result.cypher.clone(),
            records: Vec::new(),
            sources: Vec::new(),
            confidence: 0.0,
            note: None,
        };

        if let Some(error) = &result.error {
            response.answer = format!("I encountered an error while searching: {}", error);
            return Ok(response);
        }

        if result.records.is_empty() {
            response.answer = NO_INFORMATION.to_string();
            return Ok(response);
        }

        let raw = self.llm.complete(&build_prompt(question, &result.records)).await?;
        let answer = clean_answer(&raw);

        response.confidence = estimate_confidence(result.records.len(), &answer);
        response.sources = extract_sources(&result.records);
        response.records = result.records.clone();
        response.answer = answer;

        tracing::debug!(
            stage = "generate",
            records = response.records.len(),
            confidence = response.confidence,
            "answer generated"
        );
        Ok(response)
    }
}

pub fn build_prompt(question: &str, records: &[Record]) -> String {
    let data = serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are a helpful Clash Royale assistant providing accurate information from a knowledge graph.

## Instructions:
1. Use ONLY the information provided in the Graph Data below
2. If the data is empty or doesn't answer the question, say "I don't have information about that"
3. Format card stats clearly (HP, Damage, DPS, Elixir cost, etc.)
4. Be concise but complete
5. Cite specific numbers and facts from the data, naming the field they came from
6. Mention counters and synergies only as the data states them; if a relationship has no reason or type field, do not invent an explanation for it

## User Question:
{question}

## Graph Data Retrieved:
{data}

## Your Answer:
Provide a clear, concise answer based strictly on the graph data above."#
    )
}

pub fn clean_answer(raw: &str) -> String {
    let mut answer = raw.trim();
    for prefix in BOILERPLATE_PREFIXES {
        if let Some(rest) = answer.strip_prefix(prefix) {
            answer = rest.trim();
        }
    }
    answer.to_string()
}

/// Card names cited by the records, sorted and unique.
pub fn extract_sources(records: &[Record]) -> Vec<String> {
    let mut sources = BTreeSet::new();

    for record in records {
        for (key, value) in record {
            match value {
                Value::String(s) if SOURCE_KEYS.contains(&key.to_lowercase().as_str()) => {
                    sources.insert(s.clone());
                }
                Value::Object(inner) if key == "card" => {
                    if let Some(Value::String(name)) = inner.get("name") {
                        sources.insert(name.clone());
                    }
                }
                _ => {}
            }
        }
    }

    sources.into_iter().collect()
}

/// Step function of record count, scaled by answer length and capped at 1.
pub fn estimate_confidence(record_count: usize, answer: &str) -> f64 {
    if record_count == 0 {
        return 0.0;
    }

    let base = match record_count {
        n if n >= 5 => 0.9,
        n if n >= 3 => 0.8,
        _ => 0.7,
    };

    let length = answer.chars().count();
    let scaled: f64 = if length < 20 {
        base * 0.8
    } else if length > 100 {
        base * 1.1
    } else {
        base
    };

    scaled.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect()
    }

    fn result(values: Vec<Value>) -> QueryResult {
        QueryResult {
            records: records(values),
            cypher: "MATCH (c:Card) RETURN c".to_string(),
            elapsed_ms: 1.0,
            error: None,
        }
    }

    #[test]
    fn test_confidence_is_monotonic_and_clamped() {
        let answer = "A medium length answer about cards and costs.";
        let buckets: Vec<f64> = [0, 1, 3, 5].iter().map(|&n| estimate_confidence(n, answer)).collect();
        assert!(buckets.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(buckets[0], 0.0);

        let long = "x".repeat(150);
        assert!(estimate_confidence(10, &long) <= 1.0);
        assert!((estimate_confidence(1, "short") - 0.56).abs() < 1e-9);
    }

    #[test]
    fn test_clean_answer_strips_boilerplate() {
        assert_eq!(clean_answer("  Answer: The Giant costs 5.  "), "The Giant costs 5.");
        assert_eq!(clean_answer("Based on the data, it costs 5."), "it costs 5.");
        assert_eq!(clean_answer("Plain answer"), "Plain answer");
    }

    #[test]
    fn test_sources_from_allowed_keys() {
        let rows = records(vec![
            json!({"card": "Minions", "cost": 3, "reason": "air"}),
            json!({"Name": "Giant", "from": "Arrows", "to": "Minions"}),
            json!({"card": {"name": "Golem"}, "other": "Ignored"}),
        ]);
        assert_eq!(extract_sources(&rows), vec!["Arrows", "Giant", "Golem", "Minions"]);
    }

    #[tokio::test]
    async fn test_error_and_empty_short_circuit() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let generator = AnswerGenerator::new(model.clone());

        let mut failed = result(vec![]);
        failed.error = Some("Query execution error: boom".to_string());
        let response = generator.generate("q", &failed).await.unwrap();
        assert_eq!(response.answer, "I encountered an error while searching: Query execution error: boom");
        assert_eq!(response.confidence, 0.0);
        assert!(response.sources.is_empty());

        let response = generator.generate("q", &result(vec![])).await.unwrap();
        assert_eq!(response.answer, NO_INFORMATION);
        assert_eq!(response.confidence, 0.0);

        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_grounded_answer() {
        let model = Arc::new(ScriptedModel::replying(&["Answer: The Giant costs 5 elixir."]));
        let generator = AnswerGenerator::new(model.clone());

        let response = generator
            .generate("What is the elixir cost of the Giant?", &result(vec![json!({"name": "Giant", "cost": 5})]))
            .await
            .unwrap();

        assert_eq!(response.answer, "The Giant costs 5 elixir.");
        assert_eq!(response.sources, vec!["Giant"]);
        assert!(response.confidence >= 0.7);
        assert!(model.prompts()[0].contains("\"cost\": 5"));
    }

    #[tokio::test]
    async fn test_model_failure_is_an_error() {
        let model = Arc::new(ScriptedModel::new(vec![Err("503".to_string())]));
        let generator = AnswerGenerator::new(model);
        assert!(generator.generate("q", &result(vec![json!({"name": "Giant"})])).await.is_err());
    }
}
