use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::test_set::{score_answer, QAPair};
use query::Pipeline;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResults {
    pub model: String,
    pub total_queries: usize,
    pub failed_queries: usize,
    pub avg_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub avg_quality_score: f64,
    pub avg_confidence: f64,
    pub by_category: Vec<CategoryScore>,
    pub questions: Vec<QuestionOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub avg_quality: f64,
    pub avg_confidence: f64,
    pub avg_latency_ms: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question: String,
    pub category: String,
    pub latency_ms: f64,
    pub quality: f64,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Benchmarker<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> Benchmarker<'a> {
    pub fn new(pipeline: &'a Pipeline) -> Self {
        Self { pipeline }
    }

    /// Runs every question through the synchronous pipeline. Failed questions score zero.
    pub async fn run_benchmark(&self, test_set: &[QAPair]) -> BenchmarkResults {
        let mut outcomes = Vec::with_capacity(test_set.len());

        for (i, qa) in test_set.iter().enumerate() {
            tracing::info!(index = i + 1, total = test_set.len(), question = %qa.question, "benchmarking");

            let start = Instant::now();
            let result = self.pipeline.query(&qa.question).await;
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

            let outcome = match result {
                Ok(response) => QuestionOutcome {
                    question: qa.question.clone(),
                    category: format!("{:?}", qa.category),
                    latency_ms,
                    quality: score_answer(&response.answer, &qa.expected_answer_contains),
                    confidence: response.confidence,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(question = %qa.question, error = %e, "benchmark question failed");
                    QuestionOutcome {
                        question: qa.question.clone(),
                        category: format!("{:?}", qa.category),
                        latency_ms,
                        quality: 0.0,
                        confidence: 0.0,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        compute_results(self.pipeline.model_name(), outcomes)
    }
}

pub fn compute_results(model: String, outcomes: Vec<QuestionOutcome>) -> BenchmarkResults {
    let mut latencies: Vec<f64> = outcomes.iter().map(|o| o.latency_ms).collect();
    latencies.sort_by(|a, b| a.total_cmp(b));

    let mut categories: BTreeMap<&str, Vec<&QuestionOutcome>> = BTreeMap::new();
    for outcome in &outcomes {
        categories.entry(outcome.category.as_str()).or_default().push(outcome);
    }

    let by_category = categories
        .into_iter()
        .map(|(category, group)| CategoryScore {
            category: category.to_string(),
            avg_quality: mean(group.iter().map(|o| o.quality)),
            avg_confidence: mean(group.iter().map(|o| o.confidence)),
            avg_latency_ms: mean(group.iter().map(|o| o.latency_ms)),
            count: group.len(),
        })
        .collect();

    BenchmarkResults {
        model,
        total_queries: outcomes.len(),
        failed_queries: outcomes.iter().filter(|o| o.error.is_some()).count(),
        avg_latency_ms: mean(latencies.iter().copied()),
        p50_latency_ms: percentile(&latencies, 50),
        p95_latency_ms: percentile(&latencies, 95),
        avg_quality_score: mean(outcomes.iter().map(|o| o.quality)),
        avg_confidence: mean(outcomes.iter().map(|o| o.confidence)),
        by_category,
        questions: outcomes,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn percentile(sorted_data: &[f64], p: usize) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let index = (p as f64 / 100.0 * sorted_data.len() as f64) as usize;
    sorted_data[index.min(sorted_data.len() - 1)]
}
