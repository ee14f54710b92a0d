use anyhow::Result;
use eval::{get_test_set, BenchmarkResults, Benchmarker};
use query::AppConfig;

const RESULTS_PATH: &str = "benchmark_results.json";

#[tokio::main]
async fn main() -> Result<()> {
    query::telemetry::init_tracing();
    println!("=== Card Graph Benchmark ===\n");

    let config = AppConfig::from_env();
    let pipeline = query::connect(&config).await?;
    if !pipeline.test_connection().await {
        anyhow::bail!("Failed to connect to Neo4j at {}", config.neo4j.uri);
    }

    let test_set = get_test_set();
    println!("Test set: {} questions", test_set.len());
    println!("Model: {}\n", pipeline.model_name());

    let results = Benchmarker::new(&pipeline).run_benchmark(&test_set).await;
    print_results(&results);

    let results_json = serde_json::to_string_pretty(&results)?;
    std::fs::write(RESULTS_PATH, results_json)?;
    println!("\nResults saved to {}", RESULTS_PATH);

    Ok(())
}

fn print_results(results: &BenchmarkResults) {
    println!("\n=== RESULTS ===\n");
    println!("  Queries: {} ({} failed)", results.total_queries, results.failed_queries);
    println!("  Avg Latency: {:.0} ms", results.avg_latency_ms);
    println!("  P50 Latency: {:.0} ms", results.p50_latency_ms);
    println!("  P95 Latency: {:.0} ms", results.p95_latency_ms);
    println!("  Avg Quality: {:.2}", results.avg_quality_score);
    println!("  Avg Confidence: {:.2}", results.avg_confidence);

    println!("\n  By category:");
    for category in &results.by_category {
        println!(
            "    {:<10} n={:<2} quality={:.2} confidence={:.2} latency={:.0} ms",
            category.category, category.count, category.avg_quality, category.avg_confidence, category.avg_latency_ms
        );
    }

    let failures: Vec<_> = results.questions.iter().filter(|q| q.error.is_some()).collect();
    if !failures.is_empty() {
        println!("\n  Failures:");
        for failure in failures {
            println!("    {} -> {}", failure.question, failure.error.as_deref().unwrap_or_default());
        }
    }
}
