mod metrics;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use deck::DeckError;
use metrics::{Metrics, MetricsSnapshot, TimedOperation};
use query::{AppConfig, DeckOutcome, GraphStats, Pipeline, PipelineError, Response};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

struct AppState {
    pipeline: Arc<Pipeline>,
    metrics: Arc<Metrics>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    neo4j: String,
    llm: String,
    model: String,
}

#[derive(Deserialize)]
struct StreamParams {
    question: String,
}

#[derive(Deserialize)]
struct QueryRequest {
    question: String,
}

#[derive(Serialize)]
struct QueryResponse {
    request_id: Uuid,
    #[serde(flatten)]
    response: Response,
}

#[derive(Deserialize)]
struct DeckRequest {
    cards: Vec<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(err: PipelineError) -> ApiError {
    let status = match &err {
        PipelineError::Deck(DeckError::WrongSize(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Deck(DeckError::UnknownCard(_)) => StatusCode::NOT_FOUND,
        PipelineError::Deck(DeckError::Lookup(_))
        | PipelineError::Translation(_)
        | PipelineError::Generation(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(ErrorBody { error: err.to_string() }))
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat/stream", get(chat_stream))
        .route("/api/query", post(run_query))
        .route("/api/deck/analyze", post(analyze_deck))
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/metrics", get(get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    query::telemetry::init_tracing();

    let config = AppConfig::from_env();
    let pipeline = query::connect(&config).await?;

    if !pipeline.test_connection().await {
        tracing::warn!(uri = %config.neo4j.uri, "Neo4j did not answer the connection probe");
    }

    let state = Arc::new(AppState {
        pipeline: Arc::new(pipeline),
        metrics: Metrics::new(),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on http://{}", config.bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StreamParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    state.metrics.record_stream();
    tracing::info!(question = %params.question, "stream requested");

    let events = state
        .pipeline
        .clone()
        .stream(params.question)
        .map(|event| Ok(Event::default().event(event.tag()).data(event.data())));

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn run_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let timer = TimedOperation::start();

    let outcome = state.pipeline.query(&req.question).await;
    state.metrics.record_query(timer.elapsed());
    state.metrics.record_request(outcome.is_ok());

    match outcome {
        Ok(response) => {
            tracing::info!(%request_id, confidence = response.confidence, "query answered");
            Ok(Json(QueryResponse { request_id, response }))
        }
        Err(e) => {
            tracing::warn!(%request_id, error = %e, "query failed");
            Err(api_error(e))
        }
    }
}

async fn analyze_deck(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeckRequest>,
) -> Result<Json<DeckOutcome>, ApiError> {
    let timer = TimedOperation::start();

    let outcome = state.pipeline.analyze_deck(req.cards).await;
    state.metrics.record_deck(timer.elapsed());
    state.metrics.record_request(outcome.is_ok());

    outcome.map(Json).map_err(api_error)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let neo4j = if state.pipeline.test_connection().await {
        "ok".to_string()
    } else {
        "error: connection probe failed".to_string()
    };

    let llm = match state.pipeline.test_model().await {
        Ok(()) => "ok".to_string(),
        Err(e) => e,
    };

    let status = if neo4j == "ok" && llm == "ok" { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        neo4j,
        llm,
        model: state.pipeline.model_name(),
    })
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<GraphStats>, ApiError> {
    state.pipeline.get_stats().await.map(Json).map_err(|e| {
        tracing::warn!(error = %e, "stats query failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody { error: e.to_string() }),
        )
    })
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use query::{GraphStore, LanguageModel, Params, PipelineOptions, Record};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    struct FixedModel(&'static str);

    #[async_trait::async_trait]
    impl LanguageModel for FixedModel {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    struct FixedStore;

    #[async_trait::async_trait]
    impl GraphStore for FixedStore {
        async fn run(&self, _cypher: &str, _params: Params) -> anyhow::Result<Vec<Record>> {
            let row = json!({"test": 1, "name": "Giant", "cost": 5});
            Ok(row.as_object().into_iter().cloned().collect())
        }
    }

    fn app() -> Router {
        let pipeline = Pipeline::new(
            Arc::new(FixedModel("MATCH (c:Card {name: 'Giant'}) RETURN c.name AS name")),
            Arc::new(FixedStore),
            PipelineOptions { word_delay: Duration::ZERO },
        );
        router(Arc::new(AppState {
            pipeline: Arc::new(pipeline),
            metrics: Metrics::new(),
        }))
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_both_probes() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model"], "fixed");
    }

    #[tokio::test]
    async fn test_stream_emits_tagged_events() {
        let response = app()
            .oneshot(
                Request::get("/api/chat/stream?question=What%20is%20the%20Giant%3F")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["content-type"], "text/event-stream");

        let body = body_text(response).await;
        assert!(body.contains("event: cypher\ndata: Translating question to graph query..."));
        assert!(body.contains("event: retrieval\ndata: Found 1 results"));
        assert!(body.contains("event: done\ndata: {\"sources\":[\"Giant\"]"));
    }

    #[tokio::test]
    async fn test_deck_size_error_is_unprocessable() {
        let request = Request::post("/api/deck/analyze")
            .header("content-type", "application/json")
            .body(Body::from(json!({"cards": ["Giant", "Giant"]}).to_string()))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "Deck must contain exactly 8 cards (got 2)");
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |err: PipelineError| api_error(err).0;
        assert_eq!(status(PipelineError::Deck(DeckError::UnknownCard("Tornado".into()))), StatusCode::NOT_FOUND);
        assert_eq!(
            status(PipelineError::Deck(DeckError::Lookup("Query execution error: timed out".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status(PipelineError::Translation("offline".into())), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_query_returns_request_id_and_answer() {
        let request = Request::post("/api/query")
            .header("content-type", "application/json")
            .body(Body::from(json!({"question": "What is the Giant?"}).to_string()))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["request_id"].is_string());
        assert_eq!(body["sources"], json!(["Giant"]));
    }
}
