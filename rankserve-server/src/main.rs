//! RankServe REST API Server with Actix-web and Apistos OpenAPI
//!
//! Serves per-request retrieval / reranking / RAG pipelines where every
//! stage is chosen by the caller, plus arena evaluation and a pipeline
//! advisor.
//!
//! ## Quick Start
//!
//! ```bash
//! # Start the server (demo corpora built in, no downloads needed)
//! cargo run --bin rankserve-server
//!
//! # Run a retrieve-only pipeline
//! curl -X POST localhost:8080/pipeline \
//!   -H 'Content-Type: application/json' \
//!   -d '{"query": "capital of France", "mode": "retrieve", "n_docs": 2}'
//!
//! # View Swagger UI spec
//! # Browser: http://localhost:8080/openapi.json
//! ```
//!
//! ## Environment
//!
//! - `RANKSERVE_ADDR` - bind address (default 0.0.0.0:8080)
//! - `RANKSERVE_CACHE_DIR` - qrels/dataset cache (default .rankserve-cache)
//! - `RANKSERVE_DATA_URL` - benchmark download base URL
//! - `RANKSERVE_CORPUS` - JSON file backing the "custom" data source
//! - `RANKSERVE_TOKEN_DELAY_MS` - streaming token pacing (default 20)

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{
    web::{self, Data, Json},
    App, HttpResponse, HttpServer, Responder,
};
use apistos::{
    api_operation,
    app::OpenApiWrapper,
    info::Info,
    spec::Spec,
    web::{get, post, resource, scope},
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

mod demo_corpus;
mod models;
mod validation;

use models::*;
use validation::{validate_arena_queries, validate_counts, validate_query};

use rankserve_core::arena::{ArenaEvaluator, DatasetStore, QrelStore};
use rankserve_core::cache::{AgentSessionCache, ComponentCache};
use rankserve_core::catalog;
use rankserve_core::config::DataSource;
use rankserve_core::core::RankServeError;
use rankserve_core::corpus::Corpus;
use rankserve_core::pipeline::{ComponentRegistry, PipelineRunner};
use rankserve_core::streaming::{answer_tokens, stream_pipeline, StreamEvent, StreamOptions};

const DEFAULT_DATA_URL: &str = "https://raw.githubusercontent.com/rankserve/benchmark-data/main";

/// Application state shared across requests
#[derive(Clone)]
struct AppState {
    runner: Arc<PipelineRunner>,
    agents: Arc<AgentSessionCache>,
    arena: Arc<ArenaEvaluator>,
    stream_options: StreamOptions,
}

impl AppState {
    fn new() -> Self {
        let mut registry = ComponentRegistry::new()
            .with_corpus(DataSource::Wiki, demo_corpus::wiki())
            .with_corpus(DataSource::Msmarco, demo_corpus::msmarco());

        // Optional user corpus behind the "custom" data source
        if let Ok(path) = std::env::var("RANKSERVE_CORPUS") {
            match Corpus::from_json_file("custom", &path) {
                Ok(corpus) => {
                    tracing::info!("loaded custom corpus from {path} ({} docs)", corpus.len());
                    registry = registry.with_corpus(DataSource::Custom, corpus);
                },
                Err(err) => {
                    tracing::warn!("could not load custom corpus from {path}: {err}");
                },
            }
        }

        let cache_dir =
            std::env::var("RANKSERVE_CACHE_DIR").unwrap_or_else(|_| ".rankserve-cache".to_string());
        let data_url =
            std::env::var("RANKSERVE_DATA_URL").unwrap_or_else(|_| DEFAULT_DATA_URL.to_string());

        let pacing_ms = std::env::var("RANKSERVE_TOKEN_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(20);

        let cache = Arc::new(ComponentCache::new());
        let runner = Arc::new(PipelineRunner::new(cache, Arc::new(registry)));
        let arena = Arc::new(ArenaEvaluator::new(
            runner.clone(),
            DatasetStore::new(cache_dir.clone(), data_url.clone()),
            QrelStore::new(cache_dir, data_url),
        ));

        Self {
            runner,
            agents: Arc::new(AgentSessionCache::new()),
            arena,
            stream_options: StreamOptions {
                pacing: Duration::from_millis(pacing_ms),
                compare: false,
            },
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// Root endpoint - API information
#[api_operation(
    tag = "info",
    summary = "Get API information",
    description = "Returns basic information about the RankServe API and its endpoints"
)]
async fn root() -> impl Responder {
    Json(serde_json::json!({
        "name": "RankServe API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "GET /health",
            "models": "GET /models",
            "pipeline": "POST /pipeline",
            "pipeline_stream": "POST /pipeline/stream (SSE)",
            "arena": "POST /api/arena/run",
            "agent_chat": "POST /api/agent/chat (SSE)"
        }
    }))
}

/// Health check endpoint
#[api_operation(
    tag = "health",
    summary = "Health check",
    description = "Returns process status and the key lists of every component cache"
)]
async fn health(state: Data<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let snapshot = state.runner.cache().snapshot().await;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        cached_retrievers: snapshot.retrievers,
        cached_rerankers: snapshot.rerankers,
        cached_generators: snapshot.generators,
        cached_agent_sessions: state.agents.keys().await,
    }))
}

/// List all supported models
#[api_operation(
    tag = "info",
    summary = "List supported models",
    description = "Static catalog of retriever, reranker, generator and RAG-method identifiers"
)]
async fn list_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        retrievers: catalog::retrievers()
            .into_iter()
            .map(String::from)
            .collect(),
        reranker_categories: catalog::reranker_catalog()
            .into_iter()
            .map(|(category, models)| {
                (
                    category.to_string(),
                    models.iter().map(|m| m.to_string()).collect(),
                )
            })
            .collect(),
        generators: catalog::generators().iter().map(|g| g.to_string()).collect(),
        rag_methods: catalog::rag_methods().iter().map(|m| m.to_string()).collect(),
        arena_datasets: catalog::arena_datasets()
            .iter()
            .map(|d| d.to_string())
            .collect(),
    })
}

/// Run the pipeline synchronously
#[api_operation(
    tag = "pipeline",
    summary = "Run a pipeline",
    description = "Run retrieve / rerank / rag based on the mode parameter. Every stage is \
                   chosen per request. Stage failures come back as a populated error field \
                   with whatever stages completed.",
    error_code = 400
)]
async fn pipeline(
    state: Data<AppState>,
    body: Json<PipelineRequest>,
) -> Result<Json<PipelineResponse>, ApiError> {
    let request = body.into_inner();
    if let Err(e) = validate_query(&request.query) {
        tracing::warn!(error = %e.error, "invalid pipeline query");
        return Err(ApiError::BadRequest(e.error));
    }
    if let Err(e) = validate_counts(request.n_docs, request.n_contexts) {
        return Err(ApiError::BadRequest(e.error));
    }

    let config = request.to_config();
    let result = state.runner.run(&request.query, &config).await;
    if let Some(error) = &result.error {
        tracing::error!(query = %request.query, error = %error, "pipeline stage failed");
    }
    Ok(Json(result.into()))
}

/// Run an arena comparison
#[api_operation(
    tag = "arena",
    summary = "Compare two pipelines on a benchmark",
    description = "Runs both configurations' reranking over the same sampled queries and \
                   reports NDCG@10, MRR@10 (0-100) and mean rerank latency.",
    error_code = 400,
    error_code = 404,
    error_code = 500
)]
async fn arena_run(
    state: Data<AppState>,
    body: Json<ArenaRequest>,
) -> Result<Json<ArenaResponse>, ApiError> {
    let request = body.into_inner();
    if !catalog::arena_datasets().contains(&request.dataset.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "unknown dataset '{}'",
            request.dataset
        )));
    }
    if let Err(e) = validate_arena_queries(request.n_queries) {
        return Err(ApiError::BadRequest(e.error));
    }

    let config_a = request.pipeline_a.to_config();
    let config_b = request.pipeline_b.to_config();

    match state
        .arena
        .compare(
            &request.dataset,
            request.n_docs,
            request.n_queries,
            &config_a,
            &config_b,
        )
        .await
    {
        Ok(result) => Ok(Json(result.into())),
        Err(RankServeError::Dataset { message }) => Err(ApiError::NotFound(message)),
        Err(err) => Err(ApiError::InternalError(err.to_string())),
    }
}

// ============================================================================
// Streaming Handlers (SSE, registered outside the OpenAPI document)
// ============================================================================

/// Bridge a stream-event channel into an SSE response body.
fn sse_response(rx: mpsc::Receiver<StreamEvent>) -> HttpResponse {
    let body = ReceiverStream::new(rx).map(|event| {
        let payload = serde_json::to_string(&event).unwrap_or_else(|_| {
            r#"{"type":"error","message":"event serialization failed"}"#.to_string()
        });
        Ok::<_, actix_web::Error>(web::Bytes::from(format!("data: {payload}\n\n")))
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(body)
}

/// Same as /pipeline but delivers the run incrementally over SSE.
async fn pipeline_stream(state: Data<AppState>, body: Json<PipelineRequest>) -> HttpResponse {
    let request = body.into_inner();
    if let Err(e) = validate_query(&request.query) {
        return HttpResponse::BadRequest().json(e);
    }
    if let Err(e) = validate_counts(request.n_docs, request.n_contexts) {
        return HttpResponse::BadRequest().json(e);
    }

    let config = request.to_config();
    let options = StreamOptions {
        compare: request.compare,
        ..state.stream_options.clone()
    };

    let (tx, rx) = mpsc::channel::<StreamEvent>(32);
    let runner = state.runner.clone();
    let query = request.query.clone();
    tokio::spawn(async move {
        stream_pipeline(runner, query, config, options, tx).await;
    });

    sse_response(rx)
}

/// Conversational advisor: token stream plus a structured recommendation.
async fn agent_chat(state: Data<AppState>, body: Json<AgentChatRequest>) -> HttpResponse {
    let request = body.into_inner();
    if request.message.trim().is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "message cannot be empty",
            "field": "message",
        }));
    }
    let session_id = if request.session_id.trim().is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        request.session_id.clone()
    };

    let (tx, rx) = mpsc::channel::<StreamEvent>(32);
    let agents = state.agents.clone();
    let pacing = state.stream_options.pacing;
    tokio::spawn(async move {
        let session = agents.session(&session_id).await;
        let reply = session.lock().await.respond(&request.message);

        for content in answer_tokens(&reply.text) {
            if tx.send(StreamEvent::Token { content }).await.is_err() {
                return;
            }
            if !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
        }
        if let Some(recommendation) = reply.recommendation {
            if tx
                .send(StreamEvent::Recommendation(recommendation))
                .await
                .is_err()
            {
                return;
            }
        }
        let _ = tx.send(StreamEvent::Done).await;
    });

    sse_response(rx)
}

// ============================================================================
// Main Server Configuration
// ============================================================================

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let state = AppState::new();
    let state_data = Data::new(state);

    let spec = Spec {
        info: Info {
            title: "RankServe API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: Some(
                concat!(
                    "Per-request retrieval / reranking / RAG pipelines.\n\n",
                    "## Getting Started\n",
                    "1. Inspect supported models via `GET /models`\n",
                    "2. Run a pipeline via `POST /pipeline`\n",
                    "3. Stream a RAG run via `POST /pipeline/stream`\n",
                    "4. Compare two pipelines via `POST /api/arena/run`\n"
                )
                .to_string(),
            ),
            ..Default::default()
        },
        ..Default::default()
    };

    let addr =
        std::env::var("RANKSERVE_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    tracing::info!("RankServe server starting on http://{addr}");
    tracing::info!("OpenAPI spec: http://{addr}/openapi.json");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .document(spec.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .app_data(state_data.clone())
            .app_data(web::PayloadConfig::new(validation::MAX_BODY_SIZE))
            .app_data(web::JsonConfig::default().limit(validation::MAX_BODY_SIZE))
            // Public routes
            .service(resource("/").route(get().to(root)))
            .service(resource("/health").route(get().to(health)))
            .service(resource("/models").route(get().to(list_models)))
            .service(resource("/pipeline").route(post().to(pipeline)))
            .service(scope("/api").service(resource("/arena/run").route(post().to(arena_run))))
            // Build OpenAPI spec endpoint
            .build("/openapi.json")
            // SSE endpoints (plain Actix-web routing - added after .build() -
            // not in the OpenAPI doc)
            .service(
                web::resource("/pipeline/stream").route(web::post().to(pipeline_stream)),
            )
            .service(
                web::resource("/api/agent/chat").route(web::post().to(agent_chat)),
            )
    })
    .bind(addr)?
    .run()
    .await
}
