//! Ollama clients and the HTTP store against a local stub server.

#![cfg(feature = "ollama")]

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use ragbuilder_rag::ollama::OllamaClient;
use ragbuilder_rag::{
    Embedder, Generator, HttpVectorStore, RagError, RagPipeline, VectorRecord, VectorStore,
    to_json,
};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Stub {
    requests: Arc<Mutex<Vec<Value>>>,
    embed_status: Option<StatusCode>,
    generate_body: Option<Value>,
}

async fn embeddings(State(stub): State<Stub>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    stub.requests.lock().unwrap().push(body.clone());
    if let Some(status) = stub.embed_status {
        return (status, Json(json!({"error": "model not loaded"})));
    }
    let prompt = body["prompt"].as_str().unwrap_or_default();
    let vector = if prompt.contains("chat") { vec![1.0, 0.0] } else { vec![0.0, 1.0] };
    (StatusCode::OK, Json(json!({ "embedding": vector })))
}

async fn generate(State(stub): State<Stub>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    stub.requests.lock().unwrap().push(body);
    match stub.generate_body {
        Some(reply) => (StatusCode::OK, Json(reply)),
        None => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"}))),
    }
}

async fn vectors() -> (StatusCode, String) {
    let records = vec![
        VectorRecord::new(1, "Le chien aboie.", vec![0.0, 1.0]),
        VectorRecord::new(2, "Le chat dort.", vec![1.0, 0.0]),
    ];
    (StatusCode::OK, to_json(&records).unwrap())
}

/// Serve the stub on an ephemeral port and return its base URL.
async fn serve(stub: Stub) -> String {
    let app = Router::new()
        .route("/api/embeddings", post(embeddings))
        .route("/api/generate", post(generate))
        .route("/data/vectors.json", get(vectors))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn reply(body: Value) -> Stub {
    Stub { generate_body: Some(body), ..Stub::default() }
}

#[tokio::test]
async fn embed_posts_model_and_prompt() {
    let stub = Stub::default();
    let base_url = serve(stub.clone()).await;
    let embedder = OllamaClient::new().unwrap().with_base_url(base_url).embedder("nomic-embed-text");

    let vector = embedder.embed("le chat").await.unwrap();

    assert_eq!(vector, vec![1.0, 0.0]);
    assert_eq!(
        stub.requests.lock().unwrap().as_slice(),
        &[json!({"model": "nomic-embed-text", "prompt": "le chat"})]
    );
}

#[tokio::test]
async fn embed_server_error_carries_status() {
    let stub = Stub { embed_status: Some(StatusCode::INTERNAL_SERVER_ERROR), ..Stub::default() };
    let base_url = serve(stub).await;
    let embedder = OllamaClient::new().unwrap().with_base_url(base_url).embedder("nomic-embed-text");

    let err = embedder.embed("x").await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    match err {
        RagError::EmbeddingService { provider, message, .. } => {
            assert_eq!(provider, "Ollama");
            assert!(message.contains("model not loaded"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn generate_disables_streaming_and_reads_response() {
    let stub = reply(json!({"response": "Bonjour", "done": true}));
    let base_url = serve(stub.clone()).await;
    let generator = OllamaClient::new().unwrap().with_base_url(base_url).generator("mistral");

    assert_eq!(generator.generate("Salut").await.unwrap(), "Bonjour");
    assert_eq!(
        stub.requests.lock().unwrap().as_slice(),
        &[json!({"model": "mistral", "prompt": "Salut", "stream": false})]
    );
}

#[tokio::test]
async fn generate_falls_back_to_generated_then_raw_body() {
    let base_url = serve(reply(json!({"response": "", "generated": "alt"}))).await;
    let generator = OllamaClient::new().unwrap().with_base_url(base_url).generator("mistral");
    assert_eq!(generator.generate("p").await.unwrap(), "alt");

    let base_url = serve(reply(json!({"text": "odd"}))).await;
    let generator = OllamaClient::new().unwrap().with_base_url(base_url).generator("mistral");
    assert_eq!(generator.generate("p").await.unwrap(), r#"{"text":"odd"}"#);
}

#[tokio::test]
async fn generate_server_error_is_generation_error() {
    let base_url = serve(Stub::default()).await;
    let generator = OllamaClient::new().unwrap().with_base_url(base_url).generator("mistral");

    let err = generator.generate("p").await.unwrap_err();
    assert!(matches!(err, RagError::GenerationService { status: Some(500), .. }));
}

#[tokio::test]
async fn unreachable_server_has_no_status() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let embedder =
        OllamaClient::new().unwrap().with_base_url(format!("http://{addr}")).embedder("m");

    let err = embedder.embed("x").await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingService { status: None, .. }));
}

#[tokio::test]
async fn http_store_loads_and_reports_missing_documents() {
    let base_url = serve(Stub::default()).await;

    let store = HttpVectorStore::new(format!("{base_url}/data/vectors.json")).unwrap();
    let records = store.load().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].text, "Le chat dort.");

    let missing = HttpVectorStore::new(format!("{base_url}/data/missing.json")).unwrap();
    let err = missing.load().await.unwrap_err();
    assert!(matches!(err, RagError::StoreUnavailable { location, .. } if location.ends_with("missing.json")));
}

#[tokio::test]
async fn answers_end_to_end_over_http() {
    let stub = reply(json!({"response": "Il dort."}));
    let base_url = serve(stub.clone()).await;
    let client = OllamaClient::new().unwrap().with_base_url(&base_url);
    let pipeline = RagPipeline::builder()
        .embedder(Arc::new(client.embedder("nomic-embed-text")))
        .generator(Arc::new(client.generator("mistral")))
        .vector_store(Arc::new(HttpVectorStore::new(format!("{base_url}/data/vectors.json")).unwrap()))
        .build()
        .unwrap();

    let result = pipeline.answer_question_with("Que fait le chat ?", 1).await.unwrap();

    assert_eq!(result.response, "Il dort.");
    assert_eq!(result.passages[0].id(), 2);
    let requests = stub.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1]["prompt"], result.prompt.as_str());
}

#[tokio::test]
async fn embedding_500_yields_no_result() {
    let stub = Stub {
        embed_status: Some(StatusCode::INTERNAL_SERVER_ERROR),
        generate_body: Some(json!({"response": "never"})),
        ..Stub::default()
    };
    let base_url = serve(stub.clone()).await;
    let client = OllamaClient::new().unwrap().with_base_url(&base_url);
    let pipeline = RagPipeline::builder()
        .embedder(Arc::new(client.embedder("nomic-embed-text")))
        .generator(Arc::new(client.generator("mistral")))
        .vector_store(Arc::new(HttpVectorStore::new(format!("{base_url}/data/vectors.json")).unwrap()))
        .build()
        .unwrap();

    let err = pipeline.answer_question("Que fait le chat ?").await.unwrap_err();

    assert!(matches!(err, RagError::EmbeddingService { status: Some(500), .. }));
    assert_eq!(stub.requests.lock().unwrap().len(), 1);
}
