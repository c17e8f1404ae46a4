//! OpenAI clients against a local stub server.

#![cfg(feature = "openai")]

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use ragbuilder_rag::openai::OpenAiClient;
use ragbuilder_rag::{Embedder, Generator, RagError};
use serde_json::{Value, json};

type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

fn record(seen: &Seen, headers: &HeaderMap, body: Value) {
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
    seen.lock().unwrap().push((auth, body));
}

async fn embeddings(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(&seen, &headers, body);
    Json(json!({"data": [{"embedding": [0.25, 0.75], "index": 0}]}))
}

async fn completions(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let refuse = body["model"] == "missing-model";
    record(&seen, &headers, body);
    if refuse {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"message": "model does not exist"}})),
        );
    }
    (StatusCode::OK, Json(json!({"choices": [{"message": {"role": "assistant", "content": "ok"}}]})))
}

async fn serve(seen: Seen) -> String {
    let app = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .route("/v1/chat/completions", post(completions))
        .with_state(seen);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn embeds_with_bearer_key() {
    let seen = Seen::default();
    let base_url = serve(seen.clone()).await;
    let embedder = OpenAiClient::new("sk-test").unwrap().with_base_url(base_url).embedder("emb");

    assert_eq!(embedder.embed("bonjour").await.unwrap(), vec![0.25, 0.75]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].0.as_deref(), Some("Bearer sk-test"));
    assert_eq!(seen[0].1, json!({"model": "emb", "input": "bonjour"}));
}

#[tokio::test]
async fn chat_sends_system_then_user_message() {
    let seen = Seen::default();
    let base_url = serve(seen.clone()).await;
    let generator = OpenAiClient::new("sk-test")
        .unwrap()
        .with_base_url(base_url)
        .generator("gpt")
        .with_system_prompt("Tu es un assistant.")
        .with_temperature(0.5)
        .with_max_tokens(64);

    assert_eq!(generator.generate("Contexte 1: A").await.unwrap(), "ok");

    let body = seen.lock().unwrap()[0].1.clone();
    assert_eq!(body["messages"][0], json!({"role": "system", "content": "Tu es un assistant."}));
    assert_eq!(body["messages"][1], json!({"role": "user", "content": "Contexte 1: A"}));
    assert_eq!(body["temperature"], 0.5);
    assert_eq!(body["max_tokens"], 64);
}

#[tokio::test]
async fn api_error_message_is_surfaced() {
    let base_url = serve(Seen::default()).await;
    let generator =
        OpenAiClient::new("sk-test").unwrap().with_base_url(base_url).generator("missing-model");

    match generator.generate("p").await.unwrap_err() {
        RagError::GenerationService { provider, status, message } => {
            assert_eq!(provider, "OpenAI");
            assert_eq!(status, Some(404));
            assert!(message.contains("model does not exist"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}
