//! Integration tests for the Ollama provider against a mock HTTP server
//!
//! Every test starts its own `wiremock::MockServer`; `.expect(n)` pins how many requests
//! the provider sends, which is what the retry policy is judged by.

use anyhow::Result;
use sage_infer::{
    CompletionProvider, EmbeddingProvider, InferError, OllamaConfig, OllamaProvider,
};
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(base_url: &str, max_retries: u32) -> Result<OllamaProvider> {
    let config = OllamaConfig::new(base_url, "llama3")
        .with_timeout(Duration::from_secs(5))
        .with_retries(max_retries, Duration::from_millis(10));
    Ok(OllamaProvider::new(config)?)
}

async fn request_bodies(server: &MockServer) -> Result<Vec<serde_json::Value>> {
    let requests = server.received_requests().await.unwrap_or_default();
    Ok(requests
        .iter()
        .map(|request| serde_json::from_slice(&request.body))
        .collect::<Result<_, _>>()?)
}

#[tokio::test]
async fn test_complete_parses_response() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"response": "Paris.", "done": true})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let provider = provider_for(&server.uri(), 0)?;

    let answer = provider.complete("What is the capital of France?").await?;
    assert_eq!(answer, "Paris.");

    let bodies = request_bodies(&server).await?;
    assert_eq!(bodies[0]["model"], "llama3");
    assert_eq!(bodies[0]["prompt"], "What is the capital of France?");
    assert_eq!(bodies[0]["stream"], false);
    assert_eq!(bodies[0]["options"]["temperature"], 0.75);
    Ok(())
}

#[tokio::test]
async fn test_server_error_is_retried() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "loading model"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "recovered"})))
        .expect(1)
        .mount(&server)
        .await;
    let provider = provider_for(&server.uri(), 1)?;

    assert_eq!(provider.complete("hello").await?, "recovered");
    Ok(())
}

#[tokio::test]
async fn test_server_error_exhausts_retries() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;
    let provider = provider_for(&server.uri(), 1)?;

    let err = provider.complete("hello").await.unwrap_err();
    assert!(matches!(err, InferError::Unavailable { .. }), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn test_client_error_is_invalid_response() -> Result<()> {
    let server = MockServer::start().await;
    // Not transient, so exactly one request is made despite the retry budget
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "model not found"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let provider = provider_for(&server.uri(), 3)?;

    let err = provider.complete("hello").await.unwrap_err();
    assert!(matches!(err, InferError::InvalidResponse { .. }), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": 1})))
        .expect(1)
        .mount(&server)
        .await;
    let provider = provider_for(&server.uri(), 0)?;

    let err = provider.complete("hello").await.unwrap_err();
    assert!(matches!(err, InferError::InvalidResponse { .. }), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn test_unresponsive_server_times_out() -> Result<()> {
    let server = MockServer::start().await;
    // Timeouts are not retried, so the delayed mock sees a single request
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "too late"}))
                .set_delay(Duration::from_secs(10)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = OllamaConfig::new(server.uri(), "llama3")
        .with_timeout(Duration::from_millis(200))
        .with_retries(2, Duration::from_millis(10));
    let provider = OllamaProvider::new(config)?;

    let started = Instant::now();
    let err = provider.complete("hello").await.unwrap_err();

    assert!(matches!(err, InferError::Timeout { .. }), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(2));
    Ok(())
}

#[tokio::test]
async fn test_refused_connection_is_unavailable() -> Result<()> {
    let base_url = {
        let server = MockServer::start().await;
        server.uri()
    };

    let provider = provider_for(&base_url, 2)?;
    let err = provider.complete("hello").await.unwrap_err();

    assert!(matches!(err, InferError::Unavailable { .. }), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn test_embed_texts_normalizes_vectors() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "nomic-embed-text",
            "embeddings": [[3.0, 4.0], [0.0, 2.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let provider = provider_for(&server.uri(), 0)?;

    let texts = vec!["first".to_string(), "second".to_string()];
    let result = provider.embed_texts(&texts).await?;

    assert_eq!(result.len(), 2);
    assert_eq!(result.dimension, 2);
    assert!((result.embeddings[0][0].to_f32() - 0.6).abs() < 1e-3);
    assert!((result.embeddings[1][1].to_f32() - 1.0).abs() < 1e-3);

    let bodies = request_bodies(&server).await?;
    assert_eq!(bodies[0]["model"], "nomic-embed-text");
    assert_eq!(bodies[0]["input"], json!(["first", "second"]));
    Ok(())
}

#[tokio::test]
async fn test_embed_count_mismatch_is_invalid_response() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 0.0]]})))
        .expect(1)
        .mount(&server)
        .await;
    let provider = provider_for(&server.uri(), 0)?;

    let texts = vec!["one".to_string(), "two".to_string()];
    let err = provider.embed_texts(&texts).await.unwrap_err();
    assert!(matches!(err, InferError::InvalidResponse { .. }), "got {err:?}");
    Ok(())
}
