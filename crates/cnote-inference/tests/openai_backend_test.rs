//! Integration tests for the OpenAI-compatible backend against a mock
//! HTTP server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cnote_core::{ChatRole, CompletionBackend, CompletionMessage, EmbeddingBackend, Error};
use cnote_inference::{OpenAIBackend, OpenAIConfig};

fn backend_for(server: &MockServer) -> OpenAIBackend {
    OpenAIBackend::new(OpenAIConfig {
        base_url: server.uri(),
        api_key: Some("test-key".to_string()),
        embed_model: "text-embedding-3-small".to_string(),
        gen_model: "deepseek-chat".to_string(),
        embed_dimension: 3,
        embed_batch_size: 2,
        embed_timeout_secs: 5,
        gen_timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_embed_reorders_shuffled_batch_indices() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"embedding": [1.0, 0.0, 0.0], "index": 1},
                {"embedding": [0.0, 1.0, 0.0], "index": 0}
            ],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 4, "total_tokens": 4}
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let vectors = backend
        .embed_texts(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0].as_slice(), &[0.0, 1.0, 0.0]);
    assert_eq!(vectors[1].as_slice(), &[1.0, 0.0, 0.0]);
}

#[tokio::test]
async fn test_embed_splits_into_batches() {
    let server = MockServer::start().await;

    // Batch size is 2, so three inputs make two requests.
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({"input": ["a", "b"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"embedding": [0.1, 0.0, 0.0], "index": 0},
                {"embedding": [0.2, 0.0, 0.0], "index": 1}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({"input": ["c"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"embedding": [0.3, 0.0, 0.0], "index": 0}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let vectors = backend
        .embed_texts(&["a".to_string(), "b".to_string(), "c".to_string()])
        .await
        .unwrap();

    assert_eq!(vectors.len(), 3);
    assert_eq!(vectors[2].as_slice(), &[0.3, 0.0, 0.0]);
}

#[tokio::test]
async fn test_embed_fails_whole_call_on_failed_batch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"message": "backend exploded"}
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend
        .embed_texts(&["a".to_string(), "b".to_string(), "c".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Embedding(_)));
    assert!(err.to_string().contains("backend exploded"));
}

#[tokio::test]
async fn test_embed_rejects_count_mismatch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"embedding": [0.1, 0.0, 0.0], "index": 0}
            ]
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend
        .embed_texts(&["a".to_string(), "b".to_string()])
        .await
        .unwrap_err();

    assert!(err.to_string().contains("expected 2 embeddings"));
}

#[tokio::test]
async fn test_complete_returns_final_answer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Your notes mention Kyoto."},
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let messages = [CompletionMessage::text(ChatRole::User, "where did I travel?")];
    let response = backend.complete("be helpful", &messages, &[]).await.unwrap();

    assert_eq!(response.content, "Your notes mention Kyoto.");
    assert!(response.tool_calls.is_empty());
}

#[tokio::test]
async fn test_complete_parses_tool_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "private_search_notes",
                            "arguments": "{\"query\":\"travel\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let messages = [CompletionMessage::text(ChatRole::User, "where did I travel?")];
    let response = backend.complete("", &messages, &[]).await.unwrap();

    assert!(response.content.is_empty());
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].id, "call_abc");
    assert_eq!(response.tool_calls[0].name, "private_search_notes");
    assert_eq!(response.tool_calls[0].arguments, json!({"query": "travel"}));
}

#[tokio::test]
async fn test_complete_malformed_tool_arguments_become_null() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": "call_bad",
                        "type": "function",
                        "function": {"name": "private_get_note", "arguments": "{not json"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let messages = [CompletionMessage::text(ChatRole::User, "hi")];
    let response = backend.complete("", &messages, &[]).await.unwrap();

    assert_eq!(response.tool_calls[0].arguments, serde_json::Value::Null);
}

#[tokio::test]
async fn test_complete_upstream_error_surfaces_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "rate limited"}
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let messages = [CompletionMessage::text(ChatRole::User, "hi")];
    let err = backend.complete("", &messages, &[]).await.unwrap_err();

    assert!(matches!(err, Error::Inference(_)));
    assert!(err.to_string().contains("rate limited"));
}

#[tokio::test]
async fn test_embed_empty_input_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let vectors = backend.embed_texts(&[]).await.unwrap();
    assert!(vectors.is_empty());
}
