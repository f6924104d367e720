use askai_llm::{
    classify_provider_error, CompletionOptions, CompletionProvider, DeltaSink, OpenAIConfig,
    OpenAIProvider, ProviderError,
};
use askai_types::{ErrorKind, Message, ProviderId, ReasoningEffort};
use mockito::Matcher;

fn sse(events: &[&str]) -> String {
    events
        .iter()
        .map(|e| format!("event: x\ndata: {}\n\n", e))
        .collect()
}

fn provider(server: &mockito::Server) -> OpenAIProvider {
    OpenAIProvider::new(OpenAIConfig::new("test-key").with_base_url(server.url())).unwrap()
}

#[tokio::test]
async fn test_streams_deltas_and_reports_resolved_model() {
    let mut server = mockito::Server::new_async().await;
    let body = sse(&[
        r#"{"type":"response.created","response":{"id":"r1"}}"#,
        r#"{"type":"response.output_item.added","item":{"type":"web_search_call","id":"ws1"}}"#,
        r#"{"type":"response.output_text.delta","delta":"Hel"}"#,
        r#"{"type":"response.output_text.delta","delta":"lo"}"#,
        r#"{"type":"response.completed","response":{"model":"gpt-4.1-nano-2025-04-14"}}"#,
    ]);
    let mock = server
        .mock("POST", "/responses")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "gpt-4.1-nano",
            "instructions": "be brief",
            "stream": true,
            "input": [{ "role": "user", "content": "hi" }]
        })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let (sink, mut rx) = DeltaSink::channel();
    let messages = vec![Message::system("t", "be brief"), Message::user("t", "hi")];
    let options = CompletionOptions::new()
        .with_model("gpt-4.1-nano")
        .with_delta_sink(sink);

    let result = provider(&server).complete(&messages, options).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.content, "Hello");
    assert_eq!(result.model, "gpt-4.1-nano-2025-04-14");
    assert_eq!(result.used_web_search, Some(true));
    assert_eq!(rx.recv().await.unwrap(), "Hel");
    assert_eq!(rx.recv().await.unwrap(), "Hello");
}

#[tokio::test]
async fn test_reasoning_effort_sent_for_reasoning_model() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/responses")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "gpt-5-mini",
            "reasoning": { "effort": "medium" }
        })))
        .with_status(200)
        .with_body(sse(&[r#"{"type":"response.output_text.delta","delta":"ok"}"#]))
        .create_async()
        .await;

    let options = CompletionOptions::new()
        .with_model("gpt-5-mini")
        .with_reasoning_effort(ReasoningEffort::Medium);
    let result = provider(&server)
        .complete(&[Message::user("t", "think")], options)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.content, "ok");
    assert_eq!(result.model, "gpt-5-mini");
    assert_eq!(result.used_web_search, Some(false));
}

#[tokio::test]
async fn test_unauthorized_is_classified_as_auth() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/responses")
        .with_status(401)
        .with_body(r#"{"error":{"message":"Incorrect API key"}}"#)
        .create_async()
        .await;

    let err = provider(&server)
        .complete(&[Message::user("t", "hi")], CompletionOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Http { status: 401, .. }));
    assert_eq!(classify_provider_error(ProviderId::OpenAiApi, &err).kind, ErrorKind::Auth);
}

#[tokio::test]
async fn test_rate_limit_is_classified() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/responses")
        .with_status(429)
        .create_async()
        .await;

    let err = provider(&server)
        .complete(&[Message::user("t", "hi")], CompletionOptions::new())
        .await
        .unwrap_err();

    assert_eq!(
        classify_provider_error(ProviderId::OpenAiApi, &err).kind,
        ErrorKind::RateLimit
    );
}

#[tokio::test]
async fn test_stream_error_event_fails_the_request() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/responses")
        .with_status(200)
        .with_body(sse(&[
            r#"{"type":"response.output_text.delta","delta":"par"}"#,
            r#"{"type":"error","message":"server overloaded"}"#,
        ]))
        .create_async()
        .await;

    let err = provider(&server)
        .complete(&[Message::user("t", "hi")], CompletionOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Stream(ref m) if m == "server overloaded"));
}

#[tokio::test]
async fn test_unreachable_host_is_network() {
    let provider =
        OpenAIProvider::new(OpenAIConfig::new("k").with_base_url("http://127.0.0.1:9")).unwrap();

    let err = provider
        .complete(&[Message::user("t", "hi")], CompletionOptions::new())
        .await
        .unwrap_err();

    assert_eq!(
        classify_provider_error(ProviderId::OpenAiApi, &err).kind,
        ErrorKind::Network
    );
}
