use autoheal_core::{BugType, FixContext, SuggestionService};
use autoheal_gemini::{GeminiClient, GeminiConfig, GeminiError};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

fn reply(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
}

fn client(base_url: &str) -> GeminiClient {
    GeminiClient::new(
        GeminiConfig::new("test-key")
            .with_base_url(base_url)
            .with_timeout_secs(5),
    )
    .unwrap()
}

fn base_url(server: &MockServer) -> String {
    format!("{}/v1beta", server.uri())
}

#[tokio::test]
async fn suggestions_are_parsed_from_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_string_contains("File path: calc.py"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply(
            "LINE:2 TYPE:LOGIC MSG:Comparison is inverted\nLINE:x TYPE:SYNTAX",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let failures = client(&base_url(&server))
        .suggest_failures("calc.py", "a = 1\nif a < 0:\n    pass\n")
        .await;

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].location(), ("calc.py", 2));
    assert_eq!(failures[0].bug_type, BugType::Logic);
}

#[tokio::test]
async fn description_is_trimmed_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(reply("  Added missing colon to if.  ")),
        )
        .mount(&server)
        .await;
    let context = FixContext {
        file: "a.py".to_string(),
        line: 1,
        bug_type: BugType::Syntax,
        snippet: "if x".to_string(),
    };

    let description = client(&base_url(&server)).fix_description(&context).await;

    assert_eq!(description.as_deref(), Some("Added missing colon to if."));
}

#[tokio::test]
async fn error_status_is_absorbed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(serde_json::json!({ "error": "boom" })),
        )
        .mount(&server)
        .await;

    let client = client(&base_url(&server));

    assert!(client.suggest_failures("a.py", "x = 1\n").await.is_empty());
}

#[tokio::test]
async fn error_status_surfaces_from_generate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("{}"))
        .mount(&server)
        .await;

    let err = client(&base_url(&server)).generate("hello").await.unwrap_err();

    assert!(matches!(err, GeminiError::Status { status: 403, .. }));
}

#[tokio::test]
async fn empty_candidates_are_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidates": [] })),
        )
        .mount(&server)
        .await;

    let err = client(&base_url(&server)).generate("hello").await.unwrap_err();

    assert!(matches!(err, GeminiError::EmptyResponse));
}

#[tokio::test]
async fn unreachable_endpoint_yields_nothing() {
    // Bind then drop to get a port with nothing listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = client(&format!("http://{}/v1beta", addr));
    let context = FixContext {
        file: "a.py".to_string(),
        line: 1,
        bug_type: BugType::Linting,
        snippet: "import os".to_string(),
    };

    assert!(client.suggest_failures("a.py", "import os\n").await.is_empty());
    assert!(client.fix_description(&context).await.is_none());
}
