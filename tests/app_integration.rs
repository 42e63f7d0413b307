use std::fs;
use std::sync::Arc;
use tracing::info;

use fundwise::agent::{FundAgent, Stage};
use fundwise::core::config::{CacheConfig, LlmConfig, MfapiConfig};
use fundwise::providers::{MfapiProvider, OpenAiChatProvider};
use fundwise::store::MemoryCache;

mod test_utils {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const SCHEME_CODE: &str = "118550";

    /// Mock MFAPI server with a small catalogue and one detail route.
    pub async fn create_mfapi_mock_server() -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"schemeCode": 118550, "schemeName": "HDFC Top 100 Fund - Growth"},
                {"schemeCode": 120503, "schemeName": "SBI Bluechip Fund - Direct"},
                {"schemeCode": 100001, "schemeName": "Axis Midcap Fund"}
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/{SCHEME_CODE}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {
                    "fund_house": "HDFC Mutual Fund",
                    "scheme_type": "Open Ended",
                    "scheme_category": "Equity Scheme - Large Cap",
                    "scheme_name": "HDFC Top 100 Fund - Growth"
                },
                "data": [
                    {"date": "28-08-2026", "nav": "110.50"},
                    {"date": "28-07-2026", "nav": "108.00"},
                    {"date": "28-08-2025", "nav": "100.00"}
                ],
                "status": "SUCCESS"
            })))
            .mount(&mock_server)
            .await;

        mock_server
    }

    /// Mounts three chat-completion responses consumed in order.
    pub async fn create_llm_mock_server(responses: [&str; 3]) -> MockServer {
        let mock_server = MockServer::start().await;
        for response in responses {
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "choices": [{
                        "message": {"role": "assistant", "content": response},
                        "finish_reason": "stop"
                    }]
                })))
                .up_to_n_times(1)
                .mount(&mock_server)
                .await;
        }
        mock_server
    }
}

fn mfapi_provider(base_url: &str) -> MfapiProvider {
    let config = MfapiConfig {
        base_url: base_url.to_string(),
        ..Default::default()
    };
    let cache = Arc::new(MemoryCache::<String, Vec<u8>>::new(64));
    MfapiProvider::new(&config, &CacheConfig::default(), cache).expect("provider")
}

fn llm_provider(base_url: &str) -> OpenAiChatProvider {
    let config = LlmConfig {
        base_url: base_url.to_string(),
        ..Default::default()
    };
    OpenAiChatProvider::new_with_key(&config, "sk-test".to_string()).expect("provider")
}

#[test_log::test(tokio::test)]
async fn test_search_command_flow_with_mock() {
    let mock_server = test_utils::create_mfapi_mock_server().await;

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
        mfapi:
          base_url: {}
    "#,
        mock_server.uri()
    );
    fs::write(config_file.path(), &config_content).expect("Failed to write config file");

    let result = fundwise::run_command(
        fundwise::AppCommand::Search {
            query: "hdfc".to_string(),
            limit: 10,
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Search failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_fund_command_flow_with_mock() {
    let mock_server = test_utils::create_mfapi_mock_server().await;

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
        mfapi:
          base_url: {}
        cache:
          enabled: false
    "#,
        mock_server.uri()
    );
    fs::write(config_file.path(), &config_content).expect("Failed to write config file");

    let result = fundwise::run_command(
        fundwise::AppCommand::Fund {
            scheme_code: test_utils::SCHEME_CODE.to_string(),
            history: false,
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Fund failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_ask_pipeline_end_to_end() {
    let mfapi_server = test_utils::create_mfapi_mock_server().await;
    let llm_server = test_utils::create_llm_mock_server([
        "1. Funds mentioned: HDFC Top 100\n2. Information need: performance",
        "The fund gained 10.5% over the past year with steady NAV growth.",
        "HDFC Top 100 has returned 10.5% over the last year.",
    ])
    .await;

    let funds = Arc::new(mfapi_provider(&mfapi_server.uri()));
    let generator = Arc::new(llm_provider(&llm_server.uri()));
    let agent = FundAgent::new(funds, generator, 0.1);

    info!("Running pipeline against mock servers");
    let response = agent
        .run("How has HDFC Top 100 performed over the last year?")
        .await
        .expect("pipeline should succeed");

    assert_eq!(
        response,
        "HDFC Top 100 has returned 10.5% over the last year."
    );
}

#[test_log::test(tokio::test)]
async fn test_ask_pipeline_no_match_returns_fixed_message() {
    let mfapi_server = test_utils::create_mfapi_mock_server().await;
    // Third response is never consumed: the final stage is skipped.
    let llm_server = test_utils::create_llm_mock_server([
        "1. Funds mentioned: none",
        "[\"gold etf\", \"commodity fund\"]",
        "unused",
    ])
    .await;

    let funds = Arc::new(mfapi_provider(&mfapi_server.uri()));
    let generator = Arc::new(llm_provider(&llm_server.uri()));
    let agent = FundAgent::new(funds, generator, 0.1);

    let response = agent
        .run("Any good gold ETFs?")
        .await
        .expect("pipeline should succeed");

    assert_eq!(response, fundwise::agent::NO_FUNDS_RESPONSE);
}

#[test_log::test(tokio::test)]
async fn test_ask_pipeline_streaming_with_mocks() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    let mfapi_server = test_utils::create_mfapi_mock_server().await;

    let llm_server = wiremock::MockServer::start().await;
    for response in [
        "1. Funds mentioned: HDFC Top 100",
        "Solid long-term performance.",
    ] {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {"role": "assistant", "content": response},
                    "finish_reason": "stop"
                }]
            })))
            .up_to_n_times(1)
            .mount(&llm_server)
            .await;
    }
    // Final stage streams over SSE
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"A strong \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"large-cap pick.\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(sse_body)
                .insert_header("Content-Type", "text/event-stream"),
        )
        .mount(&llm_server)
        .await;

    let funds = Arc::new(mfapi_provider(&mfapi_server.uri()));
    let generator = Arc::new(llm_provider(&llm_server.uri()));
    let agent = FundAgent::new(funds, generator, 0.1);

    let (tx, mut rx) = tokio::sync::mpsc::channel(32);
    agent
        .run_stream("Is HDFC Top 100 a good pick?", tx)
        .await
        .expect("pipeline should succeed");

    let mut chunks = Vec::new();
    while let Some(chunk) = rx.recv().await {
        chunks.push(chunk);
    }

    let progress: Vec<&str> = chunks[..4].iter().map(|c| c.as_str()).collect();
    assert_eq!(
        progress,
        vec![
            Stage::AnalyzeQuery.progress_message(),
            Stage::SearchFunds.progress_message(),
            Stage::FetchDetails.progress_message(),
            Stage::AnalyzeFunds.progress_message(),
        ]
    );
    assert_eq!(chunks[4..].join(""), "A strong large-cap pick.");
}

#[test_log::test(tokio::test)]
async fn test_search_results_cached_across_calls() {
    let mock_server = test_utils::create_mfapi_mock_server().await;
    let funds = mfapi_provider(&mock_server.uri());

    use fundwise::core::fund::FundDataProvider;
    let first = funds.search_funds("hdfc", 10).await;
    let second = funds.search_funds("hdfc", 10).await;

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].scheme_code, test_utils::SCHEME_CODE);
    assert_eq!(first, second);

    // Catalogue endpoint was hit exactly once
    let catalogue_hits = mock_server
        .received_requests()
        .await
        .expect("requests recorded")
        .iter()
        .filter(|r| r.url.path() == "/")
        .count();
    assert_eq!(catalogue_hits, 1);
}
