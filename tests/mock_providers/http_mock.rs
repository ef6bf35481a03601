//! Search index and chat completion mocks
//!
//! Both backends share one `wiremock` server; the search lives under
//! `/indexes/{index}/docs/search` and completions under
//! `/v1/chat/completions`.

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SEARCH_INDEX: &str = "kb";

pub fn search_path() -> String {
    format!("/indexes/{SEARCH_INDEX}/docs/search")
}

pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Answer searches with `documents`, after `delay`.
pub async fn mount_search(server: &MockServer, documents: &[&str], delay: Duration) {
    let value: Vec<_> = documents
        .iter()
        .map(|content| json!({ "@search.score": 1.0, "content": content }))
        .collect();
    Mock::given(method("POST"))
        .and(path(search_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "value": value }))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Answer completions with `answer`.
pub async fn mount_completion(server: &MockServer, answer: &str) {
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": answer } }]
        })))
        .mount(server)
        .await;
}

/// Fail every completion with `status`.
pub async fn mount_completion_failure(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string("upstream failure"))
        .mount(server)
        .await;
}

/// Fail the test if the completion backend is called at all.
pub async fn forbid_completion(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}
