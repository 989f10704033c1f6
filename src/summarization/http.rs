//! Request plumbing shared by the HTTP summarization providers.
//!
//! Status mapping: transport failures and timeouts are `ProviderUnavailable`, a `404` is
//! `ProviderUnavailable` (wrong base URL or unknown model), any other non-success status is
//! `GenerationFailed`, and an undecodable body is `InvalidResponse`.

use super::SummarizationClientError;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Build a reqwest client whose every request is bounded by `timeout`.
pub(super) fn build_http_client(timeout: Duration) -> Result<Client, SummarizationClientError> {
    Client::builder()
        .user_agent("prebep-index/summary")
        .timeout(timeout)
        .build()
        .map_err(|error| {
            SummarizationClientError::ProviderUnavailable(format!(
                "failed to construct HTTP client: {error}"
            ))
        })
}

/// Send a prepared request and decode a successful JSON answer.
pub(super) async fn send_json<T>(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<T, SummarizationClientError>
where
    T: DeserializeOwned,
{
    let response = request.send().await.map_err(|error| {
        let reason = if error.is_timeout() {
            "timed out"
        } else {
            "request failed"
        };
        SummarizationClientError::ProviderUnavailable(format!("{provider} {reason}: {error}"))
    })?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(SummarizationClientError::ProviderUnavailable(format!(
            "{provider} endpoint {} returned 404",
            response.url()
        )));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SummarizationClientError::GenerationFailed(format!(
            "{provider} returned {status}: {body}"
        )));
    }

    response.json().await.map_err(|error| {
        SummarizationClientError::InvalidResponse(format!(
            "failed to decode {provider} response: {error}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Reply {
        text: String,
    }

    async fn post(server: &MockServer) -> Result<Reply, SummarizationClientError> {
        let http = build_http_client(Duration::from_secs(5)).expect("client");
        send_json("Test", http.post(server.url("/generate"))).await
    }

    #[tokio::test]
    async fn decodes_successful_json() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/generate");
                then.status(200).json_body(serde_json::json!({ "text": "ok" }));
            })
            .await;

        let reply = post(&server).await.expect("reply");
        assert_eq!(reply.text, "ok");
    }

    #[tokio::test]
    async fn not_found_means_provider_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(404);
            })
            .await;

        let error = post(&server).await.expect_err("404");
        assert!(
            matches!(
                &error,
                SummarizationClientError::ProviderUnavailable(message) if message.contains("404")
            ),
            "unexpected error: {error}"
        );
    }

    #[tokio::test]
    async fn undecodable_body_is_invalid_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).body("<html>proxy error</html>");
            })
            .await;

        let error = post(&server).await.expect_err("not json");
        assert!(matches!(error, SummarizationClientError::InvalidResponse(_)));
    }
}
