use std::time::Duration;

use reqwest::Client;
use reqwest::Response;
use reqwest::header::HeaderMap;
use serde_json::Value;

use super::error::ProviderError;

/// Hard ceiling on a provider response body.
pub(super) const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ERROR_MESSAGE_CHARS: usize = 200;

pub(super) fn build_client() -> Result<Client, ProviderError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|err| ProviderError::Config(format!("failed to build HTTP client: {err}")))
}

/// POSTs `body` as JSON and returns the parsed JSON response.
pub(super) async fn post_json(
    client: &Client,
    url: &str,
    headers: HeaderMap,
    body: &Value,
) -> Result<Value, ProviderError> {
    let mut response = client
        .post(url)
        .headers(headers)
        .json(body)
        .send()
        .await
        .map_err(|err| ProviderError::Transport(err.to_string()))?;

    let status = response.status();
    let bytes = read_response_limited(&mut response, MAX_RESPONSE_BYTES).await?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            status: status.as_u16(),
            message: extract_error_message(&bytes),
        });
    }

    serde_json::from_slice(&bytes)
        .map_err(|err| ProviderError::Protocol(format!("response is not JSON: {err}")))
}

/// Reads the response body while enforcing a byte limit.
async fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, ProviderError> {
    if let Some(expected) = response.content_length() {
        let expected = usize::try_from(expected).unwrap_or(usize::MAX);
        if expected > max_bytes {
            return Err(ProviderError::ResponseTooLarge { actual: expected, limit: max_bytes });
        }
    }

    let mut buf = Vec::new();
    while let Some(chunk) =
        response.chunk().await.map_err(|err| ProviderError::Transport(err.to_string()))?
    {
        buf.extend_from_slice(&chunk);
        if buf.len() > max_bytes {
            return Err(ProviderError::ResponseTooLarge { actual: buf.len(), limit: max_bytes });
        }
    }
    Ok(buf)
}

/// Pulls a human-readable message out of an error body.
///
/// Understands `{"error": {"message": ..}}` and `{"error": ".."}`; anything
/// else is returned as truncated text.
fn extract_error_message(body: &[u8]) -> String {
    if let Ok(json) = serde_json::from_slice::<Value>(body) {
        let message = json
            .pointer("/error/message")
            .or_else(|| json.get("error"))
            .or_else(|| json.get("message"))
            .and_then(Value::as_str);
        if let Some(message) = message {
            return message.to_string();
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "no response body".to_string();
    }
    text.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}
