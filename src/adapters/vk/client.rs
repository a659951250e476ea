//! Implements ApiPort over the VK method endpoint using reqwest.
//!
//! One GET per call: `{base_url}{method}?...&access_token=..&v=..`. No retries;
//! the caller decides what a failure means.

use crate::domain::DomainError;
use crate::ports::ApiPort;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Characters of a failing body kept in the error message.
const BODY_EXCERPT: usize = 200;

pub struct VkApiClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    version: String,
}

impl VkApiClient {
    pub fn new(base_url: String, access_token: String, version: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, access_token, version)
    }

    /// Reuse an existing connection pool (one per process is enough).
    pub fn with_client(
        client: reqwest::Client,
        base_url: String,
        access_token: String,
        version: String,
    ) -> Self {
        let base_url = if base_url.ends_with('/') {
            base_url
        } else {
            format!("{}/", base_url)
        };
        Self {
            client,
            base_url,
            access_token,
            version,
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}{}", self.base_url, method)
    }
}

#[derive(Deserialize)]
struct Envelope {
    response: Option<Value>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

fn excerpt(text: &str) -> String {
    text.chars().take(BODY_EXCERPT).collect()
}

/// Split a decoded body into payload or provider error.
fn unwrap_envelope(method: &str, body: &str) -> Result<Value, DomainError> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
        DomainError::Transport(format!(
            "{}: body is not valid JSON ({}): {}",
            method,
            e,
            excerpt(body)
        ))
    })?;

    if let Some(err) = envelope.error {
        return Err(DomainError::Api {
            code: err.error_code,
            message: err.error_msg,
        });
    }
    envelope
        .response
        .ok_or_else(|| DomainError::Transport(format!("{}: missing response", method)))
}

#[async_trait::async_trait]
impl ApiPort for VkApiClient {
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value, DomainError> {
        debug!(method, params = params.len(), "VK API call");

        let mut query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        query.push(("access_token", self.access_token.as_str()));
        query.push(("v", self.version.as_str()));

        let response = self
            .client
            .get(self.url(method))
            .query(&query)
            .send()
            .await
            .map_err(|e| DomainError::Transport(format!("{}: request failed: {}", method, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DomainError::Transport(format!("{}: reading body: {}", method, e)))?;

        if !status.is_success() {
            warn!(method, status = %status, "VK API returned non-success status");
            return Err(DomainError::Transport(format!(
                "{}: HTTP {}: {}",
                method,
                status,
                excerpt(&body)
            )));
        }

        let result = unwrap_envelope(method, &body);
        if let Err(DomainError::Api { code, message }) = &result {
            warn!(method, code, message = %message, "VK API error");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_returned() {
        let v = unwrap_envelope("wall.get", r#"{"response":{"count":0,"items":[]}}"#).unwrap();
        assert_eq!(v["count"], 0);
    }

    #[test]
    fn provider_error_wins_over_payload() {
        let err = unwrap_envelope(
            "wall.get",
            r#"{"error":{"error_code":5,"error_msg":"User authorization failed"}}"#,
        )
        .unwrap_err();
        match err {
            DomainError::Api { code, message } => {
                assert_eq!(code, 5);
                assert_eq!(message, "User authorization failed");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_or_empty_body_is_transport() {
        assert!(matches!(
            unwrap_envelope("wall.get", "<html>"),
            Err(DomainError::Transport(_))
        ));
        assert!(matches!(
            unwrap_envelope("wall.get", "{}"),
            Err(DomainError::Transport(m)) if m.contains("missing response")
        ));
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let c = VkApiClient::new(
            "http://localhost:1/method".into(),
            "t".into(),
            "5.131".into(),
        );
        assert_eq!(c.url("wall.get"), "http://localhost:1/method/wall.get");
    }
}
