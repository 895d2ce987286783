//! Chat client error types.

use thiserror::Error;

/// Errors that can occur when making a streaming chat call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// API returned a non-success status. `reason` is the classified
    /// human-readable explanation for the status code.
    #[error("{reason} (status {status}): {body}")]
    Api {
        status: u16,
        reason: String,
        body: String,
    },

    /// Connection-level failure (DNS, refused, reset, timeout).
    #[error("network connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    /// Request could not be sent for a non-connectivity reason.
    #[error("chat completion call failed: {0}")]
    Request(#[source] reqwest::Error),

    /// Response body stream failed mid-read.
    #[error("response stream failed: {0}")]
    Stream(#[source] reqwest::Error),
}

/// Human-readable classification for a non-success status code.
pub(crate) fn classify_status(status: u16) -> String {
    match status {
        401 => "API key is invalid or expired".to_string(),
        403 => "API access denied".to_string(),
        404 => "API endpoint not found, check the model name and base URL".to_string(),
        429 => "API rate limit exceeded, retry later".to_string(),
        s if s >= 500 => "upstream server error, retry later".to_string(),
        s => format!("HTTP error {s}"),
    }
}

/// Split a send-phase reqwest error into connectivity vs. everything else.
pub(crate) fn classify_transport(err: reqwest::Error) -> LlmError {
    if err.is_connect() || err.is_timeout() {
        LlmError::Connect(err)
    } else {
        LlmError::Request(err)
    }
}

/// Same split for failures while reading the response body: connectivity
/// keeps its classification, anything else is a stream failure.
pub(crate) fn classify_body(err: reqwest::Error) -> LlmError {
    if err.is_connect() || err.is_timeout() {
        LlmError::Connect(err)
    } else {
        LlmError::Stream(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(classify_status(401).contains("invalid or expired"));
        assert!(classify_status(403).contains("denied"));
        assert!(classify_status(404).contains("endpoint not found"));
        assert!(classify_status(429).contains("rate limit"));
        assert!(classify_status(500).contains("upstream server error"));
        assert!(classify_status(503).contains("upstream server error"));
        assert_eq!(classify_status(418), "HTTP error 418");
    }

    // Real reqwest errors cannot be constructed directly; provoke them.
    async fn connect_error() -> reqwest::Error {
        reqwest::Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err()
    }

    async fn builder_error() -> reqwest::Error {
        reqwest::Client::new()
            .get("http://")
            .send()
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn send_phase_classification() {
        assert!(matches!(
            classify_transport(connect_error().await),
            LlmError::Connect(_)
        ));
        assert!(matches!(
            classify_transport(builder_error().await),
            LlmError::Request(_)
        ));
    }

    #[tokio::test]
    async fn body_phase_classification() {
        assert!(matches!(
            classify_body(connect_error().await),
            LlmError::Connect(_)
        ));
        assert!(matches!(
            classify_body(builder_error().await),
            LlmError::Stream(_)
        ));
    }

    #[test]
    fn api_error_display() {
        let err = LlmError::Api {
            status: 401,
            reason: classify_status(401),
            body: "{\"error\":\"bad key\"}".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("invalid or expired"));
        assert!(text.contains("status 401"));
        assert!(text.contains("bad key"));
    }
}
