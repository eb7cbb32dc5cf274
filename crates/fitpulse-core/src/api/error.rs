use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rejected by server: {message}")]
    Rejected { status: Option<u16>, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Build a rejection from a non-2xx status.
    ///
    /// The auth server answers failures with `{"error": "..."}` or
    /// `{"message": "..."}`; when the body carries either, that text becomes the
    /// message, otherwise the (truncated) raw body does.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| Self::truncate_body(body));
        let message = if message.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            message
        };

        ApiError::Rejected {
            status: Some(status.as_u16()),
            message: Self::truncate_body(&message),
        }
    }

    /// A 2xx response whose payload reported `success: false`
    pub fn unsuccessful(message: Option<String>, fallback: &str) -> Self {
        ApiError::Rejected {
            status: None,
            message: message
                .filter(|m| !m.trim().is_empty())
                .map(|m| Self::truncate_body(&m))
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_reads_error_field() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"error":"Invalid email or password"}"#);
        match err {
            ApiError::Rejected { status, message } => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "Invalid email or password");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_status_falls_back_to_body() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(err.to_string(), "Rejected by server: boom");
        assert!(matches!(err, ApiError::Rejected { status: Some(500), .. }));
    }

    #[test]
    fn test_from_status_empty_body_uses_status() {
        let err = ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(err.to_string(), "Rejected by server: HTTP 503 Service Unavailable");
    }

    #[test]
    fn test_truncate_body() {
        let short = "short body";
        assert_eq!(ApiError::truncate_body(short), short);

        let long = "x".repeat(600);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.ends_with("(truncated, 600 total bytes)"));
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        // 'é' is two bytes, so byte 500 falls inside a character
        let long = format!("a{}", "é".repeat(300));
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("... (truncated"));
    }

    #[test]
    fn test_unsuccessful_uses_fallback() {
        let err = ApiError::unsuccessful(None, "Login failed");
        assert_eq!(err.to_string(), "Rejected by server: Login failed");

        let err = ApiError::unsuccessful(Some("   ".to_string()), "Login failed");
        assert_eq!(err.to_string(), "Rejected by server: Login failed");

        let err = ApiError::unsuccessful(Some("Email taken".to_string()), "Sign up failed");
        assert_eq!(err.to_string(), "Rejected by server: Email taken");
    }
}
