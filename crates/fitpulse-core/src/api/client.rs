//! HTTP client for the fitpulse auth service.
//!
//! Sign-in and sign-up both post `{email, password}` as JSON and read back a
//! `success` flag. The client does not retry; callers decide what to do with
//! a failure.

use std::time::Duration;

use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default bound on a single auth request, connect through body.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const SIGN_IN_ENDPOINT: &str = "signin";
const SIGN_UP_ENDPOINT: &str = "signup";

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Body returned by `POST /signin`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignInResponse {
    #[serde(default)]
    pub success: bool,
    pub email: Option<String>,
    pub uid: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Body returned by `POST /signup`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpResponse {
    #[serde(default)]
    pub success: bool,
    pub email: Option<String>,
    pub uid: Option<String>,
    pub error: Option<String>,
}

/// Auth service client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl AuthClient {
    /// Create a client for the service rooted at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Authenticate and return the identity token issued by the service.
    ///
    /// The service currently uses the account email as the token.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let response: SignInResponse = self
            .post_credentials(SIGN_IN_ENDPOINT, email, password)
            .await?;

        if !response.success {
            return Err(ApiError::unsuccessful(
                response.message.or(response.error),
                "Login failed",
            ));
        }

        response
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("sign-in response is missing the email".to_string()))
    }

    /// Register a new account
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, ApiError> {
        let response: SignUpResponse = self
            .post_credentials(SIGN_UP_ENDPOINT, email, password)
            .await?;

        if !response.success {
            return Err(ApiError::unsuccessful(response.error.clone(), "Sign up failed"));
        }
        Ok(response)
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// POST credentials and decode the JSON reply.
    /// The whole exchange runs under `self.timeout`; on expiry the request
    /// future is dropped, which aborts the connection.
    async fn post_credentials<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<T, ApiError> {
        let url = self.endpoint_url(endpoint);

        let request = async {
            let response = self
                .client
                .post(&url)
                .header(header::ACCEPT, "application/json")
                .json(&Credentials { email, password })
                .send()
                .await?;

            debug!(url = %url, status = %response.status(), "Auth response received");

            let response = Self::check_response(response).await?;
            let body = response.text().await?;

            serde_json::from_str::<T>(&body).map_err(|e| {
                ApiError::InvalidResponse(format!("{}: {}", e, ApiError::truncate_body(&body)))
            })
        };

        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url = %url, timeout_ms = self.timeout.as_millis() as u64, "Auth request timed out");
                Err(ApiError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_without_double_slash() {
        let client = AuthClient::new("http://localhost:8080/", Duration::from_secs(1))
            .expect("client builds");
        assert_eq!(client.endpoint_url("signin"), "http://localhost:8080/signin");

        let client = AuthClient::new("http://localhost:8080/api", Duration::from_secs(1))
            .expect("client builds");
        assert_eq!(client.endpoint_url("signup"), "http://localhost:8080/api/signup");
    }

    #[test]
    fn test_parse_sign_in_response() {
        let json = r#"{"uid":"Xk2Lq9","email":"a@b.com","success":true}"#;
        let resp: SignInResponse = serde_json::from_str(json).expect("parses");
        assert!(resp.success);
        assert_eq!(resp.email.as_deref(), Some("a@b.com"));
        assert_eq!(resp.uid.as_deref(), Some("Xk2Lq9"));
    }

    #[test]
    fn test_parse_error_only_response() {
        // The server's failure body has no success flag at all
        let resp: SignUpResponse =
            serde_json::from_str(r#"{"error":"EMAIL_EXISTS"}"#).expect("parses");
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("EMAIL_EXISTS"));
    }
}
