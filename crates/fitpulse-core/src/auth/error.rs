use thiserror::Error;

use crate::api::ApiError;
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("Another sign-in or sign-up is already in progress")]
    OperationInProgress,

    #[error("Request timed out")]
    NetworkTimeout,

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Rejected by server: {0}")]
    ServerRejected(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Signed out before the request completed")]
    Superseded,
}

impl AuthError {
    /// Text suitable for showing inline next to a login form
    pub fn user_message(&self) -> String {
        match self {
            AuthError::MissingCredentials => "Please fill in all fields.".to_string(),
            AuthError::OperationInProgress => "A sign in is already in progress.".to_string(),
            AuthError::NetworkTimeout => {
                "The request took too long. Please check your connection.".to_string()
            }
            AuthError::NetworkFailure(_) => {
                "Unable to connect to the server. Please check your network connection.".to_string()
            }
            AuthError::ServerRejected(message) => message.clone(),
            AuthError::MalformedResponse(_) => {
                "The server sent an unexpected response. Please try again.".to_string()
            }
            AuthError::StorageFailure(_) => {
                "Unable to save your session on this device.".to_string()
            }
            AuthError::Superseded => "You signed out before the request finished.".to_string(),
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Timeout(_) => AuthError::NetworkTimeout,
            ApiError::Network(e) if e.is_timeout() => AuthError::NetworkTimeout,
            ApiError::Network(e) if e.is_decode() => AuthError::MalformedResponse(e.to_string()),
            ApiError::Network(e) => AuthError::NetworkFailure(e.to_string()),
            ApiError::Rejected { message, .. } => AuthError::ServerRejected(message),
            ApiError::InvalidResponse(message) => AuthError::MalformedResponse(message),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::StorageFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_api_error_mapping() {
        assert_eq!(
            AuthError::from(ApiError::Timeout(Duration::from_secs(10))),
            AuthError::NetworkTimeout
        );
        assert_eq!(
            AuthError::from(ApiError::Rejected {
                status: Some(400),
                message: "Invalid email or password".to_string(),
            }),
            AuthError::ServerRejected("Invalid email or password".to_string())
        );
        assert_eq!(
            AuthError::from(ApiError::InvalidResponse("eof".to_string())),
            AuthError::MalformedResponse("eof".to_string())
        );
    }

    #[test]
    fn test_store_error_mapping() {
        let err = AuthError::from(StoreError::Backend("disk full".to_string()));
        assert_eq!(err, AuthError::StorageFailure("Storage backend failure: disk full".to_string()));
    }

    #[test]
    fn test_user_message_passes_server_reason_through() {
        let err = AuthError::ServerRejected("Invalid email or password".to_string());
        assert_eq!(err.user_message(), "Invalid email or password");
        assert!(AuthError::NetworkTimeout.user_message().contains("took too long"));
    }
}
