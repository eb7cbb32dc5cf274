//! REST client module for the fitpulse auth service.
//!
//! This module provides the `AuthClient` for posting credentials to the
//! `/signin` and `/signup` endpoints. Every request is bounded by a single
//! timeout; when it elapses the request is dropped and reported as
//! `ApiError::Timeout`.

pub mod client;
pub mod error;

pub use client::{AuthClient, SignInResponse, SignUpResponse};
pub use error::ApiError;
