//! Identity verification and the per-request context
//!
//! Tokens are verified by an external identity provider behind
//! [`TokenVerifier`]. The server middleware turns the verified claims into a
//! [`Principal`] and stores a [`RequestContext`] in the request extensions,
//! where handlers pick it up as an extractor.

use crate::core::principal::Principal;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;

/// Header carrying the correlation id of a request
pub const TRACE_ID_HEADER: &str = "x-request-id";

/// Claims of a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Stable subject identifier at the identity provider
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Claims {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: None,
            name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,

    #[error("token verification failed: {0}")]
    Provider(String),
}

/// External identity provider
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Verifier backed by a fixed token table, for development and tests
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Claims>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, claims: Claims) -> Self {
        self.tokens.insert(token.into(), claims);
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

/// Bearer token of an `Authorization` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolved principal and correlation id of the current request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Principal,
    pub trace_id: String,
}

impl RequestContext {
    pub fn anonymous(trace_id: impl Into<String>) -> Self {
        Self {
            principal: Principal::anonymous(),
            trace_id: trace_id.into(),
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Routes mounted without the context layer act as anonymous
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(|| RequestContext::anonymous(uuid::Uuid::new_v4().to_string())))
    }
}
