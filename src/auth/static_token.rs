//! Static token provider for emulators and tests.
//!
//! Returns a fixed token string without any validation or refresh logic.

use async_trait::async_trait;

use super::TokenProvider;
use crate::error::BoxError;

/// A token provider that returns a static token, or no token at all.
///
/// Static tokens eventually expire and this provider does not refresh
/// them. `anonymous()` sends requests without an `Authorization` header,
/// which storage emulators accept.
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self, _scopes: &[&str]) -> Result<Option<String>, BoxError> {
        Ok(self.token.clone())
    }
}
