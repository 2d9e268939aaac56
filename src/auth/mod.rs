//! Token providers for Google Cloud Storage requests
//!
//! - Service account credentials (the default built by `AdapterBuilder`)
//! - Static tokens (for emulators and tests)

pub mod service_account;
pub mod static_token;

use async_trait::async_trait;

use crate::error::BoxError;

pub use service_account::ServiceAccountProvider;
pub use static_token::StaticTokenProvider;

/// OAuth scope granting full control over storage resources
pub const FULL_CONTROL_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.full_control";

/// Source of bearer tokens for storage requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get a token for the given scopes.
    ///
    /// Returns `Ok(Some(token))` if a token is available,
    /// `Ok(None)` if requests should be sent unauthenticated,
    /// or `Err` if token fetching failed.
    async fn get_token(&self, scopes: &[&str]) -> Result<Option<String>, BoxError>;
}
