//! Service account token provider.
//!
//! Wraps yup_oauth2's ServiceAccountAuthenticator, which signs a JWT with
//! the account's private key and refreshes access tokens as they expire.

use std::path::Path;

use async_trait::async_trait;
use hyper_util::client::legacy::connect::HttpConnector;
use yup_oauth2::{
    parse_service_account_key, read_service_account_key, ServiceAccountAuthenticator,
    ServiceAccountKey,
};

use super::TokenProvider;
use crate::error::BoxError;

type Authenticator =
    yup_oauth2::authenticator::Authenticator<hyper_rustls::HttpsConnector<HttpConnector>>;

/// A token provider using Google Cloud service account credentials.
pub struct ServiceAccountProvider {
    auth: Authenticator,
    client_email: String,
}

impl ServiceAccountProvider {
    /// Create a provider from an already loaded key.
    ///
    /// The private key is parsed here, so a malformed key fails now rather
    /// than on the first request.
    pub async fn new(key: ServiceAccountKey) -> Result<Self, BoxError> {
        // Several rustls providers may be compiled in; pin ring. An error only
        // means a provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client_email = key.client_email.clone();
        let auth = ServiceAccountAuthenticator::builder(key).build().await?;

        Ok(Self { auth, client_email })
    }

    /// Load a JSON key file downloaded from the Google Cloud Console
    pub async fn load_key_file(path: &Path) -> Result<ServiceAccountKey, BoxError> {
        Ok(read_service_account_key(path).await?)
    }

    /// Parse a JSON key held in memory
    pub fn parse_key(json: &str) -> Result<ServiceAccountKey, BoxError> {
        Ok(parse_service_account_key(json)?)
    }

    /// Service account identity the tokens are issued for
    pub fn client_email(&self) -> &str {
        &self.client_email
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<Option<String>, BoxError> {
        let token = self.auth.token(scopes).await?;
        Ok(token.token().map(|t| t.to_string()))
    }
}
