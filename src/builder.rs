//! Adapter construction
//!
//! `AdapterBuilder` collects settings and `build()` validates them, sets up
//! the HTTP transport and service-account credentials, and returns a ready
//! adapter. Nothing is authorized lazily: a key that cannot be loaded or
//! parsed fails here, not on the first request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::adapter::{AdapterOptions, GcsAdapter};
use crate::auth::ServiceAccountProvider;
use crate::backend::gcs::GcsClient;
use crate::backend::StorageBackend;
use crate::error::{AdapterError, Result};

/// Where the service account's private key comes from
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    /// JSON key file downloaded from the Cloud Console
    File(PathBuf),
    /// Contents of a JSON key file
    Json(String),
}

/// Fluent adapter configuration with a single validating `build()`.
///
/// Bucket, service account and key are required unless a pre-authorized
/// client is injected with `client()`, in which case they are not checked.
#[derive(Default)]
pub struct AdapterBuilder {
    bucket: Option<String>,
    service_account: Option<String>,
    key: Option<KeyMaterial>,
    application_name: Option<String>,
    http_client: Option<reqwest::Client>,
    endpoint: Option<String>,
    timeout: Option<Duration>,
    prefix: Option<String>,
    options: AdapterOptions,
    client: Option<Arc<dyn StorageBackend>>,
}

impl AdapterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Service account identity (client email)
    pub fn service_account(mut self, email: impl Into<String>) -> Self {
        self.service_account = Some(email.into());
        self
    }

    pub fn key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key = Some(KeyMaterial::File(path.into()));
        self
    }

    pub fn key_json(mut self, json: impl Into<String>) -> Self {
        self.key = Some(KeyMaterial::Json(json.into()));
        self
    }

    pub fn key(mut self, key: KeyMaterial) -> Self {
        self.key = Some(key);
        self
    }

    /// Application name sent as the user agent, e.g. `MyCompany-ProductName/1.0`
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Use this HTTP client for storage requests instead of the default transport.
    ///
    /// Token refreshes go through the OAuth library's own HTTPS client and
    /// do not use this client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// API endpoint override, e.g. a local storage emulator
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Request timeout for storage requests on the default transport.
    ///
    /// Ignored with `http_client`; configure the timeout on that client
    /// instead. Token refreshes are not bounded by this timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Root every adapter path under this key prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn options(mut self, options: AdapterOptions) -> Self {
        self.options = options;
        self
    }

    /// Inject an already authorized client, bypassing credential validation
    pub fn client(mut self, client: Arc<dyn StorageBackend>) -> Self {
        self.client = Some(client);
        self
    }

    /// Validate the configuration and construct the adapter
    pub async fn build(self) -> Result<GcsAdapter> {
        let AdapterBuilder {
            bucket,
            service_account,
            key,
            application_name,
            http_client,
            endpoint,
            timeout,
            prefix,
            options,
            client,
        } = self;

        let backend: Arc<dyn StorageBackend> = match client {
            Some(client) => {
                info!("Using injected storage client for bucket {}", client.bucket());
                client
            }
            None => {
                let bucket = required(bucket, "bucket name required")?;
                let service_account = required(service_account, "service account required")?;
                let key = key.ok_or_else(|| AdapterError::config("key material required"))?;

                if application_name.is_none() {
                    warn!(
                        "application name not set; storage requests will carry no user agent. \
                         Suggested format is \"MyCompany-ProductName/1.0\""
                    );
                }

                let http = match http_client {
                    Some(http) => http,
                    None => default_transport(timeout, application_name.as_deref())?,
                };

                let provider = authorize(&service_account, key).await?;

                let mut gcs = GcsClient::new(http, Arc::new(provider), bucket);
                if let Some(endpoint) = endpoint {
                    gcs = gcs.with_endpoint(endpoint);
                }
                if let Some(name) = application_name {
                    gcs = gcs.with_application_name(name);
                }

                info!(
                    "Authorized service account {} for bucket {}",
                    service_account,
                    gcs.bucket()
                );
                Arc::new(gcs)
            }
        };

        let adapter = GcsAdapter::new(backend).with_options(options);
        match prefix {
            Some(prefix) => adapter
                .with_prefix(&prefix)
                .map_err(|e| AdapterError::config_with("invalid path prefix", e)),
            None => Ok(adapter),
        }
    }
}

fn required(value: Option<String>, message: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AdapterError::config(message))
}

fn default_transport(
    timeout: Option<Duration>,
    application_name: Option<&str>,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(name) = application_name {
        builder = builder.user_agent(name.to_string());
    }

    builder
        .build()
        .map_err(|e| AdapterError::config_with("failed to initialize HTTP transport", e))
}

/// Load the key and build full-control service account credentials
async fn authorize(service_account: &str, key: KeyMaterial) -> Result<ServiceAccountProvider> {
    let mut key = match key {
        KeyMaterial::File(path) => ServiceAccountProvider::load_key_file(&path)
            .await
            .map_err(|e| AdapterError::Configuration {
                message: format!("failed to load key material from {}", path.display()),
                source: Some(e),
            })?,
        KeyMaterial::Json(json) => {
            ServiceAccountProvider::parse_key(&json).map_err(|e| AdapterError::Configuration {
                message: "failed to parse key material".to_string(),
                source: Some(e),
            })?
        }
    };
    key.client_email = service_account.to_string();

    ServiceAccountProvider::new(key)
        .await
        .map_err(|e| AdapterError::Configuration {
            message: "failed to build service account credentials".to_string(),
            source: Some(e),
        })
}
