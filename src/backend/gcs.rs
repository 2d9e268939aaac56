//! Google Cloud Storage backend
//!
//! Talks to the Cloud Storage JSON API over `reqwest`. Requests carry a
//! bearer token from a `TokenProvider`; the endpoint can be pointed at an
//! emulator such as fake-gcs-server.

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::auth::{TokenProvider, FULL_CONTROL_SCOPE};
use crate::backend::{
    BucketInfo, ByteStream, ListRequest, ObjectAccessControl, ObjectPage, ObjectUpload,
    StorageBackend, StorageObject,
};
use crate::error::{AdapterError, Result};
use crate::metadata::Visibility;

/// Public Cloud Storage endpoint
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Response body of `objects.list`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<StorageObject>,
    #[serde(default)]
    prefixes: Vec<String>,
    next_page_token: Option<String>,
}

/// Cloud Storage client bound to one bucket
pub struct GcsClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    bucket: String,
    endpoint: String,
    application_name: Option<String>,
}

impl GcsClient {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<dyn TokenProvider>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            http,
            tokens,
            bucket: bucket.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            application_name: None,
        }
    }

    /// Override the API endpoint (scheme + host, no path)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Application name sent as the `User-Agent`
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    fn bucket_url(&self) -> String {
        format!(
            "{}/storage/v1/b/{}",
            self.endpoint,
            urlencoding::encode(&self.bucket)
        )
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/o/{}", self.bucket_url(), urlencoding::encode(name))
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o",
            self.endpoint,
            urlencoding::encode(&self.bucket)
        )
    }

    /// Build a request with auth and user agent applied
    async fn request(&self, method: Method, url: String) -> Result<RequestBuilder> {
        let mut request = self.http.request(method, url);

        if let Some(name) = &self.application_name {
            request = request.header(USER_AGENT, name.as_str());
        }

        let token = self
            .tokens
            .get_token(&[FULL_CONTROL_SCOPE])
            .await
            .map_err(|e| AdapterError::Backend {
                message: "failed to obtain access token".to_string(),
                source: Some(e),
            })?;

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        Ok(request)
    }

    /// Send a request and classify the response status
    async fn send(&self, op: &str, target: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::backend_with(format!("GCS {} {} failed", op, target), e))?;

        let status = response.status();
        let Some(cause) = response.error_for_status_ref().err() else {
            return Ok(response);
        };

        match status {
            StatusCode::NOT_FOUND => Err(AdapterError::NotFound(target.to_string())),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
                Err(AdapterError::AlreadyExists(target.to_string()))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(AdapterError::backend_with(
                    format!("GCS {} {} returned {}: {}", op, target, status, body),
                    cause,
                ))
            }
        }
    }

    async fn json<T: DeserializeOwned>(op: &str, response: Response) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| AdapterError::backend_with(format!("GCS {} response malformed", op), e))
    }
}

#[async_trait]
impl StorageBackend for GcsClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn application_name(&self) -> Option<&str> {
        self.application_name.as_deref()
    }

    async fn get_object(&self, name: &str) -> Result<StorageObject> {
        trace!("get_object: bucket={} name={}", self.bucket, name);

        let request = self
            .request(Method::GET, self.object_url(name))
            .await?
            .query(&[("projection", "full")]);
        let response = self.send("get", name, request).await?;
        Self::json("get", response).await
    }

    async fn download(&self, name: &str) -> Result<ByteStream> {
        trace!("download: bucket={} name={}", self.bucket, name);

        let request = self
            .request(Method::GET, self.object_url(name))
            .await?
            .query(&[("alt", "media")]);
        let response = self.send("download", name, request).await?;

        let target = name.to_string();
        Ok(Box::pin(response.bytes_stream().map_err(move |e| {
            AdapterError::backend_with(format!("GCS download {} interrupted", target), e)
        })))
    }

    async fn insert(&self, upload: ObjectUpload<'_>) -> Result<StorageObject> {
        debug!(
            "insert: bucket={} name={} size={} content_type={}",
            self.bucket,
            upload.name,
            upload.data.len(),
            upload.content_type
        );

        let mut query = vec![("uploadType", "media"), ("name", upload.name)];
        match upload.visibility {
            Some(Visibility::Public) => query.push(("predefinedAcl", "publicRead")),
            Some(Visibility::Private) => query.push(("predefinedAcl", "private")),
            None => {}
        }

        let request = self
            .request(Method::POST, self.upload_url())
            .await?
            .query(&query)
            .header(CONTENT_TYPE, upload.content_type)
            .body(upload.data);
        let response = self.send("insert", upload.name, request).await?;
        Self::json("insert", response).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        debug!("delete: bucket={} name={}", self.bucket, name);

        let request = self.request(Method::DELETE, self.object_url(name)).await?;
        self.send("delete", name, request).await?;
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> Result<StorageObject> {
        debug!("copy: bucket={} from={} to={}", self.bucket, from, to);

        let url = format!(
            "{}/copyTo/b/{}/o/{}",
            self.object_url(from),
            urlencoding::encode(&self.bucket),
            urlencoding::encode(to)
        );
        let request = self
            .request(Method::POST, url)
            .await?
            .json(&serde_json::json!({}));
        let response = self.send("copy", from, request).await?;
        Self::json("copy", response).await
    }

    async fn list(&self, list: ListRequest<'_>) -> Result<ObjectPage> {
        trace!(
            "list: bucket={} prefix={} delimiter={:?} page_token={:?}",
            self.bucket,
            list.prefix,
            list.delimiter,
            list.page_token
        );

        let mut query = vec![("projection", "full".to_string())];
        if !list.prefix.is_empty() {
            query.push(("prefix", list.prefix.to_string()));
        }
        if let Some(delimiter) = list.delimiter {
            query.push(("delimiter", delimiter.to_string()));
        }
        if let Some(token) = list.page_token {
            query.push(("pageToken", token.to_string()));
        }
        if let Some(max) = list.max_results {
            query.push(("maxResults", max.to_string()));
        }

        let request = self
            .request(Method::GET, format!("{}/o", self.bucket_url()))
            .await?
            .query(&query);
        let response = self.send("list", list.prefix, request).await?;
        let page: ListResponse = Self::json("list", response).await?;

        Ok(ObjectPage {
            objects: page.items,
            prefixes: page.prefixes,
            next_page_token: page.next_page_token,
        })
    }

    async fn get_bucket(&self) -> Result<BucketInfo> {
        trace!("get_bucket: bucket={}", self.bucket);

        let request = self.request(Method::GET, self.bucket_url()).await?;
        let response = self.send("get bucket", &self.bucket, request).await?;
        Self::json("get bucket", response).await
    }

    async fn insert_acl(&self, name: &str, entry: &ObjectAccessControl) -> Result<()> {
        debug!(
            "insert_acl: bucket={} name={} entity={} role={}",
            self.bucket, name, entry.entity, entry.role
        );

        let request = self
            .request(Method::POST, format!("{}/acl", self.object_url(name)))
            .await?
            .json(entry);
        self.send("insert acl", name, request).await?;
        Ok(())
    }

    async fn delete_acl(&self, name: &str, entity: &str) -> Result<()> {
        debug!(
            "delete_acl: bucket={} name={} entity={}",
            self.bucket, name, entity
        );

        let url = format!(
            "{}/acl/{}",
            self.object_url(name),
            urlencoding::encode(entity)
        );
        let request = self.request(Method::DELETE, url).await?;
        self.send("delete acl", name, request).await?;
        Ok(())
    }
}
