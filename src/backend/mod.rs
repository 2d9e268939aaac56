pub mod gcs;
pub mod memory;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::metadata::Visibility;

/// ACL entity that stands for everyone on the internet
pub const ALL_USERS: &str = "allUsers";

/// ACL role granting read access
pub const READER_ROLE: &str = "READER";

/// A single access-control entry on an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectAccessControl {
    pub entity: String,
    pub role: String,
}

impl ObjectAccessControl {
    /// Entry granting read access to all users
    pub fn public_read() -> Self {
        Self {
            entity: ALL_USERS.to_string(),
            role: READER_ROLE.to_string(),
        }
    }
}

/// Backend object descriptor
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageObject {
    /// Full object key
    pub name: String,
    #[serde(default, deserialize_with = "u64_from_string")]
    pub size: u64,
    pub content_type: Option<String>,
    pub updated: Option<DateTime<Utc>>,
    /// Only present when the backend returns access-control data
    pub acl: Option<Vec<ObjectAccessControl>>,
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<StorageObject>,
    /// Common prefixes (only populated when a delimiter was given)
    pub prefixes: Vec<String>,
    pub next_page_token: Option<String>,
}

/// Listing request
#[derive(Debug, Clone, Copy, Default)]
pub struct ListRequest<'a> {
    pub prefix: &'a str,
    pub delimiter: Option<&'a str>,
    pub page_token: Option<&'a str>,
    pub max_results: Option<u32>,
}

/// Object to be uploaded
#[derive(Debug, Clone)]
pub struct ObjectUpload<'a> {
    pub name: &'a str,
    pub content_type: &'a str,
    /// Predefined ACL to apply; `None` keeps the bucket default
    pub visibility: Option<Visibility>,
    pub data: Bytes,
}

/// Bucket-level metadata
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketInfo {
    pub name: String,
    pub location: Option<String>,
    pub storage_class: Option<String>,
    pub time_created: Option<DateTime<Utc>>,
}

/// Stream of downloaded object chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Object-storage capability consumed by the adapter.
///
/// Implementations are bound to a single bucket and are already
/// authorized. They classify failures themselves: a missing object is
/// `AdapterError::NotFound`, a precondition conflict is
/// `AdapterError::AlreadyExists`, anything else is `AdapterError::Backend`
/// with the transport error as its source.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the bucket this backend is bound to
    fn bucket(&self) -> &str;

    /// Application name sent with requests, if any
    fn application_name(&self) -> Option<&str> {
        None
    }

    /// Fetch an object's descriptor, including ACL data when available
    async fn get_object(&self, name: &str) -> Result<StorageObject>;

    /// Download an object's contents as a stream
    async fn download(&self, name: &str) -> Result<ByteStream>;

    /// Create or replace an object
    async fn insert(&self, upload: ObjectUpload<'_>) -> Result<StorageObject>;

    /// Delete an object
    async fn delete(&self, name: &str) -> Result<()>;

    /// Server-side copy within the bucket
    async fn copy(&self, from: &str, to: &str) -> Result<StorageObject>;

    /// List a single page of objects
    async fn list(&self, request: ListRequest<'_>) -> Result<ObjectPage>;

    /// Fetch bucket metadata
    async fn get_bucket(&self) -> Result<BucketInfo>;

    /// Add (or replace) the ACL entry for `entry.entity`
    async fn insert_acl(&self, name: &str, entry: &ObjectAccessControl) -> Result<()>;

    /// Remove the ACL entry for `entity`
    async fn delete_acl(&self, name: &str, entity: &str) -> Result<()>;
}

/// The JSON API encodes 64-bit integers as strings
fn u64_from_string<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.parse().map_err(serde::de::Error::custom),
        StringOrNumber::Number(n) => Ok(n),
    }
}
