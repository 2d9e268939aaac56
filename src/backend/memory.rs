//! In-memory storage backend
//!
//! Keeps objects in an ordered map and mimics the parts of Cloud Storage
//! the adapter depends on: prefix/delimiter listings with page tokens,
//! server-side copy and per-object ACLs. Objects written without an
//! explicit visibility carry no ACL data, the same as a bucket with
//! uniform access control.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::backend::{
    BucketInfo, ByteStream, ListRequest, ObjectAccessControl, ObjectPage, ObjectUpload,
    StorageBackend, StorageObject,
};
use crate::error::{AdapterError, Result};
use crate::metadata::Visibility;

/// Default number of entries returned per listing page
const DEFAULT_PAGE_SIZE: usize = 1000;

/// Size of the chunks yielded by `download`
const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    object: StorageObject,
    data: Bytes,
}

/// In-memory backend bound to a single bucket
pub struct MemoryBackend {
    bucket: String,
    application_name: Option<String>,
    created: DateTime<Utc>,
    page_size: usize,
    objects: RwLock<BTreeMap<String, StoredObject>>,
    /// Keys whose deletion should fail
    failing_deletes: Mutex<HashSet<String>>,
    /// Keys whose descriptor lookups should fail
    failing_gets: Mutex<HashSet<String>>,
}

impl MemoryBackend {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            application_name: None,
            created: Utc::now(),
            page_size: DEFAULT_PAGE_SIZE,
            objects: RwLock::new(BTreeMap::new()),
            failing_deletes: Mutex::new(HashSet::new()),
            failing_gets: Mutex::new(HashSet::new()),
        }
    }

    /// Limit listing pages to `page_size` entries
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Make every future delete of `name` fail with a backend error
    pub fn fail_delete(&self, name: impl Into<String>) {
        self.failing_deletes.lock().insert(name.into());
    }

    /// Make every future `get_object` of `name` fail with a backend error
    pub fn fail_get(&self, name: impl Into<String>) {
        self.failing_gets.lock().insert(name.into());
    }

    /// All stored keys, in order
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    fn not_found(name: &str) -> AdapterError {
        AdapterError::NotFound(name.to_string())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn application_name(&self) -> Option<&str> {
        self.application_name.as_deref()
    }

    async fn get_object(&self, name: &str) -> Result<StorageObject> {
        if self.failing_gets.lock().contains(name) {
            return Err(AdapterError::backend(format!(
                "injected lookup failure for {}",
                name
            )));
        }

        self.objects
            .read()
            .get(name)
            .map(|stored| stored.object.clone())
            .ok_or_else(|| Self::not_found(name))
    }

    async fn download(&self, name: &str) -> Result<ByteStream> {
        let data = self
            .objects
            .read()
            .get(name)
            .map(|stored| stored.data.clone())
            .ok_or_else(|| Self::not_found(name))?;

        let mut chunks = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + DOWNLOAD_CHUNK_SIZE).min(data.len());
            chunks.push(Ok(data.slice(offset..end)));
            offset = end;
        }

        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn insert(&self, upload: ObjectUpload<'_>) -> Result<StorageObject> {
        trace!("insert: name={} size={}", upload.name, upload.data.len());

        let acl = match upload.visibility {
            Some(Visibility::Public) => Some(vec![ObjectAccessControl::public_read()]),
            Some(Visibility::Private) => Some(Vec::new()),
            None => None,
        };

        let object = StorageObject {
            name: upload.name.to_string(),
            size: upload.data.len() as u64,
            content_type: Some(upload.content_type.to_string()),
            updated: Some(Utc::now()),
            acl,
        };

        self.objects.write().insert(
            upload.name.to_string(),
            StoredObject {
                object: object.clone(),
                data: upload.data,
            },
        );

        Ok(object)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        trace!("delete: name={}", name);

        if self.failing_deletes.lock().contains(name) {
            return Err(AdapterError::backend(format!(
                "injected delete failure for {}",
                name
            )));
        }

        self.objects
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(name))
    }

    async fn copy(&self, from: &str, to: &str) -> Result<StorageObject> {
        trace!("copy: from={} to={}", from, to);

        let mut objects = self.objects.write();
        let source = objects.get(from).ok_or_else(|| Self::not_found(from))?;

        // Copies get the bucket default ACL, not the source's
        let object = StorageObject {
            name: to.to_string(),
            updated: Some(Utc::now()),
            acl: None,
            ..source.object.clone()
        };
        let data = source.data.clone();

        objects.insert(
            to.to_string(),
            StoredObject {
                object: object.clone(),
                data,
            },
        );

        Ok(object)
    }

    async fn list(&self, request: ListRequest<'_>) -> Result<ObjectPage> {
        let limit = request
            .max_results
            .map(|max| (max as usize).clamp(1, self.page_size))
            .unwrap_or(self.page_size);

        let start = match request.page_token {
            Some(token) => Bound::Excluded(token),
            None => Bound::Included(request.prefix),
        };

        let objects = self.objects.read();
        let mut page = ObjectPage::default();
        let mut emitted = 0;
        let mut last_key: Option<&String> = None;

        for (key, stored) in objects.range::<str, _>((start, Bound::Unbounded)) {
            if !key.starts_with(request.prefix) {
                break;
            }

            let rest = &key[request.prefix.len()..];
            let collapsed = request.delimiter.and_then(|delimiter| {
                rest.find(delimiter)
                    .map(|idx| format!("{}{}", request.prefix, &rest[..idx + delimiter.len()]))
            });

            let is_new_entry = match &collapsed {
                Some(prefix) => page.prefixes.last() != Some(prefix),
                None => true,
            };

            if is_new_entry && emitted == limit {
                page.next_page_token = last_key.cloned();
                break;
            }

            match collapsed {
                Some(prefix) if is_new_entry => {
                    page.prefixes.push(prefix);
                    emitted += 1;
                }
                Some(_) => {}
                None => {
                    page.objects.push(stored.object.clone());
                    emitted += 1;
                }
            }
            last_key = Some(key);
        }

        Ok(page)
    }

    async fn get_bucket(&self) -> Result<BucketInfo> {
        Ok(BucketInfo {
            name: self.bucket.clone(),
            location: Some("MEMORY".to_string()),
            storage_class: Some("STANDARD".to_string()),
            time_created: Some(self.created),
        })
    }

    async fn insert_acl(&self, name: &str, entry: &ObjectAccessControl) -> Result<()> {
        let mut objects = self.objects.write();
        let stored = objects.get_mut(name).ok_or_else(|| Self::not_found(name))?;

        let acl = stored.object.acl.get_or_insert_with(Vec::new);
        acl.retain(|existing| existing.entity != entry.entity);
        acl.push(entry.clone());
        Ok(())
    }

    async fn delete_acl(&self, name: &str, entity: &str) -> Result<()> {
        let mut objects = self.objects.write();
        let stored = objects.get_mut(name).ok_or_else(|| Self::not_found(name))?;

        let missing = || AdapterError::NotFound(format!("{} acl entry {}", name, entity));
        let acl = stored.object.acl.as_mut().ok_or_else(missing)?;
        let before = acl.len();
        acl.retain(|existing| existing.entity != entity);
        if acl.len() == before {
            return Err(missing());
        }
        Ok(())
    }
}
