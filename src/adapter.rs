//! Filesystem operations over an object-storage bucket
//!
//! Object stores have no directories, no atomic rename and ACL-based
//! visibility. `GcsAdapter` maps filesystem semantics onto that model:
//!
//! - directories are zero-length marker objects ending in `/`, or are
//!   implied by keys sharing a prefix
//! - rename is copy followed by delete of the source
//! - visibility is an `allUsers` read grant in the object's ACL
//!
//! The adapter holds no mutable state. Every call is an independent request
//! against the backend, so it can be shared freely between tasks.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;
use tracing::{debug, info, trace, warn};

use crate::backend::{
    BucketInfo, ByteStream, ListRequest, ObjectAccessControl, ObjectUpload, StorageBackend,
    StorageObject, ALL_USERS,
};
use crate::builder::AdapterBuilder;
use crate::convert;
use crate::error::{AdapterError, Result};
use crate::metadata::{FileMetadata, FileType, Visibility, WriteOptions};
use crate::path::{self, DIRECTORY_MIME_TYPE};

/// What `delete` and `delete_dir` do when nothing exists at the path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Deleting a missing path succeeds
    #[default]
    Ignore,
    /// Deleting a missing path fails with `NotFound`
    Error,
}

fn default_delete_concurrency() -> usize {
    8
}

/// Adapter-level policies
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdapterOptions {
    /// Allow `rename` to replace an existing target
    pub rename_overwrite: bool,
    /// Missing-path handling for deletes
    pub delete_missing: DeletePolicy,
    /// Concurrent object deletes issued by `delete_dir`
    pub delete_concurrency: usize,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            rename_overwrite: false,
            delete_missing: DeletePolicy::default(),
            delete_concurrency: default_delete_concurrency(),
        }
    }
}

/// Filesystem adapter bound to one bucket
pub struct GcsAdapter {
    backend: Arc<dyn StorageBackend>,
    /// Key prefix in directory form (`data/`), empty for the bucket root
    prefix: String,
    options: AdapterOptions,
}

impl GcsAdapter {
    /// Wrap an authorized backend. Most callers should use `builder()`.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        info!("Filesystem adapter bound to bucket {}", backend.bucket());
        Self {
            backend,
            prefix: String::new(),
            options: AdapterOptions::default(),
        }
    }

    pub fn builder() -> AdapterBuilder {
        AdapterBuilder::new()
    }

    /// Root every path under `prefix` within the bucket
    pub fn with_prefix(mut self, prefix: &str) -> Result<Self> {
        self.prefix = path::dir_prefix(&path::normalize(prefix)?);
        Ok(self)
    }

    pub fn with_options(mut self, options: AdapterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn bucket(&self) -> &str {
        self.backend.bucket()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    /// Convert a path to an object key (the root maps to the prefix itself)
    fn key(&self, path: &str) -> Result<String> {
        let normalized = path::normalize(path)?;
        Ok(format!("{}{}", self.prefix, normalized))
    }

    /// Key for an operation that needs a concrete object
    fn file_key(&self, path: &str) -> Result<String> {
        let key = self.key(path)?;
        if key.len() == self.prefix.len() {
            return Err(AdapterError::InvalidPath(format!(
                "{:?} does not name a file",
                path
            )));
        }
        Ok(key)
    }

    /// Convert an object key back to an adapter path
    fn key_to_path(&self, key: &str) -> String {
        let relative = key.strip_prefix(&self.prefix).unwrap_or(key);
        relative.trim_end_matches('/').to_string()
    }

    fn metadata_for(&self, object: &StorageObject) -> Result<FileMetadata> {
        let metadata = convert::to_metadata(object)?;
        let path = self.key_to_path(&metadata.path);
        Ok(metadata.with_path(path))
    }

    /// Drain every listing page under `prefix`
    async fn list_all(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
    ) -> Result<(Vec<StorageObject>, Vec<String>)> {
        let mut objects = Vec::new();
        let mut prefixes = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0;

        loop {
            let page = self
                .backend
                .list(ListRequest {
                    prefix,
                    delimiter,
                    page_token: page_token.as_deref(),
                    max_results: None,
                })
                .await?;
            pages += 1;

            objects.extend(page.objects);
            prefixes.extend(page.prefixes);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        trace!(
            "list_all: prefix={} pages={} objects={} prefixes={}",
            prefix,
            pages,
            objects.len(),
            prefixes.len()
        );
        Ok((objects, prefixes))
    }

    /// Whether anything exists under the directory prefix
    async fn prefix_exists(&self, prefix: &str) -> Result<bool> {
        let page = self
            .backend
            .list(ListRequest {
                prefix,
                max_results: Some(1),
                ..Default::default()
            })
            .await?;
        Ok(!page.objects.is_empty() || !page.prefixes.is_empty())
    }

    /// Check whether a file, marker or implied directory exists at `path`
    pub async fn has(&self, path: &str) -> Result<bool> {
        match self.get_metadata(path).await {
            Ok(_) => Ok(true),
            Err(AdapterError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Stream an object's contents
    pub async fn read_stream(&self, path: &str) -> Result<ByteStream> {
        let key = self.file_key(path)?;
        trace!("read_stream: path={} key={}", path, key);

        self.backend
            .download(&key)
            .await
            .map_err(|e| not_found_as(e, path))
    }

    /// Read an object's raw contents
    pub async fn read_bytes(&self, path: &str) -> Result<Bytes> {
        let mut stream = self.read_stream(path).await?;
        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.try_next().await? {
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer.freeze())
    }

    /// Read an object's contents as UTF-8 text
    pub async fn read(&self, path: &str) -> Result<String> {
        let bytes = self.read_bytes(path).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| AdapterError::backend_with(format!("{} is not valid UTF-8", path), e))
    }

    /// Create or overwrite an object.
    ///
    /// There is no create-if-absent guarantee; check `has` first for
    /// create-only semantics.
    pub async fn write(
        &self,
        path: &str,
        contents: impl AsRef<[u8]>,
        options: &WriteOptions,
    ) -> Result<FileMetadata> {
        let key = self.file_key(path)?;
        self.upload(path, &key, Bytes::copy_from_slice(contents.as_ref()), options)
            .await
    }

    /// Replace the contents of an existing object
    pub async fn update(
        &self,
        path: &str,
        contents: impl AsRef<[u8]>,
        options: &WriteOptions,
    ) -> Result<FileMetadata> {
        let key = self.file_key(path)?;
        self.backend
            .get_object(&key)
            .await
            .map_err(|e| not_found_as(e, path))?;

        self.upload(path, &key, Bytes::copy_from_slice(contents.as_ref()), options)
            .await
    }

    async fn upload(
        &self,
        path: &str,
        key: &str,
        data: Bytes,
        options: &WriteOptions,
    ) -> Result<FileMetadata> {
        let content_type = options
            .mimetype
            .as_deref()
            .unwrap_or_else(|| path::guess_mime_type(path));

        debug!(
            "write: path={} key={} size={} content_type={}",
            path,
            key,
            data.len(),
            content_type
        );

        let object = self
            .backend
            .insert(ObjectUpload {
                name: key,
                content_type,
                visibility: options.visibility,
                data,
            })
            .await?;

        self.metadata_for(&object)
    }

    /// Move an object by copying it and deleting the source.
    ///
    /// Not atomic: if the delete fails after the copy succeeded, both paths
    /// exist and `PartialRename` is returned.
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_key = self.file_key(from)?;
        let to_key = self.file_key(to)?;
        debug!("rename: {} -> {} (keys {} -> {})", from, to, from_key, to_key);

        self.backend
            .get_object(&from_key)
            .await
            .map_err(|e| not_found_as(e, from))?;

        if from_key == to_key {
            return Ok(());
        }

        if !self.options.rename_overwrite {
            match self.backend.get_object(&to_key).await {
                Ok(_) => return Err(AdapterError::AlreadyExists(to.to_string())),
                Err(AdapterError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        self.backend
            .copy(&from_key, &to_key)
            .await
            .map_err(|e| not_found_as(e, from))?;

        if let Err(e) = self.backend.delete(&from_key).await {
            if !e.is_not_found() {
                warn!("rename: copied {} to {} but source delete failed: {}", from, to, e);
                return Err(AdapterError::PartialRename {
                    from: from.to_string(),
                    to: to.to_string(),
                    source: Box::new(e),
                });
            }
        }

        Ok(())
    }

    /// Server-side copy; an existing target is overwritten
    pub async fn copy(&self, path: &str, new_path: &str) -> Result<()> {
        let from_key = self.file_key(path)?;
        let to_key = self.file_key(new_path)?;
        debug!("copy: {} -> {}", from_key, to_key);

        self.backend
            .copy(&from_key, &to_key)
            .await
            .map_err(|e| not_found_as(e, path))?;
        Ok(())
    }

    /// Delete an object. A missing object is handled by `DeletePolicy`.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let key = self.file_key(path)?;
        debug!("delete: path={} key={}", path, key);

        match self.backend.delete(&key).await {
            Ok(()) => Ok(()),
            Err(AdapterError::NotFound(_)) => self.missing(path),
            Err(e) => Err(e),
        }
    }

    /// Delete every object under a directory, including its marker
    pub async fn delete_dir(&self, dir: &str) -> Result<()> {
        let prefix = path::dir_prefix(&self.key(dir)?);
        if prefix == self.prefix {
            return Err(AdapterError::InvalidPath(
                "refusing to delete the root directory".to_string(),
            ));
        }

        let (objects, _) = self.list_all(&prefix, None).await?;
        debug!("delete_dir: dir={} prefix={} objects={}", dir, prefix, objects.len());

        if objects.is_empty() {
            return self.missing(dir);
        }

        futures::stream::iter(objects)
            .map(|object| async move {
                match self.backend.delete(&object.name).await {
                    Err(AdapterError::NotFound(_)) => Ok(()),
                    other => other,
                }
            })
            .buffer_unordered(self.options.delete_concurrency.max(1))
            .try_collect::<Vec<()>>()
            .await?;

        Ok(())
    }

    /// Create a directory marker object
    pub async fn create_dir(&self, dir: &str, options: &WriteOptions) -> Result<FileMetadata> {
        let prefix = path::dir_prefix(&self.file_key(dir)?);
        debug!("create_dir: dir={} marker={}", dir, prefix);

        let object = self
            .backend
            .insert(ObjectUpload {
                name: &prefix,
                content_type: DIRECTORY_MIME_TYPE,
                visibility: options.visibility,
                data: Bytes::new(),
            })
            .await?;

        self.metadata_for(&object)
    }

    /// List everything under `directory`, ordered by path. A file and a
    /// directory with the same name are both returned, file first.
    ///
    /// Without `recursive`, deeper keys are collapsed into directory entries.
    /// With it, every object is returned together with a directory entry for
    /// each intermediate level. All backend pages are consumed before
    /// returning.
    pub async fn list_contents(
        &self,
        directory: &str,
        recursive: bool,
    ) -> Result<Vec<FileMetadata>> {
        let dir_path = path::normalize(directory)?;
        let prefix = path::dir_prefix(&self.key(directory)?);
        let delimiter = if recursive { None } else { Some("/") };

        let (objects, prefixes) = self.list_all(&prefix, delimiter).await?;
        // A file and a directory may share a name (`dir` and `dir/x.txt`)
        let mut entries: BTreeMap<(String, FileType), FileMetadata> = BTreeMap::new();

        for metadata in convert::to_metadata_list(&objects)? {
            // The listed directory's own marker
            if metadata.path == prefix {
                continue;
            }

            let path = self.key_to_path(&metadata.path);
            if recursive {
                let mut parent = path::dirname(&path);
                while parent.len() > dir_path.len() {
                    entries
                        .entry((parent.to_string(), FileType::Directory))
                        .or_insert_with(|| FileMetadata::directory(parent, 0));
                    parent = path::dirname(parent);
                }
            }
            entries.insert((path.clone(), metadata.file_type), metadata.with_path(path));
        }

        for common_prefix in prefixes {
            let path = self.key_to_path(&common_prefix);
            entries
                .entry((path.clone(), FileType::Directory))
                .or_insert_with(|| FileMetadata::directory(path, 0));
        }

        Ok(entries.into_values().collect())
    }

    /// Metadata for a file, or for a directory (marker or implied)
    pub async fn get_metadata(&self, path: &str) -> Result<FileMetadata> {
        let key = self.key(path)?;
        if key.len() == self.prefix.len() {
            return Ok(FileMetadata::directory("", 0));
        }

        match self.backend.get_object(&key).await {
            Ok(object) => return self.metadata_for(&object),
            Err(AdapterError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let marker = path::dir_prefix(&key);
        match self.backend.get_object(&marker).await {
            Ok(object) => return self.metadata_for(&object),
            Err(AdapterError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        if self.prefix_exists(&marker).await? {
            return Ok(FileMetadata::directory(self.key_to_path(&key), 0));
        }

        Err(AdapterError::NotFound(path.to_string()))
    }

    pub async fn get_size(&self, path: &str) -> Result<u64> {
        self.get_metadata(path).await.map(|m| m.size)
    }

    pub async fn get_mimetype(&self, path: &str) -> Result<String> {
        self.get_metadata(path).await.map(|m| m.mimetype)
    }

    /// Last modification time, epoch milliseconds
    pub async fn get_timestamp(&self, path: &str) -> Result<i64> {
        self.get_metadata(path).await.map(|m| m.timestamp)
    }

    pub async fn get_visibility(&self, path: &str) -> Result<Visibility> {
        self.get_metadata(path).await.map(|m| m.visibility)
    }

    /// Grant or revoke public read access
    pub async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        let key = self.file_key(path)?;
        debug!("set_visibility: path={} key={} visibility={}", path, key, visibility);

        self.backend
            .get_object(&key)
            .await
            .map_err(|e| not_found_as(e, path))?;

        match visibility {
            Visibility::Public => {
                self.backend
                    .insert_acl(&key, &ObjectAccessControl::public_read())
                    .await
            }
            Visibility::Private => match self.backend.delete_acl(&key, ALL_USERS).await {
                Err(AdapterError::NotFound(_)) => Ok(()),
                other => other,
            },
        }
    }

    /// Bucket-level metadata
    pub async fn bucket_info(&self) -> Result<BucketInfo> {
        self.backend.get_bucket().await
    }

    fn missing(&self, path: &str) -> Result<()> {
        match self.options.delete_missing {
            DeletePolicy::Ignore => Ok(()),
            DeletePolicy::Error => Err(AdapterError::NotFound(path.to_string())),
        }
    }
}

/// Report a backend not-found against the caller's path instead of the key
fn not_found_as(err: AdapterError, path: &str) -> AdapterError {
    match err {
        AdapterError::NotFound(_) => AdapterError::NotFound(path.to_string()),
        other => other,
    }
}
