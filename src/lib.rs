//! gcs-flysystem: a filesystem abstraction over Google Cloud Storage buckets
//!
//! Callers work with paths, files, directories and public/private
//! visibility; the adapter maps those onto an object store that has no
//! native directories, no atomic rename and ACL-based access control.
//!
//! # Architecture
//!
//! - **Backend**: the `StorageBackend` trait is the object-storage
//!   capability the adapter consumes. `GcsClient` implements it over the
//!   Cloud Storage JSON API; `MemoryBackend` keeps objects in process.
//! - **Builder**: `AdapterBuilder` validates bucket and credentials and
//!   authorizes a service account before any operation is attempted.
//! - **Adapter**: `GcsAdapter` implements the filesystem operations
//!   (read, write, rename, list, visibility, metadata).
//! - **Converter**: turns backend objects into `FileMetadata`.
//!
//! # Example
//!
//! ```no_run
//! use gcs_flysystem::{GcsAdapter, WriteOptions};
//!
//! # async fn example() -> gcs_flysystem::Result<()> {
//! let adapter = GcsAdapter::builder()
//!     .bucket("assets")
//!     .service_account("uploader@my-project.iam.gserviceaccount.com")
//!     .key_file("/etc/gcs/key.json")
//!     .application_name("MyCompany-ProductName/1.0")
//!     .build()
//!     .await?;
//!
//! adapter.write("temp.txt", "1234", &WriteOptions::default()).await?;
//! assert_eq!(adapter.get_size("temp.txt").await?, 4);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod auth;
pub mod backend;
pub mod builder;
pub mod config;
pub mod convert;
pub mod env;
pub mod error;
pub mod metadata;
pub mod path;

pub use adapter::{AdapterOptions, DeletePolicy, GcsAdapter};
pub use builder::AdapterBuilder;
pub use error::{AdapterError, Result};
pub use metadata::{FileMetadata, FileType, Visibility, WriteOptions};
