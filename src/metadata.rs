//! Backend-agnostic metadata model

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::path::DIRECTORY_MIME_TYPE;

/// File type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileType {
    File,
    Directory,
}

/// Public/private read access, derived from access-control entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => f.write_str("public"),
            Visibility::Private => f.write_str("private"),
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(format!("unknown visibility: {}", other)),
        }
    }
}

/// Snapshot of a stored object.
///
/// Records are created fresh for every query and may be stale by the time
/// the caller acts on them. Two records with the same `path` describe the
/// same logical file.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub path: String,
    pub size: u64,
    pub visibility: Visibility,
    pub mimetype: String,
    /// Last modification, epoch milliseconds
    pub timestamp: i64,
    pub file_type: FileType,
}

impl FileMetadata {
    pub fn file(
        path: impl Into<String>,
        size: u64,
        visibility: Visibility,
        mimetype: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            visibility,
            mimetype: mimetype.into(),
            timestamp,
            file_type: FileType::File,
        }
    }

    pub fn directory(path: impl Into<String>, timestamp: i64) -> Self {
        Self {
            path: path.into(),
            size: 0,
            visibility: Visibility::Private,
            mimetype: DIRECTORY_MIME_TYPE.to_string(),
            timestamp,
            file_type: FileType::Directory,
        }
    }

    /// Same record under a different path
    pub fn with_path(self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..self
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.file_type, FileType::File)
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.file_type, FileType::Directory)
    }
}

impl PartialEq for FileMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FileMetadata {}

/// Per-call options for `write` and `update`
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Visibility applied at upload time. `None` keeps the bucket default.
    pub visibility: Option<Visibility>,
    /// Explicit content type. `None` infers it from the path's extension.
    pub mimetype: Option<String>,
}

impl WriteOptions {
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }
}
