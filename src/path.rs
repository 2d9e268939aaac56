//! Path utilities
//!
//! Object stores have a flat key space, so "paths" here are plain `/`
//! separated strings. The root directory is the empty path.

use crate::error::{AdapterError, Result};

/// Content type used for directory marker objects and directory entries
pub const DIRECTORY_MIME_TYPE: &str = "application/x-directory";

/// Content type used when nothing better can be inferred
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Extension to MIME type table, sorted by extension
const MIME_TYPES: &[(&str, &str)] = &[
    ("7z", "application/x-7z-compressed"),
    ("avi", "video/x-msvideo"),
    ("bmp", "image/bmp"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("gif", "image/gif"),
    ("gz", "application/gzip"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("ico", "image/vnd.microsoft.icon"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("md", "text/markdown"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("ogg", "audio/ogg"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("tar", "application/x-tar"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("txt", "text/plain"),
    ("wasm", "application/wasm"),
    ("wav", "audio/wav"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("xml", "application/xml"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("zip", "application/zip"),
];

/// Normalize a path to its canonical object-key form.
///
/// Leading and trailing separators are removed, empty and `.` components
/// are dropped. `..` is rejected because keys cannot escape the bucket.
pub fn normalize(path: &str) -> Result<String> {
    let mut components = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                return Err(AdapterError::InvalidPath(format!(
                    "parent references are not allowed: {}",
                    path
                )))
            }
            c => components.push(c),
        }
    }
    Ok(components.join("/"))
}

/// Whether a raw key denotes a directory (marker objects end with `/`)
pub fn is_directory(path: &str) -> bool {
    path.ends_with('/')
}

/// Turn a normalized path into a directory prefix (`a/b` -> `a/b/`).
/// The root stays empty.
pub fn dir_prefix(path: &str) -> String {
    if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Parent directory of a path, empty for top-level entries
pub fn dirname(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[..idx],
        None => "",
    }
}

/// Last component of a path
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Guess a MIME type from the path's extension
pub fn guess_mime_type(path: &str) -> &'static str {
    if is_directory(path) {
        return DIRECTORY_MIME_TYPE;
    }

    let name = basename(path);
    let extension = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return DEFAULT_MIME_TYPE,
    };

    MIME_TYPES
        .binary_search_by(|(ext, _)| (*ext).cmp(extension.as_str()))
        .map(|idx| MIME_TYPES[idx].1)
        .unwrap_or(DEFAULT_MIME_TYPE)
}
