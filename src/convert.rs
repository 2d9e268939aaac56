//! Backend object to metadata conversion
//!
//! Visibility is derived from the object's ACL: an object is public iff an
//! entry grants access to `allUsers`. Backends frequently omit ACL data
//! (uniform bucket-level access, or a request without full projection);
//! such objects are reported as private rather than failing.

use crate::backend::{ObjectAccessControl, StorageObject, ALL_USERS};
use crate::error::{AdapterError, Result};
use crate::metadata::{FileMetadata, FileType, Visibility};
use crate::path;

/// Convert a single backend object. Fails only when the object has no name.
pub fn to_metadata(object: &StorageObject) -> Result<FileMetadata> {
    if object.name.is_empty() {
        return Err(AdapterError::NotFound(
            "backend object has no name".to_string(),
        ));
    }

    let timestamp = object
        .updated
        .map(|updated| updated.timestamp_millis())
        .unwrap_or(0);

    let file_type = if path::is_directory(&object.name) {
        FileType::Directory
    } else {
        FileType::File
    };

    let mimetype = object
        .content_type
        .clone()
        .unwrap_or_else(|| path::guess_mime_type(&object.name).to_string());

    Ok(FileMetadata {
        path: object.name.clone(),
        size: object.size,
        visibility: visibility(object.acl.as_deref()),
        mimetype,
        timestamp,
        file_type,
    })
}

/// Convert a batch, one output per input, in input order
pub fn to_metadata_list(objects: &[StorageObject]) -> Result<Vec<FileMetadata>> {
    objects.iter().map(to_metadata).collect()
}

/// Derive visibility from ACL entries; missing ACL data means private
pub fn visibility(acl: Option<&[ObjectAccessControl]>) -> Visibility {
    let public = acl
        .unwrap_or_default()
        .iter()
        .any(|entry| entry.entity == ALL_USERS);

    if public {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn object(name: &str) -> StorageObject {
        StorageObject {
            name: name.to_string(),
            size: 4,
            content_type: Some("text/plain".to_string()),
            updated: Some(Utc.with_ymd_and_hms(2015, 3, 1, 12, 0, 0).unwrap()),
            acl: None,
        }
    }

    #[test]
    fn test_convert_file() {
        let metadata = to_metadata(&object("temp.txt")).unwrap();
        assert_eq!(metadata.path, "temp.txt");
        assert_eq!(metadata.size, 4);
        assert_eq!(metadata.mimetype, "text/plain");
        assert_eq!(metadata.timestamp, 1_425_211_200_000);
        assert_eq!(metadata.file_type, FileType::File);
    }

    #[test]
    fn test_missing_acl_defaults_to_private() {
        let metadata = to_metadata(&object("temp.txt")).unwrap();
        assert_eq!(metadata.visibility, Visibility::Private);
    }

    #[test]
    fn test_all_users_entry_is_public() {
        let mut obj = object("temp.txt");
        obj.acl = Some(vec![
            ObjectAccessControl {
                entity: "project-owners-123".to_string(),
                role: "OWNER".to_string(),
            },
            ObjectAccessControl::public_read(),
        ]);
        assert_eq!(to_metadata(&obj).unwrap().visibility, Visibility::Public);

        obj.acl = Some(vec![]);
        assert_eq!(to_metadata(&obj).unwrap().visibility, Visibility::Private);
    }

    #[test]
    fn test_missing_content_type_is_inferred() {
        let mut obj = object("photo.png");
        obj.content_type = None;
        obj.updated = None;
        let metadata = to_metadata(&obj).unwrap();
        assert_eq!(metadata.mimetype, "image/png");
        assert_eq!(metadata.timestamp, 0);
    }

    #[test]
    fn test_marker_object_is_directory() {
        let metadata = to_metadata(&object("photos/")).unwrap();
        assert!(metadata.is_dir());
    }

    #[test]
    fn test_nameless_object_is_not_found() {
        let err = to_metadata(&StorageObject::default()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_batch_preserves_order_and_duplicates() {
        let objects = vec![object("b.txt"), object("a.txt"), object("b.txt")];
        let converted = to_metadata_list(&objects).unwrap();
        let paths: Vec<_> = converted.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["b.txt", "a.txt", "b.txt"]);
    }
}
