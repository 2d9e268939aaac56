//! Adapter behaviour against the in-memory backend

use std::sync::Arc;

use gcs_flysystem::backend::memory::MemoryBackend;
use gcs_flysystem::backend::StorageBackend;
use gcs_flysystem::{
    AdapterError, AdapterOptions, DeletePolicy, FileType, GcsAdapter, Visibility, WriteOptions,
};

fn setup() -> (Arc<MemoryBackend>, GcsAdapter) {
    let backend = Arc::new(MemoryBackend::new("test-bucket"));
    let adapter = GcsAdapter::new(backend.clone());
    (backend, adapter)
}

fn paths(entries: &[gcs_flysystem::FileMetadata]) -> Vec<&str> {
    entries.iter().map(|m| m.path.as_str()).collect()
}

async fn seed(adapter: &GcsAdapter, files: &[&str]) {
    for file in files {
        adapter
            .write(file, *file, &WriteOptions::default())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let (_, adapter) = setup();

    adapter
        .write("docs/readme.md", "# hello", &WriteOptions::default())
        .await
        .unwrap();

    assert_eq!(adapter.read("docs/readme.md").await.unwrap(), "# hello");
    assert_eq!(
        adapter.read_bytes("/docs/readme.md").await.unwrap().as_ref(),
        b"# hello"
    );
}

#[tokio::test]
async fn has_and_delete_lifecycle() {
    let (_, adapter) = setup();

    assert!(!adapter.has("temp.txt").await.unwrap());
    adapter
        .write("temp.txt", "1234", &WriteOptions::default())
        .await
        .unwrap();
    assert!(adapter.has("temp.txt").await.unwrap());

    adapter.delete("temp.txt").await.unwrap();
    assert!(!adapter.has("temp.txt").await.unwrap());
}

#[tokio::test]
async fn double_delete_is_ignored_by_default() {
    let (_, adapter) = setup();
    seed(&adapter, &["temp.txt"]).await;

    adapter.delete("temp.txt").await.unwrap();
    adapter.delete("temp.txt").await.unwrap();
}

#[tokio::test]
async fn delete_policy_error_surfaces_not_found() {
    let (_, adapter) = setup();
    let adapter = adapter.with_options(AdapterOptions {
        delete_missing: DeletePolicy::Error,
        ..Default::default()
    });

    let err = adapter.delete("missing.txt").await.unwrap_err();
    assert!(err.is_not_found());

    let err = adapter.delete_dir("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn size_of_written_file() {
    let (_, adapter) = setup();
    adapter
        .write("temp.txt", "1234", &WriteOptions::default())
        .await
        .unwrap();

    assert_eq!(adapter.get_size("temp.txt").await.unwrap(), 4);
}

#[tokio::test]
async fn metadata_accessors_agree_with_get_metadata() {
    let (_, adapter) = setup();
    adapter
        .write("image.png", vec![0u8; 16], &WriteOptions::default())
        .await
        .unwrap();

    let metadata = adapter.get_metadata("image.png").await.unwrap();
    assert_eq!(metadata.path, "image.png");
    assert_eq!(metadata.file_type, FileType::File);
    assert_eq!(metadata.mimetype, "image/png");
    assert!(metadata.timestamp > 0);

    assert_eq!(adapter.get_size("image.png").await.unwrap(), metadata.size);
    assert_eq!(
        adapter.get_mimetype("image.png").await.unwrap(),
        metadata.mimetype
    );
    assert_eq!(
        adapter.get_timestamp("image.png").await.unwrap(),
        metadata.timestamp
    );
    assert_eq!(
        adapter.get_visibility("image.png").await.unwrap(),
        metadata.visibility
    );
}

#[tokio::test]
async fn metadata_of_missing_path_is_not_found() {
    let (_, adapter) = setup();

    match adapter.get_metadata("nope.txt").await {
        Err(AdapterError::NotFound(path)) => assert_eq!(path, "nope.txt"),
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert!(adapter.read("nope.txt").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn write_options_override_defaults() {
    let (_, adapter) = setup();
    let options = WriteOptions::default()
        .with_mimetype("application/json")
        .with_visibility(Visibility::Public);

    let metadata = adapter.write("data.txt", "{}", &options).await.unwrap();
    assert_eq!(metadata.mimetype, "application/json");
    assert_eq!(metadata.visibility, Visibility::Public);
    assert_eq!(
        adapter.get_visibility("data.txt").await.unwrap(),
        Visibility::Public
    );
}

#[tokio::test]
async fn default_visibility_is_private() {
    let (_, adapter) = setup();
    seed(&adapter, &["a.txt"]).await;

    assert_eq!(
        adapter.get_visibility("a.txt").await.unwrap(),
        Visibility::Private
    );
}

#[tokio::test]
async fn visibility_round_trip() {
    let (_, adapter) = setup();
    seed(&adapter, &["a.txt"]).await;

    adapter
        .set_visibility("a.txt", Visibility::Public)
        .await
        .unwrap();
    assert_eq!(
        adapter.get_visibility("a.txt").await.unwrap(),
        Visibility::Public
    );

    adapter
        .set_visibility("a.txt", Visibility::Private)
        .await
        .unwrap();
    assert_eq!(
        adapter.get_visibility("a.txt").await.unwrap(),
        Visibility::Private
    );

    // Already private
    adapter
        .set_visibility("a.txt", Visibility::Private)
        .await
        .unwrap();
}

#[tokio::test]
async fn set_visibility_on_missing_file() {
    let (_, adapter) = setup();
    let err = adapter
        .set_visibility("missing.txt", Visibility::Public)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn copy_keeps_source() {
    let (_, adapter) = setup();
    seed(&adapter, &["a.txt"]).await;

    adapter.copy("a.txt", "b/c.txt").await.unwrap();
    assert_eq!(adapter.read("a.txt").await.unwrap(), "a.txt");
    assert_eq!(adapter.read("b/c.txt").await.unwrap(), "a.txt");
}

#[tokio::test]
async fn copy_missing_source_fails() {
    let (backend, adapter) = setup();
    let err = adapter.copy("missing.txt", "b.txt").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(backend.keys().is_empty());
}

#[tokio::test]
async fn update_requires_existing_file() {
    let (_, adapter) = setup();

    let err = adapter
        .update("missing.txt", "x", &WriteOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!adapter.has("missing.txt").await.unwrap());

    seed(&adapter, &["present.txt"]).await;
    adapter
        .update("present.txt", "updated", &WriteOptions::default())
        .await
        .unwrap();
    assert_eq!(adapter.read("present.txt").await.unwrap(), "updated");
}

#[tokio::test]
async fn rename_moves_file() {
    let (backend, adapter) = setup();
    seed(&adapter, &["a.txt"]).await;

    adapter.rename("a.txt", "moved/b.txt").await.unwrap();
    assert!(!adapter.has("a.txt").await.unwrap());
    assert_eq!(adapter.read("moved/b.txt").await.unwrap(), "a.txt");
    assert_eq!(backend.keys(), vec!["moved/b.txt"]);
}

#[tokio::test]
async fn rename_refuses_to_overwrite_by_default() {
    let (_, adapter) = setup();
    seed(&adapter, &["a.txt", "b.txt"]).await;

    let err = adapter.rename("a.txt", "b.txt").await.unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(adapter.read("a.txt").await.unwrap(), "a.txt");
    assert_eq!(adapter.read("b.txt").await.unwrap(), "b.txt");
}

#[tokio::test]
async fn rename_overwrites_when_enabled() {
    let (_, adapter) = setup();
    let adapter = adapter.with_options(AdapterOptions {
        rename_overwrite: true,
        ..Default::default()
    });
    seed(&adapter, &["a.txt", "b.txt"]).await;

    adapter.rename("a.txt", "b.txt").await.unwrap();
    assert!(!adapter.has("a.txt").await.unwrap());
    assert_eq!(adapter.read("b.txt").await.unwrap(), "a.txt");
}

#[tokio::test]
async fn rename_missing_source_fails() {
    let (_, adapter) = setup();
    let err = adapter.rename("missing.txt", "b.txt").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn rename_reports_partial_failure() {
    let (backend, adapter) = setup();
    seed(&adapter, &["a.txt"]).await;
    backend.fail_delete("a.txt");

    match adapter.rename("a.txt", "b.txt").await {
        Err(AdapterError::PartialRename { from, to, .. }) => {
            assert_eq!(from, "a.txt");
            assert_eq!(to, "b.txt");
        }
        other => panic!("expected PartialRename, got {:?}", other),
    }

    // Copy landed, source still there
    assert!(adapter.has("a.txt").await.unwrap());
    assert!(adapter.has("b.txt").await.unwrap());
}

#[tokio::test]
async fn create_and_delete_directory() {
    let (backend, adapter) = setup();

    let marker = adapter
        .create_dir("photos", &WriteOptions::default())
        .await
        .unwrap();
    assert!(marker.is_dir());
    assert_eq!(marker.path, "photos");
    assert_eq!(backend.keys(), vec!["photos/"]);

    let metadata = adapter.get_metadata("photos").await.unwrap();
    assert!(metadata.is_dir());
    assert!(adapter.has("photos").await.unwrap());

    seed(&adapter, &["photos/a.jpg", "photos/2015/b.jpg", "photography.txt"]).await;
    adapter.delete_dir("photos").await.unwrap();

    assert_eq!(backend.keys(), vec!["photography.txt"]);
    assert!(!adapter.has("photos").await.unwrap());
}

#[tokio::test]
async fn implied_directory_has_metadata() {
    let (_, adapter) = setup();
    seed(&adapter, &["a/b/c.txt"]).await;

    assert!(adapter.has("a").await.unwrap());
    assert!(adapter.has("a/b").await.unwrap());
    let metadata = adapter.get_metadata("a/b").await.unwrap();
    assert_eq!(metadata.path, "a/b");
    assert!(metadata.is_dir());
}

#[tokio::test]
async fn shallow_listing_collapses_directories() {
    let (_, adapter) = setup();
    seed(&adapter, &["a.txt", "dir/b.txt", "dir/sub/c.txt", "z.txt"]).await;

    let listed = adapter.list_contents("", false).await.unwrap();
    assert_eq!(paths(&listed), vec!["a.txt", "dir", "z.txt"]);
    assert!(listed[1].is_dir());

    let listed = adapter.list_contents("dir", false).await.unwrap();
    assert_eq!(paths(&listed), vec!["dir/b.txt", "dir/sub"]);
}

#[tokio::test]
async fn recursive_listing_is_superset_of_shallow() {
    let (_, adapter) = setup();
    seed(&adapter, &["a.txt", "dir/b.txt", "dir/sub/c.txt", "other/deep/d.txt"]).await;
    adapter
        .create_dir("empty", &WriteOptions::default())
        .await
        .unwrap();

    let shallow = adapter.list_contents("", false).await.unwrap();
    let deep = adapter.list_contents("", true).await.unwrap();

    for entry in &shallow {
        assert!(
            deep.iter()
                .any(|d| d.path == entry.path && d.file_type == entry.file_type),
            "{} missing from recursive listing",
            entry.path
        );
    }
    assert_eq!(
        paths(&deep),
        vec![
            "a.txt",
            "dir",
            "dir/b.txt",
            "dir/sub",
            "dir/sub/c.txt",
            "empty",
            "other",
            "other/deep",
            "other/deep/d.txt",
        ]
    );
}

#[tokio::test]
async fn listing_skips_own_marker() {
    let (_, adapter) = setup();
    adapter
        .create_dir("dir", &WriteOptions::default())
        .await
        .unwrap();
    seed(&adapter, &["dir/a.txt"]).await;

    assert_eq!(
        paths(&adapter.list_contents("dir", false).await.unwrap()),
        vec!["dir/a.txt"]
    );
    assert_eq!(
        paths(&adapter.list_contents("dir", true).await.unwrap()),
        vec!["dir/a.txt"]
    );
}

#[tokio::test]
async fn listing_drains_all_pages() {
    let backend = Arc::new(MemoryBackend::new("paged").with_page_size(2));
    let adapter = GcsAdapter::new(backend);
    let files: Vec<String> = (0..7).map(|i| format!("logs/{}.log", i)).collect();
    for file in &files {
        adapter
            .write(file, "x", &WriteOptions::default())
            .await
            .unwrap();
    }

    let listed = adapter.list_contents("logs", false).await.unwrap();
    assert_eq!(listed.len(), 7);
    assert_eq!(
        paths(&listed),
        files.iter().map(String::as_str).collect::<Vec<_>>()
    );

    let deep = adapter.list_contents("", true).await.unwrap();
    assert_eq!(deep.len(), 8);
}

#[tokio::test]
async fn empty_directory_lists_nothing() {
    let (_, adapter) = setup();
    assert!(adapter.list_contents("nothing", true).await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_paths_are_rejected() {
    let (_, adapter) = setup();

    let err = adapter
        .write("../escape.txt", "x", &WriteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::InvalidPath(_)));

    let err = adapter
        .write("/", "x", &WriteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::InvalidPath(_)));
}

#[tokio::test]
async fn bucket_info_reports_bucket() {
    let (_, adapter) = setup();
    let info = adapter.bucket_info().await.unwrap();
    assert_eq!(info.name, "test-bucket");
    assert_eq!(adapter.bucket(), "test-bucket");
}

#[tokio::test]
async fn prefixed_adapters_are_isolated() {
    let backend = Arc::new(MemoryBackend::new("shared"));
    let a = GcsAdapter::new(backend.clone()).with_prefix("tenant-a").unwrap();
    let b = GcsAdapter::new(backend.clone()).with_prefix("tenant-b").unwrap();

    seed(&a, &["file.txt"]).await;
    assert!(a.has("file.txt").await.unwrap());
    assert!(!b.has("file.txt").await.unwrap());
    assert_eq!(backend.keys(), vec!["tenant-a/file.txt"]);
}

#[tokio::test]
async fn concurrent_writes_from_shared_adapter() {
    let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new("concurrent"));
    let adapter = Arc::new(GcsAdapter::new(backend));

    let mut handles = Vec::new();
    for i in 0..16 {
        let adapter = adapter.clone();
        handles.push(tokio::spawn(async move {
            let path = format!("jobs/{:02}.txt", i);
            adapter
                .write(&path, format!("job {}", i), &WriteOptions::default())
                .await
                .unwrap();
            adapter.read(&path).await.unwrap()
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), format!("job {}", i));
    }
    assert_eq!(adapter.list_contents("jobs", false).await.unwrap().len(), 16);
}

#[tokio::test]
async fn file_and_directory_with_same_name_both_listed() {
    let (_, adapter) = setup();
    adapter
        .write("dir", "file", &WriteOptions::default())
        .await
        .unwrap();
    adapter
        .write("dir/x.txt", "x", &WriteOptions::default())
        .await
        .unwrap();

    let shallow = adapter.list_contents("", false).await.unwrap();
    let kinds: Vec<_> = shallow
        .iter()
        .map(|m| (m.path.as_str(), m.file_type))
        .collect();
    assert_eq!(
        kinds,
        vec![("dir", FileType::File), ("dir", FileType::Directory)]
    );

    let deep = adapter.list_contents("", true).await.unwrap();
    let kinds: Vec<_> = deep.iter().map(|m| (m.path.as_str(), m.file_type)).collect();
    assert_eq!(
        kinds,
        vec![
            ("dir", FileType::File),
            ("dir", FileType::Directory),
            ("dir/x.txt", FileType::File),
        ]
    );
}

#[tokio::test]
async fn delete_surfaces_backend_failures() {
    let (backend, adapter) = setup();
    seed(&adapter, &["locked.txt"]).await;
    backend.fail_delete("locked.txt");

    let err = adapter.delete("locked.txt").await.unwrap_err();
    assert!(matches!(err, AdapterError::Backend { .. }));
    assert!(adapter.has("locked.txt").await.unwrap());
}

#[tokio::test]
async fn has_surfaces_backend_failures() {
    let (backend, adapter) = setup();
    seed(&adapter, &["flaky.txt"]).await;
    backend.fail_get("flaky.txt");

    let err = adapter.has("flaky.txt").await.unwrap_err();
    assert!(matches!(err, AdapterError::Backend { .. }));

    // Missing paths still answer false
    assert!(!adapter.has("absent.txt").await.unwrap());
}
