use std::collections::BTreeSet;

use chrono::NaiveDate;
use tempfile::tempdir;

use mediamirror_core::model::{FileKind, GroupKind};
use mediamirror_core::paths::resolve_collision;
use mediamirror_core::storage::models::*;
use mediamirror_core::storage::RecordStore;

fn make_test_item(id: &str, path: &str) -> ItemRecord {
    ItemRecord {
        remote_id: id.to_string(),
        name: format!("Item {}", id),
        source_url: format!("https://www.youtube.com/watch?v={}", id),
        parent_id: None,
        parent_type: ParentType::None,
        path: path.to_string(),
        files: BTreeSet::from([format!("{}/{}.mp4", path, id)]),
        available: true,
        last_checked: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    }
}

fn make_test_file(filepath: &str, parent: &str) -> FileRecord {
    FileRecord {
        filepath: filepath.to_string(),
        parent: parent.to_string(),
        kind: FileKind::Video,
        language: None,
        resolution: Some("720p".to_string()),
        size_bytes: None,
        downloaded: false,
    }
}

#[test]
fn test_set_get_and_commit_survive_reopen() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("store");

    {
        let store = RecordStore::open(&db_path).unwrap();
        let mut items = store.open_table::<ItemRecord>().unwrap();
        items.set("a", make_test_item("a", "singles/A"));
        assert_eq!(items.get("a").unwrap().unwrap().path, "singles/A");
        assert_eq!(items.commit().unwrap(), 1);
        assert!(!items.has_pending());
    }

    let store = RecordStore::open(&db_path).unwrap();
    let items = store.open_table::<ItemRecord>().unwrap();
    assert_eq!(items.get("a").unwrap(), Some(make_test_item("a", "singles/A")));
    assert_eq!(items.get("missing").unwrap(), None);
}

#[test]
fn test_uncommitted_writes_are_lost() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("store");

    {
        let store = RecordStore::open(&db_path).unwrap();
        let mut files = store.open_table::<FileRecord>().unwrap();
        files.set("x.mp4", make_test_file("x.mp4", "x"));
        assert!(files.has_pending());
    }

    let store = RecordStore::open(&db_path).unwrap();
    assert!(store.open_table::<FileRecord>().unwrap().is_empty().unwrap());
}

#[test]
fn test_delete_is_idempotent_and_buffered() {
    let tmp = tempdir().unwrap();
    let store = RecordStore::open(&tmp.path().join("store")).unwrap();
    let mut paths = store.open_table::<PathRecord>().unwrap();

    paths.set("singles/A", PathRecord { owner: "a".into() });
    paths.commit().unwrap();

    paths.delete("singles/A");
    paths.delete("never/there");
    assert!(!paths.contains("singles/A").unwrap());
    assert_eq!(paths.keys().unwrap(), Vec::<String>::new());
    paths.commit().unwrap();

    let reopened = store.open_table::<PathRecord>().unwrap();
    assert!(reopened.is_empty().unwrap());
}

#[test]
fn test_entries_merge_pending_over_committed() {
    let tmp = tempdir().unwrap();
    let store = RecordStore::open(&tmp.path().join("store")).unwrap();
    let mut files = store.open_table::<FileRecord>().unwrap();

    files.set("b.mp4", make_test_file("b.mp4", "b"));
    files.set("c.mp4", make_test_file("c.mp4", "c"));
    files.commit().unwrap();

    let mut done = make_test_file("b.mp4", "b");
    done.downloaded = true;
    files.set("b.mp4", done);
    files.set("a.mp4", make_test_file("a.mp4", "a"));
    files.delete("c.mp4");

    let entries = files.entries().unwrap();
    let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["a.mp4", "b.mp4"]);
    assert!(entries[1].1.downloaded);
    assert_eq!(files.len().unwrap(), 2);
}

#[test]
fn test_tables_are_isolated() {
    let tmp = tempdir().unwrap();
    let store = RecordStore::open(&tmp.path().join("store")).unwrap();
    let mut tables = store.open_all().unwrap();

    tables.groups.set(
        "same",
        GroupRecord {
            remote_id: "same".into(),
            kind: GroupKind::Playlist,
            name: "Mix".into(),
            source_url: "https://www.youtube.com/playlist?list=same".into(),
            children: BTreeSet::new(),
            path: "playlists/Mix".into(),
            available: true,
        },
    );
    tables.items.set("same", make_test_item("same", "singles/Same"));
    assert_eq!(tables.commit_all().unwrap(), 2);

    let fresh = store.open_all().unwrap();
    assert_eq!(fresh.groups.get("same").unwrap().unwrap().kind, GroupKind::Playlist);
    assert_eq!(fresh.items.get("same").unwrap().unwrap().path, "singles/Same");
    assert!(fresh.paths.is_empty().unwrap());
    assert!(fresh.files.is_empty().unwrap());
}

#[test]
fn test_path_table_drives_collision_resolution() {
    let tmp = tempdir().unwrap();
    let store = RecordStore::open(&tmp.path().join("store")).unwrap();
    let mut paths = store.open_table::<PathRecord>().unwrap();

    paths.set("singles/My_Video", PathRecord { owner: "id1".into() });
    paths.commit().unwrap();
    // Buffered entries count as taken too.
    paths.set("singles/My_Video_id2", PathRecord { owner: "other".into() });

    let resolved = resolve_collision("singles/My_Video", &paths, "id2").unwrap();
    assert_eq!(resolved, "singles/My_Video_id2_id2");
    assert_eq!(
        resolve_collision("singles/Fresh", &paths, "id3").unwrap(),
        "singles/Fresh"
    );
}
