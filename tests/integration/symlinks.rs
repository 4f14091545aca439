use crate::integration::support::{set, tree_paths, Fixture};
use shadowtree::{NodeKind, RawEvent};
use std::fs;
use std::os::unix::fs::symlink;

#[test]
fn link_to_ancestor_is_never_added() {
    let fixture = Fixture::new(&["a/b/file.txt"]);
    symlink(fixture.path("a"), fixture.path("a/b/up")).unwrap();
    symlink(&fixture.root, fixture.path("a/root")).unwrap();

    let mut engine = fixture.engine(&[], true);
    let outcome = engine.sync_now().unwrap();

    assert_eq!(outcome.merges_completed, 1);
    assert_eq!(tree_paths(&engine), set(["a", "a/b", "a/b/file.txt"]));
    assert!(engine.watchers().symlink_watch_paths().is_empty());
}

#[test]
fn link_to_sibling_tree_is_merged_and_watched() {
    let fixture = Fixture::new(&["shared/lib/x.txt", "app/"]);
    symlink(fixture.path("shared/lib"), fixture.path("app/lib")).unwrap();

    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();

    assert_eq!(
        tree_paths(&engine),
        set([
            "app",
            "app/lib",
            "app/lib/x.txt",
            "shared",
            "shared/lib",
            "shared/lib/x.txt",
        ])
    );
    assert_eq!(
        engine.watchers().symlink_watch_paths(),
        vec![fixture.path("app/lib")]
    );
    assert_eq!(engine.status().symlink_watchers, 1);
}

#[test]
fn dangling_link_is_skipped() {
    let fixture = Fixture::new(&["a.txt"]);
    symlink(fixture.path("nowhere"), fixture.path("broken")).unwrap();

    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();

    assert_eq!(tree_paths(&engine), set(["a.txt"]));
}

#[test]
fn deleting_linked_directory_disposes_its_watcher() {
    let fixture = Fixture::new(&["shared/x.txt", "app/"]);
    symlink(fixture.path("shared"), fixture.path("app/shared")).unwrap();
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();
    assert_eq!(engine.watchers().symlink_watch_paths().len(), 1);

    fs::remove_file(fixture.path("app/shared")).unwrap();
    engine.enqueue(RawEvent::deleted(fixture.path("app/shared")));
    engine.sync_now().unwrap();

    assert!(engine.watchers().symlink_watch_paths().is_empty());
    assert_eq!(tree_paths(&engine), set(["app", "shared", "shared/x.txt"]));
}

#[test]
fn created_cyclic_link_is_ignored() {
    let fixture = Fixture::new(&["a/b/"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();

    symlink(fixture.path("a"), fixture.path("a/b/loop")).unwrap();
    engine.enqueue(RawEvent::created(fixture.path("a/b/loop")));
    engine.sync_now().unwrap();

    assert_eq!(tree_paths(&engine), set(["a", "a/b"]));
}

#[test]
fn link_onto_member_file_gets_no_watcher() {
    let fixture = Fixture::new(&["shared/x.txt", "app/"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();

    let link = fixture.path("app/link");
    engine.host_mut().add_member(&link);
    let member = engine.add_member(&link, NodeKind::File).unwrap();
    symlink(fixture.path("shared"), &link).unwrap();

    engine.queue().on_overflow(None);
    engine.sync_now().unwrap();

    assert!(engine.watchers().symlink_watch_paths().is_empty());
    let node = engine.tree().get(member).unwrap();
    assert!(node.is_member());
    assert!(!node.is_directory());
}
