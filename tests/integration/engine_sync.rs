use crate::integration::support::{
    drain_one_unit_at_a_time, set, tree_paths, visible_paths, Fixture, Notification,
};
use shadowtree::{NodeKind, NodeProperty, RawEvent};
use std::fs;

#[test]
fn initial_merge_mirrors_members_and_disk_entries() {
    let fixture = Fixture::new(&["a.py", "b.py"]);
    let mut engine = fixture.engine(&["a.py"], false);

    let outcome = engine.sync_now().unwrap();
    assert_eq!(outcome.merges_completed, 1);
    assert!(!outcome.work_remaining);

    let tree = engine.tree();
    let a = tree.get(tree.find_by_path(&fixture.path("a.py")).unwrap()).unwrap();
    let b = tree.get(tree.find_by_path(&fixture.path("b.py")).unwrap()).unwrap();
    assert!(a.is_member() && a.is_visible());
    assert!(!b.is_member() && !b.is_visible());

    // Only the visible node is announced.
    assert_eq!(engine.listener().added(), 1);
    assert_eq!(engine.listener().merges(), 1);
}

#[test]
fn deleted_non_member_is_pruned_after_one_tick() {
    let fixture = Fixture::new(&["a.py", "b.py"]);
    let mut engine = fixture.engine(&["a.py"], false);
    engine.sync_now().unwrap();

    fs::remove_file(fixture.path("b.py")).unwrap();
    engine.enqueue(RawEvent::deleted(fixture.path("b.py")));
    let outcome = engine.on_idle(|| true);

    assert_eq!(outcome.records_applied, 1);
    assert!(!outcome.work_remaining);
    assert_eq!(tree_paths(&engine), set(["a.py"]));
}

#[test]
fn delete_event_for_entry_still_on_disk_is_ignored() {
    let fixture = Fixture::new(&["a.py", "b.py"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();
    engine.listener_mut().clear();

    engine.enqueue(RawEvent::deleted(fixture.path("b.py")));
    engine.sync_now().unwrap();

    assert_eq!(tree_paths(&engine), set(["a.py", "b.py"]));
    assert_eq!(engine.listener().deleted(), 0);
}

#[test]
fn missing_member_is_kept_and_reported() {
    let fixture = Fixture::new(&["a.py"]);
    let mut engine = fixture.engine(&["a.py"], false);
    engine.sync_now().unwrap();
    let a = engine.tree().find_by_path(&fixture.path("a.py")).unwrap();

    fs::remove_file(fixture.path("a.py")).unwrap();
    engine.enqueue(RawEvent::deleted(fixture.path("a.py")));
    engine.sync_now().unwrap();

    assert!(engine.tree().contains(a));
    let events = &engine.listener().events;
    assert!(events.contains(&Notification::MemberMissing(a)));
    assert!(events.contains(&Notification::Property(a, NodeProperty::Icon)));
    assert!(!events.contains(&Notification::Deleted(a)));
}

#[test]
fn created_file_and_directory_are_merged() {
    let fixture = Fixture::new(&["a.py"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();

    fixture.create("c.py");
    fixture.create("lib/x.py");
    fixture.create("lib/deep/y.py");
    engine.enqueue(RawEvent::created(fixture.path("c.py")));
    engine.enqueue(RawEvent::created(fixture.path("lib")));
    let outcome = engine.sync_now().unwrap();

    assert_eq!(outcome.records_applied, 2);
    assert_eq!(outcome.merges_completed, 1);
    assert_eq!(tree_paths(&engine), fixture.disk_paths());

    let lib = engine.tree().find_by_path(&fixture.path("lib")).unwrap();
    assert!(engine
        .listener()
        .events
        .contains(&Notification::Invalidated(lib)));
}

#[test]
fn created_event_for_known_node_only_refreshes_icon() {
    let fixture = Fixture::new(&["a.py"]);
    let mut engine = fixture.engine(&["a.py"], false);
    engine.sync_now().unwrap();
    engine.listener_mut().clear();
    let a = engine.tree().find_by_path(&fixture.path("a.py")).unwrap();

    engine.enqueue(RawEvent::created(fixture.path("a.py")));
    engine.sync_now().unwrap();

    assert_eq!(
        engine.listener().events,
        vec![Notification::Property(a, NodeProperty::Icon)]
    );
}

#[test]
fn rename_replaces_the_node() {
    let fixture = Fixture::new(&["old.txt"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();
    let old = engine.tree().find_by_path(&fixture.path("old.txt")).unwrap();

    fs::rename(fixture.path("old.txt"), fixture.path("new.txt")).unwrap();
    engine.enqueue(RawEvent::renamed(fixture.path("old.txt"), fixture.path("new.txt")));
    engine.sync_now().unwrap();

    assert_eq!(tree_paths(&engine), set(["new.txt"]));
    assert!(!engine.tree().contains(old));
    assert!(engine.listener().events.contains(&Notification::Deleted(old)));
}

#[cfg(target_os = "linux")]
#[test]
fn case_only_rename_keeps_the_node() {
    let fixture = Fixture::new(&["readme.md"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();
    let node = engine.tree().find_by_path(&fixture.path("readme.md")).unwrap();
    engine.listener_mut().clear();

    fs::rename(fixture.path("readme.md"), fixture.path("README.md")).unwrap();
    engine.enqueue(RawEvent::renamed(fixture.path("readme.md"), fixture.path("README.md")));
    engine.sync_now().unwrap();

    assert_eq!(engine.tree().find_by_path(&fixture.path("README.md")), Some(node));
    assert_eq!(engine.tree().get(node).unwrap().name(), "README.md");
    assert_eq!(
        engine.listener().events,
        vec![Notification::Property(node, NodeProperty::Caption)]
    );
}

#[test]
fn changed_event_picks_up_unseen_entry() {
    let fixture = Fixture::new(&["a.py"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();

    fixture.create("late.py");
    engine.enqueue(RawEvent::changed(fixture.path("late.py")));
    engine.enqueue(RawEvent::changed(fixture.path("a.py")));
    engine.sync_now().unwrap();

    assert_eq!(tree_paths(&engine), set(["a.py", "late.py"]));
}

#[test]
fn created_event_without_parent_node_is_skipped() {
    let fixture = Fixture::new(&["a.py"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();

    fixture.create("pkg/inner.py");
    engine.enqueue(RawEvent::created(fixture.path("pkg/inner.py")));
    engine.sync_now().unwrap();
    assert_eq!(tree_paths(&engine), set(["a.py"]));

    // The folder event arrives late and brings the file with it.
    engine.enqueue(RawEvent::created(fixture.path("pkg")));
    engine.sync_now().unwrap();
    assert_eq!(tree_paths(&engine), set(["a.py", "pkg", "pkg/inner.py"]));
}

#[test]
fn excluded_entries_never_become_nodes() {
    let fixture = Fixture::new(&["a.py", ".git/HEAD", ".hidden", "keep/b.py"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();

    fixture.create(".env");
    engine.enqueue(RawEvent::created(fixture.path(".env")));
    engine.sync_now().unwrap();

    assert_eq!(tree_paths(&engine), set(["a.py", "keep", "keep/b.py"]));
}

#[test]
fn rescan_replaces_entry_whose_kind_changed() {
    let fixture = Fixture::new(&["thing"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();
    let file_node = engine.tree().find_by_path(&fixture.path("thing")).unwrap();

    fs::remove_file(fixture.path("thing")).unwrap();
    fixture.create("thing/inside.txt");
    engine.queue().on_overflow(None);
    engine.sync_now().unwrap();

    let dir_node = engine.tree().find_by_path(&fixture.path("thing")).unwrap();
    assert_ne!(file_node, dir_node);
    assert_eq!(engine.tree().get(dir_node).unwrap().kind(), NodeKind::Directory);
    assert_eq!(tree_paths(&engine), set(["thing", "thing/inside.txt"]));
}

#[test]
fn second_full_merge_is_idempotent() {
    let fixture = Fixture::new(&["a.py", "src/lib.rs", "src/bin/main.rs", "docs/"]);
    let mut engine = fixture.engine(&["src/lib.rs"], true);
    engine.sync_now().unwrap();
    let before = engine.tree().snapshot();
    engine.listener_mut().clear();

    engine.queue().on_overflow(None);
    engine.sync_now().unwrap();

    assert_eq!(engine.listener().structural(), 0);
    assert_eq!(engine.tree().snapshot(), before);
}

#[test]
fn unit_ticks_reach_the_same_tree() {
    let layout = ["a/b/c/d.txt", "a/e.txt", "f/g.txt", "h.txt", "i/"];
    let stepped_fixture = Fixture::new(&layout);
    let mut stepped = stepped_fixture.engine(&[], true);
    stepped.start().unwrap();
    let ticks = drain_one_unit_at_a_time(&mut stepped);

    let whole_fixture = Fixture::new(&layout);
    let mut whole = whole_fixture.engine(&[], true);
    whole.sync_now().unwrap();

    // One directory level per unit plus the completion step.
    assert_eq!(ticks, 7);
    assert_eq!(tree_paths(&stepped), tree_paths(&whole));
    assert_eq!(visible_paths(&stepped), tree_paths(&whole));
}

#[test]
fn closed_engine_stops_processing() {
    let fixture = Fixture::new(&["a.py"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();

    fixture.create("b.py");
    engine.enqueue(RawEvent::created(fixture.path("b.py")));
    engine.close();
    let outcome = engine.on_idle(|| true);

    assert!(outcome.closed);
    assert_eq!(outcome.units, 0);
    assert_eq!(tree_paths(&engine), set(["a.py"]));
}

#[test]
fn host_close_abandons_in_progress_merge() {
    let fixture = Fixture::new(&["a/b.txt", "c/d.txt"]);
    let mut engine = fixture.engine(&[], true);
    engine.start().unwrap();
    let outcome = engine.on_idle(|| false);
    assert!(outcome.work_remaining);

    engine
        .host()
        .close_handle()
        .store(true, std::sync::atomic::Ordering::Release);
    let outcome = engine.on_idle(|| true);

    assert!(outcome.closed);
    assert!(!engine.queue().has_merger());
    assert_eq!(engine.listener().merges(), 0);
}

#[test]
fn attached_consumer_sees_new_folders_collapsed() {
    let fixture = Fixture::new(&["a.py"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();
    engine.set_attached(true);

    fixture.create("lib/x.py");
    engine.enqueue(RawEvent::created(fixture.path("lib")));
    engine.sync_now().unwrap();

    let lib = engine.tree().find_by_path(&fixture.path("lib")).unwrap();
    assert!(!engine.tree().is_expanded(lib));
    assert!(engine
        .listener()
        .events
        .contains(&Notification::Expanded(lib, false)));
}

#[cfg(target_os = "linux")]
#[test]
fn case_only_directory_rename_moves_descendants() {
    let fixture = Fixture::new(&["Src/a.rs", "Src/nested/b.rs"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();
    let dir = engine.tree().find_by_path(&fixture.path("Src")).unwrap();

    fs::rename(fixture.path("Src"), fixture.path("src")).unwrap();
    engine.enqueue(RawEvent::renamed(fixture.path("Src"), fixture.path("src")));
    engine.sync_now().unwrap();

    assert_eq!(engine.tree().find_by_path(&fixture.path("src")), Some(dir));
    assert_eq!(tree_paths(&engine), set(["src", "src/a.rs", "src/nested", "src/nested/b.rs"]));

    fs::remove_file(fixture.path("src/a.rs")).unwrap();
    engine.enqueue(RawEvent::deleted(fixture.path("src/a.rs")));
    fs::remove_dir_all(fixture.path("src/nested")).unwrap();
    engine.enqueue(RawEvent::deleted(fixture.path("src/nested")));
    engine.sync_now().unwrap();

    assert_eq!(tree_paths(&engine), set(["src"]));
}

#[test]
fn expansion_survives_merges_below_the_folder() {
    let fixture = Fixture::new(&["lib/a.py"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();
    engine.set_attached(true);
    let lib = engine.tree().find_by_path(&fixture.path("lib")).unwrap();
    assert!(!engine.is_expanded(lib));

    engine.expand(lib, true).unwrap();
    assert!(engine.is_expanded(lib));
    assert!(engine
        .listener()
        .events
        .contains(&Notification::Property(lib, NodeProperty::Expanded)));
    engine.listener_mut().clear();

    fixture.create("lib/b.py");
    engine.enqueue(RawEvent::created(fixture.path("lib/b.py")));
    engine.sync_now().unwrap();
    assert!(engine.is_expanded(lib));

    engine.queue().on_overflow(None);
    engine.sync_now().unwrap();
    assert!(engine.is_expanded(lib));
    assert!(engine.tree().is_expanded(lib));
    assert!(!engine
        .listener()
        .events
        .contains(&Notification::Expanded(lib, false)));
}

#[test]
fn directory_removed_mid_merge_is_pruned_by_the_next_pass() {
    let fixture = Fixture::new(&["a/x.txt", "b/y.txt"]);
    let mut engine = fixture.engine(&[], true);
    engine.start().unwrap();
    while engine.tree().find_by_path(&fixture.path("a")).is_none() {
        assert!(engine.on_idle(|| false).work_remaining);
    }

    fs::remove_dir_all(fixture.path("a")).unwrap();
    engine.sync_now().unwrap();

    assert_eq!(engine.listener().merges(), 1);
    assert_eq!(tree_paths(&engine), set(["a", "b", "b/y.txt"]));

    engine.queue().on_overflow(None);
    engine.sync_now().unwrap();

    assert_eq!(engine.listener().merges(), 2);
    assert_eq!(tree_paths(&engine), fixture.disk_paths());
}

#[cfg(unix)]
#[test]
fn unreadable_directory_keeps_its_children() {
    use std::os::unix::fs::PermissionsExt;

    let fixture = Fixture::new(&["locked/inner.txt", "open.txt"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();

    let locked = fixture.path("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&locked).is_ok() {
        // Running privileged: permissions are not enforced.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    engine.listener_mut().clear();
    engine.queue().on_overflow(None);
    let outcome = engine.sync_now();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    outcome.unwrap();

    assert_eq!(tree_paths(&engine), set(["locked", "locked/inner.txt", "open.txt"]));
    assert_eq!(engine.listener().structural(), 0);
    assert_eq!(engine.listener().merges(), 1);
}
