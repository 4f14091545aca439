use crate::integration::support::{set, tree_paths, visible_paths, Fixture, Notification};
use shadowtree::{NodeKind, SyncError, TreeError};
use std::fs;

#[test]
fn adding_member_promotes_ancestor_folders() {
    let fixture = Fixture::new(&["src/lib.rs", "src/util.rs"]);
    let mut engine = fixture.engine(&[], false);
    engine.sync_now().unwrap();
    assert!(visible_paths(&engine).is_empty());

    let path = fixture.path("src/lib.rs");
    engine.host_mut().add_member(&path);
    let id = engine.add_member(&path, NodeKind::File).unwrap();

    assert!(engine.tree().get(id).unwrap().is_member());
    assert_eq!(visible_paths(&engine), set(["src", "src/lib.rs"]));
    assert_eq!(engine.listener().added(), 2);
}

#[test]
fn member_not_on_disk_survives_rescans() {
    let fixture = Fixture::new(&["a.py"]);
    let mut engine = fixture.engine(&[], false);
    engine.sync_now().unwrap();

    let planned = fixture.path("planned/new.rs");
    engine.host_mut().add_member(&planned);
    let id = engine.add_member(&planned, NodeKind::File).unwrap();
    engine.listener_mut().clear();

    engine.queue().on_overflow(None);
    engine.sync_now().unwrap();

    assert!(engine.tree().contains(id));
    assert_eq!(tree_paths(&engine), set(["a.py", "planned", "planned/new.rs"]));
    let folder = engine.tree().find_by_path(&fixture.path("planned")).unwrap();
    assert!(engine
        .listener()
        .events
        .contains(&Notification::MemberMissing(folder)));
}

#[test]
fn adding_member_outside_root_is_rejected() {
    let fixture = Fixture::new(&[]);
    let other = Fixture::new(&["x.rs"]);
    let mut engine = fixture.engine(&[], false);

    let err = engine
        .add_member(&other.path("x.rs"), NodeKind::File)
        .unwrap_err();
    assert!(matches!(err, SyncError::OutsideRoot(_)));

    let err = engine.add_member(&fixture.root, NodeKind::Directory).unwrap_err();
    assert!(matches!(err, SyncError::OutsideRoot(_)));
}

#[test]
fn adding_member_with_conflicting_kind_fails() {
    let fixture = Fixture::new(&["a.py"]);
    let mut engine = fixture.engine(&[], true);
    engine.sync_now().unwrap();

    let err = engine
        .add_member(&fixture.path("a.py"), NodeKind::Directory)
        .unwrap_err();
    assert!(matches!(err, SyncError::Tree(TreeError::DuplicatePath(_))));
}

#[test]
fn removing_member_on_disk_demotes_it() {
    let fixture = Fixture::new(&["a.py"]);
    let mut engine = fixture.engine(&["a.py"], false);
    engine.sync_now().unwrap();
    let a = engine.tree().find_by_path(&fixture.path("a.py")).unwrap();

    engine.host_mut().remove_member(&fixture.path("a.py"));
    let kept = engine.remove_member(&fixture.path("a.py")).unwrap();

    assert!(kept);
    let node = engine.tree().get(a).unwrap();
    assert!(!node.is_member());
    assert!(!node.is_visible());
    assert!(engine.listener().events.contains(&Notification::Deleted(a)));
}

#[test]
fn removing_member_absent_from_disk_prunes_it() {
    let fixture = Fixture::new(&["a.py"]);
    let mut engine = fixture.engine(&["a.py"], false);
    engine.sync_now().unwrap();
    let a = engine.tree().find_by_path(&fixture.path("a.py")).unwrap();

    fs::remove_file(fixture.path("a.py")).unwrap();
    engine.host_mut().remove_member(&fixture.path("a.py"));
    let kept = engine.remove_member(&fixture.path("a.py")).unwrap();

    assert!(!kept);
    assert!(!engine.tree().contains(a));
    assert!(tree_paths(&engine).is_empty());
}

#[test]
fn removing_unknown_member_reports_missing_path() {
    let fixture = Fixture::new(&[]);
    let mut engine = fixture.engine(&[], false);
    engine.sync_now().unwrap();

    let err = engine.remove_member(&fixture.path("ghost.rs")).unwrap_err();
    assert!(matches!(err, SyncError::PathNotFound(_)));
}
