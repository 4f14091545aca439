use crate::integration::support::{tree_paths, Fixture};
use proptest::collection::vec;
use proptest::prelude::*;
use shadowtree::RawEvent;
use std::fs;

fn layout() -> impl Strategy<Value = Vec<String>> {
    vec(("[a-c](/[a-c]){0,2}", "[a-e]{1,3}"), 1..12).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(dir, name)| format!("{dir}/{name}.txt"))
            .collect()
    })
}

const CANDIDATES: [&str; 5] = ["a.txt", "b.txt", "sub/c.txt", "sub/d.txt", "sub/deep/e.txt"];

#[derive(Debug, Clone)]
struct Step {
    candidate: usize,
    tick: bool,
}

fn steps() -> impl Strategy<Value = Vec<Step>> {
    vec(
        (0..CANDIDATES.len(), any::<bool>()).prop_map(|(candidate, tick)| Step { candidate, tick }),
        1..24,
    )
}

/// Toggle `relative` on disk and queue the events a watcher would report.
fn toggle(fixture: &Fixture, engine: &crate::integration::support::TestEngine, relative: &str) {
    let path = fixture.path(relative);
    if path.exists() {
        fs::remove_file(&path).unwrap();
        engine.enqueue(RawEvent::deleted(&path));
        let mut dir = path.parent().unwrap().to_path_buf();
        while dir != fixture.root && fs::read_dir(&dir).unwrap().next().is_none() {
            fs::remove_dir(&dir).unwrap();
            engine.enqueue(RawEvent::deleted(&dir));
            dir = dir.parent().unwrap().to_path_buf();
        }
    } else {
        let mut created = Vec::new();
        let mut dir = path.parent().unwrap().to_path_buf();
        while !dir.exists() {
            created.push(dir.clone());
            dir = dir.parent().unwrap().to_path_buf();
        }
        fixture.create(relative);
        for dir in created.iter().rev() {
            engine.enqueue(RawEvent::created(dir));
        }
        engine.enqueue(RawEvent::created(&path));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn interrupted_merge_matches_uninterrupted(files in layout(), stops in vec(any::<bool>(), 0..40)) {
        let entries: Vec<&str> = files.iter().map(String::as_str).collect();

        let whole_fixture = Fixture::new(&entries);
        let mut whole = whole_fixture.engine(&[], true);
        whole.sync_now().unwrap();

        let stepped_fixture = Fixture::new(&entries);
        let mut stepped = stepped_fixture.engine(&[], true);
        stepped.start().unwrap();
        let mut decisions = stops.into_iter();
        loop {
            let outcome = stepped.on_idle(|| decisions.next().unwrap_or(true));
            if !outcome.work_remaining {
                break;
            }
        }

        prop_assert_eq!(tree_paths(&stepped), tree_paths(&whole));
        prop_assert_eq!(stepped.tree().snapshot().entries, whole.tree().snapshot().entries);
    }

    #[test]
    fn repeated_full_merge_changes_nothing(files in layout()) {
        let entries: Vec<&str> = files.iter().map(String::as_str).collect();
        let fixture = Fixture::new(&entries);
        let mut engine = fixture.engine(&[], true);
        engine.sync_now().unwrap();
        engine.listener_mut().clear();

        engine.queue().on_overflow(None);
        engine.sync_now().unwrap();

        prop_assert_eq!(engine.listener().structural(), 0);
        prop_assert_eq!(tree_paths(&engine), fixture.disk_paths());
    }

    #[test]
    fn tree_converges_to_disk(steps in steps()) {
        let fixture = Fixture::new(&["a.txt"]);
        let mut engine = fixture.engine(&[], true);
        engine.sync_now().unwrap();

        for step in steps {
            toggle(&fixture, &engine, CANDIDATES[step.candidate]);
            if step.tick {
                engine.on_idle(|| false);
            }
        }
        engine.sync_now().unwrap();

        prop_assert_eq!(tree_paths(&engine), fixture.disk_paths());
    }
}
