use std::fs;
use std::sync::Arc;

use persona_core::inventory::{
    AssessmentConfig, AssessmentMode, Inventory, JsonFileSnapshotStore, MemorySnapshotStore,
    NextItem, Session, SessionId, SessionSnapshot, SnapshotSink, SnapshotStore, SnapshotWriter,
};

fn answer_next(session: &mut Session, inventory: &Inventory, answer: u8) {
    let item_id = match session.next_item(inventory) {
        Ok(NextItem::Present(item)) => item.id.clone(),
        other => panic!("expected an item, got {other:?}"),
    };
    session
        .submit(inventory, &item_id, answer, None)
        .expect("answer accepted");
}

/// Progress after one and two answers, then the final snapshot.
fn snapshots(id: &str) -> (SessionSnapshot, SessionSnapshot, SessionSnapshot) {
    let inventory = Inventory::builtin();
    let mut session = Session::start(
        SessionId::new(id),
        &inventory,
        AssessmentMode::Demo,
        Some(13),
        AssessmentConfig::default(),
    )
    .expect("session starts");

    answer_next(&mut session, &inventory, 4);
    let first = session.snapshot();
    answer_next(&mut session, &inventory, 2);
    let second = session.snapshot();
    session.finalize(&inventory);
    let last = session.snapshot();
    (first, second, last)
}

#[tokio::test(flavor = "multi_thread")]
async fn writer_keeps_order_and_drops_snapshots_after_finalization() {
    let store = Arc::new(MemorySnapshotStore::new());
    let (writer, handle) = SnapshotWriter::spawn(store.clone());
    let (first, second, last) = snapshots("ordered");

    writer.offer(first).expect("writer open");
    writer.offer(second.clone()).expect("writer open");
    writer.offer(last).expect("writer open");
    writer.offer(second).expect("writer open");
    drop(writer);

    let summary = handle.join().await.expect("writer drains");
    assert_eq!(summary.written, 3);
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.failed, 0);

    let history = store.history();
    let presented: Vec<usize> = history.iter().map(|record| record.presented).collect();
    assert_eq!(presented, vec![1, 2, 2]);
    assert!(history.last().map(|record| record.is_final).unwrap_or(false));

    let stored = store
        .load(&SessionId::new("ordered"))
        .expect("store readable")
        .expect("snapshot present");
    assert!(stored.is_final());
}

#[test]
fn file_store_round_trips_and_lists_sessions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileSnapshotStore::new(dir.path().join("sessions"));
    assert!(store.list().expect("empty root lists").is_empty());

    let (progress, _, last) = snapshots("beta");
    let (other, _, _) = snapshots("alpha");
    store.save(&progress).expect("progress saved");
    store.save(&other).expect("other saved");
    store.save(&last).expect("final overwrites progress");

    assert_eq!(
        store.list().expect("root lists"),
        vec![SessionId::new("alpha"), SessionId::new("beta")]
    );
    let loaded = store
        .load(&SessionId::new("beta"))
        .expect("file readable")
        .expect("file present");
    assert_eq!(loaded, last);
    assert!(store
        .load(&SessionId::new("missing"))
        .expect("missing is not an error")
        .is_none());

    let leftovers: Vec<_> = fs::read_dir(store.root())
        .expect("root readable")
        .filter_map(Result::ok)
        .filter(|entry| entry.path().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn writer_persists_to_disk_and_resumes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(JsonFileSnapshotStore::new(dir.path()));
    let (writer, handle) = SnapshotWriter::spawn(store.clone());
    let (first, second, _) = snapshots("disk");

    writer.offer(first).expect("writer open");
    writer.offer(second.clone()).expect("writer open");
    drop(writer);
    let summary = handle.join().await.expect("writer drains");
    assert_eq!(summary.written, 2);

    let loaded = store
        .load(&SessionId::new("disk"))
        .expect("file readable")
        .expect("file present");
    assert_eq!(loaded, second);

    let inventory = Inventory::builtin();
    let resumed = Session::resume(loaded, &inventory).expect("snapshot resumes");
    assert_eq!(resumed.ledger().len(), 2);
    assert!(!resumed.is_finalized());
}
