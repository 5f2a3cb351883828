use notekeeper_core::{
    Note, NoteDraft, NoteRepository, NoteStore, SchemaState, StoreCell, StoreConfig, StoreError,
    Subscription,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

type Deliveries = Arc<Mutex<Vec<Vec<Note>>>>;

fn open_repo(config: &StoreConfig) -> NoteRepository {
    NoteRepository::new(Arc::new(NoteStore::open(config).unwrap()))
}

fn record(repo: &NoteRepository) -> (Deliveries, Subscription) {
    let deliveries: Deliveries = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&deliveries);
    let subscription = repo.subscribe_all_notes(move |notes| sink.lock().push(notes.to_vec()));
    (deliveries, subscription)
}

fn latest(deliveries: &Deliveries) -> Vec<Note> {
    deliveries
        .lock()
        .last()
        .cloned()
        .expect("at least one delivery")
}

fn seed_list() -> Vec<Note> {
    vec![
        Note::new(1, "Title 1", "Description 1", 1),
        Note::new(2, "Title 2", "Description 2", 2),
        Note::new(3, "Title 3", "Description 3", 3),
    ]
}

fn file_config(dir: &Path) -> StoreConfig {
    StoreConfig::file(dir.join("note_database.sqlite3"))
}

#[test]
fn fresh_store_publishes_the_seed_notes() {
    let repo = open_repo(&StoreConfig::in_memory());
    let (deliveries, _subscription) = record(&repo);

    repo.flush().unwrap();

    assert_eq!(repo.store().schema_state(), SchemaState::Created);
    assert_eq!(latest(&deliveries), seed_list());
    assert_eq!(deliveries.lock().len(), 1);
}

#[test]
fn insert_update_delete_and_clear_are_observed_in_order() {
    let repo = open_repo(&StoreConfig::in_memory());
    let (deliveries, _subscription) = record(&repo);

    repo.insert("Milk", "Buy milk", 2).unwrap();
    repo.flush().unwrap();
    let after_insert = latest(&deliveries);
    assert_eq!(after_insert.len(), 4);
    let milk = after_insert.last().unwrap().clone();
    assert_eq!(milk.to_draft(), NoteDraft::new("Milk", "Buy milk", 2));
    assert!(seed_list().iter().all(|seed| seed.id != milk.id));

    repo.update(2, "Title 2b", "Desc 2b", 9).unwrap();
    repo.flush().unwrap();
    let after_update = latest(&deliveries);
    assert_eq!(after_update[1], Note::new(2, "Title 2b", "Desc 2b", 9));
    assert_eq!(after_update[0], seed_list()[0]);
    assert_eq!(after_update[2], seed_list()[2]);

    repo.delete(1).unwrap();
    repo.flush().unwrap();
    let ids: Vec<i64> = latest(&deliveries).iter().map(|note| note.id).collect();
    assert_eq!(ids, vec![2, 3, milk.id]);

    repo.delete_all().unwrap();
    repo.flush().unwrap();
    assert!(latest(&deliveries).is_empty());

    repo.insert("Bread", "After clear", 1).unwrap();
    repo.flush().unwrap();
    let after_clear = latest(&deliveries);
    assert_eq!(after_clear.len(), 1);
    assert!(after_clear[0].id > milk.id);
}

#[test]
fn every_committed_write_is_delivered_once() {
    let repo = open_repo(&StoreConfig::in_memory());
    let (deliveries, _subscription) = record(&repo);

    repo.insert("a", "b", 1).unwrap();
    repo.update(1, "c", "d", 2).unwrap();
    repo.delete(3).unwrap();
    repo.flush().unwrap();

    let lengths: Vec<usize> = deliveries.lock().iter().map(Vec::len).collect();
    assert_eq!(lengths, vec![3, 4, 4, 3]);
}

#[test]
fn delete_all_twice_publishes_empty_lists_without_errors() {
    let repo = open_repo(&StoreConfig::in_memory());
    let (deliveries, _subscription) = record(&repo);

    repo.delete_all().unwrap();
    repo.delete_all().unwrap();
    repo.flush().unwrap();

    let snapshots = deliveries.lock().clone();
    assert_eq!(snapshots.len(), 3);
    assert!(snapshots[1].is_empty());
    assert!(snapshots[2].is_empty());
    assert_eq!(repo.store().failed_writes(), 0);
}

#[test]
fn update_of_unknown_id_is_counted_and_the_stream_keeps_going() {
    let repo = open_repo(&StoreConfig::in_memory());
    let (deliveries, _subscription) = record(&repo);

    repo.update(99, "ghost", "missing", 1).unwrap();
    repo.delete(98).unwrap();
    repo.flush().unwrap();
    assert_eq!(repo.store().failed_writes(), 2);
    assert_eq!(deliveries.lock().len(), 1);

    repo.insert("still", "works", 5).unwrap();
    repo.flush().unwrap();
    assert_eq!(latest(&deliveries).len(), 4);
    assert_eq!(repo.store().applied_writes(), 1);
}

#[test]
fn late_subscriber_receives_the_current_list_immediately() {
    let repo = open_repo(&StoreConfig::in_memory());
    repo.insert("x", "y", 7).unwrap();
    repo.flush().unwrap();

    let (deliveries, _subscription) = record(&repo);

    assert_eq!(deliveries.lock().len(), 1);
    assert_eq!(latest(&deliveries).len(), 4);
}

#[test]
fn unsubscribed_observer_stops_receiving() {
    let repo = open_repo(&StoreConfig::in_memory());
    let (deliveries, subscription) = record(&repo);
    repo.flush().unwrap();

    subscription.unsubscribe();
    repo.insert("after", "unsubscribe", 1).unwrap();
    repo.flush().unwrap();

    assert_eq!(deliveries.lock().len(), 1);
    assert_eq!(repo.store().current().map(|notes| notes.len()), Some(4));
}

#[test]
fn writes_apply_in_submission_order_with_unique_ids() {
    let repo = open_repo(&StoreConfig::in_memory());
    repo.delete_all().unwrap();
    for priority in 0..50 {
        repo.insert(format!("note {priority}"), "ordered", priority)
            .unwrap();
    }
    repo.flush().unwrap();

    let notes = repo.store().current().unwrap();
    let priorities: Vec<i32> = notes.iter().map(|note| note.priority).collect();
    assert_eq!(priorities, (0..50).collect::<Vec<_>>());
    let ids: HashSet<i64> = notes.iter().map(|note| note.id).collect();
    assert_eq!(ids.len(), 50);
}

#[test]
fn concurrent_submitters_all_land_with_distinct_ids() {
    let repo = open_repo(&StoreConfig::in_memory());
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let repo = repo.clone();
            thread::spawn(move || {
                for idx in 0..25 {
                    repo.insert(format!("w{worker}-{idx}"), "parallel", idx)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    repo.flush().unwrap();

    let notes = repo.store().current().unwrap();
    assert_eq!(notes.len(), 103);
    let ids: HashSet<i64> = notes.iter().map(|note| note.id).collect();
    assert_eq!(ids.len(), 103);
    for worker in 0..4 {
        let prefix = format!("w{worker}-");
        let own: Vec<i32> = notes
            .iter()
            .filter(|note| note.title.starts_with(&prefix))
            .map(|note| note.priority)
            .collect();
        assert_eq!(own, (0..25).collect::<Vec<_>>());
    }
}

#[test]
fn reopening_a_file_store_never_reseeds() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path());
    {
        let repo = open_repo(&config);
        repo.insert("Milk", "Buy milk", 2).unwrap();
        repo.flush().unwrap();
    }

    let repo = open_repo(&config);
    repo.flush().unwrap();
    assert_eq!(repo.store().schema_state(), SchemaState::Opened);
    let notes = repo.store().current().unwrap();
    assert_eq!(notes.len(), 4);
    assert_eq!(
        notes.iter().filter(|note| note.title == "Title 1").count(),
        1
    );
}

#[test]
fn cleared_file_store_stays_empty_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path());
    {
        let repo = open_repo(&config);
        repo.delete_all().unwrap();
        repo.flush().unwrap();
    }

    let repo = open_repo(&config);
    repo.flush().unwrap();
    assert!(repo.store().current().unwrap().is_empty());
}

#[test]
fn dropping_the_store_drains_queued_writes() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path());
    {
        let repo = open_repo(&config);
        for idx in 0..20 {
            repo.insert(format!("queued {idx}"), "drain", idx).unwrap();
        }
    }

    let repo = open_repo(&config);
    repo.flush().unwrap();
    assert_eq!(repo.store().current().unwrap().len(), 23);
}

#[test]
fn store_cell_opens_and_seeds_once_under_concurrent_access() {
    let dir = tempfile::tempdir().unwrap();
    let cell = Arc::new(StoreCell::new(file_config(dir.path())));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cell = Arc::clone(&cell);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cell.get_or_open().unwrap()
            })
        })
        .collect();
    let stores: Vec<Arc<NoteStore>> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert!(stores.iter().all(|store| Arc::ptr_eq(store, &stores[0])));
    stores[0].flush().unwrap();
    assert_eq!(stores[0].current().unwrap().as_slice(), seed_list().as_slice());
}

#[test]
fn unavailable_store_is_reported_to_the_caller() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("missing").join("notes.db"));

    let err = NoteStore::open(&config).unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));

    let cell = StoreCell::new(config);
    assert!(cell.get_or_open().is_err());
    assert!(cell.get().is_none());
}

#[test]
fn recreated_store_is_seeded_again() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path());
    {
        let repo = open_repo(&config);
        repo.insert("doomed", "by schema bump", 1).unwrap();
        repo.flush().unwrap();
    }
    {
        let conn = rusqlite::Connection::open(dir.path().join("note_database.sqlite3")).unwrap();
        conn.execute_batch("PRAGMA user_version = 42;").unwrap();
    }

    let repo = open_repo(&config);
    repo.flush().unwrap();
    assert_eq!(repo.store().schema_state(), SchemaState::Recreated);
    assert_eq!(repo.store().current().unwrap().as_slice(), seed_list().as_slice());
}

#[test]
fn observer_panicking_on_first_delivery_does_not_reach_the_caller() {
    let repo = open_repo(&StoreConfig::in_memory());
    repo.flush().unwrap();

    let subscription = repo.subscribe_all_notes(|_| panic!("observer failure"));
    assert!(!subscription.is_active());

    let (deliveries, _subscription) = record(&repo);
    repo.insert("after", "panic", 1).unwrap();
    repo.flush().unwrap();
    assert_eq!(latest(&deliveries).len(), 4);
}

#[test]
fn observer_dropping_its_subscription_keeps_the_writer_running() {
    let repo = open_repo(&StoreConfig::in_memory());
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let own_slot = Arc::clone(&slot);
    let subscription = repo.subscribe_all_notes(move |notes| {
        if notes.len() > 3 {
            own_slot.lock().take();
        }
    });
    *slot.lock() = Some(subscription);
    repo.flush().unwrap();

    repo.insert("tear", "down", 1).unwrap();
    repo.insert("still", "applied", 2).unwrap();
    repo.flush().unwrap();

    assert!(slot.lock().is_none());
    assert_eq!(repo.store().current().map(|notes| notes.len()), Some(5));
    assert_eq!(repo.store().failed_writes(), 0);
}
