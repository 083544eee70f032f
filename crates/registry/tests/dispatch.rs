#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use strata_core::{DataSourceProperties, InstanceDefinition};
use strata_mode::{ContextManager, EventCoordinator};
use strata_persist::{MemoryMetaDataStore, MetaDataPersistService};
use strata_registry::{drive, spawn_dispatch, ChangeType, DataChangedEvent};
use strata_store::SimpleDataSourceFactory;

fn coordinator() -> (Arc<MemoryMetaDataStore>, EventCoordinator) {
    let persist = Arc::new(MemoryMetaDataStore::new());
    for schema in ["a", "b"] {
        let ds = [("ds_0".to_string(), DataSourceProperties::new("com.zaxxer.hikari.HikariDataSource"))].into_iter().collect();
        persist.persist_data_sources(schema, &ds).unwrap();
    }
    let manager = ContextManager::bootstrap(persist.clone(), Arc::new(SimpleDataSourceFactory), InstanceDefinition::proxy("127.0.0.1", 3307)).unwrap();
    (persist, EventCoordinator::new(Arc::new(manager)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_notifications_do_not_stop_the_loop() {
    let (_persist, coordinator) = coordinator();
    let (tx, handle) = spawn_dispatch(coordinator.clone(), 16);
    tx.send(DataChangedEvent::new("/props", "sql-show: [unclosed", ChangeType::Updated)).await.unwrap();
    tx.send(DataChangedEvent::new("/status/compute_nodes/worker_id/127.0.0.1@3307", "12223", ChangeType::Added)).await.unwrap();
    tx.send(DataChangedEvent::new("/unknown/key", "", ChangeType::Added)).await.unwrap();
    tx.send(DataChangedEvent::new("/metadata/c", "", ChangeType::Added)).await.unwrap();
    drop(tx);
    let stats = handle.await.unwrap();
    assert_eq!((stats.received, stats.applied, stats.skipped, stats.dropped, stats.failed), (4, 2, 1, 1, 0));
    let manager = coordinator.manager();
    assert_eq!(manager.instance_context().worker_id(), Some(12223));
    assert_eq!(manager.snapshot().schema_names(), vec!["a", "b", "c"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_events_are_counted_and_skipped() {
    let (persist, coordinator) = coordinator();
    persist.fail_schema("c");
    let events = vec![
        DataChangedEvent::new("/metadata/c", "", ChangeType::Added),
        DataChangedEvent::new("/metadata/a", "", ChangeType::Deleted),
    ];
    let stats = drive(futures::stream::iter(events), &coordinator).await;
    assert_eq!((stats.applied, stats.failed), (1, 1));
    assert_eq!(coordinator.manager().snapshot().schema_names(), vec!["b"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallel_dispatch_loops_share_one_coordinator() {
    let (_persist, coordinator) = coordinator();
    let (tx1, h1) = spawn_dispatch(coordinator.clone(), 4);
    let (tx2, h2) = spawn_dispatch(coordinator.clone(), 4);
    for i in 0..20 {
        let table = format!("name: t{i}\n");
        let tx = if i % 2 == 0 { &tx1 } else { &tx2 };
        tx.send(DataChangedEvent::new(format!("/metadata/a/tables/t{i}"), table, ChangeType::Added)).await.unwrap();
    }
    tx2.send(DataChangedEvent::new("/status/compute_nodes/labels/127.0.0.1@3307", "[blue, green]", ChangeType::Updated)).await.unwrap();
    drop((tx1, tx2));
    let (s1, s2) = (h1.await.unwrap(), h2.await.unwrap());
    assert_eq!(s1.applied + s2.applied, 21);
    let snap = coordinator.manager().snapshot();
    assert_eq!(snap.schema("a").unwrap().schema().len(), 20);
    assert_eq!(coordinator.manager().instance_context().labels(), vec!["blue", "green"]);
}

#[tokio::test]
async fn held_writer_does_not_stall_the_runtime() {
    let (_persist, coordinator) = coordinator();
    let manager = coordinator.manager().clone();
    let (held_tx, held_rx) = std::sync::mpsc::channel::<()>();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let holder = std::thread::spawn(move || {
        let _writer = manager.store().write();
        held_tx.send(()).unwrap();
        release_rx.recv_timeout(Duration::from_secs(5)).is_ok()
    });
    held_rx.recv().unwrap();

    let (tx, handle) = spawn_dispatch(coordinator.clone(), 4);
    tx.send(DataChangedEvent::new("/metadata/c", "", ChangeType::Added)).await.unwrap();
    // single-threaded runtime: this only completes if the dispatch task is not parked on the lock
    tokio::time::sleep(Duration::from_millis(50)).await;
    release_tx.send(()).unwrap();
    assert!(holder.join().unwrap(), "writer released by the test, not by timeout");

    drop(tx);
    let stats = handle.await.unwrap();
    assert_eq!(stats.applied, 1);
    assert!(coordinator.manager().snapshot().contains_schema("c"));
}
