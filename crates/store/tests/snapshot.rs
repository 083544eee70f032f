#![forbid(unsafe_code)]

use std::sync::Arc;

use strata_core::{ConfigurationProperties, InstanceDefinition};
use strata_rules::RuleMetaData;
use strata_store::{ContextStore, InstanceContext, ResourceSet, SchemaContext, SchemaObject, Snapshot};

fn ctx(name: &str) -> SchemaContext {
    SchemaContext::new(name, ResourceSet::default(), RuleMetaData::default(), SchemaObject::default())
}

fn store() -> ContextStore {
    let initial = Snapshot::new([ctx("schema")], RuleMetaData::default(), ConfigurationProperties::default());
    ContextStore::new(initial, InstanceContext::new(InstanceDefinition::proxy("127.0.0.1", 3307)))
}

#[test]
fn held_snapshot_is_isolated_from_later_writes() {
    let store = store();
    let before = store.snapshot();
    {
        let mut w = store.write();
        w.replace_schema(ctx("other"));
        w.remove_schema("schema");
        w.replace_properties([("sql-show", "true")].into_iter().collect());
    }
    assert_eq!(before.schema_names(), vec!["schema".to_string()]);
    assert!(before.props().raw().is_empty());
    let after = store.snapshot();
    assert_eq!(after.schema_names(), vec!["other".to_string()]);
    assert_eq!(after.epoch(), before.epoch() + 3);
}

#[test]
fn removing_missing_schema_is_noop() {
    let store = store();
    let epoch = store.snapshot().epoch();
    assert!(store.write().remove_schema("nope").is_none());
    assert_eq!(store.snapshot().epoch(), epoch);
}

#[test]
fn untouched_schemas_keep_identity() {
    let store = store();
    let before = store.snapshot();
    store.write().replace_schema(ctx("other"));
    let after = store.snapshot();
    assert!(Arc::ptr_eq(before.schema("schema").unwrap(), after.schema("schema").unwrap()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn epoch_subscribers_see_installs() {
    let store = Arc::new(store());
    let mut rx = store.subscribe_epoch();
    let s = Arc::clone(&store);
    tokio::task::spawn_blocking(move || s.write().replace_schema(ctx("late"))).await.unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(1), rx.changed()).await.unwrap().unwrap();
    assert_eq!(*rx.borrow(), 1);
}

#[test]
fn concurrent_writers_do_not_lose_updates() {
    let store = Arc::new(store());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let s = Arc::clone(&store);
            std::thread::spawn(move || {
                for j in 0..25 {
                    s.write().replace_schema(ctx(&format!("s{}_{}", i, j)));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let snap = store.snapshot();
    assert_eq!(snap.schema_names().len(), 8 * 25 + 1);
    assert_eq!(snap.epoch(), 200);
}
