//! Integration tests for the janitor maintenance cycle.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use tokio::sync::watch;

use shale_core::CollectionId;
use shale_janitor::gc::GarbageCollector;
use shale_janitor::leader::{
    InMemoryLeaderElector, LeaderElector, LeadershipCampaign, LeaseSettings,
};
use shale_janitor::purge::Purger;
use shale_janitor::reporter::BacklogReporter;
use shale_log::{CatalogView, InMemoryCatalog, InMemoryLogStore, LogStore};

fn payloads(count: usize) -> Vec<Bytes> {
    (0..count)
        .map(|i| Bytes::from(format!("record-{i}")))
        .collect()
}

fn fast_settings() -> LeaseSettings {
    LeaseSettings {
        lease_duration: Duration::from_millis(400),
        renew_interval: Duration::from_millis(50),
        retry_interval: Duration::from_millis(20),
    }
}

async fn wait_until(what: &str, mut predicate: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !predicate() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Purge deletes only below the boundary and appends keep the offset
/// sequence gapless through the whole cycle.
#[tokio::test]
async fn purge_cycle_preserves_offsets_across_appends() {
    let store = Arc::new(InMemoryLogStore::new());
    let collection_id = CollectionId::generate();
    store
        .register_collection(collection_id)
        .await
        .expect("register");

    let offsets = store
        .insert_records(collection_id, payloads(10))
        .await
        .expect("insert");
    assert_eq!(offsets, (1..=10).collect::<Vec<u64>>());

    store
        .advance_compaction_offset(collection_id, 6)
        .await
        .expect("advance");

    let purger = Purger::new(Arc::clone(&store) as Arc<dyn LogStore>);
    let run = purger.run(|| true).await.expect("purge");
    assert_eq!(run.collections_scanned, 1);
    assert_eq!(run.records_purged, 6);
    assert!(!run.has_errors());

    // Survivors are exactly the records above the boundary.
    let records = store
        .get_records(collection_id, 1, 100, Utc::now())
        .await
        .expect("read");
    let read_offsets: Vec<u64> = records.iter().map(|r| r.offset).collect();
    assert_eq!(read_offsets, vec![7, 8, 9, 10]);

    // Appends continue from the enumeration offset, not from the survivors.
    let appended = store
        .insert_records(collection_id, payloads(2))
        .await
        .expect("append");
    assert_eq!(appended, vec![11, 12]);

    // A second pass with no compaction progress deletes nothing.
    let run = purger.run(|| true).await.expect("repeat purge");
    assert_eq!(run.records_purged, 0);

    assert_eq!(store.backlog_depth().await.expect("backlog"), 6);
}

/// With a shared elector only one campaign leads, the follower's gate stops
/// a purge pass before any deletion, and shutdown hands leadership over.
#[tokio::test]
async fn leadership_gates_maintenance_work() {
    let elector: Arc<dyn LeaderElector> =
        Arc::new(InMemoryLeaderElector::new(Duration::from_millis(400)));

    let (campaign_a, status_a) = LeadershipCampaign::new(
        Arc::clone(&elector),
        "log-janitor",
        "janitor-a",
        fast_settings(),
    )
    .expect("campaign a");
    let (campaign_b, status_b) = LeadershipCampaign::new(
        Arc::clone(&elector),
        "log-janitor",
        "janitor-b",
        fast_settings(),
    )
    .expect("campaign b");

    let (shutdown_a_tx, shutdown_a_rx) = watch::channel(false);
    let (shutdown_b_tx, shutdown_b_rx) = watch::channel(false);
    let handle_a = tokio::spawn(campaign_a.run(shutdown_a_rx));
    let handle_b = tokio::spawn(campaign_b.run(shutdown_b_rx));

    {
        let (status_a, status_b) = (status_a.clone(), status_b.clone());
        wait_until("one campaign to lead", move || {
            status_a.is_leader() ^ status_b.is_leader()
        })
        .await;
    }

    let store = Arc::new(InMemoryLogStore::new());
    let collection_id = CollectionId::generate();
    store
        .register_collection(collection_id)
        .await
        .expect("register");
    store
        .insert_records(collection_id, payloads(4))
        .await
        .expect("insert");
    store
        .advance_compaction_offset(collection_id, 2)
        .await
        .expect("advance");

    let purger = Purger::new(Arc::clone(&store) as Arc<dyn LogStore>);

    let (leader, follower) = if status_a.is_leader() {
        (status_a.clone(), status_b.clone())
    } else {
        (status_b.clone(), status_a.clone())
    };

    // The follower's gate stops the pass at the first checkpoint.
    let gate = follower.clone();
    let run = purger.run(move || gate.is_leader()).await.expect("gated");
    assert!(run.stopped_early);
    assert_eq!(run.records_purged, 0);

    // The leader's gate lets the pass delete up to the boundary.
    let gate = leader.clone();
    let run = purger.run(move || gate.is_leader()).await.expect("leader");
    assert!(!run.stopped_early);
    assert_eq!(run.records_purged, 2);

    // Shutting the leader down releases the lease and the survivor takes over.
    if status_a.is_leader() {
        shutdown_a_tx.send(true).expect("shutdown a");
        handle_a.await.expect("join a");
    } else {
        shutdown_b_tx.send(true).expect("shutdown b");
        handle_b.await.expect("join b");
    }

    let survivor = follower;
    {
        let survivor = survivor.clone();
        wait_until("the survivor to take over", move || survivor.is_leader()).await;
    }

    // Wind down whichever campaign is still running.
    let _ = shutdown_a_tx.send(true);
    let _ = shutdown_b_tx.send(true);
}

/// A full garbage-collection pass purges, drops orphans, and leaves the
/// backlog gauge input consistent with what survived.
#[tokio::test]
async fn garbage_collection_drops_orphans_and_updates_backlog() {
    let store = Arc::new(InMemoryLogStore::new());
    let catalog = Arc::new(InMemoryCatalog::new());

    let live = CollectionId::generate();
    let orphan = CollectionId::generate();
    for id in [live, orphan] {
        store.register_collection(id).await.expect("register");
    }
    catalog.register(live).expect("catalog register");

    store
        .insert_records(live, payloads(6))
        .await
        .expect("insert live");
    store
        .advance_compaction_offset(live, 4)
        .await
        .expect("advance live");
    store
        .insert_records(orphan, payloads(3))
        .await
        .expect("insert orphan");

    let reporter = BacklogReporter::new(Arc::clone(&store) as Arc<dyn LogStore>);
    assert_eq!(reporter.sample_once().await.expect("sample"), 5);

    let gc = GarbageCollector::new(
        Arc::clone(&store) as Arc<dyn LogStore>,
        Arc::clone(&catalog) as Arc<dyn CatalogView>,
    );

    // The dry run sees everything the real pass will touch.
    let plan = gc.collect_dry_run().await.expect("dry run");
    assert_eq!(plan.purgeable_records, 4);
    assert_eq!(plan.orphaned_collections, vec![orphan]);

    let outcome = gc.collect(|| true).await;
    assert_eq!(outcome.records_purged, 4);
    assert_eq!(outcome.collections_dropped, 1);
    assert!(!outcome.has_errors());

    // The orphan is gone and the live collection kept its survivors.
    assert!(store.collection(orphan).await.expect("lookup").is_none());
    let records = store
        .get_records(live, 1, 100, Utc::now())
        .await
        .expect("read");
    let read_offsets: Vec<u64> = records.iter().map(|r| r.offset).collect();
    assert_eq!(read_offsets, vec![5, 6]);

    assert_eq!(reporter.sample_once().await.expect("sample"), 2);

    // Nothing left for a second pass.
    let plan = gc.collect_dry_run().await.expect("second dry run");
    assert_eq!(plan.purgeable_records, 0);
    assert!(plan.orphaned_collections.is_empty());
}
