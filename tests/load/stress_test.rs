#![cfg(test)]
//! Load testing for the query engine
//!
//! Readers hammer range and mean queries while writers keep appending
//! readings to the same in-memory store.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

use chrono::Utc;
use consumption_api::domain::{PeriodKind, ProviderRef, Unit};
use consumption_api::engine::{QueryEngine, Selector};
use consumption_api::repo::{MemoryStore, Repositories};

fn build_engine(readings: usize) -> (Arc<MemoryStore>, Arc<QueryEngine>) {
    let store = Arc::new(MemoryStore::new());
    let sensor = store.add_sensor("main-meter", 1, "electricity");
    let now = Utc::now().timestamp();
    store.seed_demo_readings(sensor, readings, now - readings as i64);
    let engine = Arc::new(QueryEngine::new(Repositories::from_memory(store.clone())));
    (store, engine)
}

/// Concurrent readers and writers must neither deadlock nor observe a
/// sequence with gaps.
#[tokio::test]
#[ignore] // Ignore by default as this is a slow test
async fn test_concurrent_read_write_operations() {
    let (store, engine) = build_engine(2_000);
    let mut tasks = JoinSet::new();

    // Spawn 20 readers
    for _ in 0..20 {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move {
            for _ in 0..50 {
                let last = engine
                    .resolve_range(1, Selector::IndexRange(-100, 0))
                    .await
                    .expect("last readings");
                assert_eq!(last.len(), 100);
                assert!(last.windows(2).all(|w| w[1].sequence_id == w[0].sequence_id + 1));
                tokio::time::sleep(Duration::from_micros(100)).await;
            }
        });
    }

    // Spawn 10 writers
    for _ in 0..10 {
        let store = Arc::clone(&store);
        tasks.spawn(async move {
            for i in 0..25 {
                store.insert_reading(1, Utc::now().timestamp(), i as f64 * 100.0);
                tokio::time::sleep(Duration::from_micros(200)).await;
            }
        });
    }

    while let Some(result) = tasks.join_next().await {
        result.expect("Task should complete successfully");
    }

    let all = engine
        .resolve_range(1, Selector::IndexRange(1, 500))
        .await
        .unwrap();
    assert_eq!(all.len(), 500);
}

/// Measures how many aggregate queries the engine answers per second.
#[tokio::test]
#[ignore] // Ignore by default as this is a slow test
async fn test_throughput_benchmark() {
    let (_store, engine) = build_engine(20_000);

    let start = Instant::now();
    let mut operation_count = 0;
    let test_duration = Duration::from_secs(5);

    while start.elapsed() < test_duration {
        let _ = engine
            .compute_aggregate(1, PeriodKind::Daily, &Utc::now(), Unit::KilowattHours, ProviderRef::Current)
            .await;
        operation_count += 1;

        let _ = engine
            .query(1, Selector::IndexRange(-500, 0), Unit::KilowattHours, ProviderRef::Current)
            .await;
        operation_count += 1;
    }

    let elapsed = start.elapsed();
    let ops_per_second = operation_count as f64 / elapsed.as_secs_f64();

    println!(
        "Throughput: {:.0} ops/second ({} ops in {:?})",
        ops_per_second, operation_count, elapsed
    );

    assert!(
        ops_per_second > 10.0,
        "Throughput too low: {:.0} ops/s",
        ops_per_second
    );
}
