use std::time::Duration;

use rama::telemetry::tracing;
use tracing_test::traced_test;

use crate::{endpoint::MockEndpoint, engine::Engine, profile::ClientId};

use super::{endpoints::Stalled, engine_config, profile};

#[tokio::test(flavor = "current_thread")]
async fn test_stop_abandons_in_flight_requests() {
    tokio::time::pause();

    let engine = Engine::try_new(vec![profile(1, 6, 0.)], engine_config()).unwrap();
    let handle = engine.start(Stalled, None).unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(handle.total_active(), 6);

    let report = handle.stop().await;
    assert!(report.clean_shutdown);
    assert!(report.elapsed < Duration::from_millis(400));
    assert_eq!(report.totals[&ClientId(1)].requests, 0);
    assert!(report.snapshots.is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn test_stop_interrupts_think_time() {
    tokio::time::pause();

    let engine = Engine::try_new(vec![profile(1, 2, 3_600.)], engine_config()).unwrap();
    let handle = engine
        .start(MockEndpoint::fixed(Duration::from_millis(5)), None)
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let report = handle.stop().await;

    assert!(report.clean_shutdown);
    assert!(report.elapsed < Duration::from_secs(1));
    assert_eq!(report.totals[&ClientId(1)].requests, 2);
}

#[tokio::test(flavor = "current_thread")]
async fn test_dropped_handle_stops_instances() {
    tokio::time::pause();

    let engine = Engine::try_new(vec![profile(1, 3, 0.01)], engine_config()).unwrap();
    let handle = engine
        .start(MockEndpoint::fixed(Duration::from_millis(1)), None)
        .unwrap();
    let board = handle.board();

    tokio::time::sleep(Duration::from_millis(250)).await;
    let seen = board.history().len();
    assert!(seen >= 2);
    drop(handle);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(board.history().len(), seen);
}

#[traced_test]
#[test]
fn test_empty_engine_warns() {
    Engine::try_new(Vec::new(), engine_config()).unwrap();
    assert!(logs_contain("engine created without client profiles"));
}
