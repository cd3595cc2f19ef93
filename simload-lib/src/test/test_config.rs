use crate::{
    engine::Engine,
    profile::{ClientId, ClientProfile, ConfigError},
};

use super::{engine_config, profile};

#[test]
fn test_invalid_profile_rejects_whole_set() {
    for (bad, field) in [
        (
            ClientProfile {
                short_circuit_ratio: 1.5,
                ..profile(2, 3, 0.)
            },
            "short_circuit_ratio",
        ),
        (
            ClientProfile {
                num_instances: 0,
                ..profile(2, 3, 0.)
            },
            "num_instances",
        ),
    ] {
        let err = Engine::try_new(vec![profile(1, 3, 0.), bad], engine_config()).unwrap_err();
        match err {
            ConfigError::InvalidProfile {
                client_id,
                field: got,
                ..
            } => {
                assert_eq!(client_id, ClientId(2));
                assert_eq!(got, field);
            }
            err => panic!("unexpected error: {err}"),
        }
    }
}

#[test]
fn test_unrepresentable_periods_are_rejected() {
    for (bad, field) in [
        (
            ClientProfile {
                monitor_interval: 1e-10,
                ..profile(2, 3, 0.)
            },
            "monitor_interval",
        ),
        (
            ClientProfile {
                monitor_interval: 1e20,
                ..profile(2, 3, 0.)
            },
            "monitor_interval",
        ),
        (profile(2, 3, 1e20), "think_time"),
    ] {
        match Engine::try_new(vec![bad], engine_config()) {
            Err(ConfigError::InvalidProfile { field: got, .. }) => assert_eq!(got, field),
            result => panic!("unexpected result: {result:?}"),
        }
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_far_future_periods_keep_instances_running() {
    tokio::time::pause();

    let engine = Engine::try_new(
        vec![ClientProfile {
            monitor_interval: 1e19,
            ..profile(1, 3, 1e19)
        }],
        engine_config(),
    )
    .unwrap();
    let handle = engine
        .start(crate::endpoint::MockEndpoint::instant(), None)
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(handle.active_instances(ClientId(1)), Some(3));
    assert!(handle.history().is_empty());

    let report = handle.stop().await;
    assert!(report.clean_shutdown);
    assert_eq!(report.totals[&ClientId(1)].requests, 3);
}

#[test]
fn test_duplicate_client_id_is_rejected() {
    let err = Engine::try_new(vec![profile(1, 1, 0.), profile(1, 2, 0.)], engine_config())
        .unwrap_err();
    assert_eq!(err, ConfigError::DuplicateClientId(ClientId(1)));
}

#[tokio::test(flavor = "current_thread")]
async fn test_empty_profile_set_runs_nothing() {
    tokio::time::pause();

    let engine = Engine::try_new(Vec::new(), engine_config()).unwrap();
    assert!(engine.profiles().is_empty());

    let handle = engine
        .start(crate::endpoint::MockEndpoint::instant(), None)
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(handle.total_active(), 0);

    let report = handle.stop().await;
    assert!(report.clean_shutdown);
    assert!(report.snapshots.is_empty());
    assert!(report.totals.is_empty());
}
