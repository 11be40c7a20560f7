//! End-to-end tests for the process host against real plugin subprocesses.
#![cfg(unix)]

mod support;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use arbor_plugins::{PluginError, PluginHost, ProcessState};

use support::{
    EXIT_AFTER_ACCEPT_SCRIPT, NEVER_BINDS_SCRIPT, SERVE_SCRIPT, TestWorld, manifest,
    python3_available,
};

fn make_host(world: &TestWorld) -> Arc<PluginHost> {
    Arc::new(PluginHost::new(
        world.plugins_dir().clone(),
        world.sockets_dir().clone(),
    ))
}

#[test]
fn waking_twice_spawns_exactly_one_subprocess() {
    if !python3_available() {
        eprintln!("skipping: python3 is not available");
        return;
    }
    let world = TestWorld::new();
    world.write_plugin("counter", &manifest("counter", "", &[]), SERVE_SCRIPT);
    let host = make_host(&world);

    host.wakeup("counter").expect("first wakeup");
    host.wakeup("counter").expect("second wakeup");

    let spawns = world.plugin_log("counter", "spawns.txt");
    assert_eq!(spawns.len(), 1, "exactly one process may be spawned: {spawns:?}");
    assert_eq!(host.process_state("counter"), ProcessState::Ready);

    host.kill_all();
}

#[test]
fn sequential_calls_round_trip_with_monotonic_ids() {
    if !python3_available() {
        eprintln!("skipping: python3 is not available");
        return;
    }
    let world = TestWorld::new();
    world.write_plugin("echo", &manifest("echo", "", &[]), SERVE_SCRIPT);
    let host = make_host(&world);
    host.wakeup("echo").expect("wakeup");

    for _ in 0..5 {
        let result = host.call("echo", "greet", None).expect("call");
        assert_eq!(result, serde_json::json!("ok:greet"));
    }

    let ids: Vec<u64> = world
        .plugin_log("echo", "ids.txt")
        .iter()
        .map(|line| line.parse().expect("numeric id"))
        .collect();
    assert_eq!(ids.len(), 5);
    assert!(
        ids.windows(2).all(|pair| pair[0] < pair[1]),
        "ids must increase in issuance order: {ids:?}"
    );

    host.kill_all();
}

#[test]
fn concurrent_calls_get_pairwise_distinct_ids() {
    if !python3_available() {
        eprintln!("skipping: python3 is not available");
        return;
    }
    let world = TestWorld::new();
    world.write_plugin("busy", &manifest("busy", "", &[]), SERVE_SCRIPT);
    let host = make_host(&world);
    host.wakeup("busy").expect("wakeup");

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let host = Arc::clone(&host);
            thread::spawn(move || host.call("busy", "task", None))
        })
        .collect();
    for worker in workers {
        worker
            .join()
            .expect("worker thread")
            .expect("concurrent call succeeds");
    }

    let ids = world.plugin_log("busy", "ids.txt");
    let distinct: HashSet<&String> = ids.iter().collect();
    assert_eq!(ids.len(), 8);
    assert_eq!(distinct.len(), 8, "ids must be pairwise distinct: {ids:?}");

    host.kill_all();
}

#[test]
fn plugin_reported_error_surfaces_as_application_error() {
    if !python3_available() {
        eprintln!("skipping: python3 is not available");
        return;
    }
    let world = TestWorld::new();
    world.write_plugin("grumpy", &manifest("grumpy", "", &[]), SERVE_SCRIPT);
    let host = make_host(&world);
    host.wakeup("grumpy").expect("wakeup");

    let error = host
        .call("grumpy", "fail", None)
        .expect_err("plugin error should surface");
    match error {
        PluginError::Application { code, message, .. } => {
            assert_eq!(code, 13);
            assert_eq!(message, "induced failure");
        }
        other => panic!("expected application error, got: {other}"),
    }

    host.kill_all();
}

#[test]
fn kill_all_clears_tracking_and_socket_files() {
    if !python3_available() {
        eprintln!("skipping: python3 is not available");
        return;
    }
    let world = TestWorld::new();
    world.write_plugin("first", &manifest("first", "", &[]), SERVE_SCRIPT);
    world.write_plugin("second", &manifest("second", "", &[]), SERVE_SCRIPT);
    let host = make_host(&world);
    host.wakeup("first").expect("wakeup first");
    host.wakeup("second").expect("wakeup second");
    assert_eq!(host.list_running().len(), 2);

    host.kill_all();

    assert!(host.list_running().is_empty());
    assert!(!host.socket_path("first").as_std_path().exists());
    assert!(!host.socket_path("second").as_std_path().exists());
}

#[test]
fn wakeup_async_delivers_outcome_on_completion_channel() {
    if !python3_available() {
        eprintln!("skipping: python3 is not available");
        return;
    }
    let world = TestWorld::new();
    world.write_plugin("later", &manifest("later", "", &[]), SERVE_SCRIPT);
    let host = make_host(&world);

    let receiver = host.wakeup_async("later");
    let outcome = receiver.recv().expect("completion channel delivers");
    assert_eq!(outcome.name(), "later");
    assert!(outcome.is_success());
    outcome.into_result().expect("wakeup succeeded");
    assert!(host.is_running("later"));

    host.kill_all();
}

#[test]
fn ping_answers_true_for_live_and_false_for_dead() {
    if !python3_available() {
        eprintln!("skipping: python3 is not available");
        return;
    }
    let world = TestWorld::new();
    world.write_plugin("pong", &manifest("pong", "", &[]), SERVE_SCRIPT);
    let host = make_host(&world);

    assert!(!host.ping("pong"), "nothing is listening yet");
    host.wakeup("pong").expect("wakeup");
    assert!(host.ping("pong"), "live plugin answers the handshake");

    host.kill_all();
    assert!(!host.ping("pong"), "killed plugin no longer answers");
}

#[test]
fn call_fails_when_plugin_dies_after_accepting() {
    if !python3_available() {
        eprintln!("skipping: python3 is not available");
        return;
    }
    let world = TestWorld::new();
    world.write_plugin(
        "mayfly",
        &manifest("mayfly", "", &[]),
        EXIT_AFTER_ACCEPT_SCRIPT,
    );
    let host = make_host(&world);
    host.wakeup("mayfly").expect("socket becomes ready");

    let error = host
        .call("mayfly", "greet", None)
        .expect_err("dead plugin cannot answer");
    assert!(
        matches!(
            error,
            PluginError::Connect { .. } | PluginError::Io { .. } | PluginError::Timeout { .. }
        ),
        "expected a transport-level failure, got: {error}"
    );

    host.kill_all();
}

#[test]
fn spawn_timeout_fails_wakeup_and_reaps_the_orphan() {
    if !python3_available() {
        eprintln!("skipping: python3 is not available");
        return;
    }
    let world = TestWorld::new();
    world.write_plugin("sleeper", &manifest("sleeper", "", &[]), NEVER_BINDS_SCRIPT);
    let host = make_host(&world);

    let error = host
        .wakeup("sleeper")
        .expect_err("socket never becomes ready");
    assert!(matches!(error, PluginError::SocketTimeout { .. }), "got: {error}");
    assert_eq!(host.process_state("sleeper"), ProcessState::Unloaded);
    assert!(host.list_running().is_empty());
}
