//! Scenario tests for the streaming sweep session manager.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use common::{ctx, offline_response, other_grid, two_point_grid, GatedBackend};
use stratopt_client::{
    spawn_sweep, OfflineBackend, Progress, StreamingSessionManager, SweepEvent, TaggedEvent,
};
use stratopt_core::StrategyParams;

const WAIT: Duration = Duration::from_secs(10);

#[test]
fn bdd_two_point_sweep_runs_to_a_result() {
    // GIVEN the offline backend and a grid MA: [50, 55], DROP: [0.01]
    let mut session = StreamingSessionManager::new(Arc::new(OfflineBackend::new()));
    let grids = two_point_grid();
    assert_eq!(grids.combinations(), 2);
    let evaluated: Vec<StrategyParams> = grids.points().collect();

    // WHEN the sweep is started and allowed to finish
    session.start(&ctx(), grids);
    assert!(session.wait_until_idle(WAIT));

    // THEN the session holds both rows and a best tuple drawn from them
    let state = session.state();
    assert!(!state.loading);
    assert!(state.progress.is_none());
    assert!(state.error.is_none());
    let response = state.result.as_ref().expect("sweep should produce a result");
    assert_eq!(response.all_results.len(), 2);
    assert!(evaluated.contains(&response.best_params));
    assert!(response.is_consistent());
}

#[test]
fn bdd_progress_frames_are_applied_in_order() {
    // GIVEN a session on a gated backend
    let backend = GatedBackend::new();
    let gate = backend.gate_for(&two_point_grid());
    let mut session = StreamingSessionManager::new(backend.clone());
    session.start(&ctx(), two_point_grid());

    // WHEN progress (0,2), (1,2), (2,2) arrive one at a time
    // THEN each one is visible in turn
    for current in 0..=2 {
        gate.send(Ok(SweepEvent::Progress { current, total: 2 })).unwrap();
        assert!(session.wait(WAIT));
        assert_eq!(session.state().progress, Some(Progress { current, total: 2 }));
        assert!(session.state().loading);
    }

    // WHEN the result frame arrives
    let response = offline_response(two_point_grid());
    gate.send(Ok(SweepEvent::Result(Box::new(response.clone())))).unwrap();
    assert!(session.wait(WAIT));

    // THEN the session is finished with that result and no progress
    assert!(!session.state().loading);
    assert!(session.state().progress.is_none());
    assert_eq!(session.state().result.as_ref(), Some(&response));

    // AND the full grid went over the wire in one request
    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].grids.ma, vec![50, 55]);
    assert_eq!(requests[0].grids.drop, vec![0.01]);
}

#[test]
fn bdd_new_start_ignores_frames_from_the_old_session() {
    // GIVEN session A in flight with some progress
    let backend = GatedBackend::new();
    let gate_a = backend.gate_for(&two_point_grid());
    let gate_b = backend.gate_for(&other_grid());
    let mut session = StreamingSessionManager::new(backend.clone());
    let a = session.start(&ctx(), two_point_grid());
    gate_a.send(Ok(SweepEvent::Progress { current: 1, total: 2 })).unwrap();
    assert!(session.wait(WAIT));

    // WHEN session B starts
    let b = session.start(&ctx(), other_grid());
    assert_ne!(a.generation, b.generation);
    assert!(session.state().loading);
    assert!(session.state().progress.is_none());

    // AND A's transport delivers a late error, and an already-queued A frame is replayed
    let _ = gate_a.send(Ok(SweepEvent::Error("late failure from A".into())));
    let replayed = TaggedEvent {
        generation: a.generation,
        event: SweepEvent::Error("late failure from A".into()),
    };
    assert!(!session.dispatch(replayed));

    // AND B reports progress
    gate_b.send(Ok(SweepEvent::Progress { current: 0, total: 2 })).unwrap();
    assert!(session.wait(WAIT));
    std::thread::sleep(Duration::from_millis(50));
    session.poll();

    // THEN only B's frames have touched the state
    let state = session.state();
    assert!(state.loading);
    assert!(state.error.is_none());
    assert!(state.result.is_none());
    assert_eq!(state.progress, Some(Progress { current: 0, total: 2 }));
}

#[test]
fn bdd_cancel_returns_to_idle_without_error() {
    // GIVEN an active session with progress
    let backend = GatedBackend::new();
    let gate = backend.gate_for(&two_point_grid());
    let mut session = StreamingSessionManager::new(backend.clone());
    let handle = session.start(&ctx(), two_point_grid());
    gate.send(Ok(SweepEvent::Progress { current: 1, total: 2 })).unwrap();
    assert!(session.wait(WAIT));

    // WHEN it is cancelled
    assert!(session.cancel_session(handle));

    // THEN loading is off, progress is cleared and there is no error
    assert!(!session.state().loading);
    assert!(session.state().progress.is_none());
    assert!(session.state().error.is_none());

    // AND anything the aborted transport still produces is ignored
    let _ = gate.send(Ok(SweepEvent::Error("aborted".into())));
    drop(gate);
    std::thread::sleep(Duration::from_millis(50));
    assert!(!session.poll());
    assert!(session.state().error.is_none());

    // AND cancelling again is a no-op
    session.cancel();
    assert!(!session.state().loading);
}

#[test]
fn bdd_transport_failure_becomes_session_error() {
    // GIVEN a gated backend with no gate registered, so opening fails
    let backend = GatedBackend::new();
    let mut session = StreamingSessionManager::new(backend);

    // WHEN a sweep is started
    session.start(&ctx(), two_point_grid());
    assert!(session.wait_until_idle(WAIT));

    // THEN the failure is a display string on the session
    let error = session.state().error.as_deref().unwrap_or_default();
    assert!(error.contains("no gate registered"), "got {error:?}");
    assert!(!session.state().loading);
}

#[test]
fn bdd_stream_ending_early_is_a_protocol_error() {
    // GIVEN a session whose transport closes after one progress frame
    let backend = GatedBackend::new();
    let gate = backend.gate_for(&two_point_grid());
    let mut session = StreamingSessionManager::new(backend);
    session.start(&ctx(), two_point_grid());
    gate.send(Ok(SweepEvent::Progress { current: 0, total: 2 })).unwrap();

    // WHEN the transport closes
    drop(gate);
    assert!(session.wait_until_idle(WAIT));

    // THEN the session ends with an error, not silently
    assert!(session.state().error.is_some());
    assert!(session.state().result.is_none());
}

#[test]
fn bdd_cancelled_stream_exits_on_its_next_frame_without_forwarding() {
    // GIVEN a sweep thread blocked waiting for its first frame
    let backend = GatedBackend::new();
    let gate = backend.gate_for(&two_point_grid());
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let handle = spawn_sweep(
        backend.clone(),
        ctx().request(two_point_grid()),
        1,
        Arc::clone(&cancel),
        tx,
    );

    // WHEN it is cancelled and the transport then delivers a frame
    cancel.store(true, Ordering::Relaxed);
    gate.send(Ok(SweepEvent::Progress { current: 0, total: 2 })).unwrap();

    // THEN the thread finishes and nothing was forwarded
    handle.join().unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}
