//! Drill-down resolution for a clicked result row.
//!
//! The open drill-down is keyed by its param tuple. Toggling the open tuple
//! closes it; the session's best tuple resolves from memory; anything else
//! runs its own one-point sweep. Drill-down state is separate from the
//! session's, so a drill error never shows up as a session error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use stratopt_core::{BacktestResult, OptimizerGrids, OptimizerResponse, StrategyParams};

use crate::backend::{Backend, SweepEvent};
use crate::session::SweepContext;
use crate::stream::{spawn_sweep, TaggedEvent};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrillState {
    /// Tuple of the open row, if any.
    pub open: Option<StrategyParams>,
    pub result: Option<BacktestResult>,
    pub loading: bool,
    pub error: Option<String>,
}

impl DrillState {
    pub fn is_open_for(&self, params: &StrategyParams) -> bool {
        self.open.as_ref() == Some(params)
    }
}

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillOutcome {
    /// The row was already open and is now closed.
    Closed,
    /// Resolved synchronously from the session's best result.
    Cached,
    /// A one-point sweep was issued under this generation.
    Requested { generation: u64 },
}

pub struct DrillDownResolver {
    backend: Arc<dyn Backend>,
    state: DrillState,
    generation: u64,
    cancel_flag: Option<Arc<AtomicBool>>,
    tx: Sender<TaggedEvent>,
    rx: Receiver<TaggedEvent>,
}

impl DrillDownResolver {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            state: DrillState::default(),
            generation: 0,
            cancel_flag: None,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &DrillState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Open, close or switch the drill-down for `params`.
    pub fn toggle(
        &mut self,
        params: StrategyParams,
        session: Option<&OptimizerResponse>,
        ctx: &SweepContext,
    ) -> DrillOutcome {
        if self.state.is_open_for(&params) {
            self.close();
            return DrillOutcome::Closed;
        }

        // Any other row's request is no longer wanted.
        self.invalidate();

        if let Some(response) = session.filter(|r| r.best_params == params) {
            tracing::debug!("drill-down {params} served from session best result");
            self.state = DrillState {
                open: Some(params),
                result: Some(response.best_result.clone()),
                loading: false,
                error: None,
            };
            return DrillOutcome::Cached;
        }

        self.state = DrillState {
            open: Some(params),
            result: None,
            loading: true,
            error: None,
        };
        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel_flag = Some(Arc::clone(&cancel));
        tracing::info!("drill-down {} requesting {params}", self.generation);
        spawn_sweep(
            Arc::clone(&self.backend),
            ctx.request(OptimizerGrids::singleton(&params)),
            self.generation,
            cancel,
            self.tx.clone(),
        );
        DrillOutcome::Requested {
            generation: self.generation,
        }
    }

    /// Close whatever is open and drop its in-flight request.
    pub fn close(&mut self) {
        if self.state.open.is_none() && !self.state.loading {
            return;
        }
        self.invalidate();
        self.state = DrillState::default();
    }

    /// Whether a request is still outstanding.
    pub fn has_pending_request(&self) -> bool {
        self.cancel_flag.is_some()
    }

    fn invalidate(&mut self) {
        if let Some(flag) = self.cancel_flag.take() {
            flag.store(true, Ordering::Relaxed);
        }
        self.generation += 1;
    }

    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(tagged) = self.rx.try_recv() {
            changed |= self.dispatch(tagged);
        }
        changed
    }

    pub fn wait(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(tagged) => {
                let changed = self.dispatch(tagged);
                self.poll() || changed
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.state.loading {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.wait(deadline - now);
        }
        true
    }

    /// Apply one frame. Progress is not tracked for drill-downs.
    pub fn dispatch(&mut self, tagged: TaggedEvent) -> bool {
        if tagged.generation != self.generation || !self.state.loading {
            tracing::debug!(
                "dropping drill-down frame from generation {} (current {})",
                tagged.generation,
                self.generation
            );
            return false;
        }

        match tagged.event {
            SweepEvent::Progress { .. } => false,
            SweepEvent::Result(response) => {
                if response.all_results.len() != 1 {
                    tracing::warn!(
                        "drill-down expected one row, got {}",
                        response.all_results.len()
                    );
                }
                self.state.result = Some(response.best_result);
                self.state.loading = false;
                self.cancel_flag = None;
                true
            }
            SweepEvent::Error(message) => {
                tracing::warn!("drill-down failed: {message}");
                self.state.error = Some(message);
                self.state.loading = false;
                self.cancel_flag = None;
                true
            }
        }
    }
}

impl Drop for DrillDownResolver {
    fn drop(&mut self) {
        if let Some(flag) = self.cancel_flag.take() {
            flag.store(true, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::OfflineBackend;
    use stratopt_core::{InputType, StartPosition};

    fn ctx() -> SweepContext {
        SweepContext {
            ticker: "SPHY".into(),
            start_invested: StartPosition::Invested,
            cash_rate: 0.04,
            input_type: InputType::Csv,
        }
    }

    fn resolver() -> DrillDownResolver {
        DrillDownResolver::new(Arc::new(OfflineBackend::new()))
    }

    fn params(ma: i64) -> StrategyParams {
        StrategyParams {
            ma,
            ..StrategyParams::default()
        }
    }

    #[test]
    fn switching_rows_invalidates_previous_request() {
        let mut r = resolver();
        let first = match r.toggle(params(40), None, &ctx()) {
            DrillOutcome::Requested { generation } => generation,
            other => panic!("expected request, got {other:?}"),
        };
        r.toggle(params(45), None, &ctx());
        assert_eq!(r.state().open, Some(params(45)));

        let stale = TaggedEvent {
            generation: first,
            event: SweepEvent::Error("late".into()),
        };
        assert!(!r.dispatch(stale));
        assert!(r.state().error.is_none());
        assert!(r.state().loading);
    }

    #[test]
    fn progress_frames_do_not_change_state() {
        let mut r = resolver();
        let generation = match r.toggle(params(40), None, &ctx()) {
            DrillOutcome::Requested { generation } => generation,
            other => panic!("expected request, got {other:?}"),
        };
        let before = r.state().clone();
        assert!(!r.dispatch(TaggedEvent {
            generation,
            event: SweepEvent::Progress { current: 0, total: 1 },
        }));
        assert_eq!(r.state(), &before);
    }

    #[test]
    fn one_point_sweep_resolves() {
        let mut r = resolver();
        r.toggle(params(40), None, &ctx());
        assert!(r.wait_until_idle(Duration::from_secs(10)));
        let state = r.state();
        assert_eq!(state.open, Some(params(40)));
        assert!(state.error.is_none());
        assert!(state.result.is_some());
        assert!(!r.has_pending_request());
    }

    #[test]
    fn close_when_nothing_open_is_a_noop() {
        let mut r = resolver();
        r.close();
        assert_eq!(r.generation(), 0);
        assert_eq!(r.state(), &DrillState::default());
    }
}
