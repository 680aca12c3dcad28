//! Streaming sweep session manager.
//!
//! Owns at most one in-flight sweep. Every start bumps a generation counter
//! and tags the new sweep's frames with it; frames from any other generation
//! are dropped before they can touch the state. Cancellation raises the old
//! sweep's cancel flag (so its thread stops reading) and bumps the generation
//! (so anything it already sent is ignored).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use stratopt_core::{InputType, OptimizerGrids, OptimizerResponse, StartPosition, SweepRequest};

use crate::backend::{Backend, SweepEvent};
use crate::stream::{spawn_sweep, TaggedEvent};

/// Everything a sweep request needs besides the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepContext {
    pub ticker: String,
    pub start_invested: StartPosition,
    pub cash_rate: f64,
    pub input_type: InputType,
}

impl SweepContext {
    pub fn request(&self, grids: OptimizerGrids) -> SweepRequest {
        SweepRequest {
            ticker: self.ticker.clone(),
            grids,
            start_invested: self.start_invested,
            cash_rate: self.cash_rate,
            input_type: self.input_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
}

impl Progress {
    /// Completed fraction in `[0, 1]`; an empty total counts as done.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.current as f64 / self.total as f64).clamp(0.0, 1.0)
        }
    }
}

/// Observable session state. Only the manager mutates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub loading: bool,
    pub progress: Option<Progress>,
    pub result: Option<OptimizerResponse>,
    pub error: Option<String>,
}

/// Identifies one started session, for targeted cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle {
    pub generation: u64,
}

pub struct StreamingSessionManager {
    backend: Arc<dyn Backend>,
    state: SessionState,
    generation: u64,
    cancel_flag: Option<Arc<AtomicBool>>,
    tx: Sender<TaggedEvent>,
    rx: Receiver<TaggedEvent>,
}

impl StreamingSessionManager {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            state: SessionState::default(),
            generation: 0,
            cancel_flag: None,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Generation of the most recent session (0 before the first start).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    /// Start a sweep over `grids`, replacing any session still in flight.
    pub fn start(&mut self, ctx: &SweepContext, grids: OptimizerGrids) -> SessionHandle {
        if self.state.loading {
            tracing::info!("superseding sweep {}", self.generation);
        }
        self.abort_transport();
        self.generation += 1;
        self.state = SessionState {
            loading: true,
            ..SessionState::default()
        };

        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel_flag = Some(Arc::clone(&cancel));
        let request = ctx.request(grids);
        tracing::info!(
            "starting sweep {} for {} ({} combinations)",
            self.generation,
            request.ticker,
            request.grids.combinations()
        );
        spawn_sweep(
            Arc::clone(&self.backend),
            request,
            self.generation,
            cancel,
            self.tx.clone(),
        );
        SessionHandle {
            generation: self.generation,
        }
    }

    /// Abort the current session and return to idle. A no-op when idle.
    ///
    /// The previous result and error are left as they were; cancelling is
    /// not an error.
    pub fn cancel(&mut self) {
        if !self.state.loading {
            return;
        }
        tracing::info!("cancelling sweep {}", self.generation);
        self.abort_transport();
        self.generation += 1;
        self.state.loading = false;
        self.state.progress = None;
    }

    /// Cancel only if `handle` still names the current session.
    pub fn cancel_session(&mut self, handle: SessionHandle) -> bool {
        if handle.generation != self.generation || !self.state.loading {
            return false;
        }
        self.cancel();
        true
    }

    fn abort_transport(&mut self) {
        if let Some(flag) = self.cancel_flag.take() {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Apply every frame that has already arrived. Returns whether the state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(tagged) = self.rx.try_recv() {
            changed |= self.dispatch(tagged);
        }
        changed
    }

    /// Block up to `timeout` for a frame, then apply it and anything queued behind it.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(tagged) => {
                let changed = self.dispatch(tagged);
                self.poll() || changed
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Wait until the current session is no longer loading or `timeout` elapses.
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

    /// Apply one tagged frame. Frames from any generation but the current
    /// one, or arriving after the terminal frame, are dropped.
    pub fn dispatch(&mut self, tagged: TaggedEvent) -> bool {
        if tagged.generation != self.generation {
            tracing::warn!(
                "dropping frame from stale sweep {} (current {})",
                tagged.generation,
                self.generation
            );
            return false;
        }
        if !self.state.loading {
            tracing::debug!("dropping frame for finished sweep {}", tagged.generation);
            return false;
        }

        match tagged.event {
            SweepEvent::Progress { current, total } => {
                let current = current.min(total);
                if let Some(prev) = self.state.progress {
                    if current < prev.current {
                        tracing::debug!(
                            "dropping regressive progress {current}/{total} after {}/{}",
                            prev.current,
                            prev.total
                        );
                        return false;
                    }
                }
                tracing::debug!("sweep {} progress {current}/{total}", self.generation);
                self.state.progress = Some(Progress { current, total });
            }
            SweepEvent::Result(response) => {
                tracing::info!(
                    "sweep {} finished: {} rows, best {}",
                    self.generation,
                    response.all_results.len(),
                    response.best_params
                );
                self.finish();
                self.state.result = Some(*response);
            }
            SweepEvent::Error(message) => {
                tracing::warn!("sweep {} failed: {message}", self.generation);
                self.finish();
                self.state.error = Some(message);
            }
        }
        true
    }

    fn finish(&mut self) {
        self.state.loading = false;
        self.state.progress = None;
        self.cancel_flag = None;
    }
}

impl Drop for StreamingSessionManager {
    fn drop(&mut self) {
        self.abort_transport();
    }
}
