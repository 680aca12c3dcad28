//! Strat-Opt client orchestration.
//!
//! - `backend`: the [`Backend`] boundary and sweep event type
//! - `http` / `sse`: the real backend over HTTP with an SSE sweep stream
//! - `offline`: a deterministic in-process backend
//! - `session`: the streaming sweep session manager
//! - `drill`: drill-down resolution for result rows
//! - `config`: client configuration (base URL, timeout, ticker)

pub mod backend;
pub mod config;
pub mod drill;
pub mod error;
pub mod http;
pub mod offline;
pub mod session;
pub mod sse;
pub mod stream;

pub use backend::{Backend, SweepEvent, SweepStream};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TICKER};
pub use drill::{DrillDownResolver, DrillOutcome, DrillState};
pub use error::ClientError;
pub use http::HttpBackend;
pub use offline::{OfflineBackend, SyntheticMarket};
pub use session::{Progress, SessionHandle, SessionState, StreamingSessionManager, SweepContext};
pub use sse::{decode_frame, SseDecoder, SseFrame};
pub use stream::{spawn_sweep, TaggedEvent};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn backends_are_send_sync() {
        assert_send::<HttpBackend>();
        assert_sync::<HttpBackend>();
        assert_send::<OfflineBackend>();
        assert_sync::<OfflineBackend>();
    }

    #[test]
    fn managers_can_move_between_threads() {
        assert_send::<StreamingSessionManager>();
        assert_send::<DrillDownResolver>();
        assert_send::<SweepEvent>();
    }
}
