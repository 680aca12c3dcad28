//! Backend boundary.
//!
//! Everything the client asks of the service that actually runs backtests
//! goes through [`Backend`]. The HTTP implementation talks to the real
//! service; the offline implementation simulates it in-process so both
//! binaries and the tests can run without one.

use stratopt_core::{
    AppConfig, BacktestResult, BuyHoldRequest, OptimizerResponse, SignalRequest, SignalResponse,
    SweepRequest,
};

use crate::error::ClientError;

/// One decoded frame of a sweep stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepEvent {
    Progress { current: u64, total: u64 },
    Result(Box<OptimizerResponse>),
    Error(String),
}

impl SweepEvent {
    /// Result and error frames end a stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SweepEvent::Progress { .. })
    }
}

/// A live sweep: frames in arrival order. Dropping it closes the transport.
pub type SweepStream = Box<dyn Iterator<Item = Result<SweepEvent, ClientError>> + Send>;

/// The external service, as seen by the client.
///
/// Implementations must be shareable across the worker threads that drive
/// sweeps and drill-downs.
pub trait Backend: Send + Sync {
    /// Short human-readable name (for status lines and logs).
    fn name(&self) -> &str;

    fn config(&self) -> Result<AppConfig, ClientError>;

    /// Replace the backend config wholesale.
    fn save_config(&self, config: &AppConfig) -> Result<(), ClientError>;

    fn buy_hold(&self, request: &BuyHoldRequest) -> Result<BacktestResult, ClientError>;

    fn signal(&self, request: &SignalRequest) -> Result<SignalResponse, ClientError>;

    /// Tickers the backend can serve.
    fn securities(&self) -> Result<Vec<String>, ClientError>;

    /// Open a streaming sweep over the full grid in `request`.
    fn open_sweep(&self, request: &SweepRequest) -> Result<SweepStream, ClientError>;
}
