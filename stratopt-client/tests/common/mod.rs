//! Scripted backends for session and drill-down scenarios.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use stratopt_client::{Backend, ClientError, OfflineBackend, SweepContext, SweepEvent, SweepStream};
use stratopt_core::{
    AppConfig, BacktestResult, BuyHoldRequest, InputType, OptimizerGrids, OptimizerResponse,
    SignalRequest, SignalResponse, StartPosition, SweepRequest,
};

pub type Gate = Sender<Result<SweepEvent, ClientError>>;

/// Each `open_sweep` takes the gate registered for its grid; frames flow
/// only when the test sends them. Keying by grid keeps the pairing stable
/// whichever worker thread opens first.
#[derive(Default)]
pub struct GatedBackend {
    gates: Mutex<Vec<(OptimizerGrids, Receiver<Result<SweepEvent, ClientError>>)>>,
    requests: Mutex<Vec<SweepRequest>>,
}

impl GatedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register the gate for the next sweep over `grids`.
    pub fn gate_for(&self, grids: &OptimizerGrids) -> Gate {
        let (tx, rx) = mpsc::channel();
        self.gates.lock().unwrap().push((grids.clone(), rx));
        tx
    }

    pub fn requests(&self) -> Vec<SweepRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Backend for GatedBackend {
    fn name(&self) -> &str {
        "gated"
    }

    fn config(&self) -> Result<AppConfig, ClientError> {
        Ok(AppConfig::fallback())
    }

    fn save_config(&self, _config: &AppConfig) -> Result<(), ClientError> {
        Ok(())
    }

    fn buy_hold(&self, _request: &BuyHoldRequest) -> Result<BacktestResult, ClientError> {
        Err(ClientError::Network("gated backend has no buy-and-hold".into()))
    }

    fn signal(&self, _request: &SignalRequest) -> Result<SignalResponse, ClientError> {
        Err(ClientError::Network("gated backend has no signal".into()))
    }

    fn securities(&self) -> Result<Vec<String>, ClientError> {
        Ok(Vec::new())
    }

    fn open_sweep(&self, request: &SweepRequest) -> Result<SweepStream, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut gates = self.gates.lock().unwrap();
        match gates.iter().position(|(grids, _)| *grids == request.grids) {
            Some(i) => Ok(Box::new(gates.remove(i).1.into_iter())),
            None => Err(ClientError::Protocol("no gate registered".into())),
        }
    }
}

/// Offline backend that counts sweeps opened through it.
#[derive(Default)]
pub struct CountingBackend {
    inner: OfflineBackend,
    sweeps: AtomicUsize,
}

impl CountingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sweeps_opened(&self) -> usize {
        self.sweeps.load(Ordering::SeqCst)
    }
}

impl Backend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn config(&self) -> Result<AppConfig, ClientError> {
        self.inner.config()
    }

    fn save_config(&self, config: &AppConfig) -> Result<(), ClientError> {
        self.inner.save_config(config)
    }

    fn buy_hold(&self, request: &BuyHoldRequest) -> Result<BacktestResult, ClientError> {
        self.inner.buy_hold(request)
    }

    fn signal(&self, request: &SignalRequest) -> Result<SignalResponse, ClientError> {
        self.inner.signal(request)
    }

    fn securities(&self) -> Result<Vec<String>, ClientError> {
        self.inner.securities()
    }

    fn open_sweep(&self, request: &SweepRequest) -> Result<SweepStream, ClientError> {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        self.inner.open_sweep(request)
    }
}

pub fn ctx() -> SweepContext {
    SweepContext {
        ticker: "SPHY".into(),
        start_invested: StartPosition::Invested,
        cash_rate: 0.04,
        input_type: InputType::Csv,
    }
}

/// `MA: [50, 55]`, `DROP: [0.01]`, everything else at its default.
pub fn two_point_grid() -> OptimizerGrids {
    let mut grids = OptimizerGrids::singleton(&Default::default());
    grids.ma = vec![50, 55];
    grids.drop = vec![0.01];
    grids
}

/// `MA: [60, 65]`, `DROP: [0.02]`, everything else at its default.
pub fn other_grid() -> OptimizerGrids {
    let mut grids = OptimizerGrids::singleton(&Default::default());
    grids.ma = vec![60, 65];
    grids.drop = vec![0.02];
    grids
}

/// Run a sweep to completion on the offline backend and return its result.
pub fn offline_response(grids: OptimizerGrids) -> OptimizerResponse {
    let stream = OfflineBackend::new()
        .open_sweep(&ctx().request(grids))
        .unwrap();
    for event in stream {
        if let SweepEvent::Result(response) = event.unwrap() {
            return *response;
        }
    }
    panic!("offline sweep produced no result");
}
