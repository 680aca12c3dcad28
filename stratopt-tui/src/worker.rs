//! Background worker thread for one-shot backend requests.
//!
//! Config load/save, buy-and-hold and signal requests run here so the draw
//! loop never blocks on the network. Sweeps and drill-downs do not go
//! through the worker; they stream through the session manager and the
//! drill-down resolver, which own their own threads.
//!
//! Each request carries the generation it was issued under, and the app
//! drops responses whose generation is no longer current.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use stratopt_client::Backend;
use stratopt_core::{AppConfig, BacktestResult, BuyHoldRequest, SignalRequest, SignalResponse};

/// Which view asked for a buy-and-hold backtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyHoldPurpose {
    /// Secondary curve on the drill-down chart.
    Overlay,
    /// The Buy & Hold panel.
    View,
}

#[derive(Debug)]
pub enum WorkerCommand {
    LoadConfig,
    SaveConfig(Box<AppConfig>),
    BuyHold {
        purpose: BuyHoldPurpose,
        generation: u64,
        request: BuyHoldRequest,
    },
    Signal {
        generation: u64,
        request: SignalRequest,
    },
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum WorkerResponse {
    ConfigLoaded(Result<Box<AppConfig>, String>),
    /// The saved config on success.
    ConfigSaved(Result<Box<AppConfig>, String>),
    BuyHold {
        purpose: BuyHoldPurpose,
        generation: u64,
        result: Result<Box<BacktestResult>, String>,
    },
    Signal {
        generation: u64,
        result: Result<Box<SignalResponse>, String>,
    },
}

pub fn spawn_worker(
    backend: Arc<dyn Backend>,
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("stratopt-worker".into())
        .spawn(move || worker_loop(backend, rx, tx))
}

fn worker_loop(backend: Arc<dyn Backend>, rx: Receiver<WorkerCommand>, tx: Sender<WorkerResponse>) {
    tracing::debug!("worker started against {}", backend.name());
    while let Ok(cmd) = rx.recv() {
        let response = match cmd {
            WorkerCommand::Shutdown => break,
            WorkerCommand::LoadConfig => WorkerResponse::ConfigLoaded(
                backend.config().map(Box::new).map_err(|e| e.to_string()),
            ),
            WorkerCommand::SaveConfig(config) => WorkerResponse::ConfigSaved(
                backend
                    .save_config(&config)
                    .map(|()| config)
                    .map_err(|e| e.to_string()),
            ),
            WorkerCommand::BuyHold {
                purpose,
                generation,
                request,
            } => WorkerResponse::BuyHold {
                purpose,
                generation,
                result: backend
                    .buy_hold(&request)
                    .map(Box::new)
                    .map_err(|e| e.to_string()),
            },
            WorkerCommand::Signal {
                generation,
                request,
            } => WorkerResponse::Signal {
                generation,
                result: backend
                    .signal(&request)
                    .map(Box::new)
                    .map_err(|e| e.to_string()),
            },
        };

        if tx.send(response).is_err() {
            break;
        }
    }
    tracing::debug!("worker stopped");
}
