//! Background driver for one sweep stream.
//!
//! Each sweep (main session or drill-down) runs on its own thread, which
//! forwards frames tagged with the generation it was started for. The
//! receiving side decides whether a generation is still current; the thread
//! only stops early when its cancel flag is raised.
//!
//! The flag is checked between frames. A thread blocked in the transport
//! (an HTTP sweep waiting on its next SSE frame) notices the cancel only when
//! that frame arrives or the connection closes; it then exits without
//! forwarding anything. Until then the stale connection stays open, but
//! nothing it produces can reach the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;

use stratopt_core::SweepRequest;

use crate::backend::{Backend, SweepEvent};

/// A frame plus the generation of the sweep that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    pub generation: u64,
    pub event: SweepEvent,
}

/// Spawn a thread that opens `request` on `backend` and forwards its frames.
///
/// Transport failures are forwarded as `SweepEvent::Error` with the error's
/// display text. Exactly one terminal frame is sent unless the sweep is
/// cancelled or the receiver is gone.
pub fn spawn_sweep(
    backend: Arc<dyn Backend>,
    request: SweepRequest,
    generation: u64,
    cancel: Arc<AtomicBool>,
    tx: Sender<TaggedEvent>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let send = |event: SweepEvent| {
            tx.send(TaggedEvent { generation, event }).is_ok()
        };

        let stream = match backend.open_sweep(&request) {
            Ok(stream) => stream,
            Err(e) => {
                if !cancel.load(Ordering::Relaxed) {
                    tracing::warn!("sweep {generation} failed to open: {e}");
                    let _ = send(SweepEvent::Error(e.to_string()));
                }
                return;
            }
        };

        for item in stream {
            if cancel.load(Ordering::Relaxed) {
                tracing::debug!("sweep {generation} cancelled");
                return;
            }
            let event = match item {
                Ok(event) => event,
                Err(e) => SweepEvent::Error(e.to_string()),
            };
            let terminal = event.is_terminal();
            if !send(event) || terminal {
                return;
            }
        }

        // Backends that end without a terminal frame still owe the session one.
        if !cancel.load(Ordering::Relaxed) {
            let _ = send(SweepEvent::Error(
                "stream ended without a result or error frame".into(),
            ));
        }
    })
}
