//! Event definitions for the caller-facing stream and the read worker

use super::error::PendantError;
use crate::hid::protocol::PendantState;
use serde::Serialize;
use tokio::sync::mpsc;

/// Events published to the caller of an open connection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PendantEvent {
    /// Interpreted input report
    Input(PendantState),

    /// The device went away; always the last event before the stream ends
    Disconnected {
        #[serde(serialize_with = "serialize_error")]
        error: PendantError,
    },
}

fn serialize_error<S: serde::Serializer>(error: &PendantError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

/// Receiving end of a connection's event stream.
///
/// Use `recv().await` from async code or `blocking_recv()` from a plain thread.
pub type EventStream = mpsc::UnboundedReceiver<PendantEvent>;

/// Commands sent into the read worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerCommand {
    Shutdown,
}

/// Lifecycle acknowledgements sent back by the read worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WorkerStatus {
    /// Read handle open, loop running
    Ready,
    /// Start-up failed before the loop ran
    Failed(PendantError),
    /// Loop exited
    Stopped,
}
