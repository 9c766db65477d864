//! # Export Pipeline
//!
//! The export state machine and its reentrancy guard.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Idle ──begin()──► Preparing ──► Capturing ──► Encoding ──► Delivered   │
//! │                        │             │             │                    │
//! │                        └─────────────┼─────────────┘                    │
//! │                                      ▼                                  │
//! │                                   Failed                                │
//! │                                                                         │
//! │  begin() is allowed again from Idle, Delivered or Failed.               │
//! │                                                                         │
//! │  ExportRun is the only way to move between the middle states. Dropping │
//! │  a run before it reaches Delivered or Failed (early return, panic,      │
//! │  cancelled future) records Failed.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{ExportError, ExportResult};

// =============================================================================
// Export State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    Idle,
    Preparing,
    Capturing,
    Encoding,
    Delivered,
    Failed,
}

impl ExportState {
    /// A new run may start from here.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ExportState::Idle | ExportState::Delivered | ExportState::Failed
        )
    }

    /// Whether `self → next` is an edge of the machine.
    pub fn can_advance_to(&self, next: ExportState) -> bool {
        use ExportState::*;
        matches!(
            (self, next),
            (Preparing, Capturing)
                | (Capturing, Encoding)
                | (Encoding, Delivered)
                | (Preparing, Failed)
                | (Capturing, Failed)
                | (Encoding, Failed)
        )
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportState::Idle => "idle",
            ExportState::Preparing => "preparing",
            ExportState::Capturing => "capturing",
            ExportState::Encoding => "encoding",
            ExportState::Delivered => "delivered",
            ExportState::Failed => "failed",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// Summary of a delivered document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReceipt {
    pub id: Uuid,
    pub filename: String,
    /// Where the sink put it (path, URL, `memory:` key).
    pub location: String,
    pub bytes: usize,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// The page image was taller than A4 and lost its bottom edge.
    pub clipped: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Pipeline
// =============================================================================

#[derive(Debug)]
struct Machine {
    state: ExportState,
    last_error: Option<String>,
}

/// Shared export state. One per session (or per front-end window).
#[derive(Debug)]
pub struct ExportPipeline {
    machine: Mutex<Machine>,
}

impl ExportPipeline {
    pub fn new() -> Self {
        ExportPipeline {
            machine: Mutex::new(Machine {
                state: ExportState::Idle,
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ExportState {
        self.lock().state
    }

    /// Human-readable message from the most recent failed run.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Starts a run, moving to `Preparing`.
    ///
    /// Refuses with [`ExportError::AlreadyRunning`] while another run is in
    /// a middle state; the running export is left untouched.
    pub fn begin(self: &Arc<Self>) -> ExportResult<ExportRun> {
        let mut machine = self.lock();
        if !machine.state.is_settled() {
            warn!(state = %machine.state, "Export requested while another is running");
            return Err(ExportError::AlreadyRunning {
                state: machine.state,
            });
        }

        let id = Uuid::new_v4();
        info!(run = %id, from = %machine.state, to = %ExportState::Preparing, "Export started");
        machine.state = ExportState::Preparing;
        machine.last_error = None;

        Ok(ExportRun {
            pipeline: Arc::clone(self),
            id,
            finished: false,
        })
    }
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Export Run
// =============================================================================

/// Exclusive handle on one export attempt.
#[derive(Debug)]
pub struct ExportRun {
    pipeline: Arc<ExportPipeline>,
    id: Uuid,
    finished: bool,
}

impl ExportRun {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ExportState {
        self.pipeline.state()
    }

    /// Moves to the next stage.
    pub fn advance(&mut self, next: ExportState) -> ExportResult<()> {
        let mut machine = self.pipeline.lock();
        let from = machine.state;
        if !from.can_advance_to(next) || next == ExportState::Failed {
            return Err(ExportError::Internal(format!(
                "invalid export transition {} -> {}",
                from, next
            )));
        }
        info!(run = %self.id, %from, to = %next, "Export state changed");
        machine.state = next;
        if next == ExportState::Delivered {
            self.finished = true;
        }
        Ok(())
    }

    /// Records the failure and ends the run.
    pub fn fail(mut self, err: &ExportError) {
        self.record_failure(err.user_message());
        error!(run = %self.id, code = ?err.code(), error = %err, "Export failed");
        self.finished = true;
    }

    fn record_failure(&self, message: String) {
        let mut machine = self.pipeline.lock();
        let from = machine.state;
        if from.can_advance_to(ExportState::Failed) {
            info!(run = %self.id, %from, to = %ExportState::Failed, "Export state changed");
            machine.state = ExportState::Failed;
            machine.last_error = Some(message);
        }
    }
}

impl Drop for ExportRun {
    fn drop(&mut self) {
        if !self.finished {
            warn!(run = %self.id, state = %self.state(), "Export run abandoned");
            self.record_failure("The export was interrupted.".to_string());
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let pipeline = Arc::new(ExportPipeline::new());
        let mut run = pipeline.begin().unwrap();
        assert_eq!(pipeline.state(), ExportState::Preparing);

        run.advance(ExportState::Capturing).unwrap();
        run.advance(ExportState::Encoding).unwrap();
        run.advance(ExportState::Delivered).unwrap();
        drop(run);

        assert_eq!(pipeline.state(), ExportState::Delivered);
        assert!(pipeline.last_error().is_none());
    }

    #[test]
    fn test_begin_refused_while_running() {
        let pipeline = Arc::new(ExportPipeline::new());
        let mut run = pipeline.begin().unwrap();
        run.advance(ExportState::Capturing).unwrap();

        let err = pipeline.begin().unwrap_err();
        assert!(matches!(
            err,
            ExportError::AlreadyRunning {
                state: ExportState::Capturing
            }
        ));
        assert_eq!(pipeline.state(), ExportState::Capturing);
    }

    #[test]
    fn test_failure_records_message() {
        let pipeline = Arc::new(ExportPipeline::new());
        let run = pipeline.begin().unwrap();
        run.fail(&ExportError::MissingRenderTarget);

        assert_eq!(pipeline.state(), ExportState::Failed);
        assert!(pipeline.last_error().is_some());
        assert!(pipeline.begin().is_ok());
    }

    #[test]
    fn test_dropped_run_fails() {
        let pipeline = Arc::new(ExportPipeline::new());
        {
            let mut run = pipeline.begin().unwrap();
            run.advance(ExportState::Capturing).unwrap();
        }
        assert_eq!(pipeline.state(), ExportState::Failed);
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let pipeline = Arc::new(ExportPipeline::new());
        let mut run = pipeline.begin().unwrap();
        assert!(run.advance(ExportState::Delivered).is_err());
        assert!(run.advance(ExportState::Failed).is_err());
        assert_eq!(pipeline.state(), ExportState::Preparing);
    }

    #[test]
    fn test_edges() {
        use ExportState::*;
        assert!(!Idle.can_advance_to(Failed));
        assert!(!Delivered.can_advance_to(Failed));
        assert!(Encoding.can_advance_to(Failed));
        assert!(Idle.is_settled() && Failed.is_settled() && Delivered.is_settled());
        assert!(!Encoding.is_settled());
    }
}
