//! Run state for callers that poll a screen in progress

use crate::observer::ScreenObserver;
use gating_core::{Error, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// Cooperative cancellation flag shared between a caller and a screen
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle of one run: Idle → Running → Completed | Failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed(String),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

/// Point-in-time view of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatus {
    pub run_id: Uuid,
    pub state: RunState,
    pub progress: usize,
    pub total: usize,
}

impl RunStatus {
    pub fn fraction_complete(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.progress as f64 / self.total as f64
        }
    }
}

/// Tracks the state and progress of one run.
///
/// Progress only moves forward and terminal states are final.
#[derive(Debug)]
pub struct RunTracker {
    run_id: Uuid,
    state: Mutex<RunState>,
    progress: AtomicUsize,
    total: AtomicUsize,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: Mutex::new(RunState::Idle),
            progress: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        // state is a plain enum, a poisoned guard still holds a valid value
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> RunState {
        self.lock().clone()
    }

    pub fn status(&self) -> RunStatus {
        RunStatus {
            run_id: self.run_id,
            state: self.state(),
            progress: self.progress.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
        }
    }

    /// Idle → Running
    pub fn start(&self, total: usize) -> Result<()> {
        let mut state = self.lock();
        if *state != RunState::Idle {
            return Err(Error::InvalidInput(format!(
                "run {} cannot start from state {:?}",
                self.run_id, *state
            )));
        }
        self.total.store(total, Ordering::SeqCst);
        *state = RunState::Running;
        debug!(run_id = %self.run_id, total, "run started");
        Ok(())
    }

    /// Raise progress to `completed`; lower values are ignored
    pub fn advance_to(&self, completed: usize) {
        self.progress.fetch_max(completed, Ordering::SeqCst);
    }

    /// Running → Completed
    pub fn complete(&self) -> Result<()> {
        let mut state = self.lock();
        if *state != RunState::Running {
            return Err(Error::InvalidInput(format!(
                "run {} cannot complete from state {:?}",
                self.run_id, *state
            )));
        }
        self.progress
            .fetch_max(self.total.load(Ordering::SeqCst), Ordering::SeqCst);
        *state = RunState::Completed;
        debug!(run_id = %self.run_id, "run completed");
        Ok(())
    }

    /// Any non-terminal state → Failed
    pub fn fail(&self, reason: impl Into<String>) -> Result<()> {
        let mut state = self.lock();
        if state.is_terminal() {
            return Err(Error::InvalidInput(format!(
                "run {} already finished as {:?}",
                self.run_id, *state
            )));
        }
        let reason = reason.into();
        debug!(run_id = %self.run_id, %reason, "run failed");
        *state = RunState::Failed(reason);
        Ok(())
    }
}

impl ScreenObserver for RunTracker {
    fn on_start(&self, total_genes: usize) {
        // a tracker reused across screens keeps its first lifecycle
        let _ = self.start(total_genes);
    }

    fn on_batch_complete(&self, completed_genes: usize, _total_genes: usize) {
        self.advance_to(completed_genes);
    }

    fn on_complete(&self, _hits: usize) {
        let _ = self.complete();
    }

    fn on_failed(&self, reason: &str) {
        let _ = self.fail(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let tracker = RunTracker::new();
        assert_eq!(tracker.state(), RunState::Idle);
        tracker.start(10).unwrap();
        assert_eq!(tracker.state(), RunState::Running);

        tracker.advance_to(4);
        tracker.advance_to(2);
        assert_eq!(tracker.status().progress, 4);
        assert!((tracker.status().fraction_complete() - 0.4).abs() < 1e-12);

        tracker.complete().unwrap();
        let status = tracker.status();
        assert_eq!(status.state, RunState::Completed);
        assert_eq!(status.progress, 10);
        assert!(tracker.fail("late").is_err());
        assert!(tracker.start(3).is_err());
    }

    #[test]
    fn test_failure_is_terminal() {
        let tracker = RunTracker::new();
        tracker.start(5).unwrap();
        tracker.fail("cancelled").unwrap();
        assert_eq!(tracker.state(), RunState::Failed("cancelled".to_string()));
        assert!(tracker.complete().is_err());
    }

    #[test]
    fn test_cannot_complete_idle_run() {
        assert!(RunTracker::new().complete().is_err());
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunTracker::new().run_id(), RunTracker::new().run_id());
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
