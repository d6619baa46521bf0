//! Progress hooks for long screens
//!
//! The screener reports to a [`ScreenObserver`] after each gene batch. The
//! [`NullObserver`] does nothing and compiles away.

/// Receives progress events from a running screen
pub trait ScreenObserver: Sync {
    /// Called when the screen starts, with the number of genes to process
    fn on_start(&self, _total_genes: usize) {}

    /// Called after each batch with cumulative counts
    fn on_batch_complete(&self, _completed_genes: usize, _total_genes: usize) {}

    /// Called once the single FDR pass has finished
    fn on_complete(&self, _hits: usize) {}

    /// Called when the screen stops early
    fn on_failed(&self, _reason: &str) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ScreenObserver for NullObserver {}
