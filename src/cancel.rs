use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{LedgerError, LedgerResult};

/// Shared flag for abandoning a long-running analytic pass.
///
/// Engines poll it between units of work (a first edge of the motif
/// census, a PageRank iteration, a betweenness source). Nothing needs
/// rolling back: every pass only reads the frozen store.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once [`CancellationFlag::cancel`] has been called.
    pub fn check(&self) -> LedgerResult<()> {
        if self.is_cancelled() {
            Err(LedgerError::Cancelled)
        } else {
            Ok(())
        }
    }
}
