//! Collected warnings of one run

use crate::error::Warning;
use tracing::warn;

/// Accumulates recovered [`Warning`]s.
///
/// Every component receives `&mut Diagnostics`; each warning is logged when it is recorded
/// and kept for the end-of-run summary.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Number of warnings matching `predicate`
    pub fn count(&self, predicate: impl Fn(&Warning) -> bool) -> usize {
        self.warnings.iter().filter(|w| predicate(w)).count()
    }
}
