use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

/// Tuning for one parallel solve.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveConfig {
    /// Number of wedges, and so of worker threads.
    pub wedges: usize,
    /// How far (in meters) a worker may relax ahead of its slower angular neighbor.
    pub elasticity: f64,
    /// Abort the solve with `Error::Cancelled` once this much time has passed.
    pub timeout: Option<Duration>,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            wedges: 4,
            elasticity: 0.0,
            timeout: None,
        }
    }
}

impl SolveConfig {
    pub fn new(wedges: usize, elasticity: f64) -> Self {
        Self {
            wedges,
            elasticity,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.wedges == 0 {
            return Err(Error::NoWedges);
        }
        if !(self.elasticity.is_finite() && self.elasticity >= 0.0) {
            return Err(Error::InvalidElasticity(self.elasticity));
        }
        Ok(())
    }
}

/// Shared flag that stops a running solve from outside. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
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
