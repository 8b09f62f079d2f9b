//! Bounded convergence polling.

use std::future::Future;
use std::time::Duration;

/// How long to wait for something to converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceBudget {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl ConvergenceBudget {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Outcome of a wait that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// The predicate held on attempt `attempts`.
    Converged { attempts: u32 },
    /// Every attempt returned false.
    TimedOut { attempts: u32 },
}

impl Convergence {
    pub fn is_converged(self) -> bool {
        matches!(self, Convergence::Converged { .. })
    }

    pub fn attempts(self) -> u32 {
        match self {
            Convergence::Converged { attempts } | Convergence::TimedOut { attempts } => attempts,
        }
    }
}

/// Evaluate `predicate` up to `budget.max_attempts` times, sleeping
/// `budget.delay` between attempts (never after the last one).
///
/// Returns on the first `Ok(true)` or the first error.
pub async fn await_convergence<F, Fut, E>(
    mut predicate: F,
    budget: ConvergenceBudget,
) -> Result<Convergence, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    for attempt in 1..=budget.max_attempts {
        if predicate().await? {
            return Ok(Convergence::Converged { attempts: attempt });
        }
        if attempt < budget.max_attempts {
            tokio::time::sleep(budget.delay).await;
        }
    }
    Ok(Convergence::TimedOut {
        attempts: budget.max_attempts,
    })
}
