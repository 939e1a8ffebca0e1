//! Turn Quota Governor — per-turn search count plus an independent in-flight gate.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_SEARCHES_PER_TURN: usize = 3;
pub const DEFAULT_MAX_CONCURRENT_SEARCHES: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TurnQuotaState {
    pub call_count: usize,
    pub total_results: usize,
    pub queries_used: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// 1-based index of this call within the turn.
    Accepted { position: usize },
    Rejected { total_results: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnStats {
    #[serde(flatten)]
    pub state: TurnQuotaState,
    pub max_per_turn: usize,
}

/// Counts searches within the current turn. The orchestrator calls `reset`
/// at the start of every turn; nothing here resets on a timer.
#[derive(Debug)]
pub struct TurnQuota {
    max_per_turn: usize,
    state: Mutex<TurnQuotaState>,
}

impl TurnQuota {
    pub fn new(max_per_turn: usize) -> Self {
        Self {
            max_per_turn,
            state: Mutex::new(TurnQuotaState::default()),
        }
    }

    pub fn reset(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = TurnQuotaState::default();
    }

    /// Check-and-increment in one critical section. Rejected calls change nothing.
    pub fn admit(&self, query: &str) -> Admission {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.call_count >= self.max_per_turn {
            return Admission::Rejected {
                total_results: state.total_results,
            };
        }
        state.call_count += 1;
        state.queries_used.push(query.to_string());
        Admission::Accepted {
            position: state.call_count,
        }
    }

    pub fn record_results(&self, n: usize) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .total_results += n;
    }

    pub fn max_per_turn(&self) -> usize {
        self.max_per_turn
    }

    pub fn stats(&self) -> TurnStats {
        TurnStats {
            state: self
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            max_per_turn: self.max_per_turn,
        }
    }
}

/// Bounds searches executing at once, across all sessions.
#[derive(Debug, Clone)]
pub struct SearchGate {
    permits: Arc<Semaphore>,
}

impl SearchGate {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight)),
        }
    }

    /// Waits for a free slot. `None` when `cancel` fires first (or was already cancelled).
    pub async fn acquire(&self, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
        if cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = self.permits.clone().acquire_owned() => permit.ok(),
        }
    }

    #[cfg(test)]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
