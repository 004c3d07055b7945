use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// What happened to one gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcEvent {
    /// A logical call, counted once however many attempts it takes.
    Call,
    /// An attempt past the first.
    Retry,
    /// A call that ended in an error after its last attempt.
    Failure,
}

/// Tallies of [`RpcEvent`]s for one [`crate::gateway::RetryingGateway`].
#[derive(Debug, Default)]
pub struct RpcStats {
    tallies: [AtomicU64; 3],
}

impl RpcStats {
    pub fn record(&self, event: RpcEvent) {
        self.tallies[event as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, event: RpcEvent) -> u64 {
        self.tallies[event as usize].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> RpcStatsSnapshot {
        RpcStatsSnapshot {
            calls: self.count(RpcEvent::Call),
            retries: self.count(RpcEvent::Retry),
            failures: self.count(RpcEvent::Failure),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RpcStatsSnapshot {
    pub calls: u64,
    pub retries: u64,
    pub failures: u64,
}
