//! Running statistics built from simulation events
//!
//! Tracks the current run's split/fail tallies and the history of finished
//! runs. A parameter change starts the history over, since runs under
//! different tunables are not comparable.

use serde::{Deserialize, Serialize};

use crate::sim::{PoolCounts, SimEvent};

/// Split/fail statistics across runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Splits in the current run
    pub splits: u64,
    /// Failed splits in the current run
    pub split_fails: u64,
    /// Most splits reached in any run since the last parameter change
    pub highest_splits: u64,
    /// Most failed splits reached in any run since the last parameter change
    pub highest_split_fails: u64,
    /// Split totals of finished runs
    pub run_splits: Vec<u64>,
    /// Runs finished since the last parameter change
    pub total_runs: u64,
    /// Latest pool occupancy seen on an event
    pub counts: PoolCounts,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the statistics
    pub fn record(&mut self, event: &SimEvent) {
        match *event {
            SimEvent::EntitySplit { counts, .. } => {
                self.splits += 1;
                self.highest_splits = self.highest_splits.max(self.splits);
                self.counts = counts;
            }
            SimEvent::EntitySplitFail { counts, .. } => {
                self.split_fails += 1;
                self.highest_split_fails = self.highest_split_fails.max(self.split_fails);
                self.counts = counts;
            }
            SimEvent::SimulationReset { counts, .. } => {
                self.run_splits.push(self.splits);
                self.total_runs += 1;
                self.splits = 0;
                self.split_fails = 0;
                self.counts = counts;
            }
            SimEvent::ParametersChanged { .. } => self.clear_history(),
        }
    }

    /// Fold a batch of events
    pub fn extend<'a>(&mut self, events: impl IntoIterator<Item = &'a SimEvent>) {
        for event in events {
            self.record(event);
        }
    }

    /// Share of decisions in the current run that split (1.0 before any)
    pub fn accuracy(&self) -> f64 {
        let decisions = self.splits + self.split_fails;
        if decisions == 0 {
            1.0
        } else {
            self.splits as f64 / decisions as f64
        }
    }

    /// Mean splits per finished run
    pub fn mean_splits(&self) -> f64 {
        if self.run_splits.is_empty() {
            0.0
        } else {
            self.run_splits.iter().sum::<u64>() as f64 / self.run_splits.len() as f64
        }
    }

    /// Forget finished runs and the high mark
    pub fn clear_history(&mut self) {
        self.highest_splits = 0;
        self.highest_split_fails = 0;
        self.total_runs = 0;
        self.run_splits.clear();
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "splits {} fails {} accuracy {:.2}% | highest {}/{} mean {:.2} runs {} | active {} inactive {} total {}",
            self.splits,
            self.split_fails,
            self.accuracy() * 100.0,
            self.highest_splits,
            self.highest_split_fails,
            self.mean_splits(),
            self.total_runs,
            self.counts.active,
            self.counts.inactive,
            self.counts.total()
        )
    }
}
