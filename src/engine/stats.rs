// src/engine/stats.rs

use std::fmt;
use std::time::Duration;

use super::queue::ExecutionOutcome;

/// Running totals for one watch session.
///
/// Cancelled runs are counted separately and not as failures, so
/// `total_runs == successful_runs + failed_runs + cancelled_runs`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchModeStatistics {
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub cancelled_runs: u64,
    /// Changes delivered in debounced batches, before queue replacement.
    pub total_changes: u64,
    pub total_duration: Duration,
    pub min_duration: Option<Duration>,
    pub max_duration: Option<Duration>,
    pub last_run_number: Option<u64>,
    pub last_error: Option<String>,
}

impl WatchModeStatistics {
    pub fn record_changes(&mut self, count: usize) {
        self.total_changes += count as u64;
    }

    pub fn record_run(&mut self, outcome: &ExecutionOutcome) {
        self.total_runs += 1;
        if outcome.cancelled {
            self.cancelled_runs += 1;
        } else if outcome.success {
            self.successful_runs += 1;
        } else {
            self.failed_runs += 1;
        }

        if let Some(msg) = &outcome.message {
            self.last_error = Some(msg.clone());
        }

        self.total_duration += outcome.duration;
        self.min_duration = Some(
            self.min_duration
                .map_or(outcome.duration, |d| d.min(outcome.duration)),
        );
        self.max_duration = Some(
            self.max_duration
                .map_or(outcome.duration, |d| d.max(outcome.duration)),
        );
        self.last_run_number = Some(outcome.run_number);
    }

    pub fn average_duration(&self) -> Option<Duration> {
        if self.total_runs == 0 {
            return None;
        }
        let runs = u32::try_from(self.total_runs).unwrap_or(u32::MAX);
        Some(self.total_duration / runs)
    }

    /// Percentage of runs that succeeded, or `None` before the first run.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_runs == 0 {
            return None;
        }
        Some(self.successful_runs as f64 * 100.0 / self.total_runs as f64)
    }
}

impl fmt::Display for WatchModeStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} run(s): {} succeeded, {} failed, {} cancelled; {} change(s) observed",
            self.total_runs,
            self.successful_runs,
            self.failed_runs,
            self.cancelled_runs,
            self.total_changes
        )?;
        if let (Some(avg), Some(rate)) = (self.average_duration(), self.success_rate()) {
            write!(f, "; avg {:.2}s, {rate:.0}% success", avg.as_secs_f64())?;
        }
        Ok(())
    }
}
