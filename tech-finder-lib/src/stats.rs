//! Run statistics and the end-of-run summary.

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Counters accumulated while a run is in progress.
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Records emitted (success + error)
    pub processed: usize,
    pub success: usize,
    pub errors: usize,
    /// Lookups actually dispatched
    pub requests: usize,
    /// Response elements dropped because they were not objects
    pub skipped: usize,
    /// Technologies dropped because the record cap was reached mid-domain
    pub truncated: usize,
    /// Domains for which a lookup was dispatched
    pub domains_visited: usize,
    started: Instant,
    finished: Option<Instant>,
}

impl RunStats {
    /// Start a fresh set of counters timed from now.
    pub fn start() -> Self {
        Self {
            processed: 0,
            success: 0,
            errors: 0,
            requests: 0,
            skipped: 0,
            truncated: 0,
            domains_visited: 0,
            started: Instant::now(),
            finished: None,
        }
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
        self.success += 1;
    }

    pub fn record_error(&mut self) {
        self.processed += 1;
        self.errors += 1;
    }

    /// Stop the clock. Later calls keep the first end time.
    pub fn finish(&mut self) {
        if self.finished.is_none() {
            self.finished = Some(Instant::now());
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.finished
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.started)
    }

    /// Derive the summary for a run over `total_domains` inputs.
    pub fn summary(&self, total_domains: usize, min_interval: Duration) -> RunSummary {
        let elapsed_secs = self.elapsed().as_secs_f64().round() as u64;

        let success_rate = if self.processed > 0 {
            ((self.success as f64 / self.processed as f64) * 100.0).round() as u32
        } else {
            0
        };

        let avg_secs_per_domain = if self.processed > 0 {
            (elapsed_secs as f64 / self.processed as f64).round() as u64
        } else {
            0
        };

        RunSummary {
            total_domains,
            domains_visited: self.domains_visited,
            processed: self.processed,
            success: self.success,
            errors: self.errors,
            requests: self.requests,
            skipped: self.skipped,
            truncated: self.truncated,
            elapsed_secs,
            success_rate,
            avg_secs_per_domain,
            min_interval_ms: min_interval.as_millis() as u64,
        }
    }
}

/// Derived, reportable view of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_domains: usize,
    pub domains_visited: usize,
    pub processed: usize,
    pub success: usize,
    pub errors: usize,
    pub requests: usize,
    pub skipped: usize,
    pub truncated: usize,
    /// Wall-clock seconds, rounded
    pub elapsed_secs: u64,
    /// Percentage of processed records that were successes, 0..=100
    pub success_rate: u32,
    /// Rounded seconds per processed record
    pub avg_secs_per_domain: u64,
    pub min_interval_ms: u64,
}

impl RunSummary {
    /// Requests per minute implied by the configured interval.
    pub fn requests_per_minute(&self) -> u64 {
        if self.min_interval_ms == 0 {
            0
        } else {
            60_000 / self.min_interval_ms
        }
    }
}
