//! Per-method timing aggregation
//!
//! Every profiled call adds its elapsed time to a running total keyed by
//! [`MethodKey`]. Totals only ever grow and addition is commutative, so the
//! interleaving of concurrent callers does not change the final numbers.

use crate::capability::MethodKey;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

/// Concurrency-safe map from method to accumulated duration
#[derive(Debug, Default)]
pub struct ProfilingState {
    totals: Mutex<HashMap<MethodKey, Duration>>,
}

impl ProfilingState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `elapsed` to the total for `key`, creating the entry if needed
    pub fn record(&self, key: &MethodKey, elapsed: Duration) {
        let mut totals = self.lock();
        let total = totals.entry(key.clone()).or_default();
        *total = total.saturating_add(elapsed);
        tracing::trace!(method = %key, ?elapsed, total = ?*total, "recorded profiled call");
    }

    /// Accumulated duration for one method, if it was ever called
    pub fn total(&self, key: &MethodKey) -> Option<Duration> {
        self.lock().get(key).copied()
    }

    /// Number of distinct methods recorded
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Consistent copy of all totals, sorted by method key
    pub fn snapshot(&self) -> Vec<(MethodKey, Duration)> {
        let mut entries: Vec<_> = self
            .lock()
            .iter()
            .map(|(key, total)| (key.clone(), *total))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Write one line per method, sorted by method key
    ///
    /// The lock is only held while taking the snapshot; calls recorded after
    /// that point are not part of the output. The writer is never closed.
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        for (key, total) in self.snapshot() {
            writeln!(writer, "{} took {}", key, format_duration(total))?;
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MethodKey, Duration>> {
        // A panic while holding the lock cannot leave a half-applied addition
        self.totals.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Format as `{minutes}m {seconds}s {millis}ms`
///
/// Minutes are not wrapped into hours.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{}m {}s {}ms",
        secs / 60,
        secs % 60,
        duration.subsec_millis()
    )
}
