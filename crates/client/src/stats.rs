use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Mutex;
use std::time::Duration;

/// Accumulated figures for one operation name.
#[derive(Clone, Copy, Debug)]
pub struct OperationStats {
    /// Number of completed exchanges
    pub count: u64,
    /// Sum of exchange times
    pub total_time: Duration,
    /// Fastest exchange
    pub min_time: Duration,
    /// Slowest exchange
    pub max_time: Duration,
    /// Sum of request body lengths
    pub request_len: u64,
    /// Sum of response body lengths
    pub reply_len: u64,
}

impl Default for OperationStats {
    fn default() -> Self {
        Self {
            count: 0,
            total_time: Duration::ZERO,
            min_time: Duration::MAX,
            max_time: Duration::ZERO,
            request_len: 0,
            reply_len: 0,
        }
    }
}

impl OperationStats {
    /// Mean exchange time.
    pub fn avg_time(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total_time / self.count as u32
        }
    }
}

/// Opt-in per-operation timing and size counters, keyed by operation
/// name and shared across all users of a connection.
///
/// When disabled, [`Statistics::record`] is a single branch — the lock
/// is never touched.
#[derive(Debug)]
pub struct Statistics {
    enabled: bool,
    inner: Mutex<HashMap<&'static str, OperationStats>>,
}

impl Statistics {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Whether recording is enabled for this connection.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn record(
        &self,
        operation: &'static str,
        elapsed: Duration,
        request_len: usize,
        reply_len: usize,
    ) {
        if !self.enabled {
            return;
        }
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let stats = inner.entry(operation).or_default();
        stats.count += 1;
        stats.total_time += elapsed;
        stats.min_time = stats.min_time.min(elapsed);
        stats.max_time = stats.max_time.max(elapsed);
        stats.request_len += request_len as u64;
        stats.reply_len += reply_len as u64;
    }

    /// A copy of the counters, sorted by operation name.
    pub fn snapshot(&self) -> Vec<(&'static str, OperationStats)> {
        let inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut entries: Vec<_> = inner.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }

    /// Clears all counters.
    pub fn reset(&self) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.clear();
    }
}

impl Display for Statistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.enabled {
            return writeln!(f, "statistics disabled");
        }
        writeln!(
            f,
            "{:<28} {:>7} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "operation", "count", "avg", "min", "max", "req bytes", "rsp bytes"
        )?;
        for (name, stats) in self.snapshot() {
            writeln!(
                f,
                "{:<28} {:>7} {:>10.3?} {:>10.3?} {:>10.3?} {:>10} {:>10}",
                name,
                stats.count,
                stats.avg_time(),
                stats.min_time,
                stats.max_time,
                stats.request_len,
                stats.reply_len,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_recorder_stays_empty() {
        let stats = Statistics::new(false);
        stats.record("GetInstance", Duration::from_millis(5), 100, 200);
        assert!(stats.snapshot().is_empty());
        assert!(!stats.is_enabled());
    }

    #[test]
    fn accumulates_per_operation() {
        let stats = Statistics::new(true);
        stats.record("GetInstance", Duration::from_millis(5), 100, 200);
        stats.record("GetInstance", Duration::from_millis(15), 100, 300);
        stats.record("EnumerateInstances", Duration::from_millis(7), 50, 1000);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.len(), 2);
        // sorted by name
        assert_eq!(snapshot[0].0, "EnumerateInstances");
        let (_, get) = snapshot[1];
        assert_eq!(get.count, 2);
        assert_eq!(get.total_time, Duration::from_millis(20));
        assert_eq!(get.min_time, Duration::from_millis(5));
        assert_eq!(get.max_time, Duration::from_millis(15));
        assert_eq!(get.avg_time(), Duration::from_millis(10));
        assert_eq!(get.request_len, 200);
        assert_eq!(get.reply_len, 500);
    }

    #[test]
    fn reset_clears() {
        let stats = Statistics::new(true);
        stats.record("GetClass", Duration::from_millis(1), 1, 1);
        stats.reset();
        assert!(stats.snapshot().is_empty());
    }
}
