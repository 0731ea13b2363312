//! Per-operation counters (component C9).

/// A `(count, scans)` pair: `count` is the number of operations of this
/// kind, `scans` is the cumulative number of probe steps taken beyond the
/// home slot (or sweep steps, for evictions).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counter {
    pub count: u64,
    pub scans: u64,
}

impl Counter {
    #[inline]
    pub(crate) fn record(&mut self, scans: u64) {
        self.count += 1;
        self.scans += scans;
    }
}

/// A snapshot of a cache's operation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub lookups: u64,
    pub hits: Counter,
    pub misses: Counter,
    pub adds: Counter,
    pub updates: Counter,
    pub evictions: Counter,
}

impl Stats {
    pub(crate) fn clear(&mut self) {
        *self = Stats::default();
    }
}

impl std::fmt::Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "lookups: {}", self.lookups)?;
        writeln!(f, "hits:      count={} scans={}", self.hits.count, self.hits.scans)?;
        writeln!(f, "misses:    count={} scans={}", self.misses.count, self.misses.scans)?;
        writeln!(f, "adds:      count={} scans={}", self.adds.count, self.adds.scans)?;
        writeln!(f, "updates:   count={} scans={}", self.updates.count, self.updates.scans)?;
        write!(f, "evictions: count={} scans={}", self.evictions.count, self.evictions.scans)
    }
}
