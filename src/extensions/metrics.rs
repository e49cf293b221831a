//! Per-record counters.

/// Receives one counter increment per record sent through
/// [`RecordExtensions::send_stats`](super::RecordExtensions::send_stats).
///
/// Tags are `(name, value)` pairs in the order the record configures them.
pub trait StatsSink {
    /// Increment the counter `name` by `count`.
    fn count(&self, name: &str, count: i64, tags: &[(String, String)]);
}

impl<S: StatsSink + ?Sized> StatsSink for &S {
    fn count(&self, name: &str, count: i64, tags: &[(String, String)]) {
        (**self).count(name, count, tags)
    }
}

/// A sink that drops every increment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl StatsSink for NoopSink {
    fn count(&self, _name: &str, _count: i64, _tags: &[(String, String)]) {}
}
