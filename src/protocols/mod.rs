//! The wire protocols metricline reads and writes.

pub mod statsd;
