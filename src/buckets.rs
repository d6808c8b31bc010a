//! Buckets are the primary internal storage type.
//!
//! Observations are grouped into fixed-width time windows. Inside a window
//! every distinct (kind, key, unit, serialized tags) identity owns exactly one
//! `Metric`, which absorbs every later observation for that identity. Windows
//! are drained once they close, or all at once on shutdown.

use metric::{serialize_tags, Error, Metric, MetricKind, Sample, TagMap};
use std::collections::BTreeMap;
use std::mem;
use time;
use unit::Unit;

/// A single observation on its way into a `Buckets`.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    /// The aggregation the observation belongs to.
    pub kind: MetricKind,
    /// The raw metric key.
    pub key: String,
    /// The unit of `sample`.
    pub unit: Unit,
    /// The raw tags.
    pub tags: TagMap,
    /// Seconds since the Unix epoch at which the observation was made.
    pub timestamp: i64,
    /// The observed value.
    pub sample: Sample,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct BucketKey {
    kind: MetricKind,
    key: String,
    unit: Unit,
    tags: String,
}

/// Buckets stores all metrics until they are flushed.
#[derive(Debug)]
pub struct Buckets {
    bins: BTreeMap<i64, BTreeMap<BucketKey, Metric>>,
    bin_width: i64,
    weight: usize,
}

impl Default for Buckets {
    /// Create a default Buckets, with ten second windows.
    ///
    /// # Examples
    ///
    /// ```
    /// use metricline::buckets::Buckets;
    ///
    /// let bucket = Buckets::default();
    /// assert_eq!(10, bucket.bin_width());
    /// assert!(bucket.is_empty());
    /// ```
    fn default() -> Buckets {
        Buckets::new(10)
    }
}

impl Buckets {
    /// Create a Buckets with `bin_width` second windows. Widths below one
    /// second are raised to one.
    pub fn new(bin_width: i64) -> Buckets {
        Buckets {
            bins: BTreeMap::new(),
            bin_width: if bin_width < 1 { 1 } else { bin_width },
            weight: 0,
        }
    }

    /// The width of each window, in seconds.
    pub fn bin_width(&self) -> i64 {
        self.bin_width
    }

    /// Adds an observation to the bucket storage.
    ///
    /// The first observation of an identity within a window creates its
    /// metric, stamped with the window's start. Later ones are folded into
    /// it. An observation whose sample does not fit the existing metric, or
    /// whose timestamp has no window, is rejected and the storage is left
    /// unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use metricline::buckets::{Buckets, Observation};
    /// use metricline::metric::{MetricKind, Sample, TagMap};
    /// use metricline::unit::Unit;
    ///
    /// let mut bucket = Buckets::new(10);
    /// let obs = Observation {
    ///     kind: MetricKind::Counter,
    ///     key: "hits".to_string(),
    ///     unit: Unit::none(),
    ///     tags: TagMap::default(),
    ///     timestamp: 1003,
    ///     sample: Sample::Float(1.0),
    /// };
    /// bucket.add(obs.clone()).unwrap();
    /// bucket.add(obs).unwrap();
    ///
    /// let flushed = bucket.flush_all();
    /// assert_eq!(1, flushed.len());
    /// assert_eq!(":2", flushed[0].serialize_value());
    /// assert_eq!(1000, flushed[0].timestamp());
    /// ```
    pub fn add(&mut self, obs: Observation) -> Result<(), Error> {
        let start = match time::window_start(obs.timestamp, self.bin_width) {
            Some(start) => start,
            None => return Err(Error::TimestampOutOfRange(obs.timestamp)),
        };
        let key = BucketKey {
            kind: obs.kind,
            key: obs.key,
            unit: obs.unit,
            tags: serialize_tags(&obs.tags),
        };

        if let Some(metric) = self.bins.get_mut(&start).and_then(|bin| bin.get_mut(&key)) {
            let before = metric.weight();
            metric.add(obs.sample)?;
            self.weight += metric.weight() - before;
            return Ok(());
        }

        let metric = Metric::new(
            obs.kind,
            key.key.clone(),
            key.unit.clone(),
            obs.tags,
            start,
            obs.sample,
        )?;
        trace!(
            "new {} metric {} in window {}",
            metric.kind(),
            metric.key(),
            start
        );
        self.weight += metric.weight();
        self.bins
            .entry(start)
            .or_insert_with(BTreeMap::new)
            .insert(key, metric);
        Ok(())
    }

    /// Drain every window that has closed by `now`
    ///
    /// A window is closed once `start + bin_width <= now`. Metrics come out
    /// ordered by window, then by kind, key, unit and tags.
    pub fn flush(&mut self, now: i64) -> Vec<Metric> {
        let first_open = now.saturating_sub(self.bin_width).saturating_add(1);
        let open = self.bins.split_off(&first_open);
        let closed = mem::replace(&mut self.bins, open);
        self.drain(closed)
    }

    /// Drain every window regardless of whether it has closed.
    pub fn flush_all(&mut self) -> Vec<Metric> {
        let all = mem::replace(&mut self.bins, BTreeMap::new());
        self.drain(all)
    }

    fn drain(&mut self, bins: BTreeMap<i64, BTreeMap<BucketKey, Metric>>) -> Vec<Metric> {
        let mut flushed = Vec::new();
        for (start, bin) in bins {
            debug!("flushing {} metrics from window {}", bin.len(), start);
            for (_, metric) in bin {
                self.weight -= metric.weight();
                flushed.push(metric);
            }
        }
        flushed
    }

    /// The summed weight of every stored metric.
    pub fn weight(&self) -> usize {
        self.weight
    }

    /// The number of stored metrics, across all windows.
    pub fn len(&self) -> usize {
        self.bins.values().map(|bin| bin.len()).sum()
    }

    /// Whether no metrics are stored.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Iterate the stored metrics in flush order.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = &'a Metric> + 'a {
        self.bins.values().flat_map(|bin| bin.values())
    }
}

// Tests
//
#[cfg(test)]
mod test {
    use super::*;
    use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};
    use rand::Rng;

    impl Arbitrary for MetricKind {
        fn arbitrary<G: Gen>(g: &mut G) -> MetricKind {
            let i: usize = g.gen();
            match i % 4 {
                0 => MetricKind::Counter,
                1 => MetricKind::Gauge,
                2 => MetricKind::Distribution,
                _ => MetricKind::Set,
            }
        }
    }

    impl Arbitrary for Observation {
        fn arbitrary<G: Gen>(g: &mut G) -> Observation {
            let kind: MetricKind = Arbitrary::arbitrary(g);
            let key: String = g.gen_ascii_chars().take(2).collect();
            let mut tags = TagMap::default();
            if g.gen() {
                let val: String = g.gen_ascii_chars().take(1).collect();
                tags.insert("t", val);
            }
            let sample = match kind {
                MetricKind::Set => Sample::Integer(g.gen_range(0, 16)),
                _ => Sample::Float(g.gen_range(-100.0, 100.0)),
            };
            Observation {
                kind: kind,
                key: key,
                unit: Unit::none(),
                tags: tags,
                timestamp: g.gen_range(0, 100),
                sample: sample,
            }
        }
    }

    fn counter(key: &str, timestamp: i64, value: f64) -> Observation {
        Observation {
            kind: MetricKind::Counter,
            key: key.to_string(),
            unit: Unit::none(),
            tags: TagMap::default(),
            timestamp: timestamp,
            sample: Sample::Float(value),
        }
    }

    #[test]
    fn test_add_counter_metric() {
        let mut buckets = Buckets::default();
        buckets.add(counter("some.metric", 10, 1.0)).unwrap();
        assert_eq!(1, buckets.len());
        buckets.add(counter("some.metric", 11, 1.0)).unwrap();
        assert_eq!(1, buckets.len());
        assert_eq!(1, buckets.weight());

        let metrics = buckets.flush_all();
        assert_eq!(":2", metrics[0].serialize_value());
        assert!(buckets.is_empty());
        assert_eq!(0, buckets.weight());
    }

    #[test]
    fn test_add_gauge_metric_distinct_tags() {
        let mut buckets = Buckets::default();
        let mut m0 = counter("some.metric", 10, 1.0);
        m0.kind = MetricKind::Gauge;
        m0.tags.insert("foo", "bar");
        let mut m1 = m0.clone();
        m1.tags.insert("foo", "bingo");

        buckets.add(m0).unwrap();
        buckets.add(m1).unwrap();

        let metrics = buckets.flush_all();
        assert_eq!(2, metrics.len());
        assert_eq!("foo:bar", metrics[0].serialize_tags());
        assert_eq!("foo:bingo", metrics[1].serialize_tags());
    }

    #[test]
    fn test_same_key_different_kind_or_unit() {
        let mut buckets = Buckets::default();
        let c = counter("k", 0, 1.0);
        let mut d = c.clone();
        d.kind = MetricKind::Distribution;
        let mut u = c.clone();
        u.unit = Unit::Second;

        buckets.add(c).unwrap();
        buckets.add(d).unwrap();
        buckets.add(u).unwrap();
        assert_eq!(3, buckets.len());
    }

    #[test]
    fn test_windows_split_by_bin_width() {
        let mut buckets = Buckets::new(10);
        buckets.add(counter("k", 9, 1.0)).unwrap();
        buckets.add(counter("k", 10, 1.0)).unwrap();
        buckets.add(counter("k", 19, 1.0)).unwrap();

        let metrics = buckets.flush_all();
        assert_eq!(2, metrics.len());
        assert_eq!(0, metrics[0].timestamp());
        assert_eq!(":1", metrics[0].serialize_value());
        assert_eq!(10, metrics[1].timestamp());
        assert_eq!(":2", metrics[1].serialize_value());
    }

    #[test]
    fn test_flush_only_closed_windows() {
        let mut buckets = Buckets::new(10);
        buckets.add(counter("k", 5, 1.0)).unwrap();
        buckets.add(counter("k", 15, 1.0)).unwrap();

        assert!(buckets.flush(9).is_empty());
        let metrics = buckets.flush(10);
        assert_eq!(1, metrics.len());
        assert_eq!(0, metrics[0].timestamp());
        assert_eq!(1, buckets.len());
        assert_eq!(1, buckets.weight());

        let metrics = buckets.flush(20);
        assert_eq!(1, metrics.len());
        assert_eq!(10, metrics[0].timestamp());
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_rejected_add_leaves_storage_unchanged() {
        let mut buckets = Buckets::default();
        let mut first = counter("users", 0, 0.0);
        first.kind = MetricKind::Set;
        first.sample = Sample::Integer(1);
        let mut wrong = first.clone();
        wrong.sample = Sample::from("alice");

        buckets.add(first).unwrap();
        assert!(buckets.add(wrong).is_err());
        assert_eq!(1, buckets.len());
        assert_eq!(1, buckets.weight());

        let mut fresh = counter("users", 50, 0.0);
        fresh.kind = MetricKind::Set;
        fresh.sample = Sample::Float(1.0);
        assert!(buckets.add(fresh).is_err());
        assert_eq!(1, buckets.len());

        let metrics = buckets.flush_all();
        assert_eq!(":1", metrics[0].serialize_value());
    }

    #[test]
    fn test_timestamp_without_window_is_rejected() {
        let mut buckets = Buckets::new(10);
        buckets.add(counter("k", 0, 1.0)).unwrap();
        assert_eq!(
            Err(Error::TimestampOutOfRange(i64::min_value())),
            buckets.add(counter("k", i64::min_value(), 1.0))
        );
        assert_eq!(1, buckets.len());
        assert_eq!(1, buckets.weight());
    }

    #[test]
    fn test_flush_order_is_deterministic() {
        let mut buckets = Buckets::default();
        buckets.add(counter("b", 0, 1.0)).unwrap();
        buckets.add(counter("a", 0, 1.0)).unwrap();
        buckets.add(counter("c", 0, 1.0)).unwrap();
        let keys: Vec<String> = buckets.iter().map(|m| m.key().to_string()).collect();
        assert_eq!(vec!["a", "b", "c"], keys);
    }

    #[test]
    fn weight_matches_stored_metrics() {
        fn inner(bin_width: u8, ms: Vec<Observation>) -> TestResult {
            if bin_width == 0 {
                return TestResult::discard();
            }
            let mut buckets = Buckets::new(i64::from(bin_width));
            for m in ms {
                buckets.add(m).unwrap();
            }
            let summed: usize = buckets.iter().map(|m| m.weight()).sum();
            if summed != buckets.weight() {
                return TestResult::failed();
            }
            let len = buckets.len();
            let flushed = buckets.flush_all();
            TestResult::from_bool(
                flushed.len() == len && buckets.weight() == 0 && buckets.is_empty(),
            )
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(u8, Vec<Observation>) -> TestResult);
    }

    #[test]
    fn counters_sum_per_window() {
        fn inner(bin_width: u8, ms: Vec<Observation>) -> TestResult {
            if bin_width == 0 {
                return TestResult::discard();
            }
            let width = i64::from(bin_width);
            let counters: Vec<Observation> = ms.into_iter()
                .filter(|m| m.kind == MetricKind::Counter)
                .collect();
            let mut buckets = Buckets::new(width);
            for m in counters.clone() {
                buckets.add(m).unwrap();
            }
            for metric in buckets.iter() {
                let expected: f64 = counters
                    .iter()
                    .filter(|m| {
                        m.key == metric.key()
                            && time::window_start(m.timestamp, width) == Some(metric.timestamp())
                            && serialize_tags(&m.tags) == metric.serialize_tags()
                    })
                    .map(|m| match m.sample {
                        Sample::Float(v) => v,
                        _ => 0.0,
                    })
                    .sum();
                let mut single = Metric::new_counter("x", Unit::none(), TagMap::default(), 0, 0.0);
                single.add(expected).unwrap();
                // both paths sum in arrival order, so the rendering is identical
                if single.serialize_value() != metric.serialize_value() {
                    return TestResult::failed();
                }
            }
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(u8, Vec<Observation>) -> TestResult);
    }
}
