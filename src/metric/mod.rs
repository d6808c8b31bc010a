//! The metric accumulators.
//!
//! A `Metric` pairs an immutable identity -- key, unit, tags and timestamp --
//! with the accumulated state of one of four kinds: counter, gauge,
//! distribution or set. A metric is always built from its first observation,
//! is folded into by `Metric::add` and is read out through the
//! `serialize_*` family when its time window is flushed.

mod tagmap;
mod value;

pub use self::tagmap::{serialize as serialize_tags, TagMap};
pub use self::value::{hash_member, Sample, SetMember, GAUGE_WEIGHT};

use self::value::{Gauge, Value};
use std::error;
use std::fmt;
use std::str::FromStr;
use unit::Unit;

/// The kind of aggregation a metric performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    /// A running sum.
    Counter,
    /// Last, min, max, sum and count of the observed values.
    Gauge,
    /// Every observed value, in order of arrival.
    Distribution,
    /// The distinct observed members.
    Set,
}

impl MetricKind {
    /// The single-letter wire code of this kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use metricline::metric::MetricKind;
    ///
    /// assert_eq!("c", MetricKind::Counter.as_str());
    /// assert_eq!("s", MetricKind::Set.as_str());
    /// ```
    pub fn as_str(&self) -> &'static str {
        match *self {
            MetricKind::Counter => "c",
            MetricKind::Gauge => "g",
            MetricKind::Distribution => "d",
            MetricKind::Set => "s",
        }
    }

    fn element_name(&self) -> &'static str {
        match *self {
            MetricKind::Counter | MetricKind::Gauge | MetricKind::Distribution => "float",
            MetricKind::Set => "integer or string",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<MetricKind, Error> {
        match s {
            "c" => Ok(MetricKind::Counter),
            "g" => Ok(MetricKind::Gauge),
            "d" => Ok(MetricKind::Distribution),
            "s" => Ok(MetricKind::Set),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

/// Errors raised while building or folding into a metric.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A sample's element kind does not match what the metric accepts. Sets
    /// never coerce between integer and string members.
    TypeMismatch {
        /// The element kind the metric accepts.
        expected: &'static str,
        /// The element kind of the rejected sample.
        found: &'static str,
    },
    /// A metric kind code other than `c`, `g`, `d` or `s`.
    UnknownKind(String),
    /// A timestamp that falls into no aggregation window.
    TimestampOutOfRange(i64),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            Error::UnknownKind(ref code) => write!(f, "unknown metric kind '{}'", code),
            Error::TimestampOutOfRange(ts) => write!(f, "timestamp {} is out of range", ts),
        }
    }
}

impl error::Error for Error {}

/// A single metric accumulator.
///
/// The identity of a metric is fixed at construction. Only the accumulated
/// value changes, and only through `add`. A metric is not synchronized: the
/// owner is expected to serialize access to it.
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    key: String,
    unit: Unit,
    tags: TagMap,
    timestamp: i64,
    value: Value,
}

impl Metric {
    /// Make a metric of the given kind from its first sample
    ///
    /// This is the factory the aggregator uses when it sees an identity for
    /// the first time. It fails if `sample` is not valid for `kind`: counters,
    /// gauges and distributions take floats or integers, sets take integers or
    /// strings.
    ///
    /// # Examples
    ///
    /// ```
    /// use metricline::metric::{Metric, MetricKind, Sample, TagMap};
    /// use metricline::unit::Unit;
    ///
    /// let m = Metric::new(MetricKind::Set, "users", Unit::none(), TagMap::default(),
    ///                     10, Sample::from("alice")).unwrap();
    /// assert_eq!("s", m.kind_str());
    ///
    /// assert!(Metric::new(MetricKind::Set, "users", Unit::none(), TagMap::default(),
    ///                     10, Sample::Float(1.5)).is_err());
    /// ```
    pub fn new<S>(
        kind: MetricKind,
        key: S,
        unit: Unit,
        tags: TagMap,
        timestamp: i64,
        sample: Sample,
    ) -> Result<Metric, Error>
    where
        S: Into<String>,
    {
        let value = Value::new(kind, sample)?;
        Ok(Metric::with_value(key.into(), unit, tags, timestamp, value))
    }

    /// Make a counter from its first value.
    ///
    /// # Examples
    ///
    /// ```
    /// use metricline::metric::{Metric, TagMap};
    /// use metricline::unit::Unit;
    ///
    /// let mut m = Metric::new_counter("hits", Unit::none(), TagMap::default(), 0, 2.0);
    /// m.add(3.0).unwrap();
    /// m.add(-1.5).unwrap();
    /// assert_eq!(":3.5", m.serialize_value());
    /// ```
    pub fn new_counter<S>(key: S, unit: Unit, tags: TagMap, timestamp: i64, value: f64) -> Metric
    where
        S: Into<String>,
    {
        Metric::with_value(key.into(), unit, tags, timestamp, Value::Counter(value))
    }

    /// Make a gauge from its first value. Last, min, max and sum all start at
    /// `value` and the count starts at one.
    pub fn new_gauge<S>(key: S, unit: Unit, tags: TagMap, timestamp: i64, value: f64) -> Metric
    where
        S: Into<String>,
    {
        Metric::with_value(key.into(), unit, tags, timestamp, Value::Gauge(Gauge::new(value)))
    }

    /// Make a distribution from its first value.
    pub fn new_distribution<S>(
        key: S,
        unit: Unit,
        tags: TagMap,
        timestamp: i64,
        value: f64,
    ) -> Metric
    where
        S: Into<String>,
    {
        Metric::with_value(key.into(), unit, tags, timestamp, Value::Distribution(vec![value]))
    }

    /// Make a set from its first member
    ///
    /// The kind of `member` -- integer or string -- is the kind every later
    /// member must have.
    pub fn new_set<S, M>(key: S, unit: Unit, tags: TagMap, timestamp: i64, member: M) -> Metric
    where
        S: Into<String>,
        M: Into<SetMember>,
    {
        Metric::with_value(key.into(), unit, tags, timestamp, Value::from(member.into()))
    }

    fn with_value(key: String, unit: Unit, tags: TagMap, timestamp: i64, value: Value) -> Metric {
        Metric {
            key: key,
            unit: unit,
            tags: tags,
            timestamp: timestamp,
            value: value,
        }
    }

    /// Fold a sample into this metric
    ///
    /// Counters add, gauges update their summary, distributions append and
    /// sets insert. A sample of the wrong element kind is rejected with
    /// `Error::TypeMismatch` and leaves the metric untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use metricline::metric::{Metric, TagMap};
    /// use metricline::unit::Unit;
    ///
    /// let mut m = Metric::new_set("ids", Unit::none(), TagMap::default(), 0, 5i64);
    /// m.add(3i64).unwrap();
    /// m.add(5i64).unwrap();
    /// assert!(m.add("five").is_err());
    /// assert_eq!(":3:5", m.serialize_value());
    /// ```
    pub fn add<T>(&mut self, sample: T) -> Result<(), Error>
    where
        T: Into<Sample>,
    {
        self.value.add(sample.into())
    }

    /// The kind of this metric.
    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }

    /// The wire code of this metric's kind: one of `c`, `g`, `d` or `s`.
    pub fn kind_str(&self) -> &'static str {
        self.kind().as_str()
    }

    /// The raw, unsanitized key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The unit of this metric.
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// The canonical name of this metric's unit.
    pub fn unit_name(&self) -> &str {
        self.unit.as_str()
    }

    /// Seconds since the Unix epoch, fixed at construction.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// The raw, unsanitized tags.
    pub fn tags(&self) -> &TagMap {
        &self.tags
    }

    /// The wire form of this metric's tags. See `serialize_tags`.
    pub fn serialize_tags(&self) -> String {
        serialize_tags(&self.tags)
    }

    /// The wire form of this metric's accumulated value
    ///
    /// Every value is prefixed by `:`, the first included:
    ///
    ///  * counter: `:<sum>`
    ///  * gauge: `:<last>:<min>:<max>:<sum>:<count>`
    ///  * distribution: `:<v1>:<v2>...` in arrival order
    ///  * set: `:<m1>:<m2>...` in ascending member order, string members
    ///    replaced by their CRC-32
    pub fn serialize_value(&self) -> String {
        self.value.to_string()
    }

    /// The cost of this metric toward an aggregator's flush budget: one for
    /// counters, `GAUGE_WEIGHT` for gauges, the number of values for
    /// distributions and the number of members for sets.
    pub fn weight(&self) -> usize {
        self.value.weight()
    }
}
