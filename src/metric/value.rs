//! Accumulator state for each metric kind and its wire rendering.

use crc32fast;
use metric::{Error, MetricKind};
use std::collections::BTreeSet;
use std::f64;
use std::fmt;

/// Gauges report a fixed five-number summary no matter how many points they
/// have absorbed.
pub const GAUGE_WEIGHT: usize = 5;

/// A single observation handed to a metric.
#[derive(Clone, Debug, PartialEq)]
pub enum Sample {
    /// A floating point observation, valid for counters, gauges and
    /// distributions.
    Float(f64),
    /// An integer observation. Widened to `f64` by the numeric kinds, kept
    /// as-is by integer sets.
    Integer(i64),
    /// A string observation, valid only for string sets.
    String(String),
}

impl Sample {
    /// The name of this sample's element kind, as reported in errors.
    pub fn kind_name(&self) -> &'static str {
        match *self {
            Sample::Float(_) => "float",
            Sample::Integer(_) => "integer",
            Sample::String(_) => "string",
        }
    }

    fn as_float(&self) -> Option<f64> {
        match *self {
            Sample::Float(v) => Some(v),
            Sample::Integer(v) => Some(v as f64),
            Sample::String(_) => None,
        }
    }
}

impl From<f64> for Sample {
    fn from(v: f64) -> Sample {
        Sample::Float(v)
    }
}

impl From<i64> for Sample {
    fn from(v: i64) -> Sample {
        Sample::Integer(v)
    }
}

impl From<String> for Sample {
    fn from(v: String) -> Sample {
        Sample::String(v)
    }
}

impl<'a> From<&'a str> for Sample {
    fn from(v: &'a str) -> Sample {
        Sample::String(v.to_string())
    }
}

impl From<SetMember> for Sample {
    fn from(m: SetMember) -> Sample {
        match m {
            SetMember::Integer(i) => Sample::Integer(i),
            SetMember::String(s) => Sample::String(s),
        }
    }
}

/// A member of a set metric. The first member a set receives fixes the kind
/// of every later member.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SetMember {
    /// An integer member, serialized as its decimal value.
    Integer(i64),
    /// A string member, serialized as the decimal CRC-32 of its bytes.
    String(String),
}

impl From<i64> for SetMember {
    fn from(v: i64) -> SetMember {
        SetMember::Integer(v)
    }
}

impl From<String> for SetMember {
    fn from(v: String) -> SetMember {
        SetMember::String(v)
    }
}

impl<'a> From<&'a str> for SetMember {
    fn from(v: &'a str) -> SetMember {
        SetMember::String(v.to_string())
    }
}

/// Hash a string set member
///
/// CRC-32/ISO-HDLC, the IEEE polynomial in its reflected form. Collectors
/// expect exactly this checksum.
pub fn hash_member(member: &str) -> u32 {
    crc32fast::hash(member.as_bytes())
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gauge {
    last: f64,
    min: f64,
    max: f64,
    sum: f64,
    count: f64,
}

impl Gauge {
    pub fn new(v: f64) -> Gauge {
        Gauge {
            last: v,
            min: v,
            max: v,
            sum: v,
            count: 1.0,
        }
    }

    // NaN propagates through min and max the same way it does through sum.
    fn add(&mut self, v: f64) {
        self.last = v;
        self.min = if self.min.is_nan() || v.is_nan() {
            f64::NAN
        } else {
            self.min.min(v)
        };
        self.max = if self.max.is_nan() || v.is_nan() {
            f64::NAN
        } else {
            self.max.max(v)
        };
        self.sum += v;
        self.count += 1.0;
    }
}

/// The mutable half of a metric. Sets are split by element kind so that
/// sorting, hashing and rendering never inspect member types at runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Counter(f64),
    Gauge(Gauge),
    Distribution(Vec<f64>),
    IntegerSet(BTreeSet<i64>),
    StringSet(BTreeSet<String>),
}

impl Value {
    pub fn new(kind: MetricKind, sample: Sample) -> Result<Value, Error> {
        let mismatch = Error::TypeMismatch {
            expected: kind.element_name(),
            found: sample.kind_name(),
        };
        match kind {
            MetricKind::Counter => sample.as_float().map(Value::Counter).ok_or(mismatch),
            MetricKind::Gauge => sample
                .as_float()
                .map(|v| Value::Gauge(Gauge::new(v)))
                .ok_or(mismatch),
            MetricKind::Distribution => sample
                .as_float()
                .map(|v| Value::Distribution(vec![v]))
                .ok_or(mismatch),
            MetricKind::Set => match sample {
                Sample::Integer(i) => Ok(Value::from(SetMember::Integer(i))),
                Sample::String(s) => Ok(Value::from(SetMember::String(s))),
                Sample::Float(_) => Err(mismatch),
            },
        }
    }

    pub fn kind(&self) -> MetricKind {
        match *self {
            Value::Counter(_) => MetricKind::Counter,
            Value::Gauge(_) => MetricKind::Gauge,
            Value::Distribution(_) => MetricKind::Distribution,
            Value::IntegerSet(_) | Value::StringSet(_) => MetricKind::Set,
        }
    }

    /// The element kind `add` accepts.
    pub fn element_name(&self) -> &'static str {
        match *self {
            Value::Counter(_) | Value::Gauge(_) | Value::Distribution(_) => "float",
            Value::IntegerSet(_) => "integer",
            Value::StringSet(_) => "string",
        }
    }

    /// Fold a sample into the accumulator. On error the state is untouched.
    pub fn add(&mut self, sample: Sample) -> Result<(), Error> {
        let mismatch = Error::TypeMismatch {
            expected: self.element_name(),
            found: sample.kind_name(),
        };
        match *self {
            Value::Counter(ref mut sum) => *sum += sample.as_float().ok_or(mismatch)?,
            Value::Gauge(ref mut gauge) => gauge.add(sample.as_float().ok_or(mismatch)?),
            Value::Distribution(ref mut values) => {
                values.push(sample.as_float().ok_or(mismatch)?)
            }
            Value::IntegerSet(ref mut members) => match sample {
                Sample::Integer(i) => {
                    members.insert(i);
                }
                _ => return Err(mismatch),
            },
            Value::StringSet(ref mut members) => match sample {
                Sample::String(s) => {
                    members.insert(s);
                }
                _ => return Err(mismatch),
            },
        }
        Ok(())
    }

    pub fn weight(&self) -> usize {
        match *self {
            Value::Counter(_) => 1,
            Value::Gauge(_) => GAUGE_WEIGHT,
            Value::Distribution(ref values) => values.len(),
            Value::IntegerSet(ref members) => members.len(),
            Value::StringSet(ref members) => members.len(),
        }
    }
}

impl From<SetMember> for Value {
    fn from(member: SetMember) -> Value {
        match member {
            SetMember::Integer(i) => {
                let mut members = BTreeSet::new();
                members.insert(i);
                Value::IntegerSet(members)
            }
            SetMember::String(s) => {
                let mut members = BTreeSet::new();
                members.insert(s);
                Value::StringSet(members)
            }
        }
    }
}

/// Write a float in its shortest round-trip form
///
/// Plain decimal notation is used for decimal exponents from -4 up to 20.
/// Outside that range the scientific form is shorter, so `1e300` is written
/// as `1e300` and `1e-7` as `1e-7`.
fn write_float(f: &mut fmt::Formatter, v: f64) -> fmt::Result {
    let sci = format!("{:e}", v);
    let exp = sci.find('e').and_then(|idx| sci[idx + 1..].parse::<i32>().ok());
    match exp {
        Some(exp) if v != 0.0 && (exp < -4 || exp >= 21) => f.write_str(&sci),
        _ => write!(f, "{}", v),
    }
}

// Every value is prefixed with ':', the leading one included. Set members
// come out of their BTreeSet already in natural order; string members are
// hashed only after that ordering.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Counter(sum) => {
                f.write_str(":")?;
                write_float(f, sum)
            }
            Value::Gauge(ref g) => {
                for v in &[g.last, g.min, g.max, g.sum, g.count] {
                    f.write_str(":")?;
                    write_float(f, *v)?;
                }
                Ok(())
            }
            Value::Distribution(ref values) => {
                for v in values {
                    f.write_str(":")?;
                    write_float(f, *v)?;
                }
                Ok(())
            }
            Value::IntegerSet(ref members) => {
                for m in members {
                    write!(f, ":{}", m)?;
                }
                Ok(())
            }
            Value::StringSet(ref members) => {
                for m in members {
                    write!(f, ":{}", hash_member(m))?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_check_value() {
        // the standard CRC-32/ISO-HDLC check input
        assert_eq!(0xCBF4_3926, hash_member("123456789"));
        assert_eq!(0, hash_member(""));
        assert_eq!(3_904_355_907, hash_member("a"));
        assert_eq!(1_908_338_681, hash_member("b"));
    }

    #[test]
    fn float_rendering_is_shortest() {
        assert_eq!(":1", Value::Counter(1.0).to_string());
        assert_eq!(":0.1", Value::Counter(0.1).to_string());
        assert_eq!(":-3.25", Value::Counter(-3.25).to_string());
        assert_eq!(":1000000", Value::Counter(1_000_000.0).to_string());
        assert_eq!(":0", Value::Counter(0.0).to_string());
        assert_eq!(":NaN", Value::Counter(f64::NAN).to_string());
        assert_eq!(":-inf", Value::Counter(f64::NEG_INFINITY).to_string());
    }

    #[test]
    fn float_rendering_switches_to_exponent() {
        assert_eq!(":1e300", Value::Counter(1e300).to_string());
        assert_eq!(":-2.5e-7", Value::Counter(-2.5e-7).to_string());
        assert_eq!(":1e-5", Value::Counter(1e-5).to_string());
        assert_eq!(":0.0001", Value::Counter(1e-4).to_string());
        assert_eq!(":100000000000000000000", Value::Counter(1e20).to_string());
        assert_eq!(":1e21", Value::Counter(1e21).to_string());
        let dist = Value::Distribution(vec![1e-7, 3.0, 6.02e23]);
        assert_eq!(":1e-7:3:6.02e23", dist.to_string());
    }

    #[test]
    fn gauge_nan_is_sticky() {
        let mut gauge = Value::new(MetricKind::Gauge, Sample::Float(1.0)).unwrap();
        gauge.add(Sample::Float(f64::NAN)).unwrap();
        gauge.add(Sample::Float(2.0)).unwrap();
        assert_eq!(":2:NaN:NaN:NaN:3", gauge.to_string());

        let first_nan = Value::new(MetricKind::Gauge, Sample::Float(f64::NAN)).unwrap();
        assert_eq!(":NaN:NaN:NaN:NaN:1", first_nan.to_string());
    }

    #[test]
    fn value_new_rejects_mismatch() {
        assert_eq!(
            Err(Error::TypeMismatch {
                expected: "integer or string",
                found: "float",
            }),
            Value::new(MetricKind::Set, Sample::Float(1.0))
        );
        assert_eq!(
            Err(Error::TypeMismatch {
                expected: "float",
                found: "string",
            }),
            Value::new(MetricKind::Counter, Sample::from("x"))
        );
    }

    #[test]
    fn integer_widens_for_numeric_kinds() {
        let mut v = Value::new(MetricKind::Counter, Sample::Integer(2)).unwrap();
        v.add(Sample::Float(0.5)).unwrap();
        assert_eq!(":2.5", v.to_string());
    }

    #[test]
    fn weights() {
        let counter = Value::new(MetricKind::Counter, Sample::Float(1.0)).unwrap();
        assert_eq!(1, counter.weight());
        let mut gauge = Value::new(MetricKind::Gauge, Sample::Float(1.0)).unwrap();
        gauge.add(Sample::Float(2.0)).unwrap();
        assert_eq!(GAUGE_WEIGHT, gauge.weight());
        let mut dist = Value::new(MetricKind::Distribution, Sample::Float(1.0)).unwrap();
        dist.add(Sample::Float(1.0)).unwrap();
        dist.add(Sample::Float(1.0)).unwrap();
        assert_eq!(3, dist.weight());
        let mut set = Value::new(MetricKind::Set, Sample::Integer(1)).unwrap();
        set.add(Sample::Integer(1)).unwrap();
        set.add(Sample::Integer(2)).unwrap();
        assert_eq!(2, set.weight());
    }
}
