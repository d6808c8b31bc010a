//! The statsd-derived metrics line format.
//!
//! A line reads
//!
//! ```text
//! <key>@<unit>:<value>[:<value>...]|<type>[|#<tag>:<value>,...][|T<timestamp>]
//! ```
//!
//! `encode` writes one line per flushed `Metric`. `parse_statsd` reads lines
//! of the same shape back into `Observation`s so that they can be
//! re-aggregated.

use buckets::Observation;
use metric::{Metric, MetricKind, Sample, TagMap};
use sanitize::sanitize_key;
use std::str::FromStr;
use time;
use unit::Unit;

/// Encode a metric as a single line, without trailing newline
///
/// The key is sanitized here. The tag section is left out when the metric has
/// no tags.
///
/// # Examples
///
/// ```
/// use metricline::metric::{Metric, TagMap};
/// use metricline::protocols::statsd::encode;
/// use metricline::unit::Unit;
///
/// let mut tags = TagMap::default();
/// tags.insert("env", "prod");
/// let mut m = Metric::new_distribution("page load", Unit::Millisecond, tags, 1700000000, 1.5);
/// m.add(2.0).unwrap();
///
/// assert_eq!("page_load@millisecond:1.5:2|d|#env:prod|T1700000000", encode(&m));
/// ```
pub fn encode(metric: &Metric) -> String {
    let mut line = String::with_capacity(64);
    line.push_str(&sanitize_key(metric.key()));
    line.push('@');
    line.push_str(metric.unit_name());
    line.push_str(&metric.serialize_value());
    line.push('|');
    line.push_str(metric.kind_str());
    let tags = metric.serialize_tags();
    if !tags.is_empty() {
        line.push_str("|#");
        line.push_str(&tags);
    }
    line.push_str("|T");
    line.push_str(&metric.timestamp().to_string());
    line
}

/// Encode many metrics, one line each, separated by newlines.
pub fn encode_all(metrics: &[Metric]) -> String {
    metrics.iter().map(encode).collect::<Vec<String>>().join("\n")
}

/// Parse a single line into observations
///
/// Valid lines are:
///
/// - `<str:key>:<value>|<type>`
/// - `<str:key>@<str:unit>:<value>[:<value>...]|<type>`
///
/// optionally followed, in any order, by `|#<tags>`, `|T<i64:timestamp>` and,
/// for counters, a sample rate `|@<f64:rate>`. Every value produces one
/// observation. Counter, gauge and distribution values must parse as `f64`.
/// Set values that parse as `i64` are integer members, all others string
/// members. Observations without a timestamp are stamped with `now`, those
/// without a unit get `Unit::none()`. A timestamp outside the range
/// `time::is_representable` accepts makes the line malformed.
///
/// Returns false, pushing nothing, if the line is malformed.
pub fn parse_statsd(source: &str, now: i64, res: &mut Vec<Observation>) -> bool {
    let src = source.trim_end_matches(|c| c == '\n' || c == '\r');
    let mut segments = src.split('|');

    let head = match segments.next() {
        Some(head) => head,
        None => return false,
    };
    let kind = match segments.next().map(MetricKind::from_str) {
        Some(Ok(kind)) => kind,
        _ => return false,
    };

    let mut tags = TagMap::default();
    let mut timestamp = now;
    let mut rate = 1.0;
    for segment in segments {
        if segment.starts_with('#') {
            for pair in segment[1..].split(',').filter(|p| !p.is_empty()) {
                match pair.find(':') {
                    Some(idx) => tags.insert(&pair[..idx], &pair[idx + 1..]),
                    None => tags.insert(pair, ""),
                };
            }
        } else if segment.starts_with('T') {
            timestamp = match i64::from_str(&segment[1..]) {
                Ok(ts) if time::is_representable(ts) => ts,
                _ => return false,
            };
        } else if segment.starts_with('@') {
            rate = match f64::from_str(&segment[1..]) {
                Ok(r) if r > 0.0 && r <= 1.0 => r,
                _ => return false,
            };
        } else {
            return false;
        }
    }

    let colon_idx = match head.find(':') {
        Some(idx) => idx,
        None => return false,
    };
    let (name, unit) = match head[..colon_idx].find('@') {
        Some(at_idx) => (
            &head[..at_idx],
            Unit::from_str(&head[at_idx + 1..colon_idx]).unwrap_or_default(),
        ),
        None => (&head[..colon_idx], Unit::none()),
    };
    if name.is_empty() {
        return false;
    }

    let mut samples = Vec::new();
    for val in head[colon_idx + 1..].split(':') {
        if val.is_empty() {
            return false;
        }
        let sample = match kind {
            MetricKind::Set => match i64::from_str(val) {
                Ok(i) => Sample::Integer(i),
                Err(_) => Sample::String(val.to_string()),
            },
            MetricKind::Counter => match f64::from_str(val) {
                Ok(f) => Sample::Float(f * (1.0 / rate)),
                Err(_) => return false,
            },
            MetricKind::Gauge | MetricKind::Distribution => match f64::from_str(val) {
                Ok(f) => Sample::Float(f),
                Err(_) => return false,
            },
        };
        samples.push(sample);
    }

    trace!("parsed {} {} samples for {}", samples.len(), kind, name);
    for sample in samples {
        res.push(Observation {
            kind: kind,
            key: name.to_string(),
            unit: unit.clone(),
            tags: tags.clone(),
            timestamp: timestamp,
            sample: sample,
        });
    }
    true
}
