//! metricline is the aggregation core of a statsd-style metrics pipeline. It
//! accepts individual observations -- counts, gauges, distributions and set
//! members -- tagged with a key, a unit and a tag map, folds them into one
//! accumulator per distinct identity and renders each accumulator into the
//! canonical line format a collector expects:
//!
//! ```text
//! <key>@<unit>:<value>[:<value>...]|<type>[|#<tag>:<value>,...]|T<timestamp>
//! ```
//!
//! The crate is organized leaves first: `unit` and `sanitize` are pure
//! helpers, `metric` holds the accumulators themselves, `buckets` groups
//! them by time window and `protocols::statsd` reads and writes the wire
//! format.
#![allow(unknown_lints)]
#![deny(trivial_numeric_casts, missing_docs, unstable_features, unused_import_braces)]
extern crate chrono;
extern crate clap;
extern crate crc32fast;
extern crate regex;
extern crate serde;
extern crate toml;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
extern crate rand;

pub mod buckets;
pub mod config;
pub mod metric;
pub mod protocols;
pub mod sanitize;
pub mod time;
pub mod unit;
