//! The semantic unit attached to every metric.
//!
//! A unit is either one of the fixed built-in names -- durations, information
//! sizes and fractions -- or a custom, free-form name. Custom names are
//! normalized on construction to lowercase ASCII letters only.

use sanitize::sanitize_unit;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// The unit of a metric's values.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Unit {
    /// 10^-9 seconds
    Nanosecond,
    /// 10^-6 seconds
    Microsecond,
    /// 10^-3 seconds
    Millisecond,
    /// One second
    Second,
    /// 60 seconds
    Minute,
    /// 3,600 seconds
    Hour,
    /// 86,400 seconds
    Day,
    /// 604,800 seconds
    Week,
    /// A single bit
    Bit,
    /// Eight bits
    Byte,
    /// 1,000 bytes
    Kilobyte,
    /// 1,024 bytes
    Kibibyte,
    /// 1,000^2 bytes
    Megabyte,
    /// 1,024^2 bytes
    Mebibyte,
    /// 1,000^3 bytes
    Gigabyte,
    /// 1,024^3 bytes
    Gibibyte,
    /// 1,000^4 bytes
    Terabyte,
    /// 1,024^4 bytes
    Tebibyte,
    /// 1,000^5 bytes
    Petabyte,
    /// 1,024^5 bytes
    Pebibyte,
    /// 1,000^6 bytes
    Exabyte,
    /// 1,024^6 bytes
    Exbibyte,
    /// A fraction, usually between 0 and 1
    Ratio,
    /// A ratio expressed out of 100
    Percent,
    /// Any other unit. Build it through `Unit::custom` or `str::parse`.
    Custom(CustomUnit),
}

/// The normalized name of a custom unit
///
/// The name holds only `[a-z]` characters and may be empty. It can only be
/// made by `Unit::custom`, so a custom unit never carries wire delimiters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomUnit(String);

impl CustomUnit {
    /// The normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const BUILTIN: [Unit; 24] = [
    Unit::Nanosecond,
    Unit::Microsecond,
    Unit::Millisecond,
    Unit::Second,
    Unit::Minute,
    Unit::Hour,
    Unit::Day,
    Unit::Week,
    Unit::Bit,
    Unit::Byte,
    Unit::Kilobyte,
    Unit::Kibibyte,
    Unit::Megabyte,
    Unit::Mebibyte,
    Unit::Gigabyte,
    Unit::Gibibyte,
    Unit::Terabyte,
    Unit::Tebibyte,
    Unit::Petabyte,
    Unit::Pebibyte,
    Unit::Exabyte,
    Unit::Exbibyte,
    Unit::Ratio,
    Unit::Percent,
];

impl Unit {
    /// Make a custom unit
    ///
    /// Every character outside of `[a-z]` is stripped from `name`. Case is
    /// not folded, upper-case letters are dropped like any other disallowed
    /// character. A name that strips down to nothing yields an empty unit.
    ///
    /// # Examples
    ///
    /// ```
    /// use metricline::unit::Unit;
    ///
    /// assert_eq!(Unit::custom("requests/sec").as_str(), "requestssec");
    /// assert_eq!(Unit::custom("Apples").as_str(), "pples");
    /// assert_eq!(Unit::custom("42").as_str(), "");
    /// ```
    pub fn custom<S>(name: S) -> Unit
    where
        S: AsRef<str>,
    {
        Unit::Custom(CustomUnit(sanitize_unit(name.as_ref()).into_owned()))
    }

    /// The conventional unit for values that carry no unit at all.
    pub fn none() -> Unit {
        Unit::Custom(CustomUnit(String::from("none")))
    }

    /// The canonical lowercase name of this unit.
    pub fn as_str(&self) -> &str {
        match *self {
            Unit::Nanosecond => "nanosecond",
            Unit::Microsecond => "microsecond",
            Unit::Millisecond => "millisecond",
            Unit::Second => "second",
            Unit::Minute => "minute",
            Unit::Hour => "hour",
            Unit::Day => "day",
            Unit::Week => "week",
            Unit::Bit => "bit",
            Unit::Byte => "byte",
            Unit::Kilobyte => "kilobyte",
            Unit::Kibibyte => "kibibyte",
            Unit::Megabyte => "megabyte",
            Unit::Mebibyte => "mebibyte",
            Unit::Gigabyte => "gigabyte",
            Unit::Gibibyte => "gibibyte",
            Unit::Terabyte => "terabyte",
            Unit::Tebibyte => "tebibyte",
            Unit::Petabyte => "petabyte",
            Unit::Pebibyte => "pebibyte",
            Unit::Exabyte => "exabyte",
            Unit::Exbibyte => "exbibyte",
            Unit::Ratio => "ratio",
            Unit::Percent => "percent",
            Unit::Custom(ref name) => name.as_str(),
        }
    }

    /// Whether this is one of the fixed, built-in units.
    pub fn is_builtin(&self) -> bool {
        match *self {
            Unit::Custom(_) => false,
            _ => true,
        }
    }
}

impl Default for Unit {
    fn default() -> Unit {
        Unit::none()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = Infallible;

    /// Resolve a unit name
    ///
    /// Built-in names map onto their variant, everything else becomes a
    /// normalized custom unit. This never fails.
    fn from_str(s: &str) -> Result<Unit, Infallible> {
        for unit in BUILTIN.iter() {
            if unit.as_str() == s {
                return Ok(unit.clone());
            }
        }
        Ok(Unit::custom(s))
    }
}
