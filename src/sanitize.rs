//! Character-set enforcement for metric keys, tag values and custom units.
//!
//! Each sanitizer rewrites its input so that only characters allowed on the
//! wire remain. The patterns are compiled once per process and shared
//! read-only. All three sanitizers are idempotent.

use regex::Regex;
use std::borrow::Cow;

lazy_static! {
    static ref KEY_DISALLOWED: Regex = Regex::new(r"[^a-zA-Z0-9_/.\-]+").unwrap();
    static ref VALUE_DISALLOWED: Regex =
        Regex::new(r"[^\w\d\s_:/@.{}\[\]$\-]+").unwrap();
    static ref UNIT_DISALLOWED: Regex = Regex::new(r"[^a-z]+").unwrap();
}

/// Sanitize a metric or tag key
///
/// Every maximal run of characters outside `[A-Za-z0-9_/.-]` is replaced by a
/// single underscore.
///
/// # Examples
///
/// ```
/// use metricline::sanitize::sanitize_key;
///
/// assert_eq!(sanitize_key("api.requests"), "api.requests");
/// assert_eq!(sanitize_key("a b  c"), "a_b_c");
/// assert_eq!(sanitize_key("héllo"), "h_llo");
/// ```
pub fn sanitize_key(s: &str) -> Cow<str> {
    KEY_DISALLOWED.replace_all(s, "_")
}

/// Sanitize a tag value
///
/// Word characters (Unicode-aware), digits, whitespace and `_:/@.{}[]$-` are
/// kept. Every maximal run of anything else is replaced by a single
/// underscore.
///
/// # Examples
///
/// ```
/// use metricline::sanitize::sanitize_value;
///
/// assert_eq!(sanitize_value("hello world"), "hello world");
/// assert_eq!(sanitize_value("a|,|b"), "a_b");
/// assert_eq!(sanitize_value("föö@{1.0}"), "föö@{1.0}");
/// ```
pub fn sanitize_value(s: &str) -> Cow<str> {
    VALUE_DISALLOWED.replace_all(s, "_")
}

/// Sanitize a custom unit name
///
/// Every character outside `[a-z]` is removed. Case is not folded.
pub fn sanitize_unit(s: &str) -> Cow<str> {
    UNIT_DISALLOWED.replace_all(s, "")
}
