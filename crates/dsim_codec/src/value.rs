//! Dynamic property value type.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A point in time with nanosecond resolution, relative to the Unix epoch.
///
/// `nanos` is always normalized to `0..1_000_000_000`, so the derived
/// ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Whole seconds since the Unix epoch (may be negative).
    pub seconds: i64,
    /// Sub-second nanoseconds.
    pub nanos: u32,
}

impl Timestamp {
    const NANOS_PER_SEC: i64 = 1_000_000_000;

    /// Creates a timestamp, normalizing an out-of-range `nanos`.
    #[must_use]
    pub fn new(seconds: i64, nanos: i64) -> Self {
        let seconds = seconds + nanos.div_euclid(Self::NANOS_PER_SEC);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let nanos = nanos.rem_euclid(Self::NANOS_PER_SEC) as u32;
        Self { seconds, nanos }
    }

    /// The current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub fn from_unix_millis(millis: i64) -> Self {
        Self::new(millis.div_euclid(1_000), millis.rem_euclid(1_000) * 1_000_000)
    }

    /// Milliseconds since the Unix epoch (sub-millisecond part truncated).
    #[must_use]
    pub fn unix_millis(&self) -> i64 {
        self.seconds * 1_000 + i64::from(self.nanos / 1_000_000)
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        #[allow(clippy::cast_possible_wrap)]
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs() as i64, i64::from(d.subsec_nanos())),
            Err(e) => {
                let d = e.duration();
                Self::new(-(d.as_secs() as i64), -i64::from(d.subsec_nanos()))
            }
        }
    }
}

impl From<Timestamp> for SystemTime {
    #[allow(clippy::cast_sign_loss)]
    fn from(ts: Timestamp) -> Self {
        if ts.seconds >= 0 {
            UNIX_EPOCH + Duration::new(ts.seconds as u64, ts.nanos)
        } else {
            UNIX_EPOCH - Duration::from_secs(ts.seconds.unsigned_abs())
                + Duration::from_nanos(u64::from(ts.nanos))
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}s", self.seconds, self.nanos)
    }
}

/// A dynamic property value.
///
/// Values are plain owned data: cloning a value produces a fully
/// independent copy, nested arrays and maps included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// Double precision float.
    Double(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Date and time.
    Timestamp(Timestamp),
    /// Array of values.
    Array(Vec<Value>),
    /// Embedded entity: property name to value.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a map value from name/value pairs.
    pub fn map<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Short type name, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a double. Integers are widened.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as a timestamp, if it is one.
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as a map, if it is one.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a key in this map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Equality as used by query filters.
    ///
    /// Integers and doubles compare numerically; every other pair falls
    /// back to structural equality.
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(_), Value::Double(_)) | (Value::Double(_), Value::Integer(_)) => {
                self.as_double() == other.as_double()
            }
            _ => self == other,
        }
    }

    /// Ordering as used by range filters.
    ///
    /// Returns `None` when the two values are not of a comparable family
    /// (numbers, text, bytes, booleans, timestamps).
    pub fn loose_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(_) | Value::Double(_), Value::Integer(_) | Value::Double(_)) => {
                self.as_double()?.partial_cmp(&other.as_double()?)
            }
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<SystemTime> for Value {
    fn from(time: SystemTime) -> Self {
        Value::Timestamp(time.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_normalizes_nanos() {
        let ts = Timestamp::new(10, 1_500_000_000);
        assert_eq!(ts, Timestamp { seconds: 11, nanos: 500_000_000 });

        let neg = Timestamp::new(0, -1);
        assert_eq!(neg, Timestamp { seconds: -1, nanos: 999_999_999 });
    }

    #[test]
    fn timestamp_millis_roundtrip() {
        // 2023-02-02T03:04:05.006Z
        let ts = Timestamp::from_unix_millis(1_675_307_045_006);
        assert_eq!(ts.seconds, 1_675_307_045);
        assert_eq!(ts.nanos, 6_000_000);
        assert_eq!(ts.unix_millis(), 1_675_307_045_006);
    }

    #[test]
    fn timestamp_system_time_conversion() {
        let ts = Timestamp::new(1_700_000_000, 123);
        let time: SystemTime = ts.into();
        assert_eq!(Timestamp::from(time), ts);
    }

    #[test]
    fn clone_is_deep() {
        let original = Value::map([("tags", Value::from(vec!["a", "b"]))]);
        let mut copy = original.clone();
        if let Value::Map(m) = &mut copy {
            m.insert("tags".into(), Value::Null);
        }
        assert_eq!(original.get("tags"), Some(&Value::from(vec!["a", "b"])));
    }

    #[test]
    fn value_accessors() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());

        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Integer(42).as_bool(), None);

        assert_eq!(Value::Integer(42).as_integer(), Some(42));
        assert_eq!(Value::Text("42".to_string()).as_integer(), None);
        assert_eq!(Value::Integer(2).as_double(), Some(2.0));

        assert_eq!(Value::Text("hello".to_string()).as_text(), Some("hello"));
        assert_eq!(Value::Bytes(vec![1, 2, 3]).as_bytes(), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn loose_eq_is_numeric_across_integer_and_double() {
        assert!(Value::Integer(3).loose_eq(&Value::Double(3.0)));
        assert!(!Value::Integer(3).loose_eq(&Value::Double(3.5)));
        assert!(!Value::Integer(3).loose_eq(&Value::Text("3".into())));
        assert!(Value::from("bar").loose_eq(&Value::from("bar")));
    }

    #[test]
    fn loose_cmp_families() {
        assert_eq!(
            Value::Integer(1).loose_cmp(&Value::Double(1.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::from("b").loose_cmp(&Value::from("a")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::from("1").loose_cmp(&Value::Integer(1)), None);
        assert_eq!(Value::Null.loose_cmp(&Value::Null), None);
    }

    #[test]
    fn serde_json_shape() {
        let value = Value::map([("n", Value::Integer(1))]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"Map":{"n":{"Integer":1}}}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i64), Value::Integer(42));
        assert_eq!(Value::from(42i32), Value::Integer(42));
        assert_eq!(Value::from(1.5f64), Value::Double(1.5));
        assert_eq!(Value::from("hello"), Value::Text("hello".to_string()));
        assert_eq!(Value::from(vec![1u8, 2, 3]), Value::Bytes(vec![1, 2, 3]));
        assert_eq!(Value::from(()), Value::Null);
    }
}
