use bytes::Bytes;
use ordered_float::OrderedFloat;
use std::sync::Arc;

/// Dynamically typed value, the "natural" decoded form of every wire type.
///
/// This is what untyped frame accessors and natural column iteration yield,
/// and the element type of heterogeneous write-side sequences. A category
/// column's natural value is its integer code, not the label; timestamps
/// are always UTC instants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatherValue {
    Bool(bool),

    // Numeric types
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),

    // Variable-length types
    String(Arc<str>),
    Bytes(Bytes),

    // Temporal types
    Timestamp(jiff::Timestamp),
    Date(jiff::civil::Date),
    /// Duration since midnight
    Time(jiff::SignedDuration),

    /// Write-side boxed form of an enum element: the member's label.
    /// Never produced by the reader; sequences of these (from any mix of
    /// enum types) unify into a category column.
    Enum(Arc<str>),

    // Null value
    Null,
}

impl std::hash::Hash for FeatherValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            FeatherValue::Bool(b) => b.hash(state),
            FeatherValue::Int8(i) => i.hash(state),
            FeatherValue::Int16(i) => i.hash(state),
            FeatherValue::Int32(i) => i.hash(state),
            FeatherValue::Int64(i) => i.hash(state),
            FeatherValue::UInt8(i) => i.hash(state),
            FeatherValue::UInt16(i) => i.hash(state),
            FeatherValue::UInt32(i) => i.hash(state),
            FeatherValue::UInt64(i) => i.hash(state),
            FeatherValue::Float(f) => f.hash(state),
            FeatherValue::Double(f) => f.hash(state),
            FeatherValue::String(s) => s.hash(state),
            FeatherValue::Bytes(b) => b.hash(state),
            FeatherValue::Timestamp(ts) => ts.as_nanosecond().hash(state),
            FeatherValue::Date(d) => (d.year(), d.month(), d.day()).hash(state),
            FeatherValue::Time(t) => t.as_nanos().hash(state),
            FeatherValue::Enum(label) => label.hash(state),
            FeatherValue::Null => 0_i32.hash(state),
        }
    }
}

impl FeatherValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FeatherValue::Null)
    }

    /// Get the type name of the value
    pub fn type_name(&self) -> &'static str {
        match self {
            FeatherValue::Bool(_) => "Bool",
            FeatherValue::Int8(_) => "Int8",
            FeatherValue::Int16(_) => "Int16",
            FeatherValue::Int32(_) => "Int32",
            FeatherValue::Int64(_) => "Int64",
            FeatherValue::UInt8(_) => "UInt8",
            FeatherValue::UInt16(_) => "UInt16",
            FeatherValue::UInt32(_) => "UInt32",
            FeatherValue::UInt64(_) => "UInt64",
            FeatherValue::Float(_) => "Float",
            FeatherValue::Double(_) => "Double",
            FeatherValue::String(_) => "String",
            FeatherValue::Bytes(_) => "Bytes",
            FeatherValue::Timestamp(_) => "Timestamp",
            FeatherValue::Date(_) => "Date",
            FeatherValue::Time(_) => "Time",
            FeatherValue::Enum(_) => "Enum",
            FeatherValue::Null => "Null",
        }
    }
}

macro_rules! impl_value_from {
    ($($from:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$from> for FeatherValue {
                fn from(v: $from) -> Self {
                    FeatherValue::$variant(v)
                }
            }
        )*
    };
}

impl_value_from!(
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    Bytes => Bytes,
    jiff::Timestamp => Timestamp,
    jiff::civil::Date => Date,
    jiff::SignedDuration => Time,
);

impl From<f32> for FeatherValue {
    fn from(v: f32) -> Self {
        FeatherValue::Float(OrderedFloat(v))
    }
}

impl From<f64> for FeatherValue {
    fn from(v: f64) -> Self {
        FeatherValue::Double(OrderedFloat(v))
    }
}

impl From<&str> for FeatherValue {
    fn from(v: &str) -> Self {
        FeatherValue::String(Arc::from(v))
    }
}

impl From<String> for FeatherValue {
    fn from(v: String) -> Self {
        FeatherValue::String(Arc::from(v.as_str()))
    }
}

impl<T> From<Option<T>> for FeatherValue
where
    T: Into<FeatherValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => FeatherValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_creation() {
        let v = FeatherValue::Int32(42);
        assert_eq!(v, FeatherValue::Int32(42));
        assert!(!v.is_null());
        assert_eq!(v.type_name(), "Int32");
    }

    #[test]
    fn test_null_value() {
        let v = FeatherValue::Null;
        assert!(v.is_null());
        assert_eq!(v.type_name(), "Null");
        assert_eq!(FeatherValue::from(None::<i32>), FeatherValue::Null);
    }

    #[test]
    fn test_float_equality() {
        let v1 = FeatherValue::from(3.5_f32);
        let v2 = FeatherValue::Float(OrderedFloat(3.5));
        assert_eq!(v1, v2);
    }

    #[test]
    fn test_hash_consistency() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(FeatherValue::Int32(42));
        set.insert(FeatherValue::from("hello"));

        assert!(set.contains(&FeatherValue::Int32(42)));
        assert!(set.contains(&FeatherValue::String(Arc::from("hello"))));
        assert!(!set.contains(&FeatherValue::Int32(43)));
    }

    #[test]
    fn test_temporal_values() {
        let ts = jiff::Timestamp::from_second(1_609_459_200).unwrap();
        let v = FeatherValue::from(ts);
        assert_eq!(v.type_name(), "Timestamp");

        let d = jiff::civil::date(2021, 1, 1);
        assert_eq!(FeatherValue::from(d).type_name(), "Date");
    }
}
