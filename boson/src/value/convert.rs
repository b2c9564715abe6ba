//! Conversions between Rust slot types and [`Value`].

use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::record::RecordHandle;
use crate::temporal::{Interval, Period};
use crate::value::{ArrayValue, EnumValue, Value, ValueKind};
use crate::{Error, Result};

/// Conversion into a [`Value`]. Implemented by every type usable as a record
/// slot, and derived for records and wire enums.
pub trait IntoValue {
    /// Converts `self` into a [`Value`].
    fn into_value(self) -> Value;
}

/// Fallible conversion out of a [`Value`].
pub trait FromValue: Sized {
    /// The declared value kind, recorded in slot descriptors.
    const KIND: ValueKind = ValueKind::Any;

    /// Converts `value` into `Self`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidData`] when the value's kind does not match.
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: &str, found: &Value) -> Error {
    Error::invalid_data(format!(
        "expected a {expected} value, found {:?}",
        found.kind()
    ))
}

macro_rules! value_conversions {
    ($($ty:ty => $variant:ident, $kind:ident, $expected:literal;)*) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl FromValue for $ty {
                const KIND: ValueKind = ValueKind::$kind;

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(mismatch($expected, &other)),
                    }
                }
            }
        )*
    };
}

value_conversions! {
    i8 => Byte, Byte, "byte";
    i16 => Short, Short, "short";
    i32 => Int, Int, "int";
    i64 => Long, Long, "long";
    f32 => Float, Float, "float";
    f64 => Double, Double, "double";
    bool => Bool, Bool, "boolean";
    char => Char, Char, "char";
    String => String, String, "string";
    Vec<u8> => Bytes, Bytes, "byte array";
    ArrayValue => Array, Array, "array";
    EnumValue => Enum, Enum, "enum";
    OffsetDateTime => Timestamp, Timestamp, "timestamp";
    Date => LocalDate, LocalDate, "date";
    PrimitiveDateTime => LocalDateTime, LocalDateTime, "date-time";
    Time => LocalTime, LocalTime, "time";
    time::Duration => Duration, Duration, "duration";
    Period => Period, Period, "period";
    Interval => Interval, Interval, "interval";
    Uuid => Uuid, Uuid, "UUID";
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_owned())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(inner) => inner.into_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl IntoValue for RecordHandle {
    fn into_value(self) -> Value {
        Value::Record(self)
    }
}

impl FromValue for RecordHandle {
    const KIND: ValueKind = ValueKind::Record;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Record(handle) => Ok(handle),
            other => Err(mismatch("record", &other)),
        }
    }
}

impl IntoValue for Vec<Value> {
    fn into_value(self) -> Value {
        Value::List(self)
    }
}

impl FromValue for Vec<Value> {
    const KIND: ValueKind = ValueKind::List;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) | Value::Set(items) => Ok(items),
            // a native array assigns into a sequence slot element-wise
            Value::Array(array) => Ok(array.elems),
            other => Err(mismatch("sequence", &other)),
        }
    }
}

impl IntoValue for Vec<(Value, Value)> {
    fn into_value(self) -> Value {
        Value::Map(self)
    }
}

impl FromValue for Vec<(Value, Value)> {
    const KIND: ValueKind = ValueKind::Map;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(pairs) => Ok(pairs),
            other => Err(mismatch("map", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_round_trip() {
        assert_eq!(42i32.into_value(), Value::Int(42));
        assert_eq!(i32::from_value(Value::Int(42)).unwrap(), 42);
        assert_eq!(i64::from_value(Value::Long(-9)).unwrap(), -9);
        assert_eq!(String::from_value(Value::string("hi")).unwrap(), "hi");
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        assert!(matches!(
            i32::from_value(Value::Long(1)),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            RecordHandle::from_value(Value::Null),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn options_map_null() {
        assert_eq!(Option::<i32>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i32>::from_value(Value::Int(3)).unwrap(), Some(3));
        assert_eq!(None::<i32>.into_value(), Value::Null);
        assert_eq!(Some(3i32).into_value(), Value::Int(3));
    }

    #[test]
    fn arrays_assign_into_sequences() {
        let array = Value::Array(ArrayValue::new("int", vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(
            Vec::<Value>::from_value(array).unwrap(),
            vec![Value::Int(1), Value::Int(2)]
        );
    }

    #[test]
    fn declared_kinds() {
        assert_eq!(i8::KIND, ValueKind::Byte);
        assert_eq!(Option::<String>::KIND, ValueKind::String);
        assert_eq!(Value::KIND, ValueKind::Any);
        assert_eq!(Vec::<u8>::KIND, ValueKind::Bytes);
    }
}
