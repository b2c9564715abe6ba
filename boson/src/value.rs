//! The in-memory value model: every payload the wire grammar can carry.

mod convert;

use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::record::RecordHandle;
use crate::temporal::{Interval, Period};

pub use convert::{FromValue, IntoValue};

/// A single decoded payload, or a value to be encoded.
///
/// The encoder's dispatch ladder and the decoder's tag dispatcher are both
/// closed matches over this set; there is no open extension point.
/// [`Value::Record`] holds a shared handle, so graphs may contain cycles and
/// shared substructure.
#[derive(Debug, Clone)]
pub enum Value {
    /// The null value.
    Null,
    /// A signed 8-bit integer.
    Byte(i8),
    /// A signed 16-bit integer.
    Short(i16),
    /// A signed 32-bit integer.
    Int(i32),
    /// A signed 64-bit integer.
    Long(i64),
    /// An IEEE-754 32-bit float.
    Float(f32),
    /// An IEEE-754 64-bit float.
    Double(f64),
    /// A boolean.
    Bool(bool),
    /// A character; encoded as one UTF-16 code unit, so values outside the
    /// Basic Multilingual Plane cannot be encoded.
    Char(char),
    /// A UTF-8 string.
    String(String),
    /// Raw bytes, with no per-element tags on the wire.
    Bytes(Vec<u8>),
    /// An ordered sequence.
    List(Vec<Value>),
    /// An unordered collection of unique values. Order is preserved as
    /// encountered; uniqueness is the producer's concern.
    Set(Vec<Value>),
    /// Key-value pairs in insertion order. Keys may be any payload and pair
    /// order is not significant to the format.
    Map(Vec<(Value, Value)>),
    /// A fixed-size native array with an explicit component-type name.
    Array(ArrayValue),
    /// An enumeration constant.
    Enum(EnumValue),
    /// A record instance behind a shared handle.
    Record(RecordHandle),
    /// An instant, carried as epoch milliseconds.
    Timestamp(OffsetDateTime),
    /// A calendar date, carried as an epoch day count.
    LocalDate(Date),
    /// A date-time without offset.
    LocalDateTime(PrimitiveDateTime),
    /// A time of day.
    LocalTime(Time),
    /// An exact duration.
    Duration(time::Duration),
    /// A calendar period of years, months, and days.
    Period(Period),
    /// A span between two instants.
    Interval(Interval),
    /// A UUID, carried as 16 raw bytes in network order.
    Uuid(Uuid),
}

impl Value {
    /// Builds a [`Value::String`] from anything string-like.
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Wraps `record` in a fresh shared handle.
    pub fn record<T: crate::record::Record>(record: T) -> Self {
        Self::Record(RecordHandle::new(record))
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Byte(_) => ValueKind::Byte,
            Self::Short(_) => ValueKind::Short,
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::Bool(_) => ValueKind::Bool,
            Self::Char(_) => ValueKind::Char,
            Self::String(_) => ValueKind::String,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::List(_) => ValueKind::List,
            Self::Set(_) => ValueKind::Set,
            Self::Map(_) => ValueKind::Map,
            Self::Array(_) => ValueKind::Array,
            Self::Enum(_) => ValueKind::Enum,
            Self::Record(_) => ValueKind::Record,
            Self::Timestamp(_) => ValueKind::Timestamp,
            Self::LocalDate(_) => ValueKind::LocalDate,
            Self::LocalDateTime(_) => ValueKind::LocalDateTime,
            Self::LocalTime(_) => ValueKind::LocalTime,
            Self::Duration(_) => ValueKind::Duration,
            Self::Period(_) => ValueKind::Period,
            Self::Interval(_) => ValueKind::Interval,
            Self::Uuid(_) => ValueKind::Uuid,
        }
    }
}

impl PartialEq for Value {
    /// Structural equality for every kind except records, which compare by
    /// instance identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a.ptr_eq(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::LocalDate(a), Self::LocalDate(b)) => a == b,
            (Self::LocalDateTime(a), Self::LocalDateTime(b)) => a == b,
            (Self::LocalTime(a), Self::LocalTime(b)) => a == b,
            (Self::Duration(a), Self::Duration(b)) => a == b,
            (Self::Period(a), Self::Period(b)) => a == b,
            (Self::Interval(a), Self::Interval(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            _ => false,
        }
    }
}

/// The kind of a [`Value`], used for slot declarations and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)] // variants mirror `Value` one-to-one
pub enum ValueKind {
    Null,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Char,
    String,
    Bytes,
    List,
    Set,
    Map,
    Array,
    Enum,
    Record,
    Timestamp,
    LocalDate,
    LocalDateTime,
    LocalTime,
    Duration,
    Period,
    Interval,
    Uuid,
    /// A slot that accepts any payload.
    Any,
}

/// A fixed-size native array: elements plus the component-type name the wire
/// carries so a decoder can allocate an array of the right element kind.
///
/// The component name is preserved verbatim on round trips. Constants for the
/// primitive component names are in [`component`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    /// The component-type name.
    pub component: String,
    /// The elements, in positional order.
    pub elems: Vec<Value>,
}

impl ArrayValue {
    /// Creates a new array value.
    pub fn new(component: impl Into<String>, elems: Vec<Value>) -> Self {
        Self {
            component: component.into(),
            elems,
        }
    }
}

/// Component-type names for arrays of the primitive kinds.
pub mod component {
    /// Signed 8-bit integer elements.
    pub const BYTE: &str = "byte";
    /// Signed 16-bit integer elements.
    pub const SHORT: &str = "short";
    /// Signed 32-bit integer elements.
    pub const INT: &str = "int";
    /// Signed 64-bit integer elements.
    pub const LONG: &str = "long";
    /// 32-bit float elements.
    pub const FLOAT: &str = "float";
    /// 64-bit float elements.
    pub const DOUBLE: &str = "double";
    /// Boolean elements.
    pub const BOOLEAN: &str = "boolean";
    /// Character elements.
    pub const CHAR: &str = "char";
    /// String elements.
    pub const STRING: &str = "string";
    /// Elements of any kind.
    pub const OBJECT: &str = "object";
}

/// An enumeration constant: the enum's wire class name plus the constant's
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    /// The enum's wire class name.
    pub type_name: String,
    /// The constant's name.
    pub constant: String,
}

impl EnumValue {
    /// Creates a new enum value.
    pub fn new(type_name: impl Into<String>, constant: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            constant: constant.into(),
        }
    }
}

/// Statically-known enumerations; implemented by `#[derive(WireEnum)]`.
///
/// Decoding an enum constant requires its type to be registered with
/// [`register_enum`](crate::register_enum).
pub trait WireEnum: Sized {
    /// The enum's wire class name.
    const NAME: &'static str;

    /// The wire name of this constant.
    fn constant(&self) -> &'static str;

    /// Resolves a constant by its wire name.
    fn from_constant(name: &str) -> Option<Self>;

    /// All constant names, in declaration order.
    fn constants() -> &'static [&'static str];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MapRecord;

    #[test]
    fn records_compare_by_identity() {
        let a = Value::record(MapRecord::new("demo.A"));
        let b = Value::record(MapRecord::new("demo.A"));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn kinds_do_not_cross_compare() {
        assert_ne!(Value::Int(1), Value::Long(1));
        assert_ne!(Value::Null, Value::Int(0));
        assert_eq!(Value::Double(6.2), Value::Double(6.2));
    }
}
