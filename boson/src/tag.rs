//! The wire-tag table: the one-byte type codes that prefix every payload.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The one-byte type code that prefixes every payload and selects the layout
/// of what follows.
///
/// Byte values are fixed for interoperability and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Tag {
    /// A signed 8-bit integer.
    Byte = 1,
    /// A signed 16-bit integer.
    Short = 2,
    /// A signed 32-bit integer.
    Int = 3,
    /// A signed 64-bit integer.
    Long = 4,
    /// An IEEE-754 32-bit float.
    Float = 5,
    /// An IEEE-754 64-bit float.
    Double = 6,
    /// A boolean encoded as a single byte.
    Boolean = 7,
    /// A single UTF-16 code unit.
    Char = 8,
    /// The null value; carries no payload.
    Null = 9,
    /// A length-prefixed UTF-8 string. The prefix counts bytes, not code
    /// points.
    String = 10,
    /// A fixed-size native array with an explicit component-type name.
    Array = 11,
    /// An ordered sequence of payloads.
    List = 12,
    /// Key-value pairs; keys may be any payload.
    Map = 13,
    /// A record (called a POLO on the wire): reference id, class name, and
    /// named fields.
    Record = 14,
    /// A back-pointer to a previously encoded record.
    Reference = 15,
    /// An unordered collection of unique payloads.
    Set = 16,
    /// An enumeration constant: class name plus constant name.
    Enum = 17,
    /// Raw bytes with no per-element tags.
    ByteArray = 18,
    /// An instant as int64 epoch milliseconds.
    Date = 19,
    /// A calendar date as an int64 epoch day count.
    LocalDate = 20,
    /// A date-time without offset, as an ISO-8601 string.
    LocalDateTime = 21,
    /// A time of day, as an ISO-8601 string.
    LocalTime = 22,
    /// An exact duration, as an ISO-8601 string.
    Duration = 23,
    /// A calendar period, as an ISO-8601 string.
    Period = 24,
    /// Joda-Time instant as int64 epoch milliseconds.
    JodaDateTime = 25,
    /// Joda-Time calendar date, as an ISO-8601 string.
    JodaLocalDate = 26,
    /// Joda-Time time of day, as an ISO-8601 string.
    JodaLocalTime = 27,
    /// Joda-Time date-time without offset, as an ISO-8601 string.
    JodaLocalDateTime = 28,
    /// Joda-Time duration, as an ISO-8601 string.
    JodaDuration = 29,
    /// Joda-Time interval: two instants as an ISO-8601 `start/end` string.
    JodaInterval = 30,
    /// Joda-Time period, as an ISO-8601 string.
    JodaPeriod = 31,
    /// A UUID as 16 raw bytes in network order.
    Uuid = 32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_bytes_are_fixed() {
        assert_eq!(u8::from(Tag::Byte), 1);
        assert_eq!(u8::from(Tag::Null), 9);
        assert_eq!(u8::from(Tag::String), 10);
        assert_eq!(u8::from(Tag::Map), 13);
        assert_eq!(u8::from(Tag::Record), 14);
        assert_eq!(u8::from(Tag::Reference), 15);
        assert_eq!(u8::from(Tag::ByteArray), 18);
        assert_eq!(u8::from(Tag::JodaPeriod), 31);
        assert_eq!(u8::from(Tag::Uuid), 32);
    }

    #[test]
    fn unknown_bytes_are_rejected() {
        assert!(Tag::try_from(0).is_err());
        assert!(Tag::try_from(33).is_err());
        assert!(Tag::try_from(255).is_err());
    }

    #[test]
    fn round_trips_through_byte() {
        for raw in 1..=32u8 {
            let tag = Tag::try_from(raw).unwrap();
            assert_eq!(u8::from(tag), raw);
        }
    }
}
