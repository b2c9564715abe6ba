//! Decoding Boson wire data back into values.

use std::collections::HashMap;
use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt};
use log::warn;

use crate::introspect;
use crate::record::{MapRecord, RecordHandle};
use crate::tag::Tag;
use crate::temporal;
use crate::value::{ArrayValue, EnumValue, Value};
use crate::{Error, Result, BOSON_VERSION};

/// Wire lengths are untrusted, so pre-allocation is capped at this many
/// elements; truncated input fails before a larger buffer could fill.
const PREALLOC_LIMIT: usize = 4096;

/// Options controlling how records are decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Decode records as dynamic string-keyed mappings ([`MapRecord`])
    /// instead of resolving and constructing registered classes. Off by
    /// default.
    pub read_records_as_map: bool,
}

/// Decodes Boson messages read from `R`.
///
/// Each call to [`Decoder::decode`] consumes one complete message and owns
/// its own reference table.
pub struct Decoder<R> {
    reader: R,
    options: ReadOptions,
    refs: HashMap<u32, RecordHandle>,
}

impl<R: io::Read> Decoder<R> {
    /// Creates a new [`Decoder`] reading from `reader` with default options.
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ReadOptions::default())
    }

    /// Creates a new [`Decoder`] with the given options.
    pub fn with_options(reader: R, options: ReadOptions) -> Self {
        Self {
            reader,
            options,
            refs: HashMap::new(),
        }
    }

    /// Returns a reference to the inner reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Returns a mutable reference to the inner reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consumes the decoder and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Decodes one complete message: a version byte followed by a single
    /// payload.
    ///
    /// # Errors
    /// This function returns an error if the input is truncated, carries an
    /// unsupported version or tag, or names a class that is not registered.
    pub fn decode(&mut self) -> Result<Value> {
        let version = self
            .reader
            .read_u8()
            .map_err(|e| Error::io(e, "reading version byte"))?;
        if version != BOSON_VERSION {
            return Err(Error::VersionMismatch {
                expected: BOSON_VERSION,
                found: version,
            });
        }
        let result = self.read_value();
        // the reference table lives only for this call
        self.refs.clear();
        result
    }

    fn read_value(&mut self) -> Result<Value> {
        let raw = self
            .reader
            .read_u8()
            .map_err(|e| Error::io(e, "reading tag"))?;
        let tag = Tag::try_from(raw).map_err(|_| Error::UnsupportedTag(raw))?;
        match tag {
            Tag::Null => Ok(Value::Null),
            Tag::Byte => self
                .reader
                .read_i8()
                .map(Value::Byte)
                .map_err(|e| Error::io(e, "reading byte payload")),
            Tag::Short => self.read_i16().map(Value::Short),
            Tag::Int => self.read_i32().map(Value::Int),
            Tag::Long => self.read_i64().map(Value::Long),
            Tag::Float => self
                .reader
                .read_f32::<BigEndian>()
                .map(Value::Float)
                .map_err(|e| Error::io(e, "reading float payload")),
            Tag::Double => self
                .reader
                .read_f64::<BigEndian>()
                .map(Value::Double)
                .map_err(|e| Error::io(e, "reading double payload")),
            Tag::Boolean => self
                .reader
                .read_u8()
                // any non-zero byte decodes true
                .map(|b| Value::Bool(b != 0))
                .map_err(|e| Error::io(e, "reading boolean payload")),
            Tag::Char => {
                let unit = self
                    .reader
                    .read_u16::<BigEndian>()
                    .map_err(|e| Error::io(e, "reading char payload"))?;
                let c = char::from_u32(u32::from(unit)).ok_or_else(|| {
                    Error::invalid_data(format!(
                        "UTF-16 code unit {unit:#06x} is an unpaired surrogate"
                    ))
                })?;
                Ok(Value::Char(c))
            }
            Tag::String => self.read_string().map(Value::String),
            Tag::ByteArray => {
                let len = self.read_count("byte array length")?;
                self.read_exact_bytes(len, "reading byte array payload")
                    .map(Value::Bytes)
            }
            Tag::List => {
                let len = self.read_count("list length")?;
                self.read_sequence(len).map(Value::List)
            }
            Tag::Set => {
                let len = self.read_count("set length")?;
                self.read_sequence(len).map(Value::Set)
            }
            Tag::Map => {
                let len = self.read_count("map length")?;
                let mut pairs = Vec::with_capacity(len.min(PREALLOC_LIMIT));
                for _ in 0..len {
                    let key = self.read_value()?;
                    let value = self.read_value()?;
                    pairs.push((key, value));
                }
                Ok(Value::Map(pairs))
            }
            Tag::Array => {
                let len = self.read_count("array length")?;
                let component = self.read_string()?;
                let elems = self.read_sequence(len)?;
                Ok(Value::Array(ArrayValue { component, elems }))
            }
            Tag::Record => self.read_record(),
            Tag::Reference => {
                let id = self.read_ref_id()?;
                match self.refs.get(&id) {
                    Some(handle) => Ok(Value::Record(handle.clone())),
                    None => Err(Error::DanglingReference(id)),
                }
            }
            Tag::Enum => self.read_enum(),
            Tag::Date | Tag::JodaDateTime => self
                .read_i64()
                .and_then(temporal::timestamp_from_millis)
                .map(Value::Timestamp),
            Tag::LocalDate => self
                .read_i64()
                .and_then(temporal::date_from_epoch_day)
                .map(Value::LocalDate),
            Tag::JodaLocalDate => self
                .read_string()
                .and_then(|s| temporal::parse_date(&s))
                .map(Value::LocalDate),
            Tag::LocalDateTime | Tag::JodaLocalDateTime => self
                .read_string()
                .and_then(|s| temporal::parse_local_date_time(&s))
                .map(Value::LocalDateTime),
            Tag::LocalTime | Tag::JodaLocalTime => self
                .read_string()
                .and_then(|s| temporal::parse_local_time(&s))
                .map(Value::LocalTime),
            Tag::Duration | Tag::JodaDuration => self
                .read_string()
                .and_then(|s| temporal::parse_duration(&s))
                .map(Value::Duration),
            Tag::Period | Tag::JodaPeriod => self
                .read_string()
                .and_then(|s| s.parse())
                .map(Value::Period),
            Tag::JodaInterval => self
                .read_string()
                .and_then(|s| s.parse())
                .map(Value::Interval),
            Tag::Uuid => {
                let bytes = self.read_exact_bytes(16, "reading UUID payload")?;
                let bytes: [u8; 16] = bytes
                    .try_into()
                    .map_err(|_| Error::invalid_data("short UUID payload"))?;
                Ok(Value::Uuid(uuid::Uuid::from_bytes(bytes)))
            }
        }
    }

    /// Decodes a record payload. The ordering is load-bearing: the instance
    /// is registered in the reference table after (id, class name, field
    /// count) are read and before any field payload, so fields that point
    /// back at the record resolve to the very same instance.
    fn read_record(&mut self) -> Result<Value> {
        let id = self.read_ref_id()?;
        let class_name = self.read_string()?;
        let field_count = self.read_count("record field count")?;

        if self.options.read_records_as_map {
            let handle = RecordHandle::new(MapRecord::new(class_name));
            self.refs.insert(id, handle.clone());
            for _ in 0..field_count {
                let name = self.read_string()?;
                let value = self.read_value()?;
                if let Some(mut map) = handle.get_mut::<MapRecord>() {
                    map.insert(name, value);
                }
            }
            return Ok(Value::Record(handle));
        }

        let (descriptor, construct) = introspect::lookup_record(&class_name)
            .ok_or_else(|| Error::MissingClass(class_name.clone()))?;
        let construct = construct.ok_or_else(|| Error::CannotConstruct(class_name.clone()))?;
        let handle = construct();
        self.refs.insert(id, handle.clone());
        for _ in 0..field_count {
            let name = self.read_string()?;
            let value = self.read_value()?;
            let Some(slot) = descriptor.slot(&name) else {
                // the payload was consumed above, so the stream stays aligned
                warn!("dropping unknown field `{name}` of record class `{class_name}`");
                continue;
            };
            let mut record = handle.borrow_mut();
            if let Err(e) = (slot.set)(record.as_any_mut(), value) {
                warn!("skipping field `{name}` of record class `{class_name}`: {e}");
            }
        }
        Ok(Value::Record(handle))
    }

    fn read_enum(&mut self) -> Result<Value> {
        let type_name = self.read_string()?;
        let constant = self.read_string()?;
        let Some(constants) = introspect::lookup_enum(&type_name) else {
            return Err(Error::MissingClass(type_name));
        };
        if constants.contains(&constant.as_str()) {
            Ok(Value::Enum(EnumValue::new(type_name, constant)))
        } else {
            warn!("enum class `{type_name}` has no constant `{constant}`; decoding as null");
            Ok(Value::Null)
        }
    }

    fn read_sequence(&mut self, len: usize) -> Result<Vec<Value>> {
        let mut items = Vec::with_capacity(len.min(PREALLOC_LIMIT));
        for _ in 0..len {
            items.push(self.read_value()?);
        }
        Ok(items)
    }

    fn read_i16(&mut self) -> Result<i16> {
        self.reader
            .read_i16::<BigEndian>()
            .map_err(|e| Error::io(e, "reading int16"))
    }

    fn read_i32(&mut self) -> Result<i32> {
        self.reader
            .read_i32::<BigEndian>()
            .map_err(|e| Error::io(e, "reading int32"))
    }

    fn read_i64(&mut self) -> Result<i64> {
        self.reader
            .read_i64::<BigEndian>()
            .map_err(|e| Error::io(e, "reading int64"))
    }

    fn read_count(&mut self, what: &str) -> Result<usize> {
        let count = self.read_i32()?;
        usize::try_from(count)
            .map_err(|_| Error::invalid_data(format!("negative {what} {count}")))
    }

    fn read_ref_id(&mut self) -> Result<u32> {
        let id = self.read_i32()?;
        u32::try_from(id).map_err(|_| Error::invalid_data(format!("negative reference id {id}")))
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_count("string length")?;
        let bytes = self.read_exact_bytes(len, "reading string payload")?;
        String::from_utf8(bytes)
            .map_err(|e| Error::invalid_data(format!("string payload is not valid UTF-8: {e}")))
    }

    fn read_exact_bytes(&mut self, len: usize, context: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(len.min(PREALLOC_LIMIT));
        let read = (&mut self.reader)
            .take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| Error::io(e, context))?;
        if read < len {
            return Err(Error::Truncated(context.to_owned()));
        }
        Ok(buf)
    }
}

/// Decodes one complete Boson message from `bytes`.
///
/// # Errors
/// This function returns an error if the input is truncated, carries an
/// unsupported version or tag, or names a class that is not registered.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    decode_with_options(bytes, ReadOptions::default())
}

/// Decodes one complete Boson message from `bytes` with explicit options.
///
/// # Errors
/// This function returns an error if the input is truncated, carries an
/// unsupported version or tag, or names a class that is not registered.
pub fn decode_with_options(bytes: &[u8], options: ReadOptions) -> Result<Value> {
    Decoder::with_options(bytes, options).decode()
}

/// Decodes one complete Boson message from a blocking reader.
///
/// # Errors
/// This function returns an error if the input is truncated, carries an
/// unsupported version or tag, or names a class that is not registered.
pub fn decode_from<R: io::Read>(reader: R) -> Result<Value> {
    Decoder::new(reader).decode()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use time::macros::{date, datetime, time};
    use uuid::Uuid;

    use super::*;
    use crate::encode::{encode, encode_with_options};
    use crate::introspect::{register, register_enum, register_with};
    use crate::temporal::{Interval, Period};
    use crate::value::component;
    use crate::{IntoValue, Record, RecordType, WireEnum, WriteOptions};

    #[derive(Default, Record)]
    #[boson(name = "decode.Node")]
    struct Node {
        label: String,
        next: Option<RecordHandle>,
    }

    #[derive(Default, Record)]
    #[boson(name = "decode.Left")]
    struct Left {
        right: Option<RecordHandle>,
    }

    #[derive(Default, Record)]
    #[boson(name = "decode.Right")]
    struct Right {
        left: Option<RecordHandle>,
    }

    #[derive(Default, Record)]
    #[boson(name = "decode.Pair")]
    struct Pair {
        first: Option<RecordHandle>,
        second: Option<RecordHandle>,
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, WireEnum)]
    #[boson(name = "decode.Color")]
    enum Color {
        #[default]
        Red,
        Green,
        Blue,
    }

    #[derive(Default, Record)]
    #[boson(name = "decode.ColorBox")]
    struct ColorBox {
        color: Color,
    }

    #[derive(Default, Record)]
    #[boson(name = "decode.Message")]
    struct ProducerMessage {
        body: String,
        extra: i32,
    }

    #[derive(Default, Record)]
    #[boson(name = "decode.Message")]
    struct ConsumerMessage {
        body: String,
    }

    #[derive(Default, Record)]
    #[boson(name = "decode.Renamed")]
    struct Renamed {
        #[boson(rename = "X")]
        field: i32,
    }

    #[derive(Default, Record)]
    #[boson(name = "decode.Opting")]
    struct Opting {
        kept: i32,
        #[boson(ignore)]
        skipped: i32,
        #[boson(transient)]
        cached: i32,
        #[boson(readonly)]
        sealed: i32,
    }

    #[derive(Default, Record)]
    #[boson(name = "inherit.Base")]
    struct Base {
        id: i64,
        #[boson(rename = "kind")]
        category: String,
    }

    #[derive(Default, Record)]
    #[boson(name = "inherit.Derived")]
    struct Derived {
        #[boson(extends)]
        base: Base,
        name: String,
    }

    #[derive(Default, Record)]
    #[boson(name = "inherit.Lone", ignore_inherited)]
    struct Lone {
        #[boson(extends)]
        base: Base,
        name: String,
    }

    #[derive(Default, Record)]
    #[boson(name = "inherit.Shadow")]
    struct Shadow {
        #[boson(extends)]
        base: Base,
        id: i64,
    }

    fn message(body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![BOSON_VERSION];
        bytes.extend_from_slice(body);
        bytes
    }

    fn wire_string(s: &str) -> Vec<u8> {
        let mut bytes = (s.len() as i32).to_be_bytes().to_vec();
        bytes.extend_from_slice(s.as_bytes());
        bytes
    }

    fn round_trip(value: &Value) -> Value {
        decode(&encode(value).unwrap()).unwrap()
    }

    #[rstest]
    #[case::null(Value::Null)]
    #[case::byte(Value::Byte(-7))]
    #[case::short(Value::Short(1234))]
    #[case::int(Value::Int(-100_000))]
    #[case::long(Value::Long(i64::MIN))]
    #[case::float(Value::Float(5.3))]
    #[case::double(Value::Double(6.2))]
    #[case::bool_true(Value::Bool(true))]
    #[case::bool_false(Value::Bool(false))]
    #[case::char_ascii(Value::Char('z'))]
    #[case::char_accented(Value::Char('é'))]
    #[case::string(Value::string("a str"))]
    #[case::string_multibyte(Value::string("snow ☃ man"))]
    fn round_trip_primitives(#[case] value: Value) {
        assert_eq!(round_trip(&value), value);
    }

    #[rstest]
    #[case::timestamp(Value::Timestamp(datetime!(2023-03-08 14:01:50.123 UTC)))]
    #[case::local_date(Value::LocalDate(date!(2024 - 02 - 29)))]
    #[case::local_date_time(Value::LocalDateTime(datetime!(2024-06-01 23:59:59.999)))]
    #[case::local_time(Value::LocalTime(time!(10:15:30.25)))]
    #[case::duration(Value::Duration(time::Duration::new(90, 500_000_000)))]
    #[case::period(Value::Period(Period::new(1, 2, 3)))]
    #[case::interval(Value::Interval(Interval::new(
        datetime!(2004-06-09 00:00:00 UTC),
        datetime!(2004-07-10 12:30:00.250 UTC),
    ).unwrap()))]
    #[case::uuid(Value::Uuid(Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef)))]
    fn round_trip_temporals(#[case] value: Value) {
        assert_eq!(round_trip(&value), value);
    }

    #[test]
    fn round_trip_mixed_map() {
        let value = Value::Map(vec![
            (Value::string("int"), Value::Int(1)),
            (Value::string("long"), Value::Long(2)),
            (Value::string("byte"), Value::Byte(3)),
            (Value::string("short"), Value::Short(4)),
            (Value::string("boolean"), Value::Bool(true)),
            (Value::string("byte[]"), Value::Bytes(vec![1, 2, 3])),
            (Value::string("float"), Value::Float(5.3)),
            (Value::string("double"), Value::Double(6.2)),
            (Value::string("char"), Value::Char('z')),
            (Value::string("null"), Value::Null),
            (Value::string("str"), Value::string("a str")),
            (
                Value::string("array"),
                Value::Array(ArrayValue::new(
                    component::OBJECT,
                    vec![Value::Int(1), Value::string("2")],
                )),
            ),
            (
                Value::string("list"),
                Value::List(vec![Value::Int(5), Value::Int(6)]),
            ),
            (Value::string("set"), Value::Set(vec![Value::Int(34)])),
            (
                Value::string("int-array"),
                Value::Array(ArrayValue::new(
                    component::INT,
                    vec![
                        Value::Int(3),
                        Value::Int(4),
                        Value::Int(2),
                        Value::Int(5),
                    ],
                )),
            ),
        ]);
        let decoded = round_trip(&value);
        assert_eq!(decoded, value);
        // the raw-bytes entry stays a raw byte sequence
        let Value::Map(pairs) = decoded else {
            panic!("expected a map");
        };
        assert!(pairs
            .iter()
            .any(|(k, v)| *k == Value::string("byte[]")
                && matches!(v, Value::Bytes(b) if b == &[1, 2, 3])));
    }

    #[test]
    fn array_component_name_is_preserved() {
        let value = Value::Array(ArrayValue::new(
            component::INT,
            vec![Value::Null, Value::Null],
        ));
        let Value::Array(decoded) = round_trip(&value) else {
            panic!("expected an array");
        };
        assert_eq!(decoded.component, component::INT);
        assert_eq!(decoded.elems, vec![Value::Null, Value::Null]);
    }

    #[test]
    fn joda_tags_decode_to_the_same_kinds() {
        let instant = datetime!(2023-03-08 14:01:50 UTC);
        let mut body = vec![u8::from(Tag::JodaDateTime)];
        body.extend_from_slice(&(instant.unix_timestamp() * 1000).to_be_bytes());
        assert_eq!(decode(&message(&body)).unwrap(), Value::Timestamp(instant));

        let mut body = vec![u8::from(Tag::JodaLocalDate)];
        body.extend_from_slice(&wire_string("2024-02-29"));
        assert_eq!(
            decode(&message(&body)).unwrap(),
            Value::LocalDate(date!(2024 - 02 - 29))
        );

        let mut body = vec![u8::from(Tag::JodaLocalTime)];
        body.extend_from_slice(&wire_string("10:15:30.250000000"));
        assert_eq!(
            decode(&message(&body)).unwrap(),
            Value::LocalTime(time!(10:15:30.25))
        );

        let mut body = vec![u8::from(Tag::JodaLocalDateTime)];
        body.extend_from_slice(&wire_string("2024-06-01T23:59:59.999000000"));
        assert_eq!(
            decode(&message(&body)).unwrap(),
            Value::LocalDateTime(datetime!(2024-06-01 23:59:59.999))
        );

        let mut body = vec![u8::from(Tag::JodaDuration)];
        body.extend_from_slice(&wire_string("PT90S"));
        assert_eq!(
            decode(&message(&body)).unwrap(),
            Value::Duration(time::Duration::seconds(90))
        );

        let mut body = vec![u8::from(Tag::JodaPeriod)];
        body.extend_from_slice(&wire_string("P1Y2M3D"));
        assert_eq!(
            decode(&message(&body)).unwrap(),
            Value::Period(Period::new(1, 2, 3))
        );
    }

    #[test]
    fn nonzero_boolean_bytes_decode_true() {
        assert_eq!(
            decode(&message(&[u8::from(Tag::Boolean), 5])).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn wrong_version_is_rejected() {
        let result = decode(&[2, u8::from(Tag::Null)]);
        assert!(
            matches!(result, Err(Error::VersionMismatch { expected: 1, found: 2 }))
        );
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(matches!(
            decode(&message(&[99])),
            Err(Error::UnsupportedTag(99))
        ));
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::version_only(&[BOSON_VERSION])]
    #[case::short_int(&[BOSON_VERSION, 3, 0, 0])]
    #[case::short_long(&[BOSON_VERSION, 4, 0, 0, 0, 0, 1])]
    #[case::short_string(&[BOSON_VERSION, 10, 0, 0, 0, 5, b'a'])]
    #[case::short_byte_array(&[BOSON_VERSION, 18, 0, 0, 0, 9, 1, 2])]
    #[case::short_uuid(&[BOSON_VERSION, 32, 1, 2, 3])]
    fn truncated_input_is_rejected(#[case] bytes: &[u8]) {
        assert!(matches!(decode(bytes), Err(Error::Truncated(_))));
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let result = decode(&message(&[u8::from(Tag::Reference), 0, 0, 0, 7]));
        assert!(matches!(result, Err(Error::DanglingReference(7))));
    }

    #[test]
    fn negative_lengths_are_rejected() {
        let result = decode(&message(&[u8::from(Tag::List), 0xff, 0xff, 0xff, 0xff]));
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn surrogate_code_units_are_rejected() {
        let result = decode(&message(&[u8::from(Tag::Char), 0xd8, 0x00]));
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn invalid_utf8_strings_are_rejected() {
        let result = decode(&message(&[u8::from(Tag::String), 0, 0, 0, 1, 0x80]));
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn decode_from_reads_a_stream() {
        let bytes = encode(&Value::Int(42)).unwrap();
        let decoded = decode_from(io::Cursor::new(bytes)).unwrap();
        assert_eq!(decoded, Value::Int(42));
    }

    #[test]
    fn self_cycle_survives_a_round_trip() {
        register::<Node>();
        let root = RecordHandle::new(Node {
            label: "self".to_owned(),
            next: None,
        });
        root.get_mut::<Node>().unwrap().next = Some(root.clone());

        let decoded = round_trip(&Value::Record(root));
        let Value::Record(handle) = decoded else {
            panic!("expected a record");
        };
        let next = handle.get::<Node>().unwrap().next.clone().unwrap();
        assert!(next.ptr_eq(&handle));
        assert_eq!(handle.get::<Node>().unwrap().label, "self");
    }

    #[test]
    fn mutual_cycle_survives_a_round_trip() {
        register::<Left>();
        register::<Right>();
        let a = RecordHandle::new(Left::default());
        let b = RecordHandle::new(Right::default());
        a.get_mut::<Left>().unwrap().right = Some(b.clone());
        b.get_mut::<Right>().unwrap().left = Some(a.clone());

        let decoded = round_trip(&Value::Record(a));
        let Value::Record(a2) = decoded else {
            panic!("expected a record");
        };
        let b2 = a2.get::<Left>().unwrap().right.clone().unwrap();
        let a3 = b2.get::<Right>().unwrap().left.clone().unwrap();
        assert!(a3.ptr_eq(&a2));
    }

    #[test]
    fn shared_substructure_is_preserved() {
        register::<Pair>();
        register::<Node>();
        let inner = RecordHandle::new(Node {
            label: "inner".to_owned(),
            next: None,
        });
        let pair = RecordHandle::new(Pair {
            first: Some(inner.clone()),
            second: Some(inner),
        });

        let decoded = round_trip(&Value::Record(pair));
        let Value::Record(handle) = decoded else {
            panic!("expected a record");
        };
        let first = handle.get::<Pair>().unwrap().first.clone().unwrap();
        let second = handle.get::<Pair>().unwrap().second.clone().unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(first.get::<Node>().unwrap().label, "inner");
    }

    #[test]
    fn enum_nested_in_record_round_trips() {
        register::<ColorBox>();
        register_enum::<Color>();
        let boxed = RecordHandle::new(ColorBox {
            color: Color::Green,
        });
        let decoded = round_trip(&Value::Record(boxed));
        let Value::Record(handle) = decoded else {
            panic!("expected a record");
        };
        assert_eq!(handle.get::<ColorBox>().unwrap().color, Color::Green);
    }

    #[test]
    fn top_level_enum_round_trips() {
        register_enum::<Color>();
        let decoded = round_trip(&Color::Blue.into_value());
        assert_eq!(
            decoded,
            Value::Enum(EnumValue::new("decode.Color", "Blue"))
        );
    }

    #[test]
    fn missing_enum_constant_decodes_to_null() {
        register_enum::<Color>();
        let value = Value::Enum(EnumValue::new("decode.Color", "Chartreuse"));
        assert_eq!(round_trip(&value), Value::Null);
    }

    #[test]
    fn unregistered_enum_class_is_rejected() {
        let value = Value::Enum(EnumValue::new("decode.NowhereEnum", "X"));
        let result = decode(&encode(&value).unwrap());
        assert!(matches!(result, Err(Error::MissingClass(name)) if name == "decode.NowhereEnum"));
    }

    #[test]
    fn unregistered_record_class_is_rejected() {
        let value = Value::record(MapRecord::new("decode.Nowhere"));
        let result = decode(&encode(&value).unwrap());
        assert!(matches!(result, Err(Error::MissingClass(name)) if name == "decode.Nowhere"));
    }

    #[test]
    fn constructorless_class_is_rejected() {
        register_with(
            "decode.Opaque",
            <Node as RecordType>::descriptor,
            None,
        );
        let value = Value::record(MapRecord::new("decode.Opaque"));
        let result = decode(&encode(&value).unwrap());
        assert!(matches!(result, Err(Error::CannotConstruct(name)) if name == "decode.Opaque"));
    }

    #[test]
    fn unknown_fields_are_dropped_with_known_ones_kept() {
        register::<ConsumerMessage>();
        let produced = RecordHandle::new(ProducerMessage {
            body: "hello".to_owned(),
            extra: 9,
        });
        let decoded = round_trip(&Value::Record(produced));
        let Value::Record(handle) = decoded else {
            panic!("expected a record");
        };
        let consumer = handle.get::<ConsumerMessage>().unwrap();
        assert_eq!(consumer.body, "hello");
    }

    #[test]
    fn renamed_slot_travels_under_its_external_name() {
        register::<Renamed>();
        let record = RecordHandle::new(Renamed { field: 77 });
        let bytes = encode(&Value::Record(record)).unwrap();

        // the wire carries the external name
        let as_map = decode_with_options(
            &bytes,
            ReadOptions {
                read_records_as_map: true,
            },
        )
        .unwrap();
        let Value::Record(map_handle) = as_map else {
            panic!("expected a record");
        };
        let map = map_handle.get::<MapRecord>().unwrap();
        assert_eq!(map.get("X"), Some(&Value::Int(77)));
        assert_eq!(map.get("field"), None);

        // and routes back into the renamed slot
        let decoded = decode(&bytes).unwrap();
        let Value::Record(handle) = decoded else {
            panic!("expected a record");
        };
        assert_eq!(handle.get::<Renamed>().unwrap().field, 77);
    }

    #[test]
    fn opted_out_slots_fall_back_to_defaults() {
        register::<Opting>();
        let record = RecordHandle::new(Opting {
            kept: 5,
            skipped: 9,
            cached: 7,
            sealed: 3,
        });
        let decoded = round_trip(&Value::Record(record));
        let Value::Record(handle) = decoded else {
            panic!("expected a record");
        };
        let opting = handle.get::<Opting>().unwrap();
        assert_eq!(opting.kept, 5);
        assert_eq!(opting.skipped, 0);
        assert_eq!(opting.cached, 0);
        assert_eq!(opting.sealed, 0);
    }

    #[test]
    fn readonly_slots_are_included_on_request() {
        register::<Opting>();
        let record = RecordHandle::new(Opting {
            kept: 5,
            skipped: 9,
            cached: 7,
            sealed: 3,
        });
        let bytes = encode_with_options(
            &Value::Record(record),
            WriteOptions {
                serialize_readonly_fields: true,
            },
        )
        .unwrap();
        let decoded = decode(&bytes).unwrap();
        let Value::Record(handle) = decoded else {
            panic!("expected a record");
        };
        let opting = handle.get::<Opting>().unwrap();
        assert_eq!(opting.kept, 5);
        assert_eq!(opting.sealed, 3);
        assert_eq!(opting.skipped, 0);
    }

    #[test]
    fn parent_slots_merge_into_the_field_list() {
        register::<Derived>();
        let record = RecordHandle::new(Derived {
            base: Base {
                id: 7,
                category: "widget".to_owned(),
            },
            name: "first".to_owned(),
        });
        let bytes = encode(&Value::Record(record)).unwrap();

        let as_map = decode_with_options(
            &bytes,
            ReadOptions {
                read_records_as_map: true,
            },
        )
        .unwrap();
        let Value::Record(map_handle) = as_map else {
            panic!("expected a record");
        };
        let map = map_handle.get::<MapRecord>().unwrap();
        assert_eq!(map.get("name"), Some(&Value::string("first")));
        assert_eq!(map.get("id"), Some(&Value::Long(7)));
        // the parent's rename directive still applies to merged slots
        assert_eq!(map.get("kind"), Some(&Value::string("widget")));
        drop(map);

        let decoded = decode(&bytes).unwrap();
        let Value::Record(handle) = decoded else {
            panic!("expected a record");
        };
        let derived = handle.get::<Derived>().unwrap();
        assert_eq!(derived.base.id, 7);
        assert_eq!(derived.base.category, "widget");
        assert_eq!(derived.name, "first");
    }

    #[test]
    fn ignore_inherited_restricts_the_scan() {
        register::<Lone>();
        let record = RecordHandle::new(Lone {
            base: Base {
                id: 7,
                category: "widget".to_owned(),
            },
            name: "only".to_owned(),
        });
        let as_map = decode_with_options(
            &encode(&Value::Record(record)).unwrap(),
            ReadOptions {
                read_records_as_map: true,
            },
        )
        .unwrap();
        let Value::Record(map_handle) = as_map else {
            panic!("expected a record");
        };
        let map = map_handle.get::<MapRecord>().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("name"), Some(&Value::string("only")));
    }

    #[test]
    fn own_slots_shadow_parent_slots() {
        register::<Shadow>();
        let record = RecordHandle::new(Shadow {
            base: Base {
                id: 1,
                category: String::new(),
            },
            id: 2,
        });
        let decoded = round_trip(&Value::Record(record));
        let Value::Record(handle) = decoded else {
            panic!("expected a record");
        };
        let shadow = handle.get::<Shadow>().unwrap();
        // the subtype's slot owns the external name
        assert_eq!(shadow.id, 2);
        assert_eq!(shadow.base.id, 0);
    }

    #[test]
    fn map_mode_preserves_identity_and_cycles() {
        let root = RecordHandle::new(Node {
            label: "loop".to_owned(),
            next: None,
        });
        root.get_mut::<Node>().unwrap().next = Some(root.clone());
        let bytes = encode(&Value::Record(root)).unwrap();

        let decoded = decode_with_options(
            &bytes,
            ReadOptions {
                read_records_as_map: true,
            },
        )
        .unwrap();
        let Value::Record(handle) = decoded else {
            panic!("expected a record");
        };
        let map = handle.get::<MapRecord>().unwrap();
        assert_eq!(map.type_name(), "decode.Node");
        assert_eq!(map.get("label"), Some(&Value::string("loop")));
        let Some(Value::Record(next)) = map.get("next") else {
            panic!("expected a record field");
        };
        assert!(next.ptr_eq(&handle));
    }

    #[test]
    fn map_mode_records_re_encode_faithfully() {
        register::<Node>();
        let original = RecordHandle::new(Node {
            label: "persisted".to_owned(),
            next: None,
        });
        let bytes = encode(&Value::Record(original)).unwrap();
        let as_map = decode_with_options(
            &bytes,
            ReadOptions {
                read_records_as_map: true,
            },
        )
        .unwrap();

        // a map-mode record keeps its wire class name, so it re-encodes into
        // something the typed path can decode again
        let re_encoded = encode(&as_map).unwrap();
        let decoded = decode(&re_encoded).unwrap();
        let Value::Record(handle) = decoded else {
            panic!("expected a record");
        };
        assert_eq!(handle.get::<Node>().unwrap().label, "persisted");
    }
}
