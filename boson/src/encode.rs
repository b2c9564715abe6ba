//! Encoding values into the Boson wire format.

use std::collections::HashMap;
use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use crate::introspect;
use crate::record::{MapRecord, RecordHandle};
use crate::tag::Tag;
use crate::temporal;
use crate::value::Value;
use crate::{Error, Result, BOSON_VERSION};

/// Options controlling how records are encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Include slots marked read-only in record field lists. Off by default.
    pub serialize_readonly_fields: bool,
}

/// Encodes values into the Boson wire format, writing to `W`.
///
/// Each call to [`Encoder::encode`] is one complete message with its own
/// reference table, so records are shared only within a single message.
pub struct Encoder<W> {
    writer: W,
    options: WriteOptions,
    refs: HashMap<usize, u32>,
    // clones pinned per call so table keys stay stable and unique
    pinned: Vec<RecordHandle>,
    next_ref: u32,
}

impl<W: io::Write> Encoder<W> {
    /// Creates a new [`Encoder`] that will write to `writer` with default
    /// options.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, WriteOptions::default())
    }

    /// Creates a new [`Encoder`] with the given options.
    pub fn with_options(writer: W, options: WriteOptions) -> Self {
        Self {
            writer,
            options,
            refs: HashMap::new(),
            pinned: Vec::new(),
            next_ref: 0,
        }
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Returns a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consumes the encoder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Encodes one complete message: a version byte followed by the payload
    /// for `value`.
    ///
    /// # Errors
    /// This function returns an error if it is unable to write to the
    /// underlying writer or `value` contains something the wire cannot
    /// represent.
    pub fn encode(&mut self, value: &Value) -> Result<()> {
        self.writer
            .write_u8(BOSON_VERSION)
            .map_err(|e| Error::io(e, "writing version byte"))?;
        let result = self.write_value(value);
        // the reference table lives only for this call
        self.refs.clear();
        self.pinned.clear();
        self.next_ref = 0;
        result
    }

    fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.write_tag(Tag::Null),
            Value::Byte(v) => {
                self.write_tag(Tag::Byte)?;
                self.writer
                    .write_i8(*v)
                    .map_err(|e| Error::io(e, "writing byte payload"))
            }
            Value::Short(v) => {
                self.write_tag(Tag::Short)?;
                self.write_i16(*v)
            }
            Value::Int(v) => {
                self.write_tag(Tag::Int)?;
                self.write_i32(*v)
            }
            Value::Long(v) => {
                self.write_tag(Tag::Long)?;
                self.write_i64(*v)
            }
            Value::Float(v) => {
                self.write_tag(Tag::Float)?;
                self.writer
                    .write_f32::<BigEndian>(*v)
                    .map_err(|e| Error::io(e, "writing float payload"))
            }
            Value::Double(v) => {
                self.write_tag(Tag::Double)?;
                self.writer
                    .write_f64::<BigEndian>(*v)
                    .map_err(|e| Error::io(e, "writing double payload"))
            }
            Value::Bool(v) => {
                self.write_tag(Tag::Boolean)?;
                self.writer
                    .write_u8(u8::from(*v))
                    .map_err(|e| Error::io(e, "writing boolean payload"))
            }
            Value::Char(c) => {
                let unit = u16::try_from(u32::from(*c)).map_err(|_| {
                    Error::unsupported_value(format!(
                        "char {c:?} is outside the Basic Multilingual Plane"
                    ))
                })?;
                self.write_tag(Tag::Char)?;
                self.writer
                    .write_u16::<BigEndian>(unit)
                    .map_err(|e| Error::io(e, "writing char payload"))
            }
            Value::String(s) => {
                self.write_tag(Tag::String)?;
                self.write_string(s)
            }
            Value::Bytes(bytes) => {
                self.write_tag(Tag::ByteArray)?;
                self.write_len(bytes.len(), "byte array")?;
                self.write_bytes(bytes)
            }
            Value::List(items) => {
                self.write_tag(Tag::List)?;
                self.write_len(items.len(), "list")?;
                for item in items {
                    self.write_value(item)?;
                }
                Ok(())
            }
            Value::Set(items) => {
                self.write_tag(Tag::Set)?;
                self.write_len(items.len(), "set")?;
                for item in items {
                    self.write_value(item)?;
                }
                Ok(())
            }
            Value::Map(pairs) => {
                self.write_tag(Tag::Map)?;
                self.write_len(pairs.len(), "map")?;
                for (key, val) in pairs {
                    self.write_value(key)?;
                    self.write_value(val)?;
                }
                Ok(())
            }
            Value::Array(array) => {
                self.write_tag(Tag::Array)?;
                self.write_len(array.elems.len(), "array")?;
                self.write_string(&array.component)?;
                for elem in &array.elems {
                    self.write_value(elem)?;
                }
                Ok(())
            }
            Value::Enum(value) => {
                self.write_tag(Tag::Enum)?;
                self.write_string(&value.type_name)?;
                self.write_string(&value.constant)
            }
            Value::Record(handle) => self.write_record(handle),
            Value::Timestamp(instant) => {
                self.write_tag(Tag::Date)?;
                self.write_i64(temporal::timestamp_to_millis(*instant))
            }
            Value::LocalDate(date) => {
                self.write_tag(Tag::LocalDate)?;
                self.write_i64(temporal::date_to_epoch_day(*date))
            }
            Value::LocalDateTime(date_time) => {
                self.write_tag(Tag::LocalDateTime)?;
                let rendered = temporal::format_local_date_time(*date_time)?;
                self.write_string(&rendered)
            }
            Value::LocalTime(time) => {
                self.write_tag(Tag::LocalTime)?;
                let rendered = temporal::format_local_time(*time)?;
                self.write_string(&rendered)
            }
            Value::Duration(duration) => {
                self.write_tag(Tag::Duration)?;
                self.write_string(&temporal::format_duration(*duration))
            }
            Value::Period(period) => {
                self.write_tag(Tag::Period)?;
                self.write_string(&period.to_string())
            }
            Value::Interval(interval) => {
                self.write_tag(Tag::JodaInterval)?;
                self.write_string(&interval.to_string())
            }
            Value::Uuid(uuid) => {
                self.write_tag(Tag::Uuid)?;
                self.write_bytes(uuid.as_bytes())
            }
        }
    }

    fn write_record(&mut self, handle: &RecordHandle) -> Result<()> {
        if let Some(&id) = self.refs.get(&handle.identity()) {
            self.write_tag(Tag::Reference)?;
            return self.write_i32(id as i32);
        }
        let id = self.next_ref;
        self.next_ref += 1;
        // table entry goes in before descending so cycles terminate
        self.refs.insert(handle.identity(), id);
        self.pinned.push(handle.clone());

        let record = handle.borrow();
        self.write_tag(Tag::Record)?;
        self.write_i32(id as i32)?;
        self.write_string(record.type_name())?;

        if let Some(map) = record.as_any().downcast_ref::<MapRecord>() {
            self.write_len(map.len(), "record fields")?;
            for (name, value) in map.entries() {
                self.write_string(name)?;
                self.write_value(value)?;
            }
            return Ok(());
        }

        let Some(descriptor) = introspect::introspect_record(&*record) else {
            return Err(Error::unsupported_value(format!(
                "record class `{}` has no slot layout",
                record.type_name()
            )));
        };
        let included: Vec<_> = descriptor
            .slots
            .iter()
            .filter(|slot| !slot.readonly || self.options.serialize_readonly_fields)
            .collect();
        self.write_len(included.len(), "record fields")?;
        for slot in included {
            self.write_string(slot.wire_name)?;
            let value = (slot.get)(record.as_any());
            self.write_value(&value)?;
        }
        Ok(())
    }

    fn write_tag(&mut self, tag: Tag) -> Result<()> {
        self.writer
            .write_u8(tag.into())
            .map_err(|e| Error::io(e, "writing tag"))
    }

    fn write_i16(&mut self, v: i16) -> Result<()> {
        self.writer
            .write_i16::<BigEndian>(v)
            .map_err(|e| Error::io(e, "writing int16"))
    }

    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.writer
            .write_i32::<BigEndian>(v)
            .map_err(|e| Error::io(e, "writing int32"))
    }

    fn write_i64(&mut self, v: i64) -> Result<()> {
        self.writer
            .write_i64::<BigEndian>(v)
            .map_err(|e| Error::io(e, "writing int64"))
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .write_all(bytes)
            .map_err(|e| Error::io(e, "writing raw bytes"))
    }

    fn write_string(&mut self, s: &str) -> Result<()> {
        let bytes = s.as_bytes();
        // the prefix counts UTF-8 bytes, not code points
        let len = i32::try_from(bytes.len()).map_err(|_| {
            Error::unsupported_value(format!(
                "string of {} bytes exceeds the wire's length prefix",
                bytes.len()
            ))
        })?;
        self.write_i32(len)?;
        self.write_bytes(bytes)
    }

    fn write_len(&mut self, len: usize, what: &str) -> Result<()> {
        let len = i32::try_from(len).map_err(|_| {
            Error::unsupported_value(format!(
                "{what} with {len} elements exceeds the wire's length prefix"
            ))
        })?;
        self.write_i32(len)
    }
}

/// Encodes `value` as one complete Boson message.
///
/// # Errors
/// This function returns an error if `value` contains something the wire
/// cannot represent.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    encode_with_options(value, WriteOptions::default())
}

/// Encodes `value` as one complete Boson message with explicit options.
///
/// # Errors
/// This function returns an error if `value` contains something the wire
/// cannot represent.
pub fn encode_with_options(value: &Value, options: WriteOptions) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    Encoder::with_options(&mut buffer, options).encode(value)?;
    Ok(buffer)
}
