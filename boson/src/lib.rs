//! A self-describing binary serialization format for arbitrary object
//! graphs, including graphs that contain cycles and shared substructure.
//!
//! Every message is one version byte followed by a single tagged payload.
//! Primitives and containers are written inline; records carry a class name
//! and a reference id, and every later occurrence of the same instance is a
//! back-reference to that id, which is how cycles survive a round trip.
//!
//! ## Values
//!
//! ```
//! use boson::{decode, encode, Value};
//!
//! let value = Value::Map(vec![(Value::string("a"), Value::Int(1))]);
//! let bytes = encode(&value)?;
//! assert_eq!(decode(&bytes)?, value);
//! # Ok::<(), boson::Error>(())
//! ```
//!
//! ## Records
//!
//! Annotate a struct with `#[derive(Record)]` and register it before
//! decoding. Slots may opt out of serialization or rename themselves through
//! the `#[boson(...)]` attribute.
//!
//! ```
//! use boson::{decode, encode, register, Record, RecordHandle, Value};
//!
//! #[derive(Default, Record)]
//! #[boson(name = "readme.Task")]
//! struct Task {
//!     title: String,
//!     #[boson(rename = "prio")]
//!     priority: i32,
//!     #[boson(ignore)]
//!     dirty: bool,
//! }
//!
//! register::<Task>();
//! let task = RecordHandle::new(Task {
//!     title: "write docs".to_owned(),
//!     priority: 2,
//!     dirty: true,
//! });
//! let bytes = encode(&Value::Record(task))?;
//! let decoded = decode(&bytes)?;
//! let Value::Record(handle) = decoded else { unreachable!() };
//! let task = handle.get::<Task>().unwrap();
//! assert_eq!(task.title, "write docs");
//! assert_eq!(task.priority, 2);
//! // ignored slots come back as their constructor defaults
//! assert!(!task.dirty);
//! # Ok::<(), boson::Error>(())
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(clippy::missing_errors_doc)]

// Lets code generated by the derives name this crate `::boson` even from
// within the crate's own tests.
extern crate self as boson;

pub mod decode;
pub mod encode;
pub mod error;
pub mod introspect;
pub mod record;
pub mod tag;
pub mod temporal;
pub mod value;

pub use boson_macros::{Record, WireEnum};

pub use crate::{
    decode::{decode, decode_from, decode_with_options, Decoder, ReadOptions},
    encode::{encode, encode_with_options, Encoder, WriteOptions},
    error::{Error, Result},
    introspect::{register, register_enum, register_with},
    record::{MapRecord, Record, RecordHandle, RecordType},
    tag::Tag,
    temporal::{Interval, Period},
    value::{ArrayValue, EnumValue, FromValue, IntoValue, Value, ValueKind, WireEnum},
};

/// The wire-format version this crate reads and writes: the single byte at
/// the head of every message.
pub const BOSON_VERSION: u8 = 1;
