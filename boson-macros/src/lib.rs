//! Proc macros for the `boson` crate.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod attr;
mod enumeration;
mod record;
mod utils;

/// Derives the record traits and slot layout for a struct with named fields.
///
/// The struct must implement `Default` (the decoder's zero-argument
/// construction path) and every serialized field must be `Clone`,
/// `IntoValue`, and `FromValue`.
///
/// Recognized `#[boson(...)]` attributes:
/// - on the struct: `name = "..."` overrides the wire class name
///   (defaults to the type name); `ignore_inherited` restricts the slot scan
///   to directly-declared fields.
/// - on a field: `rename = "..."` overrides the external name; `ignore`
///   excludes the field by directive; `transient` excludes it
///   unconditionally; `readonly` excludes it unless the encoder is asked to
///   serialize read-only fields; `extends` marks the one field that embeds a
///   parent record whose slots are merged into this record's field list.
#[proc_macro_derive(Record, attributes(boson))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.into_compile_error())
        .into()
}

/// Derives wire-enum support for a fieldless enum.
///
/// Constants are carried on the wire by variant name. The wire class name
/// defaults to the type name and can be overridden with
/// `#[boson(name = "...")]` on the enum.
#[proc_macro_derive(WireEnum, attributes(boson))]
pub fn derive_wire_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    enumeration::expand(input)
        .unwrap_or_else(|e| e.into_compile_error())
        .into()
}
