//! Shared helpers for the derive macros.

use proc_macro2::{Ident, Span, TokenStream};
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;

/// Resolves the path of the `boson` crate as seen from the deriving crate.
///
/// Inside `boson` itself the crate is reachable as `::boson` through its
/// `extern crate self` alias.
pub fn crate_path() -> TokenStream {
    match crate_name("boson") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) | Err(_) => quote!(::boson),
    }
}
