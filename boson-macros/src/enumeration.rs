//! Code generation for `#[derive(WireEnum)]`.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

use crate::attr::type_attrs;
use crate::utils::crate_path;

pub fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "#[derive(WireEnum)] requires an enum",
        ));
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "#[derive(WireEnum)] requires at least one variant",
        ));
    }
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "#[derive(WireEnum)] requires fieldless variants",
            ));
        }
    }

    let type_attrs = type_attrs(&input.attrs)?;
    let ident = &input.ident;
    let krate = crate_path();
    let wire_name = type_attrs.name.unwrap_or_else(|| ident.to_string());

    let variant_idents: Vec<_> = data.variants.iter().map(|v| &v.ident).collect();
    let variant_names: Vec<_> = variant_idents.iter().map(|v| v.to_string()).collect();

    Ok(quote! {
        impl #krate::WireEnum for #ident {
            const NAME: &'static str = #wire_name;

            fn constant(&self) -> &'static str {
                match self {
                    #(Self::#variant_idents => #variant_names,)*
                }
            }

            fn from_constant(name: &str) -> ::core::option::Option<Self> {
                match name {
                    #(#variant_names => ::core::option::Option::Some(Self::#variant_idents),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn constants() -> &'static [&'static str] {
                &[#(#variant_names),*]
            }
        }

        impl #krate::IntoValue for #ident {
            fn into_value(self) -> #krate::Value {
                #krate::Value::Enum(#krate::EnumValue::new(
                    <Self as #krate::WireEnum>::NAME,
                    <Self as #krate::WireEnum>::constant(&self),
                ))
            }
        }

        impl #krate::FromValue for #ident {
            const KIND: #krate::ValueKind = #krate::ValueKind::Enum;

            fn from_value(value: #krate::Value) -> #krate::Result<Self> {
                match value {
                    #krate::Value::Enum(value)
                        if value.type_name == <Self as #krate::WireEnum>::NAME =>
                    {
                        <Self as #krate::WireEnum>::from_constant(&value.constant).ok_or_else(
                            || {
                                #krate::Error::invalid_data(::std::format!(
                                    "enum `{}` has no constant `{}`",
                                    <Self as #krate::WireEnum>::NAME,
                                    value.constant,
                                ))
                            },
                        )
                    }
                    other => ::core::result::Result::Err(#krate::Error::invalid_data(
                        ::std::format!(
                            "expected `{}` enum value, found {:?}",
                            <Self as #krate::WireEnum>::NAME,
                            other.kind(),
                        ),
                    )),
                }
            }
        }
    })
}
