//! Parsing of the `#[boson(...)]` attribute namespace.

use syn::{Attribute, LitStr};

/// Attributes recognized on a record struct or wire enum.
#[derive(Default)]
pub struct TypeAttrs {
    pub name: Option<String>,
    pub ignore_inherited: bool,
}

/// Attributes recognized on a record field.
#[derive(Default)]
pub struct FieldAttrs {
    pub rename: Option<String>,
    pub ignore: bool,
    pub transient: bool,
    pub readonly: bool,
    pub extends: bool,
}

pub fn type_attrs(attrs: &[Attribute]) -> syn::Result<TypeAttrs> {
    let mut out = TypeAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("boson") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                out.name = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("ignore_inherited") {
                out.ignore_inherited = true;
                Ok(())
            } else {
                Err(meta.error("unrecognized boson attribute for a type"))
            }
        })?;
    }
    Ok(out)
}

pub fn field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("boson") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                out.rename = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("ignore") {
                out.ignore = true;
                Ok(())
            } else if meta.path.is_ident("transient") {
                out.transient = true;
                Ok(())
            } else if meta.path.is_ident("readonly") {
                out.readonly = true;
                Ok(())
            } else if meta.path.is_ident("extends") {
                out.extends = true;
                Ok(())
            } else {
                Err(meta.error("unrecognized boson attribute for a field"))
            }
        })?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use quote::quote;
    use syn::FieldsNamed;

    use super::*;

    fn first_field_attrs(input: proc_macro2::TokenStream) -> FieldAttrs {
        let fields = syn::parse2::<FieldsNamed>(input).unwrap();
        field_attrs(&fields.named.first().unwrap().attrs).unwrap()
    }

    #[test]
    fn field_attrs_blank() {
        let attrs = first_field_attrs(quote!({
            pub value: i32,
        }));
        assert!(attrs.rename.is_none());
        assert!(!attrs.ignore && !attrs.transient && !attrs.readonly && !attrs.extends);
    }

    #[test]
    fn field_attrs_combined() {
        let attrs = first_field_attrs(quote!({
            #[boson(rename = "x", readonly)]
            pub value: i32,
        }));
        assert_eq!(attrs.rename.as_deref(), Some("x"));
        assert!(attrs.readonly);
        assert!(!attrs.ignore);
    }

    #[test]
    fn unknown_field_attr_is_rejected() {
        let fields = syn::parse2::<FieldsNamed>(quote!({
            #[boson(sparkle)]
            pub value: i32,
        }))
        .unwrap();
        assert!(field_attrs(&fields.named.first().unwrap().attrs).is_err());
    }

    #[test]
    fn type_attrs_name_and_flag() {
        let input: syn::DeriveInput = syn::parse2(quote! {
            #[boson(name = "demo.T", ignore_inherited)]
            struct T {}
        })
        .unwrap();
        let attrs = type_attrs(&input.attrs).unwrap();
        assert_eq!(attrs.name.as_deref(), Some("demo.T"));
        assert!(attrs.ignore_inherited);
    }
}
