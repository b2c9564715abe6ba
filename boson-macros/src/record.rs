//! Code generation for `#[derive(Record)]`.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DataStruct, DeriveInput, Fields};

use crate::attr::{field_attrs, type_attrs};
use crate::utils::crate_path;

pub fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    let Data::Struct(DataStruct {
        fields: Fields::Named(fields),
        ..
    }) = &input.data
    else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "#[derive(Record)] requires a struct with named fields",
        ));
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[derive(Record)] does not support generic record types",
        ));
    }

    let type_attrs = type_attrs(&input.attrs)?;
    let ident = &input.ident;
    let krate = crate_path();
    let wire_name = type_attrs.name.unwrap_or_else(|| ident.to_string());
    let ignore_inherited = type_attrs.ignore_inherited;

    let mut parent = quote!(::core::option::Option::None);
    let mut found_parent = false;
    let mut slots = Vec::new();
    let mut seen_names: Vec<String> = Vec::new();

    for field in &fields.named {
        let attrs = field_attrs(&field.attrs)?;
        let field_ident = field.ident.as_ref().unwrap();
        let ty = &field.ty;

        if attrs.extends {
            if found_parent {
                return Err(syn::Error::new_spanned(
                    field,
                    "at most one field may carry #[boson(extends)]",
                ));
            }
            found_parent = true;
            parent = quote! {
                ::core::option::Option::Some(#krate::introspect::ParentLink {
                    name: <#ty as #krate::RecordType>::NAME,
                    descriptor: <#ty as #krate::RecordType>::descriptor,
                    project: {
                        fn project(any: &dyn ::core::any::Any) -> &dyn ::core::any::Any {
                            let record = any
                                .downcast_ref::<#ident>()
                                .expect("record type mismatch");
                            &record.#field_ident
                        }
                        project
                    },
                    project_mut: {
                        fn project_mut(
                            any: &mut dyn ::core::any::Any,
                        ) -> &mut dyn ::core::any::Any {
                            let record = any
                                .downcast_mut::<#ident>()
                                .expect("record type mismatch");
                            &mut record.#field_ident
                        }
                        project_mut
                    },
                })
            };
            continue;
        }

        let declared = field_ident.to_string();
        let external = attrs.rename.clone().unwrap_or_else(|| declared.clone());
        if seen_names.contains(&external) {
            return Err(syn::Error::new_spanned(
                field,
                format!("duplicate external field name `{external}`"),
            ));
        }
        seen_names.push(external);

        let rename = match &attrs.rename {
            Some(name) => quote!(::core::option::Option::Some(#name)),
            None => quote!(::core::option::Option::None),
        };
        let transient = attrs.transient;
        let ignore = attrs.ignore;
        let readonly = attrs.readonly;
        slots.push(quote! {
            #krate::introspect::SlotDescriptor {
                name: #declared,
                rename: #rename,
                transient: #transient,
                ignore: #ignore,
                readonly: #readonly,
                kind: <#ty as #krate::FromValue>::KIND,
                get: |any| {
                    let record = any
                        .downcast_ref::<#ident>()
                        .expect("record type mismatch");
                    #krate::IntoValue::into_value(::core::clone::Clone::clone(
                        &record.#field_ident,
                    ))
                },
                set: |any, value| {
                    let record = any
                        .downcast_mut::<#ident>()
                        .expect("record type mismatch");
                    record.#field_ident = <#ty as #krate::FromValue>::from_value(value)?;
                    ::core::result::Result::Ok(())
                },
            }
        });
    }

    Ok(quote! {
        impl #krate::Record for #ident {
            fn type_name(&self) -> &str {
                <Self as #krate::RecordType>::NAME
            }

            fn raw_descriptor(
                &self,
            ) -> ::core::option::Option<::std::sync::Arc<#krate::introspect::RecordDescriptor>>
            {
                ::core::option::Option::Some(<Self as #krate::RecordType>::descriptor())
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }
        }

        impl #krate::RecordType for #ident {
            const NAME: &'static str = #wire_name;

            fn descriptor() -> ::std::sync::Arc<#krate::introspect::RecordDescriptor> {
                static DESCRIPTOR: ::std::sync::OnceLock<
                    ::std::sync::Arc<#krate::introspect::RecordDescriptor>,
                > = ::std::sync::OnceLock::new();
                DESCRIPTOR
                    .get_or_init(|| {
                        ::std::sync::Arc::new(#krate::introspect::RecordDescriptor {
                            name: <Self as #krate::RecordType>::NAME,
                            parent: #parent,
                            ignore_inherited: #ignore_inherited,
                            slots: ::std::vec![#(#slots),*],
                        })
                    })
                    .clone()
            }
        }

        impl #krate::IntoValue for #ident {
            fn into_value(self) -> #krate::Value {
                #krate::Value::Record(#krate::RecordHandle::new(self))
            }
        }
    })
}
