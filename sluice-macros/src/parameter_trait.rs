use crate::decode_field::FieldMetadata;
use proc_macro2::TokenStream;
use quote::quote;
use syn::ItemStruct;

pub(crate) fn parameter_trait(item: &ItemStruct, fields: &[FieldMetadata]) -> TokenStream {
    let name = &item.ident;
    let values = fields
        .iter()
        .filter(|f| !f.skip && f.nested.is_none())
        .collect::<Vec<_>>();
    let getters = values.iter().map(|f| {
        let property = &f.name;
        let ident = &f.ident;
        quote! {
            #property => Ok(::sluice::AsValue::as_value(::std::clone::Clone::clone(&self.#ident)))
        }
    });
    let setter_types = values.iter().map(|f| {
        let property = &f.name;
        let ty = &f.ty;
        quote!(#property => Some(<#ty as ::sluice::AsValue>::DATA_TYPE))
    });
    let setters = values.iter().map(|f| {
        let property = &f.name;
        let ident = &f.ident;
        let ty = &f.ty;
        quote! {
            #property => {
                self.#ident = <#ty as ::sluice::AsValue>::try_from_value(value)?;
                Ok(())
            }
        }
    });
    quote! {
        impl ::sluice::Parameter for #name {
            fn type_name(&self) -> &'static str {
                ::std::any::type_name::<Self>()
            }

            fn property(&self, name: &str) -> ::sluice::Result<::sluice::Value> {
                match name {
                    #(#getters,)*
                    _ => Err(::sluice::Error::new(::sluice::ErrorKind::Binding(format!(
                        "No getter for the property `{}` in `{}`",
                        name,
                        ::std::any::type_name::<Self>()
                    )))),
                }
            }

            fn setter_type(&self, name: &str) -> ::std::option::Option<::sluice::DataType> {
                match name {
                    #(#setter_types,)*
                    _ => None,
                }
            }

            fn set_property(&mut self, name: &str, value: ::sluice::Value) -> ::sluice::Result<()> {
                match name {
                    #(#setters)*
                    _ => Err(::sluice::Error::new(::sluice::ErrorKind::Configuration(format!(
                        "No setter found for the property `{}` in `{}`",
                        name,
                        ::std::any::type_name::<Self>()
                    )))),
                }
            }
        }
    }
}
