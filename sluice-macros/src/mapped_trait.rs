use crate::decode_field::FieldMetadata;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Ident, ItemStruct, spanned::Spanned};

fn property_kind(field: &FieldMetadata) -> TokenStream {
    let ty = &field.ty;
    match &field.nested {
        Some(nested) => {
            let inner = &nested.inner;
            quote!(::sluice::PropertyKind::Object(::sluice::ResultType::of::<#inner>))
        }
        None => quote!(::sluice::PropertyKind::Value(<#ty as ::sluice::AsValue>::DATA_TYPE)),
    }
}

/// Conversion of a `::sluice::FieldValue` named `value` into the field type.
pub(crate) fn field_value(field: &FieldMetadata, value: TokenStream) -> TokenStream {
    let ty = &field.ty;
    match &field.nested {
        Some(nested) if nested.optional => {
            let inner = &nested.inner;
            quote!(#value.into_optional_object::<#inner>()?)
        }
        Some(..) => quote!(#value.into_object::<#ty>()?),
        None => quote!(#value.into_value::<#ty>()?),
    }
}

pub(crate) fn mapped_trait(item: &ItemStruct, fields: &[FieldMetadata]) -> TokenStream {
    let name = &item.ident;
    let mapped = fields.iter().filter(|f| !f.skip).collect::<Vec<_>>();
    let properties = mapped.iter().map(|f| {
        let property = &f.name;
        let kind = property_kind(f);
        let ty = &f.ty;
        let nullable = match &f.nested {
            Some(nested) => {
                let optional = nested.optional;
                quote!(#optional)
            }
            None => quote!(<#ty as ::sluice::AsValue>::NULLABLE),
        };
        quote! {
            ::sluice::PropertyDef {
                name: #property,
                kind: #kind,
                nullable: #nullable,
            }
        }
    });
    let params = mapped.iter().map(|f| property_kind(f));
    let arguments = fields.iter().map(|f| {
        let ident = &f.ident;
        if f.skip {
            quote!(#ident: ::std::default::Default::default())
        } else {
            let value = field_value(f, quote!(__next__()?));
            quote!(#ident: #value)
        }
    });
    let constructor_name = name.to_string();
    let trait_name = Ident::new(&format!("{}Instantiate", name), item.span());
    let factory_name = Ident::new(&format!("{}InstantiateFactory", name), item.span());
    quote! {
        impl ::sluice::Mapped for #name {
            fn properties() -> &'static [::sluice::PropertyDef] {
                static PROPERTIES: &[::sluice::PropertyDef] = &[#(#properties),*];
                PROPERTIES
            }

            fn constructors() -> &'static [::sluice::ConstructorDef] {
                fn build(
                    args: ::std::vec::Vec<::sluice::FieldValue>,
                ) -> ::sluice::Result<::std::boxed::Box<dyn ::sluice::Object>> {
                    let mut args = args.into_iter();
                    let mut __next__ = || {
                        args.next()
                            .ok_or_else(|| ::sluice::Error::msg("Missing constructor argument"))
                    };
                    Ok(::std::boxed::Box::new(#name {
                        #(#arguments),*
                    }))
                }
                static CONSTRUCTORS: &[::sluice::ConstructorDef] = &[::sluice::ConstructorDef {
                    name: #constructor_name,
                    marked: false,
                    params: &[#(#params),*],
                    build,
                }];
                CONSTRUCTORS
            }

            fn instantiate() -> ::std::option::Option<Self> {
                trait #trait_name {
                    fn instantiate() -> ::std::option::Option<#name>;
                }
                struct #factory_name<T>(::std::marker::PhantomData<T>);
                impl<T: ::std::default::Default + ::std::convert::Into<#name>> #factory_name<T> {
                    // Called when T has Default Trait
                    fn instantiate() -> ::std::option::Option<#name> {
                        Some(T::default().into())
                    }
                }
                impl<T> #trait_name for #factory_name<T> {
                    // Called when T doesn't have default trait
                    fn instantiate() -> ::std::option::Option<#name> {
                        None
                    }
                }
                #factory_name::<#name>::instantiate()
            }
        }
    }
}
