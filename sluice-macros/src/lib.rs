mod decode_field;
mod mapped_trait;
mod parameter_trait;

use decode_field::decode_field;
use mapped_trait::{field_value, mapped_trait};
use parameter_trait::parameter_trait;
use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

/// Derive `Object`, `Mapped` and `Parameter` for a struct with named fields.
///
/// Field attributes:
/// - `#[mapped(name = "property")]` renames the property.
/// - `#[mapped(skip)]` leaves the field out, it gets its `Default` value.
/// - `#[mapped(nested)]` marks a field (`T` or `Option<T>`) built by a nested result map.
#[proc_macro_derive(Mapped, attributes(mapped))]
pub fn derive_mapped(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    if !item.generics.params.is_empty() {
        panic!("Mapped cannot be derived for the generic struct `{}`", item.ident);
    }
    let name = &item.ident;
    let fields = item.fields.iter().map(decode_field).collect::<Vec<_>>();
    let assignments = fields.iter().filter(|f| !f.skip).map(|f| {
        let property = &f.name;
        let ident = &f.ident;
        let value = field_value(f, quote!(value));
        quote!(#property => self.#ident = #value)
    });
    let mapped = mapped_trait(&item, &fields);
    let parameter = parameter_trait(&item, &fields);
    quote! {
        impl ::sluice::Object for #name {
            fn assign(&mut self, property: &str, value: ::sluice::FieldValue) -> ::sluice::Result<()> {
                match property {
                    #(#assignments,)*
                    _ => {
                        return Err(::sluice::Error::msg(format!(
                            "`{}` has no property `{}`",
                            ::std::any::type_name::<Self>(),
                            property
                        )));
                    }
                }
                Ok(())
            }

            fn into_any(
                self: ::std::boxed::Box<Self>,
            ) -> ::std::boxed::Box<dyn ::std::any::Any + ::std::marker::Send> {
                self
            }
        }
        #mapped
        #parameter
    }
    .into()
}
