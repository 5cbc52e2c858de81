use syn::{Field, GenericArgument, Ident, LitStr, PathArguments, Type, parse::ParseBuffer};

pub(crate) struct FieldMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    /// Property name, the field name unless renamed.
    pub(crate) name: String,
    pub(crate) skip: bool,
    /// Object built by a nested result map, `Some` holds the inner type of an `Option`.
    pub(crate) nested: Option<NestedType>,
}

pub(crate) struct NestedType {
    pub(crate) inner: Type,
    pub(crate) optional: bool,
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    match arguments.args.first()? {
        GenericArgument::Type(v) => Some(v),
        _ => None,
    }
}

pub(crate) fn decode_field(field: &Field) -> FieldMetadata {
    let ident = field
        .ident
        .clone()
        .expect("Mapped can only be derived for structs with named fields");
    let mut metadata = FieldMetadata {
        name: ident.to_string(),
        ident,
        ty: field.ty.clone(),
        skip: false,
        nested: None,
    };
    let mut nested = false;
    for attr in &field.attrs {
        if !attr.path().is_ident("mapped") {
            continue;
        }
        let _ = attr.parse_nested_meta(|arg| {
            if arg.path.is_ident("name") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    panic!("Error while parsing `name`, use it like: `#[mapped(name = \"property\")]`");
                };
                metadata.name = v.value();
            } else if arg.path.is_ident("skip") {
                let Err(..) = arg.value() else {
                    panic!("Error while parsing `skip`, use it like: `#[mapped(skip)]`");
                };
                metadata.skip = true;
            } else if arg.path.is_ident("nested") {
                let Err(..) = arg.value() else {
                    panic!("Error while parsing `nested`, use it like: `#[mapped(nested)]`");
                };
                nested = true;
            } else {
                panic!(
                    "Unknown attribute `{}` on field `{}`, expected one of: name, skip, nested",
                    arg.path
                        .get_ident()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    metadata.ident
                );
            }
            Ok(())
        });
    }
    if nested {
        metadata.nested = Some(match option_inner(&field.ty) {
            Some(inner) => NestedType {
                inner: inner.clone(),
                optional: true,
            },
            None => NestedType {
                inner: field.ty.clone(),
                optional: false,
            },
        });
    }
    metadata
}
