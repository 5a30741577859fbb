//! Implementation of the `#[derive(SheetRecord)]` macro.
//!
//! Generates `SheetRecord::sheet_schema` with one `FieldDef` per annotated
//! field. Getters are non-capturing closures over `Self`.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    spanned::Spanned, Data, DeriveInput, Error, Fields, GenericArgument, PathArguments, Result,
    Type,
};

use super::attrs::parse_sheet_attrs;

/// Main implementation of the SheetRecord derive macro.
pub fn sheet_record_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new(
                    input.span(),
                    "SheetRecord can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.span(),
                "SheetRecord can only be derived for structs",
            ))
        }
    };

    let mut field_defs: Vec<TokenStream> = Vec::new();

    for field in fields.iter() {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new(field.span(), "expected named field"))?;

        let attrs = parse_sheet_attrs(&field.attrs)?;
        if !attrs.present || attrs.skip {
            continue;
        }

        let name = attrs.rename.clone().unwrap_or_else(|| ident.to_string());

        let base = if attrs.embed {
            if option_inner(&field.ty).is_some() {
                quote! {
                    ::sheet_mapper::FieldDef::embedded_optional_record(
                        #name,
                        |r: &Self| r.#ident.as_ref(),
                    )
                }
            } else {
                quote! {
                    ::sheet_mapper::FieldDef::embedded_record(#name, |r: &Self| &r.#ident)
                }
            }
        } else if attrs.collection {
            quote! {
                ::sheet_mapper::FieldDef::collection_record(#name, |r: &Self| &r.#ident[..])
            }
        } else {
            quote! {
                ::sheet_mapper::FieldDef::value(#name, |r: &Self| &r.#ident)
            }
        };

        let tags = attrs.metas.iter().map(|(key, meta)| match key {
            Some(key) => quote! { .tag(#key, #meta) },
            None => quote! { .tag(::sheet_mapper::DEFAULT_TAG_KEY, #meta) },
        });

        field_defs.push(quote! {
            .field(#base #(#tags)*)
        });
    }

    let expanded = quote! {
        impl #impl_generics ::sheet_mapper::SheetRecord for #struct_name #ty_generics #where_clause {
            fn sheet_schema() -> ::sheet_mapper::Schema<Self> {
                ::sheet_mapper::Schema::builder()
                    #(#field_defs)*
                    .build()
            }
        }
    };

    Ok(expanded)
}

/// The `T` of a type written as `Option<T>` (any path ending in `Option`).
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
