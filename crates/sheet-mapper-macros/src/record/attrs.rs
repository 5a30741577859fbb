//! Attribute parsing for the SheetRecord derive macro.
//!
//! Parses the `#[sheet(...)]` field attributes. Each attribute is a comma
//! separated list of a metadata string literal, flags (`embed`,
//! `collection`, `skip`) and `name = "value"` pairs (`tag`, `meta`,
//! `rename`).

use proc_macro2::Span;
use syn::{
    parse::{Parse, ParseStream},
    spanned::Spanned,
    Attribute, Error, Expr, ExprLit, Lit, LitStr, Meta, Result, Token,
};

/// One `#[sheet(...)]` attribute.
#[derive(Debug, Clone)]
pub struct SheetAttr {
    /// Attribute key the metadata is stored under; `None` means the default key.
    pub tag: Option<String>,
    /// The metadata string.
    pub meta: Option<String>,
    pub embed: bool,
    pub collection: bool,
    pub skip: bool,
    pub rename: Option<String>,
    /// The span for error reporting.
    pub span: Span,
}

impl Default for SheetAttr {
    fn default() -> Self {
        SheetAttr {
            tag: None,
            meta: None,
            embed: false,
            collection: false,
            skip: false,
            rename: None,
            span: Span::call_site(),
        }
    }
}

fn string_value(expr: &Expr, name: &str) -> Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        other => Err(Error::new(
            other.span(),
            format!("{} must be a string literal", name),
        )),
    }
}

impl SheetAttr {
    fn set_meta(&mut self, value: String, span: Span) -> Result<()> {
        if self.meta.is_some() {
            return Err(Error::new(
                span,
                "metadata given twice; use a separate #[sheet] attribute per tag",
            ));
        }
        self.meta = Some(value);
        Ok(())
    }

    fn apply(&mut self, meta: Meta) -> Result<()> {
        match &meta {
            Meta::Path(p) => {
                if p.is_ident("embed") {
                    self.embed = true;
                } else if p.is_ident("collection") {
                    self.collection = true;
                } else if p.is_ident("skip") {
                    self.skip = true;
                } else {
                    return Err(Error::new(
                        p.span(),
                        "unknown sheet flag. Expected: embed, collection, or skip",
                    ));
                }
            }
            Meta::NameValue(nv) => {
                if nv.path.is_ident("tag") {
                    self.tag = Some(string_value(&nv.value, "tag")?);
                } else if nv.path.is_ident("meta") {
                    let value = string_value(&nv.value, "meta")?;
                    self.set_meta(value, nv.value.span())?;
                } else if nv.path.is_ident("rename") {
                    self.rename = Some(string_value(&nv.value, "rename")?);
                } else {
                    return Err(Error::new(
                        nv.path.span(),
                        "unknown attribute. Expected: tag, meta, or rename",
                    ));
                }
            }
            Meta::List(list) => {
                return Err(Error::new(
                    list.span(),
                    "unexpected list. Expected: \"metadata\", embed, collection, skip, tag = \"...\", meta = \"...\", or rename = \"...\"",
                ));
            }
        }
        Ok(())
    }
}

impl Parse for SheetAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = SheetAttr {
            span: input.span(),
            ..SheetAttr::default()
        };

        while !input.is_empty() {
            if input.peek(LitStr) {
                let lit: LitStr = input.parse()?;
                attr.set_meta(lit.value(), lit.span())?;
            } else {
                let meta: Meta = input.parse()?;
                attr.apply(meta)?;
            }

            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }

        if attr.tag.is_some() && attr.meta.is_none() {
            return Err(Error::new(attr.span, "tag = \"...\" needs metadata to store"));
        }
        if attr.embed && attr.collection {
            return Err(Error::new(
                attr.span,
                "a field cannot be both embed and collection",
            ));
        }

        Ok(attr)
    }
}

/// Merged view of every `#[sheet(...)]` attribute on one field.
#[derive(Debug, Clone, Default)]
pub struct FieldAttrs {
    /// `(key, metadata)` pairs in attribute order; `None` is the default key.
    pub metas: Vec<(Option<String>, String)>,
    pub embed: bool,
    pub collection: bool,
    pub skip: bool,
    pub rename: Option<String>,
    /// Whether any `#[sheet]` attribute was present.
    pub present: bool,
}

/// Extract and merge `#[sheet(...)]` attributes from a field's attributes.
pub fn parse_sheet_attrs(attrs: &[Attribute]) -> Result<FieldAttrs> {
    let mut merged = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("sheet") {
            continue;
        }
        merged.present = true;

        let parsed = match &attr.meta {
            Meta::Path(_) => SheetAttr::default(),
            _ => attr.parse_args::<SheetAttr>()?,
        };
        if let Some(meta) = parsed.meta {
            merged.metas.push((parsed.tag, meta));
        }
        merged.embed |= parsed.embed;
        merged.collection |= parsed.collection;
        merged.skip |= parsed.skip;
        if parsed.rename.is_some() {
            merged.rename = parsed.rename;
        }
    }

    if merged.embed && merged.collection {
        return Err(Error::new(
            Span::call_site(),
            "a field cannot be both embed and collection",
        ));
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_sheet(tokens: &str) -> Result<SheetAttr> {
        syn::parse_str::<SheetAttr>(tokens)
    }

    #[test]
    fn test_literal_meta() {
        let attr = parse_sheet(r#""header:Name;width:20""#).unwrap();
        assert_eq!(attr.meta.as_deref(), Some("header:Name;width:20"));
        assert_eq!(attr.tag, None);
        assert!(!attr.embed);
    }

    #[test]
    fn test_tag_and_meta() {
        let attr = parse_sheet(r#"tag = "xlsx", meta = "header:Id""#).unwrap();
        assert_eq!(attr.tag.as_deref(), Some("xlsx"));
        assert_eq!(attr.meta.as_deref(), Some("header:Id"));
    }

    #[test]
    fn test_tag_with_literal() {
        let attr = parse_sheet(r#"tag = "xlsx", "header:Id""#).unwrap();
        assert_eq!(attr.tag.as_deref(), Some("xlsx"));
        assert_eq!(attr.meta.as_deref(), Some("header:Id"));
    }

    #[test]
    fn test_flags() {
        let attr = parse_sheet("embed").unwrap();
        assert!(attr.embed);
        let attr = parse_sheet(r#"collection, "dynamic:$1/$2""#).unwrap();
        assert!(attr.collection);
        assert_eq!(attr.meta.as_deref(), Some("dynamic:$1/$2"));
        assert!(parse_sheet("skip").unwrap().skip);
    }

    #[test]
    fn test_rename() {
        let attr = parse_sheet(r#"rename = "Values", "header:V""#).unwrap();
        assert_eq!(attr.rename.as_deref(), Some("Values"));
    }

    #[test]
    fn test_trailing_comma() {
        let attr = parse_sheet(r#""header:A","#).unwrap();
        assert_eq!(attr.meta.as_deref(), Some("header:A"));
    }

    #[test]
    fn test_double_meta_rejected() {
        let err = parse_sheet(r#""header:A", meta = "header:B""#).unwrap_err();
        assert!(err.to_string().contains("metadata given twice"));
    }

    #[test]
    fn test_tag_without_meta_rejected() {
        assert!(parse_sheet(r#"tag = "xlsx""#).is_err());
    }

    #[test]
    fn test_embed_and_collection_rejected() {
        assert!(parse_sheet("embed, collection").is_err());
    }

    #[test]
    fn test_unknown_flag() {
        let err = parse_sheet("flatten").unwrap_err();
        assert!(err.to_string().contains("unknown sheet flag"));
    }

    #[test]
    fn test_non_string_value() {
        let err = parse_sheet("rename = 3").unwrap_err();
        assert!(err.to_string().contains("rename must be a string literal"));
    }

    #[test]
    fn test_merge_attributes() {
        let field: syn::Field = syn::parse_quote! {
            #[sheet("header:Name")]
            #[sheet(tag = "alt", meta = "header:Nom")]
            #[serde(rename = "n")]
            name: String
        };
        let merged = parse_sheet_attrs(&field.attrs).unwrap();
        assert!(merged.present);
        assert_eq!(
            merged.metas,
            vec![
                (None, "header:Name".to_string()),
                (Some("alt".to_string()), "header:Nom".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_sheet_attribute() {
        let field: syn::Field = syn::parse_quote! {
            #[doc = "plain"]
            name: String
        };
        let merged = parse_sheet_attrs(&field.attrs).unwrap();
        assert!(!merged.present);
        assert!(merged.metas.is_empty());
    }

    #[test]
    fn test_bare_sheet_attribute() {
        let field: syn::Field = syn::parse_quote! {
            #[sheet]
            name: String
        };
        let merged = parse_sheet_attrs(&field.attrs).unwrap();
        assert!(merged.present);
        assert!(merged.metas.is_empty());
    }
}
