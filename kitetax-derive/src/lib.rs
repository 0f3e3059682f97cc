use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Lit, LitStr, Meta, Type};

/// Derive macro describing the CSV columns a record struct reads and writes.
///
/// Column names follow serde: a field-level `#[serde(rename = "...")]` wins,
/// otherwise a container-level `#[serde(rename_all = "...")]` is applied to
/// the field identifier. Fields marked `#[serde(skip)]` are left out.
///
/// A column is required unless its type is `Option<T>` or it carries
/// `#[serde(default)]`. The description is taken from the doc comment.
///
/// Generates `csv_schema() -> &'static [CsvField]` and
/// `csv_header() -> &'static [&'static str]`. `CsvField` must be in scope.
#[proc_macro_derive(CsvSchema, attributes(serde))]
pub fn derive_csv_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "CsvSchema only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "CsvSchema only supports structs")),
    };

    let rename_all = container_rename_all(&input.attrs)?;

    let mut columns = Vec::new();
    for field in fields {
        let serde = field_serde_attrs(&field.attrs)?;
        if serde.skip {
            continue;
        }
        let ident = field
            .ident
            .as_ref()
            .map(|i| i.to_string())
            .unwrap_or_default();
        let ident = ident.trim_start_matches("r#").to_string();
        let column = match serde.rename {
            Some(rename) => rename,
            None => apply_rename_all(&ident, rename_all.as_deref()),
        };
        let required = !serde.default && !is_option_type(&field.ty);
        columns.push((column, required, doc_comment(&field.attrs)));
    }

    let field_entries = columns.iter().map(|(name, required, desc)| {
        quote! {
            CsvField {
                name: #name,
                required: #required,
                description: #desc,
            }
        }
    });
    let header_entries = columns.iter().map(|(name, _, _)| quote! { #name });

    Ok(quote! {
        impl #name {
            pub fn csv_schema() -> &'static [CsvField] {
                static SCHEMA: &[CsvField] = &[
                    #(#field_entries),*
                ];
                SCHEMA
            }

            pub fn csv_header() -> &'static [&'static str] {
                static HEADER: &[&str] = &[
                    #(#header_entries),*
                ];
                HEADER
            }
        }
    })
}

#[derive(Default)]
struct FieldSerde {
    rename: Option<String>,
    default: bool,
    skip: bool,
}

fn container_rename_all(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename_all = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let value: LitStr = meta.value()?.parse()?;
                rename_all = Some(value.value());
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(rename_all)
}

fn field_serde_attrs(attrs: &[Attribute]) -> syn::Result<FieldSerde> {
    let mut serde = FieldSerde::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                serde.rename = Some(value.value());
            } else if meta.path.is_ident("default") {
                serde.default = true;
                skip_meta_value(&meta)?;
            } else if meta.path.is_ident("skip") {
                serde.skip = true;
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(serde)
}

// Consume `= value` or `(...)` of serde keys we don't interpret.
fn skip_meta_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let _ = meta.parse_nested_meta(|inner| skip_meta_value(&inner));
    }
    Ok(())
}

fn apply_rename_all(ident: &str, rule: Option<&str>) -> String {
    match rule {
        Some("camelCase") => {
            let mut out = String::with_capacity(ident.len());
            let mut upper_next = false;
            for ch in ident.chars() {
                if ch == '_' {
                    upper_next = !out.is_empty();
                } else if upper_next {
                    out.extend(ch.to_uppercase());
                    upper_next = false;
                } else {
                    out.push(ch);
                }
            }
            out
        }
        Some("kebab-case") => ident.replace('_', "-"),
        Some("lowercase") => ident.replace('_', "").to_lowercase(),
        Some("UPPERCASE") => ident.replace('_', "").to_uppercase(),
        Some("SCREAMING_SNAKE_CASE") => ident.to_uppercase(),
        _ => ident.to_string(),
    }
}

fn doc_comment(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(meta) => match &meta.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: Lit::Str(lit_str),
                    ..
                }) => Some(lit_str.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_option_type(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}
