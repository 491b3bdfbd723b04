//! Attribute parsing for the FromRecord derive macro.
//!
//! Handles struct-level and field-level `#[record(...)]` attributes.

use heck::{ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use syn::{Attribute, Result};

/// Column naming rule from `#[record(rename_all = "...")]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenameRule {
    CamelCase,
    SnakeCase,
    PascalCase,
    ScreamingSnakeCase,
}

impl RenameRule {
    fn from_lit(lit: &syn::LitStr) -> Result<Self> {
        match lit.value().as_str() {
            "camelCase" => Ok(Self::CamelCase),
            "snake_case" => Ok(Self::SnakeCase),
            "PascalCase" => Ok(Self::PascalCase),
            "SCREAMING_SNAKE_CASE" => Ok(Self::ScreamingSnakeCase),
            other => Err(syn::Error::new_spanned(
                lit,
                format!(
                    "unknown rename_all rule `{other}`; expected camelCase, snake_case, PascalCase or SCREAMING_SNAKE_CASE"
                ),
            )),
        }
    }

    pub(crate) fn apply(self, field: &str) -> String {
        match self {
            Self::CamelCase => field.to_lower_camel_case(),
            Self::SnakeCase => field.to_snake_case(),
            Self::PascalCase => field.to_upper_camel_case(),
            Self::ScreamingSnakeCase => field.to_shouty_snake_case(),
        }
    }
}

/// Parsed struct-level attribute.
#[derive(Default)]
pub(crate) struct ContainerAttr {
    pub rename_all: Option<RenameRule>,
}

/// Parsed field-level attribute.
#[derive(Default)]
pub(crate) struct FieldAttr {
    pub column: Option<String>,
    pub skip: bool,
}

impl syn::parse::Parse for ContainerAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = ContainerAttr::default();
        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident != "rename_all" {
                return Err(syn::Error::new_spanned(
                    &ident,
                    "unknown record attribute; expected `rename_all`",
                ));
            }
            let _: syn::Token![=] = input.parse()?;
            let value: syn::LitStr = input.parse()?;
            attr.rename_all = Some(RenameRule::from_lit(&value)?);

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(attr)
    }
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();
        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "skip" {
                attr.skip = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                attr.column = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    "unknown record attribute; expected `column` or `skip`",
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(attr)
    }
}

/// Merge every `#[record(...)]` attribute in `attrs`.
pub(crate) fn container_attr(attrs: &[Attribute]) -> Result<ContainerAttr> {
    let mut merged = ContainerAttr::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("record")) {
        let parsed: ContainerAttr = attr.parse_args()?;
        if parsed.rename_all.is_some() {
            merged.rename_all = parsed.rename_all;
        }
    }
    Ok(merged)
}

/// Merge every `#[record(...)]` attribute in `attrs`.
pub(crate) fn field_attr(attrs: &[Attribute]) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("record")) {
        let parsed: FieldAttr = attr.parse_args()?;
        merged.skip |= parsed.skip;
        if parsed.column.is_some() {
            merged.column = parsed.column;
        }
    }
    Ok(merged)
}
