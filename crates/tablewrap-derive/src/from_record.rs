//! FromRecord derive macro implementation

use crate::attrs::{container_attr, field_attr};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "FromRecord can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "FromRecord can only be derived for structs",
            ));
        }
    };

    let container = container_attr(&input.attrs)?;

    let mut columns = Vec::new();
    let mut field_extracts = Vec::new();
    for field in fields {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let attr = field_attr(&field.attrs)?;

        if attr.skip {
            field_extracts.push(quote! {
                #field_name: ::core::default::Default::default()
            });
            continue;
        }

        let column_name = match (attr.column, container.rename_all) {
            (Some(column), _) => column,
            (None, Some(rule)) => rule.apply(&field_name.to_string()),
            (None, None) => field_name.to_string(),
        };

        field_extracts.push(quote! {
            #field_name: record.try_get(#column_name)?
        });
        columns.push(column_name);
    }

    Ok(quote! {
        impl #impl_generics ::tablewrap::FromRecord for #name #ty_generics #where_clause {
            const COLUMNS: &'static [&'static str] = &[#(#columns),*];

            fn from_record(record: &::tablewrap::Record) -> ::tablewrap::TableResult<Self> {
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}
