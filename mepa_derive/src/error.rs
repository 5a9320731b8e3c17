//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations.
//! Replacement for the `thiserror` crate, covering the shapes the
//! interpreter's error types use.
//!
//! # Usage
//!
//! ```ignore
//! use mepa_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum MyError {
//!     #[error("not found: {0}")]
//!     NotFound(String),
//!
//!     #[error("invalid value: expected {expected}, got {actual}")]
//!     InvalidValue { expected: u32, actual: u32 },
//!
//!     #[error("unknown error")]
//!     Unknown,
//! }
//! ```
//!
//! Fields are interpolated with `{0}`, `{1}` for tuple variants and
//! `{field_name}` for struct variants. Fields the message does not mention
//! are simply not passed to the formatter, so context-only fields are fine.

use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// Derives `Display` and `Error` for an enum or a named-field struct.
///
/// Each variant (or the struct itself) must carry an `#[error("...")]`
/// attribute with the display message.
pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let display_body = match &input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(variant_arm)
                .collect::<syn::Result<Vec<_>>>()?;
            quote! { match self { #(#arms)* } }
        }
        Data::Struct(data) => struct_body(input, &data.fields)?,
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #display_body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Builds one `match` arm displaying an enum variant.
fn variant_arm(variant: &syn::Variant) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &variant.ident;
    let message = error_message(&variant.attrs, ident)?;

    Ok(match &variant.fields {
        Fields::Unit => quote! {
            Self::#ident => write!(f, #message),
        },
        Fields::Named(fields) => {
            let referenced: Vec<&Ident> = fields
                .named
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .filter(|ident| message_mentions(&message, &ident.to_string()))
                .collect();
            quote! {
                Self::#ident { #(#referenced,)* .. } =>
                    write!(f, #message #(, #referenced = #referenced)*),
            }
        }
        Fields::Unnamed(fields) => {
            let message = positional_to_named(&message, fields.unnamed.len());
            let bindings: Vec<Ident> = (0..fields.unnamed.len())
                .map(|i| {
                    if message_mentions(&message, &format!("f{i}")) {
                        format_ident!("f{i}")
                    } else {
                        format_ident!("_f{i}")
                    }
                })
                .collect();
            let referenced: Vec<&Ident> = bindings
                .iter()
                .filter(|ident| !ident.to_string().starts_with('_'))
                .collect();
            quote! {
                Self::#ident(#(#bindings),*) =>
                    write!(f, #message #(, #referenced = #referenced)*),
            }
        }
    })
}

/// Builds the `Display` body for a struct.
fn struct_body(input: &DeriveInput, fields: &Fields) -> syn::Result<proc_macro2::TokenStream> {
    let message = error_message(&input.attrs, &input.ident)?;

    match fields {
        Fields::Unit => Ok(quote! { write!(f, #message) }),
        Fields::Named(fields) => {
            let referenced: Vec<&Ident> = fields
                .named
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .filter(|ident| message_mentions(&message, &ident.to_string()))
                .collect();
            Ok(quote! {
                write!(f, #message #(, #referenced = &self.#referenced)*)
            })
        }
        Fields::Unnamed(_) => Err(syn::Error::new_spanned(
            input,
            "Error derive on tuple structs is not supported; use named fields",
        )),
    }
}

/// Extracts the message from an `#[error("...")]` attribute.
fn error_message<T: quote::ToTokens>(attrs: &[syn::Attribute], target: &T) -> syn::Result<String> {
    for attr in attrs {
        if attr.path().is_ident("error") {
            let lit: LitStr = attr.parse_args().map_err(|_| {
                syn::Error::new_spanned(
                    attr,
                    "invalid #[error] attribute: expected a string literal, \
                     e.g. #[error(\"division by zero\")]",
                )
            })?;
            return Ok(lit.value());
        }
    }

    Err(syn::Error::new_spanned(
        target,
        "missing #[error(\"...\")] attribute; every error variant must declare a display message",
    ))
}

/// Whether the format string interpolates the given name (`{name}` or `{name:...}`).
fn message_mentions(message: &str, name: &str) -> bool {
    message.contains(&format!("{{{name}}}")) || message.contains(&format!("{{{name}:"))
}

/// Rewrites positional format args `{0}`, `{1}` to named args `{f0}`, `{f1}`.
fn positional_to_named(message: &str, field_count: usize) -> String {
    let mut result = message.to_string();
    for i in (0..field_count).rev() {
        result = result.replace(&format!("{{{i}}}"), &format!("{{f{i}}}"));
        result = result.replace(&format!("{{{i}:"), &format!("{{f{i}:"));
    }
    result
}
