//! Derive macro for keyed-injector
//!
//! `#[derive(Inject)]` implements `keyed_injector::Inject` for a struct with
//! named fields: the parameter schema comes from the field list and the
//! constructor reads every marked field from the resolved arguments.
//!
//! # Example
//!
//! ```rust,ignore
//! use keyed_injector::{ContainerBuilder, Factory, Inject, Key};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct Cache {
//!     size: usize,
//! }
//!
//! #[derive(Inject)]
//! struct UserService {
//!     #[inject]
//!     db: Arc<Database>,
//!     #[inject(optional)]
//!     cache: Option<Arc<Cache>>,
//!     #[inject(key = "page_size", default)]
//!     page_size: usize,
//!     // Non-injected fields use Default
//!     request_count: u64,
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.singleton(Key::of::<Database>(), Factory::from_fn(|| Database { url: "postgres://localhost".into() }))?;
//! builder.provide::<UserService>()?;
//!
//! let service = builder.build()?.get::<UserService>()?;
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Type, parse_macro_input};

/// Derive macro generating an `Inject` implementation.
///
/// # Attributes
///
/// - `#[inject]` - Inject the field by its type. The field type must be `Arc<T>`.
/// - `#[inject(optional)]` - Leave the field `None` when nothing provides it. Uses `Option<Arc<T>>`.
/// - `#[inject(key = "name")]` - Resolve through the string key `name` instead of the type.
/// - `#[inject(default)]` - Owned `T: Default + Clone`, falling back to `T::default()`.
///
/// `key` combines with each of the others. The parameter name is always the
/// field name, so explicit arguments address fields directly.
///
/// Fields without `#[inject]` use `Default::default()`.
#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Inject can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Inject can only be derived for structs",
            ));
        }
    };

    let mut params = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let param_name = field_name.to_string();

        let Some(attr) = parse_inject_attr(&field.attrs)? else {
            field_inits.push(quote! {
                #field_name: ::std::default::Default::default()
            });
            continue;
        };

        let key = match &attr.key {
            Some(key) => quote! { #key },
            None => TokenStream2::new(),
        };

        match attr.mode {
            Mode::Required => {
                let inner = arc_inner_type(&field.ty).ok_or_else(|| {
                    syn::Error::new_spanned(&field.ty, "Fields marked with #[inject] must have type Arc<T>")
                })?;
                params.push(param_for(&param_name, inner, &key));
                field_inits.push(quote! {
                    #field_name: args.get::<#inner>(#param_name)?
                });
            }
            Mode::Optional => {
                let inner = option_arc_inner_type(&field.ty).ok_or_else(|| {
                    syn::Error::new_spanned(
                        &field.ty,
                        "Fields marked with #[inject(optional)] must have type Option<Arc<T>>",
                    )
                })?;
                let param = param_for(&param_name, inner, &key);
                params.push(quote! { #param.allow_absent() });
                field_inits.push(quote! {
                    #field_name: args.try_get::<#inner>(#param_name)
                });
            }
            Mode::Default => {
                let ty = &field.ty;
                let param = param_for(&param_name, ty, &key);
                params.push(quote! {
                    #param.with_default(<#ty as ::std::default::Default>::default())
                });
                field_inits.push(quote! {
                    #field_name: args.cloned::<#ty>(#param_name)?
                });
            }
        }
    }

    Ok(quote! {
        impl #impl_generics ::keyed_injector::Inject for #name #ty_generics #where_clause {
            fn params() -> ::std::vec::Vec<::keyed_injector::Param> {
                ::std::vec![#(#params),*]
            }

            fn inject(args: &::keyed_injector::Args) -> ::keyed_injector::Result<Self> {
                ::std::result::Result::Ok(Self {
                    #(#field_inits),*
                })
            }
        }
    })
}

/// `Param` constructor for a field resolved by type or by string key
fn param_for(param_name: &str, ty: &Type, key: &TokenStream2) -> TokenStream2 {
    if key.is_empty() {
        quote! { ::keyed_injector::Param::of::<#ty>(#param_name) }
    } else {
        quote! { ::keyed_injector::Param::new(#param_name, #key) }
    }
}

enum Mode {
    Required,
    Optional,
    Default,
}

struct InjectAttr {
    mode: Mode,
    key: Option<LitStr>,
}

/// Parse `#[inject]`, `#[inject(optional)]`, `#[inject(default)]` and `key = "..."`
fn parse_inject_attr(attrs: &[Attribute]) -> syn::Result<Option<InjectAttr>> {
    let Some(attr) = attrs.iter().find(|attr| attr.path().is_ident("inject")) else {
        return Ok(None);
    };

    let mut parsed = InjectAttr {
        mode: Mode::Required,
        key: None,
    };

    if attr.meta.require_path_only().is_ok() {
        return Ok(Some(parsed));
    }

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("optional") {
            parsed.mode = Mode::Optional;
            Ok(())
        } else if meta.path.is_ident("default") {
            parsed.mode = Mode::Default;
            Ok(())
        } else if meta.path.is_ident("key") {
            let key: LitStr = meta.value()?.parse()?;
            if key.value().is_empty() {
                return Err(meta.error("inject key must not be empty"));
            }
            parsed.key = Some(key);
            Ok(())
        } else {
            Err(meta.error("expected `optional`, `default` or `key = \"...\"`"))
        }
    })?;

    Ok(Some(parsed))
}

/// Extract T from Arc<T>
fn arc_inner_type(ty: &Type) -> Option<&Type> {
    generic_argument(ty, "Arc")
}

/// Extract T from Option<Arc<T>>
fn option_arc_inner_type(ty: &Type) -> Option<&Type> {
    generic_argument(ty, "Option").and_then(arc_inner_type)
}

/// First type argument of a path type whose last segment is `wrapper`
fn generic_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
