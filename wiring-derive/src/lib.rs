//! Derive macros for wiring
//!
//! `#[derive(Describe)]` generates a `wiring::Describe` implementation with
//! a single constructor marked for injection. Every field tagged `#[inject]`
//! becomes a constructor parameter resolved from the container; the other
//! fields use `Default`.
//!
//! # Example
//!
//! ```rust,ignore
//! use wiring::{Container, Describe, TypeCatalog};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! trait Cache: Send + Sync {}
//!
//! #[derive(Describe)]
//! struct UserService {
//!     #[inject]
//!     db: Arc<Database>,
//!     #[inject(name = "users", optional)]
//!     cache: Option<Arc<dyn Cache>>,
//!     // Non-injected fields use Default
//!     request_count: u64,
//! }
//!
//! let catalog = TypeCatalog::new();
//! catalog.add::<UserService>();
//!
//! let container = Container::with_introspector(catalog);
//! container.singleton(Database { url: "postgres://localhost".into() });
//!
//! let service = container.resolve::<UserService>().unwrap();
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Type, parse_macro_input};

/// Derive macro describing a struct's injection constructor.
///
/// # Attributes
///
/// - `#[inject]` - Resolve the field. The field type must be `Arc<T>`.
/// - `#[inject(optional)]` - Resolve if possible. The field type must be `Option<Arc<T>>`.
/// - `#[inject(name = "...")]` - Resolve the named registration of `T`.
///
/// `T` may be a trait object such as `dyn Cache`.
#[proc_macro_derive(Describe, attributes(inject))]
pub fn derive_describe(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(expanded) => expanded.into(),
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
                    "Describe can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Describe can only be derived for structs",
            ));
        }
    };

    let mut field_inits = Vec::new();
    let mut params = Vec::new();

    for field in fields.iter() {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let field_type = &field.ty;
        let label = LitStr::new(&field_name.to_string(), field_name.span());

        let Some(inject) = find_inject_attr(&field.attrs)? else {
            field_inits.push(quote! {
                #field_name: ::std::default::Default::default()
            });
            continue;
        };

        let index = params.len();
        let named = inject.name.as_ref().map(|dependency| quote! { .named(#dependency) });

        if inject.optional {
            let inner = extract_option_arc_inner_type(field_type).ok_or_else(|| {
                syn::Error::new_spanned(
                    field_type,
                    "Fields marked with #[inject(optional)] must have type Option<Arc<T>>",
                )
            })?;
            field_inits.push(quote! { #field_name: args.optional::<#inner>(#index) });
            params.push(quote! {
                ::wiring::Parameter::of::<#inner>(#label) #named .optional()
            });
        } else {
            let inner = extract_arc_inner_type(field_type).ok_or_else(|| {
                syn::Error::new_spanned(
                    field_type,
                    "Fields marked with #[inject] must have type Arc<T>",
                )
            })?;
            field_inits.push(quote! { #field_name: args.get::<#inner>(#index)? });
            params.push(quote! {
                ::wiring::Parameter::of::<#inner>(#label) #named
            });
        }
    }

    Ok(quote! {
        impl #impl_generics ::wiring::Describe for #name #ty_generics #where_clause {
            fn describe(ty: &mut ::wiring::TypeBuilder<Self>) {
                ty.constructor(
                    ::wiring::Constructor::new(|args: &::wiring::Arguments| {
                        let _ = args;
                        ::std::result::Result::Ok(Self {
                            #(#field_inits),*
                        })
                    })
                    #(.param(#params))*
                    .marked(),
                );
            }
        }
    })
}

/// Parsed `#[inject(...)]` attribute
#[derive(Default)]
struct InjectAttr {
    optional: bool,
    name: Option<LitStr>,
}

fn find_inject_attr(attrs: &[Attribute]) -> syn::Result<Option<InjectAttr>> {
    let Some(attr) = attrs.iter().find(|attr| attr.path().is_ident("inject")) else {
        return Ok(None);
    };

    let mut inject = InjectAttr::default();
    if attr.meta.require_path_only().is_ok() {
        return Ok(Some(inject));
    }

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("optional") {
            inject.optional = true;
            Ok(())
        } else if meta.path.is_ident("name") {
            inject.name = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("expected `optional` or `name = \"...\"`"))
        }
    })?;
    Ok(Some(inject))
}

/// Extract T from Arc<T>
fn extract_arc_inner_type(ty: &Type) -> Option<&Type> {
    generic_argument(ty, "Arc")
}

/// Extract T from Option<Arc<T>>
fn extract_option_arc_inner_type(ty: &Type) -> Option<&Type> {
    generic_argument(ty, "Option").and_then(extract_arc_inner_type)
}

fn generic_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first()? {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
