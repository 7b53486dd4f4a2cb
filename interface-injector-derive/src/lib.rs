//! Derive macros for interface-injector
//!
//! - `#[derive(Component)]` - Generate a `Component` impl whose constructor
//!   dependencies are the fields marked `#[inject]`
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_injector::{Component, Container, Lifetime};
//! use std::sync::Arc;
//!
//! trait Database: Send + Sync {}
//! trait Plugin: Send + Sync {}
//!
//! #[derive(Component)]
//! #[component(lifetime = "instance-singleton")]
//! struct UserService {
//!     #[inject]
//!     db: Arc<dyn Database>,
//!     #[inject]
//!     plugins: Vec<Arc<dyn Plugin>>,
//!     // Non-injected fields use Default
//!     request_count: u64,
//! }
//!
//! // Generated implementation:
//! // impl Component for UserService {
//! //     type Dependencies = (Arc<dyn Database>, Vec<Arc<dyn Plugin>>,);
//! //     const LIFETIME: Lifetime = Lifetime::InstanceSingleton;
//! //     fn construct((__dep_0, __dep_1,): Self::Dependencies) -> Self {
//! //         Self { db: __dep_0, plugins: __dep_1, request_count: Default::default() }
//! //     }
//! // }
//! ```

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Type, parse_macro_input};

/// Most constructor dependencies a component can declare
const MAX_DEPENDENCIES: usize = 20;

/// Derive macro for the `Component` trait.
///
/// # Attributes
///
/// - `#[inject]` on a field - Resolve it from the container. The field type
///   must be `Arc<T>`, `Option<Arc<T>>`, `Vec<Arc<T>>` or `Container`.
/// - `#[component(lifetime = "...")]` on the struct - Set `Component::LIFETIME`
///   (`transient`, `instance-singleton`, `weak-singleton`, `thread-singleton`).
///
/// Fields without `#[inject]` use `Default::default()`.
#[proc_macro_derive(Component, attributes(inject, component))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Only support structs with named fields
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Component can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Component can only be derived for structs",
            ));
        }
    };

    let lifetime = find_lifetime(&input.attrs)?;

    let mut dep_types = Vec::new();
    let mut dep_names = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields {
        let Some(field_name) = &field.ident else {
            continue;
        };
        let field_type = &field.ty;

        if has_inject_attr(&field.attrs) {
            if !is_supported_shape(field_type) {
                return Err(syn::Error::new_spanned(
                    field_type,
                    "Fields marked with #[inject] must have type Arc<T>, Option<Arc<T>>, Vec<Arc<T>> or Container",
                ));
            }

            let dep_name = format_ident!("__dep_{}", dep_names.len());
            dep_types.push(quote! { #field_type });
            field_inits.push(quote! { #field_name: #dep_name });
            dep_names.push(dep_name);
        } else {
            field_inits.push(quote! {
                #field_name: ::std::default::Default::default()
            });
        }
    }

    if dep_names.len() > MAX_DEPENDENCIES {
        return Err(syn::Error::new_spanned(
            name,
            format!(
                "Component supports at most {MAX_DEPENDENCIES} injected fields, found {}",
                dep_names.len()
            ),
        ));
    }

    let lifetime_const = lifetime.map(|variant| {
        quote! {
            const LIFETIME: ::interface_injector::Lifetime = ::interface_injector::Lifetime::#variant;
        }
    });

    Ok(quote! {
        impl #impl_generics ::interface_injector::Component for #name #ty_generics #where_clause {
            type Dependencies = (#(#dep_types,)*);

            #lifetime_const

            fn construct((#(#dep_names,)*): Self::Dependencies) -> Self {
                Self {
                    #(#field_inits),*
                }
            }
        }
    })
}

/// Whether the field carries `#[inject]`
fn has_inject_attr(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident("inject"))
}

/// Parse `#[component(lifetime = "...")]` into a `Lifetime` variant name
fn find_lifetime(attrs: &[Attribute]) -> syn::Result<Option<syn::Ident>> {
    let mut lifetime = None;

    for attr in attrs {
        if !attr.path().is_ident("component") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("lifetime") {
                let value: LitStr = meta.value()?.parse()?;
                lifetime = Some(lifetime_variant(&value)?);
                Ok(())
            } else {
                Err(meta.error("unsupported component attribute, expected `lifetime`"))
            }
        })?;
    }

    Ok(lifetime)
}

fn lifetime_variant(value: &LitStr) -> syn::Result<syn::Ident> {
    let normalized: String = value
        .value()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let variant = match normalized.as_str() {
        "default" => "Default",
        "transient" => "Transient",
        "instancesingleton" | "singleton" => "InstanceSingleton",
        "weaksingleton" => "WeakSingleton",
        "threadsingleton" => "ThreadSingleton",
        _ => {
            return Err(syn::Error::new_spanned(
                value,
                "unknown lifetime, expected one of: transient, instance-singleton, weak-singleton, thread-singleton",
            ));
        }
    };

    Ok(syn::Ident::new(variant, value.span()))
}

/// Accept the dependency shapes the container knows how to resolve
fn is_supported_shape(ty: &Type) -> bool {
    match last_segment(ty) {
        Some(segment) if segment.ident == "Arc" || segment.ident == "Container" => true,
        Some(segment) if segment.ident == "Option" || segment.ident == "Vec" => {
            first_type_argument(segment)
                .and_then(last_segment)
                .is_some_and(|inner| inner.ident == "Arc")
        }
        _ => false,
    }
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last(),
        _ => None,
    }
}

fn first_type_argument(segment: &syn::PathSegment) -> Option<&Type> {
    if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
        if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
            return Some(inner);
        }
    }
    None
}
