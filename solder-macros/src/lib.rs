use proc_macro::TokenStream;
use quote::quote;

use syn::spanned::Spanned as _;
use syn::{Data, DeriveInput, Error, ItemTrait, Path, TypeParamBound, parse_quote};

const INJECTABLE_ATTR: &str = "injectable";

/// Derive macro for the `Injectable` trait.
///
/// Attributes:
/// - `#[injectable(many_per_container)]` marks an element type aggregated
///   container-wide and requested as `Vec<T>`
/// - `#[injectable(one_per_scope)]` marks an element type contributed once
///   per scope and requested as `BTreeMap<String, T>`
/// - `#[injectable(implements(Trait, ...))]` declares the interfaces the
///   type satisfies; each trait must be registered with `#[interface]`
#[proc_macro_derive(Injectable, attributes(injectable))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    handle_derive_injectable(input)
}

/// Attribute macro registering a trait as an interface type.
///
/// Adds `Send + Sync` supertraits when missing and makes `Arc<dyn Trait>`
/// requestable from the container.
#[proc_macro_attribute]
pub fn interface(_attr: TokenStream, item: TokenStream) -> TokenStream {
    match syn::parse::<ItemTrait>(item) {
        Ok(item_trait) => handle_interface(item_trait),
        Err(_) => TokenStream::from(
            Error::new(
                proc_macro2::Span::call_site(),
                "#[interface] can only be applied to trait definitions",
            )
            .to_compile_error(),
        ),
    }
}

fn handle_derive_injectable(input: DeriveInput) -> TokenStream {
    let name = &input.ident;
    if matches!(input.data, Data::Union(_)) {
        return TokenStream::from(
            Error::new(name.span(), "Unions are not supported").to_compile_error(),
        );
    }

    let mut kind: Option<proc_macro2::TokenStream> = None;
    let mut interfaces: Vec<Path> = Vec::new();
    for attr in &input.attrs {
        if !attr.path().is_ident(INJECTABLE_ATTR) {
            continue;
        }
        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("many_per_container") {
                if kind.is_some() {
                    return Err(meta.error("conflicting kind attributes"));
                }
                kind = Some(quote! { ::solder::TypeKind::ManyPerContainer });
                return Ok(());
            }
            if meta.path.is_ident("one_per_scope") {
                if kind.is_some() {
                    return Err(meta.error("conflicting kind attributes"));
                }
                kind = Some(quote! { ::solder::TypeKind::OnePerScope });
                return Ok(());
            }
            if meta.path.is_ident("implements") {
                return meta.parse_nested_meta(|inner| {
                    interfaces.push(inner.path.clone());
                    Ok(())
                });
            }
            Err(meta.error("expected many_per_container, one_per_scope, or implements(...)"))
        });
        if let Err(err) = result {
            return TokenStream::from(err.to_compile_error());
        }
    }

    let kind = kind.unwrap_or_else(|| quote! { ::solder::TypeKind::Single });
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        impl #impl_generics ::solder::Injectable for #name #ty_generics #where_clause {
            fn type_info() -> ::solder::TypeInfo {
                ::solder::TypeInfo::new::<Self>(#kind)
                    #(.implements::<Self, ::std::sync::Arc<dyn #interfaces>>(
                        |value| ::std::sync::Arc::new(value) as ::std::sync::Arc<dyn #interfaces>
                    ))*
            }
        }
    }
    .into()
}

fn handle_interface(mut item: ItemTrait) -> TokenStream {
    if !item.generics.params.is_empty() {
        return TokenStream::from(
            Error::new(item.generics.span(), "Generic interfaces are not supported")
                .to_compile_error(),
        );
    }

    fn has_bound(item: &ItemTrait, name: &str) -> bool {
        item.supertraits.iter().any(|bound| match bound {
            TypeParamBound::Trait(t) => t.path.is_ident(name),
            _ => false,
        })
    }
    if !has_bound(&item, "Send") {
        item.supertraits.push(parse_quote!(Send));
    }
    if !has_bound(&item, "Sync") {
        item.supertraits.push(parse_quote!(Sync));
    }

    let name = &item.ident;
    quote! {
        #item

        impl ::solder::Injectable for ::std::sync::Arc<dyn #name> {
            fn type_info() -> ::solder::TypeInfo {
                ::solder::TypeInfo::new::<Self>(::solder::TypeKind::Interface)
            }
        }
    }
    .into()
}
