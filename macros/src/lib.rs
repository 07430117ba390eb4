//! # Category derive
//!
//! This crate provides `#[derive(Category)]` for fieldless enums. Variants are numbered in
//! declaration order and the number of variants becomes the category's `COUNT`.

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

#[proc_macro_derive(Category)]
pub fn derive_category(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let input = parse_macro_input!(input as DeriveInput);

    match expand_category(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(error) => TokenStream::from(error.to_compile_error()),
    }
}

fn expand_category(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "Category can only be derived for enums",
        ));
    };

    let mut variants = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Category variants must not have fields",
            ));
        }
        variants.push(&variant.ident);
    }

    if variants.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "Category needs at least one variant",
        ));
    }

    let count = variants.len();
    let index_arms = variants
        .iter()
        .enumerate()
        .map(|(index, variant)| quote! { #name::#variant => #index, });
    let from_index_arms = variants
        .iter()
        .enumerate()
        .map(|(index, variant)| quote! { #index => #name::#variant, });

    // Generate the trait implementation
    Ok(quote! {
        impl #impl_generics ::compartmental::core::Category for #name #ty_generics #where_clause {
            const COUNT: usize = #count;

            #[inline]
            fn index(&self) -> usize {
                match *self {
                    #(#index_arms)*
                }
            }

            fn from_index(index: usize) -> Self {
                match index {
                    #(#from_index_arms)*
                    _ => panic!(
                        "Index {} out of range for category {}",
                        index,
                        stringify!(#name)
                    ),
                }
            }
        }
    })
}
