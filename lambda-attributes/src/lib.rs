#![deny(missing_docs)]

//! Entry point attributes for serverless functions.
//!
//! An asynchronous `main` annotated with `#[function]` must accept an event
//! argument of a type which implements [`serde::Deserialize`], a
//! `nowfn_runtime::Context`, and return a `Result<B, E>`, where `B` implements
//! [`serde::Serialize`] and `E` is any type that implements
//! `Into<Box<dyn std::error::Error + Send + Sync + 'static>>`.
//!
//! With `#[function(http)]` the event is an `nowfn_http::Request` and `B` is
//! anything implementing `nowfn_http::IntoResponse`.

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote_spanned;
use syn::{spanned::Spanned, AttributeArgs, FnArg, ItemFn, Meta, NestedMeta};

/// Return true if attribute macro args declares http flavor in the form `#[function(http)]`
fn is_http(args: &AttributeArgs) -> bool {
    args.iter().any(|arg| match arg {
        NestedMeta::Meta(Meta::Path(path)) => path.is_ident("http"),
        _ => false,
    })
}

#[proc_macro_attribute]
/// Wrap an async main function into the function runtime
pub fn function(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemFn);
    let args = syn::parse_macro_input!(attr as AttributeArgs);
    let ret = &input.sig.output;
    let name = &input.sig.ident;
    let body = &input.block;
    let attrs = &input.attrs;
    let asyncness = &input.sig.asyncness;
    let inputs = &input.sig.inputs;

    if name != "main" {
        let tokens = quote_spanned! { name.span() =>
            compile_error!("only the main function can be tagged with #[function]");
        };
        return TokenStream::from(tokens);
    }

    if asyncness.is_none() {
        let tokens = quote_spanned! { input.span() =>
          compile_error!("the async keyword is missing from the function declaration");
        };
        return TokenStream::from(tokens);
    }

    if inputs.len() != 2 {
        let tokens = quote_spanned! { inputs.span() =>
            compile_error!("The #[function] macro expects two arguments: a triggered event and the invocation context.");
        };
        return TokenStream::from(tokens);
    }

    let mut typed = Vec::with_capacity(2);
    for arg in inputs.iter() {
        match arg {
            FnArg::Typed(arg) => typed.push(arg),
            FnArg::Receiver(_) => {
                let tokens = quote_spanned! { arg.span() =>
                    compile_error!("fn main's arguments must be fully formed");
                };
                return TokenStream::from(tokens);
            }
        }
    }
    let (event_name, event_type) = (&typed[0].pat, &typed[0].ty);
    let (context_name, context_type) = (&typed[1].pat, &typed[1].ty);

    let result = if is_http(&args) {
        quote_spanned! { input.span() =>

            #(#attrs)*
            #asyncness fn main() {
                async fn actual(#event_name: #event_type, #context_name: #context_type) #ret #body

                let f = nowfn_http::handler(actual);
                nowfn_http::runtime::run(f).await.unwrap();
            }
        }
    } else {
        quote_spanned! { input.span() =>

            #(#attrs)*
            #asyncness fn main() {
                async fn actual(#event_name: #event_type, #context_name: #context_type) #ret #body

                let f = nowfn_runtime::handler_fn(actual);
                nowfn_runtime::run(f).await.unwrap();
            }
        }
    };

    result.into()
}
