use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use syn::ItemFn;

fn token_stream_with_error(mut tokens: TokenStream, error: syn::Error) -> TokenStream {
    tokens.extend(error.into_compile_error());
    tokens
}

pub fn test(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input: ItemFn = match syn::parse2(item.clone()) {
        Ok(it) => it,
        Err(e) => return token_stream_with_error(item, e),
    };

    if input.sig.asyncness.is_none() {
        let msg = "the `async` keyword is missing from the function declaration";
        return token_stream_with_error(
            input.to_token_stream(),
            syn::Error::new_spanned(input.sig.fn_token, msg),
        );
    }

    if !input.sig.inputs.is_empty() {
        let msg = "Async test functions cannot accept arguments";
        return token_stream_with_error(
            input.to_token_stream(),
            syn::Error::new_spanned(&input.sig.ident, msg),
        );
    }

    let body = &input.block;
    let ident = &input.sig.ident;
    let output = &input.sig.output;
    let attrs = &input.attrs;
    let vis = &input.vis;

    quote! {
        #[::core::prelude::v1::test]
        #(#attrs)*
        #vis fn #ident() #output {
            ::coop_sync::initialize();
            ::coop_sync::block_on(async move #body)
                .expect("test future did not complete")
        }
    }
}
