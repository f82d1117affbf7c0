#![warn(missing_docs)]

//! Macros used with coop-sync

mod entry;

use proc_macro::TokenStream;

/// Marks an `async fn` as a test driven by a fresh coop-sync runtime.
///
/// The runtime is installed on the test thread before the body runs. The test fails
/// if the body can never complete, eg. because it waits on a lock nobody releases.
///
/// ```ignore
/// #[coop_sync::test]
/// async fn my_test() {
///     assert!(true);
/// }
/// ```
#[proc_macro_attribute]
pub fn test(args: TokenStream, item: TokenStream) -> TokenStream {
    entry::test(args.into(), item.into()).into()
}
