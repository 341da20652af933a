use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Error, Field, Fields, Ident, LitStr, Result, Type, parse_macro_input,
    spanned::Spanned,
};

mod parsed;

use parsed::ParsedRecord;

/// Derives `rowmap::Record` for a struct with named fields.
///
/// Field annotations live in `#[rowmap(...)]`:
///
/// ```text
/// #[derive(Record)]
/// #[rowmap(table = "users")]
/// struct User {
///     #[rowmap(db = "id,omitempty")]
///     id: i64,
///     #[rowmap(embed)]
///     audit: Audit,
///     #[rowmap(db = "created_at", created_at)]
///     created: DateTime<Utc>,
///     #[rowmap(skip)]
///     scratch: Vec<u8>,
/// }
/// ```
///
/// Any `key = "..."` pair other than the reserved flags is stored as an annotation under
/// `key`, so one struct can carry names for several mappers.
#[proc_macro_derive(Record, attributes(rowmap))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ParsedRecord::from_input(&input) {
        Ok(parsed) => parsed.emit().into(),
        Err(err) => err.to_compile_error().into(),
    }
}
