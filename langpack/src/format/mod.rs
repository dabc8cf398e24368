//! Message formatting against a resolved bundle.

pub mod markup;
mod message;
mod plural;

pub use markup::{validate_markup, MarkupError, DEFAULT_ALLOWED_TAGS};
pub use message::{format_message, format_number, FormatError, Message, Params, Value};
pub use plural::{plural_category, PluralCategory};
