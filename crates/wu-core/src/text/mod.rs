//! Small string conversions used when rendering pages.

pub mod case;
pub mod comment;
pub mod convert;
pub mod human;

pub use case::{
    camel_to_kebab, camel_to_separated, camel_to_snake, snake_to_camel, snake_to_text,
    text_to_snake,
};
pub use comment::{html_comment, Marker};
pub use convert::{bool_to_int, get_money, get_price_parts, is_numeric, make_float, make_int, PriceParts};
pub use human::{human_date, human_list};
