//! Campaign inputs: recipient normalization, message/media lists, and
//! per-recipient item selection.

pub mod error;
pub mod inputs;
pub mod media;
pub mod normalize;
pub mod picker;

pub use {
    error::{Error, Result},
    inputs::{Campaign, parse_messages},
    media::MediaKind,
    normalize::{calling_code_for_region, default_country_code, normalize},
    picker::ItemPicker,
};
