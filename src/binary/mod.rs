//! Avro binary encoding.
//!
//! This module implements the Avro binary wire format for single values:
//! zigzag varints, length-prefixed bytes and strings, blocked arrays and
//! maps, indexed unions and tag-less records.

mod decode;
mod encode;
mod value;
pub mod varint;

pub use decode::{
    decode_boolean, decode_bytes, decode_double, decode_fixed, decode_float, decode_int,
    decode_long, decode_string, decode_value, MAX_NESTING_DEPTH, MAX_ZERO_WIDTH_ITEMS,
};
pub use encode::encode_value;
pub use value::{json_to_avro_value, AvroValue};
pub use varint::{decode_varint, decode_zigzag, encode_int, encode_long, encode_varint};
