//! Decoding functions take a byte source and return values; encoding functions take a value and
//! either hold its bytes or write them to a sink, returning the amount of written bytes.
//!
//! # Byte sources
//!
//! The decoder is written against the `ByteSource` trait. `SliceSource` serves a buffer that is
//! available up front and lets decoded byte strings borrow from it. `StreamSource` pulls chunks from
//! a `Producer` (any `std::io::Read` through `ReadProducer`) into a fixed buffer, so memory does not
//! grow with the length of the input, only with the largest single byte string. Both sources decode
//! the same input to the same value, regardless of how the stream is chunked.
//!
//! # A note on `usize`
//!
//! Byte string lengths are parsed as `i64`. On architectures where `usize` is smaller, some valid
//! lengths can not be represented and a `DecodeError::Length` will be raised.
//!
//! # A note on dictionaries
//!
//! `Value::Dict` keeps its entries in the order they were decoded and does not require sorted keys.
//! When a key repeats, the last occurrence wins but the entry keeps its first position. Encoding
//! writes the entries back in that same order.
//!
//! # Faults
//!
//! Calling `ByteSource::push_back` twice or without a preceding `next_byte`, as well as a producer
//! reporting a negative or oversized read, is a broken contract and not a malformed input. Those
//! conditions panic with a `Fault` message instead of returning an error.
//!
//! # Examples
//!
//! ```
//! use bencodec::*;
//! use std::borrow::Cow;
//!
//! let mut dict = Dictionary::new();
//! dict.insert(Cow::Borrowed(&b"cow"[..]), Value::from("moo"));
//! dict.insert(Cow::Borrowed(&b"spam"[..]), Value::List(vec![Value::Int(-1), Value::from("eggs")]));
//! let value = Value::Dict(dict);
//!
//! let encoder = Encoder::from_value(&value);
//! assert_eq!(encoder.as_str().unwrap(), "d3:cow3:moo4:spamli-1e4:eggsee");
//!
//! let (decoded, consumed) = Decoder::decode(encoder.as_bytes()).unwrap();
//! assert_eq!(value, decoded);
//! assert_eq!(consumed, 30);
//!
//! let mut decoder = Decoder::from_reader(std::io::Cursor::new(encoder.into_bytes()));
//! assert_eq!(decoder.as_dictionary().unwrap().get(&b"cow"[..]), Some(&Value::from("moo")));
//! ```

mod decoder;
mod encoder;
mod error;
mod source;
mod stream;
mod token;
mod value;


pub use decoder::*;
pub use encoder::*;
pub use error::*;
pub use source::*;
pub use stream::*;
pub use token::*;
pub use value::*;
