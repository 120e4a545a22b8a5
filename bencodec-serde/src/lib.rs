//! Conveniently serialize and deserialize your Rust data structures into bencode.
//!
//! # Data model
//!
//! Bencode only knows integers, byte strings, lists and dictionaries. Structs and maps become
//! dictionaries, sequences and tuples become lists and strings are written as byte strings. A unit
//! variant is written as its name; every other variant is a dictionary with the variant's name as its
//! single key. Map keys must be representable as byte strings, integer keys are written as their
//! decimal text.
//!
//! There is no null, no boolean and no floating point number in bencode, so `bool`, `f32`, `f64`,
//! `()` and `None` can not be serialized. Optional fields should be skipped with
//! `#[serde(skip_serializing_if = "Option::is_none")]`; an absent field deserializes to `None`.
//!
//! Unsigned integers above `i64::MAX` are written, but reading them back fails with
//! `DecodeError::InvalidNumber`.
//!
//! # Examples
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Info<'a> {
//!     length: u64,
//!     name: &'a str,
//!     #[serde(rename = "piece length")]
//!     piece_length: u32,
//!     #[serde(with = "serde_bytes")]
//!     pieces: &'a [u8],
//! }
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Torrent<'a> {
//!     announce: &'a str,
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     comment: Option<String>,
//!     #[serde(borrow)]
//!     info: Info<'a>,
//! }
//!
//! let torrent = Torrent {
//!     announce: "http://tracker.example/announce",
//!     comment: None,
//!     info: Info { length: 5, name: "a.txt", piece_length: 16384, pieces: b"0123456789abcdefghij" },
//! };
//!
//! let bytes = bencodec_serde::to_bytes(&torrent).unwrap();
//! assert_eq!(bytes, &b"d8:announce31:http://tracker.example/announce4:infod6:lengthi5e\
//!     4:name5:a.txt12:piece lengthi16384e6:pieces20:0123456789abcdefghijee"[..]);
//!
//! let deserialized: Torrent = bencodec_serde::from_bytes(&bytes).unwrap();
//! assert_eq!(torrent, deserialized);
//! ```

mod de;
mod error;
mod ser;

pub use de::{from_bytes, from_reader, Deserializer};
pub use error::{DeserializationError, Error, Result};
pub use ser::{to_bytes, to_writer, Serializer};
