//! Byte sources feed the decoder. A source hands out single bytes, can take back the last one,
//! parses number tokens up to a separator and copies out runs of raw bytes. Every source must
//! behave identically for the same input, no matter how that input arrives.

use crate::error::{DecodeError, Fault};
use std::borrow::Cow;

/// The longest digit run accepted in a number token, sign included. `i64::MIN` takes 20 bytes.
pub const MAX_NUMBER_LEN: usize = 22;

/// The cursor-based contract the decoder is written against. `'de` is the lifetime of byte strings
/// that can be borrowed from the source instead of copied.
pub trait ByteSource<'de> {

    /// Return the next byte and advance by one.
    fn next_byte(&mut self) -> Result<u8, DecodeError>;

    /// Rewind by one byte. Must directly follow a successful `next_byte`; anything else is a
    /// `Fault::PushBack`.
    fn push_back(&mut self);

    /// Parse the digit run up to `separator` and advance past the separator.
    fn read_number_until(&mut self, separator: u8) -> Result<i64, DecodeError>;

    /// Return exactly `len` bytes and advance by `len`.
    fn read_exact(&mut self, len: usize) -> Result<Cow<'de, [u8]>, DecodeError>;

    /// The number of bytes consumed so far.
    fn position(&self) -> usize;

}

impl<'de, S: ByteSource<'de> + ?Sized> ByteSource<'de> for &mut S {

    fn next_byte(&mut self) -> Result<u8, DecodeError> {
        (**self).next_byte()
    }

    fn push_back(&mut self) {
        (**self).push_back()
    }

    fn read_number_until(&mut self, separator: u8) -> Result<i64, DecodeError> {
        (**self).read_number_until(separator)
    }

    fn read_exact(&mut self, len: usize) -> Result<Cow<'de, [u8]>, DecodeError> {
        (**self).read_exact(len)
    }

    fn position(&self) -> usize {
        (**self).position()
    }

}

/// Parse an optionally negative decimal number. `+`, a sign anywhere but the front, an empty run
/// and anything that doesn't fit an `i64` are rejected.
pub fn parse_number(digits: &[u8]) -> Result<i64, DecodeError> {
    let invalid = || DecodeError::InvalidNumber(String::from_utf8_lossy(digits).into_owned());
    let magnitude = match digits {
        [b'-', rest @ ..] => rest,
        rest              => rest,
    };
    if digits.len() > MAX_NUMBER_LEN || magnitude.is_empty() || !magnitude.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    // only ascii remains at this point
    std::str::from_utf8(digits).ok().and_then(|s| s.parse().ok()).ok_or_else(invalid)
}

/// A source over a buffer that is fully available up front. Byte strings are borrowed from it.
pub struct SliceSource<'a> {
    buf: &'a [u8],
    pos: usize,
    can_push_back: bool,
}

impl<'a> SliceSource<'a> {

    pub fn new<B: ?Sized + AsRef<[u8]>>(buf: &'a B) -> Self {
        Self { buf: buf.as_ref(), pos: 0, can_push_back: false }
    }

    /// The bytes not consumed yet.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

}

impl<'a> ByteSource<'a> for SliceSource<'a> {

    fn next_byte(&mut self) -> Result<u8, DecodeError> {
        self.can_push_back = false;
        let byte = *self.buf.get(self.pos).ok_or(DecodeError::Eof)?;
        self.pos += 1;
        self.can_push_back = true;
        Ok(byte)
    }

    fn push_back(&mut self) {
        if !self.can_push_back || self.pos == 0 {
            Fault::PushBack.raise();
        }
        self.can_push_back = false;
        self.pos -= 1;
    }

    fn read_number_until(&mut self, separator: u8) -> Result<i64, DecodeError> {
        self.can_push_back = false;
        let rest = self.remaining();
        let window = &rest[..rest.len().min(MAX_NUMBER_LEN + 1)];
        match window.iter().position(|&b| b == separator) {
            Some(i) => {
                self.pos += i + 1;
                parse_number(&window[..i])
            },
            None if window.len() > MAX_NUMBER_LEN => Err(DecodeError::InvalidNumber(String::from_utf8_lossy(window).into_owned())),
            None => Err(DecodeError::Eof),
        }
    }

    fn read_exact(&mut self, len: usize) -> Result<Cow<'a, [u8]>, DecodeError> {
        self.can_push_back = false;
        if self.remaining().len() < len {
            Err(DecodeError::Eof)
        } else {
            self.pos += len;
            Ok(Cow::Borrowed(&self.buf[self.pos - len .. self.pos]))
        }
    }

    fn position(&self) -> usize {
        self.pos
    }

}
