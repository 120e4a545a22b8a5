//! A bencode token is the smallest unit on wire. Integers are written as `i<digits>e`, byte strings as
//! `<length>:<bytes>`, and containers open with `l` or `d` and close with a shared `e`. Unlike most
//! binary formats there are no length prefixes for containers, so a writer can stream a list or a
//! dictionary without knowing its size in advance.

use crate::error::EncodeError;
use std::io::Write;

pub const INT: u8 = b'i';
pub const LIST: u8 = b'l';
pub const DICT: u8 = b'd';
pub const END: u8 = b'e';
pub const COLON: u8 = b':';

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Token<'a> {
    /// A signed integer
    Int(i64),
    /// An unsigned integer; shares its wire form with `Int`
    Uint(u64),
    /// A byte string, prefixed with its length in bytes
    Bytes(&'a [u8]),
    /// Opens a list; the elements follow until the matching `End`
    List,
    /// Opens a dictionary; byte string keys and values alternate until the matching `End`
    Dict,
    /// Closes the innermost list or dictionary
    End,
}

impl<'a> Token<'a> {

    /// Returns the mnemonic of the token. This is useful for error messages.
    pub fn name(&self) -> &'static str {
        match *self {
            Token::Int(_)   => "Int",
            Token::Uint(_)  => "Uint",
            Token::Bytes(_) => "Bytes",
            Token::List     => "List",
            Token::Dict     => "Dict",
            Token::End      => "End",
        }
    }

    /// Returns the number of written bytes
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<usize, EncodeError> {
        let mut head = Vec::with_capacity(24);
        self.head(&mut head);
        w.write_all(&head)?;
        let payload = self.payload();
        w.write_all(payload)?;
        Ok(head.len() + payload.len())
    }

    /// Append the token to an in-memory buffer, which can not fail.
    pub(crate) fn append(&self, buf: &mut Vec<u8>) {
        self.head(buf);
        buf.extend_from_slice(self.payload());
    }

    #[inline]
    fn head(&self, buf: &mut Vec<u8>) {
        match *self {
            Token::Int(i) => {
                buf.push(INT);
                buf.extend_from_slice(i.to_string().as_bytes());
                buf.push(END);
            },
            Token::Uint(u) => {
                buf.push(INT);
                buf.extend_from_slice(u.to_string().as_bytes());
                buf.push(END);
            },
            Token::Bytes(v) => {
                buf.extend_from_slice(v.len().to_string().as_bytes());
                buf.push(COLON);
            },
            Token::List => buf.push(LIST),
            Token::Dict => buf.push(DICT),
            Token::End  => buf.push(END),
        }
    }

    #[inline]
    fn payload(&self) -> &'a [u8] {
        match *self {
            Token::Bytes(v) => v,
            _               => &[],
        }
    }

}
