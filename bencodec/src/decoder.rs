use crate::error::{DecodeError, DecoderError};
use crate::source::{ByteSource, SliceSource};
use crate::stream::{Producer, ReadProducer, StreamConfig, StreamSource};
use crate::token::{COLON, DICT, END, INT, LIST};
use crate::value::{Dictionary, Value};
use std::borrow::Cow;
use std::io::Read;
use std::marker::PhantomData;
use tracing::debug;

/// Used to decode bencode values from any `ByteSource`. The decoder reads strictly front to back and
/// never looks further ahead than a single tag byte, so it can be driven by a stream that is never
/// held in memory as a whole.
///
/// Each `as_*` call consumes exactly one value. Bytes after that value are left in the source and
/// may be decoded by another call.
pub struct Decoder<'de, S> {
    source: S,
    max_depth: Option<usize>,
    depth: usize,
    _marker: PhantomData<&'de ()>,
}

impl<'de> Decoder<'de, SliceSource<'de>> {

    pub fn from_slice<B: ?Sized + AsRef<[u8]>>(buf: &'de B) -> Self {
        Self::new(SliceSource::new(buf))
    }

    /// Decode a single value from the given buffer. All byte strings and keys will be borrowed from
    /// the buffer instead of copied, so the value may only live as long as the buffer does.
    /// Containers still need their own heap space. The second element of the result is the number
    /// of consumed bytes.
    pub fn decode<B: ?Sized + AsRef<[u8]>>(buf: &'de B) -> Result<(Value<'de>, usize), DecoderError> {
        let mut decoder = Self::from_slice(buf);
        let value = decoder.as_value()?;
        Ok((value, decoder.position()))
    }

}

impl<R: Read> Decoder<'static, StreamSource<ReadProducer<R>>> {
    pub fn from_reader(reader: R) -> Self {
        Self::new(StreamSource::from_reader(reader))
    }
}

impl<P: Producer> Decoder<'static, StreamSource<P>> {
    pub fn from_producer(producer: P, config: StreamConfig) -> Self {
        Self::new(StreamSource::with_config(producer, config))
    }
}

impl<'de, S: ByteSource<'de>> Decoder<'de, S> {

    pub fn new(source: S) -> Self {
        Self { source, max_depth: None, depth: 0, _marker: PhantomData }
    }

    /// Reject values nested deeper than `max_depth` lists and dictionaries with `DecodeError::Depth`.
    /// Nesting is unlimited by default.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// The number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.source.position()
    }

    pub fn into_source(self) -> S {
        self.source
    }

    pub fn as_integer(&mut self) -> Result<i64, DecoderError> {
        let result = self.expect(INT, "integer").and_then(|_| self.source.read_number_until(END));
        self.located(result)
    }

    pub fn as_byte_string(&mut self) -> Result<Cow<'de, [u8]>, DecoderError> {
        let result = self.byte_string_tag().and_then(|_| self.byte_string());
        self.located(result)
    }

    pub fn as_list(&mut self) -> Result<Vec<Value<'de>>, DecoderError> {
        let result = self.expect(LIST, "list").and_then(|_| self.list());
        self.located(result)
    }

    pub fn as_dictionary(&mut self) -> Result<Dictionary<'de>, DecoderError> {
        let result = self.expect(DICT, "dictionary").and_then(|_| self.dictionary());
        self.located(result)
    }

    pub fn as_value(&mut self) -> Result<Value<'de>, DecoderError> {
        let result = self.source.next_byte().and_then(|tag| self.value(tag));
        self.located(result)
    }

    fn located<T>(&self, result: Result<T, DecodeError>) -> Result<T, DecoderError> {
        result.map_err(|e| e.at(self.source.position()))
    }

    fn expect(&mut self, tag: u8, expected: &'static str) -> Result<(), DecodeError> {
        match self.source.next_byte()? {
            found if found == tag => Ok(()),
            found => Err(self.mismatch(expected, found)),
        }
    }

    /// Byte strings have no tag of their own; their first byte is part of the length.
    fn byte_string_tag(&mut self) -> Result<(), DecodeError> {
        match self.source.next_byte()? {
            found if found.is_ascii_digit() || found == b'-' => {
                self.source.push_back();
                Ok(())
            },
            found => Err(self.mismatch("byte string", found)),
        }
    }

    fn mismatch(&self, expected: &'static str, found: u8) -> DecodeError {
        debug!(expected, found = %char::from(found), position = self.source.position(), "type mismatch");
        DecodeError::TypeMismatch { expected, found }
    }

    /// Dispatch on a tag byte that has already been consumed.
    fn value(&mut self, tag: u8) -> Result<Value<'de>, DecodeError> {
        match tag {
            INT  => Ok(Value::Int(self.source.read_number_until(END)?)),
            LIST => Ok(Value::List(self.list()?)),
            DICT => Ok(Value::Dict(self.dictionary()?)),
            _    => {
                self.source.push_back();
                Ok(Value::Bytes(self.byte_string()?))
            },
        }
    }

    fn byte_string(&mut self) -> Result<Cow<'de, [u8]>, DecodeError> {
        let len = self.source.read_number_until(COLON)?;
        if len < 0 {
            return Err(DecodeError::NegativeLength(len));
        }
        let len = usize::try_from(len).map_err(|_| DecodeError::Length(len))?;
        self.source.read_exact(len)
    }

    fn list(&mut self) -> Result<Vec<Value<'de>>, DecodeError> {
        self.nested(|decoder| {
            let mut elements = Vec::new();
            loop {
                match decoder.source.next_byte()? {
                    END => return Ok(elements),
                    tag => elements.push(decoder.value(tag)?),
                }
            }
        })
    }

    fn dictionary(&mut self) -> Result<Dictionary<'de>, DecodeError> {
        self.nested(|decoder| {
            let mut entries = Dictionary::new();
            loop {
                if decoder.source.next_byte()? == END {
                    return Ok(entries);
                }
                decoder.source.push_back();
                let key = decoder.byte_string()?;
                let tag = decoder.source.next_byte()?;
                let value = decoder.value(tag)?;
                entries.insert(key, value);
            }
        })
    }

    fn nested<T, F>(&mut self, body: F) -> Result<T, DecodeError>
    where
        F: FnOnce(&mut Self) -> Result<T, DecodeError>,
    {
        if let Some(max) = self.max_depth {
            if self.depth >= max {
                debug!(max, position = self.source.position(), "maximum nesting depth exceeded");
                return Err(DecodeError::Depth(max));
            }
        }
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }

}
