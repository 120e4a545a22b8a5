use serde::de::{self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess, Unexpected, VariantAccess, Visitor};
use serde::de::value::{StrDeserializer, StringDeserializer};
use serde::{forward_to_deserialize_any, Deserialize};
use bencodec::{ByteSource, DecodeError, ReadProducer, SliceSource, StreamSource, COLON, DICT, END, INT, LIST};
use std::borrow::Cow;
use std::io::Read;
use std::marker::PhantomData;

use crate::error::{DeserializationError, Error, Result};

/// Reads bencode through any `ByteSource` with the same one-byte look-ahead the core decoder uses:
/// a tag byte is read, and pushed back when it turns out to belong to the next token.
pub struct Deserializer<'de, S> {
    source: S,
    _marker: PhantomData<&'de ()>,
}

impl<'de> Deserializer<'de, SliceSource<'de>> {
    pub fn from_bytes(input: &'de [u8]) -> Self {
        Self::new(SliceSource::new(input))
    }
}

impl<R: Read> Deserializer<'static, StreamSource<ReadProducer<R>>> {
    pub fn from_reader(reader: R) -> Self {
        Self::new(StreamSource::from_reader(reader))
    }
}

/// Deserialize a value which may borrow from `s`. Bytes left after the value are an error.
pub fn from_bytes<'a, T: Deserialize<'a>>(s: &'a [u8]) -> std::result::Result<T, DeserializationError> {
    let mut deserializer = Deserializer::from_bytes(s);
    let t = T::deserialize(&mut deserializer).map_err(|e| e.at(deserializer.position()))?;
    if deserializer.position() == s.len() {
        Ok(t)
    } else {
        Err(Error::Trailing.at(deserializer.position()))
    }
}

/// Deserialize one value from a stream. The reader is consumed no further than the end of that value
/// plus whatever the stream buffer prefetched.
pub fn from_reader<R: Read, T: DeserializeOwned>(reader: R) -> std::result::Result<T, DeserializationError> {
    let mut deserializer = Deserializer::from_reader(reader);
    T::deserialize(&mut deserializer).map_err(|e| e.at(deserializer.position()))
}

impl<'de, S: ByteSource<'de>> Deserializer<'de, S> {

    pub fn new(source: S) -> Self {
        Self { source, _marker: PhantomData }
    }

    pub fn position(&self) -> usize {
        self.source.position()
    }

    pub fn into_source(self) -> S {
        self.source
    }

    fn peek(&mut self) -> Result<u8> {
        let tag = self.source.next_byte()?;
        self.source.push_back();
        Ok(tag)
    }

    fn expect(&mut self, tag: u8, expected: &'static str) -> Result<()> {
        match self.source.next_byte()? {
            found if found == tag => Ok(()),
            found => Err(Error::Decode(DecodeError::TypeMismatch { expected, found })),
        }
    }

    /// Consume the closing `e` of a container if it is next.
    fn at_end(&mut self) -> Result<bool> {
        if self.source.next_byte()? == END {
            Ok(true)
        } else {
            self.source.push_back();
            Ok(false)
        }
    }

    fn int(&mut self) -> Result<i64> {
        self.expect(INT, "integer")?;
        Ok(self.source.read_number_until(END)?)
    }

    fn bytes(&mut self) -> Result<Cow<'de, [u8]>> {
        match self.peek()? {
            b'0'..=b'9' | b'-' => {},
            found => return Err(Error::Decode(DecodeError::TypeMismatch { expected: "byte string", found })),
        }
        let len = self.source.read_number_until(COLON)?;
        if len < 0 {
            return Err(Error::Decode(DecodeError::NegativeLength(len)));
        }
        let len = usize::try_from(len).map_err(|_| Error::Decode(DecodeError::Length(len)))?;
        Ok(self.source.read_exact(len)?)
    }

    fn text(&mut self) -> Result<Cow<'de, str>> {
        into_text(self.bytes()?)
    }

}

fn into_text(bytes: Cow<'_, [u8]>) -> Result<Cow<'_, str>> {
    Ok(match bytes {
        Cow::Borrowed(b) => Cow::Borrowed(std::str::from_utf8(b)?),
        Cow::Owned(b) => Cow::Owned(String::from_utf8(b).map_err(|e| e.utf8_error())?),
    })
}

macro_rules! integers {
    ($($method:ident => $visit:ident),*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                visitor.$visit(self.int()?.try_into()?)
            }
        )*
    }
}

impl<'de, 'a, S: ByteSource<'de>> de::Deserializer<'de> for &'a mut Deserializer<'de, S> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.peek()? {
            INT  => visitor.visit_i64(self.int()?),
            LIST => self.deserialize_seq(visitor),
            DICT => self.deserialize_map(visitor),
            _    => self.deserialize_bytes(visitor),
        }
    }

    forward_to_deserialize_any! { bool f32 f64 unit unit_struct ignored_any }

    integers!(deserialize_i8 => visit_i8, deserialize_i16 => visit_i16, deserialize_i32 => visit_i32,
        deserialize_u8 => visit_u8, deserialize_u16 => visit_u16, deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64);

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i64(self.int()?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let text = self.text()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(de::Error::invalid_value(Unexpected::Str(&text), &"a single character")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.text()? {
            Cow::Borrowed(s) => visitor.visit_borrowed_str(s),
            Cow::Owned(s) => visitor.visit_string(s),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.bytes()? {
            Cow::Borrowed(b) => visitor.visit_borrowed_bytes(b),
            Cow::Owned(b) => visitor.visit_byte_buf(b),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    /// There is no null in bencode; absent values are absent dictionary entries.
    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.expect(LIST, "list")?;
        let mut access = Elements { de: &mut *self, done: false };
        let value = visitor.visit_seq(&mut access)?;
        if !access.done {
            self.expect(END, "end of list")?;
        }
        Ok(value)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(self, _name: &'static str, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.expect(DICT, "dictionary")?;
        let mut access = Entries { de: &mut *self, done: false };
        let value = visitor.visit_map(&mut access)?;
        if !access.done {
            self.expect(END, "end of dictionary")?;
        }
        Ok(value)
    }

    fn deserialize_struct<V: Visitor<'de>>(self, _name: &'static str, _fields: &'static [&'static str], visitor: V) -> Result<V::Value> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(self, _name: &'static str, _variants: &'static [&'static str], visitor: V) -> Result<V::Value> {
        if self.peek()? == DICT {
            self.expect(DICT, "dictionary")?;
            let variant = self.text()?;
            let value = visitor.visit_enum(Variant { de: &mut *self, variant })?;
            self.expect(END, "end of variant")?;
            Ok(value)
        } else {
            match self.text()? {
                Cow::Borrowed(s) => visitor.visit_enum::<StrDeserializer<'_, Error>>(s.into_deserializer()),
                Cow::Owned(s) => visitor.visit_enum::<StringDeserializer<Error>>(s.into_deserializer()),
            }
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

}

struct Elements<'a, 'de: 'a, S> {
    de: &'a mut Deserializer<'de, S>,
    done: bool,
}

impl<'de, 'a, 'b, S: ByteSource<'de>> SeqAccess<'de> for &'b mut Elements<'a, 'de, S> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.done {
            return Ok(None);
        }
        if self.de.at_end()? {
            self.done = true;
            Ok(None)
        } else {
            seed.deserialize(&mut *self.de).map(Some)
        }
    }
}

struct Entries<'a, 'de: 'a, S> {
    de: &'a mut Deserializer<'de, S>,
    done: bool,
}

impl<'de, 'a, 'b, S: ByteSource<'de>> MapAccess<'de> for &'b mut Entries<'a, 'de, S> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.done {
            return Ok(None);
        }
        if self.de.at_end()? {
            self.done = true;
            Ok(None)
        } else {
            let key = self.de.bytes()?;
            seed.deserialize(MapKey { key }).map(Some)
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        seed.deserialize(&mut *self.de)
    }
}

struct Variant<'a, 'de: 'a, S> {
    de: &'a mut Deserializer<'de, S>,
    variant: Cow<'de, str>,
}

impl<'de, 'a, S: ByteSource<'de>> EnumAccess<'de> for Variant<'a, 'de, S> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let name: StrDeserializer<'_, Error> = self.variant.as_ref().into_deserializer();
        let variant = seed.deserialize(name)?;
        Ok((variant, self))
    }
}

impl<'de, 'a, S: ByteSource<'de>> VariantAccess<'de> for Variant<'a, 'de, S> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Err(de::Error::invalid_type(Unexpected::Map, &"unit variant"))
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(self.de, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_map(self.de, visitor)
    }

}

/// Dictionary keys are always byte strings; integer keys are parsed from their text.
struct MapKey<'de> {
    key: Cow<'de, [u8]>,
}

impl<'de> MapKey<'de> {
    fn text(self) -> Result<Cow<'de, str>> {
        into_text(self.key)
    }
}

macro_rules! integer_keys {
    ($($method:ident => $visit:ident: $t:ty),*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
                let text = self.text()?;
                let parsed = text.parse::<$t>().map_err(|_| Error::Key(text.to_string(), stringify!($t)))?;
                visitor.$visit(parsed)
            }
        )*
    }
}

impl<'de> de::Deserializer<'de> for MapKey<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match (std::str::from_utf8(&self.key).is_ok(), self.key) {
            (true, key) => MapKey { key }.deserialize_str(visitor),
            (false, Cow::Borrowed(b)) => visitor.visit_borrowed_bytes(b),
            (false, Cow::Owned(b)) => visitor.visit_byte_buf(b),
        }
    }

    integer_keys!(deserialize_i8 => visit_i8: i8, deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32, deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8, deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32, deserialize_u64 => visit_u64: u64);

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let text = self.text()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(Error::Key(text.to_string(), "char")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.text()? {
            Cow::Borrowed(s) => visitor.visit_borrowed_str(s),
            Cow::Owned(s) => visitor.visit_string(s),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.key {
            Cow::Borrowed(b) => visitor.visit_borrowed_bytes(b),
            Cow::Owned(b) => visitor.visit_byte_buf(b),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(self, _name: &'static str, _variants: &'static [&'static str], visitor: V) -> Result<V::Value> {
        match self.text()? {
            Cow::Borrowed(s) => visitor.visit_enum::<StrDeserializer<'_, Error>>(s.into_deserializer()),
            Cow::Owned(s) => visitor.visit_enum::<StringDeserializer<Error>>(s.into_deserializer()),
        }
    }

    forward_to_deserialize_any! {
        bool f32 f64 unit unit_struct seq tuple tuple_struct map struct ignored_any
    }

}

#[cfg(test)]
mod test {
    use super::{from_bytes, from_reader, Deserializer};
    use crate::error::Error;
    use bencodec::DecodeError;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Deserialize, Debug, PartialEq)]
    struct File<'a> {
        #[serde(borrow)]
        path: Vec<&'a str>,
        length: u64,
        md5sum: Option<String>,
    }

    #[derive(Deserialize, Debug, PartialEq)]
    enum Event {
        Started,
        Stopped(u32),
        Moved { from: u8, to: u8 },
    }

    #[test]
    fn borrowed_struct() {
        let input = b"d6:lengthi42e4:pathl3:dir4:fileee";
        let file: File = from_bytes(input).unwrap();
        assert_eq!(file, File { path: vec!["dir", "file"], length: 42, md5sum: None });
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let input = b"d5:extrald1:xi1eee6:lengthi1e4:pathle6:md5sum3:abce";
        let file: File = from_bytes(input).unwrap();
        assert_eq!(file.md5sum.as_deref(), Some("abc"));
        assert!(file.path.is_empty());
    }

    #[test]
    fn tuples_consume_their_list() {
        let pair: ((u8, u8), u8) = from_bytes(b"lli1ei2eei3ee").unwrap();
        assert_eq!(pair, ((1, 2), 3));
        let err = from_bytes::<(u8, u8)>(b"li1ei2ei3ee").unwrap_err();
        assert!(matches!(err.into_inner(), Error::Decode(DecodeError::TypeMismatch { expected: "end of list", found: b'i' })));
    }

    #[test]
    fn enums() {
        assert_eq!(from_bytes::<Event>(b"7:Started").unwrap(), Event::Started);
        assert_eq!(from_bytes::<Event>(b"d7:Stoppedi9ee").unwrap(), Event::Stopped(9));
        assert_eq!(from_bytes::<Event>(b"d5:Movedd4:fromi1e2:toi2eee").unwrap(), Event::Moved { from: 1, to: 2 });
        assert!(from_bytes::<Event>(b"d7:Startedi0ee").is_err());
    }

    #[test]
    fn integer_keys() {
        let map: HashMap<u32, String> = from_bytes(b"d4:170110:Enterprise5:746567:Voyagere").unwrap();
        assert_eq!(map[&1701], "Enterprise");
        assert_eq!(map[&74656], "Voyager");
        assert!(matches!(from_bytes::<HashMap<u16, String>>(b"d5:746567:Voyagere").unwrap_err().into_inner(), Error::Key(_, "u16")));
    }

    #[test]
    fn errors() {
        assert!(matches!(from_bytes::<u8>(b"i256e").unwrap_err().into_inner(), Error::Int));
        assert!(matches!(from_bytes::<u8>(b"i1ei2e").unwrap_err().into_inner(), Error::Trailing));
        assert!(matches!(from_bytes::<String>(&[b'2', b':', 0xc3, 0x28]).unwrap_err().into_inner(), Error::Utf8(_)));
        assert!(matches!(from_bytes::<HashMap<u8, u8>>(b"d3:onei1ee").unwrap_err().into_inner(), Error::Key(_, "u8")));
        let err = from_bytes::<Vec<u8>>(b"li1e4:spame").unwrap_err();
        assert_eq!(err.position(), 5);
        assert!(matches!(err.into_inner(), Error::Decode(DecodeError::TypeMismatch { expected: "integer", found: b'4' })));
    }

    #[test]
    fn from_stream() {
        let file: HashMap<String, Vec<u32>> = from_reader(&b"d1:ali1ei2ee1:blee"[..]).unwrap();
        assert_eq!(file["a"], [1, 2]);
        assert!(file["b"].is_empty());
    }

    #[test]
    fn one_value_at_a_time() {
        let mut deserializer = Deserializer::from_bytes(b"i7e3:abc");
        assert_eq!(u8::deserialize(&mut deserializer).unwrap(), 7);
        assert_eq!(deserializer.position(), 3);
        assert_eq!(deserializer.into_source().remaining(), b"3:abc");
    }

}
