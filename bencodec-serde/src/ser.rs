use serde::{ser, Serialize};
use bencodec::{EncodeError, Token};
use std::io::Write;

use crate::error::{Error, Result};

pub struct Serializer<W> {
    output: W,
}

pub fn to_bytes<T: ?Sized + Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut serializer = Serializer::new(Vec::new());
    value.serialize(&mut serializer)?;
    Ok(serializer.into_inner())
}

pub fn to_writer<T: ?Sized + Serialize, W: Write>(writer: W, value: &T) -> Result<()> {
    let mut serializer = Serializer::new(writer);
    value.serialize(&mut serializer)?;
    Ok(())
}

impl<W: Write> Serializer<W> {

    pub fn new(output: W) -> Self {
        Self { output }
    }

    pub fn into_inner(self) -> W {
        self.output
    }

    #[inline]
    fn token(&mut self, token: Token) -> Result<()> {
        token.encode(&mut self.output)?;
        Ok(())
    }

    /// Newtype, tuple and struct variants are wrapped in a dictionary with the variant name as its
    /// only key.
    fn open_variant(&mut self, variant: &'static str) -> Result<()> {
        self.token(Token::Dict)?;
        self.token(Token::Bytes(variant.as_bytes()))
    }

}

fn unsupported<T>(kind: &'static str) -> Result<T> {
    Err(Error::Encode(EncodeError::Unsupported(kind)))
}

impl<'a, W: Write> ser::Serializer for &'a mut Serializer<W> {

    type Ok = ();
    type Error = Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _v: bool) -> Result<()> {
        unsupported("bool")
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.token(Token::Int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.token(Token::Uint(v))
    }

    fn serialize_f32(self, _v: f32) -> Result<()> {
        unsupported("f32")
    }

    fn serialize_f64(self, _v: f64) -> Result<()> {
        unsupported("f64")
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.serialize_str(v.encode_utf8(&mut [0; 4]))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.token(Token::Bytes(v.as_bytes()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.token(Token::Bytes(v))
    }

    fn serialize_none(self) -> Result<()> {
        unsupported("none")
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        unsupported("unit")
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        unsupported("unit struct")
    }

    fn serialize_unit_variant(self, _name: &'static str, _index: u32, variant: &'static str) -> Result<()> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _name: &'static str, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(self, _name: &'static str, _index: u32, variant: &'static str, value: &T) -> Result<()> {
        self.open_variant(variant)?;
        value.serialize(&mut *self)?;
        self.token(Token::End)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        self.token(Token::List)?;
        Ok(self)
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeTupleStruct> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(self, _name: &'static str, _index: u32, variant: &'static str, _len: usize) -> Result<Self::SerializeTupleVariant> {
        self.open_variant(variant)?;
        self.token(Token::List)?;
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        self.token(Token::Dict)?;
        Ok(self)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        self.token(Token::Dict)?;
        Ok(self)
    }

    fn serialize_struct_variant(self, _name: &'static str, _index: u32, variant: &'static str, _len: usize) -> Result<Self::SerializeStructVariant> {
        self.open_variant(variant)?;
        self.token(Token::Dict)?;
        Ok(self)
    }

}

impl<'a, W: Write> ser::SerializeSeq for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<()> {
        self.token(Token::End)
    }

}

impl<'a, W: Write> ser::SerializeTuple for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<()> {
        self.token(Token::End)
    }
}

impl<'a, W: Write> ser::SerializeTupleStruct for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<()> {
        self.token(Token::End)
    }
}

impl<'a, W: Write> ser::SerializeTupleVariant for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut **self)
    }

    /// Closes the list and the wrapping dictionary
    fn end(self) -> Result<()> {
        self.token(Token::End)?;
        self.token(Token::End)
    }
}

impl<'a, W: Write> ser::SerializeMap for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        key.serialize(KeySerializer { output: &mut self.output })
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<()> {
        self.token(Token::End)
    }

}

impl<'a, W: Write> ser::SerializeStruct for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.token(Token::Bytes(key.as_bytes()))?;
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<()> {
        self.token(Token::End)
    }

}

impl<'a, W: Write> ser::SerializeStructVariant for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.token(Token::Bytes(key.as_bytes()))?;
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<()> {
        self.token(Token::End)?;
        self.token(Token::End)
    }

}

/// Dictionary keys are byte strings. Strings and bytes pass through, integers and chars are
/// written as their text, anything else is rejected.
struct KeySerializer<'a, W> {
    output: &'a mut W,
}

impl<'a, W: Write> KeySerializer<'a, W> {
    fn key(self, key: &[u8]) -> Result<()> {
        Token::Bytes(key).encode(self.output)?;
        Ok(())
    }
}

macro_rules! integer_keys {
    ($($method:ident: $t:ty),*) => {
        $(
            fn $method(self, v: $t) -> Result<()> {
                self.key(v.to_string().as_bytes())
            }
        )*
    }
}

impl<'a, W: Write> ser::Serializer for KeySerializer<'a, W> {

    type Ok = ();
    type Error = Error;
    type SerializeSeq = ser::Impossible<(), Error>;
    type SerializeTuple = ser::Impossible<(), Error>;
    type SerializeTupleStruct = ser::Impossible<(), Error>;
    type SerializeTupleVariant = ser::Impossible<(), Error>;
    type SerializeMap = ser::Impossible<(), Error>;
    type SerializeStruct = ser::Impossible<(), Error>;
    type SerializeStructVariant = ser::Impossible<(), Error>;

    integer_keys!(serialize_i8: i8, serialize_i16: i16, serialize_i32: i32, serialize_i64: i64,
        serialize_u8: u8, serialize_u16: u16, serialize_u32: u32, serialize_u64: u64);

    fn serialize_char(self, v: char) -> Result<()> {
        self.key(v.encode_utf8(&mut [0; 4]).as_bytes())
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.key(v.as_bytes())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.key(v)
    }

    fn serialize_unit_variant(self, _name: &'static str, _index: u32, variant: &'static str) -> Result<()> {
        self.key(variant.as_bytes())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _name: &'static str, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<()> {
        Err(Error::KeyType)
    }

    fn serialize_f32(self, _v: f32) -> Result<()> {
        Err(Error::KeyType)
    }

    fn serialize_f64(self, _v: f64) -> Result<()> {
        Err(Error::KeyType)
    }

    fn serialize_none(self) -> Result<()> {
        Err(Error::KeyType)
    }

    fn serialize_unit(self) -> Result<()> {
        Err(Error::KeyType)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Err(Error::KeyType)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(self, _name: &'static str, _index: u32, _variant: &'static str, _value: &T) -> Result<()> {
        Err(Error::KeyType)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(Error::KeyType)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(Error::KeyType)
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeTupleStruct> {
        Err(Error::KeyType)
    }

    fn serialize_tuple_variant(self, _name: &'static str, _index: u32, _variant: &'static str, _len: usize) -> Result<Self::SerializeTupleVariant> {
        Err(Error::KeyType)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(Error::KeyType)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(Error::KeyType)
    }

    fn serialize_struct_variant(self, _name: &'static str, _index: u32, _variant: &'static str, _len: usize) -> Result<Self::SerializeStructVariant> {
        Err(Error::KeyType)
    }

}

#[cfg(test)]
mod test {
    use super::to_bytes;
    use crate::error::Error;
    use bencodec::EncodeError;
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    enum Shape {
        Point,
        Circle(u32),
        Line(i8, i8),
        Rect { w: u16, h: u16 },
    }

    #[test]
    fn scalars() {
        assert_eq!(to_bytes(&-7i8).unwrap(), b"i-7e");
        assert_eq!(to_bytes(&u64::MAX).unwrap(), b"i18446744073709551615e");
        assert_eq!(to_bytes("Querflöte").unwrap(), "10:Querflöte".as_bytes());
        assert_eq!(to_bytes(&'ß').unwrap(), "2:ß".as_bytes());
        assert_eq!(to_bytes(&Some(1u8)).unwrap(), b"i1e");
    }

    #[test]
    fn containers() {
        assert_eq!(to_bytes(&vec![1, 2]).unwrap(), b"li1ei2ee");
        assert_eq!(to_bytes(&(1, "a")).unwrap(), b"li1e1:ae");
        assert_eq!(to_bytes(&Vec::<u8>::new()).unwrap(), b"le");
        let map: BTreeMap<u32, &str> = [(10, "ten"), (2, "two")].into_iter().collect();
        assert_eq!(to_bytes(&map).unwrap(), b"d1:23:two2:103:tene");
    }

    #[test]
    fn variants() {
        assert_eq!(to_bytes(&Shape::Point).unwrap(), b"5:Point");
        assert_eq!(to_bytes(&Shape::Circle(3)).unwrap(), b"d6:Circlei3ee");
        assert_eq!(to_bytes(&Shape::Line(-1, 1)).unwrap(), b"d4:Lineli-1ei1eee");
        assert_eq!(to_bytes(&Shape::Rect { w: 2, h: 1 }).unwrap(), b"d4:Rectd1:wi2e1:hi1eee");
    }

    #[test]
    fn unsupported_kinds() {
        let kind = |r: crate::error::Result<Vec<u8>>| match r {
            Err(Error::Encode(EncodeError::Unsupported(kind))) => kind,
            other => panic!("expected an unsupported kind, got {:?}", other),
        };
        assert_eq!(kind(to_bytes(&true)), "bool");
        assert_eq!(kind(to_bytes(&1.5f32)), "f32");
        assert_eq!(kind(to_bytes(&1.5f64)), "f64");
        assert_eq!(kind(to_bytes(&())), "unit");
        assert_eq!(kind(to_bytes(&None::<u8>)), "none");
        assert_eq!(kind(to_bytes(&vec![Some(1), None])), "none");
    }

    #[test]
    fn key_types() {
        let map: BTreeMap<(u8, u8), u8> = [((1, 2), 3)].into_iter().collect();
        assert!(matches!(to_bytes(&map), Err(Error::KeyType)));
        let map: BTreeMap<bool, u8> = [(true, 3)].into_iter().collect();
        assert!(matches!(to_bytes(&map), Err(Error::KeyType)));
        let map: BTreeMap<char, u8> = [('k', 3)].into_iter().collect();
        assert_eq!(to_bytes(&map).unwrap(), b"d1:ki3ee");
    }

}
