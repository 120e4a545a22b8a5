use crate::error::EncodeError;
use crate::token::Token;
use crate::value::{Dictionary, Value};
use std::io::Write;

/// Holds the bencode form of a single value. Bytes, text and the sink all see the identical byte
/// sequence, which is produced once on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoder {
    buffer: Vec<u8>,
}

impl Encoder {

    pub fn from_int(i: i64) -> Self {
        Self::from_token(Token::Int(i))
    }

    pub fn from_uint(u: u64) -> Self {
        Self::from_token(Token::Uint(u))
    }

    pub fn from_bytes<B: ?Sized + AsRef<[u8]>>(bytes: &B) -> Self {
        Self::from_token(Token::Bytes(bytes.as_ref()))
    }

    pub fn from_list(list: &[Value]) -> Self {
        let mut buffer = Vec::new();
        Self::append_list(list, &mut buffer);
        Self { buffer }
    }

    pub fn from_dict(dict: &Dictionary) -> Self {
        let mut buffer = Vec::new();
        Self::append_dict(dict, &mut buffer);
        Self { buffer }
    }

    pub fn from_value(value: &Value) -> Self {
        let mut buffer = Vec::new();
        Self::append(value, &mut buffer);
        Self { buffer }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// The encoded bytes as text. Only fails when a byte string in the value is not valid UTF-8.
    pub fn as_str(&self) -> Result<&str, EncodeError> {
        Ok(std::str::from_utf8(&self.buffer)?)
    }

    /// Returns the number of written bytes
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<usize, EncodeError> {
        w.write_all(&self.buffer)?;
        Ok(self.buffer.len())
    }

    /// Encode a value straight to the given writer without buffering it first. The resulting
    /// `usize` is the amount of bytes that got written.
    pub fn encode<W: Write>(value: &Value, w: &mut W) -> Result<usize, EncodeError> {
        match value {
            Value::Int(i)   => Token::Int(*i).encode(w),
            Value::Bytes(b) => Token::Bytes(b).encode(w),
            Value::List(l)  => {
                let mut c = Token::List.encode(w)?;
                for element in l {
                    c += Self::encode(element, w)?;
                }
                Ok(c + Token::End.encode(w)?)
            },
            Value::Dict(d)  => {
                let mut c = Token::Dict.encode(w)?;
                for (key, val) in d {
                    c += Token::Bytes(key).encode(w)?;
                    c += Self::encode(val, w)?;
                }
                Ok(c + Token::End.encode(w)?)
            },
        }
    }

    fn from_token(token: Token) -> Self {
        let mut buffer = Vec::new();
        token.append(&mut buffer);
        Self { buffer }
    }

    fn append(value: &Value, buf: &mut Vec<u8>) {
        match value {
            Value::Int(i)   => Token::Int(*i).append(buf),
            Value::Bytes(b) => Token::Bytes(b).append(buf),
            Value::List(l)  => Self::append_list(l, buf),
            Value::Dict(d)  => Self::append_dict(d, buf),
        }
    }

    fn append_list(list: &[Value], buf: &mut Vec<u8>) {
        Token::List.append(buf);
        for element in list {
            Self::append(element, buf);
        }
        Token::End.append(buf);
    }

    fn append_dict(dict: &Dictionary, buf: &mut Vec<u8>) {
        Token::Dict.append(buf);
        for (key, val) in dict {
            Token::Bytes(key).append(buf);
            Self::append(val, buf);
        }
        Token::End.append(buf);
    }

}

impl AsRef<[u8]> for Encoder {
    fn as_ref(&self) -> &[u8] {
        &self.buffer
    }
}

#[cfg(test)]
mod test {
    use super::Encoder;
    use crate::error::EncodeError;
    use crate::value::{Dictionary, Value};
    use std::borrow::Cow;
    use std::io;

    fn dict<'a>(entries: Vec<(&'a str, Value<'a>)>) -> Dictionary<'a> {
        entries.into_iter().map(|(k, v)| (Cow::Borrowed(k.as_bytes()), v)).collect()
    }

    #[test]
    fn scalars() {
        assert_eq!(Encoder::from_int(0).as_bytes(), b"i0e");
        assert_eq!(Encoder::from_int(-1).as_str().unwrap(), "i-1e");
        assert_eq!(Encoder::from_uint(u64::MAX).as_bytes(), b"i18446744073709551615e");
        assert_eq!(Encoder::from_bytes("spam").into_bytes(), b"4:spam");
        assert_eq!(Encoder::from_bytes(b"").as_bytes(), b"0:");
    }

    #[test]
    fn containers() {
        let list = [Value::from("spam"), Value::from("eggs")];
        assert_eq!(Encoder::from_list(&list).as_bytes(), b"l4:spam4:eggse");
        assert_eq!(Encoder::from_list(&[]).as_bytes(), b"le");
        let d = dict(vec![("cow", Value::from("moo")), ("spam", Value::from("eggs"))]);
        assert_eq!(Encoder::from_dict(&d).as_bytes(), b"d3:cow3:moo4:spam4:eggse");
        assert_eq!(Encoder::from_dict(&Dictionary::new()).as_bytes(), b"de");
    }

    #[test]
    fn insertion_order_is_kept() {
        let d = dict(vec![("zebra", Value::Int(1)), ("aardvark", Value::Int(2))]);
        assert_eq!(Encoder::from_value(&Value::Dict(d)).as_bytes(), b"d5:zebrai1e8:aardvarki2ee");
    }

    #[test]
    fn every_view_agrees() {
        let value = Value::List(vec![
            Value::Int(42),
            Value::from("Üben von Xylophon und Querflöte ist ja zweckmäßig."),
            Value::Dict(dict(vec![("k", Value::List(vec![]))])),
        ]);
        let encoder = Encoder::from_value(&value);
        let mut streamed = Vec::new();
        assert_eq!(Encoder::encode(&value, &mut streamed).unwrap(), streamed.len());
        let mut written = Vec::new();
        assert_eq!(encoder.write_to(&mut written).unwrap(), written.len());
        assert_eq!(encoder.as_bytes(), &streamed[..]);
        assert_eq!(encoder.as_bytes(), &written[..]);
        assert_eq!(encoder.as_str().unwrap().as_bytes(), encoder.as_bytes());
        assert_eq!(encoder, Encoder::from_value(&value));
    }

    #[test]
    fn binary_is_not_text() {
        let encoder = Encoder::from_bytes(&[0xc3u8, 0x28]);
        assert!(matches!(encoder.as_str(), Err(EncodeError::Utf8(_))));
        assert_eq!(encoder.as_bytes(), [b'2', b':', 0xc3, 0x28]);
    }

    struct Closed;

    impl io::Write for Closed {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_errors() {
        assert!(matches!(Encoder::from_int(1).write_to(&mut Closed), Err(EncodeError::Io(_))));
        assert!(matches!(Encoder::encode(&Value::Int(1), &mut Closed), Err(EncodeError::Io(_))));
    }

}
