//! The atom of a bencode document is the `Value`. There are only four kinds: integers, byte strings,
//! lists and dictionaries. Byte strings carry no encoding, text is merely a byte string that happens
//! to be valid UTF-8. Dictionary keys are byte strings as well.

use indexmap::IndexMap;
use std::borrow::Cow;
use std::iter::repeat;

/// Dictionary entries in the order they were first inserted. Inserting an existing key replaces the
/// value but keeps the original position.
pub type Dictionary<'a> = IndexMap<Cow<'a, [u8]>, Value<'a>>;

/// The possible values according to the bencode data model.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Int(i64),
    Bytes(Cow<'a, [u8]>),
    List(Vec<Value<'a>>),
    Dict(Dictionary<'a>),
}

impl<'a> Value<'a> {

    fn b64(input: &[u8]) -> String {
        const CHAR_SET: &[char] = &['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N',
            'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g',
            'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
            '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '+', '/'
        ];
        let mut array = [0; 4];
        input.chunks(3).flat_map(|chunk| {
            let len = chunk.len();
            array[1..1 + len].copy_from_slice(chunk);
            for slot in array.iter_mut().skip(1 + len) {
                *slot = 0;
            }
            let x = u32::from_be_bytes(array);
            (0..=len).map(move |o| CHAR_SET[(x >> (18 - 6*o) & 0x3f) as usize]).chain(repeat('=').take(3 - len))
        }).collect()
    }

    /// Byte strings that are valid UTF-8 render as quoted text, everything else as quoted base64.
    fn quoted(bytes: &[u8]) -> String {
        match std::str::from_utf8(bytes) {
            Ok(s)  => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")),
            Err(_) => format!("'{}'", Self::b64(bytes)),
        }
    }

    pub fn typename(&self) -> &'static str {
        match *self {
            Self::Int(_)   => "integer",
            Self::Bytes(_) => "byte string",
            Self::List(_)  => "list",
            Self::Dict(_)  => "dictionary",
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Self::Int(i) => Some(i),
            _            => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _              => None,
        }
    }

    /// The byte string as text, if it is one and it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_list(&self) -> Option<&[Value<'a>]> {
        match self {
            Self::List(l) => Some(l),
            _             => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary<'a>> {
        match self {
            Self::Dict(d) => Some(d),
            _             => None,
        }
    }

    /// Look up `key` if this is a dictionary.
    pub fn get<K: AsRef<[u8]>>(&self, key: K) -> Option<&Value<'a>> {
        self.as_dict().and_then(|d| d.get(key.as_ref()))
    }

    /// Detach the value from the buffer it was decoded from.
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Self::Int(i)   => Value::Int(i),
            Self::Bytes(b) => Value::Bytes(Cow::Owned(b.into_owned())),
            Self::List(l)  => Value::List(l.into_iter().map(Value::into_owned).collect()),
            Self::Dict(d)  => Value::Dict(d.into_iter().map(|(k, v)| (Cow::Owned(k.into_owned()), v.into_owned())).collect()),
        }
    }

}

macro_rules! from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value<'_> {
                fn from(i: $t) -> Self {
                    Value::Int(i as i64)
                }
            }
        )*
    }
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::Bytes(Cow::Borrowed(s.as_bytes()))
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Value::Bytes(Cow::Owned(s.into_bytes()))
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(b: &'a [u8]) -> Self {
        Value::Bytes(Cow::Borrowed(b))
    }
}

impl From<Vec<u8>> for Value<'_> {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Cow::Owned(b))
    }
}

impl<'a> From<Vec<Value<'a>>> for Value<'a> {
    fn from(l: Vec<Value<'a>>) -> Self {
        Value::List(l)
    }
}

impl<'a> From<Dictionary<'a>> for Value<'a> {
    fn from(d: Dictionary<'a>) -> Self {
        Value::Dict(d)
    }
}

impl<'a> std::fmt::Display for Value<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v)                   => write!(f, "{}", v),
            Value::Bytes(v)                 => f.write_str(&Self::quoted(v)),
            Value::List(v) if v.is_empty()  => f.write_str("[]"),
            Value::Dict(v) if v.is_empty()  => f.write_str("{}"),
            Value::List(v)                  => write!(f, "[\n{}\n]", v.iter()
                .flat_map(|f| format!("{},", f).lines().map(|line| format!("  {}", line)).collect::<Vec<String>>())
                .collect::<Vec<String>>().join("\n")),
            Value::Dict(v)                  => write!(f, "{{\n{}\n}}", v.iter()
                .flat_map(|(k, f)| format!("{}: {},", Self::quoted(k), f).lines().map(|line| format!("  {}", line)).collect::<Vec<String>>())
                .collect::<Vec<String>>().join("\n")),
        }
    }
}
