use std::fmt::{Display, Formatter, self};

/// A `DecodeError` together with the number of bytes the source had consumed when it occurred.
#[derive(Debug)]
pub struct DecoderError {
    inner: DecodeError,
    at: usize,
}

impl DecoderError {
    pub fn into_inner(self) -> DecodeError {
        self.inner
    }

    pub fn inner(&self) -> &DecodeError {
        &self.inner
    }

    pub fn position(&self) -> usize {
        self.at
    }
}

impl std::error::Error for DecoderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
       Some(&self.inner)
    }
}

impl Display for DecoderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{} at input position {}", self.inner, self.at)
    }
}

#[derive(Debug)]
pub enum DecodeError {
    /// The input ended in the middle of a token or container
    Eof,
    /// A digit run was empty, malformed, too long or overflowed `i64`
    InvalidNumber(String),
    NegativeLength(i64),
    Length(i64),
    Allocation,
    TypeMismatch { expected: &'static str, found: u8 },
    Depth(usize),
    NoProgress { stalls: usize },
    Io(std::io::Error),
}

impl DecodeError {
    pub fn at(self, at: usize) -> DecoderError {
        DecoderError { inner: self, at }
    }

    /// Whether this error stems from malformed input rather than from the caller or the producer.
    pub fn is_format(&self) -> bool {
        matches!(self,
            DecodeError::Eof
            | DecodeError::InvalidNumber(_)
            | DecodeError::NegativeLength(_)
            | DecodeError::Length(_)
            | DecodeError::Allocation)
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(e: std::io::Error) -> DecodeError {
        DecodeError::Io(e)
    }
}

impl From<std::collections::TryReserveError> for DecodeError {
    fn from(_e: std::collections::TryReserveError) -> DecodeError {
        DecodeError::Allocation
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            DecodeError::Eof => f.write_str("Unexpected end of input while decoding"),
            DecodeError::InvalidNumber(digits) => write!(f, "Invalid number {:?}", digits),
            DecodeError::NegativeLength(value) => write!(f, "Invalid string length {}", value),
            DecodeError::Length(value) => write!(f, "Length {} exceeds maximum {}", value, usize::MAX),
            DecodeError::Allocation => f.write_str("An allocation failed"),
            DecodeError::TypeMismatch { expected, found } => write!(f, "Expected {}, found tag {:?}", expected, char::from(*found)),
            DecodeError::Depth(limit) => write!(f, "Nesting exceeds maximum depth {}", limit),
            DecodeError::NoProgress { stalls } => write!(f, "Source made no progress after {} empty reads", stalls),
            DecodeError::Io(e) => write!(f, "IO error {}", e),
        }
    }
}

#[derive(Debug)]
pub enum EncodeError {
    Io(std::io::Error),
    Unsupported(&'static str),
    Utf8(std::str::Utf8Error),
}

impl From<std::io::Error> for EncodeError {
    fn from(e: std::io::Error) -> EncodeError {
        EncodeError::Io(e)
    }
}

impl From<std::str::Utf8Error> for EncodeError {
    fn from(e: std::str::Utf8Error) -> EncodeError {
        EncodeError::Utf8(e)
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Io(e) => Some(e),
            EncodeError::Utf8(e) => Some(e),
            EncodeError::Unsupported(_) => None,
        }
    }
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            EncodeError::Io(e) => write!(f, "IO error {}", e),
            EncodeError::Unsupported(kind) => write!(f, "Values of kind {} can not be encoded", kind),
            EncodeError::Utf8(e) => write!(f, "Encoded bytes aren't valid Utf-8: {}", e),
        }
    }
}

/// A broken contract between this crate and its caller or byte producer. These are never returned
/// as errors: the offending operation panics with the fault's message.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Fault {
    /// `push_back` without a directly preceding `next_byte`
    PushBack,
    /// The producer reported a negative byte count
    NegativeRead(isize),
    /// The producer reported more bytes than fit into the buffer it was handed
    Overread { count: usize, space: usize },
}

impl Fault {
    #[cold]
    pub(crate) fn raise(self) -> ! {
        panic!("source fault: {}", self)
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fault::PushBack => f.write_str("push_back must directly follow next_byte"),
            Fault::NegativeRead(count) => write!(f, "producer returned a negative read of {}", count),
            Fault::Overread { count, space } => write!(f, "producer returned {} bytes into a buffer of {}", count, space),
        }
    }
}

#[cfg(test)]
mod test {
    use super::DecodeError;
    use std::io;

    #[test]
    fn format_errors() {
        assert!(DecodeError::Eof.is_format());
        assert!(DecodeError::InvalidNumber("+1".into()).is_format());
        assert!(DecodeError::NegativeLength(-1).is_format());
        assert!(DecodeError::Length(i64::MAX).is_format());
        assert!(DecodeError::Allocation.is_format());
        assert!(!DecodeError::TypeMismatch { expected: "list", found: b'x' }.is_format());
        assert!(!DecodeError::Depth(3).is_format());
        assert!(!DecodeError::NoProgress { stalls: 101 }.is_format());
        assert!(!DecodeError::Io(io::Error::new(io::ErrorKind::Other, "gone")).is_format());
    }

    #[test]
    fn position_in_message() {
        assert!(DecodeError::Eof.at(7).to_string().ends_with("at input position 7"));
    }
}
