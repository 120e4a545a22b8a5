//! A byte source over a producer that hands out data in chunks of its own choosing. The source owns a
//! fixed buffer that is compacted in place and refilled on demand, so memory stays bounded no
//! matter how long the stream is. Only byte strings are materialized in full.
//!
//! Producers are allowed to misbehave within limits: short reads and reads of zero bytes are fine,
//! but a producer that returns nothing for more than `max_stalls` consecutive calls is given up on
//! with `DecodeError::NoProgress`. A negative count or a count larger than the offered buffer is a
//! broken contract and panics with a `Fault`.

use crate::error::{DecodeError, Fault};
use crate::source::{parse_number, ByteSource, MAX_NUMBER_LEN};
use std::borrow::Cow;
use std::io::{ErrorKind, Read};
use tracing::{debug, trace};

/// The outcome of a single `Producer::produce` call next to the byte count.
#[derive(Debug)]
pub enum Status {
    /// More data may follow
    More,
    /// The stream is exhausted; the count of this call may still be non-zero
    End,
    /// The producer failed; the count of this call is still accounted for
    Failed(std::io::Error),
}

/// The external side of a `StreamSource`. Fill `buf` with up to `buf.len()` bytes and report how
/// many were written. The count must never be negative nor exceed `buf.len()`.
pub trait Producer {
    fn produce(&mut self, buf: &mut [u8]) -> (isize, Status);
}

impl<P: Producer + ?Sized> Producer for &mut P {
    fn produce(&mut self, buf: &mut [u8]) -> (isize, Status) {
        (**self).produce(buf)
    }
}

/// Adapts any `std::io::Read`. A read of zero bytes into a non-empty buffer is the end of the
/// stream, interrupted and would-block reads count as stalls.
pub struct ReadProducer<R> {
    reader: R,
}

impl<R: Read> ReadProducer<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Producer for ReadProducer<R> {
    fn produce(&mut self, buf: &mut [u8]) -> (isize, Status) {
        match self.reader.read(buf) {
            Ok(0) if !buf.is_empty() => (0, Status::End),
            Ok(n) => (n as isize, Status::More),
            Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => (0, Status::More),
            Err(e) => (0, Status::Failed(e)),
        }
    }
}

/// Tuning knobs of a `StreamSource`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConfig {
    /// Size of the internal buffer in bytes
    pub capacity: usize,
    /// Number tokens refill the buffer whenever fewer bytes than this are buffered
    pub lookahead: usize,
    /// Consecutive empty reads tolerated before giving up
    pub max_stalls: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { capacity: 1024, lookahead: MAX_NUMBER_LEN, max_stalls: 100 }
    }
}

impl StreamConfig {

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn with_max_stalls(mut self, max_stalls: usize) -> Self {
        self.max_stalls = max_stalls;
        self
    }

    fn normalized(self) -> Self {
        let capacity = self.capacity.max(1);
        Self { capacity, lookahead: self.lookahead.clamp(1, capacity), max_stalls: self.max_stalls }
    }

}

/// Stream-backed byte source. Bytes in `buf[start..end]` are buffered but not consumed yet.
pub struct StreamSource<P> {
    producer: P,
    config: StreamConfig,
    buf: Box<[u8]>,
    start: usize,
    end: usize,
    /// Total bytes consumed, for error positions
    offset: usize,
    /// Scratch space for number tokens spanning more than one fill
    digits: Vec<u8>,
    can_push_back: bool,
}

impl<R: Read> StreamSource<ReadProducer<R>> {
    pub fn from_reader(reader: R) -> Self {
        Self::new(ReadProducer::new(reader))
    }
}

impl<P: Producer> StreamSource<P> {

    pub fn new(producer: P) -> Self {
        Self::with_config(producer, StreamConfig::default())
    }

    pub fn with_config(producer: P, config: StreamConfig) -> Self {
        let config = config.normalized();
        Self {
            producer,
            buf: vec![0; config.capacity].into_boxed_slice(),
            config,
            start: 0,
            end: 0,
            offset: 0,
            digits: Vec::with_capacity(MAX_NUMBER_LEN + 1),
            can_push_back: false,
        }
    }

    pub fn config(&self) -> StreamConfig {
        self.config
    }

    /// The bytes buffered but not consumed yet.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }

    pub fn into_producer(self) -> P {
        self.producer
    }

    #[inline]
    fn available(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    fn consume(&mut self, len: usize) {
        self.start += len;
        self.offset += len;
    }

    /// Call the producer once and check the count against the contract.
    fn produce_into(producer: &mut P, buf: &mut [u8]) -> (usize, Status) {
        let space = buf.len();
        let (count, status) = producer.produce(buf);
        if count < 0 {
            Fault::NegativeRead(count).raise();
        }
        let count = count as usize;
        if count > space {
            Fault::Overread { count, space }.raise();
        }
        (count, status)
    }

    /// Move the unconsumed bytes to the front, then read until the buffer is full, the producer ends
    /// with at least one byte buffered, or it fails.
    fn fill(&mut self) -> Result<(), DecodeError> {
        if self.available() == self.buf.len() {
            return Ok(());
        }
        self.buf.copy_within(self.start..self.end, 0);
        self.end -= self.start;
        self.start = 0;
        let mut stalls = 0;
        let mut calls = 0usize;
        loop {
            let (count, status) = Self::produce_into(&mut self.producer, &mut self.buf[self.end..]);
            calls += 1;
            self.end += count;
            match status {
                Status::Failed(e) => {
                    debug!(error = %e, "producer failed while filling");
                    return Err(DecodeError::Io(e));
                },
                Status::End if self.end > 0 => break,
                Status::End => return Err(DecodeError::Eof),
                Status::More if self.end == self.buf.len() => break,
                Status::More if count == 0 => {
                    stalls += 1;
                    if stalls > self.config.max_stalls {
                        debug!(stalls, "producer stalled while filling");
                        return Err(DecodeError::NoProgress { stalls });
                    }
                },
                Status::More => stalls = 0,
            }
        }
        trace!(buffered = self.end, calls, "filled stream buffer");
        Ok(())
    }

}

impl<P: Producer> ByteSource<'static> for StreamSource<P> {

    fn next_byte(&mut self) -> Result<u8, DecodeError> {
        self.can_push_back = false;
        if self.available() < 1 {
            self.fill()?;
        }
        let byte = self.buf[self.start];
        self.consume(1);
        self.can_push_back = true;
        Ok(byte)
    }

    fn push_back(&mut self) {
        if !self.can_push_back || self.start == 0 {
            Fault::PushBack.raise();
        }
        self.can_push_back = false;
        self.start -= 1;
        self.offset -= 1;
    }

    fn read_number_until(&mut self, separator: u8) -> Result<i64, DecodeError> {
        self.can_push_back = false;
        self.digits.clear();
        loop {
            if self.available() < self.config.lookahead {
                self.fill()?;
            }
            let window = &self.buf[self.start..self.end];
            match window.iter().position(|&b| b == separator) {
                Some(i) => {
                    self.digits.extend_from_slice(&window[..i]);
                    self.consume(i + 1);
                    return parse_number(&self.digits);
                },
                None => {
                    self.digits.extend_from_slice(window);
                    let len = window.len();
                    self.consume(len);
                    if self.digits.len() > MAX_NUMBER_LEN {
                        return Err(DecodeError::InvalidNumber(String::from_utf8_lossy(&self.digits).into_owned()));
                    }
                },
            }
        }
    }

    fn read_exact(&mut self, len: usize) -> Result<Cow<'static, [u8]>, DecodeError> {
        self.can_push_back = false;
        let buffered = self.available();
        if buffered >= len {
            let bytes = self.buf[self.start..self.start + len].to_vec();
            self.consume(len);
            return Ok(Cow::Owned(bytes));
        }
        let mut out = Vec::new();
        out.try_reserve(buffered.max(len.min(self.buf.len())))?;
        out.extend_from_slice(&self.buf[self.start..self.end]);
        self.consume(buffered);
        // the rest bypasses the internal buffer; `out` grows at most geometrically so that a
        // forged length can't make us allocate far ahead of the data that actually arrives
        let mut filled = buffered;
        let mut stalls = 0;
        while filled < len {
            if filled == out.len() {
                let grow = (len - filled).min(filled.max(self.buf.len()));
                out.try_reserve(grow)?;
                out.resize(filled + grow, 0);
            }
            let (count, status) = Self::produce_into(&mut self.producer, &mut out[filled..]);
            filled += count;
            self.offset += count;
            match status {
                Status::Failed(e) => {
                    debug!(error = %e, "producer failed during direct read");
                    return Err(DecodeError::Io(e));
                },
                _ if filled == len => break,
                Status::End => return Err(DecodeError::Eof),
                Status::More if count == 0 => {
                    stalls += 1;
                    if stalls > self.config.max_stalls {
                        debug!(stalls, "producer stalled during direct read");
                        return Err(DecodeError::NoProgress { stalls });
                    }
                },
                Status::More => stalls = 0,
            }
        }
        trace!(len, direct = len - buffered, "read byte string past the buffer");
        Ok(Cow::Owned(out))
    }

    fn position(&self) -> usize {
        self.offset
    }

}

#[cfg(test)]
mod test {
    use super::{Producer, Status, StreamConfig, StreamSource};
    use crate::decoder::Decoder;
    use crate::error::DecodeError;
    use crate::source::ByteSource;
    use std::io;

    /// Hands out its input `chunk` bytes at a time and reports the end together with the last chunk.
    struct Chunked<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Producer for Chunked<'_> {
        fn produce(&mut self, buf: &mut [u8]) -> (isize, Status) {
            let n = self.data.len().min(self.chunk).min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            (n as isize, if self.data.is_empty() { Status::End } else { Status::More })
        }
    }

    /// Returns `stalls` empty reads before every chunk.
    struct Stalling<'a> {
        inner: Chunked<'a>,
        stalls: usize,
        left: usize,
    }

    impl Producer for Stalling<'_> {
        fn produce(&mut self, buf: &mut [u8]) -> (isize, Status) {
            if self.left > 0 {
                self.left -= 1;
                return (0, Status::More);
            }
            self.left = self.stalls;
            self.inner.produce(buf)
        }
    }

    struct Never;

    impl Producer for Never {
        fn produce(&mut self, _buf: &mut [u8]) -> (isize, Status) {
            (0, Status::More)
        }
    }

    struct Negative;

    impl Producer for Negative {
        fn produce(&mut self, _buf: &mut [u8]) -> (isize, Status) {
            (-1, Status::More)
        }
    }

    struct Greedy;

    impl Producer for Greedy {
        fn produce(&mut self, buf: &mut [u8]) -> (isize, Status) {
            (buf.len() as isize + 1, Status::More)
        }
    }

    struct Broken;

    impl Producer for Broken {
        fn produce(&mut self, _buf: &mut [u8]) -> (isize, Status) {
            (0, Status::Failed(io::Error::new(io::ErrorKind::ConnectionReset, "gone")))
        }
    }

    fn chunked(data: &[u8], chunk: usize, capacity: usize) -> StreamSource<Chunked<'_>> {
        StreamSource::with_config(Chunked { data, chunk }, StreamConfig::default().with_capacity(capacity))
    }

    #[test]
    fn bytes_across_fills() {
        let mut source = chunked(b"abc", 1, 2);
        assert_eq!(source.next_byte().unwrap(), b'a');
        assert_eq!(source.next_byte().unwrap(), b'b');
        source.push_back();
        assert_eq!(source.next_byte().unwrap(), b'b');
        assert_eq!(source.next_byte().unwrap(), b'c');
        assert_eq!(source.position(), 3);
        assert!(matches!(source.next_byte(), Err(DecodeError::Eof)));
    }

    #[test]
    fn numbers_spill_over_tiny_buffers() {
        for capacity in 1..8 {
            let mut source = chunked(b"-9223372036854775808e12:", 3, capacity);
            assert_eq!(source.read_number_until(b'e').unwrap(), i64::MIN);
            assert_eq!(source.read_number_until(b':').unwrap(), 12);
            assert_eq!(source.position(), 24);
        }
    }

    #[test]
    fn number_without_separator() {
        assert!(matches!(chunked(b"123", 1, 1024).read_number_until(b':'), Err(DecodeError::Eof)));
        let endless = vec![b'7'; 4096];
        assert!(matches!(chunked(&endless, 1000, 1024).read_number_until(b':'), Err(DecodeError::InvalidNumber(_))));
        assert!(matches!(chunked(&endless, 1, 4).read_number_until(b':'), Err(DecodeError::InvalidNumber(_))));
    }

    #[test]
    fn exact_reads_bypass_the_buffer() {
        let data: Vec<u8> = (0..=255).cycle().take(5000).collect();
        let mut source = chunked(&data, 7, 16);
        assert_eq!(source.next_byte().unwrap(), 0);
        assert_eq!(&*source.read_exact(4998).unwrap(), &data[1..4999]);
        assert_eq!(source.next_byte().unwrap(), data[4999]);
        assert!(matches!(source.read_exact(1), Err(DecodeError::Eof)));
    }

    #[test]
    fn truncated_exact_read() {
        let mut source = chunked(b"spam", 1, 2);
        assert!(matches!(source.read_exact(5), Err(DecodeError::Eof)));
    }

    #[test]
    fn forged_length_does_not_preallocate() {
        let mut source = chunked(b"tiny", 4, 1024);
        assert!(matches!(source.read_exact(usize::MAX / 2), Err(DecodeError::Eof)));
    }

    #[test]
    fn tolerates_stalls_up_to_the_bound() {
        let config = StreamConfig::default().with_max_stalls(3);
        let producer = Stalling { inner: Chunked { data: b"i42e", chunk: 1 }, stalls: 3, left: 3 };
        let mut source = StreamSource::with_config(producer, config);
        assert_eq!(source.next_byte().unwrap(), b'i');
        assert_eq!(source.read_number_until(b'e').unwrap(), 42);

        let producer = Stalling { inner: Chunked { data: b"i42e", chunk: 1 }, stalls: 4, left: 4 };
        let mut source = StreamSource::with_config(producer, config);
        assert!(matches!(source.next_byte(), Err(DecodeError::NoProgress { stalls: 4 })));
    }

    #[test]
    fn stalls_during_direct_reads() {
        let config = StreamConfig::default().with_capacity(2).with_max_stalls(5);
        let producer = Stalling { inner: Chunked { data: b"abcdefgh", chunk: 1 }, stalls: 5, left: 0 };
        let mut source = StreamSource::with_config(producer, config);
        assert_eq!(&*source.read_exact(8).unwrap(), b"abcdefgh");

        let producer = Stalling { inner: Chunked { data: b"abcdefgh", chunk: 1 }, stalls: 6, left: 0 };
        let mut source = StreamSource::with_config(producer, config);
        assert!(matches!(source.read_exact(8), Err(DecodeError::NoProgress { .. })));
    }

    #[test]
    fn no_progress() {
        assert!(matches!(StreamSource::new(Never).next_byte(), Err(DecodeError::NoProgress { stalls: 101 })));
    }

    #[test]
    fn producer_errors_propagate() {
        assert!(matches!(StreamSource::new(Broken).next_byte(), Err(DecodeError::Io(e)) if e.kind() == io::ErrorKind::ConnectionReset));
    }

    #[test]
    #[should_panic(expected = "source fault: producer returned a negative read of -1")]
    fn negative_read() {
        let _ = StreamSource::new(Negative).next_byte();
    }

    #[test]
    #[should_panic(expected = "source fault: producer returned 1025 bytes into a buffer of 1024")]
    fn overread() {
        let _ = StreamSource::new(Greedy).next_byte();
    }

    #[test]
    #[should_panic(expected = "source fault")]
    fn push_back_after_number() {
        let mut source = chunked(b"1:a", 1, 4);
        let _ = source.read_number_until(b':');
        source.push_back();
    }

    #[test]
    fn reader_adapter() {
        let mut source = StreamSource::from_reader(io::Cursor::new(b"4:spam".to_vec()));
        let len = source.read_number_until(b':').unwrap();
        assert_eq!(&*source.read_exact(len as usize).unwrap(), b"spam");
        assert!(matches!(source.next_byte(), Err(DecodeError::Eof)));
        assert_eq!(source.into_producer().into_inner().position(), 6);
    }

    #[test]
    fn buffered_bytes_wait_for_the_decoder() {
        let mut source = chunked(b"i42e4:spam", 16, 16);
        assert_eq!(source.next_byte().unwrap(), b'i');
        assert_eq!(source.buffered(), b"42e4:spam");
        assert_eq!(source.read_number_until(b'e').unwrap(), 42);
        assert_eq!(source.buffered(), b"4:spam");
        assert!(source.into_producer().data.is_empty());
    }

    #[test]
    fn lookahead_does_not_change_the_result() {
        let input: &[u8] = b"d4:sizei-9223372036854775808e5:piecel10:abcdefghij0:i7ee3:zipi00012ee";
        let (expected, _) = Decoder::decode(input).unwrap();
        for lookahead in [1, 2, 5, 22, 64] {
            for capacity in [1, 3, 8, 23, 64] {
                let config = StreamConfig::default().with_capacity(capacity).with_lookahead(lookahead);
                let value = Decoder::from_producer(Chunked { data: input, chunk: 5 }, config).as_value().unwrap();
                assert_eq!(value, expected, "lookahead {} capacity {}", lookahead, capacity);
            }
        }
    }

    #[test]
    fn config_is_normalized() {
        let source = StreamSource::with_config(Never, StreamConfig::default().with_capacity(0).with_lookahead(64));
        assert_eq!(source.config(), StreamConfig { capacity: 1, lookahead: 1, max_stalls: 100 });
    }

}
