//! Incremental line reader
//!
//! The response parser reads the status line and headers one line at a time
//! and then drains the rest of the stream as the body. `LineReader` provides
//! exactly those two primitives over any `std::io::Read`, which is how a
//! socket and a cache file end up going through the same parser.

use bytes::{Bytes, BytesMut};
use std::io::{self, Read};

const READ_CHUNK: usize = 4096;

/// Buffered line reader over a byte stream
pub struct LineReader<R> {
    inner: R,
    buf: BytesMut,
    /// Bytes of `buf` already known not to contain `\n`
    scanned: usize,
    eof: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        LineReader {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK),
            scanned: 0,
            eof: false,
        }
    }

    /// Pull one chunk from the stream into the buffer, 0 at end of stream
    fn fill(&mut self) -> io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Read the next line including its terminator
    ///
    /// Returns `None` once the stream is exhausted. A final line without a
    /// terminator is returned as is.
    pub fn read_line(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            if let Some(pos) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
                let end = self.scanned + pos + 1;
                self.scanned = 0;
                return Ok(Some(self.buf.split_to(end).freeze()));
            }
            self.scanned = self.buf.len();

            if self.eof {
                self.scanned = 0;
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.buf.split().freeze()));
            }

            if self.fill()? == 0 {
                self.eof = true;
            }
        }
    }

    /// Drain everything up to the peer closing the stream into `out`
    ///
    /// Bytes received before an error are already in `out` when the error is
    /// returned. HTTP/1.0 without keep-alive ends the body this way.
    pub fn read_body_until_close(&mut self, out: &mut BytesMut) -> io::Result<()> {
        loop {
            out.extend_from_slice(&self.buf.split());
            self.scanned = 0;
            if self.eof {
                return Ok(());
            }
            if self.fill()? == 0 {
                self.eof = true;
            }
        }
    }

    /// Get a reference to the underlying stream
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Get a mutable reference to the underlying stream
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap the reader, dropping any buffered bytes
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out at most `step` bytes per read
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_lines_keep_terminators() {
        let mut reader = LineReader::new(Cursor::new(&b"one\r\ntwo\nthree"[..]));

        assert_eq!(reader.read_line().unwrap().unwrap(), &b"one\r\n"[..]);
        assert_eq!(reader.read_line().unwrap().unwrap(), &b"two\n"[..]);
        assert_eq!(reader.read_line().unwrap().unwrap(), &b"three"[..]);
        assert!(reader.read_line().unwrap().is_none());
        assert!(reader.read_line().unwrap().is_none());
    }

    #[test]
    fn test_lines_split_across_reads() {
        let data = b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nbody";
        let mut reader = LineReader::new(Trickle { data, step: 3 });

        assert_eq!(reader.read_line().unwrap().unwrap(), &b"HTTP/1.0 200 OK\r\n"[..]);
        assert_eq!(
            reader.read_line().unwrap().unwrap(),
            &b"Content-Type: text/plain\r\n"[..]
        );
        assert_eq!(reader.read_line().unwrap().unwrap(), &b"\r\n"[..]);

        let mut body = BytesMut::new();
        reader.read_body_until_close(&mut body).unwrap();
        assert_eq!(&body[..], b"body");
    }

    #[test]
    fn test_body_includes_buffered_bytes() {
        let mut reader = LineReader::new(Cursor::new(&b"head\nrest\nof\nbody"[..]));
        reader.read_line().unwrap();

        let mut body = BytesMut::new();
        reader.read_body_until_close(&mut body).unwrap();
        assert_eq!(&body[..], b"rest\nof\nbody");
    }

    #[test]
    fn test_empty_stream() {
        let mut reader = LineReader::new(Cursor::new(Vec::new()));
        assert!(reader.read_line().unwrap().is_none());

        let mut body = BytesMut::new();
        reader.read_body_until_close(&mut body).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_partial_body_survives_error() {
        struct FailAfter(usize);
        impl Read for FailAfter {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0 == 0 {
                    return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
                }
                self.0 -= 1;
                buf[0] = b'x';
                Ok(1)
            }
        }

        let mut reader = LineReader::new(FailAfter(3));
        let mut body = BytesMut::new();
        let err = reader.read_body_until_close(&mut body).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(&body[..], b"xxx");
    }
}
