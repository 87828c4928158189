//! HTTP response parsing
//!
//! The parser keeps the response the way it arrived: the status code is the
//! three characters after `HTTP/1.x `, the header block is the raw bytes of
//! the status line and every header line, and the body is everything after
//! the blank line up to end of stream. The same parser reads live sockets
//! and cache files.

use super::{Error, LineReader, Result};
use bytes::{Bytes, BytesMut};
use std::io::Read;

/// Byte offset of the status code in `HTTP/1.x NNN reason`
const STATUS_OFFSET: usize = 9;

/// Length of an HTTP status code
const STATUS_LEN: usize = 3;

/// Header line a server sends when Basic credentials are missing or wrong
const BASIC_CHALLENGE: &[u8] = b"WWW-Authenticate: Basic realm=\"";

/// Extract the status code from a status line
///
/// Lines too short to hold a full code yield whatever is there.
pub fn status_code(line: &[u8]) -> String {
    let start = STATUS_OFFSET.min(line.len());
    let end = (STATUS_OFFSET + STATUS_LEN).min(line.len());
    String::from_utf8_lossy(&line[start..end])
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|b| b.is_ascii_whitespace())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    StatusLine,
    Headers,
    Body,
    Complete,
}

/// A fully read response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Three-character status code, empty when nothing was received
    pub status: String,
    /// Status line and header lines as received, each with its terminator
    pub header: Bytes,
    pub body: Bytes,
}

/// HTTP response parser
///
/// Whatever was read before an error stays available through the accessors,
/// so a failed read still reports the status and headers it got.
#[derive(Debug)]
pub struct ResponseParser {
    state: ParserState,
    status: String,
    header: BytesMut,
    body: BytesMut,
}

impl ResponseParser {
    /// Create a new response parser
    pub fn new() -> Self {
        ResponseParser {
            state: ParserState::StatusLine,
            status: String::new(),
            header: BytesMut::new(),
            body: BytesMut::new(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Read the status line and headers up to the blank line
    ///
    /// A 401 carrying a Basic challenge stops here with `Error::AuthFailed`;
    /// the body is never read.
    pub fn read_head<R: Read>(&mut self, reader: &mut LineReader<R>) -> Result<()> {
        if self.state == ParserState::StatusLine {
            match reader.read_line()? {
                Some(line) => {
                    self.status = status_code(&line);
                    self.header.extend_from_slice(&line);
                    self.state = ParserState::Headers;
                }
                None => {
                    self.state = ParserState::Body;
                    return Ok(());
                }
            }
        }

        while self.state == ParserState::Headers {
            let line = match reader.read_line()? {
                Some(line) if !is_blank(&line) => line,
                _ => {
                    self.state = ParserState::Body;
                    break;
                }
            };

            self.header.extend_from_slice(&line);

            if self.status == "401" && line.starts_with(BASIC_CHALLENGE) {
                return Err(Error::AuthFailed);
            }
        }

        Ok(())
    }

    /// Read the body until the stream closes
    pub fn read_body<R: Read>(&mut self, reader: &mut LineReader<R>) -> Result<()> {
        if self.state == ParserState::Body {
            reader.read_body_until_close(&mut self.body)?;
            self.state = ParserState::Complete;
        }
        Ok(())
    }

    /// Take the response read so far
    pub fn finish(self) -> ParsedResponse {
        ParsedResponse {
            status: self.status,
            header: self.header.freeze(),
            body: self.body.freeze(),
        }
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a whole response from `reader`
pub fn parse_response<R: Read>(reader: &mut LineReader<R>) -> Result<ParsedResponse> {
    let mut parser = ResponseParser::new();
    parser.read_head(reader)?;
    parser.read_body(reader)?;
    Ok(parser.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(data: &[u8]) -> Result<ParsedResponse> {
        parse_response(&mut LineReader::new(Cursor::new(data.to_vec())))
    }

    #[test]
    fn test_status_code() {
        assert_eq!(status_code(b"HTTP/1.1 200 OK\r\n"), "200");
        assert_eq!(status_code(b"HTTP/1.0 404\r\n"), "404");
        assert_eq!(status_code(b"HTTP/1.0 30"), "30");
        assert_eq!(status_code(b"garbage"), "");
    }

    #[test]
    fn test_parse_simple_response() {
        let resp = parse(b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nHello\r\nWorld").unwrap();

        assert_eq!(resp.status, "200");
        assert_eq!(resp.header, "HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n");
        assert_eq!(resp.body, &b"Hello\r\nWorld"[..]);
    }

    #[test]
    fn test_body_ignores_content_length() {
        let resp = parse(b"HTTP/1.0 200 OK\r\nContent-Length: 2\r\n\r\nOK and more").unwrap();
        assert_eq!(resp.body, &b"OK and more"[..]);
    }

    #[test]
    fn test_headers_end_at_stream_end() {
        let resp = parse(b"HTTP/1.0 204 No Content\r\nServer: x\r\n").unwrap();
        assert_eq!(resp.status, "204");
        assert_eq!(resp.header, "HTTP/1.0 204 No Content\r\nServer: x\r\n");
        assert!(resp.body.is_empty());
    }

    #[test]
    fn test_bare_lf_blank_line() {
        let resp = parse(b"HTTP/1.0 200 OK\nA: b\n\nbody").unwrap();
        assert_eq!(resp.header, "HTTP/1.0 200 OK\nA: b\n");
        assert_eq!(resp.body, &b"body"[..]);
    }

    #[test]
    fn test_empty_stream() {
        let resp = parse(b"").unwrap();
        assert_eq!(resp.status, "");
        assert_eq!(resp.header, "");
        assert!(resp.body.is_empty());
    }

    #[test]
    fn test_basic_challenge_aborts() {
        let data = b"HTTP/1.0 401 Unauthorized\r\n\
                     Server: x\r\n\
                     WWW-Authenticate: Basic realm=\"X\"\r\n\
                     \r\n\
                     secret body";
        let mut reader = LineReader::new(Cursor::new(data.to_vec()));
        let mut parser = ResponseParser::new();

        assert!(matches!(parser.read_head(&mut reader), Err(Error::AuthFailed)));
        assert_eq!(parser.status(), "401");
        assert!(parser.body().is_empty());
        assert_eq!(parser.state(), ParserState::Headers);
    }

    #[test]
    fn test_401_without_basic_challenge_is_a_response() {
        let resp = parse(b"HTTP/1.0 401 Unauthorized\r\nWWW-Authenticate: Digest realm=\"X\"\r\n\r\ndenied").unwrap();
        assert_eq!(resp.status, "401");
        assert_eq!(resp.body, &b"denied"[..]);
    }

    #[test]
    fn test_basic_challenge_on_other_status_is_ignored() {
        let resp = parse(b"HTTP/1.0 200 OK\r\nWWW-Authenticate: Basic realm=\"X\"\r\n\r\nok").unwrap();
        assert_eq!(resp.status, "200");
        assert_eq!(resp.body, &b"ok"[..]);
    }

    #[test]
    fn test_non_utf8_header_bytes_are_kept() {
        let resp = parse(b"HTTP/1.0 200 OK\r\nX-Name: caf\xe9\r\n\r\nbody").unwrap();
        assert_eq!(resp.header, &b"HTTP/1.0 200 OK\r\nX-Name: caf\xe9\r\n"[..]);
    }

    #[test]
    fn test_binary_body_is_preserved() {
        let mut data = b"HTTP/1.0 200 OK\r\nContent-Type: image/png\r\n\r\n".to_vec();
        let image: Vec<u8> = (0..=255u8).collect();
        data.extend_from_slice(&image);

        let resp = parse(&data).unwrap();
        assert_eq!(&resp.body[..], &image[..]);
    }
}
