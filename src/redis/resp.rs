//! RESP2 framing shared by the client connections and the in-process store.
//!
//! `RespParser::parse` distinguishes an incomplete frame (`Ok(None)`) from a
//! malformed one (`Err`), so callers reading from a socket can keep buffering.

use bytes::{BufMut, BytesMut};

#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Option<Vec<u8>>),
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    pub fn nil() -> Self {
        RespValue::BulkString(None)
    }

    pub fn err(message: impl Into<String>) -> Self {
        RespValue::Error(message.into())
    }

    pub fn bulk(data: impl Into<Vec<u8>>) -> Self {
        RespValue::BulkString(Some(data.into()))
    }
}

pub struct RespParser;

/// Deepest array nesting accepted in one frame.
const MAX_DEPTH: usize = 128;

impl RespParser {
    /// Parse one frame from the front of `input`.
    ///
    /// Returns the value and the number of bytes it occupied, `Ok(None)` when
    /// more bytes are needed, or an error when the bytes cannot be RESP.
    pub fn parse(input: &[u8]) -> Result<Option<(RespValue, usize)>, String> {
        Self::parse_at(input, 0)
    }

    fn parse_at(input: &[u8], depth: usize) -> Result<Option<(RespValue, usize)>, String> {
        if input.is_empty() {
            return Ok(None);
        }

        match input[0] {
            b'+' => Self::parse_simple_string(input),
            b'-' => Self::parse_error(input),
            b':' => Self::parse_integer(input),
            b'$' => Self::parse_bulk_string(input),
            b'*' => Self::parse_array(input, depth),
            other => Err(format!("Unknown RESP type: {}", other as char)),
        }
    }

    /// Parse one frame and drop its bytes from the buffer.
    pub fn parse_buf(buf: &mut BytesMut) -> Result<Option<RespValue>, String> {
        match Self::parse(buf)? {
            Some((value, consumed)) => {
                let _ = buf.split_to(consumed);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn parse_simple_string(input: &[u8]) -> Result<Option<(RespValue, usize)>, String> {
        match Self::find_crlf(input) {
            Some(pos) => {
                let s = String::from_utf8_lossy(&input[1..pos]).to_string();
                Ok(Some((RespValue::SimpleString(s), pos + 2)))
            }
            None => Ok(None),
        }
    }

    fn parse_error(input: &[u8]) -> Result<Option<(RespValue, usize)>, String> {
        match Self::find_crlf(input) {
            Some(pos) => {
                let s = String::from_utf8_lossy(&input[1..pos]).to_string();
                Ok(Some((RespValue::Error(s), pos + 2)))
            }
            None => Ok(None),
        }
    }

    fn parse_integer(input: &[u8]) -> Result<Option<(RespValue, usize)>, String> {
        match Self::find_crlf(input) {
            Some(pos) => {
                let n = Self::parse_length_line(&input[1..pos])?;
                Ok(Some((RespValue::Integer(n), pos + 2)))
            }
            None => Ok(None),
        }
    }

    fn parse_bulk_string(input: &[u8]) -> Result<Option<(RespValue, usize)>, String> {
        let Some(pos) = Self::find_crlf(input) else {
            return Ok(None);
        };
        let len = Self::parse_length_line(&input[1..pos])?;

        if len == -1 {
            return Ok(Some((RespValue::BulkString(None), pos + 2)));
        }
        if len < 0 {
            return Err(format!("Invalid bulk string length: {}", len));
        }

        let start = pos + 2;
        let end = start + len as usize;

        if end + 2 > input.len() {
            return Ok(None);
        }
        if &input[end..end + 2] != b"\r\n" {
            return Err("Bulk string not terminated by CRLF".to_string());
        }

        let data = input[start..end].to_vec();
        Ok(Some((RespValue::BulkString(Some(data)), end + 2)))
    }

    fn parse_array(input: &[u8], depth: usize) -> Result<Option<(RespValue, usize)>, String> {
        if depth >= MAX_DEPTH {
            return Err("Array nesting too deep".to_string());
        }
        let Some(pos) = Self::find_crlf(input) else {
            return Ok(None);
        };
        let len = Self::parse_length_line(&input[1..pos])?;

        if len == -1 {
            return Ok(Some((RespValue::Array(None), pos + 2)));
        }
        if len < 0 {
            return Err(format!("Invalid array length: {}", len));
        }

        let mut elements = Vec::with_capacity(len.min(1024) as usize);
        let mut offset = pos + 2;

        for _ in 0..len {
            match Self::parse_at(&input[offset..], depth + 1)? {
                Some((value, consumed)) => {
                    elements.push(value);
                    offset += consumed;
                }
                None => return Ok(None),
            }
        }

        Ok(Some((RespValue::Array(Some(elements)), offset)))
    }

    fn parse_length_line(line: &[u8]) -> Result<i64, String> {
        let s = std::str::from_utf8(line).map_err(|e| e.to_string())?;
        s.parse::<i64>().map_err(|e| format!("Invalid RESP integer '{}': {}", s, e))
    }

    #[inline]
    fn find_crlf(input: &[u8]) -> Option<usize> {
        memchr::memchr(b'\r', input).and_then(|pos| {
            if pos + 1 < input.len() && input[pos + 1] == b'\n' {
                Some(pos)
            } else {
                None
            }
        })
    }

    pub fn encode(value: &RespValue) -> BytesMut {
        let mut buf = BytesMut::with_capacity(64);
        Self::encode_into(value, &mut buf);
        buf
    }

    pub fn encode_into(value: &RespValue, buf: &mut BytesMut) {
        match value {
            RespValue::SimpleString(s) => {
                buf.put_u8(b'+');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::Error(s) => {
                buf.put_u8(b'-');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::Integer(n) => {
                buf.put_u8(b':');
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::BulkString(None) => buf.extend_from_slice(b"$-1\r\n"),
            RespValue::BulkString(Some(data)) => Self::encode_bulk(data, buf),
            RespValue::Array(None) => buf.extend_from_slice(b"*-1\r\n"),
            RespValue::Array(Some(elements)) => {
                buf.put_u8(b'*');
                buf.extend_from_slice(elements.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                for element in elements {
                    Self::encode_into(element, buf);
                }
            }
        }
    }

    /// Write a command as an array of bulk strings, the only request shape
    /// a RESP2 server accepts.
    pub fn encode_command<'a, I>(parts: I, buf: &mut BytesMut)
    where
        I: ExactSizeIterator<Item = &'a [u8]>,
    {
        buf.put_u8(b'*');
        buf.extend_from_slice(parts.len().to_string().as_bytes());
        buf.extend_from_slice(b"\r\n");
        for part in parts {
            Self::encode_bulk(part, buf);
        }
    }

    fn encode_bulk(data: &[u8], buf: &mut BytesMut) {
        buf.put_u8(b'$');
        buf.extend_from_slice(data.len().to_string().as_bytes());
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(data);
        buf.extend_from_slice(b"\r\n");
    }
}
