//! Store replies as seen by counter code.
//!
//! RESP has two spellings of "no value" (`$-1` and `*-1`); both collapse to
//! `Reply::Nil` here so decoders only match one shape.

use super::resp::RespValue;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Error reply from the store, kept verbatim (e.g. `WRONGTYPE ...`).
    Error(String),
    Nil,
    Integer(i64),
    /// Simple-string acknowledgement such as `OK`.
    Status(String),
    Bulk(Bytes),
    Array(Vec<Reply>),
}

impl Reply {
    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }

    /// Textual payload of a bulk or status reply.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Bulk(data) => std::str::from_utf8(data).ok(),
            Reply::Status(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Error(_) => "error",
            Reply::Nil => "nil",
            Reply::Integer(_) => "integer",
            Reply::Status(_) => "status",
            Reply::Bulk(_) => "bulk",
            Reply::Array(_) => "array",
        }
    }
}

impl From<RespValue> for Reply {
    fn from(value: RespValue) -> Self {
        match value {
            RespValue::SimpleString(s) => Reply::Status(s),
            RespValue::Error(s) => Reply::Error(s),
            RespValue::Integer(n) => Reply::Integer(n),
            RespValue::BulkString(None) | RespValue::Array(None) => Reply::Nil,
            RespValue::BulkString(Some(data)) => Reply::Bulk(Bytes::from(data)),
            RespValue::Array(Some(elements)) => {
                Reply::Array(elements.into_iter().map(Reply::from).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_nil_spellings_collapse() {
        assert_eq!(Reply::from(RespValue::BulkString(None)), Reply::Nil);
        assert_eq!(Reply::from(RespValue::Array(None)), Reply::Nil);
    }

    #[test]
    fn test_array_elements_convert_recursively() {
        let reply = Reply::from(RespValue::Array(Some(vec![
            RespValue::bulk(b"1".to_vec()),
            RespValue::BulkString(None),
        ])));
        assert_eq!(
            reply,
            Reply::Array(vec![Reply::Bulk(Bytes::from_static(b"1")), Reply::Nil])
        );
    }

    #[test]
    fn test_as_text() {
        assert_eq!(Reply::Status("OK".to_string()).as_text(), Some("OK"));
        assert_eq!(Reply::Bulk(Bytes::from_static(b"1.5")).as_text(), Some("1.5"));
        assert_eq!(Reply::Integer(1).as_text(), None);
        assert_eq!(Reply::Bulk(Bytes::from_static(&[0xff, 0xfe])).as_text(), None);
    }
}
