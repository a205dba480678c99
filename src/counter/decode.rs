//! Reply decoding for counters.
//!
//! Nil is "no value", not an error. Integer replies are taken as-is (and
//! widened for floats); bulk and status text must parse as the handle's
//! numeric kind. Arrays are never a single value: bulk reads unpack them with
//! `decode_array` and pass each element back through `decode`.

use super::error::CounterError;
use super::numeric::Numeric;
use crate::redis::Reply;

pub fn decode<N: Numeric>(reply: &Reply) -> Result<Option<N>, CounterError> {
    match reply {
        Reply::Error(msg) => Err(CounterError::Store(msg.clone())),
        Reply::Nil => Ok(None),
        Reply::Integer(n) => Ok(Some(N::from_integer(*n))),
        Reply::Bulk(data) => {
            let text = std::str::from_utf8(data).map_err(|_| CounterError::NotANumber {
                text: String::from_utf8_lossy(data).into_owned(),
            })?;
            parse_text(text).map(Some)
        }
        Reply::Status(text) => parse_text(text).map(Some),
        Reply::Array(_) => Err(CounterError::UnexpectedReply(
            "array where a single value was expected".to_string(),
        )),
    }
}

fn parse_text<N: Numeric>(text: &str) -> Result<N, CounterError> {
    N::parse(text).ok_or_else(|| CounterError::NotANumber {
        text: text.to_string(),
    })
}

/// EXISTS/HEXISTS: true exactly when the store counted one match.
pub fn decode_flag(reply: &Reply) -> Result<bool, CounterError> {
    match reply {
        Reply::Error(msg) => Err(CounterError::Store(msg.clone())),
        Reply::Integer(n) => Ok(*n == 1),
        other => Err(CounterError::UnexpectedReply(format!(
            "{} reply to an existence check",
            other.kind()
        ))),
    }
}

/// Elements of a bulk-read reply, which must hold one element per identity.
pub fn decode_array(reply: &Reply, expected: usize) -> Result<&[Reply], CounterError> {
    match reply {
        Reply::Error(msg) => Err(CounterError::Store(msg.clone())),
        Reply::Array(elements) if elements.len() == expected => Ok(elements),
        Reply::Array(elements) => Err(CounterError::UnexpectedReply(format!(
            "array of {} elements for {} identities",
            elements.len(),
            expected
        ))),
        other => Err(CounterError::UnexpectedReply(format!(
            "{} reply to a bulk read",
            other.kind()
        ))),
    }
}

/// Acknowledgement-only replies (SET, MSET, DEL, ...): only an error matters.
pub fn decode_ack(reply: &Reply) -> Result<(), CounterError> {
    match reply {
        Reply::Error(msg) => Err(CounterError::Store(msg.clone())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn bulk(text: &'static str) -> Reply {
        Reply::Bulk(Bytes::from_static(text.as_bytes()))
    }

    #[test]
    fn test_nil_is_no_value() {
        assert_eq!(decode::<i64>(&Reply::Nil).unwrap(), None);
        assert_eq!(decode::<f64>(&Reply::Nil).unwrap(), None);
    }

    #[test]
    fn test_int_from_integer_and_bulk() {
        assert_eq!(decode::<i64>(&Reply::Integer(678)).unwrap(), Some(678));
        assert_eq!(decode::<i64>(&bulk("123")).unwrap(), Some(123));
        assert!(decode::<i64>(&bulk("1.5")).unwrap_err().is_not_a_number());
    }

    #[test]
    fn test_float_widens_integers() {
        assert_eq!(decode::<f64>(&Reply::Integer(3)).unwrap(), Some(3.0));
        assert_eq!(decode::<f64>(&bulk("1.25")).unwrap(), Some(1.25));
    }

    #[test]
    fn test_gary_is_not_a_number() {
        match decode::<f64>(&bulk("Gary")) {
            Err(CounterError::NotANumber { text }) => assert_eq!(text, "Gary"),
            other => panic!("expected NotANumber, got {:?}", other),
        }
        assert!(decode::<i64>(&bulk("Gary")).unwrap_err().is_not_a_number());
    }

    #[test]
    fn test_store_error_propagates_verbatim() {
        let reply = Reply::Error("WRONGTYPE Operation against a key holding the wrong kind of value".to_string());
        match decode::<i64>(&reply) {
            Err(CounterError::Store(msg)) => assert!(msg.starts_with("WRONGTYPE")),
            other => panic!("expected store error, got {:?}", other),
        }
    }

    #[test]
    fn test_array_is_not_a_scalar() {
        let reply = Reply::Array(vec![Reply::Integer(1)]);
        assert!(matches!(
            decode::<i64>(&reply),
            Err(CounterError::UnexpectedReply(_))
        ));
    }

    #[test]
    fn test_flag() {
        assert!(decode_flag(&Reply::Integer(1)).unwrap());
        assert!(!decode_flag(&Reply::Integer(0)).unwrap());
        assert!(decode_flag(&Reply::Nil).is_err());
    }

    #[test]
    fn test_array_length_must_match() {
        let reply = Reply::Array(vec![Reply::Nil, Reply::Nil]);
        assert_eq!(decode_array(&reply, 2).unwrap().len(), 2);
        assert!(decode_array(&reply, 3).is_err());
        assert!(decode_array(&Reply::Nil, 1).is_err());
    }
}
