//! Counter errors.
//!
//! Construction errors carry the same wording for every handle shape so
//! callers can match on the variant or print it as-is.

use crate::redis::TransportError;
use std::fmt;

#[derive(Debug)]
pub enum CounterError {
    EmptyKey,
    EmptyField,
    EmptyKeys,
    EmptyFields,
    /// Position of the first empty key in a multi-key handle.
    EmptyKeyAt(usize),
    /// Position of the first empty field in a multi-field handle.
    EmptyFieldAt(usize),
    Transport(TransportError),
    /// Error reply from the store, verbatim.
    Store(String),
    /// The stored text is not a number of the handle's kind.
    NotANumber { text: String },
    UnexpectedReply(String),
    /// Negating a subtraction amount overflowed.
    Overflow,
}

impl CounterError {
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            CounterError::EmptyKey
                | CounterError::EmptyField
                | CounterError::EmptyKeys
                | CounterError::EmptyFields
                | CounterError::EmptyKeyAt(_)
                | CounterError::EmptyFieldAt(_)
        )
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, CounterError::Transport(_))
    }

    pub fn is_not_a_number(&self) -> bool {
        matches!(self, CounterError::NotANumber { .. })
    }
}

impl fmt::Display for CounterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterError::EmptyKey => write!(f, "Empty redis key"),
            CounterError::EmptyField => write!(f, "Empty redis field"),
            CounterError::EmptyKeys => write!(f, "Empty redis keys"),
            CounterError::EmptyFields => write!(f, "Empty redis fields"),
            CounterError::EmptyKeyAt(i) => write!(f, "Empty redis key[{}]", i),
            CounterError::EmptyFieldAt(i) => write!(f, "Empty redis field[{}]", i),
            CounterError::Transport(e) => write!(f, "{}", e),
            CounterError::Store(msg) => write!(f, "{}", msg),
            CounterError::NotANumber { text } => write!(f, "value is not a number: {:?}", text),
            CounterError::UnexpectedReply(msg) => write!(f, "unexpected reply: {}", msg),
            CounterError::Overflow => write!(f, "amount overflows when negated"),
        }
    }
}

impl std::error::Error for CounterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CounterError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for CounterError {
    fn from(e: TransportError) -> Self {
        CounterError::Transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_messages() {
        assert_eq!(CounterError::EmptyKey.to_string(), "Empty redis key");
        assert_eq!(CounterError::EmptyFields.to_string(), "Empty redis fields");
        assert_eq!(CounterError::EmptyFieldAt(0).to_string(), "Empty redis field[0]");
        assert_eq!(CounterError::EmptyKeyAt(2).to_string(), "Empty redis key[2]");
        assert!(CounterError::EmptyKeyAt(2).is_construction());
        assert!(!CounterError::Overflow.is_construction());
    }

    #[test]
    fn test_store_errors_are_verbatim() {
        let e = CounterError::Store("ERR value is not an integer or out of range".to_string());
        assert_eq!(e.to_string(), "ERR value is not an integer or out of range");
    }

    #[test]
    fn test_transport_source() {
        use std::error::Error;
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let e = CounterError::from(TransportError::from(io));
        assert!(e.is_transport());
        assert!(e.source().is_some());
    }
}
