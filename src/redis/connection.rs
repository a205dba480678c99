//! The connection contract counters are written against.
//!
//! A connection executes one command, or a pipeline of independent commands
//! in one round trip. Replies to a pipeline come back in submission order.
//! Any transport failure fails the whole call.

use super::command::Command;
use super::reply::Reply;
use std::fmt;
use std::sync::Arc;

/// Failure of the transport itself, as opposed to an error reply from the
/// store.
#[derive(Debug)]
pub enum TransportError {
    Io(std::io::Error),
    /// The peer sent bytes that are not RESP.
    Protocol(String),
    /// The `redis` client failed to connect, write or read.
    Redis(::redis::RedisError),
    /// A pipeline came back with a different number of replies than commands.
    ReplyCount { expected: usize, actual: usize },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Io(e) => write!(f, "I/O error: {}", e),
            TransportError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            TransportError::Redis(e) => write!(f, "Redis error: {}", e),
            TransportError::ReplyCount { expected, actual } => write!(
                f,
                "Pipeline reply count mismatch: expected {}, got {}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Io(e) => Some(e),
            TransportError::Redis(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e)
    }
}

impl From<::redis::RedisError> for TransportError {
    fn from(e: ::redis::RedisError) -> Self {
        TransportError::Redis(e)
    }
}

pub trait Connection {
    fn execute(&self, command: &Command) -> Result<Reply, TransportError>;

    /// Send every command in one round trip and return one reply per command,
    /// in submission order.
    fn pipeline(&self, commands: &[Command]) -> Result<Vec<Reply>, TransportError>;
}

impl<C: Connection + ?Sized> Connection for &C {
    fn execute(&self, command: &Command) -> Result<Reply, TransportError> {
        (**self).execute(command)
    }

    fn pipeline(&self, commands: &[Command]) -> Result<Vec<Reply>, TransportError> {
        (**self).pipeline(commands)
    }
}

impl<C: Connection + ?Sized> Connection for Arc<C> {
    fn execute(&self, command: &Command) -> Result<Reply, TransportError> {
        (**self).execute(command)
    }

    fn pipeline(&self, commands: &[Command]) -> Result<Vec<Reply>, TransportError> {
        (**self).pipeline(commands)
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn execute(&self, command: &Command) -> Result<Reply, TransportError> {
        (**self).execute(command)
    }

    fn pipeline(&self, commands: &[Command]) -> Result<Vec<Reply>, TransportError> {
        (**self).pipeline(commands)
    }
}
