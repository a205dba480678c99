//! An in-process store speaking the counter command subset.
//!
//! `MemoryStore` is a cheap-to-clone handle on one shared keyspace. It is a
//! `Connection` in its own right: each command is encoded to RESP, parsed
//! back and executed, so it exercises the same framing a socket would. The
//! TCP server in `server` serves the same keyspace to remote clients.

mod command;
mod keyspace;
pub mod server;

pub use command::StoreCommand;
pub use keyspace::{Keyspace, Value};

use crate::redis::{Command, Connection, Reply, RespParser, RespValue, TransportError};
use ahash::AHashMap;
use bytes::BytesMut;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    keyspace: Arc<RwLock<Keyspace>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute one parsed command.
    pub fn apply(&self, cmd: &StoreCommand) -> RespValue {
        self.keyspace.write().execute(cmd)
    }

    /// Execute one request frame, answering protocol problems with an
    /// error reply the way a server does.
    pub fn apply_resp(&self, request: &RespValue) -> RespValue {
        match StoreCommand::from_resp(request) {
            Ok(cmd) => self.apply(&cmd),
            Err(msg) => RespValue::err(msg),
        }
    }

    fn round_trip(&self, command: &Command) -> Result<Reply, TransportError> {
        let mut buf = BytesMut::new();
        command.encode_into(&mut buf);
        let request = RespParser::parse_buf(&mut buf)
            .map_err(TransportError::Protocol)?
            .ok_or_else(|| TransportError::Protocol("incomplete request frame".to_string()))?;
        Ok(Reply::from(self.apply_resp(&request)))
    }

    pub fn len(&self) -> usize {
        self.keyspace.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyspace.read().is_empty()
    }

    pub fn commands_processed(&self) -> u64 {
        self.keyspace.read().commands_processed()
    }

    pub fn flush(&self) {
        self.apply(&StoreCommand::FlushDb);
    }

    /// Write raw text under a top-level key, bypassing the command path.
    pub fn set_string(&self, key: &str, text: &str) {
        self.keyspace
            .write()
            .insert(key, Value::String(text.as_bytes().to_vec()));
    }

    /// Write raw text into a hash field, replacing any non-hash value.
    pub fn set_field(&self, key: &str, field: &str, text: &str) {
        let mut keyspace = self.keyspace.write();
        let mut hash = match keyspace.get(key) {
            Some(Value::Hash(h)) => h.clone(),
            _ => AHashMap::new(),
        };
        hash.insert(field.to_string(), text.as_bytes().to_vec());
        keyspace.insert(key, Value::Hash(hash));
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.keyspace.read().get(key) {
            Some(Value::String(s)) => Some(String::from_utf8_lossy(s).into_owned()),
            _ => None,
        }
    }

    pub fn get_field(&self, key: &str, field: &str) -> Option<String> {
        match self.keyspace.read().get(key) {
            Some(Value::Hash(h)) => h.get(field).map(|v| String::from_utf8_lossy(v).into_owned()),
            _ => None,
        }
    }
}

impl Connection for MemoryStore {
    fn execute(&self, command: &Command) -> Result<Reply, TransportError> {
        self.round_trip(command)
    }

    fn pipeline(&self, commands: &[Command]) -> Result<Vec<Reply>, TransportError> {
        commands.iter().map(|c| self.round_trip(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_round_trip() {
        let store = MemoryStore::new();
        let reply = store
            .execute(&Command::new("INCRBY").str_arg("a").str_arg("4"))
            .unwrap();
        assert_eq!(reply, Reply::Integer(4));
        assert_eq!(store.get_string("a").as_deref(), Some("4"));
    }

    #[test]
    fn test_pipeline_keeps_order_and_errors_inline() {
        let store = MemoryStore::new();
        store.set_string("bad", "Gary");
        let replies = store
            .pipeline(&[
                Command::new("INCR").str_arg("a"),
                Command::new("INCR").str_arg("bad"),
                Command::new("GET").str_arg("a"),
            ])
            .unwrap();
        assert_eq!(replies[0], Reply::Integer(1));
        assert!(matches!(&replies[1], Reply::Error(msg) if msg.starts_with("ERR value is not")));
        assert_eq!(replies[2].as_text(), Some("1"));
    }

    #[test]
    fn test_clones_share_one_keyspace() {
        let store = MemoryStore::new();
        let other = store.clone();
        other.set_field("h", "f", "1");
        store.set_field("h", "g", "2");
        assert_eq!(store.get_field("h", "f").as_deref(), Some("1"));
        assert_eq!(other.get_field("h", "g").as_deref(), Some("2"));
        store.flush();
        assert!(other.is_empty());
    }
}
