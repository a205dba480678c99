//! Connection to a Redis server through the `redis` crate.
//!
//! One synchronous `redis::Connection` behind a mutex, so several counters
//! can share it through `&RedisConnection` or `Arc<RedisConnection>`.
//! Commands always go out as a non-atomic pipeline in ignore-errors mode:
//! an error reply to one command comes back as that command's reply instead
//! of failing the whole call.

use super::command::Command;
use super::connection::{Connection, TransportError};
use super::reply::Reply;
use crate::config::RedisConfig;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

pub struct RedisConnection {
    addr: String,
    conn: Mutex<::redis::Connection>,
}

impl RedisConnection {
    pub fn connect(config: &RedisConfig) -> Result<Self, TransportError> {
        let client = ::redis::Client::open(format!("redis://{}/", config.addr))?;
        let conn = client.get_connection_with_timeout(config.connect_timeout())?;
        conn.set_read_timeout(config.io_timeout())?;
        conn.set_write_timeout(config.io_timeout())?;
        debug!(addr = %config.addr, "connected");

        Ok(RedisConnection {
            addr: config.addr.clone(),
            conn: Mutex::new(conn),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn round_trip(&self, commands: &[Command]) -> Result<Vec<Reply>, TransportError> {
        let mut pipe = ::redis::pipe();
        pipe.ignore_errors();
        for command in commands {
            pipe.add_command(to_cmd(command));
        }

        let mut conn = self.conn.lock();
        let values: Vec<::redis::Value> = pipe.query(&mut *conn).map_err(|e| {
            warn!(addr = %self.addr, error = %e, "redis round trip failed");
            TransportError::from(e)
        })?;
        values.into_iter().map(to_reply).collect()
    }
}

fn to_cmd(command: &Command) -> ::redis::Cmd {
    let mut cmd = ::redis::cmd(command.verb());
    for arg in command.args() {
        cmd.arg(&arg[..]);
    }
    cmd
}

/// Map a `redis::Value` onto the reply shapes counters decode.
pub(crate) fn to_reply(value: ::redis::Value) -> Result<Reply, TransportError> {
    use ::redis::Value;

    match value {
        Value::Nil => Ok(Reply::Nil),
        Value::Int(n) => Ok(Reply::Integer(n)),
        Value::BulkString(data) => Ok(Reply::Bulk(Bytes::from(data))),
        Value::SimpleString(s) => Ok(Reply::Status(s)),
        Value::Okay => Ok(Reply::Status("OK".to_string())),
        Value::Double(f) => Ok(Reply::Bulk(Bytes::from(f.to_string()))),
        Value::Boolean(b) => Ok(Reply::Integer(b as i64)),
        Value::Array(items) | Value::Set(items) => items
            .into_iter()
            .map(to_reply)
            .collect::<Result<Vec<_>, _>>()
            .map(Reply::Array),
        Value::ServerError(err) => Ok(Reply::Error(match err.details() {
            Some(details) => format!("{} {}", err.code(), details),
            None => err.code().to_string(),
        })),
        other => Err(TransportError::Protocol(format!(
            "unsupported reply {:?}",
            other
        ))),
    }
}

impl Connection for RedisConnection {
    fn execute(&self, command: &Command) -> Result<Reply, TransportError> {
        let mut replies = self.round_trip(std::slice::from_ref(command))?;
        replies.pop().ok_or(TransportError::ReplyCount {
            expected: 1,
            actual: 0,
        })
    }

    fn pipeline(&self, commands: &[Command]) -> Result<Vec<Reply>, TransportError> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }
        self.round_trip(commands)
    }
}
