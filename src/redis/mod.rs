//! Store plumbing consumed by the counters: RESP framing, commands, replies,
//! the `Connection` contract, pipelined batches and a client over the `redis` crate.

mod client;
mod command;
mod connection;
mod pipeline;
mod reply;
mod resp;

pub use client::RedisConnection;
pub use command::Command;
pub use connection::{Connection, TransportError};
pub use pipeline::Batch;
pub use reply::Reply;
pub use resp::{RespParser, RespValue};
