//! Typed int64/float64 counters over Redis keys and hash fields.
//!
//! - `counter`: single and batch counter handles with a last-value cache
//! - `redis`: RESP framing, the `Connection` contract, pipelines, a client over the `redis` crate
//! - `store`: an in-process store and RESP server for tests and local runs
//! - `simulator`: seeded fault injection for deterministic simulation tests

pub mod config;
pub mod counter;
pub mod observability;
pub mod redis;
pub mod simulator;
pub mod store;

pub use config::{ConfigError, CounterConfig};
pub use counter::{
    BatchCounter, Counter, CounterError, Float64BatchCounter, Float64Counter, Int64BatchCounter,
    Int64Counter, Numeric,
};
pub use crate::redis::{Batch, Command, Connection, RedisConnection, Reply, TransportError};
pub use store::MemoryStore;
