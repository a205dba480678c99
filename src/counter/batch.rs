//! Several counters behind one handle: a list of keys, or a list of fields of
//! one hash.
//!
//! Reads, replaces and deletes go out as one bulk command (MGET, MSET, DEL
//! and their hash forms). Arithmetic has no bulk verb, so it goes out as a
//! pipeline of one command per identity. Either way every reply is decoded
//! before the cache is touched: a single bad reply leaves the cache empty.

use super::cache::ValueCache;
use super::decode::{decode, decode_ack, decode_array, decode_flag};
use super::error::CounterError;
use super::numeric::Numeric;
use super::target::{BatchTarget, Target};
use crate::redis::{Batch, Command, Connection, Reply};
use std::fmt;
use tracing::{debug, warn};

pub type Int64BatchCounter<C> = BatchCounter<i64, C>;
pub type Float64BatchCounter<C> = BatchCounter<f64, C>;

pub struct BatchCounter<N, C> {
    conn: C,
    target: BatchTarget,
    cache: ValueCache<N>,
}

impl<N: Numeric, C: Connection> BatchCounter<N, C> {
    /// Counters on top-level keys.
    pub fn keys<I, S>(conn: C, keys: I) -> Result<Self, CounterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(conn, BatchTarget::keys(keys)?))
    }

    /// Counters on fields of the hash at `key`.
    pub fn fields<I, S>(conn: C, key: &str, fields: I) -> Result<Self, CounterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(conn, BatchTarget::fields(key, fields)?))
    }

    pub fn new(conn: C, target: BatchTarget) -> Self {
        let cache = ValueCache::new(target.identities().iter().map(String::as_str));
        BatchCounter {
            conn,
            target,
            cache,
        }
    }

    pub fn target(&self) -> &BatchTarget {
        &self.target
    }

    pub fn identities(&self) -> &[String] {
        self.target.identities()
    }

    /// The hash key, for a handle on fields.
    pub fn redis_key(&self) -> Option<&str> {
        self.target.hash_key()
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn cache(&self) -> &ValueCache<N> {
        &self.cache
    }

    pub fn last_value(&self, identity: &str) -> Option<N> {
        self.cache.get(identity)
    }

    fn round_trip(&mut self, command: &Command) -> Result<Reply, CounterError> {
        self.cache.reset();
        debug!(command = %command, "batch counter command");
        Ok(self.conn.execute(command)?)
    }

    /// Cache every decoded value, or nothing if any reply failed to decode.
    /// Absent values read as zero and stay unknown.
    fn populate<I>(&mut self, decoded: I) -> Result<Vec<N>, CounterError>
    where
        I: IntoIterator<Item = Result<Option<N>, CounterError>>,
    {
        let decoded: Result<Vec<Option<N>>, CounterError> = decoded.into_iter().collect();
        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(e) => {
                self.cache.reset();
                warn!(error = %e, handle = %self.target_label(), "batch decode failed");
                return Err(e);
            }
        };

        let mut values = Vec::with_capacity(decoded.len());
        for (id, value) in self.target.identities().iter().zip(decoded) {
            match value {
                Some(v) => {
                    self.cache.set(id, v);
                    values.push(v);
                }
                None => values.push(N::ZERO),
            }
        }
        Ok(values)
    }

    /// One pipelined command per identity, each replying with a value.
    fn pipelined<F>(&mut self, build: F) -> Result<Vec<N>, CounterError>
    where
        F: Fn(&Target) -> Result<Command, CounterError>,
    {
        self.cache.reset();
        let mut batch = Batch::with_capacity(self.target.len());
        for member in self.target.members() {
            batch.push(build(member)?);
        }

        debug!(commands = batch.len(), handle = %self.target_label(), "batch counter pipeline");
        batch.execute(&self.conn)?;
        self.populate(batch.iter().map(|(_, reply)| decode::<N>(reply)))
    }

    fn target_label(&self) -> String {
        match self.target.hash_key() {
            Some(key) => key.to_string(),
            None => self.target.identities().join(","),
        }
    }

    /// Current values in identity order; zero for absent identities.
    pub fn get_all(&mut self) -> Result<Vec<N>, CounterError> {
        let command = self.target.get_all_command();
        let reply = self.round_trip(&command)?;
        let elements = decode_array(&reply, self.target.len())?;
        self.populate(elements.iter().map(decode::<N>))
    }

    /// One flag per identity. Never fills the cache.
    pub fn exists_all(&mut self) -> Result<Vec<bool>, CounterError> {
        self.cache.reset();
        let mut batch = Batch::with_capacity(self.target.len());
        for member in self.target.members() {
            batch.push(member.exists_command());
        }

        batch.execute(&self.conn)?;
        batch.iter().map(|(_, reply)| decode_flag(reply)).collect()
    }

    pub fn delete_all(&mut self) -> Result<(), CounterError> {
        let command = self.target.delete_all_command();
        let reply = self.round_trip(&command)?;
        decode_ack(&reply)
    }

    /// Store `amount` under every identity and remember it without a read.
    pub fn set_all(&mut self, amount: N) -> Result<Vec<N>, CounterError> {
        let command = self.target.set_all_command(amount);
        let reply = self.round_trip(&command)?;
        decode_ack(&reply)?;
        let count = self.target.len();
        self.populate(std::iter::repeat_with(|| Ok(Some(amount))).take(count))
    }

    pub fn add_all(&mut self, amount: N) -> Result<Vec<N>, CounterError> {
        self.pipelined(|member| Ok(member.add_command(amount)))
    }

    pub fn sub_all(&mut self, amount: N) -> Result<Vec<N>, CounterError> {
        self.pipelined(|member| member.sub_command(amount))
    }

    pub fn increment_all(&mut self) -> Result<Vec<N>, CounterError> {
        self.pipelined(|member| Ok(member.increment_command::<N>()))
    }

    pub fn decrement_all(&mut self) -> Result<Vec<N>, CounterError> {
        self.pipelined(|member| Ok(member.decrement_command::<N>()))
    }
}

impl<N: Numeric, C> fmt::Display for BatchCounter<N, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.cache.render(self.target.identities());
        match self.target.hash_key() {
            Some(key) => write!(f, "{}[{}]", key, rendered),
            None => f.write_str(&rendered),
        }
    }
}

impl<N: Numeric, C> fmt::Debug for BatchCounter<N, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchCounter")
            .field("target", &self.target)
            .field("cache", &self.cache)
            .finish()
    }
}
