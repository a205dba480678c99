//! One counter on one key or one hash field.

use super::cache::LastObserved;
use super::decode::{decode, decode_ack, decode_flag};
use super::error::CounterError;
use super::numeric::{DisplayValue, Numeric};
use super::target::Target;
use crate::redis::{Command, Connection, Reply};
use std::fmt;
use tracing::debug;

pub type Int64Counter<C> = Counter<i64, C>;
pub type Float64Counter<C> = Counter<f64, C>;

/// A typed counter holding the last value it observed.
///
/// Every operation forgets the previous value before talking to the store,
/// so after an error `last_value` is always `None`.
pub struct Counter<N, C> {
    conn: C,
    target: Target,
    last: LastObserved<N>,
}

impl<N: Numeric, C: Connection> Counter<N, C> {
    pub fn key(conn: C, key: &str) -> Result<Self, CounterError> {
        Ok(Self::new(conn, Target::key(key)?))
    }

    pub fn field(conn: C, key: &str, field: &str) -> Result<Self, CounterError> {
        Ok(Self::new(conn, Target::field(key, field)?))
    }

    pub fn new(conn: C, target: Target) -> Self {
        Counter {
            conn,
            target,
            last: LastObserved::Unknown,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn redis_key(&self) -> &str {
        self.target.redis_key()
    }

    pub fn redis_field(&self) -> Option<&str> {
        self.target.redis_field()
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn last_value(&self) -> Option<N> {
        self.last.value()
    }

    fn round_trip(&mut self, command: &Command) -> Result<Reply, CounterError> {
        self.last = LastObserved::Unknown;
        debug!(counter = %self.target, command = %command, "counter command");
        Ok(self.conn.execute(command)?)
    }

    /// Send a command whose reply is the new value, and remember it.
    fn observe(&mut self, command: Command) -> Result<N, CounterError> {
        let reply = self.round_trip(&command)?;
        match decode::<N>(&reply)? {
            Some(value) => {
                self.last = LastObserved::Known(value);
                Ok(value)
            }
            None => Ok(N::ZERO),
        }
    }

    /// Current value; zero when the key or field is absent.
    pub fn get(&mut self) -> Result<N, CounterError> {
        let command = self.target.get_command();
        self.observe(command)
    }

    pub fn exists(&mut self) -> Result<bool, CounterError> {
        let command = self.target.exists_command();
        let reply = self.round_trip(&command)?;
        decode_flag(&reply)
    }

    pub fn delete(&mut self) -> Result<(), CounterError> {
        let command = self.target.delete_command();
        let reply = self.round_trip(&command)?;
        decode_ack(&reply)
    }

    /// Replace the stored value and return it. The amount is remembered
    /// without reading it back.
    pub fn set(&mut self, amount: N) -> Result<N, CounterError> {
        let command = self.target.set_command(amount);
        let reply = self.round_trip(&command)?;
        decode_ack(&reply)?;
        self.last = LastObserved::Known(amount);
        Ok(amount)
    }

    /// Add `amount` and return the value after the addition.
    pub fn add(&mut self, amount: N) -> Result<N, CounterError> {
        let command = self.target.add_command(amount);
        self.observe(command)
    }

    pub fn sub(&mut self, amount: N) -> Result<N, CounterError> {
        self.last = LastObserved::Unknown;
        let command = self.target.sub_command(amount)?;
        self.observe(command)
    }

    pub fn increment(&mut self) -> Result<N, CounterError> {
        let command = self.target.increment_command::<N>();
        self.observe(command)
    }

    pub fn decrement(&mut self) -> Result<N, CounterError> {
        let command = self.target.decrement_command::<N>();
        self.observe(command)
    }
}

impl<N: Numeric, C> fmt::Display for Counter<N, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.target, DisplayValue(self.last.value()))
    }
}

impl<N: Numeric, C> fmt::Debug for Counter<N, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("target", &self.target)
            .field("last", &self.last)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_missing_key_reads_as_zero_without_caching() {
        let store = MemoryStore::new();
        let mut bob = Int64Counter::key(&store, "Bob").unwrap();
        assert_eq!(bob.get().unwrap(), 0);
        assert_eq!(bob.last_value(), None);
        assert_eq!(bob.to_string(), "Bob = NaN");
    }

    #[test]
    fn test_add_caches_post_increment_value() {
        let store = MemoryStore::new();
        store.set_string("Bob", "123");
        let mut bob = Int64Counter::key(&store, "Bob").unwrap();
        assert_eq!(bob.add(555).unwrap(), 678);
        assert_eq!(bob.last_value(), Some(678));
        assert_eq!(bob.to_string(), "Bob = 678");
    }

    #[test]
    fn test_sub_matches_add_of_negation() {
        let store = MemoryStore::new();
        let mut a = Int64Counter::key(&store, "a").unwrap();
        let mut b = Int64Counter::field(&store, "h", "b").unwrap();
        assert_eq!(a.set(10).unwrap(), 10);
        assert_eq!(b.set(10).unwrap(), 10);
        assert_eq!(a.sub(3).unwrap(), 7);
        assert_eq!(b.sub(3).unwrap(), 7);
        assert_eq!(a.add(-3).unwrap(), 4);
        assert_eq!(b.add(-3).unwrap(), 4);
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let store = MemoryStore::new();
        let mut c = Float64Counter::field(&store, "Key", "Bob").unwrap();
        assert_eq!(c.set(2.5).unwrap(), 2.5);
        assert_eq!(c.last_value(), Some(2.5));
        assert_eq!(c.get().unwrap(), 2.5);
        assert_eq!(c.to_string(), "Key[Bob] = 2.500000");
    }

    #[test]
    fn test_exists_and_delete_leave_cache_empty() {
        let store = MemoryStore::new();
        let mut c = Int64Counter::key(&store, "x").unwrap();
        c.increment().unwrap();
        assert_eq!(c.last_value(), Some(1));
        assert!(c.exists().unwrap());
        assert_eq!(c.last_value(), None);

        c.get().unwrap();
        c.delete().unwrap();
        assert_eq!(c.last_value(), None);
        assert!(!c.exists().unwrap());
    }

    #[test]
    fn test_non_numeric_value_forgets_previous() {
        let store = MemoryStore::new();
        let mut c = Float64Counter::key(&store, "Gary").unwrap();
        c.set(1.0).unwrap();
        store.set_string("Gary", "Gary");
        assert!(c.get().unwrap_err().is_not_a_number());
        assert_eq!(c.last_value(), None);
    }

    #[test]
    fn test_float_increment_and_decrement() {
        let store = MemoryStore::new();
        let mut c = Float64Counter::key(&store, "f").unwrap();
        assert_eq!(c.increment().unwrap(), 1.0);
        assert_eq!(c.increment().unwrap(), 2.0);
        assert_eq!(c.decrement().unwrap(), 1.0);
    }

    #[test]
    fn test_empty_identity_is_rejected() {
        let store = MemoryStore::new();
        assert_eq!(
            Int64Counter::key(&store, "").unwrap_err().to_string(),
            "Empty redis key"
        );
        assert_eq!(
            Int64Counter::field(&store, "k", "").unwrap_err().to_string(),
            "Empty redis field"
        );
    }
}
