//! The store's state machine: one keyspace of strings and hashes.
//!
//! Replies and error texts follow what a Redis server sends for the same
//! command, so counters behave the same against either.

use super::command::StoreCommand;
use crate::redis::RespValue;
use ahash::AHashMap;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
const NOT_AN_INTEGER: &str = "ERR value is not an integer or out of range";
const NOT_A_FLOAT: &str = "ERR value is not a valid float";
const HASH_NOT_AN_INTEGER: &str = "ERR hash value is not an integer";
const HASH_NOT_A_FLOAT: &str = "ERR hash value is not a float";
const OVERFLOW: &str = "ERR increment or decrement would overflow";
const NAN_OR_INFINITY: &str = "ERR increment would produce NaN or Infinity";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(Vec<u8>),
    Hash(AHashMap<String, Vec<u8>>),
}

#[derive(Debug, Default)]
pub struct Keyspace {
    data: AHashMap<String, Value>,
    commands_processed: u64,
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn commands_processed(&self) -> u64 {
        self.commands_processed
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    /// Main command execution entry point.
    pub fn execute(&mut self, cmd: &StoreCommand) -> RespValue {
        self.commands_processed += 1;
        match cmd {
            StoreCommand::Ping(None) => RespValue::SimpleString("PONG".to_string()),
            StoreCommand::Ping(Some(msg)) => RespValue::bulk(msg.clone()),
            StoreCommand::FlushDb => {
                self.data.clear();
                RespValue::ok()
            }
            StoreCommand::Client => RespValue::ok(),
            StoreCommand::Get(key) => self.execute_get(key),
            StoreCommand::Set(key, value) => {
                self.data.insert(key.clone(), Value::String(value.clone()));
                RespValue::ok()
            }
            StoreCommand::MGet(keys) => self.execute_mget(keys),
            StoreCommand::MSet(pairs) => {
                for (key, value) in pairs {
                    self.data.insert(key.clone(), Value::String(value.clone()));
                }
                RespValue::ok()
            }
            StoreCommand::IncrBy(key, delta) => self.execute_incrby(key, *delta),
            StoreCommand::IncrByFloat(key, delta) => self.execute_incrbyfloat(key, *delta),
            StoreCommand::Exists(keys) => {
                let count = keys.iter().filter(|k| self.data.contains_key(*k)).count();
                RespValue::Integer(count as i64)
            }
            StoreCommand::Del(keys) => {
                let count = keys.iter().filter(|k| self.data.remove(*k).is_some()).count();
                RespValue::Integer(count as i64)
            }
            StoreCommand::HGet(key, field) => self.execute_hget(key, field),
            StoreCommand::HSet(key, pairs) => self.execute_hset(key, pairs),
            StoreCommand::HMSet(key, pairs) => match self.execute_hset(key, pairs) {
                RespValue::Integer(_) => RespValue::ok(),
                other => other,
            },
            StoreCommand::HMGet(key, fields) => self.execute_hmget(key, fields),
            StoreCommand::HIncrBy(key, field, delta) => self.execute_hincrby(key, field, *delta),
            StoreCommand::HIncrByFloat(key, field, delta) => {
                self.execute_hincrbyfloat(key, field, *delta)
            }
            StoreCommand::HExists(key, field) => match self.data.get(key) {
                Some(Value::Hash(h)) => RespValue::Integer(h.contains_key(field) as i64),
                Some(_) => RespValue::err(WRONGTYPE),
                None => RespValue::Integer(0),
            },
            StoreCommand::HDel(key, fields) => self.execute_hdel(key, fields),
        }
    }

    fn execute_get(&self, key: &str) -> RespValue {
        match self.data.get(key) {
            Some(Value::String(s)) => RespValue::bulk(s.clone()),
            Some(_) => RespValue::err(WRONGTYPE),
            None => RespValue::nil(),
        }
    }

    fn execute_mget(&self, keys: &[String]) -> RespValue {
        // MGET answers nil for keys of another type
        let values = keys
            .iter()
            .map(|k| match self.data.get(k) {
                Some(Value::String(s)) => RespValue::bulk(s.clone()),
                _ => RespValue::nil(),
            })
            .collect();
        RespValue::Array(Some(values))
    }

    fn execute_incrby(&mut self, key: &str, delta: i64) -> RespValue {
        let current = match self.data.get(key) {
            Some(Value::String(s)) => match parse_i64(s) {
                Some(n) => n,
                None => return RespValue::err(NOT_AN_INTEGER),
            },
            Some(_) => return RespValue::err(WRONGTYPE),
            None => 0,
        };
        let Some(new_value) = current.checked_add(delta) else {
            return RespValue::err(OVERFLOW);
        };
        self.data
            .insert(key.to_string(), Value::String(new_value.to_string().into_bytes()));
        RespValue::Integer(new_value)
    }

    fn execute_incrbyfloat(&mut self, key: &str, delta: f64) -> RespValue {
        let current = match self.data.get(key) {
            Some(Value::String(s)) => match parse_f64(s) {
                Some(n) => n,
                None => return RespValue::err(NOT_A_FLOAT),
            },
            Some(_) => return RespValue::err(WRONGTYPE),
            None => 0.0,
        };
        let new_value = current + delta;
        if !new_value.is_finite() {
            return RespValue::err(NAN_OR_INFINITY);
        }
        let text = format_float(new_value);
        self.data
            .insert(key.to_string(), Value::String(text.clone().into_bytes()));
        RespValue::bulk(text)
    }

    fn execute_hget(&self, key: &str, field: &str) -> RespValue {
        match self.data.get(key) {
            Some(Value::Hash(h)) => match h.get(field) {
                Some(v) => RespValue::bulk(v.clone()),
                None => RespValue::nil(),
            },
            Some(_) => RespValue::err(WRONGTYPE),
            None => RespValue::nil(),
        }
    }

    fn execute_hmget(&self, key: &str, fields: &[String]) -> RespValue {
        let hash = match self.data.get(key) {
            Some(Value::Hash(h)) => Some(h),
            Some(_) => return RespValue::err(WRONGTYPE),
            None => None,
        };
        let values = fields
            .iter()
            .map(|f| match hash.and_then(|h| h.get(f)) {
                Some(v) => RespValue::bulk(v.clone()),
                None => RespValue::nil(),
            })
            .collect();
        RespValue::Array(Some(values))
    }

    /// The hash at `key`, created empty if absent.
    fn hash_mut(&mut self, key: &str) -> Result<&mut AHashMap<String, Vec<u8>>, RespValue> {
        let value = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(AHashMap::new()));
        match value {
            Value::Hash(h) => Ok(h),
            Value::String(_) => Err(RespValue::err(WRONGTYPE)),
        }
    }

    fn execute_hset(&mut self, key: &str, pairs: &[(String, Vec<u8>)]) -> RespValue {
        let hash = match self.hash_mut(key) {
            Ok(h) => h,
            Err(reply) => return reply,
        };
        let mut new_fields = 0i64;
        for (field, value) in pairs {
            if hash.insert(field.clone(), value.clone()).is_none() {
                new_fields += 1;
            }
        }
        RespValue::Integer(new_fields)
    }

    fn execute_hincrby(&mut self, key: &str, field: &str, delta: i64) -> RespValue {
        if matches!(self.data.get(key), Some(Value::String(_))) {
            return RespValue::err(WRONGTYPE);
        }
        let current = match self.hash_field(key, field) {
            Some(v) => match parse_i64(v) {
                Some(n) => n,
                None => return RespValue::err(HASH_NOT_AN_INTEGER),
            },
            None => 0,
        };
        let Some(new_value) = current.checked_add(delta) else {
            return RespValue::err(OVERFLOW);
        };
        match self.hash_mut(key) {
            Ok(h) => {
                h.insert(field.to_string(), new_value.to_string().into_bytes());
                RespValue::Integer(new_value)
            }
            Err(reply) => reply,
        }
    }

    fn execute_hincrbyfloat(&mut self, key: &str, field: &str, delta: f64) -> RespValue {
        if matches!(self.data.get(key), Some(Value::String(_))) {
            return RespValue::err(WRONGTYPE);
        }
        let current = match self.hash_field(key, field) {
            Some(v) => match parse_f64(v) {
                Some(n) => n,
                None => return RespValue::err(HASH_NOT_A_FLOAT),
            },
            None => 0.0,
        };
        let new_value = current + delta;
        if !new_value.is_finite() {
            return RespValue::err(NAN_OR_INFINITY);
        }
        let text = format_float(new_value);
        match self.hash_mut(key) {
            Ok(h) => {
                h.insert(field.to_string(), text.clone().into_bytes());
                RespValue::bulk(text)
            }
            Err(reply) => reply,
        }
    }

    fn hash_field(&self, key: &str, field: &str) -> Option<&[u8]> {
        match self.data.get(key) {
            Some(Value::Hash(h)) => h.get(field).map(Vec::as_slice),
            _ => None,
        }
    }

    fn execute_hdel(&mut self, key: &str, fields: &[String]) -> RespValue {
        let result = match self.data.get_mut(key) {
            Some(Value::Hash(h)) => {
                let deleted = fields.iter().filter(|f| h.remove(*f).is_some()).count();
                RespValue::Integer(deleted as i64)
            }
            Some(_) => return RespValue::err(WRONGTYPE),
            None => RespValue::Integer(0),
        };
        // Redis drops a hash once its last field is gone
        if matches!(self.data.get(key), Some(Value::Hash(h)) if h.is_empty()) {
            self.data.remove(key);
        }
        result
    }
}

fn parse_i64(data: &[u8]) -> Option<i64> {
    std::str::from_utf8(data).ok()?.parse().ok()
}

fn parse_f64(data: &[u8]) -> Option<f64> {
    let n: f64 = std::str::from_utf8(data).ok()?.parse().ok()?;
    n.is_finite().then_some(n)
}

/// Shortest text that reads back as the same value, with no exponent and
/// no negative zero.
fn format_float(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(ks: &mut Keyspace, cmd: StoreCommand) -> RespValue {
        ks.execute(&cmd)
    }

    #[test]
    fn test_incr_family() {
        let mut ks = Keyspace::new();
        assert_eq!(run(&mut ks, StoreCommand::IncrBy("a".into(), 5)), RespValue::Integer(5));
        assert_eq!(run(&mut ks, StoreCommand::IncrBy("a".into(), -7)), RespValue::Integer(-2));
        assert_eq!(
            run(&mut ks, StoreCommand::IncrByFloat("a".into(), 0.5)),
            RespValue::bulk("-1.5")
        );
        assert_eq!(
            run(&mut ks, StoreCommand::IncrBy("a".into(), 1)),
            RespValue::err(NOT_AN_INTEGER)
        );
    }

    #[test]
    fn test_incr_overflow() {
        let mut ks = Keyspace::new();
        run(&mut ks, StoreCommand::Set("a".into(), i64::MAX.to_string().into_bytes()));
        assert_eq!(run(&mut ks, StoreCommand::IncrBy("a".into(), 1)), RespValue::err(OVERFLOW));
    }

    #[test]
    fn test_hash_counters() {
        let mut ks = Keyspace::new();
        assert_eq!(
            run(&mut ks, StoreCommand::HIncrBy("h".into(), "f".into(), 3)),
            RespValue::Integer(3)
        );
        assert_eq!(
            run(&mut ks, StoreCommand::HIncrByFloat("h".into(), "f".into(), 0.25)),
            RespValue::bulk("3.25")
        );
        assert_eq!(
            run(&mut ks, StoreCommand::HIncrBy("h".into(), "f".into(), 1)),
            RespValue::err(HASH_NOT_AN_INTEGER)
        );
        assert_eq!(
            run(&mut ks, StoreCommand::HExists("h".into(), "f".into())),
            RespValue::Integer(1)
        );
    }

    #[test]
    fn test_wrong_type() {
        let mut ks = Keyspace::new();
        run(&mut ks, StoreCommand::Set("s".into(), b"1".to_vec()));
        assert_eq!(
            run(&mut ks, StoreCommand::HGet("s".into(), "f".into())),
            RespValue::err(WRONGTYPE)
        );
        assert_eq!(
            run(&mut ks, StoreCommand::HIncrBy("s".into(), "f".into(), 1)),
            RespValue::err(WRONGTYPE)
        );
        run(&mut ks, StoreCommand::HSet("h".into(), vec![("f".into(), b"1".to_vec())]));
        assert_eq!(run(&mut ks, StoreCommand::Get("h".into())), RespValue::err(WRONGTYPE));
        // MGET never reports WRONGTYPE
        assert_eq!(
            run(&mut ks, StoreCommand::MGet(vec!["h".into(), "s".into()])),
            RespValue::Array(Some(vec![RespValue::nil(), RespValue::bulk("1")]))
        );
    }

    #[test]
    fn test_hmget_on_missing_hash() {
        let mut ks = Keyspace::new();
        assert_eq!(
            run(&mut ks, StoreCommand::HMGet("h".into(), vec!["a".into(), "b".into()])),
            RespValue::Array(Some(vec![RespValue::nil(), RespValue::nil()]))
        );
    }

    #[test]
    fn test_hdel_drops_empty_hash() {
        let mut ks = Keyspace::new();
        run(
            &mut ks,
            StoreCommand::HMSet(
                "h".into(),
                vec![("a".into(), b"1".to_vec()), ("b".into(), b"2".to_vec())],
            ),
        );
        assert_eq!(
            run(&mut ks, StoreCommand::HDel("h".into(), vec!["a".into(), "b".into(), "c".into()])),
            RespValue::Integer(2)
        );
        assert!(ks.is_empty());
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(3.0), "3");
        assert_eq!(format_float(-0.0), "0");
        assert_eq!(format_float(10.5 + 0.25), "10.75");
    }
}
