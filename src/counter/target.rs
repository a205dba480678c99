//! What a counter points at, and the store commands for each operation.
//!
//! The verb table lives here, not in the handles:
//!
//! | op | int key | float key | int field | float field |
//! |----|---------|-----------|-----------|-------------|
//! | add | INCRBY | INCRBYFLOAT | HINCRBY | HINCRBYFLOAT |
//! | sub | DECRBY | INCRBYFLOAT -x | HINCRBY -x | HINCRBYFLOAT -x |
//! | increment | INCR | INCRBYFLOAT 1 | HINCRBY 1 | HINCRBYFLOAT 1 |
//! | decrement | DECR | INCRBYFLOAT -1 | HINCRBY -1 | HINCRBYFLOAT -1 |

use super::error::CounterError;
use super::numeric::{Numeric, NumericKind};
use crate::redis::Command;
use std::fmt;

/// One counter: a top-level key or one field of a hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Key(String),
    Field { key: String, field: String },
}

impl Target {
    pub fn key(key: &str) -> Result<Self, CounterError> {
        if key.is_empty() {
            return Err(CounterError::EmptyKey);
        }
        Ok(Target::Key(key.to_string()))
    }

    pub fn field(key: &str, field: &str) -> Result<Self, CounterError> {
        if key.is_empty() {
            return Err(CounterError::EmptyKey);
        }
        if field.is_empty() {
            return Err(CounterError::EmptyField);
        }
        Ok(Target::Field {
            key: key.to_string(),
            field: field.to_string(),
        })
    }

    pub fn redis_key(&self) -> &str {
        match self {
            Target::Key(key) | Target::Field { key, .. } => key,
        }
    }

    pub fn redis_field(&self) -> Option<&str> {
        match self {
            Target::Key(_) => None,
            Target::Field { field, .. } => Some(field),
        }
    }

    /// Verb plus the key (and field) arguments.
    fn command(&self, key_verb: &'static str, field_verb: &'static str) -> Command {
        match self {
            Target::Key(key) => Command::new(key_verb).str_arg(key),
            Target::Field { key, field } => Command::new(field_verb).str_arg(key).str_arg(field),
        }
    }

    pub fn get_command(&self) -> Command {
        self.command("GET", "HGET")
    }

    pub fn exists_command(&self) -> Command {
        self.command("EXISTS", "HEXISTS")
    }

    pub fn delete_command(&self) -> Command {
        self.command("DEL", "HDEL")
    }

    pub fn set_command<N: Numeric>(&self, amount: N) -> Command {
        self.command("SET", "HSET").arg(amount.to_arg())
    }

    pub fn add_command<N: Numeric>(&self, amount: N) -> Command {
        let cmd = match N::KIND {
            NumericKind::Int64 => self.command("INCRBY", "HINCRBY"),
            NumericKind::Float64 => self.command("INCRBYFLOAT", "HINCRBYFLOAT"),
        };
        cmd.arg(amount.to_arg())
    }

    /// Top-level int keys have DECRBY; everything else adds the negation.
    pub fn sub_command<N: Numeric>(&self, amount: N) -> Result<Command, CounterError> {
        match (N::KIND, self) {
            (NumericKind::Int64, Target::Key(key)) => {
                Ok(Command::new("DECRBY").str_arg(key).arg(amount.to_arg()))
            }
            _ => {
                let negated = amount.checked_neg().ok_or(CounterError::Overflow)?;
                Ok(self.add_command(negated))
            }
        }
    }

    pub fn increment_command<N: Numeric>(&self) -> Command {
        match (N::KIND, self) {
            (NumericKind::Int64, Target::Key(key)) => Command::new("INCR").str_arg(key),
            _ => self.add_command(N::ONE),
        }
    }

    pub fn decrement_command<N: Numeric>(&self) -> Command {
        match (N::KIND, self) {
            (NumericKind::Int64, Target::Key(key)) => Command::new("DECR").str_arg(key),
            _ => self.add_command(N::MINUS_ONE),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Key(key) => write!(f, "{}", key),
            Target::Field { key, field } => write!(f, "{}[{}]", key, field),
        }
    }
}

/// Several counters: a list of top-level keys, or a list of fields of one
/// hash. The identity list is fixed at construction and defines both the
/// order of bulk arguments and the display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTarget {
    hash_key: Option<String>,
    identities: Vec<String>,
    members: Vec<Target>,
}

impl BatchTarget {
    pub fn keys<I, S>(keys: I) -> Result<Self, CounterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let identities: Vec<String> = keys.into_iter().map(Into::into).collect();
        if identities.is_empty() {
            return Err(CounterError::EmptyKeys);
        }
        if let Some(i) = identities.iter().position(String::is_empty) {
            return Err(CounterError::EmptyKeyAt(i));
        }

        let members = identities.iter().cloned().map(Target::Key).collect();
        Ok(BatchTarget {
            hash_key: None,
            identities,
            members,
        })
    }

    pub fn fields<I, S>(key: &str, fields: I) -> Result<Self, CounterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if key.is_empty() {
            return Err(CounterError::EmptyKey);
        }
        let identities: Vec<String> = fields.into_iter().map(Into::into).collect();
        if identities.is_empty() {
            return Err(CounterError::EmptyFields);
        }
        if let Some(i) = identities.iter().position(String::is_empty) {
            return Err(CounterError::EmptyFieldAt(i));
        }

        let members = identities
            .iter()
            .map(|field| Target::Field {
                key: key.to_string(),
                field: field.clone(),
            })
            .collect();
        Ok(BatchTarget {
            hash_key: Some(key.to_string()),
            identities,
            members,
        })
    }

    /// Key names, or field names for a hash target.
    pub fn identities(&self) -> &[String] {
        &self.identities
    }

    /// Each identity as a single-counter target, in identity order.
    pub fn members(&self) -> &[Target] {
        &self.members
    }

    pub fn hash_key(&self) -> Option<&str> {
        self.hash_key.as_deref()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    fn bulk_command(&self, key_verb: &'static str, field_verb: &'static str) -> Command {
        let ids = self.identities.iter().map(String::as_str);
        match &self.hash_key {
            None => Command::new(key_verb).str_args(ids),
            Some(key) => Command::new(field_verb).str_arg(key).str_args(ids),
        }
    }

    pub fn get_all_command(&self) -> Command {
        self.bulk_command("MGET", "HMGET")
    }

    pub fn delete_all_command(&self) -> Command {
        self.bulk_command("DEL", "HDEL")
    }

    /// MSET/HMSET with the same amount for every identity.
    pub fn set_all_command<N: Numeric>(&self, amount: N) -> Command {
        let mut cmd = match &self.hash_key {
            None => Command::new("MSET"),
            Some(key) => Command::new("HMSET").str_arg(key),
        };
        let amount = amount.to_arg();
        for id in &self.identities {
            cmd = cmd.str_arg(id).arg(amount.clone());
        }
        cmd
    }
}
