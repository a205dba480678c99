//! Commands understood by the in-process store, parsed from RESP arrays.

use crate::redis::RespValue;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    Ping(Option<Vec<u8>>),
    FlushDb,
    /// CLIENT subcommands sent by clients on connect. Acknowledged, not acted on.
    Client,
    // Top-level keys
    Get(String),
    Set(String, Vec<u8>),
    MGet(Vec<String>),
    MSet(Vec<(String, Vec<u8>)>),
    IncrBy(String, i64),
    IncrByFloat(String, f64),
    Exists(Vec<String>),
    Del(Vec<String>),
    // Hash fields
    HGet(String, String),
    HSet(String, Vec<(String, Vec<u8>)>),
    /// HSET with the `+OK` reply of the older verb.
    HMSet(String, Vec<(String, Vec<u8>)>),
    HMGet(String, Vec<String>),
    HIncrBy(String, String, i64),
    HIncrByFloat(String, String, f64),
    HExists(String, String),
    HDel(String, Vec<String>),
}

impl StoreCommand {
    pub fn name(&self) -> &'static str {
        match self {
            StoreCommand::Ping(_) => "PING",
            StoreCommand::FlushDb => "FLUSHDB",
            StoreCommand::Client => "CLIENT",
            StoreCommand::Get(_) => "GET",
            StoreCommand::Set(..) => "SET",
            StoreCommand::MGet(_) => "MGET",
            StoreCommand::MSet(_) => "MSET",
            StoreCommand::IncrBy(..) => "INCRBY",
            StoreCommand::IncrByFloat(..) => "INCRBYFLOAT",
            StoreCommand::Exists(_) => "EXISTS",
            StoreCommand::Del(_) => "DEL",
            StoreCommand::HGet(..) => "HGET",
            StoreCommand::HSet(..) => "HSET",
            StoreCommand::HMSet(..) => "HMSET",
            StoreCommand::HMGet(..) => "HMGET",
            StoreCommand::HIncrBy(..) => "HINCRBY",
            StoreCommand::HIncrByFloat(..) => "HINCRBYFLOAT",
            StoreCommand::HExists(..) => "HEXISTS",
            StoreCommand::HDel(..) => "HDEL",
        }
    }

    /// Parse a request frame. The error is the reply text a Redis server
    /// would send.
    pub fn from_resp(value: &RespValue) -> Result<StoreCommand, String> {
        let elements = match value {
            RespValue::Array(Some(elements)) if !elements.is_empty() => elements,
            _ => return Err("ERR Protocol error: expected a command array".to_string()),
        };

        let name = match &elements[0] {
            RespValue::BulkString(Some(data)) => String::from_utf8_lossy(data).to_uppercase(),
            _ => return Err("ERR Protocol error: invalid command name".to_string()),
        };
        let args = &elements[1..];
        let arity = |ok: bool| -> Result<(), String> {
            if ok {
                Ok(())
            } else {
                Err(format!(
                    "ERR wrong number of arguments for '{}' command",
                    name.to_lowercase()
                ))
            }
        };

        match name.as_str() {
            "PING" => {
                arity(args.len() <= 1)?;
                let msg = args.first().map(Self::extract_bytes).transpose()?;
                Ok(StoreCommand::Ping(msg))
            }
            "FLUSHDB" => Ok(StoreCommand::FlushDb),
            "CLIENT" => {
                arity(!args.is_empty())?;
                Ok(StoreCommand::Client)
            }
            "GET" => {
                arity(args.len() == 1)?;
                Ok(StoreCommand::Get(Self::extract_string(&args[0])?))
            }
            "SET" => {
                // SET options are not supported
                arity(args.len() == 2)?;
                Ok(StoreCommand::Set(
                    Self::extract_string(&args[0])?,
                    Self::extract_bytes(&args[1])?,
                ))
            }
            "MGET" => {
                arity(!args.is_empty())?;
                Ok(StoreCommand::MGet(Self::extract_strings(args)?))
            }
            "MSET" => {
                arity(!args.is_empty() && args.len() % 2 == 0)?;
                Ok(StoreCommand::MSet(Self::extract_pairs(args)?))
            }
            "INCR" | "DECR" => {
                arity(args.len() == 1)?;
                let delta = if name == "INCR" { 1 } else { -1 };
                Ok(StoreCommand::IncrBy(Self::extract_string(&args[0])?, delta))
            }
            "INCRBY" | "DECRBY" => {
                arity(args.len() == 2)?;
                let key = Self::extract_string(&args[0])?;
                let amount = Self::extract_i64(&args[1])?;
                let delta = if name == "INCRBY" {
                    amount
                } else {
                    amount
                        .checked_neg()
                        .ok_or_else(|| "ERR decrement would overflow".to_string())?
                };
                Ok(StoreCommand::IncrBy(key, delta))
            }
            "INCRBYFLOAT" => {
                arity(args.len() == 2)?;
                Ok(StoreCommand::IncrByFloat(
                    Self::extract_string(&args[0])?,
                    Self::extract_float(&args[1])?,
                ))
            }
            "EXISTS" => {
                arity(!args.is_empty())?;
                Ok(StoreCommand::Exists(Self::extract_strings(args)?))
            }
            "DEL" => {
                arity(!args.is_empty())?;
                Ok(StoreCommand::Del(Self::extract_strings(args)?))
            }
            "HGET" => {
                arity(args.len() == 2)?;
                Ok(StoreCommand::HGet(
                    Self::extract_string(&args[0])?,
                    Self::extract_string(&args[1])?,
                ))
            }
            "HSET" | "HMSET" => {
                arity(args.len() >= 3 && args.len() % 2 == 1)?;
                let key = Self::extract_string(&args[0])?;
                let pairs = Self::extract_pairs(&args[1..])?;
                if name == "HSET" {
                    Ok(StoreCommand::HSet(key, pairs))
                } else {
                    Ok(StoreCommand::HMSet(key, pairs))
                }
            }
            "HMGET" => {
                arity(args.len() >= 2)?;
                Ok(StoreCommand::HMGet(
                    Self::extract_string(&args[0])?,
                    Self::extract_strings(&args[1..])?,
                ))
            }
            "HINCRBY" => {
                arity(args.len() == 3)?;
                Ok(StoreCommand::HIncrBy(
                    Self::extract_string(&args[0])?,
                    Self::extract_string(&args[1])?,
                    Self::extract_i64(&args[2])?,
                ))
            }
            "HINCRBYFLOAT" => {
                arity(args.len() == 3)?;
                Ok(StoreCommand::HIncrByFloat(
                    Self::extract_string(&args[0])?,
                    Self::extract_string(&args[1])?,
                    Self::extract_float(&args[2])?,
                ))
            }
            "HEXISTS" => {
                arity(args.len() == 2)?;
                Ok(StoreCommand::HExists(
                    Self::extract_string(&args[0])?,
                    Self::extract_string(&args[1])?,
                ))
            }
            "HDEL" => {
                arity(args.len() >= 2)?;
                Ok(StoreCommand::HDel(
                    Self::extract_string(&args[0])?,
                    Self::extract_strings(&args[1..])?,
                ))
            }
            _ => Err(format!("ERR unknown command '{}'", name.to_lowercase())),
        }
    }

    fn extract_bytes(value: &RespValue) -> Result<Vec<u8>, String> {
        match value {
            RespValue::BulkString(Some(data)) => Ok(data.clone()),
            _ => Err("ERR Protocol error: expected bulk string".to_string()),
        }
    }

    fn extract_string(value: &RespValue) -> Result<String, String> {
        match value {
            RespValue::BulkString(Some(data)) => Ok(String::from_utf8_lossy(data).into_owned()),
            _ => Err("ERR Protocol error: expected bulk string".to_string()),
        }
    }

    fn extract_strings(values: &[RespValue]) -> Result<Vec<String>, String> {
        values.iter().map(Self::extract_string).collect()
    }

    fn extract_pairs(values: &[RespValue]) -> Result<Vec<(String, Vec<u8>)>, String> {
        values
            .chunks(2)
            .map(|pair| Ok((Self::extract_string(&pair[0])?, Self::extract_bytes(&pair[1])?)))
            .collect()
    }

    fn extract_i64(value: &RespValue) -> Result<i64, String> {
        match value {
            RespValue::BulkString(Some(data)) => std::str::from_utf8(data)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| "ERR value is not an integer or out of range".to_string()),
            RespValue::Integer(n) => Ok(*n),
            _ => Err("ERR value is not an integer or out of range".to_string()),
        }
    }

    fn extract_float(value: &RespValue) -> Result<f64, String> {
        match value {
            RespValue::BulkString(Some(data)) => std::str::from_utf8(data)
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| "ERR value is not a valid float".to_string()),
            _ => Err("ERR value is not a valid float".to_string()),
        }
    }
}
