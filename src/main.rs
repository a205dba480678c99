//! Run one counter operation against a store.
//!
//! ## Usage
//!
//! ```text
//! redis-counter [--config PATH] [--float] --key K [--key K...] [--field F...] <OP> [AMOUNT]
//! ```
//!
//! OP is one of get, set, add, sub, incr, decr, exists, del. One key is a
//! single counter, one key with one field a hash field counter, one key with
//! several fields a batch over those fields, several keys a batch over the
//! keys. Prints the result, then the counter with its last observed values.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use redis_counter::counter::DisplayValue;
use redis_counter::observability::init_logging;
use redis_counter::{BatchCounter, Counter, CounterConfig, CounterError, Numeric, RedisConnection};
use std::path::PathBuf;
use tracing::debug;

const USAGE: &str = "usage: redis-counter [--config PATH] [--float] --key K [--key K...] \
                     [--field F...] <get|set|add|sub|incr|decr|exists|del> [AMOUNT]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Get,
    Set,
    Add,
    Sub,
    Incr,
    Decr,
    Exists,
    Del,
}

impl Op {
    fn parse(name: &str) -> Option<Op> {
        match name {
            "get" => Some(Op::Get),
            "set" => Some(Op::Set),
            "add" => Some(Op::Add),
            "sub" => Some(Op::Sub),
            "incr" => Some(Op::Incr),
            "decr" => Some(Op::Decr),
            "exists" => Some(Op::Exists),
            "del" => Some(Op::Del),
            _ => None,
        }
    }

    fn takes_amount(self) -> bool {
        matches!(self, Op::Set | Op::Add | Op::Sub)
    }
}

#[derive(Debug)]
struct Args {
    config: Option<PathBuf>,
    float: bool,
    keys: Vec<String>,
    fields: Vec<String>,
    op: Op,
    amount: Option<String>,
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Args, String> {
    let mut config = None;
    let mut float = false;
    let mut keys = Vec::new();
    let mut fields = Vec::new();
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(args.next().ok_or("--config needs a path")?)),
            "--float" => float = true,
            "--key" => keys.push(args.next().ok_or("--key needs a value")?),
            "--field" => fields.push(args.next().ok_or("--field needs a value")?),
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let op_name = positional.next().ok_or(USAGE)?;
    let op = Op::parse(&op_name)
        .ok_or_else(|| format!("unknown operation '{}'\n{}", op_name, USAGE))?;
    let amount = positional.next();
    if positional.next().is_some() {
        return Err(USAGE.to_string());
    }
    if op.takes_amount() && amount.is_none() {
        return Err(format!("'{}' needs an amount\n{}", op_name, USAGE));
    }
    if !op.takes_amount() && amount.is_some() {
        return Err(format!("'{}' takes no amount\n{}", op_name, USAGE));
    }
    if keys.is_empty() {
        return Err(format!("at least one --key is required\n{}", USAGE));
    }
    if keys.len() > 1 && !fields.is_empty() {
        return Err("--field selects fields of a single --key".to_string());
    }

    Ok(Args {
        config,
        float,
        keys,
        fields,
        op,
        amount,
    })
}

fn parse_amount<N: Numeric>(args: &Args) -> Result<N, String> {
    match &args.amount {
        Some(text) => N::parse(text).ok_or_else(|| format!("'{}' is not a valid amount", text)),
        None => Ok(N::ZERO),
    }
}

fn run_single<N: Numeric>(
    mut counter: Counter<N, RedisConnection>,
    op: Op,
    amount: N,
) -> Result<(), CounterError> {
    match op {
        Op::Get => println!("{}", DisplayValue(Some(counter.get()?))),
        Op::Set => println!("{}", DisplayValue(Some(counter.set(amount)?))),
        Op::Add => println!("{}", DisplayValue(Some(counter.add(amount)?))),
        Op::Sub => println!("{}", DisplayValue(Some(counter.sub(amount)?))),
        Op::Incr => println!("{}", DisplayValue(Some(counter.increment()?))),
        Op::Decr => println!("{}", DisplayValue(Some(counter.decrement()?))),
        Op::Exists => println!("{}", counter.exists()?),
        Op::Del => {
            counter.delete()?;
            println!("OK");
        }
    }
    println!("{}", counter);
    Ok(())
}

fn run_batch<N: Numeric>(
    mut counter: BatchCounter<N, RedisConnection>,
    op: Op,
    amount: N,
) -> Result<(), CounterError> {
    let values = match op {
        Op::Get => Some(counter.get_all()?),
        Op::Set => Some(counter.set_all(amount)?),
        Op::Add => Some(counter.add_all(amount)?),
        Op::Sub => Some(counter.sub_all(amount)?),
        Op::Incr => Some(counter.increment_all()?),
        Op::Decr => Some(counter.decrement_all()?),
        Op::Exists => {
            let flags = counter.exists_all()?;
            for (id, flag) in counter.identities().iter().zip(flags) {
                println!("{}: {}", id, flag);
            }
            None
        }
        Op::Del => {
            counter.delete_all()?;
            println!("OK");
            None
        }
    };
    if let Some(values) = values {
        for (id, value) in counter.identities().iter().zip(values) {
            println!("{}: {}", id, DisplayValue(Some(value)));
        }
    }
    println!("{}", counter);
    Ok(())
}

fn run<N: Numeric>(config: &CounterConfig, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let amount = parse_amount::<N>(args)?;
    let conn = RedisConnection::connect(&config.redis)?;
    let key = args.keys[0].as_str();
    match (args.keys.len(), args.fields.len()) {
        (1, 0) => run_single(Counter::<N, _>::key(conn, key)?, args.op, amount)?,
        (1, 1) => run_single(Counter::<N, _>::field(conn, key, &args.fields[0])?, args.op, amount)?,
        (1, _) => {
            let counter = BatchCounter::<N, _>::fields(conn, key, args.fields.iter().cloned())?;
            run_batch(counter, args.op, amount)?
        }
        _ => run_batch(BatchCounter::<N, _>::keys(conn, args.keys.iter().cloned())?, args.op, amount)?,
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            std::process::exit(2);
        }
    };

    let config = CounterConfig::load(args.config.as_deref())?;
    init_logging(&config.log);
    debug!(addr = %config.redis.addr, op = ?args.op, "connecting");

    if args.float {
        run::<f64>(&config, &args)
    } else {
        run::<i64>(&config, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Args, String> {
        parse_args(line.split_whitespace().map(String::from))
    }

    #[test]
    fn test_parse_single_key() {
        let args = parse("--key Bob add 555").unwrap();
        assert_eq!(args.keys, vec!["Bob"]);
        assert_eq!(args.op, Op::Add);
        assert_eq!(parse_amount::<i64>(&args).unwrap(), 555);
    }

    #[test]
    fn test_parse_fields_and_float() {
        let args = parse("--float --key Key --field Bob --field George get").unwrap();
        assert!(args.float);
        assert_eq!(args.fields, vec!["Bob", "George"]);
        assert!(args.amount.is_none());
    }

    #[test]
    fn test_rejects_bad_combinations() {
        assert!(parse("--key a --key b --field f get").is_err());
        assert!(parse("--key a add").is_err());
        assert!(parse("--key a get 5").is_err());
        assert!(parse("get").is_err());
        assert!(parse("--key a frobnicate").is_err());
    }

    #[test]
    fn test_bad_amount() {
        let args = parse("--key a add Gary").unwrap();
        assert!(parse_amount::<i64>(&args).is_err());
    }
}
