//! In-process counter store served over RESP.
//!
//! Speaks the command subset the counters use, which is enough to run the
//! `redis-counter` CLI and the end-to-end tests without a Redis server.
//!
//! ## Usage
//!
//! ```text
//! counter-server [--config PATH]
//! ```
//!
//! The listen address comes from `[server] listen` in the config file or
//! REDIS_COUNTER_LISTEN (default 127.0.0.1:6379).

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use redis_counter::observability::init_logging;
use redis_counter::store::server::MemoryServer;
use redis_counter::{CounterConfig, MemoryStore};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config_path: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => match args.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => return Err("--config needs a path".into()),
            },
            other => return Err(format!("unknown argument '{}'", other).into()),
        }
    }

    let config = CounterConfig::load(config_path.as_deref())?;
    init_logging(&config.log);

    info!(listen = %config.server.listen, "starting counter-server");
    MemoryServer::new(MemoryStore::new())
        .run(&config.server.listen)
        .await?;

    Ok(())
}
