use super::DeterministicRng;
use crate::redis::{Command, Connection, Reply, TransportError};
use parking_lot::Mutex;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFault {
    /// The request never reaches the store.
    Refused,
    /// The store executes the request but the reply is lost.
    ReplyLost,
    /// A pipeline comes back with its last reply missing.
    ShortPipeline,
}

#[derive(Debug, Clone)]
pub struct FaultConfig {
    pub refuse_prob: f64,
    pub reply_lost_prob: f64,
    pub short_pipeline_prob: f64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        FaultConfig {
            refuse_prob: 0.05,
            reply_lost_prob: 0.05,
            short_pipeline_prob: 0.02,
        }
    }
}

impl FaultConfig {
    pub fn none() -> Self {
        FaultConfig {
            refuse_prob: 0.0,
            reply_lost_prob: 0.0,
            short_pipeline_prob: 0.0,
        }
    }
}

/// Wraps a connection and injects transport faults from a seeded RNG.
pub struct FaultyConnection<C> {
    inner: C,
    config: FaultConfig,
    state: Mutex<FaultState>,
}

struct FaultState {
    rng: DeterministicRng,
    injected: u64,
    last: Option<TransportFault>,
}

impl<C: Connection> FaultyConnection<C> {
    pub fn new(inner: C, config: FaultConfig, seed: u64) -> Self {
        FaultyConnection {
            inner,
            config,
            state: Mutex::new(FaultState {
                rng: DeterministicRng::new(seed),
                injected: 0,
                last: None,
            }),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Faults injected so far.
    pub fn injected(&self) -> u64 {
        self.state.lock().injected
    }

    /// Fault injected by the most recent call, if any.
    pub fn last_fault(&self) -> Option<TransportFault> {
        self.state.lock().last
    }

    fn roll(&self, pipelined: bool) -> Option<TransportFault> {
        let mut state = self.state.lock();
        let fault = if state.rng.gen_bool(self.config.refuse_prob) {
            Some(TransportFault::Refused)
        } else if state.rng.gen_bool(self.config.reply_lost_prob) {
            Some(TransportFault::ReplyLost)
        } else if pipelined && state.rng.gen_bool(self.config.short_pipeline_prob) {
            Some(TransportFault::ShortPipeline)
        } else {
            None
        };
        if fault.is_some() {
            state.injected += 1;
        }
        state.last = fault;
        fault
    }

    fn reset_error(fault: TransportFault) -> TransportError {
        TransportError::Io(io::Error::new(
            io::ErrorKind::ConnectionReset,
            format!("injected fault: {:?}", fault),
        ))
    }
}

impl<C: Connection> Connection for FaultyConnection<C> {
    fn execute(&self, command: &Command) -> Result<Reply, TransportError> {
        match self.roll(false) {
            Some(TransportFault::Refused) => Err(Self::reset_error(TransportFault::Refused)),
            Some(fault) => {
                self.inner.execute(command)?;
                Err(Self::reset_error(fault))
            }
            None => self.inner.execute(command),
        }
    }

    fn pipeline(&self, commands: &[Command]) -> Result<Vec<Reply>, TransportError> {
        match self.roll(true) {
            Some(TransportFault::Refused) => Err(Self::reset_error(TransportFault::Refused)),
            Some(TransportFault::ReplyLost) => {
                self.inner.pipeline(commands)?;
                Err(Self::reset_error(TransportFault::ReplyLost))
            }
            Some(TransportFault::ShortPipeline) => {
                let mut replies = self.inner.pipeline(commands)?;
                replies.pop();
                Ok(replies)
            }
            None => self.inner.pipeline(commands),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn incr() -> Command {
        Command::new("INCR").str_arg("a")
    }

    #[test]
    fn test_no_faults_is_transparent() {
        let conn = FaultyConnection::new(MemoryStore::new(), FaultConfig::none(), 1);
        assert_eq!(conn.execute(&incr()).unwrap(), Reply::Integer(1));
        assert_eq!(conn.injected(), 0);
    }

    #[test]
    fn test_lost_reply_still_reaches_store() {
        let config = FaultConfig {
            refuse_prob: 0.0,
            reply_lost_prob: 1.0,
            short_pipeline_prob: 0.0,
        };
        let conn = FaultyConnection::new(MemoryStore::new(), config, 1);
        assert!(conn.execute(&incr()).is_err());
        assert_eq!(conn.last_fault(), Some(TransportFault::ReplyLost));
        assert_eq!(conn.inner().get_string("a").as_deref(), Some("1"));
    }

    #[test]
    fn test_refused_never_reaches_store() {
        let config = FaultConfig {
            refuse_prob: 1.0,
            ..FaultConfig::none()
        };
        let conn = FaultyConnection::new(MemoryStore::new(), config, 1);
        assert!(conn.pipeline(&[incr(), incr()]).is_err());
        assert!(conn.inner().is_empty());
    }

    #[test]
    fn test_short_pipeline_drops_last_reply() {
        let config = FaultConfig {
            short_pipeline_prob: 1.0,
            ..FaultConfig::none()
        };
        let conn = FaultyConnection::new(MemoryStore::new(), config, 1);
        assert_eq!(conn.pipeline(&[incr(), incr()]).unwrap().len(), 1);
        assert_eq!(conn.injected(), 1);
    }
}
