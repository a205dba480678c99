//! Deterministic Simulation Testing for batch counters
//!
//! Drives a `BatchCounter` of either numeric kind against an in-process
//! store through a fault-injecting connection:
//! - Seeded random operations (bulk reads, replaces, deletes, pipelined arithmetic)
//! - Injected transport faults (refused requests, lost replies, short pipelines)
//! - Non-numeric values written behind the counter's back
//! - Invariant checking against the store after each operation

use super::batch::BatchCounter;
use super::error::CounterError;
use super::numeric::{Numeric, NumericKind};
use crate::simulator::{DeterministicRng, FaultConfig, FaultyConnection};
use crate::store::MemoryStore;

const HASH_KEY: &str = "counters";
const NOT_A_NUMBER: &str = "Gary";

/// Configuration for counter DST
#[derive(Debug, Clone)]
pub struct CounterDSTConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Number of identities behind the handle
    pub num_identities: usize,
    /// Fields of one hash instead of top-level keys
    pub hash_fields: bool,
    pub faults: FaultConfig,
    /// Probability of writing a non-numeric value before an operation
    pub corrupt_prob: f64,
    /// Amounts are drawn from `-max_amount..max_amount`, in quarters for
    /// float counters
    pub max_amount: i64,
}

impl Default for CounterDSTConfig {
    fn default() -> Self {
        CounterDSTConfig {
            seed: 0,
            num_identities: 4,
            hash_fields: false,
            faults: FaultConfig::default(),
            corrupt_prob: 0.05,
            max_amount: 1000,
        }
    }
}

impl CounterDSTConfig {
    pub fn new(seed: u64) -> Self {
        CounterDSTConfig {
            seed,
            ..Default::default()
        }
    }

    /// Same mix against fields of one hash
    pub fn hash_fields(seed: u64) -> Self {
        CounterDSTConfig {
            seed,
            hash_fields: true,
            ..Default::default()
        }
    }

    /// No transport faults: every error must come from a non-numeric value
    pub fn reliable(seed: u64) -> Self {
        CounterDSTConfig {
            seed,
            faults: FaultConfig::none(),
            ..Default::default()
        }
    }

    /// Frequent faults and corruption
    pub fn hostile(seed: u64) -> Self {
        CounterDSTConfig {
            seed,
            num_identities: 8,
            hash_fields: seed % 2 == 1,
            faults: FaultConfig {
                refuse_prob: 0.15,
                reply_lost_prob: 0.15,
                short_pipeline_prob: 0.1,
            },
            corrupt_prob: 0.2,
            max_amount: 50,
        }
    }
}

/// Operation type for logging
#[derive(Debug, Clone, PartialEq)]
pub enum CounterOp<N> {
    GetAll,
    ExistsAll,
    DeleteAll,
    SetAll(N),
    AddAll(N),
    SubAll(N),
    IncrementAll,
    DecrementAll,
    Corrupt { identity: String },
}

enum Outcome<N> {
    Values(Vec<N>),
    Flags(Vec<bool>),
    Done,
}

/// Result of a counter DST run
#[derive(Debug, Clone)]
pub struct CounterDSTResult {
    pub seed: u64,
    pub total_operations: u64,
    pub successes: u64,
    pub transport_errors: u64,
    pub value_errors: u64,
    pub corruptions: u64,
    pub invariant_violations: Vec<String>,
    pub last_op: Option<String>,
}

impl CounterDSTResult {
    pub fn new(seed: u64) -> Self {
        CounterDSTResult {
            seed,
            total_operations: 0,
            successes: 0,
            transport_errors: 0,
            value_errors: 0,
            corruptions: 0,
            invariant_violations: Vec::new(),
            last_op: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.invariant_violations.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Seed {}: {} ops (ok:{}, transport errors:{}, value errors:{}, corruptions:{}), {} violations",
            self.seed,
            self.total_operations,
            self.successes,
            self.transport_errors,
            self.value_errors,
            self.corruptions,
            self.invariant_violations.len()
        )
    }
}

/// DST harness for batch counters
pub struct CounterDSTHarness<N: Numeric> {
    config: CounterDSTConfig,
    rng: DeterministicRng,
    store: MemoryStore,
    counter: BatchCounter<N, FaultyConnection<MemoryStore>>,
    result: CounterDSTResult,
}

impl<N: Numeric> CounterDSTHarness<N> {
    pub fn new(config: CounterDSTConfig) -> Result<Self, CounterError> {
        let store = MemoryStore::new();
        // separate streams so fault timing does not shift the op sequence
        let conn = FaultyConnection::new(
            store.clone(),
            config.faults.clone(),
            config.seed.wrapping_mul(0x9E37_79B9_7F4A_7C15),
        );
        let identities: Vec<String> = (0..config.num_identities)
            .map(|i| format!("counter:{}", i))
            .collect();
        let counter = if config.hash_fields {
            BatchCounter::fields(conn, HASH_KEY, identities)?
        } else {
            BatchCounter::keys(conn, identities)?
        };

        Ok(CounterDSTHarness {
            rng: DeterministicRng::new(config.seed),
            result: CounterDSTResult::new(config.seed),
            config,
            store,
            counter,
        })
    }

    pub fn with_seed(seed: u64) -> Result<Self, CounterError> {
        Self::new(CounterDSTConfig::new(seed))
    }

    fn stored(&self, identity: &str) -> Option<String> {
        if self.config.hash_fields {
            self.store.get_field(HASH_KEY, identity)
        } else {
            self.store.get_string(identity)
        }
    }

    fn any_corrupt(&self) -> bool {
        self.counter
            .identities()
            .iter()
            .filter_map(|id| self.stored(id))
            .any(|text| N::parse(&text).is_none())
    }

    fn random_amount(&mut self) -> N {
        let n = self.rng.gen_i64(-self.config.max_amount, self.config.max_amount);
        match N::KIND {
            NumericKind::Int64 => N::from_integer(n),
            // quarters keep sums exact in binary
            NumericKind::Float64 => {
                N::parse(&(n as f64 / 4.0).to_string()).unwrap_or_else(|| N::from_integer(n))
            }
        }
    }

    fn random_op(&mut self) -> CounterOp<N> {
        if self.rng.gen_bool(self.config.corrupt_prob) {
            let identity = self
                .rng
                .choose(self.counter.identities())
                .cloned()
                .unwrap_or_default();
            return CounterOp::Corrupt { identity };
        }

        match self.rng.gen_range(0, 100) {
            0..=14 => CounterOp::GetAll,
            15..=24 => CounterOp::ExistsAll,
            25..=29 => CounterOp::DeleteAll,
            30..=44 => CounterOp::SetAll(self.random_amount()),
            45..=59 => CounterOp::AddAll(self.random_amount()),
            60..=69 => CounterOp::SubAll(self.random_amount()),
            70..=84 => CounterOp::IncrementAll,
            _ => CounterOp::DecrementAll,
        }
    }

    fn apply(&mut self, op: &CounterOp<N>) -> Result<Outcome<N>, CounterError> {
        match op {
            CounterOp::GetAll => self.counter.get_all().map(Outcome::Values),
            CounterOp::ExistsAll => self.counter.exists_all().map(Outcome::Flags),
            CounterOp::DeleteAll => self.counter.delete_all().map(|_| Outcome::Done),
            CounterOp::SetAll(n) => self.counter.set_all(*n).map(Outcome::Values),
            CounterOp::AddAll(n) => self.counter.add_all(*n).map(Outcome::Values),
            CounterOp::SubAll(n) => self.counter.sub_all(*n).map(Outcome::Values),
            CounterOp::IncrementAll => self.counter.increment_all().map(Outcome::Values),
            CounterOp::DecrementAll => self.counter.decrement_all().map(Outcome::Values),
            CounterOp::Corrupt { identity } => {
                if self.config.hash_fields {
                    self.store.set_field(HASH_KEY, identity, NOT_A_NUMBER);
                } else {
                    self.store.set_string(identity, NOT_A_NUMBER);
                }
                Ok(Outcome::Done)
            }
        }
    }

    fn run_single_op(&mut self) {
        let op = self.random_op();
        self.result.last_op = Some(format!("{:?}", op));

        let corrupt_before = self.any_corrupt();
        let faults_before = self.counter.connection().injected();
        let outcome = self.apply(&op);
        let faulted = self.counter.connection().injected() > faults_before;

        self.result.total_operations += 1;
        match &outcome {
            Ok(_) if matches!(op, CounterOp::Corrupt { .. }) => self.result.corruptions += 1,
            Ok(_) => self.result.successes += 1,
            Err(e) if e.is_transport() => self.result.transport_errors += 1,
            Err(_) => self.result.value_errors += 1,
        }

        if let Err(violation) = self.check_invariants(&op, &outcome, corrupt_before, faulted) {
            self.result.invariant_violations.push(format!(
                "Op #{}: {:?} - {}",
                self.result.total_operations, op, violation
            ));
        }
    }

    fn check_invariants(
        &self,
        op: &CounterOp<N>,
        outcome: &Result<Outcome<N>, CounterError>,
        corrupt_before: bool,
        faulted: bool,
    ) -> Result<(), String> {
        if matches!(op, CounterOp::Corrupt { .. }) {
            return Ok(());
        }
        let cache = self.counter.cache();

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                // Invariant 1: a failed operation leaves nothing cached
                if !cache.is_empty() {
                    return Err(format!("{} values cached after error: {}", cache.len(), e));
                }
                // Invariant 2: every error has a cause
                return match e {
                    CounterError::Transport(_) if faulted => Ok(()),
                    CounterError::NotANumber { .. } | CounterError::Store(_) if corrupt_before => {
                        Ok(())
                    }
                    other => Err(format!(
                        "unexplained error (faulted={}, corrupt={}): {}",
                        faulted, corrupt_before, other
                    )),
                };
            }
        };

        match (op, outcome) {
            (CounterOp::ExistsAll, Outcome::Flags(flags)) => {
                // Invariant 3: existence never fills the cache and agrees with the store
                if !cache.is_empty() {
                    return Err("exists_all filled the cache".to_string());
                }
                for (id, flag) in self.counter.identities().iter().zip(flags) {
                    if *flag != self.stored(id).is_some() {
                        return Err(format!("exists_all says {} for '{}'", flag, id));
                    }
                }
                Ok(())
            }
            (CounterOp::DeleteAll, Outcome::Done) => {
                if !cache.is_empty() {
                    return Err("delete_all filled the cache".to_string());
                }
                match self.counter.identities().iter().find(|id| self.stored(id).is_some()) {
                    Some(id) => Err(format!("'{}' survived delete_all", id)),
                    None => Ok(()),
                }
            }
            (_, Outcome::Values(values)) => {
                // Invariant 4: returned and cached values agree with the store
                if values.len() != self.counter.identities().len() {
                    return Err(format!("{} values for {} identities", values.len(), self.counter.identities().len()));
                }
                for (id, value) in self.counter.identities().iter().zip(values) {
                    let stored = self.stored(id);
                    let expected = match &stored {
                        Some(text) => N::parse(text)
                            .ok_or_else(|| format!("'{}' holds {:?} after success", id, text))?,
                        None => N::ZERO,
                    };
                    if *value != expected {
                        return Err(format!("'{}' returned {:?} but store holds {:?}", id, value, stored));
                    }
                    let cached = cache.get(id);
                    let expected_cached = stored.as_ref().map(|_| expected);
                    if cached != expected_cached {
                        return Err(format!("'{}' cached {:?}, expected {:?}", id, cached, expected_cached));
                    }
                }
                if let CounterOp::SetAll(n) = op {
                    if values.iter().any(|v| v != n) {
                        return Err(format!("set_all({:?}) returned {:?}", n, values));
                    }
                }
                Ok(())
            }
            _ => Err("outcome does not match operation".to_string()),
        }
    }

    pub fn run(&mut self, operations: usize) {
        for _ in 0..operations {
            self.run_single_op();
            if !self.result.invariant_violations.is_empty() {
                break;
            }
        }
    }

    pub fn result(&self) -> &CounterDSTResult {
        &self.result
    }

    pub fn counter(&self) -> &BatchCounter<N, FaultyConnection<MemoryStore>> {
        &self.counter
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

/// Run a batch of DST tests
pub fn run_counter_batch<N: Numeric>(
    start_seed: u64,
    num_seeds: usize,
    ops_per_seed: usize,
    config_fn: fn(u64) -> CounterDSTConfig,
) -> Vec<CounterDSTResult> {
    (0..num_seeds)
        .map(|i| {
            let seed = start_seed + i as u64;
            match CounterDSTHarness::<N>::new(config_fn(seed)) {
                Ok(mut harness) => {
                    harness.run(ops_per_seed);
                    harness.result().clone()
                }
                Err(e) => {
                    let mut result = CounterDSTResult::new(seed);
                    result.invariant_violations.push(format!("construction failed: {}", e));
                    result
                }
            }
        })
        .collect()
}

/// Summarize batch results
pub fn summarize_counter_batch(results: &[CounterDSTResult]) -> String {
    let total = results.len();
    let passed = results.iter().filter(|r| r.is_success()).count();
    let failed = total - passed;
    let total_ops: u64 = results.iter().map(|r| r.total_operations).sum();
    let transport_errors: u64 = results.iter().map(|r| r.transport_errors).sum();
    let value_errors: u64 = results.iter().map(|r| r.value_errors).sum();

    let mut summary = format!(
        "Counter DST Summary\n\
         ===================\n\
         Seeds: {} total, {} passed, {} failed\n\
         Total operations: {} ({} transport errors, {} value errors)\n",
        total, passed, failed, total_ops, transport_errors, value_errors
    );

    if failed > 0 {
        summary.push_str("\nFailed seeds:\n");
        for result in results.iter().filter(|r| !r.is_success()) {
            summary.push_str(&format!("  Seed {}: {}\n", result.seed, result.summary()));
            for violation in &result.invariant_violations {
                summary.push_str(&format!("    - {}\n", violation));
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_dst_single_seed() {
        let mut harness = CounterDSTHarness::<i64>::with_seed(12345).unwrap();
        harness.run(200);
        let result = harness.result();
        println!("{}", result.summary());
        assert!(result.is_success(), "Seed 12345 failed: {:?}", result.invariant_violations);
    }

    #[test]
    fn test_counter_dst_reliable_has_no_transport_errors() {
        let mut harness = CounterDSTHarness::<i64>::new(CounterDSTConfig::reliable(7)).unwrap();
        harness.run(300);
        let result = harness.result();
        assert!(result.is_success(), "{:?}", result.invariant_violations);
        assert_eq!(result.transport_errors, 0);
    }

    #[test]
    fn test_counter_dst_same_seed_same_run() {
        let a = run_counter_batch::<i64>(99, 1, 200, CounterDSTConfig::hostile);
        let b = run_counter_batch::<i64>(99, 1, 200, CounterDSTConfig::hostile);
        assert_eq!(a[0].summary(), b[0].summary());
    }

    #[test]
    fn test_counter_dst_10_seeds() {
        let results = run_counter_batch::<i64>(0, 10, 300, CounterDSTConfig::new);
        let summary = summarize_counter_batch(&results);
        println!("{}", summary);

        let passed = results.iter().filter(|r| r.is_success()).count();
        assert_eq!(passed, 10, "All 10 seeds should pass");
    }

    #[test]
    fn test_counter_dst_float_10_seeds() {
        let results = run_counter_batch::<f64>(0, 10, 300, CounterDSTConfig::hostile);
        let summary = summarize_counter_batch(&results);
        println!("{}", summary);

        let passed = results.iter().filter(|r| r.is_success()).count();
        assert_eq!(passed, 10, "All 10 float seeds should pass");
    }

    #[test]
    fn test_float_amounts_are_quarters() {
        let mut harness = CounterDSTHarness::<f64>::with_seed(3).unwrap();
        for _ in 0..100 {
            let amount = harness.random_amount();
            assert_eq!((amount * 4.0).fract(), 0.0, "{}", amount);
            assert!(amount.abs() <= 250.0);
        }
    }
}
