//! Deterministic fault injection for counter simulations.

mod faulty;
mod rng;

pub use faulty::{FaultConfig, FaultyConnection, TransportFault};
pub use rng::DeterministicRng;
