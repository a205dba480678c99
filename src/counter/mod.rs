//! Typed counters over store keys and hash fields.
//!
//! `Counter` owns one key or field, `BatchCounter` owns an ordered list of
//! keys or of fields of one hash. Both are generic over the numeric kind
//! (`i64` or `f64`) and the connection, and both remember the values they
//! last observed.

mod batch;
pub mod batch_dst;
mod cache;
mod decode;
mod error;
mod numeric;
mod single;
mod target;

pub use batch::{BatchCounter, Float64BatchCounter, Int64BatchCounter};
pub use cache::{LastObserved, ValueCache};
pub use decode::{decode, decode_ack, decode_array, decode_flag};
pub use error::CounterError;
pub use numeric::{DisplayValue, Numeric, NumericKind};
pub use single::{Counter, Float64Counter, Int64Counter};
pub use target::{BatchTarget, Target};
