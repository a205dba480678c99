//! Last observed values.
//!
//! Each identity is either `Unknown` or `Known(value)`. `reset` is the only
//! way back to `Unknown`; a successful decode is the only way to `Known`.

use super::numeric::{DisplayValue, Numeric};
use ahash::AHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LastObserved<N> {
    #[default]
    Unknown,
    Known(N),
}

impl<N: Copy> LastObserved<N> {
    pub fn value(&self) -> Option<N> {
        match self {
            LastObserved::Known(v) => Some(*v),
            LastObserved::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, LastObserved::Known(_))
    }
}

/// Identity name to last observed value, for a fixed set of identities.
///
/// The map always holds every identity it was built with; `len` counts the
/// ones currently `Known`. Display order is not the map's business: callers
/// pass their ordered identity list to `render`.
#[derive(Debug, Clone)]
pub struct ValueCache<N> {
    entries: AHashMap<String, LastObserved<N>>,
}

impl<N: Numeric> ValueCache<N> {
    pub fn new<'a, I>(identities: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let entries = identities
            .into_iter()
            .map(|id| (id.to_string(), LastObserved::Unknown))
            .collect();
        ValueCache { entries }
    }

    pub fn reset(&mut self) {
        for entry in self.entries.values_mut() {
            *entry = LastObserved::Unknown;
        }
    }

    pub fn set(&mut self, identity: &str, value: N) {
        match self.entries.get_mut(identity) {
            Some(entry) => *entry = LastObserved::Known(value),
            None => {
                self.entries
                    .insert(identity.to_string(), LastObserved::Known(value));
            }
        }
    }

    pub fn get(&self, identity: &str) -> Option<N> {
        self.entries.get(identity).and_then(LastObserved::value)
    }

    pub fn entry(&self, identity: &str) -> LastObserved<N> {
        self.entries.get(identity).copied().unwrap_or_default()
    }

    /// Number of identities holding a value.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| e.is_known()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of identities tracked, known or not.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// `"<identity> = <value>"` for each identity in `ordered`, joined by
    /// `", "`, with `NaN` for unknown values.
    pub fn render<S: AsRef<str>>(&self, ordered: &[S]) -> String {
        ordered
            .iter()
            .map(|id| {
                let id = id.as_ref();
                format!("{} = {}", id, DisplayValue(self.get(id)))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
