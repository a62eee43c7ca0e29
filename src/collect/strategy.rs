//! Ordered extraction strategies.
//!
//! A chain is evaluated front to back and stops at the first strategy that
//! yields something usable. The order is part of each adapter's contract, so
//! chains are built once and can be inspected with [`ExtractionChain::names`].

use std::fmt;

/// A named extraction step. Returning `None` means "nothing usable here".
pub struct Strategy<I: ?Sized, O> {
    pub name: &'static str,
    run: fn(&I) -> Option<O>,
}

impl<I: ?Sized, O> Strategy<I, O> {
    pub const fn new(name: &'static str, run: fn(&I) -> Option<O>) -> Self {
        Self { name, run }
    }
}

/// Value produced by a chain, tagged with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted<O> {
    pub strategy: &'static str,
    pub value: O,
}

pub struct ExtractionChain<I: ?Sized, O> {
    strategies: Vec<Strategy<I, O>>,
}

impl<I: ?Sized, O> ExtractionChain<I, O> {
    pub fn new(strategies: Vec<Strategy<I, O>>) -> Self {
        Self { strategies }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name).collect()
    }

    pub fn extract(&self, input: &I) -> Option<Extracted<O>> {
        self.strategies.iter().find_map(|s| {
            (s.run)(input).map(|value| Extracted {
                strategy: s.name,
                value,
            })
        })
    }
}

impl<I: ?Sized, O> fmt::Debug for ExtractionChain<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// `Some(s)` when `s` has non-whitespace content.
pub fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// `Some(v)` when the vector is not empty.
pub fn non_empty_vec<T>(v: Vec<T>) -> Option<Vec<T>> {
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}
