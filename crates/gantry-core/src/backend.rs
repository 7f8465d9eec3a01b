//! Utilities for scheduler-specific polling code.
//!
//! Backends talk to their schedulers themselves; what they share is the
//! shape of the answers: permission strings, blocks of `key = value` status
//! lines, and flaky remote queries that must not be hammered when the
//! backend is unavailable.

use std::collections::HashMap;

/// Numeric permission value for a string of permission letters.
///
/// Each letter *present* in `letters` contributes its bit (`r` → 4, `w` → 2,
/// `x` → 1); duplicates do not accumulate and unrecognized characters are
/// ignored, so `"rr"` and `"r"` both yield 4.
pub fn permission_bits(letters: &str) -> u32 {
    let mut bits = 0;
    for (letter, value) in [('r', 4), ('w', 2), ('x', 1)] {
        if letters.contains(letter) {
            bits += value;
        }
    }
    bits
}

/// Parse blank-line-separated blocks of `key = value` lines, as produced by
/// scheduler status dumps.
///
/// Every blank line emits the accumulated record, even an empty one. Lines
/// without a `=` separator are ignored. Note that a trailing record not
/// terminated by a blank line is **dropped**; this mirrors the long-standing
/// behaviour of the status-dump consumers and is deliberately left as is —
/// producers are expected to blank-line-terminate their output.
pub fn parse_record_blocks<I, S>(lines: I) -> Vec<HashMap<String, String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut records = Vec::new();
    let mut current = HashMap::new();
    for line in lines {
        let line = line.as_ref();
        if line.trim().is_empty() {
            records.push(std::mem::take(&mut current));
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            current.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    records
}

/// Memoizing wrapper for a single repeated remote query with bounded
/// retries.
///
/// The first result differing from the failure sentinel is cached forever;
/// until then, each sentinel result increments a failure counter and yields
/// the default value. Once the counter exceeds `max_failures` the wrapped
/// query is never invoked again and the default is returned permanently —
/// the only back-pressure this core applies against an unresponsive
/// backend.
///
/// Not thread-safe, on purpose: one logical caller owns one cache and calls
/// it from one thread, which `&mut self` already enforces. Callers rely on
/// exact retry-count semantics, so no hidden synchronisation is added.
pub struct QueryCache<T, F> {
    query: F,
    default_value: T,
    failure_sentinel: T,
    max_failures: u32,
    failures: u32,
    cached: Option<T>,
}

impl<T, F> QueryCache<T, F>
where
    T: Clone + PartialEq,
    F: FnMut() -> T,
{
    pub fn new(query: F, default_value: T, max_failures: u32, failure_sentinel: T) -> Self {
        Self {
            query,
            default_value,
            failure_sentinel,
            max_failures,
            failures: 0,
            cached: None,
        }
    }

    /// Return the cached result, or give the wrapped query another chance.
    pub fn call(&mut self) -> T {
        if let Some(cached) = &self.cached {
            return cached.clone();
        }
        if self.failures > self.max_failures {
            return self.default_value.clone();
        }
        let result = (self.query)();
        if result == self.failure_sentinel {
            self.failures += 1;
            self.default_value.clone()
        } else {
            self.cached = Some(result.clone());
            result
        }
    }
}
