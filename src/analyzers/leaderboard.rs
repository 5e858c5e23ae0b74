//! Insertion-ordered aggregate tables and revenue leaderboards.

use std::collections::HashMap;

use crate::analyzers::types::{ProductAggregate, StoreAggregate};

/// Anything that can be ranked on a leaderboard.
pub trait Ranked {
    fn revenue(&self) -> f64;
}

impl Ranked for StoreAggregate {
    fn revenue(&self) -> f64 {
        self.revenue
    }
}

impl Ranked for ProductAggregate {
    fn revenue(&self) -> f64 {
        self.revenue
    }
}

/// Keyed aggregates that remember the order keys were first seen in.
#[derive(Debug)]
pub struct AggregateTable<T> {
    index: HashMap<String, usize>,
    rows: Vec<T>,
}

impl<T> Default for AggregateTable<T> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            rows: Vec::new(),
        }
    }
}

impl<T> AggregateTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the row for `key`, creating it with `init` on first sight.
    pub fn get_or_insert_with(&mut self, key: &str, init: impl FnOnce() -> T) -> &mut T {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                let idx = self.rows.len();
                self.rows.push(init());
                self.index.insert(key.to_string(), idx);
                idx
            }
        };
        &mut self.rows[idx]
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        let idx = *self.index.get(key)?;
        self.rows.get_mut(idx)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }
}

impl<T: Ranked> AggregateTable<T> {
    pub fn top(self, n: usize) -> Vec<T> {
        top_by_revenue(self.rows, n)
    }
}

/// Stable sort by descending revenue, truncated to `n`.
///
/// Uses `f64::total_cmp`, so a NaN revenue gets a fixed rank instead of
/// breaking the comparator.
pub fn top_by_revenue<T: Ranked>(mut rows: Vec<T>, n: usize) -> Vec<T> {
    rows.sort_by(|a, b| b.revenue().total_cmp(&a.revenue()));
    rows.truncate(n);
    rows
}
