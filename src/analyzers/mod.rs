//! Building blocks of the statistics roll-up.
//!
//! [`window`] resolves the day/week/month cutoffs, [`types`] holds the
//! counters the reducer fills, [`leaderboard`] keeps per-store and
//! per-product aggregates in first-seen order and ranks them, and
//! [`catalog`] derives the platform counters reported next to them.

pub mod catalog;
pub mod leaderboard;
pub mod types;
pub mod window;
