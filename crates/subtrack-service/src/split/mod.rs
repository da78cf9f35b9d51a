//! Per-member cost shares of shared subscriptions.

pub mod calculator;

pub use calculator::{MemberShare, SplitCalculator};
