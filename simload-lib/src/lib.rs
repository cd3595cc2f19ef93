//! Closed-loop workload engine for a modeled HBase-over-HDFS cluster.
//!
//! Client profiles describe workload classes. Each profile drives a fixed
//! number of closed-loop instances against a pluggable service endpoint,
//! and every client's completions are folded into windowed statistics.

#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

pub mod clock;
pub mod endpoint;
pub mod engine;
pub mod instance;
pub mod profile;
pub mod request;
pub mod scheduler;
pub mod stats;
pub mod utils;

#[cfg(test)]
mod test;
