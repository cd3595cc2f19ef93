mod human;
mod json;

pub use self::{human::HumanReporter, json::JsonlReporter};

use std::time::Duration;

/// Latency in milliseconds, as reported.
fn ms(d: Duration) -> f64 {
    d.as_micros() as f64 / 1e3
}
