//! Latency and throughput recording.
//!
//! Sample capture is allocation-free (fixed rings that overwrite the
//! oldest sample); percentile math happens off the hot path on a sorted
//! copy at report time.

pub mod clock;
pub mod collector;
pub mod histogram;
pub mod latency;

pub use clock::NanoClock;
pub use collector::Metrics;
pub use histogram::LogHistogram;
pub use latency::{LatencyStats, LatencyTracker};
