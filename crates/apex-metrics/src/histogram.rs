//! Fixed log-bucket latency histogram.

use std::fmt::Write as _;

/// Bucket edges: <10ns, <100ns, <1µs, <10µs, <100µs, <1ms, ≥1ms.
pub const NUM_BUCKETS: usize = 7;

const LABELS: [&str; NUM_BUCKETS] = [
    "  0-10ns  ",
    " 10-100ns ",
    "100ns-1us ",
    "  1-10us  ",
    " 10-100us ",
    "100us-1ms ",
    "  >1ms    ",
];

/// Log-scale histogram with fixed buckets. Recording is branchy but
/// allocation-free; rendering happens at report time.
#[derive(Clone, Debug)]
pub struct LogHistogram {
    counts: [u64; NUM_BUCKETS],
    total: u64,
    min: u64,
    max: u64,
}

impl LogHistogram {
    pub fn new() -> Self {
        Self {
            counts: [0; NUM_BUCKETS],
            total: 0,
            min: 0,
            max: 0,
        }
    }

    #[inline(always)]
    pub fn record(&mut self, value_ns: u64) {
        let bucket = if value_ns < 10 {
            0
        } else if value_ns < 100 {
            1
        } else if value_ns < 1_000 {
            2
        } else if value_ns < 10_000 {
            3
        } else if value_ns < 100_000 {
            4
        } else if value_ns < 1_000_000 {
            5
        } else {
            6
        };

        self.counts[bucket] += 1;
        self.total += 1;
        if value_ns > self.max {
            self.max = value_ns;
        }
        if value_ns < self.min || self.total == 1 {
            self.min = value_ns;
        }
    }

    pub fn count(&self, bucket: usize) -> u64 {
        if bucket < NUM_BUCKETS {
            self.counts[bucket]
        } else {
            0
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn min_value(&self) -> u64 {
        self.min
    }

    pub fn max_value(&self) -> u64 {
        self.max
    }

    pub fn reset(&mut self) {
        self.counts = [0; NUM_BUCKETS];
        self.total = 0;
        self.min = 0;
        self.max = 0;
    }

    /// Render the distribution as labelled bar rows.
    pub fn render(&self, title: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== {} ===", title);
        let _ = writeln!(
            out,
            "Total samples: {}, Min: {}ns, Max: {}ns",
            self.total, self.min, self.max
        );

        for (i, label) in LABELS.iter().enumerate() {
            let pct = if self.total > 0 {
                100.0 * self.counts[i] as f64 / self.total as f64
            } else {
                0.0
            };
            let bar_len = (pct / 2.0) as usize;
            let _ = write!(out, "{} | {:>8} ({:>5.1}%) ", label, self.counts[i], pct);
            for _ in 0..bar_len {
                out.push('#');
            }
            out.push('\n');
        }

        out
    }
}

impl Default for LogHistogram {
    fn default() -> Self {
        Self::new()
    }
}
