//! Per-stage metrics aggregation and run reporting.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use crate::histogram::LogHistogram;
use crate::latency::{LatencyStats, LatencyTracker};

/// Pipeline stages with their own latency trackers.
const STAGE_NAMES: [&str; 6] = [
    "market_data",
    "order_book",
    "strategy",
    "risk_check",
    "execution",
    "tick_to_trade",
];

/// Aggregates latency trackers, throughput counters, and the
/// tick-to-trade histogram for the final run summary.
pub struct Metrics {
    pub market_data: LatencyTracker,
    pub order_book: LatencyTracker,
    pub strategy: LatencyTracker,
    pub risk_check: LatencyTracker,
    pub execution: LatencyTracker,
    pub tick_to_trade: LatencyTracker,

    pub tick_to_trade_hist: LogHistogram,

    quotes_in: u64,
    book_updates: u64,
    orders_enqueued: u64,
    fills: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            market_data: LatencyTracker::new(),
            order_book: LatencyTracker::new(),
            strategy: LatencyTracker::new(),
            risk_check: LatencyTracker::new(),
            execution: LatencyTracker::new(),
            tick_to_trade: LatencyTracker::new(),
            tick_to_trade_hist: LogHistogram::new(),
            quotes_in: 0,
            book_updates: 0,
            orders_enqueued: 0,
            fills: 0,
        }
    }

    #[inline(always)]
    pub fn record_quote(&mut self) {
        self.quotes_in += 1;
    }

    #[inline(always)]
    pub fn record_book_update(&mut self) {
        self.book_updates += 1;
    }

    #[inline(always)]
    pub fn record_order_enqueued(&mut self) {
        self.orders_enqueued += 1;
    }

    #[inline(always)]
    pub fn record_fill(&mut self) {
        self.fills += 1;
    }

    pub fn quotes_in(&self) -> u64 {
        self.quotes_in
    }

    pub fn book_updates(&self) -> u64 {
        self.book_updates
    }

    pub fn orders_enqueued(&self) -> u64 {
        self.orders_enqueued
    }

    pub fn fills(&self) -> u64 {
        self.fills
    }

    fn stages(&self) -> [&LatencyTracker; 6] {
        [
            &self.market_data,
            &self.order_book,
            &self.strategy,
            &self.risk_check,
            &self.execution,
            &self.tick_to_trade,
        ]
    }

    /// Render the full run summary: throughput, per-stage latency table,
    /// and the tick-to-trade histogram.
    pub fn render_summary(&self, elapsed_seconds: f64) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "--- Throughput ({:.2}s elapsed) ---", elapsed_seconds);
        if elapsed_seconds > 0.0 {
            let rate = |count: u64| count as f64 / elapsed_seconds;
            let _ = writeln!(out, "  Quotes in:      {:>10}  ({:.0}/sec)", self.quotes_in, rate(self.quotes_in));
            let _ = writeln!(out, "  Book updates:   {:>10}  ({:.0}/sec)", self.book_updates, rate(self.book_updates));
            let _ = writeln!(out, "  Orders sent:    {:>10}  ({:.0}/sec)", self.orders_enqueued, rate(self.orders_enqueued));
            let _ = writeln!(out, "  Fills:          {:>10}  ({:.0}/sec)", self.fills, rate(self.fills));
        }
        out.push('\n');

        let _ = writeln!(out, "--- Latency (nanoseconds) ---");
        let _ = writeln!(
            out,
            "{:<16} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "stage", "p50", "p90", "p95", "p99", "p99.9", "max"
        );

        for (name, tracker) in STAGE_NAMES.iter().zip(self.stages()) {
            if tracker.count() == 0 {
                let _ = writeln!(
                    out,
                    "{:<16} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
                    name, "-", "-", "-", "-", "-", "-"
                );
                continue;
            }
            let s = tracker.compute_stats();
            let _ = writeln!(
                out,
                "{:<16} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
                name, s.p50, s.p90, s.p95, s.p99, s.p999, s.max
            );
        }

        out.push('\n');
        out.push_str(&self.tick_to_trade_hist.render("Tick-to-Trade Histogram"));
        out
    }

    /// Dump per-stage stats as CSV rows.
    pub fn dump_csv(&self, path: &Path) -> io::Result<()> {
        let mut out = String::from("stage,p50,p90,p95,p99,p999,min,max,count\n");

        for (name, tracker) in STAGE_NAMES.iter().zip(self.stages()) {
            if tracker.count() == 0 {
                continue;
            }
            let s: LatencyStats = tracker.compute_stats();
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{},{}",
                name, s.p50, s.p90, s.p95, s.p99, s.p999, s.min, s.max, s.count
            );
        }

        fs::write(path, out)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut m = Metrics::new();
        m.record_quote();
        m.record_quote();
        m.record_book_update();
        m.record_order_enqueued();
        m.record_fill();

        assert_eq!(m.quotes_in(), 2);
        assert_eq!(m.book_updates(), 1);
        assert_eq!(m.orders_enqueued(), 1);
        assert_eq!(m.fills(), 1);
    }

    #[test]
    fn summary_renders_all_stages() {
        let mut m = Metrics::new();
        m.record_quote();
        m.risk_check.record(80);
        m.tick_to_trade.record(1500);
        m.tick_to_trade_hist.record(1500);

        let text = m.render_summary(1.0);
        assert!(text.contains("risk_check"));
        assert!(text.contains("tick_to_trade"));
        assert!(text.contains("Tick-to-Trade Histogram"));
    }

    #[test]
    fn csv_dump_skips_empty_stages() {
        let mut m = Metrics::new();
        m.execution.record(500);

        let dir = std::env::temp_dir().join("apex_metrics_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("latency.csv");
        m.dump_csv(&path).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("stage,"));
        assert!(body.contains("execution,"));
        assert!(!body.contains("market_data,"));
        std::fs::remove_file(path).ok();
    }
}
