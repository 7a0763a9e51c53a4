//! Configuration surface.
//!
//! A flat JSON document; every key is optional and unknown keys are
//! ignored, so partial configs override just what they name.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// One simulated venue.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct VenueSettings {
    pub id: u8,
    pub name: String,
    pub latency_ns: u64,
    pub fill_probability: f64,
    pub enabled: bool,
}

impl Default for VenueSettings {
    fn default() -> Self {
        Self {
            id: 1,
            name: "SIM-A".into(),
            latency_ns: 500,
            fill_probability: 0.95,
            enabled: true,
        }
    }
}

/// Full system configuration with the documented defaults.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // Core assignments (even-numbered to stay off SMT siblings).
    pub market_data_core: usize,
    pub order_book_core: usize,
    pub strategy_core: usize,
    pub execution_core: usize,
    pub monitoring_core: usize,

    // Ring sizes (powers of two).
    pub market_data_queue_size: usize,
    pub order_queue_size: usize,
    pub execution_report_queue_size: usize,

    // Venues.
    pub venues: Vec<VenueSettings>,
    pub routing_strategy: String,

    // Risk limits.
    pub max_position_per_instrument: i64,
    pub max_total_position: i64,
    pub max_capital: f64,
    pub max_order_size: u64,
    pub max_orders_per_second: u32,
    pub max_price_deviation_pct: f64,
    pub max_drawdown_pct: f64,

    // Feed.
    pub feed_rate_msgs_per_sec: f64,
    pub num_instruments: u32,
    /// Starting mid in whole currency units.
    pub initial_price: f64,
    /// Per-tick relative volatility of the random walk.
    pub volatility: f64,

    // Strategy parameters.
    pub market_maker_spread_bps: f64,
    pub market_maker_max_inventory: i64,
    pub pairs_lookback_window: usize,
    pub pairs_entry_z: f64,
    pub pairs_exit_z: f64,
    pub momentum_fast_window: u32,
    pub momentum_slow_window: u32,
    pub momentum_breakout_bps: f64,

    // Runtime.
    pub simulation_duration_ms: u64,
    pub enable_logging: bool,
    /// Optional per-stage latency CSV written after the run.
    pub latency_csv_path: Option<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            market_data_core: 2,
            order_book_core: 4,
            strategy_core: 6,
            execution_core: 8,
            monitoring_core: 10,

            market_data_queue_size: 65536,
            order_queue_size: 65536,
            execution_report_queue_size: 65536,

            venues: vec![
                VenueSettings {
                    id: 1,
                    name: "SIM-A".into(),
                    latency_ns: 500,
                    fill_probability: 0.95,
                    enabled: true,
                },
                VenueSettings {
                    id: 2,
                    name: "SIM-B".into(),
                    latency_ns: 300,
                    fill_probability: 0.98,
                    enabled: true,
                },
                VenueSettings {
                    id: 3,
                    name: "SIM-C".into(),
                    latency_ns: 200,
                    fill_probability: 0.92,
                    enabled: false,
                },
                VenueSettings {
                    id: 4,
                    name: "SIM-D".into(),
                    latency_ns: 400,
                    fill_probability: 0.90,
                    enabled: false,
                },
            ],
            routing_strategy: "round_robin".into(),

            max_position_per_instrument: 10_000,
            max_total_position: 50_000,
            max_capital: 10_000_000.0,
            max_order_size: 1_000,
            max_orders_per_second: 10_000,
            max_price_deviation_pct: 5.0,
            max_drawdown_pct: 2.0,

            feed_rate_msgs_per_sec: 1_000_000.0,
            num_instruments: 2,
            initial_price: 150.0,
            volatility: 0.001,

            market_maker_spread_bps: 10.0,
            market_maker_max_inventory: 100,
            pairs_lookback_window: 100,
            pairs_entry_z: 2.0,
            pairs_exit_z: 0.5,
            momentum_fast_window: 10,
            momentum_slow_window: 30,
            momentum_breakout_bps: 5.0,

            simulation_duration_ms: 10_000,
            enable_logging: true,
            latency_csv_path: None,
        }
    }
}

impl SystemConfig {
    /// Load a JSON config, falling back to defaults for absent keys.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let body = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&body)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (name, size) in [
            ("market_data_queue_size", self.market_data_queue_size),
            ("order_queue_size", self.order_queue_size),
            ("execution_report_queue_size", self.execution_report_queue_size),
        ] {
            anyhow::ensure!(size.is_power_of_two(), "{name} must be a power of two, got {size}");
        }
        anyhow::ensure!(self.num_instruments >= 1, "num_instruments must be at least 1");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documentation() {
        let cfg = SystemConfig::default();
        assert_eq!(cfg.market_data_queue_size, 65536);
        assert_eq!(cfg.max_order_size, 1000);
        assert_eq!(cfg.max_price_deviation_pct, 5.0);
        assert_eq!(cfg.simulation_duration_ms, 10_000);
        assert_eq!(cfg.venues.len(), 4);
        assert_eq!(cfg.venues.iter().filter(|v| v.enabled).count(), 2);
    }

    #[test]
    fn partial_json_overrides_only_named_keys() {
        let cfg: SystemConfig =
            serde_json::from_str(r#"{"max_order_size": 50, "unknown_key": 1}"#).unwrap();
        assert_eq!(cfg.max_order_size, 50);
        // Everything else keeps its default.
        assert_eq!(cfg.max_total_position, 50_000);
    }

    #[test]
    fn load_rejects_bad_queue_size() {
        let dir = std::env::temp_dir().join("apex_sim_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad_config.json");
        std::fs::write(&path, r#"{"order_queue_size": 1000}"#).unwrap();

        assert!(SystemConfig::load(&path).is_err());
        std::fs::remove_file(path).ok();
    }
}
