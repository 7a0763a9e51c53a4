//! Trading-stack simulator entry point.
//!
//! Wires feed → dispatch → books → strategies → risk → execution →
//! reports across three long-running threads (core, execution, logger),
//! runs for the configured duration or until SIGINT/SIGTERM, then prints
//! the run summary.

mod config;
mod logger;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn, Level};

use apex_core::{
    ExecutionReport, InstrumentId, OrderBook, OrderId, OrderKind, OrderRequest, OrderStatus,
    Price, Qty, QuoteRecord, Side, TradeSet,
};
use apex_exec::{ExecutionEngine, RoutingStrategy, VenueConfig};
use apex_feed::{FeedSimulator, MarketDataDispatch};
use apex_metrics::{Metrics, NanoClock};
use apex_risk::{RiskCheck, RiskGate, RiskLimits};
use apex_strategy::{
    AnyStrategy, MarketMaker, MarketMakerParams, Momentum, MomentumParams, PairsTrading,
    PairsTradingParams, Strategy,
};

use config::SystemConfig;

const SYMBOLS: [&str; 5] = ["AAPL", "GOOG", "MSFT", "AMZN", "TSLA"];

/// Synthetic resting-order ids used to mirror feed BBOs into the books.
const SYNTHETIC_ID_BASE: u64 = 800_000_000;

#[derive(Parser)]
#[command(name = "apex-sim")]
#[command(about = "Ultra-low-latency trading stack simulator")]
#[command(version)]
struct Cli {
    /// Path to a JSON config file; defaults apply when omitted.
    config: Option<PathBuf>,
}

/// Per-instrument book refreshed from feed quotes by replacing two
/// synthetic BBO orders each tick.
struct InstrumentBook {
    book: OrderBook,
    bid_id: OrderId,
    ask_id: OrderId,
}

impl InstrumentBook {
    fn new(instrument: InstrumentId) -> Self {
        let base = SYNTHETIC_ID_BASE + instrument.0 as u64 * 2;
        Self {
            book: OrderBook::new(instrument),
            bid_id: OrderId(base),
            ask_id: OrderId(base + 1),
        }
    }

    /// Apply a quote to the book. Returns trades in the (unusual) case
    /// the incoming quote crossed the stale opposite side.
    fn apply_quote(&mut self, quote: &QuoteRecord) -> TradeSet {
        let mut trades = TradeSet::new();
        if quote.bid.0 <= 0 || quote.ask.0 <= 0 {
            return trades;
        }

        let bid_qty = Qty(quote.bid_qty.0.max(1));
        let ask_qty = Qty(quote.ask_qty.0.max(1));

        self.book.cancel(self.bid_id);
        self.book.cancel(self.ask_id);

        for trade in self.book.add(
            self.bid_id,
            Side::Buy,
            OrderKind::Limit,
            quote.bid,
            bid_qty,
            quote.timestamp,
        ) {
            let _ = trades.try_push(trade);
        }
        for trade in self.book.add(
            self.ask_id,
            Side::Sell,
            OrderKind::Limit,
            quote.ask,
            ask_qty,
            quote.timestamp,
        ) {
            let _ = trades.try_push(trade);
        }

        trades
    }
}

fn pin_to_core(core_id: usize) -> bool {
    core_affinity::set_for_current(core_affinity::CoreId { id: core_id })
}

fn build_strategies(cfg: &SystemConfig, clock: &NanoClock) -> Vec<AnyStrategy> {
    vec![
        AnyStrategy::MarketMaker(MarketMaker::new(
            MarketMakerParams {
                instrument: InstrumentId(0),
                base_spread_bps: cfg.market_maker_spread_bps,
                max_inventory: cfg.market_maker_max_inventory,
                ..Default::default()
            },
            clock.clone(),
        )),
        AnyStrategy::Pairs(PairsTrading::new(
            PairsTradingParams {
                instrument_a: InstrumentId(0),
                instrument_b: InstrumentId(1),
                lookback_window: cfg.pairs_lookback_window,
                entry_z_threshold: cfg.pairs_entry_z,
                exit_z_threshold: cfg.pairs_exit_z,
                ..Default::default()
            },
            clock.clone(),
        )),
        AnyStrategy::Momentum(Momentum::new(
            MomentumParams {
                instrument: InstrumentId(0),
                fast_window: cfg.momentum_fast_window,
                slow_window: cfg.momentum_slow_window,
                breakout_threshold_bps: cfg.momentum_breakout_bps,
                ..Default::default()
            },
            clock.clone(),
        )),
    ]
}

fn routing_strategy(name: &str) -> RoutingStrategy {
    match name {
        "lowest_latency" => RoutingStrategy::LowestLatency,
        "best_price" => RoutingStrategy::BestPrice,
        _ => RoutingStrategy::RoundRobin,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => {
            let cfg = SystemConfig::load(path)?;
            println!("Loaded config from: {}", path.display());
            cfg
        }
        None => {
            println!("Using default configuration");
            SystemConfig::default()
        }
    };

    if cfg.enable_logging {
        tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(false)
            .init();
    }

    // Cooperative shutdown: SIGINT/SIGTERM flip the flag, every loop
    // observes it with relaxed loads.
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::Relaxed))
            .context("installing signal handler")?;
    }

    let clock = NanoClock::new();

    // Inter-thread rings.
    let (md_tx, mut md_rx) = apex_ring::channel::<QuoteRecord>(cfg.market_data_queue_size);
    let (mut order_tx, order_rx) = apex_ring::channel::<OrderRequest>(cfg.order_queue_size);
    let (report_tx, mut report_rx) =
        apex_ring::channel::<ExecutionReport>(cfg.execution_report_queue_size);
    let (mut hot_log, mut log_drain) = logger::hot_logger(clock.clone());

    // Feed and dispatch.
    let mut feed = FeedSimulator::new();
    let instrument_count = (cfg.num_instruments as usize).min(SYMBOLS.len());
    for i in 0..instrument_count {
        feed.add_instrument(
            InstrumentId(i as u32),
            SYMBOLS[i],
            cfg.initial_price * (1.0 + i as f64 * 0.8),
            cfg.volatility * (1.0 + i as f64 * 0.2),
            (cfg.initial_price * 0.0002).max(0.01),
            if i == 0 { 100 } else { 50 },
        );
    }
    let mut dispatch = MarketDataDispatch::new(md_tx, clock.clone());

    // Books, strategies, risk.
    let mut books: Vec<InstrumentBook> = (0..instrument_count)
        .map(|i| InstrumentBook::new(InstrumentId(i as u32)))
        .collect();
    let mut strategies = build_strategies(&cfg, &clock);
    let mut gate = RiskGate::new(
        RiskLimits {
            max_position_per_instrument: cfg.max_position_per_instrument,
            max_total_position: cfg.max_total_position,
            max_capital: cfg.max_capital,
            max_order_size: cfg.max_order_size,
            max_orders_per_second: cfg.max_orders_per_second,
            max_price_deviation_pct: cfg.max_price_deviation_pct,
            max_drawdown_pct: cfg.max_drawdown_pct,
        },
        clock.clone(),
    );

    // Execution engine on its own thread.
    let mut exec = ExecutionEngine::new(order_rx, report_tx, clock.clone());
    for venue in cfg.venues.iter().filter(|v| v.enabled) {
        exec.add_venue(VenueConfig {
            id: apex_core::VenueId(venue.id),
            name: venue.name.clone(),
            latency_ns: venue.latency_ns,
            fill_probability: venue.fill_probability,
            enabled: venue.enabled,
        });
    }
    exec.set_rate_limit(cfg.max_orders_per_second);
    exec.set_routing_strategy(routing_strategy(&cfg.routing_strategy));
    exec.seed_books(Price::from_f64(cfg.initial_price), 10, Qty(1000));

    info!(
        instruments = instrument_count,
        venues = cfg.venues.iter().filter(|v| v.enabled).count(),
        duration_ms = cfg.simulation_duration_ms,
        feed_rate = cfg.feed_rate_msgs_per_sec,
        "starting simulation"
    );
    // Market data, books, and strategies all run on the core thread; their
    // configured cores are reported for operators reading the config.
    info!(
        market_data_core = cfg.market_data_core,
        order_book_core = cfg.order_book_core,
        strategy_core = cfg.strategy_core,
        execution_core = cfg.execution_core,
        monitoring_core = cfg.monitoring_core,
        "core assignments (core thread pinned to order_book_core)"
    );

    let exec_handle = {
        let running = Arc::clone(&running);
        let core = cfg.execution_core;
        thread::Builder::new()
            .name("execution".into())
            .spawn(move || {
                pin_to_core(core);
                let mut exec = exec;
                exec.run(&running);
                exec
            })
            .context("spawning execution thread")?
    };

    let log_handle = {
        let running = Arc::clone(&running);
        let core = cfg.monitoring_core;
        thread::Builder::new()
            .name("logger".into())
            .spawn(move || {
                pin_to_core(core);
                log_drain.run(&running);
            })
            .context("spawning logger thread")?
    };

    // The core thread runs feed, books, strategies, and risk.
    pin_to_core(cfg.order_book_core);

    let mut metrics = Metrics::new();
    let wall_start = Instant::now();
    let sim_start = clock.now_ns();
    let sim_duration_ns = cfg.simulation_duration_ms.saturating_mul(1_000_000);
    let mut iterations = 0u64;
    let mut kill_switch_logged = false;

    while running.load(Ordering::Relaxed) {
        let t0 = clock.now_ns();
        if t0.saturating_sub(sim_start) > sim_duration_ns {
            break;
        }

        // 1. Generate and ingest one feed frame.
        let frame = feed.next_frame();
        if !frame.is_empty() {
            dispatch.process_frame(frame.as_bytes());
        }
        let t1 = clock.now_ns();
        metrics.market_data.record(t1 - t0);
        metrics.record_quote();

        // 2. Drain one quote through books, strategies, and the gate.
        if let Some(quote) = md_rx.try_pop() {
            let t2 = clock.now_ns();
            let mut book_trades = TradeSet::new();
            let mut bbo: Option<(Price, Qty, Price, Qty)> = None;
            if let Some(state) = books.get_mut(quote.instrument.index()) {
                book_trades = state.apply_quote(&quote);
                bbo = Some((
                    state.book.best_bid(),
                    state.book.best_bid_qty(),
                    state.book.best_ask(),
                    state.book.best_ask_qty(),
                ));
                metrics.record_book_update();
            }
            let t3 = clock.now_ns();
            metrics.order_book.record(t3 - t2);

            // 3. Feed the strategies and collect their intents.
            let t4 = clock.now_ns();
            let market_price = quote.mid();

            for strategy in &mut strategies {
                strategy.on_quote(&quote);
                if let Some((bid, bid_qty, ask, ask_qty)) = bbo {
                    strategy.on_book_update(quote.instrument, bid, bid_qty, ask, ask_qty);
                }
                for trade in &book_trades {
                    strategy.on_trade(trade);
                }

                // 4/5. Risk-check each intent and enqueue the approved.
                let orders = strategy.generate();
                for request in orders {
                    let t5 = clock.now_ns();
                    let verdict = gate.check_order(request, market_price);
                    let t6 = clock.now_ns();
                    metrics.risk_check.record(t6 - t5);

                    if verdict == RiskCheck::Approved && order_tx.try_push(*request) {
                        metrics.record_order_enqueued();
                    }
                }
            }

            let t7 = clock.now_ns();
            metrics.strategy.record(t7 - t4);
            metrics.tick_to_trade.record(t7 - t0);
            metrics.tick_to_trade_hist.record(t7 - t0);
        }

        // 6. Drain execution reports back into strategies and the ledger.
        while let Some(report) = report_rx.try_pop() {
            let t8 = clock.now_ns();
            for strategy in &mut strategies {
                strategy.on_report(&report);
            }

            if matches!(
                report.status,
                OrderStatus::Filled | OrderStatus::PartiallyFilled
            ) {
                gate.ledger_mut().on_fill(
                    report.instrument,
                    report.side,
                    report.filled_quantity,
                    report.price,
                );
                metrics.record_fill();
            }
            if report.price.0 > 0 {
                gate.ledger_mut().update_mark_price(report.instrument, report.price);
            }

            let total_pnl = gate.ledger().total_pnl();
            gate.on_pnl_update(total_pnl);
            if gate.kill_switch_active() && !kill_switch_logged {
                hot_log.warn("kill switch armed by drawdown supervisor");
                kill_switch_logged = true;
            }
            metrics.execution.record(clock.now_ns() - t8);
        }

        iterations += 1;

        // Periodic strategy timer, off the per-quote path.
        if iterations & 0x3FF == 0 {
            let now = clock.now_ns();
            for strategy in &mut strategies {
                strategy.on_timer(now);
            }
        }
    }

    // Shutdown: flip the flag, join the workers (both drain best-effort).
    running.store(false, Ordering::Relaxed);
    let exec = exec_handle.join().expect("execution thread panicked");
    log_handle.join().expect("logger thread panicked");

    let elapsed = wall_start.elapsed().as_secs_f64();

    // Final report.
    println!();
    println!("=== Simulation Report ===");
    println!();
    print!("{}", metrics.render_summary(elapsed));

    println!("--- Positions ---");
    for i in 0..instrument_count {
        println!(
            "  {:<6} {:>10}",
            SYMBOLS[i],
            gate.ledger().position(InstrumentId(i as u32))
        );
    }
    println!("  Realized P&L:  ${:.2}", gate.ledger().realized_pnl());
    println!("  Total P&L:     ${:.2}", gate.ledger().total_pnl());
    println!();
    println!("  Iterations:      {}", iterations);
    println!(
        "  Risk checks:     {} (rejected: {})",
        gate.checks_performed(),
        gate.checks_rejected()
    );
    println!(
        "  Execution:       {} processed, {} throttled",
        exec.orders_processed(),
        exec.orders_throttled()
    );
    println!(
        "  Feed:            {} frames, {} dropped frames, {} dropped records",
        feed.frame_count(),
        dispatch.frames_dropped(),
        dispatch.records_dropped()
    );
    if hot_log.dropped() > 0 {
        println!("  Dropped {} log records", hot_log.dropped());
    }
    if gate.kill_switch_active() {
        println!("  WARNING: kill switch was activated during the run");
    }

    if let Some(path) = &cfg.latency_csv_path {
        metrics
            .dump_csv(std::path::Path::new(path))
            .with_context(|| format!("writing latency csv to {path}"))?;
        println!("  Latency CSV written to {path}");
    }

    if gate.kill_switch_active() {
        warn!("run ended with the kill switch armed");
    }
    info!("simulation complete");

    Ok(())
}
