//! End-to-end pipeline test: synthetic feed → frame parse → dispatch →
//! strategy → risk gate → execution → reports → position ledger.
//!
//! Single-threaded on purpose: each stage is driven explicitly so the
//! assertions can interleave with the flow.

use apex_core::{
    ExecutionReport, OrderRequest, OrderStatus, Price, Qty, QuoteRecord, VenueId,
};
use apex_exec::{ExecutionEngine, VenueConfig};
use apex_feed::{FeedSimulator, MarketDataDispatch};
use apex_metrics::NanoClock;
use apex_risk::{RiskCheck, RiskGate, RiskLimits};
use apex_strategy::{AnyStrategy, MarketMaker, MarketMakerParams, Strategy};

use apex_core::InstrumentId;

fn build_engine(
    clock: &NanoClock,
) -> (
    ExecutionEngine,
    apex_ring::Producer<OrderRequest>,
    apex_ring::Consumer<ExecutionReport>,
) {
    let (order_tx, order_rx) = apex_ring::channel::<OrderRequest>(1024);
    let (report_tx, report_rx) = apex_ring::channel::<ExecutionReport>(1024);

    let mut engine = ExecutionEngine::new(order_rx, report_tx, clock.clone());
    engine.add_venue(VenueConfig {
        id: VenueId(1),
        name: "SIM-A".into(),
        latency_ns: 500,
        fill_probability: 1.0,
        enabled: true,
    });
    engine.seed_books(Price::from_f64(150.0), 10, Qty(1000));

    (engine, order_tx, report_rx)
}

#[test]
fn quotes_flow_to_fills_and_positions() {
    let clock = NanoClock::new();

    // Feed and dispatch into the market-data ring.
    let (md_tx, mut md_rx) = apex_ring::channel::<QuoteRecord>(4096);
    let mut feed = FeedSimulator::new();
    feed.add_instrument(InstrumentId(0), "AAPL", 150.0, 0.0005, 0.02, 100);
    let mut dispatch = MarketDataDispatch::new(md_tx, clock.clone());

    // One market maker, a permissive gate, one venue.
    let mut strategy = AnyStrategy::MarketMaker(MarketMaker::new(
        MarketMakerParams::default(),
        clock.clone(),
    ));
    let mut gate = RiskGate::new(RiskLimits::default(), clock.clone());
    let (mut engine, mut order_tx, mut report_rx) = build_engine(&clock);

    let mut enqueued = 0u64;
    let mut approved = 0u64;

    for _ in 0..500 {
        let frame = feed.next_frame().as_bytes().to_vec();
        assert!(dispatch.process_frame(&frame));

        let quote = md_rx.try_pop().expect("dispatch published a record");
        assert_eq!(quote.instrument, InstrumentId(0));
        assert!(quote.bid < quote.ask);

        strategy.on_quote(&quote);
        let market_price = quote.mid();

        let orders: Vec<OrderRequest> = strategy.generate().to_vec();
        for request in &orders {
            let verdict = gate.check_order(request, market_price);
            // A maker quoting around the live mid never trips the gate.
            assert_eq!(verdict, RiskCheck::Approved);
            approved += 1;
            assert!(order_tx.try_push(*request));
            enqueued += 1;
        }
    }
    assert!(approved > 0, "strategy never produced intents");

    // Run the execution side to completion over the queued intents.
    let running = std::sync::atomic::AtomicBool::new(false);
    engine.run(&running);
    assert_eq!(engine.orders_processed(), enqueued);

    // Every intent produced exactly one report; fills update both the
    // strategy and the ledger.
    let mut reports = 0u64;
    let mut fills = 0u64;
    while let Some(report) = report_rx.try_pop() {
        reports += 1;
        strategy.on_report(&report);

        if matches!(
            report.status,
            OrderStatus::Filled | OrderStatus::PartiallyFilled
        ) {
            fills += 1;
            gate.ledger_mut().on_fill(
                report.instrument,
                report.side,
                report.filled_quantity,
                report.price,
            );
            gate.ledger_mut()
                .update_mark_price(report.instrument, report.price);
        }
    }
    assert_eq!(reports, enqueued);
    assert!(fills > 0, "no maker order ever crossed the venue book");

    // Ledger position equals the net of the filled sides.
    let position = gate.ledger().position(InstrumentId(0));
    assert_ne!(fills, 0);
    // The maker's own inventory view and the ledger must agree.
    if let AnyStrategy::MarketMaker(mm) = &strategy {
        assert_eq!(mm.inventory(), position);
    }
}

#[test]
fn drawdown_feedback_arms_the_kill_switch_end_to_end() {
    let clock = NanoClock::new();
    let mut gate = RiskGate::new(RiskLimits::default(), clock.clone());

    // Simulate the core loop's P&L feedback going sour.
    gate.on_pnl_update(1_000.0);
    gate.on_pnl_update(975.0); // 2.5% > 2% limit

    assert!(gate.kill_switch_active());

    // Any later intent is refused without touching the venue side.
    let request = OrderRequest {
        id: apex_core::OrderId(1),
        instrument: InstrumentId(0),
        side: apex_core::Side::Buy,
        kind: apex_core::OrderKind::Limit,
        price: Price(15000),
        quantity: Qty(10),
        venue: VenueId(0),
        timestamp: 0,
    };
    assert_eq!(
        gate.check_order(&request, Price(15000)),
        RiskCheck::KillSwitchActive
    );
}

#[test]
fn execution_thread_processes_while_core_produces() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    let clock = NanoClock::new();
    let (engine, mut order_tx, mut report_rx) = build_engine(&clock);

    let running = Arc::new(AtomicBool::new(true));
    let handle = {
        let running = Arc::clone(&running);
        std::thread::spawn(move || {
            let mut engine = engine;
            engine.run(&running);
            engine
        })
    };

    // Produce aggressive orders from this thread.
    const N: u64 = 200;
    for i in 0..N {
        let request = OrderRequest {
            id: apex_core::OrderId(i + 1),
            instrument: InstrumentId(0),
            side: apex_core::Side::Buy,
            kind: apex_core::OrderKind::Ioc,
            price: Price(15001),
            quantity: Qty(1),
            venue: VenueId(0),
            timestamp: i,
        };
        while !order_tx.try_push(request) {
            std::hint::spin_loop();
        }
    }

    // Collect all reports, then stop the worker.
    let mut reports = 0u64;
    while reports < N {
        if report_rx.try_pop().is_some() {
            reports += 1;
        } else {
            std::hint::spin_loop();
        }
    }
    running.store(false, Ordering::Relaxed);
    let engine = handle.join().unwrap();

    assert_eq!(reports, N);
    assert_eq!(engine.orders_processed(), N);
}
