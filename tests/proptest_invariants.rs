//! Property-based tests for valuation, fee and rebalance invariants.
//!
//! These tests use proptest to verify that key invariants hold
//! across randomly generated portfolios and price paths.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use thbfolio::engine::{RebalanceParams, decide};
use thbfolio::portfolio::{FeeModel, Portfolio, WithdrawalSchedule, total_value};
use thbfolio::simulation::{Simulation, SimulationConfig};
use thbfolio::{Baseline, PricePoint, Symbol, TargetAllocation, Timestamp};

const ASSETS: [&str; 3] = ["BTC", "ETH", "XRP"];

fn thb() -> Symbol {
    Symbol::new("THB")
}

fn t0() -> Timestamp {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// A positive price between 0.01 and 5M THB
fn price_strategy() -> impl Strategy<Value = f64> {
    0.01f64..5_000_000.0
}

/// A non-negative asset quantity
fn quantity_strategy() -> impl Strategy<Value = f64> {
    0.0f64..1_000.0
}

/// Portfolio over THB + ASSETS with prices for every asset
fn book_strategy() -> impl Strategy<Value = (Portfolio, PricePoint)> {
    (
        0.0f64..10_000_000.0,
        prop::collection::vec((quantity_strategy(), price_strategy()), ASSETS.len()),
    )
        .prop_map(|(cash, legs)| {
            let mut balances = vec![(thb(), cash)];
            let mut prices = PricePoint::new(t0());
            for (name, (qty, price)) in ASSETS.iter().zip(legs) {
                let sym = Symbol::new(name);
                balances.push((sym, qty));
                prices.set(sym, price);
            }
            (Portfolio::from_balances(thb(), balances), prices)
        })
}

/// Target allocation over THB + ASSETS from raw positive weights
fn targets_strategy() -> impl Strategy<Value = TargetAllocation> {
    prop::collection::vec(0.05f64..1.0, ASSETS.len() + 1).prop_map(|raw| {
        let sum: f64 = raw.iter().sum();
        let mut weights = vec![(thb(), raw[0] / sum)];
        for (name, w) in ASSETS.iter().zip(&raw[1..]) {
            weights.push((Symbol::new(name), w / sum));
        }
        TargetAllocation::new(thb(), weights).unwrap()
    })
}

/// Price path: daily multiplicative moves between -30% and +30%
fn path_strategy() -> impl Strategy<Value = Vec<PricePoint>> {
    (
        prop::collection::vec(price_strategy(), ASSETS.len()),
        prop::collection::vec(prop::collection::vec(0.7f64..1.3, ASSETS.len()), 1..30),
    )
        .prop_map(|(start, moves)| {
            let mut current = start;
            let mut series = Vec::with_capacity(moves.len() + 1);
            for (i, step) in std::iter::once(vec![1.0; ASSETS.len()])
                .chain(moves)
                .enumerate()
            {
                let mut point = PricePoint::new(t0() + Duration::days(i as i64));
                for ((name, price), m) in ASSETS.iter().zip(current.iter_mut()).zip(step) {
                    *price *= m;
                    point.set(Symbol::new(name), *price);
                }
                series.push(point);
            }
            series
        })
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // ========================================================================
    // VALUATION
    // ========================================================================

    /// Total value is cash plus the sum of quantity × price
    #[test]
    fn total_value_is_cash_plus_positions((portfolio, prices) in book_strategy()) {
        let expected = portfolio.cash()
            + portfolio
                .holdings()
                .map(|(s, q)| q * prices.price(s).unwrap())
                .sum::<f64>();
        let actual = total_value(&portfolio, &prices);
        prop_assert!(close(actual, expected), "{actual} != {expected}");
    }

    /// Raising one held asset's price never lowers total value
    #[test]
    fn total_value_monotonic_in_price(
        (portfolio, prices) in book_strategy(),
        which in 0..ASSETS.len(),
        bump in 1.0f64..3.0,
    ) {
        let sym = Symbol::new(ASSETS[which]);
        let before = total_value(&portfolio, &prices);
        let raised = prices.clone().with(sym, prices.price(sym).unwrap() * bump);
        let after = total_value(&portfolio, &raised);
        prop_assert!(after >= before, "{after} < {before}");
    }

    // ========================================================================
    // FEES
    // ========================================================================

    /// Fee is the proportional fee rounded up to the next 0.01
    #[test]
    fn fee_rounds_up_by_less_than_a_satang(
        value in 0.0f64..10_000_000.0,
        rate in 0.0f64..0.01,
    ) {
        let fee = FeeModel::new(rate).trading_fee(value);
        let raw = value * rate;
        prop_assert!(fee >= raw - 1e-9, "fee {fee} below raw {raw}");
        prop_assert!(fee - raw < 0.01 + 1e-9, "fee {fee} rounds too far from {raw}");
    }

    // ========================================================================
    // DECISION ENGINE
    // ========================================================================

    /// Every asset inside the band means no trades at all
    #[test]
    fn inside_band_means_no_trades(
        total in 1_000.0f64..10_000_000.0,
        target in 0.1f64..0.9,
        drift in -0.045f64..0.045,
        price in price_strategy(),
    ) {
        let btc = Symbol::new("BTC");
        let targets = TargetAllocation::new(thb(), vec![(thb(), 1.0 - target), (btc, target)]).unwrap();
        let held = (target + drift) * total;
        let portfolio = Portfolio::from_balances(thb(), [(thb(), total - held), (btc, held / price)]);
        let prices = PricePoint::new(t0()).with(btc, price);

        let out = decide(&portfolio, &prices, &targets, &RebalanceParams::default()).unwrap();
        prop_assert!(out.trades.is_empty());
        prop_assert!(out.skips.is_empty());
    }

    /// Outside the band there is exactly one trade closing the value gap, or none below the minimum
    #[test]
    fn outside_band_closes_the_gap(
        total in 100.0f64..10_000_000.0,
        target in 0.2f64..0.8,
        drift in prop_oneof![-0.19f64..-0.06, 0.06f64..0.19],
        price in 1.0f64..5_000_000.0,
    ) {
        let btc = Symbol::new("BTC");
        let targets = TargetAllocation::new(thb(), vec![(thb(), 1.0 - target), (btc, target)]).unwrap();
        let held = (target + drift) * total;
        let portfolio = Portfolio::from_balances(thb(), [(thb(), total - held), (btc, held / price)]);
        let prices = PricePoint::new(t0()).with(btc, price);
        let params = RebalanceParams::default();

        let valuation = portfolio.valuation(&prices);
        let gap = (target * valuation.total - valuation.value(btc)).abs();
        let out = decide(&portfolio, &prices, &targets, &params).unwrap();

        if gap < params.min_trade_amount * (1.0 - 1e-9) {
            prop_assert!(out.trades.is_empty());
        } else if gap >= params.min_trade_amount * (1.0 + 1e-9) {
            prop_assert_eq!(out.trades.len(), 1);
            prop_assert!(close(out.trades[0].value, gap), "{} vs {gap}", out.trades[0].value);
        }
    }

    /// A full pass never leaves a negative balance
    #[test]
    fn pass_never_overdraws(
        (portfolio, prices) in book_strategy(),
        targets in targets_strategy(),
    ) {
        let mut working = portfolio.clone();
        let rebalancer = thbfolio::Rebalancer::new(targets, RebalanceParams::default()).unwrap();
        rebalancer
            .execute_pass(&mut working, &prices, &mut thbfolio::execution::SimulatedBackend)
            .unwrap();
        for (sym, qty) in working.balances() {
            prop_assert!(qty >= 0.0, "{sym} went negative: {qty}");
        }
    }

    // ========================================================================
    // SIMULATION
    // ========================================================================

    /// The baseline is exactly the bootstrap holdings revalued, every period
    #[test]
    fn baseline_is_pure_revaluation(
        targets in targets_strategy(),
        series in path_strategy(),
        seed in 1_000.0f64..1_000_000.0,
    ) {
        let mut sim = Simulation::new(SimulationConfig {
            targets,
            params: RebalanceParams::default(),
            seed_capital: seed,
            bank: "KBank".into(),
            withdrawal: WithdrawalSchedule::default(),
        }).unwrap();

        sim.bootstrap(&series[0]).unwrap();
        let frozen: Baseline = sim.baseline().unwrap().clone();
        for point in &series[1..] {
            sim.step(point).unwrap();
        }
        let report = sim.finish().unwrap();

        for (point, row) in series.iter().zip(&report.curve) {
            prop_assert_eq!(row.baseline.to_bits(), total_value(frozen.holdings(), point).to_bits());
        }
        for (_, qty) in report.final_portfolio.balances() {
            prop_assert!(qty >= 0.0);
        }
        prop_assert!(report.total_fees >= 0.0);
    }
}
