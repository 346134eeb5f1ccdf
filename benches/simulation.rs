//! Simulation benchmarks: full backtests and single decision passes.

use chrono::{Duration, NaiveDate};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use thbfolio::engine::{RebalanceParams, decide};
use thbfolio::portfolio::{Portfolio, WithdrawalSchedule};
use thbfolio::simulation::{Simulation, SimulationConfig};
use thbfolio::{PricePoint, Symbol, TargetAllocation};

const ASSETS: [&str; 5] = ["BTC", "ETH", "XRP", "ADA", "SAND"];

fn thb() -> Symbol {
    Symbol::new("THB")
}

fn targets() -> TargetAllocation {
    let mut weights = vec![(thb(), 0.5)];
    weights.extend(ASSETS.iter().map(|s| (Symbol::new(s), 0.1)));
    TargetAllocation::new(thb(), weights).unwrap()
}

/// Deterministic daily price series with xorshift noise of about ±4%.
fn generate_series(n_days: usize) -> Vec<PricePoint> {
    let start = NaiveDate::from_ymd_opt(2021, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut rng_state: u32 = 42;
    let mut prices: Vec<f64> = vec![1_500_000.0, 90_000.0, 18.0, 12.0, 15.0];

    (0..n_days)
        .map(|day| {
            let mut point = PricePoint::new(start + Duration::days(day as i64));
            for (name, price) in ASSETS.iter().zip(prices.iter_mut()) {
                rng_state ^= rng_state << 13;
                rng_state ^= rng_state >> 17;
                rng_state ^= rng_state << 5;
                let ret = (rng_state % 801) as f64 / 10_000.0 - 0.04;
                *price *= 1.0 + ret;
                point.set(Symbol::new(name), *price);
            }
            point
        })
        .collect()
}

fn config() -> SimulationConfig {
    SimulationConfig {
        targets: targets(),
        params: RebalanceParams::default(),
        seed_capital: 100_000.0,
        bank: "KBank".into(),
        withdrawal: WithdrawalSchedule::default(),
    }
}

/// Benchmark: full backtest over 1, 3 and 10 years of daily prices
fn bench_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation/run");

    for n_days in [365, 1_095, 3_650] {
        let series = generate_series(n_days);
        group.bench_with_input(BenchmarkId::from_parameter(n_days), &series, |b, series| {
            b.iter(|| {
                let sim = Simulation::new(config()).unwrap();
                black_box(sim.run(series).unwrap())
            });
        });
    }

    group.finish();
}

/// Benchmark: one decision pass over a drifted six-way portfolio
fn bench_decide(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation/decide");

    let series = generate_series(2);
    let mut balances = vec![(thb(), 20_000.0)];
    balances.extend(ASSETS.iter().map(|s| {
        let sym = Symbol::new(s);
        (sym, 10_000.0 / series[0].price(sym).unwrap())
    }));
    let portfolio = Portfolio::from_balances(thb(), balances);
    let targets = targets();
    let params = RebalanceParams::default();

    group.bench_function("drifted", |b| {
        b.iter(|| black_box(decide(&portfolio, &series[1], &targets, &params).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_backtest, bench_decide);
criterion_main!(benches);
