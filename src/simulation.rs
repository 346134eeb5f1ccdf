//! Backtest driver: replay the rebalance engine over a price history.
//!
//! A [`Simulation`] moves through four phases:
//!
//! | Phase | Entered by | Meaning |
//! |-------|-----------|---------|
//! | `Uninitialized` | [`Simulation::new`] | holding seed cash only |
//! | `Bootstrapped` | [`Simulation::bootstrap`] | seed allocated to target, baseline frozen |
//! | `Running` | [`Simulation::step`] | at least one rebalance period applied |
//! | `Complete` | [`Simulation::finish`] | report produced, no further input |
//!
//! Bootstrap buys straight to target (band and minimum ignored, fees
//! charged). The buy-and-hold baseline is a copy of the bootstrapped
//! portfolio, so both curves start from the same point and stay equal while
//! prices do not move.
//!
//! A period where no target asset is priced is recorded with zero trades and
//! both curve values carried over from the previous period.

use log::{debug, info, warn};

use crate::baseline::Baseline;
use crate::engine::{PassOutcome, RebalanceParams, Rebalancer, Skip, Trade};
use crate::error::{ConfigError, Error, Result};
use crate::execution::SimulatedBackend;
use crate::portfolio::{CurveStats, Portfolio, WithdrawalSchedule};
use crate::price::{PricePoint, validate_series};
use crate::summary::{RunSummary, SummaryInputs};
use crate::target::TargetAllocation;
use crate::types::Timestamp;

/// Lifecycle of a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Bootstrapped,
    Running,
    Complete,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Bootstrapped => "bootstrapped",
            Phase::Running => "running",
            Phase::Complete => "complete",
        }
    }
}

/// Everything a backtest needs besides the prices.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub targets: TargetAllocation,
    pub params: RebalanceParams,
    /// Cash the portfolio starts with, before bootstrap.
    pub seed_capital: f64,
    /// Bank used for the final withdrawal fee.
    pub bank: String,
    pub withdrawal: WithdrawalSchedule,
}

/// One row of the value curve.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CurvePoint {
    pub timestamp: Timestamp,
    pub rebalanced: f64,
    pub baseline: f64,
    /// Trades executed in this period.
    pub trades: usize,
    /// False when no target asset had a price and values were carried over.
    pub priced: bool,
}

/// Everything a finished backtest produced.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SimulationReport {
    pub curve: Vec<CurvePoint>,
    pub trades: Vec<Trade>,
    pub skips: Vec<Skip>,
    pub total_fees: f64,
    pub final_portfolio: Portfolio,
    pub summary: RunSummary,
    pub rebalanced_stats: Option<CurveStats>,
    pub baseline_stats: Option<CurveStats>,
}

impl SimulationReport {
    pub fn rebalanced_values(&self) -> Vec<f64> {
        self.curve.iter().map(|p| p.rebalanced).collect()
    }

    pub fn baseline_values(&self) -> Vec<f64> {
        self.curve.iter().map(|p| p.baseline).collect()
    }

    /// Trades executed at `timestamp`.
    pub fn trades_at(&self, timestamp: Timestamp) -> impl Iterator<Item = &Trade> + '_ {
        self.trades.iter().filter(move |t| t.timestamp == timestamp)
    }

    /// Write the report as pretty JSON.
    #[cfg(feature = "persistence")]
    pub fn save_json(&self, path: &std::path::Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// A single backtest run.
#[derive(Debug)]
pub struct Simulation {
    rebalancer: Rebalancer,
    seed_capital: f64,
    bank: String,
    withdrawal: WithdrawalSchedule,
    phase: Phase,
    portfolio: Portfolio,
    baseline: Option<Baseline>,
    curve: Vec<CurvePoint>,
    trades: Vec<Trade>,
    skips: Vec<Skip>,
    total_fees: f64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> std::result::Result<Self, ConfigError> {
        if !config.seed_capital.is_finite() || config.seed_capital <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "seed_capital",
                value: config.seed_capital,
            });
        }
        let cash = config.targets.cash();
        Ok(Self {
            rebalancer: Rebalancer::new(config.targets, config.params)?,
            seed_capital: config.seed_capital,
            bank: config.bank,
            withdrawal: config.withdrawal,
            phase: Phase::Uninitialized,
            portfolio: Portfolio::new(cash, config.seed_capital),
            baseline: None,
            curve: Vec::new(),
            trades: Vec::new(),
            skips: Vec::new(),
            total_fees: 0.0,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The working (rebalanced) portfolio.
    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub fn curve(&self) -> &[CurvePoint] {
        &self.curve
    }

    /// Validate `series`, then bootstrap on its first point and step through the rest.
    pub fn run(mut self, series: &[PricePoint]) -> Result<SimulationReport> {
        validate_series(series)?;
        let (first, rest) = series.split_first().ok_or(Error::EmptySeries)?;

        self.bootstrap(first)?;
        for point in rest {
            self.step(point)?;
        }
        info!(
            "backtest complete: {} periods, {} trades, {:.2} fees",
            self.curve.len(),
            self.trades.len(),
            self.total_fees
        );
        self.finish()
    }

    /// Allocate the seed capital at `point` and freeze the baseline.
    pub fn bootstrap(&mut self, point: &PricePoint) -> Result<()> {
        self.expect_phase(&[Phase::Uninitialized], "uninitialized")?;

        let outcome =
            self.rebalancer
                .bootstrap_pass(&mut self.portfolio, point, &mut SimulatedBackend)?;
        let baseline = Baseline::bootstrap(&self.portfolio);

        self.curve.push(CurvePoint {
            timestamp: point.timestamp,
            rebalanced: self.portfolio.total_value(point),
            baseline: baseline.value_at(point),
            trades: outcome.trades.len(),
            priced: true,
        });
        self.absorb(outcome);
        self.baseline = Some(baseline);
        self.phase = Phase::Bootstrapped;
        Ok(())
    }

    /// Run one rebalance period.
    pub fn step(&mut self, point: &PricePoint) -> Result<()> {
        self.expect_phase(&[Phase::Bootstrapped, Phase::Running], "bootstrapped or running")?;
        let Some(last) = self.curve.last().copied() else {
            return Err(self.phase_error("bootstrapped"));
        };
        if point.timestamp <= last.timestamp {
            return Err(Error::UnorderedSeries {
                index: self.curve.len(),
            });
        }
        let Some(baseline) = &self.baseline else {
            return Err(self.phase_error("bootstrapped"));
        };

        let targets = self.rebalancer.targets();
        if !point.any_priced(targets.assets().map(|(s, _)| s)) {
            warn!("{}: no target asset priced, carrying values forward", point.timestamp);
            self.curve.push(CurvePoint {
                timestamp: point.timestamp,
                priced: false,
                trades: 0,
                ..last
            });
            self.phase = Phase::Running;
            return Ok(());
        }

        let baseline_value = baseline.value_at(point);
        let outcome =
            self.rebalancer
                .execute_pass(&mut self.portfolio, point, &mut SimulatedBackend)?;
        let value = self.portfolio.total_value(point);
        debug!(
            "{}: value {value:.2}, baseline {baseline_value:.2}, {} trades",
            point.timestamp,
            outcome.trades.len()
        );

        self.curve.push(CurvePoint {
            timestamp: point.timestamp,
            rebalanced: value,
            baseline: baseline_value,
            trades: outcome.trades.len(),
            priced: true,
        });
        self.absorb(outcome);
        self.phase = Phase::Running;
        Ok(())
    }

    /// Close the run and compute the summary.
    pub fn finish(mut self) -> Result<SimulationReport> {
        self.expect_phase(&[Phase::Bootstrapped, Phase::Running], "bootstrapped or running")?;
        let Some(last) = self.curve.last().copied() else {
            return Err(self.phase_error("bootstrapped"));
        };
        self.phase = Phase::Complete;

        let summary = RunSummary::new(&SummaryInputs {
            initial_value: self.seed_capital,
            final_value: last.rebalanced,
            final_cash: self.portfolio.cash(),
            baseline_final: last.baseline,
            total_fees: self.total_fees,
            bank: &self.bank,
            schedule: &self.withdrawal,
        });

        let rebalanced: Vec<f64> = self.curve.iter().map(|p| p.rebalanced).collect();
        let baseline: Vec<f64> = self.curve.iter().map(|p| p.baseline).collect();

        Ok(SimulationReport {
            rebalanced_stats: CurveStats::from_values(&rebalanced),
            baseline_stats: CurveStats::from_values(&baseline),
            curve: self.curve,
            trades: self.trades,
            skips: self.skips,
            total_fees: self.total_fees,
            final_portfolio: self.portfolio,
            summary,
        })
    }

    fn absorb(&mut self, outcome: PassOutcome) {
        self.total_fees += outcome.total_fees();
        self.trades.extend(outcome.trades);
        self.skips.extend(outcome.skips);
    }

    fn expect_phase(&self, allowed: &[Phase], expected: &'static str) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(self.phase_error(expected))
        }
    }

    fn phase_error(&self, expected: &'static str) -> Error {
        Error::InvalidPhase {
            expected,
            actual: self.phase.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;
    use chrono::NaiveDate;

    fn thb() -> Symbol {
        Symbol::new("THB")
    }
    fn btc() -> Symbol {
        Symbol::new("BTC")
    }
    fn day(d: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }
    fn config() -> SimulationConfig {
        SimulationConfig {
            targets: TargetAllocation::new(thb(), vec![(thb(), 0.5), (btc(), 0.5)]).unwrap(),
            params: RebalanceParams::default(),
            seed_capital: 1_000.0,
            bank: "KBank".into(),
            withdrawal: WithdrawalSchedule::default(),
        }
    }

    #[test]
    fn phases_advance() {
        let mut sim = Simulation::new(config()).unwrap();
        assert_eq!(sim.phase(), Phase::Uninitialized);
        sim.bootstrap(&PricePoint::new(day(1)).with(btc(), 1_000_000.0))
            .unwrap();
        assert_eq!(sim.phase(), Phase::Bootstrapped);
        sim.step(&PricePoint::new(day(2)).with(btc(), 1_000_000.0))
            .unwrap();
        assert_eq!(sim.phase(), Phase::Running);
        let report = sim.finish().unwrap();
        assert_eq!(report.curve.len(), 2);
    }

    #[test]
    fn step_before_bootstrap_is_rejected() {
        let mut sim = Simulation::new(config()).unwrap();
        let err = sim
            .step(&PricePoint::new(day(1)).with(btc(), 1.0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPhase { actual: "uninitialized", .. }));
    }

    #[test]
    fn double_bootstrap_is_rejected() {
        let mut sim = Simulation::new(config()).unwrap();
        let p = PricePoint::new(day(1)).with(btc(), 1_000_000.0);
        sim.bootstrap(&p).unwrap();
        assert!(sim.bootstrap(&p).is_err());
    }

    #[test]
    fn out_of_order_step_is_rejected() {
        let mut sim = Simulation::new(config()).unwrap();
        sim.bootstrap(&PricePoint::new(day(5)).with(btc(), 1_000_000.0))
            .unwrap();
        let err = sim
            .step(&PricePoint::new(day(4)).with(btc(), 1_000_000.0))
            .unwrap_err();
        assert_eq!(err, Error::UnorderedSeries { index: 1 });
    }

    #[test]
    fn unpriced_first_point_is_fatal() {
        let sim = Simulation::new(config()).unwrap();
        let err = sim.run(&[PricePoint::new(day(1))]).unwrap_err();
        assert_eq!(err, Error::PriceUnavailable { timestamp: day(1) });
    }

    #[test]
    fn unpriced_period_carries_values() {
        let series = [
            PricePoint::new(day(1)).with(btc(), 1_000_000.0),
            PricePoint::new(day(2)).with(btc(), 1_200_000.0),
            PricePoint::new(day(3)),
            PricePoint::new(day(4)).with(btc(), 1_200_000.0),
        ];
        let report = Simulation::new(config()).unwrap().run(&series).unwrap();
        assert_eq!(report.curve.len(), 4);
        let gap = report.curve[2];
        assert!(!gap.priced);
        assert_eq!(gap.trades, 0);
        assert_eq!(gap.rebalanced, report.curve[1].rebalanced);
        assert_eq!(gap.baseline, report.curve[1].baseline);
    }

    #[test]
    fn rejects_bad_seed() {
        let cfg = SimulationConfig {
            seed_capital: 0.0,
            ..config()
        };
        assert!(matches!(
            Simulation::new(cfg),
            Err(ConfigError::InvalidParameter { name: "seed_capital", .. })
        ));
    }

    #[test]
    fn fees_include_bootstrap() {
        let series = [PricePoint::new(day(1)).with(btc(), 1_000_000.0)];
        let report = Simulation::new(config()).unwrap().run(&series).unwrap();
        assert_eq!(report.total_fees, 1.25);
        assert_eq!(report.summary.total_fees, 1.25);
        assert_eq!(report.trades.len(), 1);
    }
}
