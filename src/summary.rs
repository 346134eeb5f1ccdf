//! End-of-run profit, ROI and withdrawal accounting.

use std::fmt;

use log::warn;

use crate::portfolio::{WithdrawalFee, WithdrawalSchedule};

/// Raw figures a summary is built from.
#[derive(Clone, Debug)]
pub struct SummaryInputs<'a> {
    /// Value the run started from (seed capital, or the live pre-trade value).
    pub initial_value: f64,
    pub final_value: f64,
    /// Cash balance at the end; the withdrawal fee is looked up on this.
    pub final_cash: f64,
    pub baseline_final: f64,
    pub total_fees: f64,
    pub bank: &'a str,
    pub schedule: &'a WithdrawalSchedule,
}

/// Profit and return figures for one series.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Performance {
    pub initial_value: f64,
    pub final_value: f64,
    pub net_value: f64,
    pub profit: f64,
    pub roi_pct: f64,
}

impl Performance {
    fn new(initial_value: f64, final_value: f64, net_value: f64) -> Self {
        let profit = net_value - initial_value;
        let roi_pct = if initial_value > 0.0 {
            profit / initial_value * 100.0
        } else {
            0.0
        };
        Self {
            initial_value,
            final_value,
            net_value,
            profit,
            roi_pct,
        }
    }
}

/// Rebalanced vs buy-and-hold outcome of one run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
    pub rebalanced: Performance,
    pub baseline: Performance,
    pub total_fees: f64,
    pub withdrawal_fee: f64,
    /// False when the final cash exceeds every withdrawal bracket.
    pub withdrawable: bool,
}

impl RunSummary {
    /// The withdrawal fee is charged to the rebalanced series only.
    pub fn new(inputs: &SummaryInputs<'_>) -> Self {
        let withdrawal = inputs.schedule.fee(inputs.bank, inputs.final_cash);
        if withdrawal == WithdrawalFee::Undefined {
            warn!(
                "cannot withdraw {:.2} via {} in one transfer; withdrawal fee not charged",
                inputs.final_cash, inputs.bank
            );
        }
        let withdrawal_fee = withdrawal.amount();

        Self {
            rebalanced: Performance::new(
                inputs.initial_value,
                inputs.final_value,
                inputs.final_value - withdrawal_fee,
            ),
            baseline: Performance::new(
                inputs.initial_value,
                inputs.baseline_final,
                inputs.baseline_final,
            ),
            total_fees: inputs.total_fees,
            withdrawal_fee,
            withdrawable: withdrawal.is_defined(),
        }
    }

    /// Rebalanced net profit minus buy-and-hold profit.
    pub fn excess_profit(&self) -> f64 {
        self.rebalanced.profit - self.baseline.profit
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run Summary")?;
        writeln!(f, "  Initial value:      {:>16.2}", self.rebalanced.initial_value)?;
        writeln!(f, "  Final value:        {:>16.2}", self.rebalanced.final_value)?;
        writeln!(f, "  Trading fees:       {:>16.2}", self.total_fees)?;
        if self.withdrawable {
            writeln!(f, "  Withdrawal fee:     {:>16.2}", self.withdrawal_fee)?;
        } else {
            writeln!(f, "  Withdrawal fee:     {:>16}", "n/a (over limit)")?;
        }
        writeln!(f, "  Net value:          {:>16.2}", self.rebalanced.net_value)?;
        writeln!(
            f,
            "  Profit:             {:>16.2}  ({:+.2}%)",
            self.rebalanced.profit, self.rebalanced.roi_pct
        )?;
        writeln!(f, "Buy and Hold")?;
        writeln!(f, "  Final value:        {:>16.2}", self.baseline.final_value)?;
        writeln!(
            f,
            "  Profit:             {:>16.2}  ({:+.2}%)",
            self.baseline.profit, self.baseline.roi_pct
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(final_cash: f64, bank: &str, schedule: &WithdrawalSchedule) -> RunSummary {
        RunSummary::new(&SummaryInputs {
            initial_value: 10_000.0,
            final_value: 12_000.0,
            final_cash,
            baseline_final: 11_000.0,
            total_fees: 35.5,
            bank,
            schedule,
        })
    }

    #[test]
    fn profit_and_roi() {
        let schedule = WithdrawalSchedule::default();
        let s = inputs(6_000.0, "KBank", &schedule);
        assert_eq!(s.withdrawal_fee, 20.0);
        assert!(s.withdrawable);
        assert_eq!(s.rebalanced.net_value, 11_980.0);
        assert_eq!(s.rebalanced.profit, 1_980.0);
        assert!((s.rebalanced.roi_pct - 19.8).abs() < 1e-9);
        assert_eq!(s.baseline.profit, 1_000.0);
        assert!((s.baseline.roi_pct - 10.0).abs() < 1e-9);
        assert_eq!(s.excess_profit(), 980.0);
    }

    #[test]
    fn undefined_withdrawal_flags_and_charges_nothing() {
        let schedule = WithdrawalSchedule::default();
        let s = inputs(3_000_000.0, "SCB", &schedule);
        assert!(!s.withdrawable);
        assert_eq!(s.withdrawal_fee, 0.0);
        assert_eq!(s.rebalanced.net_value, 12_000.0);
        assert!(format!("{s}").contains("over limit"));
    }

    #[test]
    fn zero_initial_value_has_zero_roi() {
        let schedule = WithdrawalSchedule::default();
        let s = RunSummary::new(&SummaryInputs {
            initial_value: 0.0,
            final_value: 0.0,
            final_cash: 0.0,
            baseline_final: 0.0,
            total_fees: 0.0,
            bank: "KBank",
            schedule: &schedule,
        });
        assert_eq!(s.rebalanced.roi_pct, 0.0);
        assert_eq!(s.baseline.roi_pct, 0.0);
    }
}
