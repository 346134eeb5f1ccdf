//! Trading and withdrawal fee schedules.

/// Proportional trading fee, rounded up to the next satang (0.01).
///
/// ```
/// use thbfolio::portfolio::FeeModel;
///
/// let fees = FeeModel::new(0.0025);
/// assert_eq!(fees.trading_fee(500.0), 1.25);
/// assert_eq!(fees.trading_fee(100.0), 0.25);
/// assert_eq!(fees.trading_fee(50.01), 0.13);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeeModel {
    /// Fraction of notional charged per trade (0.0025 = 0.25%).
    pub rate: f64,
}

impl FeeModel {
    /// Bitkub spot taker rate.
    pub const DEFAULT_RATE: f64 = 0.0025;

    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// A zero-fee model.
    pub fn zero() -> Self {
        Self { rate: 0.0 }
    }

    /// `ceil(|value| × rate × 100) / 100`, never negative.
    pub fn trading_fee(&self, value: f64) -> f64 {
        let raw = value.abs() * self.rate.max(0.0);
        (raw * 100.0).ceil() / 100.0
    }
}

impl Default for FeeModel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RATE)
    }
}

/// Fee for moving `up_to` or less out to a bank.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WithdrawalBracket {
    pub up_to: f64,
    pub fee: f64,
}

/// Outcome of a withdrawal fee lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WithdrawalFee {
    Fee(f64),
    /// Amount exceeds every bracket; the exchange will not process it in one go.
    Undefined,
}

impl WithdrawalFee {
    /// Fee to charge; an undefined withdrawal is charged nothing.
    pub fn amount(self) -> f64 {
        match self {
            WithdrawalFee::Fee(fee) => fee,
            WithdrawalFee::Undefined => 0.0,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, WithdrawalFee::Fee(_))
    }
}

/// Cash-out fee table keyed by bank and amount.
///
/// Banks listed in `flat_banks` pay their flat fee for any amount. Every other
/// bank goes through `brackets`, checked in ascending `up_to` order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WithdrawalSchedule {
    pub flat_banks: Vec<(String, f64)>,
    pub brackets: Vec<WithdrawalBracket>,
}

impl WithdrawalSchedule {
    pub fn new(flat_banks: Vec<(String, f64)>, mut brackets: Vec<WithdrawalBracket>) -> Self {
        brackets.sort_by(|a, b| a.up_to.total_cmp(&b.up_to));
        Self {
            flat_banks,
            brackets,
        }
    }

    pub fn fee(&self, bank: &str, amount: f64) -> WithdrawalFee {
        if let Some((_, fee)) = self
            .flat_banks
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(bank))
        {
            return WithdrawalFee::Fee(*fee);
        }
        self.brackets
            .iter()
            .find(|b| amount <= b.up_to)
            .map_or(WithdrawalFee::Undefined, |b| WithdrawalFee::Fee(b.fee))
    }
}

impl Default for WithdrawalSchedule {
    fn default() -> Self {
        Self::new(
            vec![("KBank".to_string(), 20.0)],
            vec![
                WithdrawalBracket {
                    up_to: 100_000.0,
                    fee: 20.0,
                },
                WithdrawalBracket {
                    up_to: 500_000.0,
                    fee: 75.0,
                },
                WithdrawalBracket {
                    up_to: 2_000_000.0,
                    fee: 200.0,
                },
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_rounds_up_to_satang() {
        let fees = FeeModel::default();
        assert_eq!(fees.trading_fee(1_000.0), 2.5);
        assert_eq!(fees.trading_fee(40.0), 0.1);
        assert_eq!(fees.trading_fee(41.0), 0.11);
    }

    #[test]
    fn fee_at_least_proportional() {
        let fees = FeeModel::default();
        for value in [0.01, 1.0, 49.99, 123.456, 98_765.4321] {
            assert!(fees.trading_fee(value) >= value * fees.rate);
        }
    }

    #[test]
    fn zero_model_charges_nothing() {
        assert_eq!(FeeModel::zero().trading_fee(1_000_000.0), 0.0);
    }

    #[test]
    fn kbank_is_flat() {
        let s = WithdrawalSchedule::default();
        assert_eq!(s.fee("KBank", 10.0), WithdrawalFee::Fee(20.0));
        assert_eq!(s.fee("kbank", 5_000_000.0), WithdrawalFee::Fee(20.0));
    }

    #[test]
    fn other_banks_use_brackets() {
        let s = WithdrawalSchedule::default();
        assert_eq!(s.fee("SCB", 100_000.0), WithdrawalFee::Fee(20.0));
        assert_eq!(s.fee("SCB", 100_000.01), WithdrawalFee::Fee(75.0));
        assert_eq!(s.fee("SCB", 500_000.0), WithdrawalFee::Fee(75.0));
        assert_eq!(s.fee("SCB", 2_000_000.0), WithdrawalFee::Fee(200.0));
    }

    #[test]
    fn beyond_brackets_is_undefined() {
        let fee = WithdrawalSchedule::default().fee("BBL", 2_000_000.01);
        assert_eq!(fee, WithdrawalFee::Undefined);
        assert_eq!(fee.amount(), 0.0);
        assert!(!fee.is_defined());
    }

    #[test]
    fn brackets_are_sorted() {
        let s = WithdrawalSchedule::new(
            vec![],
            vec![
                WithdrawalBracket { up_to: 10.0, fee: 2.0 },
                WithdrawalBracket { up_to: 1.0, fee: 1.0 },
            ],
        );
        assert_eq!(s.fee("X", 0.5), WithdrawalFee::Fee(1.0));
    }
}
