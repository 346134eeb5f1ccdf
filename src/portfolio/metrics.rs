//! Value-curve statistics.

/// Summary statistics of a portfolio value curve.
///
/// Period returns are simple returns between consecutive curve points.
/// Volatility is the per-period sample standard deviation, not annualized,
/// since backtest rows need not be evenly spaced.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CurveStats {
    /// `last / first - 1`
    pub total_return: f64,
    /// Largest peak-to-trough fall, as a positive fraction.
    pub max_drawdown: f64,
    /// Sample standard deviation of period returns.
    pub volatility: f64,
    pub best_period: f64,
    pub worst_period: f64,
    pub up_periods: usize,
    pub down_periods: usize,
    pub num_periods: usize,
}

impl CurveStats {
    /// Compute statistics from a value curve.
    ///
    /// Returns `None` with fewer than two points or a non-positive start.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let (&first, &last) = (values.first()?, values.last()?);
        if values.len() < 2 || first <= 0.0 {
            return None;
        }

        let returns: Vec<f64> = values
            .windows(2)
            .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
            .collect();
        let n = returns.len();

        let mean = returns.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            returns.iter().map(|&r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        Some(Self {
            total_return: last / first - 1.0,
            max_drawdown: max_drawdown(values),
            volatility: variance.sqrt(),
            best_period: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst_period: returns.iter().copied().fold(f64::INFINITY, f64::min),
            up_periods: returns.iter().filter(|&&r| r > 0.0).count(),
            down_periods: returns.iter().filter(|&&r| r < 0.0).count(),
            num_periods: n,
        })
    }
}

impl std::fmt::Display for CurveStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  Total return:    {:>8.2}%", self.total_return * 100.0)?;
        writeln!(f, "  Max drawdown:    {:>8.2}%", self.max_drawdown * 100.0)?;
        writeln!(f, "  Volatility:      {:>8.2}%", self.volatility * 100.0)?;
        writeln!(
            f,
            "  Best/Worst:      {:>+7.2}% / {:>+7.2}%",
            self.best_period * 100.0,
            self.worst_period * 100.0
        )?;
        writeln!(
            f,
            "  Up/Down/Total:   {}/{}/{}",
            self.up_periods, self.down_periods, self.num_periods
        )
    }
}

fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &v in values {
        peak = peak.max(v);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - v) / peak);
        }
    }
    max_dd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_short() {
        assert!(CurveStats::from_values(&[]).is_none());
        assert!(CurveStats::from_values(&[100.0]).is_none());
        assert!(CurveStats::from_values(&[0.0, 10.0]).is_none());
    }

    #[test]
    fn drawdown_peak_to_trough() {
        // 100 -> 110 -> 88 -> 92.4
        let s = CurveStats::from_values(&[100.0, 110.0, 88.0, 92.4]).unwrap();
        assert!((s.max_drawdown - 0.2).abs() < 1e-12);
        assert!((s.total_return - (-0.076)).abs() < 1e-12);
        assert_eq!(s.up_periods, 2);
        assert_eq!(s.down_periods, 1);
        assert_eq!(s.num_periods, 3);
    }

    #[test]
    fn flat_curve() {
        let s = CurveStats::from_values(&[500.0; 4]).unwrap();
        assert_eq!(s.total_return, 0.0);
        assert_eq!(s.max_drawdown, 0.0);
        assert_eq!(s.volatility, 0.0);
        assert_eq!(s.up_periods + s.down_periods, 0);
    }

    #[test]
    fn display_format() {
        let s = CurveStats::from_values(&[100.0, 101.0, 99.0]).unwrap();
        let text = format!("{s}");
        assert!(text.contains("Total return:"));
        assert!(text.contains("Max drawdown:"));
    }
}
