//! Console tables for portfolios, plans, trades and liquidity scans.
//!
//! Everything renders to a `String` so callers decide where it goes.

use std::fmt::Write;

use thbfolio::execution::OrderRequest;
use thbfolio::portfolio::Valuation;
use thbfolio::{Skip, TargetAllocation, Trade};

use crate::liquidity::LiquidityRow;

/// Fixed decimals with `,` thousands separators: `1234567.891 → "1,234,567.89"`.
pub fn format_number(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let mut grouped = String::with_capacity(raw.len() + raw.len() / 3 + 1);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    let is_zero = raw.bytes().all(|b| b == b'0' || b == b'.');
    if value < 0.0 && !is_zero {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn percent(weight: f64) -> String {
    format!("{:.2}%", weight * 100.0)
}

/// Holdings against targets. Allocations outside the band are marked `*`.
pub fn portfolio_table(valuation: &Valuation, targets: &TargetAllocation, threshold: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:>18} {:>16} {:>16} {:>11} {:>8}",
        "Asset", "Amount", "Price (THB)", "Value (THB)", "Allocation", "Target"
    );

    for &(symbol, target) in targets.entries() {
        let (amount, price, value, weight) = if symbol == targets.cash() {
            (valuation.cash, Some(1.0), valuation.cash, valuation.cash_weight)
        } else {
            match valuation.asset(symbol) {
                Some(a) => (a.quantity, a.price, a.value, a.weight),
                None => (0.0, None, 0.0, 0.0),
            }
        };
        let flag = if (weight - target).abs() > threshold { "*" } else { " " };
        let _ = writeln!(
            out,
            "{:<8} {:>18} {:>16} {:>16} {:>10}{flag} {:>8}",
            symbol,
            format_number(amount, 6),
            price.map_or_else(|| "n/a".to_string(), |p| format_number(p, 2)),
            format_number(value, 2),
            percent(weight),
            percent(target),
        );
    }

    let _ = writeln!(out, "Total value: {} THB", format_number(valuation.total, 2));
    out
}

/// Orders a pass is about to send.
pub fn plan_table(orders: &[OrderRequest], skips: &[Skip]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<5} {:<8} {:>18} {:>16} {:>10}",
        "#", "Side", "Asset", "Quantity", "Value (THB)", "Est. fee"
    );
    for (i, order) in orders.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:<5} {:<8} {:>18} {:>16} {:>10}",
            i + 1,
            order.side,
            order.asset,
            format_number(order.quantity, 8),
            format_number(order.value, 2),
            format_number(order.fee, 2),
        );
    }
    for skip in skips {
        let _ = writeln!(out, "  skip {:<8} {}", skip.asset, skip.reason);
    }
    out
}

/// Executed trades.
pub fn trades_table(trades: &[Trade]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<19}  {:<5} {:<8} {:>18} {:>16} {:>10} {:>16}",
        "Time", "Side", "Asset", "Amount", "Value (THB)", "Fee (THB)", "Portfolio"
    );
    for t in trades {
        let _ = writeln!(
            out,
            "{:<19}  {:<5} {:<8} {:>18} {:>16} {:>10} {:>16}",
            t.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            t.side,
            t.asset,
            format_number(t.quantity, 6),
            format_number(t.value, 2),
            format_number(t.fee, 4),
            format_number(t.portfolio_value, 2),
        );
    }
    out
}

/// Ranked liquidity rows.
pub fn liquidity_table(title: &str, rows: &[&LiquidityRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    let _ = writeln!(
        out,
        "{:<8} {:>18} {:>20} {:>14} {:>10}",
        "Coin", "Last (THB)", "Volume (24h)", "Spread (THB)", "Spread %"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<8} {:>18} {:>20} {:>14.4} {:>9.4}%",
            row.asset,
            format_number(row.last, 2),
            format_number(row.volume, 2),
            row.spread,
            row.spread_pct,
        );
    }
    out
}
