//! Live rebalance workflow: fetch → plan → confirm → execute → record.
//!
//! This is the main workflow that ties together the exchange, the decision
//! engine and the audit/ledger sinks.

use std::time::Duration;

use chrono::Local;
use log::{error, info, warn};
use thbfolio::execution::{ExecutionBackend, Fill, OrderExecutionError, OrderRequest};
use thbfolio::portfolio::Portfolio;
use thbfolio::summary::SummaryInputs;
use thbfolio::{
    Baseline, PassOutcome, PricePoint, Rebalancer, RunSummary, Symbol, TargetAllocation, Timestamp,
};
use thbfolio_broker::{BrokerOrder, Exchange};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::display;
use crate::error::{Error, Result};
use crate::ledger::TradeLedger;

/// Options for a rebalance run.
pub struct RunOptions {
    pub dry_run: bool,
    pub force: bool,
    pub target_file: String,
}

/// What a live run did.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcome: PassOutcome,
    /// Post-trade profit against holding the pre-trade portfolio. `None` when
    /// no orders were sent.
    pub summary: Option<RunSummary>,
}

/// Sends engine orders to an exchange as market orders, pacing them.
pub struct LiveBackend<'a, E: Exchange + ?Sized> {
    exchange: &'a E,
    interval: Duration,
    total: usize,
    sent: usize,
}

impl<'a, E: Exchange + ?Sized> LiveBackend<'a, E> {
    /// `total` is only used for `[i/n]` progress lines.
    pub fn new(exchange: &'a E, interval: Duration, total: usize) -> Self {
        Self {
            exchange,
            interval,
            total,
            sent: 0,
        }
    }

    /// Orders submitted so far, failed ones included.
    pub fn sent(&self) -> usize {
        self.sent
    }
}

impl<E: Exchange + ?Sized> ExecutionBackend for LiveBackend<'_, E> {
    fn execute(&mut self, order: &OrderRequest) -> std::result::Result<Fill, OrderExecutionError> {
        if self.sent > 0 && !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
        self.sent += 1;

        print!(
            "[{}/{}] {} {} {} THB ... ",
            self.sent,
            self.total.max(self.sent),
            order.side,
            order.asset,
            display::format_number(order.value, 2),
        );

        let request = BrokerOrder {
            asset: order.asset,
            side: order.side,
            quantity: order.quantity,
            value: order.value,
        };
        match self.exchange.submit_order(&request) {
            Ok(receipt) if receipt.executed_quantity > 0.0 => {
                println!(
                    "FILLED {} @ {}",
                    display::format_number(receipt.executed_quantity, 8),
                    display::format_number(receipt.executed_price, 2)
                );
                Ok(Fill {
                    quantity: receipt.executed_quantity,
                    price: receipt.executed_price,
                    fee: receipt.fee,
                })
            }
            Ok(_) => {
                println!("NOTHING EXECUTED");
                Err(OrderExecutionError::new(order, "exchange executed nothing"))
            }
            Err(e) => {
                println!("ERROR: {e}");
                error!("Order execution failed for {}: {e}", order.asset);
                Err(OrderExecutionError::new(order, e.to_string()))
            }
        }
    }
}

/// Current wall-clock time in the exchange's local zone.
fn now() -> Timestamp {
    Local::now().naive_local()
}

/// Balances and prices for the cash leg and every target asset.
///
/// Assets the exchange has no price for are left out of the price point; the
/// engine skips them.
pub fn snapshot<E: Exchange + ?Sized>(
    exchange: &E,
    targets: &TargetAllocation,
    timestamp: Timestamp,
) -> Result<(Portfolio, PricePoint)> {
    let assets: Vec<Symbol> = targets.assets().map(|(s, _)| s).collect();
    let mut wanted = vec![targets.cash()];
    wanted.extend(&assets);

    let balances = exchange.balances(&wanted)?;
    let prices = exchange.prices(&assets)?;

    let mut portfolio = Portfolio::from_balances(targets.cash(), balances);
    for &asset in &assets {
        portfolio.track(asset);
    }
    let mut point = PricePoint::new(timestamp);
    for (asset, price) in prices {
        point.set(asset, price);
    }
    for &asset in &assets {
        if point.price(asset).is_none() {
            warn!("No usable price for {asset}");
        }
    }
    Ok((portfolio, point))
}

/// Refuse to trade while any exchange endpoint reports trouble.
pub fn ensure_exchange_up<E: Exchange + ?Sized>(exchange: &E) -> Result<()> {
    let status = exchange.status()?;
    let down: Vec<String> = status
        .iter()
        .filter(|s| !s.is_ok())
        .map(|s| format!("{}: {} {}", s.name, s.status, s.message).trim().to_string())
        .collect();
    if !down.is_empty() {
        return Err(Error::Exchange(thbfolio_broker::BrokerError::Other(format!(
            "exchange status not OK ({})",
            down.join("; ")
        ))));
    }
    Ok(())
}

/// Execute a full live rebalance run.
pub fn run<E: Exchange + ?Sized>(
    config: &Config,
    exchange: &E,
    targets: &TargetAllocation,
    opts: &RunOptions,
) -> Result<RunReport> {
    // 1. Audit trail
    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_run_started(&mut audit, &opts.target_file, opts.dry_run)?;

    // 2. Exchange health
    info!("Checking exchange status...");
    ensure_exchange_up(exchange)?;

    // 3. Balances and prices
    let rebalancer = Rebalancer::new(targets.clone(), config.params())?;
    let (mut portfolio, prices) = snapshot(exchange, targets, now())?;
    let valuation = portfolio.valuation(&prices);
    audit::log_balances(&mut audit, &valuation)?;

    let mut assets = targets.assets().map(|(s, _)| s).peekable();
    if assets.peek().is_some() && !prices.any_priced(assets) {
        audit.log(
            "prices_unavailable",
            serde_json::json!({ "assets": targets.assets().count() }),
        )?;
        return Err(Error::Core(thbfolio::Error::PriceUnavailable {
            timestamp: prices.timestamp,
        }));
    }

    println!("Portfolio at {}", prices.timestamp.format("%Y-%m-%d %H:%M:%S"));
    print!(
        "{}",
        display::portfolio_table(&valuation, targets, config.rebalance.threshold)
    );

    // 4. Plan
    let plan = rebalancer.plan(&portfolio, &prices);
    audit::log_plan(&mut audit, &plan)?;

    if plan.orders.is_empty() {
        for skip in &plan.skips {
            audit::log_order_failed(&mut audit, skip)?;
        }
        if plan.skips.is_empty() {
            println!("\nNo rebalancing needed: every asset is within the band.");
        } else {
            print!("\n{}", display::plan_table(&plan.orders, &plan.skips));
        }
        audit::log_run_completed(&mut audit, 0, 0, plan.skips.len(), 0.0, None)?;
        return Ok(RunReport {
            outcome: PassOutcome {
                trades: Vec::new(),
                skips: plan.skips,
            },
            summary: None,
        });
    }

    println!("\nREBALANCE ORDERS:");
    print!("{}", display::plan_table(&plan.orders, &plan.skips));

    // 5. Dry run stops here
    if opts.dry_run {
        println!("\n[DRY RUN] No orders submitted.");
        audit.log_simple("dry_run_finished")?;
        return Ok(RunReport::default());
    }

    // 6. Confirm execution
    if !opts.force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Execute?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;

        audit.log("user_confirmed", serde_json::json!({ "approved": confirmed }))?;
        if !confirmed {
            return Err(Error::Aborted("rebalance not confirmed".into()));
        }
    }

    // 7. Execute
    let baseline = Baseline::bootstrap(&portfolio);
    let mut backend = LiveBackend::new(exchange, config.order_interval(), plan.orders.len());
    let outcome = rebalancer.execute_pass(&mut portfolio, &prices, &mut backend)?;

    // 8. Record
    let mut ledger = TradeLedger::append(&config.trade_log_path())?;
    for trade in &outcome.trades {
        audit::log_order_filled(&mut audit, trade)?;
        ledger.record(trade)?;
    }
    for skip in &outcome.skips {
        audit::log_order_failed(&mut audit, skip)?;
    }

    // 9. Summary from the exchange's post-trade state
    let (after, after_prices) = snapshot(exchange, targets, now())?;
    let schedule = config.withdrawal_schedule();
    let summary = RunSummary::new(&SummaryInputs {
        initial_value: valuation.total,
        final_value: after.total_value(&after_prices),
        final_cash: after.cash(),
        baseline_final: baseline.value_at(&after_prices),
        total_fees: outcome.total_fees(),
        bank: &config.withdrawal.bank,
        schedule: &schedule,
    });
    audit::log_run_completed(
        &mut audit,
        backend.sent(),
        outcome.trades.len(),
        outcome.skips.len(),
        outcome.total_fees(),
        Some(&summary),
    )?;

    if !outcome.trades.is_empty() {
        println!("\nTransactions executed:");
        print!("{}", display::trades_table(&outcome.trades));
    }
    println!(
        "\n{} submitted, {} filled, {} skipped. Fees {} THB. Audit logged to {}",
        backend.sent(),
        outcome.trades.len(),
        outcome.skips.len(),
        display::format_number(outcome.total_fees(), 2),
        config.audit_path().display()
    );

    println!("\nPortfolio after rebalance:");
    print!(
        "{}",
        display::portfolio_table(
            &after.valuation(&after_prices),
            targets,
            config.rebalance.threshold
        )
    );
    println!("\n{summary}");

    Ok(RunReport {
        outcome,
        summary: Some(summary),
    })
}

/// Show current balances against targets.
pub fn show_balances<E: Exchange + ?Sized>(
    config: &Config,
    exchange: &E,
    targets: &TargetAllocation,
) -> Result<()> {
    let (portfolio, prices) = snapshot(exchange, targets, now())?;
    print!(
        "{}",
        display::portfolio_table(
            &portfolio.valuation(&prices),
            targets,
            config.rebalance.threshold
        )
    );
    Ok(())
}

/// Print exchange endpoint health.
pub fn check_status<E: Exchange + ?Sized>(exchange: &E) -> Result<()> {
    for s in exchange.status()? {
        let mark = if s.is_ok() { "OK" } else { "DOWN" };
        if s.message.is_empty() {
            println!("{:<24} {mark}", s.name);
        } else {
            println!("{:<24} {mark} ({})", s.name, s.message);
        }
    }
    ensure_exchange_up(exchange)
}
