//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line (following nanobook's persistence pattern).

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Serialize;

use rebalance_core::market::{Asset, Direction};
use rebalance_core::order::Order;
use rebalance_core::planner::AbstractTransfer;
use rebalance_exchange::ExecutionResponse;

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

/// One row of persisted trade statistics, per the exchange adapter's
/// "Persisted state" contract.
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub user: String,
    pub mid_market_price: f64,
    pub average_exec_price: f64,
    pub volume: f64,
    pub pair: String,
    pub fee_in_base: f64,
    pub action: &'static str,
}

/// Convenience: log a run start event.
pub fn log_run_started(audit: &mut AuditLog, target_file: &str, account_id: &str) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "target_file": target_file,
            "account": account_id,
        }),
    )
}

/// Convenience: log balances fetched and their value-weighted portfolio
/// weights.
pub fn log_positions(
    audit: &mut AuditLog,
    balances: &FxHashMap<Asset, Decimal>,
    weights: &FxHashMap<Asset, Decimal>,
) -> Result<()> {
    let data: Vec<_> = balances
        .iter()
        .map(|(asset, qty)| {
            serde_json::json!({
                "asset": asset.as_str(),
                "balance": decimal_to_f64(*qty),
                "weight": weights.get(asset).copied().map(decimal_to_f64).unwrap_or(0.0),
            })
        })
        .collect();

    audit.log("positions_fetched", serde_json::json!({ "positions": data }))
}

/// Convenience: log a computed rebalance plan -- abstract transfers and the
/// concrete orders materialized from them.
pub fn log_plan(
    audit: &mut AuditLog,
    transfers: &[AbstractTransfer],
    orders: &[Order],
) -> Result<()> {
    let transfer_data: Vec<_> = transfers
        .iter()
        .map(|t| {
            serde_json::json!({
                "from": t.from_asset.as_str(),
                "to": t.to_asset.as_str(),
                "amount_in_base": decimal_to_f64(t.amount_in_base),
            })
        })
        .collect();

    let order_data: Vec<_> = orders
        .iter()
        .map(|o| {
            serde_json::json!({
                "pair": o.pair.canonical(),
                "direction": format!("{}", o.direction),
                "quantity": decimal_to_f64(o.quantity),
                "price": o.price.map(decimal_to_f64),
            })
        })
        .collect();

    audit.log(
        "plan_computed",
        serde_json::json!({ "transfers": transfer_data, "orders": order_data }),
    )
}

/// Convenience: log an order submission attempt.
pub fn log_order_submitted(audit: &mut AuditLog, order: &Order, attempt: usize) -> Result<()> {
    audit.log(
        "order_submitted",
        serde_json::json!({
            "pair": order.pair.canonical(),
            "direction": format!("{}", order.direction),
            "quantity": decimal_to_f64(order.quantity),
            "price": order.price.map(decimal_to_f64),
            "attempt": attempt,
        }),
    )
}

/// Convenience: log a filled (or partially filled) order as a `Statistics`
/// row.
pub fn log_order_filled(audit: &mut AuditLog, user: &str, resp: &ExecutionResponse) -> Result<()> {
    let fee_in_base: Decimal = resp
        .commissions
        .values()
        .copied()
        .fold(Decimal::ZERO, |acc, v| acc + v);
    let stats = Statistics {
        user: user.to_string(),
        mid_market_price: decimal_to_f64(resp.mid_market_price),
        average_exec_price: resp.mean_price.map(decimal_to_f64).unwrap_or(0.0),
        volume: decimal_to_f64(resp.executed_quantity),
        pair: resp.pair.canonical(),
        fee_in_base: decimal_to_f64(fee_in_base),
        action: match resp.side {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        },
    };
    audit.log("order_filled", serde_json::to_value(stats)?)
}

/// Convenience: log run completion.
pub fn log_run_completed(
    audit: &mut AuditLog,
    submitted: usize,
    filled: usize,
    skipped: usize,
) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "submitted": submitted,
            "filled": filled,
            "skipped": skipped,
        }),
    )
}

fn decimal_to_f64(d: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    d.to_f64().unwrap_or(0.0)
}
