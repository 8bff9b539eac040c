//! Output formatting for `quiktrade` commands.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use serde::Serialize;
use tabled::{Table, Tabled};

use crate::domain::Order;
use crate::services::SweepReport;

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct OrderRow {
    pub id: String,
    #[tabled(rename = "type")]
    pub order_type: String,
    pub side: String,
    pub instrument: String,
    pub quantity: u32,
    pub limit_price: String,
    pub created_at: String,
    pub placed_at: String,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            order_type: order.order_type.to_string(),
            side: order.side.to_string(),
            instrument: order.instrument.clone(),
            quantity: order.quantity,
            limit_price: order
                .limit_price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            created_at: order.created_at.to_rfc3339(),
            placed_at: order
                .placed_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unplaced".to_string()),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct SweepRow {
    pub discovered: usize,
    pub placed: usize,
    pub rejected: usize,
    pub already_placed: usize,
    pub failed: usize,
}

impl From<&SweepReport> for SweepRow {
    fn from(report: &SweepReport) -> Self {
        Self {
            discovered: report.discovered,
            placed: report.placed,
            rejected: report.rejected,
            already_placed: report.already_placed,
            failed: report.failed.len(),
        }
    }
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                let table = Table::new(items).to_string();
                println!("{table}");
            }
        }
        OutputMode::Json => {
            let json = serde_json::to_string_pretty(items)?;
            println!("{json}");
        }
    }
    Ok(())
}

pub fn print_order(order: &Order, mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => print_items(&[OrderRow::from(order)], mode),
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(order)?);
            Ok(())
        }
    }
}

pub fn print_sweep_report(report: &SweepReport, mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if report.skipped {
                println!("Sweep skipped: another pass is still running");
                return Ok(());
            }
            print_items(&[SweepRow::from(report)], mode)?;
            for failure in &report.failed {
                println!("  failed {}: {}", failure.order_id, failure.error);
            }
            Ok(())
        }
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
            Ok(())
        }
    }
}
