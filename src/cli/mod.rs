//! QuikTrade CLI
//!
//! Commands:
//! - `quiktrade migrate` - Apply database migrations
//! - `quiktrade create` - Create an order and attempt placement
//! - `quiktrade get` - Look up an order
//! - `quiktrade sweep` - Run one reconciliation pass
//! - `quiktrade run` - Run reconciliation passes on a schedule

pub mod output;
pub mod runtime;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{CreateOrder, OrderSide, OrderType};

/// Order placement service CLI
#[derive(Parser, Debug)]
#[command(name = "quiktrade")]
#[command(author, version, about = "Order intake with exchange placement reconciliation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration directory (default.toml, <QUIKTRADE_ENV>.toml)
    #[arg(long, default_value = "config", global = true)]
    pub config_dir: String,

    /// Order store backend
    #[arg(long, value_enum, default_value_t = StoreKind::Postgres, global = true)]
    pub store: StoreKind,

    /// Accept orders locally instead of sending them to the exchange
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Postgres,
    Memory,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply database migrations
    Migrate,

    /// Create an order and make one placement attempt
    Create {
        /// Order type (market|limit)
        #[arg(long = "type")]
        order_type: OrderType,
        /// Order side (buy|sell)
        #[arg(long)]
        side: OrderSide,
        /// 12-character instrument symbol
        #[arg(long)]
        instrument: String,
        #[arg(long)]
        quantity: u32,
        /// Required for limit orders, forbidden for market orders
        #[arg(long)]
        limit_price: Option<Decimal>,
    },

    /// Show a stored order
    Get {
        id: Uuid,
    },

    /// Retry placement of every unplaced order once
    Sweep,

    /// Run reconciliation sweeps until interrupted
    Run,
}

impl Commands {
    /// Build the creation request for `create`
    pub fn create_request(&self) -> Option<CreateOrder> {
        match self {
            Commands::Create {
                order_type,
                side,
                instrument,
                quantity,
                limit_price,
            } => Some(CreateOrder {
                order_type: *order_type,
                side: *side,
                instrument: instrument.clone(),
                limit_price: *limit_price,
                quantity: *quantity,
            }),
            _ => None,
        }
    }
}
