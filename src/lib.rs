pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod persistence;
pub mod services;
pub mod validation;

pub use crate::config::AppConfig;
pub use domain::{CreateOrder, Order, OrderIntent, OrderSide, OrderType};
pub use error::{QuikTradeError, Result};
pub use exchange::{ExchangeGateway, PlacementOutcome, PlacementRequest};
pub use persistence::{InMemoryOrderStore, OrderStore};
pub use services::{
    OrderService, PlacementReconciler, PlacementReport, ReconciliationSweep, SweepReport,
    SweepScheduler,
};
