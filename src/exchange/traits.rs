use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Order, OrderSide, OrderType};

/// One order submission as the exchange sees it.
///
/// `client_order_id` is our order id. Exchanges that deduplicate on it turn a
/// repeated submission of the same order into a no-op instead of a second order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub client_order_id: Uuid,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
    pub instrument: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
}

impl From<&Order> for PlacementRequest {
    fn from(order: &Order) -> Self {
        let intent = order.intent();
        Self {
            client_order_id: order.id,
            order_type: intent.order_type,
            side: intent.side,
            instrument: intent.instrument,
            quantity: intent.quantity,
            limit_price: intent.limit_price,
        }
    }
}

/// Result of a single submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// The exchange accepted (or already held) the order.
    Placed { exchange_order_id: Option<String> },
    /// The exchange explicitly refused the order. Safe to retry later.
    Rejected { reason: String },
    /// The exchange could not be reached or answered outside its contract.
    TransportError { cause: String },
}

impl PlacementOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "placed",
            Self::Rejected { .. } => "rejected",
            Self::TransportError { .. } => "transport_error",
        }
    }
}

/// Submits orders to an external exchange.
///
/// Implementations have no notion of retries; each call is one attempt.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn is_dry_run(&self) -> bool;

    async fn submit(&self, request: &PlacementRequest) -> PlacementOutcome;
}
