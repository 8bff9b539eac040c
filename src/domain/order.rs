use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            other => Err(format!("invalid order side '{other}'; expected buy|sell")),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            other => Err(format!("invalid order type '{other}'; expected market|limit")),
        }
    }
}

/// Order creation request (what the client wants traded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
    pub instrument: String,
    #[serde(default)]
    pub limit_price: Option<Decimal>,
    pub quantity: u32,
}

impl CreateOrder {
    pub fn market(side: OrderSide, instrument: impl Into<String>, quantity: u32) -> Self {
        Self {
            order_type: OrderType::Market,
            side,
            instrument: instrument.into(),
            limit_price: None,
            quantity,
        }
    }

    pub fn limit(
        side: OrderSide,
        instrument: impl Into<String>,
        quantity: u32,
        limit_price: Decimal,
    ) -> Self {
        Self {
            order_type: OrderType::Limit,
            side,
            instrument: instrument.into(),
            limit_price: Some(limit_price),
            quantity,
        }
    }
}

/// The immutable trading intent of a stored order, as sent to the exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
    pub instrument: String,
    pub limit_price: Option<Decimal>,
    pub quantity: u32,
}

/// Order (tracked in our system)
///
/// `placed_at` is the only lifecycle field that matters for placement: `None`
/// means the exchange has not yet accepted the order, `Some` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
    pub instrument: String,
    pub limit_price: Option<Decimal>,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub placed_at: Option<DateTime<Utc>>,
    pub exchange_order_id: Option<String>,
}

impl Order {
    pub fn from_request(request: CreateOrder) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_type: request.order_type,
            side: request.side,
            instrument: request.instrument,
            limit_price: request.limit_price,
            quantity: request.quantity,
            created_at: now,
            updated_at: now,
            placed_at: None,
            exchange_order_id: None,
        }
    }

    pub fn is_placed(&self) -> bool {
        self.placed_at.is_some()
    }

    pub fn intent(&self) -> OrderIntent {
        OrderIntent {
            order_type: self.order_type,
            side: self.side,
            instrument: self.instrument.clone(),
            limit_price: self.limit_price,
            quantity: self.quantity,
        }
    }

    /// Copy of this order transitioned to the placed state.
    pub fn placed(&self, at: DateTime<Utc>, exchange_order_id: Option<String>) -> Self {
        Self {
            updated_at: at,
            placed_at: Some(at),
            exchange_order_id,
            ..self.clone()
        }
    }
}
