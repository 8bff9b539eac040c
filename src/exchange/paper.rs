//! Dry-run exchange that accepts every order without sending anything.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;
use uuid::Uuid;

use super::{ExchangeGateway, PlacementOutcome, PlacementRequest};

#[derive(Debug, Default)]
pub struct PaperExchange {
    submitted: AtomicU64,
}

impl PaperExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders accepted so far
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ExchangeGateway for PaperExchange {
    fn name(&self) -> &'static str {
        "paper"
    }

    fn is_dry_run(&self) -> bool {
        true
    }

    async fn submit(&self, request: &PlacementRequest) -> PlacementOutcome {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        info!(
            "[DRY RUN] Accepted {} {} {} x{} (client_order_id={})",
            request.order_type,
            request.side,
            request.instrument,
            request.quantity,
            request.client_order_id
        );
        PlacementOutcome::Placed {
            exchange_order_id: Some(format!("paper-{}", Uuid::new_v4())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreateOrder, Order, OrderSide};

    #[tokio::test]
    async fn paper_exchange_accepts_everything() {
        let exchange = PaperExchange::new();
        let order = Order::from_request(CreateOrder::market(OrderSide::Buy, "BTCUSDT00001", 1));

        let outcome = exchange.submit(&PlacementRequest::from(&order)).await;
        match outcome {
            PlacementOutcome::Placed { exchange_order_id } => {
                assert!(exchange_order_id.unwrap().starts_with("paper-"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(exchange.submitted(), 1);
        assert!(exchange.is_dry_run());
    }
}
