//! Order creation and lookup
//!
//! Creation persists the order first and then makes one inline placement
//! attempt. Placement is best effort here: whatever happens on the exchange,
//! the caller gets the stored order back and the sweep picks up anything left
//! unplaced.

use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::placement::{PlacementReconciler, PlacementReport};
use crate::domain::{CreateOrder, Order};
use crate::error::{QuikTradeError, Result};
use crate::persistence::OrderStore;

/// A created order together with the result of its inline placement attempt
#[derive(Debug)]
pub struct OrderCreation {
    pub order: Order,
    pub placement: Result<PlacementReport>,
}

pub struct OrderService {
    store: Arc<dyn OrderStore>,
    reconciler: Arc<PlacementReconciler>,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, reconciler: Arc<PlacementReconciler>) -> Self {
        Self { store, reconciler }
    }

    /// Create an order and attempt to place it once.
    ///
    /// Only validation and store failures fail the call. The returned order's
    /// `placed_at` tells whether placement succeeded.
    pub async fn create_order(&self, request: CreateOrder) -> Result<Order> {
        Ok(self.submit_order(request).await?.order)
    }

    /// Same as `create_order`, also returning the inline placement result.
    #[instrument(skip(self, request), fields(instrument = %request.instrument))]
    pub async fn submit_order(&self, request: CreateOrder) -> Result<OrderCreation> {
        request.validate()?;

        let order = Order::from_request(request);
        self.store.insert(&order).await?;
        info!(
            "Created order {} ({} {} {} x{})",
            order.id, order.order_type, order.side, order.instrument, order.quantity
        );

        let placement = self.reconciler.attempt_placement(&order).await;
        if let Err(e) = &placement {
            warn!(
                "Inline placement of order {} failed, leaving it for reconciliation: {}",
                order.id, e
            );
        }

        let order = self
            .store
            .find_by_id(order.id)
            .await?
            .ok_or(QuikTradeError::OrderNotFound(order.id))?;

        Ok(OrderCreation { order, placement })
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        self.store.find_by_id(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderSide, OrderType};
    use crate::exchange::PaperExchange;
    use crate::persistence::InMemoryOrderStore;
    use std::time::Duration;

    fn service(store: &InMemoryOrderStore) -> OrderService {
        let store: Arc<dyn OrderStore> = Arc::new(store.clone());
        let reconciler = Arc::new(PlacementReconciler::new(
            store.clone(),
            Arc::new(PaperExchange::new()),
            Duration::from_secs(1),
        ));
        OrderService::new(store, reconciler)
    }

    #[tokio::test]
    async fn invalid_request_is_never_stored() {
        let store = InMemoryOrderStore::new();
        let service = service(&store);

        let mut request = CreateOrder::market(OrderSide::Buy, "DOTUSDT00008", 75);
        request.order_type = OrderType::Limit;

        assert!(matches!(
            service.create_order(request).await,
            Err(QuikTradeError::Validation(_))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn get_order_returns_created_order() {
        let store = InMemoryOrderStore::new();
        let service = service(&store);

        let order = service
            .create_order(CreateOrder::market(OrderSide::Sell, "XRPUSDT00006", 500))
            .await
            .unwrap();

        assert_eq!(service.get_order(order.id).await.unwrap(), Some(order));
        assert_eq!(service.get_order(Uuid::new_v4()).await.unwrap(), None);
    }
}
