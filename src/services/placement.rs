//! Placement reconciler
//!
//! Decides, for one order, whether it still needs to reach the exchange,
//! submits it, and records the outcome. Both the order creation path and the
//! reconciliation sweep go through `attempt_placement`.
//!
//! Outcome handling:
//! - accepted: `placed_at` is set with a single conditional store write
//! - rejected by the exchange: nothing is written, the order stays eligible
//! - transport failure or timeout: propagated to the caller

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::Order;
use crate::error::{QuikTradeError, Result};
use crate::exchange::{ExchangeGateway, PlacementOutcome, PlacementRequest};
use crate::persistence::OrderStore;

/// What a single placement attempt did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlacementReport {
    /// Exchange accepted the order and the placement was recorded
    Placed {
        placed_at: DateTime<Utc>,
        exchange_order_id: Option<String>,
    },
    /// Exchange refused the order; it remains eligible for a later sweep
    Rejected { reason: String },
    /// Order was already placed by another path; nothing was submitted or written
    AlreadyPlaced,
}

/// Holds a per-order lock registration and removes it from the map once the
/// last attempt on that order finishes or is dropped.
struct InFlightEntry<'a> {
    in_flight: &'a DashMap<Uuid, Arc<Mutex<()>>>,
    order_id: Uuid,
    lock: Option<Arc<Mutex<()>>>,
}

impl<'a> InFlightEntry<'a> {
    fn register(in_flight: &'a DashMap<Uuid, Arc<Mutex<()>>>, order_id: Uuid) -> Self {
        let lock = in_flight
            .entry(order_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self {
            in_flight,
            order_id,
            lock: Some(lock),
        }
    }
}

impl Drop for InFlightEntry<'_> {
    fn drop(&mut self) {
        self.lock.take();
        self.in_flight
            .remove_if(&self.order_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

pub struct PlacementReconciler {
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn ExchangeGateway>,
    timeout: Duration,
    /// Per-order locks serializing attempts on the same order within this process
    in_flight: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl PlacementReconciler {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn ExchangeGateway>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            timeout,
            in_flight: DashMap::new(),
        }
    }

    /// Number of orders with an attempt currently holding a lock
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Try to get `order` accepted by the exchange.
    ///
    /// The order is re-read under a per-order lock before submission, so a
    /// stale copy of an order that has since been placed is never resubmitted.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn attempt_placement(&self, order: &Order) -> Result<PlacementReport> {
        let entry = InFlightEntry::register(&self.in_flight, order.id);
        let Some(lock) = entry.lock.as_ref() else {
            return Err(QuikTradeError::Internal(format!(
                "placement lock for order {} missing",
                order.id
            )));
        };

        let _guard = lock.lock().await;
        self.attempt_locked(order.id).await
    }

    async fn attempt_locked(&self, order_id: Uuid) -> Result<PlacementReport> {
        let current = self
            .store
            .find_by_id(order_id)
            .await?
            .ok_or(QuikTradeError::OrderNotFound(order_id))?;

        if current.is_placed() {
            debug!("Order already placed at {:?}, skipping", current.placed_at);
            return Ok(PlacementReport::AlreadyPlaced);
        }

        let request = PlacementRequest::from(&current);
        let outcome = match tokio::time::timeout(self.timeout, self.gateway.submit(&request)).await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "Placement timed out after {}ms on {}",
                    self.timeout.as_millis(),
                    self.gateway.name()
                );
                return Err(QuikTradeError::PlacementTimeout {
                    order_id,
                    elapsed_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        match outcome {
            PlacementOutcome::Placed { exchange_order_id } => {
                self.record_placement(&current, exchange_order_id).await
            }
            PlacementOutcome::Rejected { reason } => {
                info!("Exchange rejected order: {}", reason);
                Ok(PlacementReport::Rejected { reason })
            }
            PlacementOutcome::TransportError { cause } => {
                warn!("Exchange transport failure: {}", cause);
                Err(QuikTradeError::Exchange { order_id, cause })
            }
        }
    }

    async fn record_placement(
        &self,
        order: &Order,
        exchange_order_id: Option<String>,
    ) -> Result<PlacementReport> {
        let placed_at = Utc::now();
        let placed = order.placed(placed_at, exchange_order_id.clone());

        match self.store.update(&placed).await {
            Ok(true) => {
                info!(
                    "Order placed (exchange_order_id={:?})",
                    placed.exchange_order_id
                );
                Ok(PlacementReport::Placed {
                    placed_at,
                    exchange_order_id,
                })
            }
            Ok(false) => {
                warn!("Order was placed concurrently by another writer; keeping the stored placement");
                Ok(PlacementReport::AlreadyPlaced)
            }
            Err(e) => {
                error!(
                    "Order accepted by exchange (exchange_order_id={:?}) but placement could not be recorded: {}",
                    placed.exchange_order_id, e
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreateOrder, OrderSide};
    use crate::exchange::PaperExchange;
    use crate::persistence::InMemoryOrderStore;
    use async_trait::async_trait;

    struct SlowExchange;

    #[async_trait]
    impl ExchangeGateway for SlowExchange {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn is_dry_run(&self) -> bool {
            true
        }

        async fn submit(&self, _request: &PlacementRequest) -> PlacementOutcome {
            tokio::time::sleep(Duration::from_secs(60)).await;
            PlacementOutcome::Placed {
                exchange_order_id: None,
            }
        }
    }

    async fn stored_order(store: &InMemoryOrderStore) -> Order {
        let order = Order::from_request(CreateOrder::market(OrderSide::Sell, "XRPUSDT00006", 500));
        store.insert(&order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn placed_order_is_recorded_and_lock_released() {
        let store = InMemoryOrderStore::new();
        let order = stored_order(&store).await;
        let reconciler = PlacementReconciler::new(
            Arc::new(store.clone()),
            Arc::new(PaperExchange::new()),
            Duration::from_secs(1),
        );

        let report = reconciler.attempt_placement(&order).await.unwrap();
        assert!(matches!(report, PlacementReport::Placed { .. }));
        assert!(store.find_by_id(order.id).await.unwrap().unwrap().is_placed());
        assert_eq!(reconciler.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_propagated() {
        let store = InMemoryOrderStore::new();
        let order = stored_order(&store).await;
        let reconciler = PlacementReconciler::new(
            Arc::new(store.clone()),
            Arc::new(SlowExchange),
            Duration::from_millis(250),
        );

        let err = reconciler.attempt_placement(&order).await.unwrap_err();
        assert!(matches!(
            err,
            QuikTradeError::PlacementTimeout { elapsed_ms: 250, .. }
        ));
        assert!(!store.find_by_id(order.id).await.unwrap().unwrap().is_placed());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_attempt_releases_lock() {
        let store = InMemoryOrderStore::new();
        let order = stored_order(&store).await;
        let reconciler = PlacementReconciler::new(
            Arc::new(store.clone()),
            Arc::new(SlowExchange),
            Duration::from_secs(120),
        );

        let cancelled =
            tokio::time::timeout(Duration::from_secs(1), reconciler.attempt_placement(&order))
                .await;
        assert!(cancelled.is_err());
        assert_eq!(reconciler.in_flight(), 0);
        assert!(!store.find_by_id(order.id).await.unwrap().unwrap().is_placed());
    }

    #[tokio::test]
    async fn missing_order_is_an_error() {
        let store = InMemoryOrderStore::new();
        let reconciler = PlacementReconciler::new(
            Arc::new(store),
            Arc::new(PaperExchange::new()),
            Duration::from_secs(1),
        );
        let ghost = Order::from_request(CreateOrder::market(OrderSide::Buy, "XRPUSDT00006", 1));

        assert!(matches!(
            reconciler.attempt_placement(&ghost).await,
            Err(QuikTradeError::OrderNotFound(id)) if id == ghost.id
        ));
    }
}
