//! In-memory order store
//!
//! Same semantics as the PostgreSQL store, backed by a `HashMap` behind a
//! tokio `RwLock`. Used by the test suite and by `--store memory` runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::OrderStore;
use crate::domain::Order;
use crate::error::{QuikTradeError, Result};

#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(QuikTradeError::Internal(format!(
                "order {} already exists",
                order.id
            )));
        }
        orders.insert(order.id, order.clone());
        debug!("Inserted order {}", order.id);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_unplaced(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut unplaced: Vec<Order> = orders
            .values()
            .filter(|o| o.placed_at.is_none())
            .cloned()
            .collect();
        unplaced.sort_by_key(|o| o.created_at);
        Ok(unplaced)
    }

    async fn update(&self, order: &Order) -> Result<bool> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order.id) {
            Some(stored) if stored.placed_at.is_none() => {
                *stored = order.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
