use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Order;
use crate::error::Result;

/// Durable record of orders keyed by id.
///
/// The store is the only owner of order state. Callers hold loaded copies for
/// the duration of one operation and re-read before acting again.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a newly created order.
    async fn insert(&self, order: &Order) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>>;

    /// Snapshot of every order without a placement timestamp, oldest first.
    async fn find_unplaced(&self) -> Result<Vec<Order>>;

    /// Overwrite the stored record with `order`.
    ///
    /// The write only applies while the stored row is still unplaced, so a
    /// placement timestamp can never be cleared or replaced. Returns `false`
    /// when nothing was written because the order had already been placed (or
    /// does not exist).
    async fn update(&self, order: &Order) -> Result<bool>;
}
