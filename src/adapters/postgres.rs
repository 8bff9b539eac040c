use crate::domain::{Order, OrderSide, OrderType};
use crate::error::{QuikTradeError, Result};
use crate::persistence::OrderStore;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const ORDER_COLUMNS: &str = r#"
    id, type, side, instrument, limit_price, quantity,
    created_at, updated_at, order_placed_at, exchange_order_id
"#;

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let order_type: String = row.try_get("type")?;
        let side: String = row.try_get("side")?;
        let quantity: i32 = row.try_get("quantity")?;

        Ok(Order {
            id: row.try_get("id")?,
            order_type: order_type
                .parse::<OrderType>()
                .map_err(QuikTradeError::Internal)?,
            side: side.parse::<OrderSide>().map_err(QuikTradeError::Internal)?,
            instrument: row.try_get("instrument")?,
            limit_price: row.try_get("limit_price")?,
            quantity: u32::try_from(quantity).map_err(|_| {
                QuikTradeError::Internal(format!("stored quantity out of range: {}", quantity))
            })?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            placed_at: row.try_get("order_placed_at")?,
            exchange_order_id: row.try_get("exchange_order_id")?,
        })
    }

    fn quantity_param(order: &Order) -> Result<i32> {
        i32::try_from(order.quantity).map_err(|_| {
            QuikTradeError::Validation(format!("quantity {} exceeds INT range", order.quantity))
        })
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn insert(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, type, side, instrument, limit_price, quantity,
                created_at, updated_at, order_placed_at, exchange_order_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id)
        .bind(order.order_type.as_str())
        .bind(order.side.as_str())
        .bind(&order.instrument)
        .bind(order.limit_price)
        .bind(Self::quantity_param(order)?)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.placed_at)
        .bind(&order.exchange_order_id)
        .execute(&self.pool)
        .await?;

        debug!("Inserted order");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    #[instrument(skip(self))]
    async fn find_unplaced(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_placed_at IS NULL ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let orders = rows
            .iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;
        debug!("Found {} unplaced orders", orders.len());
        Ok(orders)
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn update(&self, order: &Order) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                type = $2,
                side = $3,
                instrument = $4,
                limit_price = $5,
                quantity = $6,
                updated_at = $7,
                order_placed_at = $8,
                exchange_order_id = $9
            WHERE id = $1 AND order_placed_at IS NULL
            "#,
        )
        .bind(order.id)
        .bind(order.order_type.as_str())
        .bind(order.side.as_str())
        .bind(&order.instrument)
        .bind(order.limit_price)
        .bind(Self::quantity_param(order)?)
        .bind(order.updated_at)
        .bind(order.placed_at)
        .bind(&order.exchange_order_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
