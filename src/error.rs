use thiserror::Error;
use uuid::Uuid;

/// Main error type for the order service
#[derive(Error, Debug)]
pub enum QuikTradeError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Order lifecycle errors
    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    /// The exchange could not be reached or answered outside its contract.
    /// Unlike a rejection this is never retried silently.
    #[error("Exchange failure for order {order_id}: {cause}")]
    Exchange { order_id: Uuid, cause: String },

    #[error("Placement of order {order_id} timed out after {elapsed_ms}ms")]
    PlacementTimeout { order_id: Uuid, elapsed_ms: u64 },

    // Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl QuikTradeError {
    /// True for failures raised while talking to the exchange (transport or timeout).
    pub fn is_exchange_failure(&self) -> bool {
        matches!(
            self,
            QuikTradeError::Exchange { .. } | QuikTradeError::PlacementTimeout { .. }
        )
    }
}

/// Result type alias for QuikTradeError
pub type Result<T> = std::result::Result<T, QuikTradeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_failures_are_classified() {
        let id = Uuid::new_v4();
        assert!(QuikTradeError::Exchange {
            order_id: id,
            cause: "connection refused".into()
        }
        .is_exchange_failure());
        assert!(QuikTradeError::PlacementTimeout {
            order_id: id,
            elapsed_ms: 5000
        }
        .is_exchange_failure());
        assert!(!QuikTradeError::OrderNotFound(id).is_exchange_failure());
    }

    #[test]
    fn display_includes_order_id() {
        let id = Uuid::new_v4();
        let err = QuikTradeError::Exchange {
            order_id: id,
            cause: "502 Bad Gateway".into(),
        };
        assert!(err.to_string().contains(&id.to_string()));
    }
}
