use crate::errors::{AppError, ResultExt};
use crate::models::CustomerOrder;
use sqlx::SqlitePool;

/// Every order joined with its customer. Filtering happens in memory.
const CUSTOMER_ORDERS_QUERY: &str = r#"
    SELECT
        o.order_id,
        o.customer_id,
        COALESCE(CAST(o.order_date AS TEXT), '') AS order_date,
        COALESCE(CAST(o.order_total AS REAL), 0.0) AS order_total,
        c.name,
        c.email,
        c.city
    FROM orders o
    JOIN customers c ON c.customer_id = o.customer_id
"#;

pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch all customer orders.
    pub async fn fetch_customer_orders(&self) -> Result<Vec<CustomerOrder>, AppError> {
        let orders = sqlx::query_as::<_, CustomerOrder>(CUSTOMER_ORDERS_QUERY)
            .fetch_all(&self.pool)
            .await
            .context("Failed to load customer orders")?;

        if orders.is_empty() {
            tracing::warn!("No data returned from db");
        } else {
            tracing::info!("Loaded {} customer orders from db", orders.len());
        }

        Ok(orders)
    }
}
