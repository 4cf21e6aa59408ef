use log::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use topup_common::Money;

use super::like_pattern;
use crate::{
    api::order_objects::{DailyRevenue, OrderQueryFilter, OrderStats, Paged, Pagination, PaymentMethodStat},
    db_types::{NewOrder, Order, OrderDetails, OrderStatusType, StatusUpdate},
    traits::OrderFlowError,
};

const ORDER_DETAILS_SELECT: &str = r#"
    SELECT
        o.*,
        u.username,
        u.email,
        u.phone,
        p.name AS product_name,
        p.description AS product_description
    FROM orders o
    JOIN users u ON o.user_id = u.id
    JOIN products p ON o.product_id = p.id
"#;

/// Inserts a new order. The status is always `pending`, and the amount is taken as-is from `order`.
///
/// This is not atomic. Embed the call in a transaction if it must happen together with other reads or writes.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO orders (user_id, product_id, player_id, amount, payment_method, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(order.product_id)
    .bind(order.player_id)
    .bind(order.amount)
    .bind(order.payment_method)
    .bind(order.notes)
    .fetch_one(conn)
    .await
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_order_details(id: i64, conn: &mut SqliteConnection) -> Result<Option<OrderDetails>, sqlx::Error> {
    let mut builder = QueryBuilder::new(ORDER_DETAILS_SELECT);
    builder.push(" WHERE o.id = ");
    builder.push_bind(id);
    builder.build_query_as::<OrderDetails>().fetch_optional(conn).await
}

fn push_order_filter(builder: &mut QueryBuilder<'_, Sqlite>, query: &OrderQueryFilter) {
    if query.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = query.user_id {
        where_clause.push("o.user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(status) = query.status {
        where_clause.push("o.status = ");
        where_clause.push_bind_unseparated(status);
    }
    if let Some(term) = &query.search {
        let pattern = like_pattern(term);
        where_clause.push("(u.username LIKE ");
        where_clause.push_bind_unseparated(pattern.clone());
        where_clause.push_unseparated(" ESCAPE '\\' OR o.player_id LIKE ");
        where_clause.push_bind_unseparated(pattern.clone());
        where_clause.push_unseparated(" ESCAPE '\\' OR p.name LIKE ");
        where_clause.push_bind_unseparated(pattern);
        where_clause.push_unseparated(" ESCAPE '\\')");
    }
}

/// Fetches one page of orders matching the filter, along with the total number of matches.
///
/// Orders are returned newest first. Orders created in the same second are ordered by descending id.
pub async fn search_orders(
    query: OrderQueryFilter,
    page: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Paged<OrderDetails>, sqlx::Error> {
    let mut count = QueryBuilder::new(
        "SELECT COUNT(*) FROM orders o JOIN users u ON o.user_id = u.id JOIN products p ON o.product_id = p.id",
    );
    push_order_filter(&mut count, &query);
    let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;

    let mut builder = QueryBuilder::new(ORDER_DETAILS_SELECT);
    push_order_filter(&mut builder, &query);
    builder.push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ");
    builder.push_bind(page.page_size());
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<OrderDetails>().fetch_all(conn).await?;
    trace!("🗃️ {} of {total} orders returned", orders.len());
    Ok(Paged::new(orders, &page, total))
}

/// Sets the status (and the transaction id and notes, if provided) in a single statement. If `expected_version` is
/// given, the order is only touched while it is still at that version. Returns `None` if nothing was updated.
pub async fn update_status_if_version(
    id: i64,
    expected_version: Option<i64>,
    update: StatusUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                transaction_id = COALESCE($2, transaction_id),
                notes = COALESCE($3, notes),
                updated_at = CURRENT_TIMESTAMP,
                version = version + 1
            WHERE id = $4 AND ($5 IS NULL OR version = $5)
            RETURNING *;
        "#,
    )
    .bind(update.status)
    .bind(update.transaction_id)
    .bind(update.notes)
    .bind(id)
    .bind(expected_version)
    .fetch_optional(conn)
    .await
}

/// Applies a status update, honouring `update.expected_version` if one is given.
///
/// The write is the first statement of the unit of work, so SQLite takes the write lock before anything is read. When
/// nothing was updated, the order is re-read under that lock to tell a missing order from a stale version.
pub async fn update_order_status(
    id: i64,
    update: StatusUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderFlowError> {
    let expected = update.expected_version;
    let updated = update_status_if_version(id, expected, update, &mut *conn)
        .await
        .map_err(|e| conflict_if_busy(e, id, expected))?;
    if updated.is_some() {
        return Ok(updated);
    }
    let current = fetch_order(id, conn).await.map_err(|e| conflict_if_busy(e, id, expected))?;
    match (current, expected) {
        (Some(order), Some(expected)) => {
            debug!("🗃️ Stale status update for order #{id}. Expected version {expected}, found {}", order.version);
            Err(OrderFlowError::VersionConflict { id, expected, actual: order.version })
        },
        _ => Ok(None),
    }
}

/// Marks the order as completed and records the payment reference.
pub async fn complete_order(
    id: i64,
    payment_reference: String,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderFlowError> {
    let update = StatusUpdate::new(OrderStatusType::Completed).with_transaction_id(payment_reference);
    update_status_if_version(id, None, update, conn).await.map_err(|e| conflict_if_busy(e, id, None))
}

/// True for the SQLite errors that mean another connection holds the lock we need (`SQLITE_BUSY`, `SQLITE_LOCKED` and
/// their extended codes).
pub(crate) fn is_busy(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("5" | "6" | "261" | "262" | "517" | "773"))
        },
        _ => false,
    }
}

/// Losing a race for the write lock is reported as a version conflict, so callers can retry it like any other.
pub(crate) fn conflict_if_busy(e: sqlx::Error, id: i64, expected: Option<i64>) -> OrderFlowError {
    if is_busy(&e) {
        warn!("🗃️ Order #{id} is locked by another writer. {e}");
        let version = expected.unwrap_or_default();
        OrderFlowError::VersionConflict { id, expected: version, actual: version }
    } else {
        e.into()
    }
}

pub async fn attach_payment_reference(
    id: i64,
    user_id: i64,
    transaction_id: String,
    payment_method: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE orders SET
                transaction_id = $1,
                payment_method = COALESCE($2, payment_method),
                updated_at = CURRENT_TIMESTAMP,
                version = version + 1
            WHERE id = $3 AND user_id = $4
            RETURNING *;
        "#,
    )
    .bind(transaction_id)
    .bind(payment_method)
    .bind(id)
    .bind(user_id)
    .fetch_optional(conn)
    .await
}

pub async fn delete_order(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Order counts and revenue. `total_customers` is left at zero; it is not an order statistic.
pub async fn order_stats(conn: &mut SqliteConnection) -> Result<OrderStats, sqlx::Error> {
    let (total_orders, pending_orders, completed_orders, total_revenue): (i64, i64, i64, Money) = sqlx::query_as(
        r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'completed' THEN amount ELSE 0 END), 0)
            FROM orders
        "#,
    )
    .fetch_one(conn)
    .await?;
    Ok(OrderStats { total_customers: 0, total_orders, pending_orders, completed_orders, total_revenue })
}

pub async fn payment_method_stats(conn: &mut SqliteConnection) -> Result<Vec<PaymentMethodStat>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT payment_method, COUNT(*) AS count, COALESCE(SUM(amount), 0) AS total_amount
            FROM orders
            WHERE status = 'completed'
            GROUP BY payment_method
            ORDER BY total_amount DESC
        "#,
    )
    .fetch_all(conn)
    .await
}

pub async fn daily_revenue(days: u32, conn: &mut SqliteConnection) -> Result<Vec<DailyRevenue>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT DATE(created_at) AS date, COUNT(*) AS orders_count, COALESCE(SUM(amount), 0) AS revenue
            FROM orders
            WHERE status = 'completed' AND created_at >= DATETIME('now', $1)
            GROUP BY DATE(created_at)
            ORDER BY date DESC
        "#,
    )
    .bind(format!("-{days} days"))
    .fetch_all(conn)
    .await
}
