//! # Order Repository
//!
//! Database operations for orders and their line items.
//!
//! Line items are owned by their order (`ON DELETE CASCADE`), so deleting an
//! order row removes its items in the same statement. Stock restoration is
//! NOT handled here — the lifecycle layer restores stock before deleting,
//! inside the same transaction.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::decimal_column;
use botica_core::{Money, Order, OrderItem, OrderStatus, TaxRate};

fn map_order(row: &SqliteRow) -> DbResult<Order> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: row.try_get("id")?,
        order_number: row.try_get("order_number")?,
        client_id: row.try_get("client_id")?,
        status: OrderStatus::from_str_or_default(&status),
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_item(row: &SqliteRow) -> DbResult<OrderItem> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        product_id: row.try_get("product_id")?,
        code_snapshot: row.try_get("code_snapshot")?,
        name_snapshot: row.try_get("name_snapshot")?,
        quantity: row.try_get("quantity")?,
        unit_price: Money::new(decimal_column(row, "unit_price")?),
        tax_rate: TaxRate::new(decimal_column(row, "tax_rate")?),
        subtotal: Money::new(decimal_column(row, "subtotal")?),
        tax_amount: Money::new(decimal_column(row, "tax_amount")?),
        total: Money::new(decimal_column(row, "total")?),
        created_at: row.try_get("created_at")?,
    })
}

const ORDER_COLUMNS: &str = "id, order_number, client_id, status, notes, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, code_snapshot, name_snapshot, quantity, \
     unit_price, tax_rate, subtotal, tax_amount, total, created_at";

/// Inserts a new order header.
pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    debug!(order_number = %order.order_number, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (id, order_number, client_id, status, notes, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(&order.client_id)
    .bind(order.status.as_str())
    .bind(&order.notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Updates an order's status, notes and updated_at.
pub async fn update(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    debug!(id = %order.id, status = %order.status.as_str(), "Updating order");

    let result = sqlx::query(
        "UPDATE orders SET status = ?2, notes = ?3, updated_at = ?4 WHERE id = ?1",
    )
    .bind(&order.id)
    .bind(order.status.as_str())
    .bind(&order.notes)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", &order.id));
    }

    Ok(())
}

/// Deletes an order; its items go with it via the FK cascade.
pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(id = %id, "Deleting order");

    let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", id));
    }

    Ok(())
}

/// Gets an order by its ID.
pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(map_order).transpose()
}

/// Gets an order by its human-readable number.
pub async fn get_by_number(conn: &mut SqliteConnection, number: &str) -> DbResult<Option<Order>> {
    let row = sqlx::query(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = ?1"
    ))
    .bind(number)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_order).transpose()
}

/// Lists the order numbers sharing a prefix (one calendar day's scope).
///
/// Used by the document number generator; parsing and max-selection happen
/// there, numerically, so a day with more than 999 orders keeps counting.
pub async fn list_numbers_with_prefix(
    conn: &mut SqliteConnection,
    prefix: &str,
) -> DbResult<Vec<String>> {
    let pattern = format!("{prefix}%");

    let rows = sqlx::query("SELECT order_number FROM orders WHERE order_number LIKE ?1")
        .bind(pattern)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| Ok(row.try_get::<String, _>("order_number")?))
        .collect()
}

/// Inserts a line item.
pub async fn insert_item(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
    debug!(order_id = %item.order_id, product_id = %item.product_id, "Adding order item");

    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, product_id,
            code_snapshot, name_snapshot,
            quantity, unit_price, tax_rate,
            subtotal, tax_amount, total,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.product_id)
    .bind(&item.code_snapshot)
    .bind(&item.name_snapshot)
    .bind(item.quantity)
    .bind(item.unit_price.amount().to_string())
    .bind(item.tax_rate.percent().to_string())
    .bind(item.subtotal.amount().to_string())
    .bind(item.tax_amount.amount().to_string())
    .bind(item.total.amount().to_string())
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets all items of an order, oldest first.
pub async fn get_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let rows = sqlx::query(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY created_at, id"
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(map_item).collect()
}

/// Deletes all items of an order (item replacement during update).
pub async fn delete_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<()> {
    debug!(order_id = %order_id, "Deleting order items");

    sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::client;
    use botica_core::Client;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        client::insert(
            &mut conn,
            &Client {
                id: "c1".to_string(),
                code: "FARM-001".to_string(),
                name: "Farmacia Uno".to_string(),
                fiscal_name: None,
                tax_id: None,
                contact: None,
                email: None,
                phone: None,
                address: None,
                bank_account: None,
                notes: None,
                last_visit_at: None,
                is_active: true,
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        db
    }

    fn sample_order(id: &str, number: &str) -> Order {
        let now = Utc::now();
        Order {
            id: id.to_string(),
            order_number: number.to_string(),
            client_id: "c1".to_string(),
            status: OrderStatus::Pending,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_item(id: &str, order_id: &str) -> OrderItem {
        let mut item = OrderItem {
            id: id.to_string(),
            order_id: order_id.to_string(),
            product_id: "p1".to_string(),
            code_snapshot: "PAR-1G".to_string(),
            name_snapshot: "Paracetamol 1g".to_string(),
            quantity: 3,
            unit_price: Money::new(dec!(12.50)),
            tax_rate: TaxRate::new(dec!(21)),
            subtotal: Money::zero(),
            tax_amount: Money::zero(),
            total: Money::zero(),
            created_at: Utc::now(),
        };
        item.compute_amounts();
        item
    }

    #[tokio::test]
    async fn test_insert_and_get_by_number() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();

        insert(&mut conn, &sample_order("o1", "P-20260315-001"))
            .await
            .unwrap();

        let found = get_by_number(&mut conn, "P-20260315-001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "o1");
        assert_eq!(found.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_client_is_foreign_key_violation() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();

        let mut order = sample_order("o1", "P-20260315-001");
        order.client_id = "ghost".to_string();

        let err = insert(&mut conn, &order).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_items_round_trip_frozen_amounts() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();

        // Items reference products; order items carry snapshots but the FK
        // still needs the product row.
        crate::repository::product::insert(
            &mut conn,
            &botica_core::Product {
                id: "p1".to_string(),
                code: "PAR-1G".to_string(),
                name: "Paracetamol 1g".to_string(),
                description: None,
                category: None,
                price: Money::new(dec!(12.50)),
                tax_rate: TaxRate::new(dec!(21)),
                surcharge_rate: None,
                stock: 10,
                min_stock: 0,
                is_deposit: false,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        insert(&mut conn, &sample_order("o1", "P-20260315-001"))
            .await
            .unwrap();
        insert_item(&mut conn, &sample_item("i1", "o1")).await.unwrap();

        let items = get_items(&mut conn, "o1").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].subtotal.amount(), dec!(37.50));
        assert_eq!(items[0].tax_amount.amount(), dec!(7.875));
        assert_eq!(items[0].total.amount(), dec!(45.375));
    }

    #[tokio::test]
    async fn test_delete_cascades_items() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();

        crate::repository::product::insert(
            &mut conn,
            &botica_core::Product {
                id: "p1".to_string(),
                code: "PAR-1G".to_string(),
                name: "Paracetamol 1g".to_string(),
                description: None,
                category: None,
                price: Money::new(dec!(12.50)),
                tax_rate: TaxRate::new(dec!(21)),
                surcharge_rate: None,
                stock: 10,
                min_stock: 0,
                is_deposit: false,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        insert(&mut conn, &sample_order("o1", "P-20260315-001"))
            .await
            .unwrap();
        insert_item(&mut conn, &sample_item("i1", "o1")).await.unwrap();

        delete(&mut conn, "o1").await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_list_numbers_with_prefix() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();

        for (id, number) in [
            ("o1", "P-20260315-001"),
            ("o2", "P-20260315-002"),
            ("o3", "P-20260316-001"),
        ] {
            insert(&mut conn, &sample_order(id, number)).await.unwrap();
        }

        let numbers = list_numbers_with_prefix(&mut conn, "P-20260315-")
            .await
            .unwrap();
        assert_eq!(numbers.len(), 2);
        assert!(numbers.iter().all(|n| n.starts_with("P-20260315-")));
    }
}
