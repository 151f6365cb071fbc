//! # Delivery Note Repository
//!
//! Database operations for delivery notes (albaranes). One note per order
//! at most, created when the order first reaches delivered status.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::error::{DbError, DbResult};
use botica_core::DeliveryNote;

fn map_note(row: &SqliteRow) -> DbResult<DeliveryNote> {
    Ok(DeliveryNote {
        id: row.try_get("id")?,
        note_number: row.try_get("note_number")?,
        order_id: row.try_get("order_id")?,
        delivered: row.try_get("delivered")?,
        created_at: row.try_get("created_at")?,
    })
}

const NOTE_COLUMNS: &str = "id, note_number, order_id, delivered, created_at";

/// Inserts a new delivery note.
pub async fn insert(conn: &mut SqliteConnection, note: &DeliveryNote) -> DbResult<()> {
    debug!(note_number = %note.note_number, order_id = %note.order_id, "Inserting delivery note");

    sqlx::query(
        r#"
        INSERT INTO delivery_notes (id, note_number, order_id, delivered, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&note.id)
    .bind(&note.note_number)
    .bind(&note.order_id)
    .bind(note.delivered)
    .bind(note.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets a delivery note by its ID.
pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<DeliveryNote>> {
    let row = sqlx::query(&format!(
        "SELECT {NOTE_COLUMNS} FROM delivery_notes WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_note).transpose()
}

/// Gets the delivery note of an order, if one exists.
pub async fn get_by_order(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Option<DeliveryNote>> {
    let row = sqlx::query(&format!(
        "SELECT {NOTE_COLUMNS} FROM delivery_notes WHERE order_id = ?1"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_note).transpose()
}

/// Marks the goods as received.
pub async fn set_delivered(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(id = %id, "Marking delivery note delivered");

    let result = sqlx::query("UPDATE delivery_notes SET delivered = 1 WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("DeliveryNote", id));
    }

    Ok(())
}

/// Deletes the delivery note of an order, if any. Returns whether one was removed.
pub async fn delete_by_order(conn: &mut SqliteConnection, order_id: &str) -> DbResult<bool> {
    debug!(order_id = %order_id, "Deleting delivery note of order");

    let result = sqlx::query("DELETE FROM delivery_notes WHERE order_id = ?1")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Lists the note numbers sharing a prefix (one calendar day's scope).
pub async fn list_numbers_with_prefix(
    conn: &mut SqliteConnection,
    prefix: &str,
) -> DbResult<Vec<String>> {
    let pattern = format!("{prefix}%");

    let rows = sqlx::query("SELECT note_number FROM delivery_notes WHERE note_number LIKE ?1")
        .bind(pattern)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| Ok(row.try_get::<String, _>("note_number")?))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::{client, order};
    use botica_core::{Client, Order, OrderStatus};
    use chrono::Utc;

    async fn setup_with_order() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let now = Utc::now();

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
                created_at: now,
            },
        )
        .await
        .unwrap();

        order::insert(
            &mut conn,
            &Order {
                id: "o1".to_string(),
                order_number: "P-20260315-001".to_string(),
                client_id: "c1".to_string(),
                status: OrderStatus::Delivered,
                notes: None,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();

        db
    }

    #[tokio::test]
    async fn test_insert_lookup_and_mark_delivered() {
        let db = setup_with_order().await;
        let mut conn = db.acquire().await.unwrap();

        let note = DeliveryNote {
            id: "a1".to_string(),
            note_number: "ALB-20260315-001".to_string(),
            order_id: "o1".to_string(),
            delivered: false,
            created_at: Utc::now(),
        };
        insert(&mut conn, &note).await.unwrap();

        let found = get_by_order(&mut conn, "o1").await.unwrap().unwrap();
        assert_eq!(found.note_number, "ALB-20260315-001");
        assert!(!found.delivered);

        set_delivered(&mut conn, "a1").await.unwrap();
        let found = get_by_id(&mut conn, "a1").await.unwrap().unwrap();
        assert!(found.delivered);
    }

    #[tokio::test]
    async fn test_one_note_per_order() {
        let db = setup_with_order().await;
        let mut conn = db.acquire().await.unwrap();

        let note = DeliveryNote {
            id: "a1".to_string(),
            note_number: "ALB-20260315-001".to_string(),
            order_id: "o1".to_string(),
            delivered: false,
            created_at: Utc::now(),
        };
        insert(&mut conn, &note).await.unwrap();

        let second = DeliveryNote {
            id: "a2".to_string(),
            note_number: "ALB-20260315-002".to_string(),
            ..note
        };
        let err = insert(&mut conn, &second).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
