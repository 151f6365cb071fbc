//! # Invoice Repository
//!
//! Database operations for invoices.
//!
//! The Order↔Invoice relation is a plain unique foreign key: lookup is
//! always "the invoice whose order_id is X". At most one row can exist per
//! order — the UNIQUE constraint enforces what the synchronizer assumes.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::decimal_column;
use botica_core::{Invoice, Money};

fn map_invoice(row: &SqliteRow) -> DbResult<Invoice> {
    Ok(Invoice {
        id: row.try_get("id")?,
        invoice_number: row.try_get("invoice_number")?,
        order_id: row.try_get("order_id")?,
        total: Money::new(decimal_column(row, "total")?),
        sent_by_email: row.try_get("sent_by_email")?,
        fallback_number: row.try_get("fallback_number")?,
        created_at: row.try_get("created_at")?,
    })
}

const INVOICE_COLUMNS: &str =
    "id, invoice_number, order_id, total, sent_by_email, fallback_number, created_at";

/// Inserts a new invoice.
///
/// ## Errors
/// * `DbError::UniqueViolation` - the order already has an invoice, or the
///   number is taken
pub async fn insert(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    debug!(
        invoice_number = %invoice.invoice_number,
        order_id = %invoice.order_id,
        "Inserting invoice"
    );

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, invoice_number, order_id, total,
            sent_by_email, fallback_number, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.invoice_number)
    .bind(&invoice.order_id)
    .bind(invoice.total.amount().to_string())
    .bind(invoice.sent_by_email)
    .bind(invoice.fallback_number)
    .bind(invoice.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets an invoice by its ID.
pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
    let row = sqlx::query(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_invoice).transpose()
}

/// Gets the invoice of an order, if one exists.
pub async fn get_by_order(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Option<Invoice>> {
    let row = sqlx::query(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices WHERE order_id = ?1"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_invoice).transpose()
}

/// Overwrites the stored total (invoice refresh after an order mutation).
pub async fn update_total(conn: &mut SqliteConnection, id: &str, total: Money) -> DbResult<()> {
    debug!(id = %id, total = %total, "Refreshing invoice total");

    let result = sqlx::query("UPDATE invoices SET total = ?2 WHERE id = ?1")
        .bind(id)
        .bind(total.amount().to_string())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Invoice", id));
    }

    Ok(())
}

/// Marks an invoice as sent by email.
pub async fn set_sent(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(id = %id, "Marking invoice sent");

    let result = sqlx::query("UPDATE invoices SET sent_by_email = 1 WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Invoice", id));
    }

    Ok(())
}

/// Deletes the invoice of an order, if any. Returns whether one was removed.
pub async fn delete_by_order(conn: &mut SqliteConnection, order_id: &str) -> DbResult<bool> {
    debug!(order_id = %order_id, "Deleting invoice of order");

    let result = sqlx::query("DELETE FROM invoices WHERE order_id = ?1")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Lists invoice numbers ending in the given suffix (one year's scope).
///
/// The generator passes `"/26"` to collect every number of 2026.
pub async fn list_numbers_with_suffix(
    conn: &mut SqliteConnection,
    suffix: &str,
) -> DbResult<Vec<String>> {
    let pattern = format!("%{suffix}");

    let rows = sqlx::query("SELECT invoice_number FROM invoices WHERE invoice_number LIKE ?1")
        .bind(pattern)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| Ok(row.try_get::<String, _>("invoice_number")?))
        .collect()
}

/// Checks whether an invoice number is already taken.
///
/// Used by the collision-retry loop after a candidate number is computed.
pub async fn number_exists(conn: &mut SqliteConnection, number: &str) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE invoice_number = ?1")
        .bind(number)
        .fetch_one(&mut *conn)
        .await?;

    Ok(count > 0)
}

// =============================================================================
// Unit Tests
// =============================================================================
