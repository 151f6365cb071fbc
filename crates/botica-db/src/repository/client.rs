//! # Client Repository
//!
//! Database operations for the client directory.
//!
//! Clients are soft-deleted (`is_active = 0`) because historical orders and
//! invoices keep referencing them.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::error::{DbError, DbResult};
use botica_core::Client;

fn map_client(row: &SqliteRow) -> DbResult<Client> {
    Ok(Client {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        fiscal_name: row.try_get("fiscal_name")?,
        tax_id: row.try_get("tax_id")?,
        contact: row.try_get("contact")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        bank_account: row.try_get("bank_account")?,
        notes: row.try_get("notes")?,
        last_visit_at: row.try_get("last_visit_at")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

const CLIENT_COLUMNS: &str = "id, code, name, fiscal_name, tax_id, contact, email, phone, \
     address, bank_account, notes, last_visit_at, is_active, created_at";

/// Inserts a new client.
///
/// ## Errors
/// * `DbError::UniqueViolation` - code already exists
pub async fn insert(conn: &mut SqliteConnection, client: &Client) -> DbResult<()> {
    debug!(code = %client.code, "Inserting client");

    sqlx::query(
        r#"
        INSERT INTO clients (
            id, code, name, fiscal_name, tax_id, contact, email, phone,
            address, bank_account, notes, last_visit_at, is_active, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&client.id)
    .bind(&client.code)
    .bind(&client.name)
    .bind(&client.fiscal_name)
    .bind(&client.tax_id)
    .bind(&client.contact)
    .bind(&client.email)
    .bind(&client.phone)
    .bind(&client.address)
    .bind(&client.bank_account)
    .bind(&client.notes)
    .bind(client.last_visit_at)
    .bind(client.is_active)
    .bind(client.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Updates an existing client.
///
/// ## Errors
/// * `DbError::NotFound` - client doesn't exist
/// * `DbError::UniqueViolation` - new code collides with another client
pub async fn update(conn: &mut SqliteConnection, client: &Client) -> DbResult<()> {
    debug!(id = %client.id, "Updating client");

    let result = sqlx::query(
        r#"
        UPDATE clients SET
            code = ?2,
            name = ?3,
            fiscal_name = ?4,
            tax_id = ?5,
            contact = ?6,
            email = ?7,
            phone = ?8,
            address = ?9,
            bank_account = ?10,
            notes = ?11,
            is_active = ?12
        WHERE id = ?1
        "#,
    )
    .bind(&client.id)
    .bind(&client.code)
    .bind(&client.name)
    .bind(&client.fiscal_name)
    .bind(&client.tax_id)
    .bind(&client.contact)
    .bind(&client.email)
    .bind(&client.phone)
    .bind(&client.address)
    .bind(&client.bank_account)
    .bind(&client.notes)
    .bind(client.is_active)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Client", &client.id));
    }

    Ok(())
}

/// Soft-deletes a client by setting is_active = 0.
///
/// ## Why Soft Delete?
/// Historical orders still reference this client; the row must survive.
pub async fn soft_delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(id = %id, "Soft-deleting client");

    let result = sqlx::query("UPDATE clients SET is_active = 0 WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Client", id));
    }

    Ok(())
}

/// Gets a client by its ID.
pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Client>> {
    let row = sqlx::query(&format!(
        "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_client).transpose()
}

/// Gets a client by its business code.
pub async fn get_by_code(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<Client>> {
    let row = sqlx::query(&format!(
        "SELECT {CLIENT_COLUMNS} FROM clients WHERE code = ?1"
    ))
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_client).transpose()
}

/// Searches active clients by code or name fragment.
pub async fn search(conn: &mut SqliteConnection, term: &str, limit: u32) -> DbResult<Vec<Client>> {
    let pattern = format!("%{}%", term.trim());

    debug!(term = %term, limit = %limit, "Searching clients");

    let rows = sqlx::query(&format!(
        r#"
        SELECT {CLIENT_COLUMNS}
        FROM clients
        WHERE is_active = 1 AND (code LIKE ?1 OR name LIKE ?1)
        ORDER BY name
        LIMIT ?2
        "#
    ))
    .bind(pattern)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(map_client).collect()
}

/// Lists active clients sorted by name.
pub async fn list_active(conn: &mut SqliteConnection, limit: u32) -> DbResult<Vec<Client>> {
    let rows = sqlx::query(&format!(
        "SELECT {CLIENT_COLUMNS} FROM clients WHERE is_active = 1 ORDER BY name LIMIT ?1"
    ))
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(map_client).collect()
}

/// Refreshes the client's last-visit timestamp.
///
/// Called inside the order-creation transaction.
pub async fn touch_last_visit(
    conn: &mut SqliteConnection,
    id: &str,
    at: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE clients SET last_visit_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(at)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Client", id));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
