//! # Product Repository
//!
//! Database operations for the catalog: CRUD, search, stock-low listing and
//! atomic stock reservation.
//!
//! ## Stock Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Conditional Stock Decrement                          │
//! │                                                                         │
//! │  ❌ WRONG: read-check-write (lost-update race under concurrency)       │
//! │     let p = get(id);  if p.stock >= qty { update(stock = p.stock-qty) } │
//! │                                                                         │
//! │  ✅ CORRECT: one conditional UPDATE                                    │
//! │     UPDATE products SET stock = stock - ?qty                            │
//! │     WHERE id = ?id AND stock >= ?qty                                    │
//! │                                                                         │
//! │  rows_affected == 0 means "not enough stock (or no such product)" and  │
//! │  the caller aborts the whole order. The CHECK(stock >= 0) constraint   │
//! │  backs this up at the schema level.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{decimal_column, optional_decimal_column};
use botica_core::{Money, Product, TaxRate};

fn map_product(row: &SqliteRow) -> DbResult<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        price: Money::new(decimal_column(row, "price")?),
        tax_rate: TaxRate::new(decimal_column(row, "tax_rate")?),
        surcharge_rate: optional_decimal_column(row, "surcharge_rate")?,
        stock: row.try_get("stock")?,
        min_stock: row.try_get("min_stock")?,
        is_deposit: row.try_get("is_deposit")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const PRODUCT_COLUMNS: &str = "id, code, name, description, category, price, tax_rate, \
     surcharge_rate, stock, min_stock, is_deposit, is_active, created_at, updated_at";

/// Inserts a new product.
///
/// ## Errors
/// * `DbError::UniqueViolation` - code already exists
pub async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(code = %product.code, "Inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, code, name, description, category,
            price, tax_rate, surcharge_rate,
            stock, min_stock, is_deposit, is_active,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&product.id)
    .bind(&product.code)
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.category)
    .bind(product.price.amount().to_string())
    .bind(product.tax_rate.percent().to_string())
    .bind(product.surcharge_rate.map(|r| r.to_string()))
    .bind(product.stock)
    .bind(product.min_stock)
    .bind(product.is_deposit)
    .bind(product.is_active)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Updates an existing product (everything except stock, which only moves
/// through [`try_reserve_stock`] / [`restore_stock`]).
pub async fn update(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(id = %product.id, "Updating product");

    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE products SET
            code = ?2,
            name = ?3,
            description = ?4,
            category = ?5,
            price = ?6,
            tax_rate = ?7,
            surcharge_rate = ?8,
            min_stock = ?9,
            is_deposit = ?10,
            is_active = ?11,
            updated_at = ?12
        WHERE id = ?1
        "#,
    )
    .bind(&product.id)
    .bind(&product.code)
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.category)
    .bind(product.price.amount().to_string())
    .bind(product.tax_rate.percent().to_string())
    .bind(product.surcharge_rate.map(|r| r.to_string()))
    .bind(product.min_stock)
    .bind(product.is_deposit)
    .bind(product.is_active)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", &product.id));
    }

    Ok(())
}

/// Soft-deletes a product by setting is_active = 0.
///
/// Historical order items keep their frozen snapshot of the product, so the
/// row only has to survive for foreign-key integrity.
pub async fn soft_delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    debug!(id = %id, "Soft-deleting product");

    let now = Utc::now();

    let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

/// Gets a product by its ID.
pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let row = sqlx::query(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_product).transpose()
}

/// Gets a product by its business code.
pub async fn get_by_code(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<Product>> {
    let row = sqlx::query(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1"
    ))
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_product).transpose()
}

/// Searches active products by code or name fragment.
pub async fn search(conn: &mut SqliteConnection, term: &str, limit: u32) -> DbResult<Vec<Product>> {
    let pattern = format!("%{}%", term.trim());

    debug!(term = %term, limit = %limit, "Searching products");

    let rows = sqlx::query(&format!(
        r#"
        SELECT {PRODUCT_COLUMNS}
        FROM products
        WHERE is_active = 1 AND (code LIKE ?1 OR name LIKE ?1)
        ORDER BY name
        LIMIT ?2
        "#
    ))
    .bind(pattern)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(map_product).collect()
}

/// Lists active products whose stock is at or below their threshold.
pub async fn list_stock_low(conn: &mut SqliteConnection) -> DbResult<Vec<Product>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {PRODUCT_COLUMNS}
        FROM products
        WHERE is_active = 1 AND stock <= min_stock
        ORDER BY name
        "#
    ))
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(map_product).collect()
}

/// Atomically reserves `quantity` units of stock.
///
/// Returns `true` when the reservation succeeded. `false` means the product
/// either has less stock than requested or does not exist — the caller
/// decides which by looking the product up (it already has, for the
/// snapshot) and reports insufficient stock with the available quantity.
///
/// Deposit products never reach this function; the lifecycle layer skips
/// reservation for them.
pub async fn try_reserve_stock(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> DbResult<bool> {
    debug!(id = %id, quantity = %quantity, "Reserving stock");

    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Returns `quantity` units to stock (order deletion, item replacement).
pub async fn restore_stock(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> DbResult<()> {
    debug!(id = %id, quantity = %quantity, "Restoring stock");

    let now = Utc::now();

    let result = sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use rust_decimal_macros::dec;

    fn sample_product(id: &str, code: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            code: code.to_string(),
            name: format!("Producto {code}"),
            description: None,
            category: Some("Analgesics".to_string()),
            price: Money::new(dec!(3.20)),
            tax_rate: TaxRate::new(dec!(21)),
            surcharge_rate: None,
            stock,
            min_stock: 2,
            is_deposit: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_round_trips_decimals() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let mut product = sample_product("p1", "PAR-1G", 10);
        product.surcharge_rate = Some(dec!(5.2));
        insert(&mut conn, &product).await.unwrap();

        let found = get_by_id(&mut conn, "p1").await.unwrap().unwrap();
        assert_eq!(found.price.amount(), dec!(3.20));
        assert_eq!(found.tax_rate.percent(), dec!(21));
        assert_eq!(found.surcharge_rate, Some(dec!(5.2)));
        assert_eq!(found.stock, 10);
    }

    #[tokio::test]
    async fn test_reserve_stock_succeeds_and_decrements() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        insert(&mut conn, &sample_product("p1", "PAR-1G", 10))
            .await
            .unwrap();

        assert!(try_reserve_stock(&mut conn, "p1", 3).await.unwrap());
        let found = get_by_id(&mut conn, "p1").await.unwrap().unwrap();
        assert_eq!(found.stock, 7);
    }

    #[tokio::test]
    async fn test_reserve_stock_fails_without_touching_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        insert(&mut conn, &sample_product("p2", "IBU-600", 2))
            .await
            .unwrap();

        assert!(!try_reserve_stock(&mut conn, "p2", 5).await.unwrap());
        let found = get_by_id(&mut conn, "p2").await.unwrap().unwrap();
        assert_eq!(found.stock, 2);
    }

    #[tokio::test]
    async fn test_reserve_exact_remaining_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        insert(&mut conn, &sample_product("p1", "PAR-1G", 3))
            .await
            .unwrap();

        assert!(try_reserve_stock(&mut conn, "p1", 3).await.unwrap());
        let found = get_by_id(&mut conn, "p1").await.unwrap().unwrap();
        assert_eq!(found.stock, 0);

        // Nothing left
        assert!(!try_reserve_stock(&mut conn, "p1", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_restore_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        insert(&mut conn, &sample_product("p1", "PAR-1G", 10))
            .await
            .unwrap();
        try_reserve_stock(&mut conn, "p1", 4).await.unwrap();
        restore_stock(&mut conn, "p1", 4).await.unwrap();

        let found = get_by_id(&mut conn, "p1").await.unwrap().unwrap();
        assert_eq!(found.stock, 10);
    }

    #[tokio::test]
    async fn test_stock_low_listing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        insert(&mut conn, &sample_product("p1", "PAR-1G", 10))
            .await
            .unwrap();
        insert(&mut conn, &sample_product("p2", "IBU-600", 2))
            .await
            .unwrap();
        insert(&mut conn, &sample_product("p3", "AMX-500", 0))
            .await
            .unwrap();

        let low = list_stock_low(&mut conn).await.unwrap();
        let codes: Vec<&str> = low.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["AMX-500", "IBU-600"]);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_unique_violation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        insert(&mut conn, &sample_product("p1", "PAR-1G", 10))
            .await
            .unwrap();
        let err = insert(&mut conn, &sample_product("p2", "PAR-1G", 5))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
