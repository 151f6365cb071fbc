//! # Repository Module
//!
//! Database repository functions for Botica ERP.
//!
//! ## Explicit Connections
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │               Why functions take &mut SqliteConnection                  │
//! │                                                                         │
//! │  A lifecycle operation spans several writes that must commit or fail   │
//! │  together:                                                              │
//! │                                                                         │
//! │      let mut tx = db.begin().await?;                                    │
//! │      order::insert(&mut tx, &order).await?;                             │
//! │      order::insert_item(&mut tx, &item).await?;                         │
//! │      product::try_reserve_stock(&mut tx, ...).await?;                   │
//! │      invoice::insert(&mut tx, &invoice).await?;                         │
//! │      tx.commit().await?;                                                │
//! │                                                                         │
//! │  The same functions serve plain pooled reads:                           │
//! │                                                                         │
//! │      let mut conn = db.acquire().await?;                                │
//! │      let found = product::get_by_id(&mut conn, id).await?;              │
//! │                                                                         │
//! │  SQL stays in one place per entity; the caller owns the transaction.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Decimal Columns
//! SQLite has no decimal type. Monetary amounts and rates are stored as TEXT
//! holding exact decimal strings and parsed back at the row boundary by the
//! helpers below; a malformed stored value surfaces as [`DbError::Decode`],
//! never as a silently wrong float.
//!
//! ## Available Repositories
//!
//! - [`client`] - Client directory
//! - [`product`] - Catalog and atomic stock reservation
//! - [`order`] - Orders and their line items
//! - [`invoice`] - Derived invoices
//! - [`delivery`] - Delivery notes

pub mod client;
pub mod delivery;
pub mod invoice;
pub mod order;
pub mod product;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

use crate::error::{DbError, DbResult};

/// Parses a NOT NULL decimal TEXT column.
pub(crate) fn decimal_column(row: &SqliteRow, column: &str) -> DbResult<Decimal> {
    let text: String = row.try_get(column)?;
    Decimal::from_str(&text).map_err(|err| DbError::decode(column, err.to_string()))
}

/// Parses a nullable decimal TEXT column.
pub(crate) fn optional_decimal_column(row: &SqliteRow, column: &str) -> DbResult<Option<Decimal>> {
    let text: Option<String> = row.try_get(column)?;
    match text {
        Some(text) => Decimal::from_str(&text)
            .map(Some)
            .map_err(|err| DbError::decode(column, err.to_string())),
        None => Ok(None),
    }
}
