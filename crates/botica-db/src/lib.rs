//! # botica-db: Database Layer for Botica ERP
//!
//! This crate provides database access for the distributor back office.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Botica ERP Data Flow                             │
//! │                                                                         │
//! │  Service call (create_order)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     botica-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (client.rs,   │    │  (embedded)  │  │   │
//! │  │   │               │    │  product.rs,  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  order.rs ...)│    │ 001_init.sql │  │   │
//! │  │   │ begin()/      │    │               │    │              │  │   │
//! │  │   │ acquire()     │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL mode, foreign keys ON)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Unit of Work
//!
//! Repository functions take `&mut SqliteConnection` instead of capturing a
//! pool, so one caller-owned transaction can span a whole lifecycle
//! operation (order + items + stock + invoice) and commit or roll back
//! exactly once:
//!
//! ```rust,ignore
//! let mut tx = db.begin().await?;
//! repository::order::insert(&mut tx, &order).await?;
//! repository::invoice::insert(&mut tx, &invoice).await?;
//! tx.commit().await?;
//! ```
//!
//! For one-off reads, acquire a pooled connection:
//!
//! ```rust,ignore
//! let mut conn = db.acquire().await?;
//! let product = repository::product::get_by_id(&mut conn, id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
