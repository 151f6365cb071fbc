//! # Invoice Synchronizer
//!
//! Keeps the 1:1 Order↔Invoice relation consistent. Only the order
//! lifecycle calls the synchronizer functions — external callers never
//! create or refresh invoices directly; the one public operation here is
//! [`mark_sent`].
//!
//! ## Contract
//! - [`ensure_invoice`] - the order gets an invoice if it doesn't have one;
//!   an existing invoice is returned unchanged
//! - [`refresh_invoice`] - the stored total is overwritten with the order's
//!   freshly computed grand total (or the invoice is created if absent)
//! - [`remove_invoice`] - the invoice goes away with its order
//!
//! All three run on the caller's open transaction, so invoice writes commit
//! or roll back together with the order mutation that caused them.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};
use uuid::Uuid;

use botica_core::{Invoice, Money, Order};
use botica_db::repository::invoice;
use botica_db::{Database, DbResult};

use crate::error::ServiceError;
use crate::numbering;

/// Ensures the order has an invoice; returns the existing one unchanged or
/// creates a new one with `total` = the order's computed grand total.
pub(crate) async fn ensure_invoice(
    conn: &mut SqliteConnection,
    order: &Order,
    grand_total: Money,
    now: DateTime<Utc>,
) -> DbResult<Invoice> {
    if let Some(existing) = invoice::get_by_order(conn, &order.id).await? {
        return Ok(existing);
    }

    let allocation = numbering::next_invoice_number(conn, now).await;
    if allocation.fallback {
        warn!(
            order_number = %order.order_number,
            number = %allocation.number,
            "Invoice created with fallback number"
        );
    }

    let row = Invoice {
        id: Uuid::new_v4().to_string(),
        invoice_number: allocation.number,
        order_id: order.id.clone(),
        total: Money::new(grand_total.rounded()),
        sent_by_email: false,
        fallback_number: allocation.fallback,
        created_at: now,
    };

    invoice::insert(conn, &row).await?;

    info!(
        invoice_number = %row.invoice_number,
        order_number = %order.order_number,
        total = %row.total,
        "Invoice created"
    );

    Ok(row)
}

/// Overwrites the invoice's stored total with the order's current computed
/// grand total; delegates to [`ensure_invoice`] when no invoice exists yet.
pub(crate) async fn refresh_invoice(
    conn: &mut SqliteConnection,
    order: &Order,
    grand_total: Money,
    now: DateTime<Utc>,
) -> DbResult<Invoice> {
    match invoice::get_by_order(conn, &order.id).await? {
        Some(existing) => {
            let total = Money::new(grand_total.rounded());
            invoice::update_total(conn, &existing.id, total).await?;

            info!(
                invoice_number = %existing.invoice_number,
                total = %total,
                "Invoice total refreshed"
            );

            Ok(Invoice { total, ..existing })
        }
        None => ensure_invoice(conn, order, grand_total, now).await,
    }
}

/// Deletes the order's invoice, if any (order deletion path).
pub(crate) async fn remove_invoice(conn: &mut SqliteConnection, order_id: &str) -> DbResult<()> {
    if invoice::delete_by_order(conn, order_id).await? {
        info!(order_id = %order_id, "Invoice removed with order");
    }
    Ok(())
}

/// Marks an invoice as sent by email.
///
/// Delivery itself happens outside this system; this records the fact.
pub async fn mark_sent(db: &Database, invoice_id: &str) -> Result<(), ServiceError> {
    let mut conn = db.acquire().await?;

    invoice::set_sent(&mut conn, invoice_id).await?;

    info!(invoice_id = %invoice_id, "Invoice marked as sent");
    Ok(())
}
