//! # Delivery Note Synchronizer
//!
//! Keeps the 1:0..1 Order↔DeliveryNote relation consistent. The note is
//! created by the lifecycle layer the first time an order transitions to
//! delivered status; [`mark_delivered`] is the one public operation.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};
use uuid::Uuid;

use botica_core::{DeliveryNote, Order};
use botica_db::repository::delivery;
use botica_db::{Database, DbResult};

use crate::error::ServiceError;
use crate::numbering;

/// Ensures the order has a delivery note; an existing note is returned
/// unchanged.
pub(crate) async fn ensure_delivery_note(
    conn: &mut SqliteConnection,
    order: &Order,
    now: DateTime<Utc>,
) -> DbResult<DeliveryNote> {
    if let Some(existing) = delivery::get_by_order(conn, &order.id).await? {
        return Ok(existing);
    }

    let allocation = numbering::next_delivery_note_number(conn, now).await;
    if allocation.fallback {
        warn!(
            order_number = %order.order_number,
            number = %allocation.number,
            "Delivery note created with fallback number"
        );
    }

    let row = DeliveryNote {
        id: Uuid::new_v4().to_string(),
        note_number: allocation.number,
        order_id: order.id.clone(),
        delivered: false,
        created_at: now,
    };

    delivery::insert(conn, &row).await?;

    info!(
        note_number = %row.note_number,
        order_number = %order.order_number,
        "Delivery note created"
    );

    Ok(row)
}

/// Deletes the order's delivery note, if any (order deletion path).
pub(crate) async fn remove_delivery_note(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<()> {
    if delivery::delete_by_order(conn, order_id).await? {
        info!(order_id = %order_id, "Delivery note removed with order");
    }
    Ok(())
}

/// Marks a delivery note's goods as received by the client.
pub async fn mark_delivered(db: &Database, note_id: &str) -> Result<(), ServiceError> {
    let mut conn = db.acquire().await?;

    delivery::set_delivered(&mut conn, note_id).await?;

    info!(note_id = %note_id, "Delivery note marked delivered");
    Ok(())
}
