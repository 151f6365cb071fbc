//! # Order Lifecycle Manager
//!
//! All order mutations go through [`OrderService`]. Each operation runs in
//! exactly one transaction and commits exactly once; any error on the way
//! drops the transaction, which rolls back every write it made (order,
//! items, stock, client touch, invoice, delivery note).
//!
//! ## Stock Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  All-or-nothing reservation                                             │
//! │                                                                         │
//! │  For each requested line:                                               │
//! │    1. product must exist and quantity must be valid — an unknown id or  │
//! │       a quantity <= 0 fails the WHOLE order (nothing is skipped)        │
//! │    2. non-deposit products get one conditional decrement:               │
//! │         UPDATE products SET stock = stock - qty                         │
//! │         WHERE id = ? AND stock >= qty                                   │
//! │       zero rows affected = insufficient stock = WHOLE order aborts,     │
//! │       naming the product and its available quantity                     │
//! │    3. deposit products skip reservation entirely                        │
//! │                                                                         │
//! │  The rollback undoes reservations already made for earlier lines.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Rules
//! The status enum is deliberately unconstrained — any status can be
//! assigned at any time. Two status-adjacent behaviors exist:
//! - only pending orders can be deleted
//! - the first transition to delivered creates the delivery note

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use botica_core::{
    validation, CoreError, DeliveryNote, Invoice, Order, OrderItem, OrderStatus, OrderTotals,
    MAX_ORDER_ITEMS,
};
use botica_db::repository::{client, delivery as delivery_repo, invoice as invoice_repo, order as order_repo, product};
use botica_db::Database;
use botica_db::DbError;

use crate::delivery::{ensure_delivery_note, remove_delivery_note};
use crate::error::ServiceError;
use crate::invoicing::{ensure_invoice, refresh_invoice, remove_invoice};
use crate::numbering;

// =============================================================================
// Requests
// =============================================================================

/// One requested order line.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// Input for creating an order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub client_id: String,
    pub items: Vec<OrderItemRequest>,
    /// Initial status; defaults to pending.
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
}

/// Input for updating an order. Absent fields keep their current value;
/// supplying `items` replaces the whole item list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    pub items: Option<Vec<OrderItemRequest>>,
}

// =============================================================================
// Views
// =============================================================================

/// Serializable projection of an order with its items, dynamic totals and
/// derived documents. Monetary fields are rounded to 2 decimals here — and
/// only here; internal arithmetic keeps full precision.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: String,
    pub order_number: String,
    pub client_id: String,
    pub client_code: String,
    pub client_name: String,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub surcharge_total: Decimal,
    pub grand_total: Decimal,
    pub invoice: Option<InvoiceView>,
    pub delivery_note: Option<DeliveryNoteView>,
}

/// Serializable projection of one order line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub id: String,
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Serializable projection of an invoice.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceView {
    pub id: String,
    pub invoice_number: String,
    pub total: Decimal,
    pub sent_by_email: bool,
    pub fallback_number: bool,
    pub created_at: DateTime<Utc>,
}

/// Serializable projection of a delivery note.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryNoteView {
    pub id: String,
    pub note_number: String,
    pub delivered: bool,
    pub created_at: DateTime<Utc>,
}

impl OrderView {
    fn assemble(
        order: Order,
        client_code: String,
        client_name: String,
        items: Vec<OrderItem>,
        totals: OrderTotals,
        invoice: Option<Invoice>,
        delivery_note: Option<DeliveryNote>,
    ) -> Self {
        OrderView {
            id: order.id,
            order_number: order.order_number,
            client_id: order.client_id,
            client_code,
            client_name,
            status: order.status,
            notes: order.notes,
            created_at: order.created_at,
            items: items
                .into_iter()
                .map(|item| OrderItemView {
                    id: item.id,
                    product_id: item.product_id,
                    product_code: item.code_snapshot,
                    product_name: item.name_snapshot,
                    quantity: item.quantity,
                    unit_price: item.unit_price.rounded(),
                    tax_rate: item.tax_rate.percent(),
                    subtotal: item.subtotal.rounded(),
                    tax_amount: item.tax_amount.rounded(),
                    total: item.total.rounded(),
                })
                .collect(),
            subtotal: totals.subtotal.rounded(),
            tax_total: totals.tax_total.rounded(),
            surcharge_total: totals.surcharge_total.rounded(),
            grand_total: totals.grand_total.rounded(),
            invoice: invoice.map(|inv| InvoiceView {
                id: inv.id,
                invoice_number: inv.invoice_number,
                total: inv.total.rounded(),
                sent_by_email: inv.sent_by_email,
                fallback_number: inv.fallback_number,
                created_at: inv.created_at,
            }),
            delivery_note: delivery_note.map(|note| DeliveryNoteView {
                id: note.id,
                note_number: note.note_number,
                delivered: note.delivered,
                created_at: note.created_at,
            }),
        }
    }
}

// =============================================================================
// Order Service
// =============================================================================

/// The order lifecycle manager.
///
/// Cheap to clone; holds only the database handle.
#[derive(Debug, Clone)]
pub struct OrderService {
    db: Database,
}

impl OrderService {
    /// Creates a new OrderService over the given database.
    pub fn new(db: Database) -> Self {
        OrderService { db }
    }

    /// Creates an order with its line items, reserves stock, refreshes the
    /// client's last visit and generates the invoice — all in one
    /// transaction.
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderView, ServiceError> {
        debug!(client_id = %request.client_id, items = request.items.len(), "create_order");

        validation::validate_uuid(&request.client_id).map_err(CoreError::from)?;

        if request.items.is_empty() {
            return Err(CoreError::EmptyOrder.into());
        }
        if request.items.len() > MAX_ORDER_ITEMS {
            return Err(ServiceError::validation(format!(
                "Order cannot have more than {MAX_ORDER_ITEMS} line items"
            )));
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let Some(client_row) = client::get_by_id(&mut tx, &request.client_id).await? else {
            return Err(CoreError::ClientNotFound(request.client_id).into());
        };

        let allocation = numbering::next_order_number(&mut tx, now).await;
        if allocation.fallback {
            warn!(number = %allocation.number, "Order created with fallback number");
        }

        let order = Order {
            id: Uuid::new_v4().to_string(),
            order_number: allocation.number,
            client_id: client_row.id.clone(),
            status: request.status.unwrap_or(OrderStatus::Pending),
            notes: normalize_notes(request.notes),
            created_at: now,
            updated_at: now,
        };
        order_repo::insert(&mut tx, &order).await?;

        let items = apply_items(&mut tx, &order.id, &request.items, now).await?;
        let totals = OrderTotals::from_items(&items);

        client::touch_last_visit(&mut tx, &client_row.id, now).await?;

        let invoice_row = ensure_invoice(&mut tx, &order, totals.grand_total, now).await?;

        let note = if order.status == OrderStatus::Delivered {
            Some(ensure_delivery_note(&mut tx, &order, now).await?)
        } else {
            None
        };

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_number = %order.order_number,
            invoice_number = %invoice_row.invoice_number,
            total = %invoice_row.total,
            items = items.len(),
            "Order created"
        );

        Ok(OrderView::assemble(
            order,
            client_row.code,
            client_row.name,
            items,
            totals,
            Some(invoice_row),
            note,
        ))
    }

    /// Updates an order. Status and notes are always updatable; supplying
    /// `items` restores the old reservations, replaces the whole item list
    /// under the same all-or-nothing stock policy as creation, and refreshes
    /// the invoice's stored total.
    pub async fn update_order(
        &self,
        order_id: &str,
        request: UpdateOrderRequest,
    ) -> Result<OrderView, ServiceError> {
        debug!(order_id = %order_id, "update_order");

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let Some(mut order) = order_repo::get_by_id(&mut tx, order_id).await? else {
            return Err(CoreError::OrderNotFound(order_id.to_string()).into());
        };

        let items_replaced = request.items.is_some();

        let items = if let Some(item_requests) = request.items {
            if item_requests.is_empty() {
                return Err(CoreError::EmptyOrder.into());
            }
            if item_requests.len() > MAX_ORDER_ITEMS {
                return Err(ServiceError::validation(format!(
                    "Order cannot have more than {MAX_ORDER_ITEMS} line items"
                )));
            }

            release_items(&mut tx, &order.id).await?;
            apply_items(&mut tx, &order.id, &item_requests, now).await?
        } else {
            order_repo::get_items(&mut tx, &order.id).await?
        };

        if let Some(status) = request.status {
            order.status = status;
        }
        if request.notes.is_some() {
            order.notes = normalize_notes(request.notes);
        }
        order.updated_at = now;
        order_repo::update(&mut tx, &order).await?;

        if order.status == OrderStatus::Delivered {
            ensure_delivery_note(&mut tx, &order, now).await?;
        }

        let totals = OrderTotals::from_items(&items);
        if items_replaced {
            refresh_invoice(&mut tx, &order, totals.grand_total, now).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(order_number = %order.order_number, "Order updated");

        self.get_order_detail(order_id).await
    }

    /// Changes an order's status. Transitions are unconstrained by design;
    /// the first arrival at delivered creates the delivery note.
    pub async fn set_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<OrderView, ServiceError> {
        debug!(order_id = %order_id, status = %status.as_str(), "set_status");

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let Some(mut order) = order_repo::get_by_id(&mut tx, order_id).await? else {
            return Err(CoreError::OrderNotFound(order_id.to_string()).into());
        };

        order.status = status;
        order.updated_at = now;
        order_repo::update(&mut tx, &order).await?;

        if status == OrderStatus::Delivered {
            ensure_delivery_note(&mut tx, &order, now).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(order_number = %order.order_number, status = %status.as_str(), "Order status changed");

        self.get_order_detail(order_id).await
    }

    /// Deletes a pending order: restores the stock its non-deposit items
    /// had reserved, removes the invoice and delivery note, then deletes
    /// the order (items cascade).
    ///
    /// Non-pending orders are rejected without side effects.
    pub async fn delete_order(&self, order_id: &str) -> Result<(), ServiceError> {
        debug!(order_id = %order_id, "delete_order");

        let mut tx = self.db.begin().await?;

        let Some(order) = order_repo::get_by_id(&mut tx, order_id).await? else {
            return Err(CoreError::OrderNotFound(order_id.to_string()).into());
        };

        if order.status != OrderStatus::Pending {
            return Err(CoreError::OrderNotPending {
                order_id: order.order_number,
                status: order.status.as_str().to_string(),
            }
            .into());
        }

        release_items(&mut tx, &order.id).await?;
        remove_invoice(&mut tx, &order.id).await?;
        remove_delivery_note(&mut tx, &order.id).await?;
        order_repo::delete(&mut tx, &order.id).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(order_number = %order.order_number, "Order deleted, stock restored");

        Ok(())
    }

    /// Full projection of one order: client labels, items, dynamic totals,
    /// invoice and delivery note.
    pub async fn get_order_detail(&self, order_id: &str) -> Result<OrderView, ServiceError> {
        let mut conn = self.db.acquire().await?;

        let Some(order) = order_repo::get_by_id(&mut conn, order_id).await? else {
            return Err(CoreError::OrderNotFound(order_id.to_string()).into());
        };

        let Some(client_row) = client::get_by_id(&mut conn, &order.client_id).await? else {
            return Err(CoreError::ClientNotFound(order.client_id).into());
        };

        let items = order_repo::get_items(&mut conn, &order.id).await?;
        let totals = OrderTotals::from_items(&items);
        let invoice = invoice_repo::get_by_order(&mut conn, &order.id).await?;
        let note = delivery_repo::get_by_order(&mut conn, &order.id).await?;

        Ok(OrderView::assemble(
            order,
            client_row.code,
            client_row.name,
            items,
            totals,
            invoice,
            note,
        ))
    }
}

// =============================================================================
// Internals
// =============================================================================

/// Validates and applies requested lines: freezes product price/VAT into new
/// items, reserves stock for non-deposit products, persists each line.
///
/// Hard-abort policy: an unknown product id or an invalid quantity fails the
/// whole operation — lines are never silently dropped.
async fn apply_items(
    conn: &mut SqliteConnection,
    order_id: &str,
    requests: &[OrderItemRequest],
    now: DateTime<Utc>,
) -> Result<Vec<OrderItem>, ServiceError> {
    let mut items = Vec::with_capacity(requests.len());

    for request in requests {
        validation::validate_uuid(&request.product_id).map_err(CoreError::from)?;
        validation::validate_quantity(request.quantity).map_err(CoreError::from)?;

        let Some(found) = product::get_by_id(&mut *conn, &request.product_id).await? else {
            return Err(ServiceError::validation(format!(
                "Order references an unknown product: {}",
                request.product_id
            )));
        };

        let mut item = OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_id: found.id.clone(),
            code_snapshot: found.code.clone(),
            name_snapshot: found.name.clone(),
            quantity: request.quantity,
            unit_price: found.price,
            tax_rate: found.tax_rate,
            subtotal: Default::default(),
            tax_amount: Default::default(),
            total: Default::default(),
            created_at: now,
        };
        item.compute_amounts();

        if !found.is_deposit {
            let reserved =
                product::try_reserve_stock(&mut *conn, &found.id, request.quantity).await?;
            if !reserved {
                return Err(CoreError::InsufficientStock {
                    product: found.name,
                    available: found.stock,
                    requested: request.quantity,
                }
                .into());
            }
        }

        order_repo::insert_item(&mut *conn, &item).await?;
        items.push(item);
    }

    Ok(items)
}

/// Restores the stock reserved by an order's non-deposit items and deletes
/// the items. Used by item replacement and by order deletion.
async fn release_items(conn: &mut SqliteConnection, order_id: &str) -> Result<(), ServiceError> {
    let existing = order_repo::get_items(&mut *conn, order_id).await?;

    for item in &existing {
        let Some(found) = product::get_by_id(&mut *conn, &item.product_id).await? else {
            // The FK guarantees the row; products are only ever soft-deleted.
            return Err(ServiceError::internal(format!(
                "Product {} referenced by order {} is missing",
                item.product_id, order_id
            )));
        };

        if !found.is_deposit {
            product::restore_stock(&mut *conn, &found.id, item.quantity).await?;
        }
    }

    order_repo::delete_items(&mut *conn, order_id).await?;
    Ok(())
}

/// Blank or whitespace-only notes collapse to None.
fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.and_then(|n| {
        let trimmed = n.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_notes() {
        assert_eq!(normalize_notes(None), None);
        assert_eq!(normalize_notes(Some("".to_string())), None);
        assert_eq!(normalize_notes(Some("   ".to_string())), None);
        assert_eq!(
            normalize_notes(Some("  urgent  ".to_string())),
            Some("urgent".to_string())
        );
    }
}
