//! # Domain Types
//!
//! Core domain types for the distributor back office.
//!
//! ## Entity Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Domain Entities                                │
//! │                                                                         │
//! │   Client ───1:N──► Order ───1:N──► OrderItem ───N:1──► Product         │
//! │                      │                                                  │
//! │                      ├──────1:0..1──► Invoice      (auto-generated)    │
//! │                      └──────1:0..1──► DeliveryNote (on delivery)       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (code, order_number, invoice_number, ...) - human-readable
//!
//! ## Snapshot Pattern
//! An [`OrderItem`] freezes the product's price and VAT rate at order time.
//! Later catalog price changes never alter an existing order or its invoice.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{Money, TaxRate};

// =============================================================================
// Client
// =============================================================================

/// A pharmacy client of the distributor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code, unique, stored uppercase (e.g. "FARM-017").
    pub code: String,

    /// Display name.
    pub name: String,

    /// Registered fiscal name for invoicing.
    pub fiscal_name: Option<String>,

    /// Fiscal identification number (CIF/NIF).
    pub tax_id: Option<String>,

    /// Contact person.
    pub contact: Option<String>,

    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,

    /// IBAN used for direct debit.
    pub bank_account: Option<String>,

    pub notes: Option<String>,

    /// Refreshed every time the client places an order.
    pub last_visit_at: Option<DateTime<Utc>>,

    /// Soft-delete flag.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product with stock and tax attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code, unique, stored uppercase (e.g. "PAR-1G").
    pub code: String,

    /// Display name shown on order forms and invoices.
    pub name: String,

    pub description: Option<String>,

    pub category: Option<String>,

    /// Sale price to pharmacies, without VAT.
    pub price: Money,

    /// VAT rate in percent; the catalog constrains it to {4, 10, 21}.
    pub tax_rate: TaxRate,

    /// Explicit equivalence-surcharge override in percent.
    /// When absent or zero the canonical rate derived from [`Self::tax_rate`]
    /// applies; see [`Product::effective_surcharge_rate`].
    pub surcharge_rate: Option<Decimal>,

    /// Units on hand. Never negative; reservations are conditional decrements.
    pub stock: i64,

    /// Threshold below which the product counts as stock-low.
    pub min_stock: i64,

    /// Deposit products are stocked by third parties and are exempt from
    /// stock reservation on order.
    pub is_deposit: bool,

    /// Soft-delete flag.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The surcharge rate actually applied to this product's lines, in percent.
    ///
    /// An explicit positive `surcharge_rate` wins; otherwise the canonical
    /// VAT→surcharge lookup decides (4→0.5, 10→1.4, 21→5.2, other→0).
    pub fn effective_surcharge_rate(&self) -> Decimal {
        match self.surcharge_rate {
            Some(rate) if rate > Decimal::ZERO => rate,
            _ => self.tax_rate.surcharge_rate(),
        }
    }

    /// Sale price with VAT included.
    pub fn price_with_tax(&self) -> Money {
        self.price + self.price.apply_percent(self.tax_rate.percent())
    }

    /// A product is stock-low when its stock is at or below its threshold.
    #[inline]
    pub fn is_stock_low(&self) -> bool {
        self.stock <= self.min_stock
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The lifecycle status of an order.
///
/// The enum is deliberately unconstrained: any status may be assigned at any
/// time. The single lifecycle rule enforced elsewhere is that only `Pending`
/// orders can be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Just placed, editable, deletable.
    Pending,
    /// Accepted by the distributor.
    Confirmed,
    /// Goods handed over; a delivery note exists from this point on.
    Delivered,
    /// Invoice sent to the client's accounting.
    Invoiced,
}

impl OrderStatus {
    /// Stable text form used in the database and in views.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Invoiced => "invoiced",
        }
    }

    /// Parses the stored text form; unknown values fall back to `Pending`.
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "confirmed" => OrderStatus::Confirmed,
            "delivered" => OrderStatus::Delivered,
            "invoiced" => OrderStatus::Invoiced,
            _ => OrderStatus::Pending,
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

// =============================================================================
// Order
// =============================================================================

/// A client's order for a set of products.
///
/// Totals are NOT fields here. They are derived from the owned line items
/// via [`crate::money::OrderTotals::from_items`] on every read, so an order
/// can never hold a stale cached total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,

    /// Human-readable number, unique, format `P-YYYYMMDD-NNN`.
    pub order_number: String,

    /// Owning client (required).
    pub client_id: String,

    pub status: OrderStatus,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Order Item
// =============================================================================

/// One product-quantity line within an order.
///
/// Uses the snapshot pattern: `code_snapshot`, `name_snapshot`, `unit_price`
/// and `tax_rate` are frozen copies of the product's values at order time.
/// The derived amounts are computed once by [`OrderItem::compute_amounts`]
/// and persisted, unlike the order's fully dynamic totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,

    /// Product code at order time (frozen).
    pub code_snapshot: String,
    /// Product name at order time (frozen).
    pub name_snapshot: String,

    /// Units ordered, always > 0.
    pub quantity: i64,
    /// Unit price without VAT at order time (frozen).
    pub unit_price: Money,
    /// VAT rate at order time (frozen).
    pub tax_rate: TaxRate,

    /// quantity × unit_price, persisted.
    pub subtotal: Money,
    /// subtotal × tax_rate / 100, persisted.
    pub tax_amount: Money,
    /// subtotal + tax_amount, persisted.
    pub total: Money,

    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Recomputes the persisted derived amounts from quantity, unit price
    /// and VAT rate. Call after constructing or mutating a line.
    pub fn compute_amounts(&mut self) {
        self.subtotal = self.unit_price.multiply_quantity(self.quantity);
        self.tax_amount = self.subtotal.apply_percent(self.tax_rate.percent());
        self.total = self.subtotal + self.tax_amount;
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// The financial document derived 1:1 from an order.
///
/// Created automatically right after an order is first persisted; its stored
/// total is refreshed whenever the parent order's items change, and the row
/// is deleted with its order. The Order↔Invoice relation is a plain unique
/// foreign key — lookup is always "the invoice whose order_id is X".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,

    /// Human-readable number, unique, format `VF/NNN/YY`.
    pub invoice_number: String,

    /// Parent order (unique — at most one invoice per order).
    pub order_id: String,

    /// Copy of the order's computed grand total at generation/refresh time,
    /// rounded to 2 decimals.
    pub total: Money,

    /// Whether the invoice was sent to the client by email.
    pub sent_by_email: bool,

    /// True when the number came from the timestamp fallback path instead of
    /// the sequential generator. Kept queryable so such documents can be
    /// found and renumbered.
    pub fallback_number: bool,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Delivery Note
// =============================================================================

/// The goods-delivery document for an order.
///
/// Created automatically the first time an order transitions to
/// [`OrderStatus::Delivered`]; at most one per order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryNote {
    pub id: String,

    /// Human-readable number, unique, format `ALB-YYYYMMDD-NNN`.
    pub note_number: String,

    /// Parent order (unique).
    pub order_id: String,

    /// Whether the goods were confirmed received.
    pub delivered: bool,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(tax: Decimal, surcharge: Option<Decimal>) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            code: "PAR-1G".to_string(),
            name: "Paracetamol 1g".to_string(),
            description: None,
            category: Some("Analgesics".to_string()),
            price: Money::new(dec!(3.20)),
            tax_rate: TaxRate::new(tax),
            surcharge_rate: surcharge,
            stock: 10,
            min_stock: 3,
            is_deposit: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_effective_surcharge_prefers_explicit_rate() {
        let p = product(dec!(21), Some(dec!(1.0)));
        assert_eq!(p.effective_surcharge_rate(), dec!(1.0));
    }

    #[test]
    fn test_effective_surcharge_derives_from_vat_when_unset_or_zero() {
        assert_eq!(product(dec!(21), None).effective_surcharge_rate(), dec!(5.2));
        assert_eq!(
            product(dec!(10), Some(dec!(0))).effective_surcharge_rate(),
            dec!(1.4)
        );
        assert_eq!(product(dec!(4), None).effective_surcharge_rate(), dec!(0.5));
    }

    #[test]
    fn test_price_with_tax() {
        let p = product(dec!(21), None);
        // 3.20 + 21% = 3.872
        assert_eq!(p.price_with_tax().amount(), dec!(3.872));
    }

    #[test]
    fn test_stock_low() {
        let mut p = product(dec!(21), None);
        assert!(!p.is_stock_low());
        p.stock = 3;
        assert!(p.is_stock_low());
        p.stock = 0;
        assert!(p.is_stock_low());
    }

    #[test]
    fn test_order_status_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Delivered,
            OrderStatus::Invoiced,
        ] {
            assert_eq!(OrderStatus::from_str_or_default(status.as_str()), status);
        }
        // Unknown text falls back to Pending
        assert_eq!(
            OrderStatus::from_str_or_default("garbage"),
            OrderStatus::Pending
        );
    }

    #[test]
    fn test_item_compute_amounts() {
        let mut item = OrderItem {
            id: "i1".to_string(),
            order_id: "o1".to_string(),
            product_id: "p1".to_string(),
            code_snapshot: "PAR-1G".to_string(),
            name_snapshot: "Paracetamol 1g".to_string(),
            quantity: 5,
            unit_price: Money::new(dec!(3.20)),
            tax_rate: TaxRate::new(dec!(10)),
            subtotal: Money::zero(),
            tax_amount: Money::zero(),
            total: Money::zero(),
            created_at: Utc::now(),
        };
        item.compute_amounts();

        assert_eq!(item.subtotal.amount(), dec!(16.00));
        assert_eq!(item.tax_amount.amount(), dec!(1.6000));
        assert_eq!(item.total.amount(), dec!(17.60));
    }
}
