//! # botica-orders: Lifecycle Services for Botica ERP
//!
//! The orchestration layer request handlers call into. Every external
//! operation runs in exactly one database transaction: it commits once on
//! success, and any error on the way rolls the whole operation back.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     create_order, end to end                            │
//! │                                                                         │
//! │  OrderService::create_order(request)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate request (client id, item list, quantities)                   │
//! │       │                                                                 │
//! │       ▼  BEGIN TRANSACTION                                             │
//! │  allocate order number (P-YYYYMMDD-NNN)                                │
//! │  insert order ──► freeze prices into items ──► reserve stock           │
//! │       │              (any failure here = ROLLBACK, nothing persisted)  │
//! │       ▼                                                                 │
//! │  refresh client last-visit                                             │
//! │  ensure invoice (VF/NNN/YY, total = computed grand total)              │
//! │       │                                                                 │
//! │       ▼  COMMIT                                                        │
//! │  OrderView { items, totals, invoice }                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`lifecycle`] - [`lifecycle::OrderService`]: create/update/delete/status/detail
//! - [`invoicing`] - invoice synchronizer (internal) + [`invoicing::mark_sent`]
//! - [`delivery`] - delivery note synchronizer (internal) + [`delivery::mark_delivered`]
//! - [`numbering`] - document number generator (no external surface)
//! - [`catalog`] / [`clients`] - validated directory CRUD, no lifecycle rules
//! - [`error`] - [`error::ServiceError`], what callers see

pub mod catalog;
pub mod clients;
pub mod delivery;
pub mod error;
pub mod invoicing;
pub mod lifecycle;
pub(crate) mod numbering;

pub use catalog::{Catalog, ProductInput, ProductView};
pub use clients::{ClientDirectory, ClientInput, ClientView};
pub use error::{ErrorCode, ServiceError};
pub use lifecycle::{
    CreateOrderRequest, DeliveryNoteView, InvoiceView, OrderItemRequest, OrderItemView,
    OrderService, OrderView, UpdateOrderRequest,
};
