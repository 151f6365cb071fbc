//! # Catalog Service
//!
//! Thin read/write surface over the product directory. Nothing here is
//! lifecycle-critical — the hard rules (frozen snapshots, atomic stock
//! reservation) live in the order lifecycle; this service validates input,
//! enforces code uniqueness and projects products for callers.
//!
//! Stock is NOT writable here: it only moves through order operations.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use botica_core::{validation, CoreError, Money, Product, TaxRate, ValidationError};
use botica_db::repository::product;
use botica_db::Database;

use crate::error::ServiceError;

// =============================================================================
// Requests / Views
// =============================================================================

/// Input for creating or updating a catalog product.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Sale price without VAT.
    pub price: Decimal,
    /// VAT percent, one of 4, 10 or 21.
    pub tax_rate: Decimal,
    /// Explicit surcharge percent; None derives from the VAT rate.
    pub surcharge_rate: Option<Decimal>,
    /// Initial stock; ignored on update (stock only moves through orders).
    pub stock: i64,
    pub min_stock: i64,
    pub is_deposit: bool,
}

/// Serializable projection of a catalog product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Decimal,
    pub price_with_tax: Decimal,
    pub tax_rate: Decimal,
    /// The surcharge actually applied: explicit override or the canonical
    /// VAT-derived rate.
    pub surcharge_rate: Decimal,
    pub stock: i64,
    pub min_stock: i64,
    pub stock_low: bool,
    pub is_deposit: bool,
    pub is_active: bool,
}

impl From<Product> for ProductView {
    fn from(p: Product) -> Self {
        ProductView {
            price: p.price.rounded(),
            price_with_tax: p.price_with_tax().rounded(),
            tax_rate: p.tax_rate.percent(),
            surcharge_rate: p.effective_surcharge_rate(),
            stock_low: p.is_stock_low(),
            id: p.id,
            code: p.code,
            name: p.name,
            description: p.description,
            category: p.category,
            stock: p.stock,
            min_stock: p.min_stock,
            is_deposit: p.is_deposit,
            is_active: p.is_active,
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// The product catalog service.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    /// Creates a new Catalog over the given database.
    pub fn new(db: Database) -> Self {
        Catalog { db }
    }

    fn validate(input: &ProductInput) -> Result<String, ServiceError> {
        let code = validation::validate_code(&input.code).map_err(CoreError::from)?;
        validation::validate_name(&input.name).map_err(CoreError::from)?;
        validation::validate_price(input.price).map_err(CoreError::from)?;
        validation::validate_tax_rate(input.tax_rate).map_err(CoreError::from)?;
        if let Some(rate) = input.surcharge_rate {
            validation::validate_surcharge_rate(rate).map_err(CoreError::from)?;
        }
        validation::validate_stock(input.stock).map_err(CoreError::from)?;
        validation::validate_stock(input.min_stock).map_err(CoreError::from)?;
        Ok(code)
    }

    /// Creates a product. The code is normalized to uppercase and must be
    /// unique.
    pub async fn create_product(&self, input: ProductInput) -> Result<ProductView, ServiceError> {
        let code = Self::validate(&input)?;

        let mut conn = self.db.acquire().await?;

        if product::get_by_code(&mut conn, &code).await?.is_some() {
            return Err(CoreError::Validation(ValidationError::Duplicate {
                field: "code".to_string(),
                value: code,
            })
            .into());
        }

        let now = Utc::now();
        let row = Product {
            id: product::generate_product_id(),
            code,
            name: input.name.trim().to_string(),
            description: input.description,
            category: input.category,
            price: Money::new(input.price),
            tax_rate: TaxRate::new(input.tax_rate),
            surcharge_rate: input.surcharge_rate,
            stock: input.stock,
            min_stock: input.min_stock,
            is_deposit: input.is_deposit,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        product::insert(&mut conn, &row).await?;

        info!(code = %row.code, "Product created");

        Ok(row.into())
    }

    /// Updates a product's catalog attributes. Stock and creation timestamp
    /// are preserved.
    pub async fn update_product(
        &self,
        id: &str,
        input: ProductInput,
    ) -> Result<ProductView, ServiceError> {
        let code = Self::validate(&input)?;

        let mut conn = self.db.acquire().await?;

        let Some(existing) = product::get_by_id(&mut conn, id).await? else {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        };

        if let Some(other) = product::get_by_code(&mut conn, &code).await? {
            if other.id != existing.id {
                return Err(CoreError::Validation(ValidationError::Duplicate {
                    field: "code".to_string(),
                    value: code,
                })
                .into());
            }
        }

        let row = Product {
            code,
            name: input.name.trim().to_string(),
            description: input.description,
            category: input.category,
            price: Money::new(input.price),
            tax_rate: TaxRate::new(input.tax_rate),
            surcharge_rate: input.surcharge_rate,
            min_stock: input.min_stock,
            is_deposit: input.is_deposit,
            updated_at: Utc::now(),
            ..existing
        };
        product::update(&mut conn, &row).await?;

        info!(code = %row.code, "Product updated");

        Ok(row.into())
    }

    /// Soft-deletes a product. Historical orders keep their snapshots.
    pub async fn deactivate_product(&self, id: &str) -> Result<(), ServiceError> {
        let mut conn = self.db.acquire().await?;
        product::soft_delete(&mut conn, id).await?;

        info!(id = %id, "Product deactivated");
        Ok(())
    }

    /// Gets one product.
    pub async fn get_product(&self, id: &str) -> Result<ProductView, ServiceError> {
        let mut conn = self.db.acquire().await?;
        match product::get_by_id(&mut conn, id).await? {
            Some(found) => Ok(found.into()),
            None => Err(CoreError::ProductNotFound(id.to_string()).into()),
        }
    }

    /// Searches active products by code or name fragment.
    pub async fn search_products(
        &self,
        term: &str,
        limit: u32,
    ) -> Result<Vec<ProductView>, ServiceError> {
        let mut conn = self.db.acquire().await?;
        let found = product::search(&mut conn, term, limit).await?;
        Ok(found.into_iter().map(ProductView::from).collect())
    }

    /// Lists active products at or below their stock threshold.
    pub async fn stock_low_products(&self) -> Result<Vec<ProductView>, ServiceError> {
        let mut conn = self.db.acquire().await?;
        let found = product::list_stock_low(&mut conn).await?;
        Ok(found.into_iter().map(ProductView::from).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use botica_db::DbConfig;
    use rust_decimal_macros::dec;

    fn input(code: &str, vat: Decimal) -> ProductInput {
        ProductInput {
            code: code.to_string(),
            name: "Paracetamol 1g 40 comp".to_string(),
            description: None,
            category: Some("Analgesics".to_string()),
            price: dec!(3.20),
            tax_rate: vat,
            surcharge_rate: None,
            stock: 10,
            min_stock: 3,
            is_deposit: false,
        }
    }

    async fn catalog() -> Catalog {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Catalog::new(db)
    }

    #[tokio::test]
    async fn test_create_normalizes_code_and_derives_surcharge() {
        let catalog = catalog().await;

        let view = catalog.create_product(input("par-1g", dec!(21))).await.unwrap();

        assert_eq!(view.code, "PAR-1G");
        assert_eq!(view.surcharge_rate, dec!(5.2));
        assert_eq!(view.price, dec!(3.20));
        // 3.20 + 21% = 3.872 → 3.87 at the serialization boundary
        assert_eq!(view.price_with_tax, dec!(3.87));
        assert!(!view.stock_low);
        assert!(view.is_active);
    }

    #[tokio::test]
    async fn test_off_catalog_vat_rate_is_rejected() {
        let catalog = catalog().await;

        let err = catalog.create_product(input("PAR-1G", dec!(7))).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected_before_insert() {
        let catalog = catalog().await;

        catalog.create_product(input("PAR-1G", dec!(21))).await.unwrap();
        let err = catalog
            .create_product(input("par-1g", dec!(10)))
            .await
            .unwrap_err();

        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
        assert!(err.message.contains("PAR-1G"));
    }

    #[tokio::test]
    async fn test_update_keeps_stock_and_respects_uniqueness() {
        let catalog = catalog().await;

        let a = catalog.create_product(input("PAR-1G", dec!(21))).await.unwrap();
        catalog.create_product(input("IBU-600", dec!(21))).await.unwrap();

        // Renaming A to B's code fails
        let err = catalog
            .update_product(&a.id, input("IBU-600", dec!(21)))
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);

        // A normal update keeps the stock untouched
        let mut changed = input("PAR-1G", dec!(10));
        changed.stock = 999; // ignored
        let view = catalog.update_product(&a.id, changed).await.unwrap();
        assert_eq!(view.stock, 10);
        assert_eq!(view.tax_rate, dec!(10));
        assert_eq!(view.surcharge_rate, dec!(1.4));
    }

    #[tokio::test]
    async fn test_explicit_surcharge_override_wins_in_view() {
        let catalog = catalog().await;

        let mut with_override = input("PAR-1G", dec!(21));
        with_override.surcharge_rate = Some(dec!(0.5));

        let view = catalog.create_product(with_override).await.unwrap();
        assert_eq!(view.surcharge_rate, dec!(0.5));
    }

    #[tokio::test]
    async fn test_deactivated_product_leaves_search() {
        let catalog = catalog().await;

        let view = catalog.create_product(input("PAR-1G", dec!(21))).await.unwrap();
        catalog.deactivate_product(&view.id).await.unwrap();

        let results = catalog.search_products("PAR", 10).await.unwrap();
        assert!(results.is_empty());

        let found = catalog.get_product(&view.id).await.unwrap();
        assert!(!found.is_active);
    }

    #[tokio::test]
    async fn test_stock_low_listing() {
        let catalog = catalog().await;

        let mut low = input("IBU-600", dec!(21));
        low.stock = 2;
        low.min_stock = 3;
        catalog.create_product(low).await.unwrap();
        catalog.create_product(input("PAR-1G", dec!(21))).await.unwrap();

        let listed = catalog.stock_low_products().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].code, "IBU-600");
        assert!(listed[0].stock_low);
    }
}
