//! # Client Directory Service
//!
//! Thin read/write surface over the client directory: validated creation
//! and updates, code uniqueness, soft-delete, search. The last-visit
//! timestamp is owned by the order lifecycle and is not writable here.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use botica_core::{validation, Client, CoreError, ValidationError};
use botica_db::repository::client;
use botica_db::Database;

use crate::error::ServiceError;

// =============================================================================
// Requests / Views
// =============================================================================

/// Input for creating or updating a client.
#[derive(Debug, Clone)]
pub struct ClientInput {
    pub code: String,
    pub name: String,
    pub fiscal_name: Option<String>,
    pub tax_id: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bank_account: Option<String>,
    pub notes: Option<String>,
}

/// Serializable projection of a client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientView {
    pub id: String,
    pub code: String,
    pub name: String,
    pub fiscal_name: Option<String>,
    pub tax_id: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub bank_account: Option<String>,
    pub notes: Option<String>,
    pub last_visit_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl From<Client> for ClientView {
    fn from(c: Client) -> Self {
        ClientView {
            id: c.id,
            code: c.code,
            name: c.name,
            fiscal_name: c.fiscal_name,
            tax_id: c.tax_id,
            contact: c.contact,
            email: c.email,
            phone: c.phone,
            address: c.address,
            bank_account: c.bank_account,
            notes: c.notes,
            last_visit_at: c.last_visit_at,
            is_active: c.is_active,
        }
    }
}

// =============================================================================
// Client Directory
// =============================================================================

/// The client directory service.
#[derive(Debug, Clone)]
pub struct ClientDirectory {
    db: Database,
}

impl ClientDirectory {
    /// Creates a new ClientDirectory over the given database.
    pub fn new(db: Database) -> Self {
        ClientDirectory { db }
    }

    fn validate(input: &ClientInput) -> Result<String, ServiceError> {
        let code = validation::validate_code(&input.code).map_err(CoreError::from)?;
        validation::validate_name(&input.name).map_err(CoreError::from)?;

        if let Some(email) = input.email.as_deref() {
            if !email.trim().is_empty() && !email.contains('@') {
                return Err(CoreError::Validation(ValidationError::InvalidFormat {
                    field: "email".to_string(),
                    reason: "must be an email address".to_string(),
                })
                .into());
            }
        }

        Ok(code)
    }

    /// Creates a client. The code is normalized to uppercase and must be
    /// unique.
    pub async fn create_client(&self, input: ClientInput) -> Result<ClientView, ServiceError> {
        let code = Self::validate(&input)?;

        let mut conn = self.db.acquire().await?;

        if client::get_by_code(&mut conn, &code).await?.is_some() {
            return Err(CoreError::Validation(ValidationError::Duplicate {
                field: "code".to_string(),
                value: code,
            })
            .into());
        }

        let row = Client {
            id: Uuid::new_v4().to_string(),
            code,
            name: input.name.trim().to_string(),
            fiscal_name: input.fiscal_name,
            tax_id: input.tax_id,
            contact: input.contact,
            email: input.email,
            phone: input.phone,
            address: input.address,
            bank_account: input.bank_account,
            notes: input.notes,
            last_visit_at: None,
            is_active: true,
            created_at: Utc::now(),
        };
        client::insert(&mut conn, &row).await?;

        info!(code = %row.code, "Client created");

        Ok(row.into())
    }

    /// Updates a client's directory data. The last-visit timestamp is
    /// preserved; it only moves when the client places an order.
    pub async fn update_client(
        &self,
        id: &str,
        input: ClientInput,
    ) -> Result<ClientView, ServiceError> {
        let code = Self::validate(&input)?;

        let mut conn = self.db.acquire().await?;

        let Some(existing) = client::get_by_id(&mut conn, id).await? else {
            return Err(CoreError::ClientNotFound(id.to_string()).into());
        };

        if let Some(other) = client::get_by_code(&mut conn, &code).await? {
            if other.id != existing.id {
                return Err(CoreError::Validation(ValidationError::Duplicate {
                    field: "code".to_string(),
                    value: code,
                })
                .into());
            }
        }

        let row = Client {
            code,
            name: input.name.trim().to_string(),
            fiscal_name: input.fiscal_name,
            tax_id: input.tax_id,
            contact: input.contact,
            email: input.email,
            phone: input.phone,
            address: input.address,
            bank_account: input.bank_account,
            notes: input.notes,
            ..existing
        };
        client::update(&mut conn, &row).await?;

        info!(code = %row.code, "Client updated");

        Ok(row.into())
    }

    /// Soft-deletes a client; historical orders keep referencing it.
    pub async fn deactivate_client(&self, id: &str) -> Result<(), ServiceError> {
        let mut conn = self.db.acquire().await?;
        client::soft_delete(&mut conn, id).await?;

        info!(id = %id, "Client deactivated");
        Ok(())
    }

    /// Gets one client.
    pub async fn get_client(&self, id: &str) -> Result<ClientView, ServiceError> {
        let mut conn = self.db.acquire().await?;
        match client::get_by_id(&mut conn, id).await? {
            Some(found) => Ok(found.into()),
            None => Err(CoreError::ClientNotFound(id.to_string()).into()),
        }
    }

    /// Searches active clients by code or name fragment.
    pub async fn search_clients(
        &self,
        term: &str,
        limit: u32,
    ) -> Result<Vec<ClientView>, ServiceError> {
        let mut conn = self.db.acquire().await?;
        let found = client::search(&mut conn, term, limit).await?;
        Ok(found.into_iter().map(ClientView::from).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use botica_db::DbConfig;

    fn input(code: &str, name: &str) -> ClientInput {
        ClientInput {
            code: code.to_string(),
            name: name.to_string(),
            fiscal_name: Some(format!("{name} S.L.")),
            tax_id: Some("B81234561".to_string()),
            contact: None,
            email: Some("pedidos@example.com".to_string()),
            phone: None,
            address: None,
            bank_account: None,
            notes: None,
        }
    }

    async fn directory() -> ClientDirectory {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        ClientDirectory::new(db)
    }

    #[tokio::test]
    async fn test_create_normalizes_code() {
        let directory = directory().await;

        let view = directory
            .create_client(input("farm-001", "Farmacia Central"))
            .await
            .unwrap();

        assert_eq!(view.code, "FARM-001");
        assert!(view.is_active);
        assert!(view.last_visit_at.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let directory = directory().await;

        directory
            .create_client(input("FARM-001", "Farmacia Central"))
            .await
            .unwrap();
        let err = directory
            .create_client(input("farm-001", "Otra Farmacia"))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("FARM-001"));
    }

    #[tokio::test]
    async fn test_malformed_email_rejected() {
        let directory = directory().await;

        let mut bad = input("FARM-001", "Farmacia Central");
        bad.email = Some("not-an-email".to_string());

        let err = directory.create_client(bad).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_update_and_deactivate() {
        let directory = directory().await;

        let created = directory
            .create_client(input("FARM-001", "Farmacia Central"))
            .await
            .unwrap();

        let updated = directory
            .update_client(&created.id, input("FARM-001", "Farmacia Central Renovada"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Farmacia Central Renovada");

        directory.deactivate_client(&created.id).await.unwrap();
        let results = directory.search_clients("FARM", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_client_is_not_found() {
        let directory = directory().await;

        let err = directory
            .update_client("ghost", input("FARM-001", "Farmacia Central"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
