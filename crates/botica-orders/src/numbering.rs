//! # Document Number Generator
//!
//! Human-readable sequential identifiers for the three document kinds:
//!
//! | Document      | Format             | Scope        |
//! |---------------|--------------------|--------------|
//! | Order         | `P-YYYYMMDD-NNN`   | calendar day |
//! | Invoice       | `VF/NNN/YY`        | 2-digit year |
//! | Delivery note | `ALB-YYYYMMDD-NNN` | calendar day |
//!
//! ## Algorithm
//! Fetch every persisted number in the scope, parse the trailing counter
//! NUMERICALLY, skip anything malformed, and increment the maximum (001 when
//! the scope is empty). Counters are zero-padded to 3 digits and simply grow
//! wider past 999 — nothing compares numbers lexicographically, so width
//! growth is safe.
//!
//! Invoice numbers additionally re-check the candidate for collisions and
//! keep incrementing until free. This covers two writers computing the same
//! candidate; it is best-effort, not a lock — the UNIQUE constraint has the
//! final word.
//!
//! ## Fallback
//! A numbering failure must never block invoicing. If the scan itself fails,
//! the generator synthesizes a timestamp number with an `ER` marker, logs it
//! at error level, and reports `fallback: true` so the caller can persist
//! the flag and the document stays findable for renumbering.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, error};

use botica_db::repository::{delivery, invoice, order};

/// A generated document number plus how it was obtained.
#[derive(Debug, Clone)]
pub(crate) struct NumberAllocation {
    pub number: String,
    /// True when the number came from the timestamp fallback path.
    pub fallback: bool,
}

/// Largest trailing counter among `XXX-<counter>` style numbers.
///
/// Malformed entries (including `ER` fallback numbers) are skipped.
fn max_dash_counter(numbers: &[String]) -> u64 {
    numbers
        .iter()
        .filter_map(|n| n.rsplit('-').next())
        .filter_map(|tail| tail.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

/// Largest middle counter among `VF/<counter>/<YY>` style numbers.
fn max_slash_counter(numbers: &[String]) -> u64 {
    numbers
        .iter()
        .filter_map(|n| {
            let parts: Vec<&str> = n.split('/').collect();
            if parts.len() == 3 {
                parts[1].parse::<u64>().ok()
            } else {
                None
            }
        })
        .max()
        .unwrap_or(0)
}

/// Allocates the next order number for the given moment's calendar day.
pub(crate) async fn next_order_number(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
) -> NumberAllocation {
    let prefix = format!("P-{}-", now.format("%Y%m%d"));

    match order::list_numbers_with_prefix(conn, &prefix).await {
        Ok(numbers) => {
            let next = max_dash_counter(&numbers) + 1;
            let number = format!("{prefix}{next:03}");
            debug!(number = %number, "Allocated order number");
            NumberAllocation {
                number,
                fallback: false,
            }
        }
        Err(err) => {
            error!(error = %err, "Order number scan failed, using timestamp fallback");
            NumberAllocation {
                number: format!("P-{}-ER", now.format("%y%m%d%H%M%S")),
                fallback: true,
            }
        }
    }
}

/// Allocates the next delivery note number for the given moment's day.
pub(crate) async fn next_delivery_note_number(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
) -> NumberAllocation {
    let prefix = format!("ALB-{}-", now.format("%Y%m%d"));

    match delivery::list_numbers_with_prefix(conn, &prefix).await {
        Ok(numbers) => {
            let next = max_dash_counter(&numbers) + 1;
            let number = format!("{prefix}{next:03}");
            debug!(number = %number, "Allocated delivery note number");
            NumberAllocation {
                number,
                fallback: false,
            }
        }
        Err(err) => {
            error!(error = %err, "Delivery note number scan failed, using timestamp fallback");
            NumberAllocation {
                number: format!("ALB-{}-ER", now.format("%y%m%d%H%M%S")),
                fallback: true,
            }
        }
    }
}

/// Allocates the next invoice number for the given moment's year, with a
/// collision-retry loop after the candidate is computed.
pub(crate) async fn next_invoice_number(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
) -> NumberAllocation {
    let year = now.format("%y").to_string();

    let numbers = match invoice::list_numbers_with_suffix(conn, &format!("/{year}")).await {
        Ok(numbers) => numbers,
        Err(err) => {
            error!(error = %err, "Invoice number scan failed, using timestamp fallback");
            return NumberAllocation {
                number: format!("VF/{}/ER", now.format("%y%m%d%H%M")),
                fallback: true,
            };
        }
    };

    let mut next = max_slash_counter(&numbers) + 1;

    loop {
        let candidate = format!("VF/{next:03}/{year}");

        match invoice::number_exists(conn, &candidate).await {
            Ok(false) => {
                debug!(number = %candidate, "Allocated invoice number");
                return NumberAllocation {
                    number: candidate,
                    fallback: false,
                };
            }
            Ok(true) => {
                // Someone claimed the candidate between scan and check.
                next += 1;
            }
            Err(err) => {
                error!(error = %err, "Invoice number collision check failed, using timestamp fallback");
                return NumberAllocation {
                    number: format!("VF/{}/ER", now.format("%y%m%d%H%M")),
                    fallback: true,
                };
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use botica_db::{Database, DbConfig};
    use chrono::TimeZone;

    #[test]
    fn test_max_dash_counter() {
        let numbers = vec![
            "P-20260315-001".to_string(),
            "P-20260315-007".to_string(),
            "P-20260315-003".to_string(),
        ];
        assert_eq!(max_dash_counter(&numbers), 7);
        assert_eq!(max_dash_counter(&[]), 0);
    }

    #[test]
    fn test_max_dash_counter_skips_malformed_and_fallback() {
        let numbers = vec![
            "P-20260315-002".to_string(),
            "P-260315120000-ER".to_string(),
            "P-20260315-".to_string(),
        ];
        assert_eq!(max_dash_counter(&numbers), 2);
    }

    #[test]
    fn test_max_dash_counter_handles_wide_counters() {
        // Past 999 the counter widens; numeric parsing keeps counting
        let numbers = vec![
            "P-20260315-999".to_string(),
            "P-20260315-1000".to_string(),
        ];
        assert_eq!(max_dash_counter(&numbers), 1000);
    }

    #[test]
    fn test_max_slash_counter() {
        let numbers = vec![
            "VF/001/26".to_string(),
            "VF/014/26".to_string(),
            "VF/banana/26".to_string(),
            "VF/26".to_string(),
        ];
        assert_eq!(max_slash_counter(&numbers), 14);
    }

    #[tokio::test]
    async fn test_order_numbers_start_at_001_per_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let now = Utc.with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap();
        let allocation = next_order_number(&mut conn, now).await;

        assert_eq!(allocation.number, "P-20260315-001");
        assert!(!allocation.fallback);
    }

    #[tokio::test]
    async fn test_invoice_numbers_start_at_001_per_year() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let now = Utc.with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap();
        let allocation = next_invoice_number(&mut conn, now).await;
        assert_eq!(allocation.number, "VF/001/26");
        assert!(!allocation.fallback);
    }

    #[tokio::test]
    async fn test_scan_failure_degrades_to_flagged_timestamp_number() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        // Sabotage the scope scan; numbering must not block the operation
        sqlx::query("DROP TABLE invoices")
            .execute(&mut *conn)
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2026, 3, 15, 10, 30, 0).unwrap();
        let allocation = next_invoice_number(&mut conn, now).await;

        assert!(allocation.fallback);
        assert_eq!(allocation.number, "VF/2603151030/ER");
    }
}
