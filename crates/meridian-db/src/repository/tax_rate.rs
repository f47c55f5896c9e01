//! # Tax Rate Repository
//!
//! The tax rate catalog. Rates here are picked when invoice lines are
//! written; the line then snapshots the basis points, so editing or
//! deactivating a catalog entry never rewrites history.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// One catalog entry. Named "row" to keep it apart from the
/// [`meridian_core::TaxRate`] value object used for arithmetic.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaxRateRow {
    pub id: String,
    pub name: String,
    pub rate_bps: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Repository for tax rate database operations.
#[derive(Debug, Clone)]
pub struct TaxRateRepository {
    pool: SqlitePool,
}

impl TaxRateRepository {
    /// Creates a new TaxRateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TaxRateRepository { pool }
    }

    /// Inserts a catalog entry.
    pub async fn insert(&self, rate: &TaxRateRow) -> DbResult<()> {
        debug!(id = %rate.id, name = %rate.name, rate_bps = rate.rate_bps, "Inserting tax rate");

        sqlx::query(
            r#"
            INSERT INTO tax_rates (id, name, rate_bps, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&rate.id)
        .bind(&rate.name)
        .bind(rate.rate_bps)
        .bind(rate.is_active)
        .bind(rate.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a catalog entry by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<TaxRateRow>> {
        let rate = sqlx::query_as::<_, TaxRateRow>(
            "SELECT id, name, rate_bps, is_active, created_at FROM tax_rates WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rate)
    }

    /// Active rates, the ones offered when writing new lines.
    pub async fn list_active(&self) -> DbResult<Vec<TaxRateRow>> {
        let rates = sqlx::query_as::<_, TaxRateRow>(
            "SELECT id, name, rate_bps, is_active, created_at \
             FROM tax_rates WHERE is_active = 1 ORDER BY rate_bps",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rates)
    }

    /// Deactivates a rate so it stops being offered for new lines.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE tax_rates SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::DbError::not_found("Tax rate", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn rate(name: &str, rate_bps: u32) -> TaxRateRow {
        TaxRateRow {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            rate_bps,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_list_deactivate() {
        let db = test_db().await;
        let repo = db.tax_rates();

        let standard = rate("Standard 17%", 1700);
        let zero = rate("Zero-rated", 0);
        repo.insert(&standard).await.unwrap();
        repo.insert(&zero).await.unwrap();

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].rate_bps, 0);
        assert_eq!(active[1].rate_bps, 1700);

        repo.deactivate(&zero.id).await.unwrap();
        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Standard 17%");

        let stored = repo.get(&zero.id).await.unwrap().unwrap();
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = test_db().await;
        let repo = db.tax_rates();

        repo.insert(&rate("Standard", 1700)).await.unwrap();
        let err = repo.insert(&rate("Standard", 1800)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_deactivate_missing() {
        let db = test_db().await;
        let err = db.tax_rates().deactivate("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
