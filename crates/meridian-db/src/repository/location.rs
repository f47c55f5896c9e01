//! # Location Repository
//!
//! Database operations for stock locations (warehouses, zones, bins).

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use meridian_core::Location;

/// Repository for location database operations.
#[derive(Debug, Clone)]
pub struct LocationRepository {
    pool: SqlitePool,
}

impl LocationRepository {
    /// Creates a new LocationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LocationRepository { pool }
    }

    /// Inserts a location.
    pub async fn insert(&self, location: &Location) -> DbResult<()> {
        debug!(id = %location.id, code = %location.code, kind = %location.kind, "Inserting location");

        sqlx::query(
            r#"
            INSERT INTO locations (id, code, name, kind, parent_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&location.id)
        .bind(&location.code)
        .bind(&location.name)
        .bind(location.kind)
        .bind(&location.parent_id)
        .bind(location.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a location by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, code, name, kind, parent_id, created_at FROM locations WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    /// Gets a location by business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, code, name, kind, parent_id, created_at FROM locations WHERE code = ?1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    /// Lists all locations ordered by code.
    pub async fn list(&self) -> DbResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, code, name, kind, parent_id, created_at FROM locations ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    /// Fails with NotFound unless the location exists.
    pub async fn require(&self, id: &str) -> DbResult<Location> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Location", id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use meridian_core::LocationKind;
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn location(code: &str, kind: LocationKind, parent_id: Option<String>) -> Location {
        Location {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: format!("Location {code}"),
            kind,
            parent_id,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let repo = db.locations();

        let warehouse = location("WH1", LocationKind::Warehouse, None);
        repo.insert(&warehouse).await.unwrap();

        let bin = location("WH1-A-01", LocationKind::Bin, Some(warehouse.id.clone()));
        repo.insert(&bin).await.unwrap();

        let stored = repo.get(&bin.id).await.unwrap().unwrap();
        assert_eq!(stored.code, "WH1-A-01");
        assert_eq!(stored.kind, LocationKind::Bin);
        assert_eq!(stored.parent_id.as_deref(), Some(warehouse.id.as_str()));

        let by_code = repo.get_by_code("WH1").await.unwrap().unwrap();
        assert_eq!(by_code.id, warehouse.id);

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].code, "WH1");
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        let repo = db.locations();

        repo.insert(&location("WH1", LocationKind::Warehouse, None))
            .await
            .unwrap();
        let err = repo
            .insert(&location("WH1", LocationKind::Warehouse, None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_require_missing() {
        let db = test_db().await;
        let err = db.locations().require("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
