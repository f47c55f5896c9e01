//! # Stock Repository
//!
//! Stock levels, transfers, and adjustments. Two write paths exist and they
//! never mix: confirming a movement applies a relative delta under the
//! insufficient-stock guard, while an adjustment sets an absolute count and
//! leaves an audit row. Quants are created lazily; a missing row reads as
//! zero on hand.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::{
    CoreError, MovementStatus, StateError, StockAdjustment, StockMovement, StockQuant,
};

/// One stock level with its location code, for on-hand listings.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockOnHandRow {
    pub product_id: String,
    pub location_id: String,
    pub location_code: String,
    pub quantity: i64,
}

/// Repository for stock database operations.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Gets the quant for a product at a location, if one exists.
    pub async fn get_quant(
        &self,
        product_id: &str,
        location_id: &str,
    ) -> DbResult<Option<StockQuant>> {
        let quant = sqlx::query_as::<_, StockQuant>(
            r#"
            SELECT id, product_id, location_id, quantity, updated_at
            FROM stock_quants
            WHERE product_id = ?1 AND location_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quant)
    }

    /// Quantity on hand for a product at a location; 0 when no quant exists.
    pub async fn on_hand(&self, product_id: &str, location_id: &str) -> DbResult<i64> {
        Ok(self
            .get_quant(product_id, location_id)
            .await?
            .map(|q| q.quantity)
            .unwrap_or(0))
    }

    /// Stock levels across all locations, optionally filtered to one
    /// product. Zero quants are included so a drained location still shows.
    pub async fn stock_on_hand(&self, product_id: Option<&str>) -> DbResult<Vec<StockOnHandRow>> {
        let mut builder = sqlx::QueryBuilder::new(
            r#"
            SELECT q.product_id, q.location_id, l.code AS location_code, q.quantity
            FROM stock_quants q
            JOIN locations l ON l.id = q.location_id
            "#,
        );
        if let Some(product_id) = product_id {
            builder.push(" WHERE q.product_id = ").push_bind(product_id);
        }
        builder.push(" ORDER BY q.product_id, l.code");

        let rows = builder
            .build_query_as::<StockOnHandRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Inserts a draft stock movement.
    pub async fn create_movement(&self, movement: &StockMovement) -> DbResult<()> {
        debug!(
            id = %movement.id,
            product_id = %movement.product_id,
            quantity = movement.quantity,
            source = %movement.source_location_id,
            dest = %movement.dest_location_id,
            "Creating stock movement"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, product_id, quantity, source_location_id, dest_location_id,
                status, movement_date, done_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(movement.quantity)
        .bind(&movement.source_location_id)
        .bind(&movement.dest_location_id)
        .bind(movement.status)
        .bind(movement.movement_date)
        .bind(movement.done_at)
        .bind(movement.created_at)
        .bind(movement.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a stock movement by ID.
    pub async fn get_movement(&self, id: &str) -> DbResult<Option<StockMovement>> {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, quantity, source_location_id, dest_location_id,
                   status, movement_date, done_at, created_at, updated_at
            FROM stock_movements
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movement)
    }

    /// Confirms a draft movement: checks availability at the source, then
    /// moves the quantity. The decrement, the destination upsert, and the
    /// status flip commit together or not at all, so total stock across
    /// locations is conserved.
    pub async fn confirm_movement(&self, id: &str) -> DbResult<StockMovement> {
        let mut tx = self.pool.begin().await?;

        let movement = fetch_movement_on(&mut *tx, id).await?;
        if movement.status != MovementStatus::Draft {
            return Err(movement_not_draft(&movement));
        }

        let available: i64 = sqlx::query_scalar(
            "SELECT quantity FROM stock_quants \
             WHERE product_id = ?1 AND location_id = ?2",
        )
        .bind(&movement.product_id)
        .bind(&movement.source_location_id)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(0);

        if available < movement.quantity {
            return Err(DbError::Domain(CoreError::insufficient_stock(
                movement.product_id.clone(),
                movement.source_location_id.clone(),
                available,
                movement.quantity,
            )));
        }

        let now = Utc::now();

        // quantity >= ?3 repeats the availability check at write time
        let result = sqlx::query(
            r#"
            UPDATE stock_quants
            SET quantity = quantity - ?3, updated_at = ?4
            WHERE product_id = ?1 AND location_id = ?2 AND quantity >= ?3
            "#,
        )
        .bind(&movement.product_id)
        .bind(&movement.source_location_id)
        .bind(movement.quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Domain(CoreError::insufficient_stock(
                movement.product_id.clone(),
                movement.source_location_id.clone(),
                available,
                movement.quantity,
            )));
        }

        upsert_quant_delta(
            &mut *tx,
            &movement.product_id,
            &movement.dest_location_id,
            movement.quantity,
        )
        .await?;

        sqlx::query(
            r#"
            UPDATE stock_movements
            SET status = 'done', done_at = ?2, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            id = %id,
            product_id = %movement.product_id,
            quantity = movement.quantity,
            "Stock movement confirmed"
        );

        Ok(StockMovement {
            status: MovementStatus::Done,
            done_at: Some(now),
            updated_at: now,
            ..movement
        })
    }

    /// Cancels a draft movement. Confirmed movements are immutable history.
    pub async fn cancel_movement(&self, id: &str) -> DbResult<StockMovement> {
        let mut tx = self.pool.begin().await?;

        let movement = fetch_movement_on(&mut *tx, id).await?;
        if movement.status != MovementStatus::Draft {
            return Err(movement_not_draft(&movement));
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE stock_movements SET status = 'cancelled', updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(StockMovement {
            status: MovementStatus::Cancelled,
            updated_at: now,
            ..movement
        })
    }

    /// Sets the absolute quantity for a product at a location and records
    /// the correction as a StockAdjustment, in one transaction.
    pub async fn set_quantity(
        &self,
        product_id: &str,
        location_id: &str,
        new_quantity: i64,
        reason: Option<String>,
    ) -> DbResult<StockAdjustment> {
        let mut tx = self.pool.begin().await?;

        // FK on stock_quants would also catch this, but with a worse error
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations WHERE id = ?1")
            .bind(location_id)
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            return Err(DbError::not_found("Location", location_id));
        }

        let previous: i64 = sqlx::query_scalar(
            "SELECT quantity FROM stock_quants WHERE product_id = ?1 AND location_id = ?2",
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(0);

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO stock_quants (id, product_id, location_id, quantity, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(product_id, location_id)
            DO UPDATE SET quantity = excluded.quantity, updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(product_id)
        .bind(location_id)
        .bind(new_quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let adjustment = StockAdjustment {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            location_id: location_id.to_string(),
            previous_quantity: previous,
            new_quantity,
            reason,
            adjusted_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO stock_adjustments (
                id, product_id, location_id, previous_quantity, new_quantity,
                reason, adjusted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&adjustment.id)
        .bind(&adjustment.product_id)
        .bind(&adjustment.location_id)
        .bind(adjustment.previous_quantity)
        .bind(adjustment.new_quantity)
        .bind(&adjustment.reason)
        .bind(adjustment.adjusted_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            product_id = %product_id,
            location_id = %location_id,
            previous = previous,
            new = new_quantity,
            "Stock level adjusted"
        );

        Ok(adjustment)
    }

    /// Adjustment history, newest first, optionally filtered to a product.
    pub async fn list_adjustments(
        &self,
        product_id: Option<&str>,
    ) -> DbResult<Vec<StockAdjustment>> {
        let mut builder = sqlx::QueryBuilder::new(
            r#"
            SELECT id, product_id, location_id, previous_quantity, new_quantity,
                   reason, adjusted_at
            FROM stock_adjustments
            "#,
        );
        if let Some(product_id) = product_id {
            builder.push(" WHERE product_id = ").push_bind(product_id);
        }
        builder.push(" ORDER BY adjusted_at DESC, id");

        let adjustments = builder
            .build_query_as::<StockAdjustment>()
            .fetch_all(&self.pool)
            .await?;

        Ok(adjustments)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn fetch_movement_on(conn: &mut SqliteConnection, id: &str) -> DbResult<StockMovement> {
    sqlx::query_as::<_, StockMovement>(
        r#"
        SELECT id, product_id, quantity, source_location_id, dest_location_id,
               status, movement_date, done_at, created_at, updated_at
        FROM stock_movements
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Stock movement", id))
}

async fn upsert_quant_delta(
    conn: &mut SqliteConnection,
    product_id: &str,
    location_id: &str,
    delta: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_quants (id, product_id, location_id, quantity, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(product_id, location_id)
        DO UPDATE SET quantity = quantity + excluded.quantity,
                      updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(product_id)
    .bind(location_id)
    .bind(delta)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn movement_not_draft(movement: &StockMovement) -> DbError {
    DbError::Domain(
        StateError::MovementNotDraft {
            id: movement.id.clone(),
            status: movement.status.to_string(),
        }
        .into(),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
