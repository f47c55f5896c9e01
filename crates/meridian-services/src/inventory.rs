//! # Inventory Service
//!
//! Locations, stock transfers, and manual quantity corrections.
//!
//! ## Transfer Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_stock_transfer          confirm_stock_transfer                  │
//! │       │                              │                                  │
//! │       ▼                              ▼                                  │
//! │    draft ──────────────────────▶   done      (stock moves here,        │
//! │       │                                       availability checked)     │
//! │       ▼                                                                 │
//! │   cancelled   (draft only; done is final)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! `transfer_now` collapses create + confirm; if the confirm fails the
//! draft is discarded so nothing half-done is left behind.
//!
//! Product ids are opaque references; the product master lives outside
//! this core.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use meridian_core::{
    validation::{validate_account_code, validate_name, validate_quantity, validate_stock_level},
    Location, LocationKind, MovementStatus, StockAdjustment, StockMovement, ValidationError,
};
use meridian_db::{Database, StockOnHandRow};

// =============================================================================
// Input Types
// =============================================================================

/// Input for creating a stock location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    pub code: String,
    pub name: String,
    pub kind: LocationKind,
    pub parent_id: Option<String>,
}

/// Input for a stock transfer between two locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInput {
    pub product_id: String,
    pub quantity: i64,
    pub source_location_id: String,
    pub dest_location_id: String,
    /// Defaults to today.
    pub movement_date: Option<NaiveDate>,
}

/// Input for an absolute stock correction (cycle count, damage writeoff).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStockInput {
    pub product_id: String,
    pub location_id: String,
    pub quantity: i64,
    pub reason: Option<String>,
}

// =============================================================================
// Inventory Service
// =============================================================================

/// Service for location and stock operations.
#[derive(Debug, Clone)]
pub struct InventoryService {
    db: Database,
}

impl InventoryService {
    /// Creates a new InventoryService.
    pub fn new(db: Database) -> Self {
        InventoryService { db }
    }

    // -------------------------------------------------------------------------
    // Locations
    // -------------------------------------------------------------------------

    /// Creates a location. The parent, when given, must exist; codes are
    /// unique across the whole tree.
    pub async fn create_location(&self, input: LocationInput) -> ServiceResult<Location> {
        debug!(code = %input.code, kind = %input.kind, "create_location");

        validate_account_code(&input.code)?;
        validate_name(&input.name)?;

        if let Some(parent_id) = &input.parent_id {
            self.db.locations().require(parent_id).await?;
        }

        let location = Location {
            id: Uuid::new_v4().to_string(),
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            kind: input.kind,
            parent_id: input.parent_id,
            created_at: Utc::now(),
        };

        self.db.locations().insert(&location).await?;
        info!(id = %location.id, code = %location.code, "Location created");
        Ok(location)
    }

    /// All locations, ordered by code.
    pub async fn list_locations(&self) -> ServiceResult<Vec<Location>> {
        Ok(self.db.locations().list().await?)
    }

    // -------------------------------------------------------------------------
    // Transfers
    // -------------------------------------------------------------------------

    /// Creates a draft transfer. Nothing moves until it is confirmed, so
    /// availability is deliberately not checked here.
    pub async fn create_stock_transfer(&self, input: TransferInput) -> ServiceResult<StockMovement> {
        debug!(
            product_id = %input.product_id,
            quantity = input.quantity,
            "create_stock_transfer"
        );

        if input.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            }
            .into());
        }
        validate_quantity(input.quantity)?;
        if input.source_location_id == input.dest_location_id {
            return Err(ValidationError::SameLocation {
                location_id: input.source_location_id,
            }
            .into());
        }

        self.db.locations().require(&input.source_location_id).await?;
        self.db.locations().require(&input.dest_location_id).await?;

        let now = Utc::now();
        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: input.product_id.trim().to_string(),
            quantity: input.quantity,
            source_location_id: input.source_location_id,
            dest_location_id: input.dest_location_id,
            status: MovementStatus::Draft,
            movement_date: input.movement_date.unwrap_or_else(|| now.date_naive()),
            done_at: None,
            created_at: now,
            updated_at: now,
        };

        self.db.stock().create_movement(&movement).await?;
        info!(id = %movement.id, product_id = %movement.product_id, "Stock transfer drafted");
        Ok(movement)
    }

    /// Confirms a draft transfer: checks availability and moves the stock,
    /// all in one transaction. Total on hand is unchanged by a confirm.
    pub async fn confirm_stock_transfer(&self, id: &str) -> ServiceResult<StockMovement> {
        Ok(self.db.stock().confirm_movement(id).await?)
    }

    /// Cancels a draft transfer. Confirmed transfers are final; a mistake
    /// after confirmation is corrected with a transfer back.
    pub async fn cancel_stock_transfer(&self, id: &str) -> ServiceResult<StockMovement> {
        let movement = self.db.stock().cancel_movement(id).await?;
        info!(id = %movement.id, "Stock transfer cancelled");
        Ok(movement)
    }

    /// Creates and immediately confirms a transfer. If the confirm fails
    /// the draft is discarded before the error is returned.
    pub async fn transfer_now(&self, input: TransferInput) -> ServiceResult<StockMovement> {
        let movement = self.create_stock_transfer(input).await?;
        match self.db.stock().confirm_movement(&movement.id).await {
            Ok(done) => Ok(done),
            Err(err) => {
                if let Err(cancel_err) = self.db.stock().cancel_movement(&movement.id).await {
                    warn!(
                        id = %movement.id,
                        error = %cancel_err,
                        "Could not discard draft after failed transfer"
                    );
                }
                Err(err.into())
            }
        }
    }

    /// A transfer by ID.
    pub async fn get_stock_transfer(&self, id: &str) -> ServiceResult<StockMovement> {
        self.db
            .stock()
            .get_movement(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Stock movement", id))
    }

    // -------------------------------------------------------------------------
    // Corrections & Queries
    // -------------------------------------------------------------------------

    /// Sets the absolute quantity of a product at a location and records
    /// the correction in the adjustment trail.
    pub async fn update_stock(&self, input: UpdateStockInput) -> ServiceResult<StockAdjustment> {
        debug!(
            product_id = %input.product_id,
            location_id = %input.location_id,
            quantity = input.quantity,
            "update_stock"
        );

        if input.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            }
            .into());
        }
        validate_stock_level(input.quantity)?;

        let adjustment = self
            .db
            .stock()
            .set_quantity(
                input.product_id.trim(),
                &input.location_id,
                input.quantity,
                input.reason,
            )
            .await?;

        info!(
            product_id = %adjustment.product_id,
            delta = adjustment.delta(),
            "Stock level corrected"
        );
        Ok(adjustment)
    }

    /// Quantity on hand per location, for one product or all of them.
    pub async fn stock_on_hand(
        &self,
        product_id: Option<&str>,
    ) -> ServiceResult<Vec<StockOnHandRow>> {
        Ok(self.db.stock().stock_on_hand(product_id).await?)
    }

    /// Correction history, newest first.
    pub async fn adjustment_history(
        &self,
        product_id: Option<&str>,
    ) -> ServiceResult<Vec<StockAdjustment>> {
        Ok(self.db.stock().list_adjustments(product_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use meridian_db::DbConfig;

    async fn service() -> InventoryService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        InventoryService::new(db)
    }

    fn location(code: &str, kind: LocationKind, parent_id: Option<String>) -> LocationInput {
        LocationInput {
            code: code.to_string(),
            name: format!("Location {code}"),
            kind,
            parent_id,
        }
    }

    fn transfer(product: &str, qty: i64, source: &str, dest: &str) -> TransferInput {
        TransferInput {
            product_id: product.to_string(),
            quantity: qty,
            source_location_id: source.to_string(),
            dest_location_id: dest.to_string(),
            movement_date: None,
        }
    }

    fn set_stock(product: &str, location: &str, qty: i64) -> UpdateStockInput {
        UpdateStockInput {
            product_id: product.to_string(),
            location_id: location.to_string(),
            quantity: qty,
            reason: None,
        }
    }

    /// Two warehouses, returned as (svc, wh1_id, wh2_id).
    async fn service_with_warehouses() -> (InventoryService, String, String) {
        let svc = service().await;
        let wh1 = svc
            .create_location(location("WH1", LocationKind::Warehouse, None))
            .await
            .unwrap();
        let wh2 = svc
            .create_location(location("WH2", LocationKind::Warehouse, None))
            .await
            .unwrap();
        (svc, wh1.id, wh2.id)
    }

    #[tokio::test]
    async fn test_location_tree() {
        let svc = service().await;
        let wh = svc
            .create_location(location("WH1", LocationKind::Warehouse, None))
            .await
            .unwrap();
        let bin = svc
            .create_location(location("WH1-A-01", LocationKind::Bin, Some(wh.id.clone())))
            .await
            .unwrap();
        assert_eq!(bin.parent_id.as_deref(), Some(wh.id.as_str()));

        let all = svc.list_locations().await.unwrap();
        assert_eq!(all.len(), 2);

        let err = svc
            .create_location(location("WH1", LocationKind::Warehouse, None))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = svc
            .create_location(location("WH3", LocationKind::Zone, Some("missing".to_string())))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_transfer_conserves_total() {
        let (svc, wh1, wh2) = service_with_warehouses().await;
        svc.update_stock(set_stock("SKU-1", &wh1, 50)).await.unwrap();

        let draft = svc
            .create_stock_transfer(transfer("SKU-1", 20, &wh1, &wh2))
            .await
            .unwrap();
        assert_eq!(draft.status, MovementStatus::Draft);
        // draft moves nothing
        assert_eq!(svc.db.stock().on_hand("SKU-1", &wh1).await.unwrap(), 50);

        let done = svc.confirm_stock_transfer(&draft.id).await.unwrap();
        assert_eq!(done.status, MovementStatus::Done);
        assert!(done.done_at.is_some());

        assert_eq!(svc.db.stock().on_hand("SKU-1", &wh1).await.unwrap(), 30);
        assert_eq!(svc.db.stock().on_hand("SKU-1", &wh2).await.unwrap(), 20);

        let rows = svc.stock_on_hand(Some("SKU-1")).await.unwrap();
        let total: i64 = rows.iter().map(|r| r.quantity).sum();
        assert_eq!(total, 50);
    }

    #[tokio::test]
    async fn test_insufficient_stock_moves_nothing() {
        let (svc, wh1, wh2) = service_with_warehouses().await;
        svc.update_stock(set_stock("SKU-1", &wh1, 5)).await.unwrap();

        let draft = svc
            .create_stock_transfer(transfer("SKU-1", 10, &wh1, &wh2))
            .await
            .unwrap();
        let err = svc.confirm_stock_transfer(&draft.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("5"));
        assert!(err.message.contains("10"));

        // nothing moved, draft still there for a retry after restocking
        assert_eq!(svc.db.stock().on_hand("SKU-1", &wh1).await.unwrap(), 5);
        assert_eq!(svc.db.stock().on_hand("SKU-1", &wh2).await.unwrap(), 0);
        let movement = svc.get_stock_transfer(&draft.id).await.unwrap();
        assert_eq!(movement.status, MovementStatus::Draft);
    }

    #[tokio::test]
    async fn test_transfer_now_discards_failed_draft() {
        let (svc, wh1, wh2) = service_with_warehouses().await;
        svc.update_stock(set_stock("SKU-1", &wh1, 50)).await.unwrap();

        let done = svc
            .transfer_now(transfer("SKU-1", 20, &wh1, &wh2))
            .await
            .unwrap();
        assert_eq!(done.status, MovementStatus::Done);

        let err = svc
            .transfer_now(transfer("SKU-1", 100, &wh1, &wh2))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        // the failed attempt leaves no draft behind
        let movement = svc.get_stock_transfer(&done.id).await.unwrap();
        assert_eq!(movement.status, MovementStatus::Done);
        assert_eq!(svc.db.stock().on_hand("SKU-1", &wh1).await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_transfer_input_validation() {
        let (svc, wh1, _) = service_with_warehouses().await;

        let err = svc
            .create_stock_transfer(transfer("SKU-1", 0, &wh1, "other"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = svc
            .create_stock_transfer(transfer("SKU-1", 5, &wh1, &wh1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = svc
            .create_stock_transfer(transfer("SKU-1", 5, &wh1, "missing"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = svc
            .create_stock_transfer(transfer("  ", 5, &wh1, "missing"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_cancel_only_drafts() {
        let (svc, wh1, wh2) = service_with_warehouses().await;
        svc.update_stock(set_stock("SKU-1", &wh1, 50)).await.unwrap();

        let draft = svc
            .create_stock_transfer(transfer("SKU-1", 10, &wh1, &wh2))
            .await
            .unwrap();
        let cancelled = svc.cancel_stock_transfer(&draft.id).await.unwrap();
        assert_eq!(cancelled.status, MovementStatus::Cancelled);

        let done = svc
            .transfer_now(transfer("SKU-1", 10, &wh1, &wh2))
            .await
            .unwrap();
        let err = svc.cancel_stock_transfer(&done.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StateError);
    }

    #[tokio::test]
    async fn test_update_stock_keeps_audit_trail() {
        let (svc, wh1, _) = service_with_warehouses().await;

        let first = svc
            .update_stock(UpdateStockInput {
                product_id: "SKU-1".to_string(),
                location_id: wh1.clone(),
                quantity: 40,
                reason: Some("initial count".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(first.previous_quantity, 0);
        assert_eq!(first.delta(), 40);

        let second = svc.update_stock(set_stock("SKU-1", &wh1, 25)).await.unwrap();
        assert_eq!(second.previous_quantity, 40);
        assert_eq!(second.delta(), -15);

        let history = svc.adjustment_history(Some("SKU-1")).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].new_quantity, 25);

        let err = svc
            .update_stock(set_stock("SKU-1", &wh1, -1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = svc
            .update_stock(set_stock("SKU-1", "missing", 10))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
