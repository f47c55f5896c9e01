//! # Inventory Types
//!
//! Locations, quantity-on-hand records, stock movements, and adjustment
//! audit rows.
//!
//! Quantity lives only in [`StockQuant`] rows, one per (product, location).
//! It changes through exactly two doors: a confirmed [`StockMovement`]
//! (delta, conserving) or a [`StockAdjustment`] (absolute set, audited).
//! Locations themselves store nothing.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Location
// =============================================================================

/// Level of a node in the location tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Warehouse,
    Zone,
    Bin,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LocationKind::Warehouse => "warehouse",
            LocationKind::Zone => "zone",
            LocationKind::Bin => "bin",
        })
    }
}

/// A node in the warehouse/zone/bin tree. Purely organizational.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Location {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code, unique ("WH1", "WH1-A-03").
    pub code: String,

    pub name: String,

    pub kind: LocationKind,

    /// Parent node; None for warehouse roots.
    pub parent_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock Quant
// =============================================================================

/// Quantity on hand for one product at one location.
///
/// Invariant: `quantity >= 0`, enforced by the insufficient-stock guard
/// before any write and by a CHECK constraint underneath it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockQuant {
    pub id: String,

    /// Opaque product reference; the product master lives outside this core.
    pub product_id: String,

    pub location_id: String,

    pub quantity: i64,

    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// The status of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    /// Intent recorded, nothing moved yet.
    Draft,
    /// Quantities moved; terminal.
    Done,
    /// Abandoned before confirmation; terminal.
    Cancelled,
}

impl MovementStatus {
    /// Only drafts can be confirmed.
    #[inline]
    pub fn can_confirm(&self) -> bool {
        matches!(self, MovementStatus::Draft)
    }

    /// Only drafts can be cancelled; a done movement is history.
    #[inline]
    pub fn can_cancel(&self) -> bool {
        matches!(self, MovementStatus::Draft)
    }
}

impl Default for MovementStatus {
    fn default() -> Self {
        MovementStatus::Draft
    }
}

impl fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MovementStatus::Draft => "draft",
            MovementStatus::Done => "done",
            MovementStatus::Cancelled => "cancelled",
        })
    }
}

/// A transfer of quantity between two locations.
///
/// Confirming a draft movement atomically decrements the source quant and
/// upserts the destination quant; total quantity of the product across all
/// locations is conserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,

    pub product_id: String,

    /// Always positive; direction is carried by source/dest.
    pub quantity: i64,

    pub source_location_id: String,
    pub dest_location_id: String,

    pub status: MovementStatus,

    pub movement_date: NaiveDate,

    /// When the movement was confirmed; None while draft or cancelled.
    pub done_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock Adjustment
// =============================================================================

/// Audit record for an absolute-set stock correction.
///
/// Kept separate from movements: an adjustment declares "the count at this
/// location IS n", a movement declares "n units went from A to B". The two
/// must stay distinguishable in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockAdjustment {
    pub id: String,

    pub product_id: String,
    pub location_id: String,

    /// Quantity on hand before the adjustment (0 if no quant row existed).
    pub previous_quantity: i64,

    /// Quantity on hand after the adjustment.
    pub new_quantity: i64,

    pub reason: Option<String>,

    pub adjusted_at: DateTime<Utc>,
}

impl StockAdjustment {
    /// Signed change the adjustment applied.
    #[inline]
    pub fn delta(&self) -> i64 {
        self.new_quantity - self.previous_quantity
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_status_guards() {
        assert!(MovementStatus::Draft.can_confirm());
        assert!(!MovementStatus::Done.can_confirm());
        assert!(!MovementStatus::Cancelled.can_confirm());

        assert!(MovementStatus::Draft.can_cancel());
        assert!(!MovementStatus::Done.can_cancel());
    }

    #[test]
    fn test_movement_status_display() {
        assert_eq!(MovementStatus::Draft.to_string(), "draft");
        assert_eq!(MovementStatus::Done.to_string(), "done");
        assert_eq!(MovementStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_adjustment_delta() {
        let adj = StockAdjustment {
            id: "a".to_string(),
            product_id: "p".to_string(),
            location_id: "l".to_string(),
            previous_quantity: 12,
            new_quantity: 7,
            reason: Some("cycle count".to_string()),
            adjusted_at: Utc::now(),
        };
        assert_eq!(adj.delta(), -5);
    }
}
