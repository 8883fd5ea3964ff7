//! Stock ledger arithmetic
//!
//! Quantity rules shared by the backend's ledger operations and the
//! reports: withdrawal guards, adjustment planning, transfer bookkeeping and
//! reconstruction of historical stock levels from the movement log.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::models::MovementType;

/// A withdrawal larger than the stock on hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Insufficient stock: available {available}, requested {requested}")]
pub struct InsufficientStock {
    pub available: Decimal,
    pub requested: Decimal,
}

/// Remaining quantity after withdrawing `requested` from `available`
pub fn check_withdrawal(available: Decimal, requested: Decimal) -> Result<Decimal, InsufficientStock> {
    if requested > available {
        return Err(InsufficientStock {
            available,
            requested,
        });
    }
    Ok(available - requested)
}

/// Movement needed to move a stock row from one quantity to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentPlan {
    pub previous: Decimal,
    pub target: Decimal,
    /// `None` when the quantity does not change
    pub movement_type: Option<MovementType>,
    pub magnitude: Decimal,
}

pub fn plan_adjustment(previous: Decimal, target: Decimal) -> Result<AdjustmentPlan, &'static str> {
    if target < Decimal::ZERO {
        return Err("Adjusted quantity cannot be negative");
    }
    let delta = target - previous;
    let movement_type = if delta > Decimal::ZERO {
        Some(MovementType::AdjustmentIn)
    } else if delta < Decimal::ZERO {
        Some(MovementType::AdjustmentOut)
    } else {
        None
    };
    Ok(AdjustmentPlan {
        previous,
        target,
        movement_type,
        magnitude: delta.abs(),
    })
}

/// Before/after quantities of both sides of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub quantity: Decimal,
    pub source_before: Decimal,
    pub source_after: Decimal,
    /// `None` when the destination row was created by the transfer
    pub destination_before: Option<Decimal>,
    pub destination_after: Decimal,
}

impl TransferOutcome {
    /// Reconstruct the outcome from the post-transfer quantities
    pub fn from_after(
        quantity: Decimal,
        source_after: Decimal,
        destination_after: Decimal,
        destination_created: bool,
    ) -> Self {
        Self {
            quantity,
            source_before: source_after + quantity,
            source_after,
            destination_before: if destination_created {
                None
            } else {
                Some(destination_after - quantity)
            },
            destination_after,
        }
    }

    /// Both sides moved by exactly `quantity`
    pub fn is_balanced(&self) -> bool {
        self.source_before - self.quantity == self.source_after
            && self.destination_after
                == self.destination_before.unwrap_or(Decimal::ZERO) + self.quantity
    }
}

/// Stock level at an earlier instant.
///
/// `later` holds the movements recorded after that instant; their signed
/// effects are rolled back from the current quantity.
pub fn level_at<I>(current: Decimal, later: I) -> Decimal
where
    I: IntoIterator<Item = (MovementType, Decimal)>,
{
    later
        .into_iter()
        .fold(current, |level, (movement_type, quantity)| {
            level.saturating_sub(movement_type.signed(quantity))
        })
}
