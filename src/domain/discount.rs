use crate::domain::ids::{LedgerTxId, UserId};
use crate::domain::money::Money;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Fixed,
    Percentage,
    WaiveFee,
}

/// A redeemable code that reduces the fee of a single transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: Uuid,
    /// Uppercase human-facing code, unique across all codes.
    pub code: String,
    pub description: String,
    pub kind: DiscountKind,
    pub fixed_amount: Option<Decimal>,
    pub percentage: Option<Decimal>,
    /// Global redemption cap; unlimited if unset.
    pub max_uses: Option<u32>,
    pub uses_count: u32,
    /// Per-user redemption cap; unlimited if unset.
    pub max_uses_per_user: Option<u32>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl DiscountCode {
    /// Whether the code can still be redeemed at `now`. Covers the active
    /// flag, the validity window (both ends inclusive) and the global cap;
    /// the per-user cap needs a usage count and is checked separately.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active || now < self.valid_from {
            return false;
        }
        if let Some(until) = self.valid_until
            && now > until
        {
            return false;
        }
        match self.max_uses {
            Some(max) => self.uses_count < max,
            None => true,
        }
    }

    /// Whether a user with `prior_uses` redemptions of this code has
    /// exhausted the per-user cap.
    pub fn user_cap_reached(&self, prior_uses: u32) -> bool {
        match self.max_uses_per_user {
            Some(max) => prior_uses >= max,
            None => false,
        }
    }

    /// The amount this code knocks off `fee`, clamped to `[0, fee]`.
    /// A code missing its magnitude configuration discounts nothing.
    pub fn discount_on(&self, fee: Money) -> Money {
        let fee_amount = fee.amount();
        let discount = match self.kind {
            DiscountKind::Fixed => self.fixed_amount.unwrap_or(Decimal::ZERO),
            DiscountKind::Percentage => {
                fee_amount * self.percentage.unwrap_or(Decimal::ZERO) / Decimal::ONE_HUNDRED
            }
            DiscountKind::WaiveFee => fee_amount,
        };
        Money::new(discount.clamp(Decimal::ZERO, fee_amount), fee.currency())
    }
}

/// Immutable record of one redemption, written only after the discounted
/// fee is final.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountUsage {
    pub id: Uuid,
    pub code_id: Uuid,
    pub user_id: UserId,
    pub transaction_id: Option<LedgerTxId>,
    pub amount_saved: Money,
    pub used_at: DateTime<Utc>,
}
