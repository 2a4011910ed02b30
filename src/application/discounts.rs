use crate::domain::discount::{DiscountCode, DiscountUsage};
use crate::domain::ids::{LedgerTxId, UserId};
use crate::domain::money::Money;
use crate::domain::ports::DiscountStoreBox;
use crate::error::{MonetizationError, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

/// Why a discount request was turned down. Refusals are ordinary outcomes
/// carried in the result, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountRefusal {
    UnknownCode,
    NoLongerValid,
    UserLimitReached,
}

impl fmt::Display for DiscountRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            DiscountRefusal::UnknownCode => "Invalid discount code",
            DiscountRefusal::NoLongerValid => "Discount code is no longer valid",
            DiscountRefusal::UserLimitReached => {
                "You have reached the maximum usage limit for this code"
            }
        };
        f.write_str(message)
    }
}

/// Outcome of applying a code to a fee. When refused, the fee passes
/// through untouched; when applied, the result keeps the code snapshot so
/// the redemption can be recorded once the transaction settles.
#[derive(Debug, Clone)]
pub struct DiscountResult {
    pub applied: bool,
    pub refusal: Option<DiscountRefusal>,
    pub code: Option<DiscountCode>,
    pub discount_amount: Money,
    pub original_fee: Money,
    pub discounted_fee: Money,
}

impl DiscountResult {
    fn refused(refusal: DiscountRefusal, fee: Money) -> Self {
        Self {
            applied: false,
            refusal: Some(refusal),
            code: None,
            discount_amount: Money::zero(fee.currency()),
            original_fee: fee,
            discounted_fee: fee,
        }
    }
}

/// Validates discount codes against a fee and records redemptions.
pub struct DiscountEngine {
    store: DiscountStoreBox,
}

impl DiscountEngine {
    pub fn new(store: DiscountStoreBox) -> Self {
        Self { store }
    }

    pub async fn apply(
        &self,
        code: &str,
        fee: Money,
        user: Option<UserId>,
    ) -> Result<DiscountResult> {
        self.apply_at(Utc::now(), code, fee, user).await
    }

    /// Same as [`apply`](Self::apply) with an explicit evaluation instant.
    pub async fn apply_at(
        &self,
        now: DateTime<Utc>,
        code: &str,
        fee: Money,
        user: Option<UserId>,
    ) -> Result<DiscountResult> {
        let Some(discount) = self.store.find_code(code).await?.filter(|c| c.is_active) else {
            debug!(code, "discount code lookup failed");
            return Ok(DiscountResult::refused(DiscountRefusal::UnknownCode, fee));
        };
        if !discount.is_valid_at(now) {
            return Ok(DiscountResult::refused(DiscountRefusal::NoLongerValid, fee));
        }
        if let Some(user_id) = user
            && discount.max_uses_per_user.is_some()
        {
            let prior_uses = self.store.user_usage_count(discount.id, user_id).await?;
            if discount.user_cap_reached(prior_uses) {
                return Ok(DiscountResult::refused(DiscountRefusal::UserLimitReached, fee));
            }
        }

        let amount = discount.discount_on(fee);
        let discounted = fee.saturating_sub(&amount)?;
        Ok(DiscountResult {
            applied: true,
            refusal: None,
            code: Some(discount),
            discount_amount: amount,
            original_fee: fee,
            discounted_fee: discounted,
        })
    }

    pub async fn record_usage(
        &self,
        result: &DiscountResult,
        user: UserId,
        transaction: Option<LedgerTxId>,
    ) -> Result<DiscountUsage> {
        self.record_usage_at(Utc::now(), result, user, transaction).await
    }

    /// Books a redemption: bumps the code's usage counter and writes the
    /// usage row in one step. Call only after the discounted fee is final.
    pub async fn record_usage_at(
        &self,
        now: DateTime<Utc>,
        result: &DiscountResult,
        user: UserId,
        transaction: Option<LedgerTxId>,
    ) -> Result<DiscountUsage> {
        let code = match (&result.code, result.applied) {
            (Some(code), true) => code,
            _ => {
                return Err(MonetizationError::InvalidState(
                    "only an applied discount can be recorded".to_string(),
                ));
            }
        };

        let usage = DiscountUsage {
            id: Uuid::new_v4(),
            code_id: code.id,
            user_id: user,
            transaction_id: transaction,
            amount_saved: result.discount_amount,
            used_at: now,
        };
        let usage = self.store.commit_usage(usage).await?;
        info!(code = %code.code, user = %user, saved = %usage.amount_saved, "discount redeemed");
        Ok(usage)
    }
}
