use super::discount::{DiscountCode, DiscountUsage};
use super::fee::{FeeRule, TransactionType};
use super::ids::UserId;
use super::referral::{Referral, ReferralCode, ReferralProgram, ReferralStatus};
use super::subscription::{
    PlanBenefit, SubscriptionPlan, SubscriptionStatus, SubscriptionTransaction, UserSubscription,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

#[async_trait]
pub trait FeeRuleStore: Send + Sync {
    /// Active rules of active structures matching the transaction type
    /// (exact or `All`) and amount window, ordered by priority descending
    /// with insertion order breaking ties.
    async fn active_rules(
        &self,
        transaction_type: TransactionType,
        amount: Decimal,
    ) -> Result<Vec<FeeRule>>;
}

#[async_trait]
pub trait DiscountStore: Send + Sync {
    async fn find_code(&self, code: &str) -> Result<Option<DiscountCode>>;
    async fn user_usage_count(&self, code_id: Uuid, user_id: UserId) -> Result<u32>;
    /// Atomically re-checks the global and per-user caps, increments the
    /// code's `uses_count` and inserts the usage row. A racing redemption
    /// that loses the last slot gets `Ineligible` with no partial effect.
    async fn commit_usage(&self, usage: DiscountUsage) -> Result<DiscountUsage>;
}

#[async_trait]
pub trait ReferralStore: Send + Sync {
    async fn find_program(&self, id: Uuid) -> Result<Option<ReferralProgram>>;
    async fn default_program(&self) -> Result<Option<ReferralProgram>>;
    async fn find_code(&self, code: &str) -> Result<Option<ReferralCode>>;
    /// The user's active code in the program, if any.
    async fn code_for_user(
        &self,
        user_id: UserId,
        program_id: Uuid,
    ) -> Result<Option<ReferralCode>>;
    /// Inserts `candidate` unless its code string is already taken, in
    /// which case `None` is returned and the caller mints a new candidate.
    async fn claim_code(&self, candidate: ReferralCode) -> Result<Option<ReferralCode>>;
    async fn find_referral(&self, id: Uuid) -> Result<Option<Referral>>;
    /// Verified and Rewarded referrals only.
    async fn confirmed_referral_count(
        &self,
        referrer_id: UserId,
        program_id: Uuid,
    ) -> Result<u32>;
    async fn referee_has_referral(&self, referee_id: UserId) -> Result<bool>;
    /// Atomically inserts the referral and increments the code's
    /// `times_used`, re-checking that the referee is still unreferred. A
    /// racing duplicate gets `Ineligible`.
    async fn commit_referral(&self, referral: Referral) -> Result<Referral>;
    /// Compare-and-set on status: replaces the stored referral only while
    /// its status is still `expected`, otherwise `InvalidState`.
    async fn transition_referral(
        &self,
        updated: Referral,
        expected: ReferralStatus,
    ) -> Result<Referral>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_plan(&self, id: Uuid) -> Result<Option<SubscriptionPlan>>;
    async fn available_plans(&self) -> Result<Vec<SubscriptionPlan>>;
    async fn find_subscription(&self, id: Uuid) -> Result<Option<UserSubscription>>;
    async fn active_subscription(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<UserSubscription>>;
    /// Atomically inserts the subscription and its opening ledger record,
    /// failing `Ineligible` while the user still has a subscription active
    /// at `now`.
    async fn create_subscription(
        &self,
        subscription: UserSubscription,
        record: SubscriptionTransaction,
        now: DateTime<Utc>,
    ) -> Result<UserSubscription>;
    /// Compare-and-set on status plus an optional ledger record, applied
    /// atomically. A racing writer gets `InvalidState`.
    async fn update_subscription(
        &self,
        updated: UserSubscription,
        expected: SubscriptionStatus,
        record: Option<SubscriptionTransaction>,
    ) -> Result<UserSubscription>;
    async fn benefits_for_plan(&self, plan_id: Uuid) -> Result<Vec<PlanBenefit>>;
    async fn transactions_for(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<SubscriptionTransaction>>;
}

pub type FeeRuleStoreBox = Box<dyn FeeRuleStore>;
pub type DiscountStoreBox = Box<dyn DiscountStore>;
pub type ReferralStoreBox = Box<dyn ReferralStore>;
pub type SubscriptionStoreBox = Box<dyn SubscriptionStore>;
