use crate::domain::discount::{DiscountCode, DiscountUsage};
use crate::domain::fee::{FeeRule, FeeStructure, TransactionType};
use crate::domain::ids::UserId;
use crate::domain::ports::{DiscountStore, FeeRuleStore, ReferralStore, SubscriptionStore};
use crate::domain::referral::{Referral, ReferralCode, ReferralProgram, ReferralStatus};
use crate::domain::subscription::{
    PlanBenefit, SubscriptionPlan, SubscriptionStatus, SubscriptionTransaction, UserSubscription,
};
use crate::error::{MonetizationError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    fee_structures: Vec<FeeStructure>,
    fee_rules: Vec<FeeRule>,
    discount_codes: Vec<DiscountCode>,
    discount_usages: Vec<DiscountUsage>,
    referral_programs: Vec<ReferralProgram>,
    referral_codes: Vec<ReferralCode>,
    referrals: Vec<Referral>,
    plans: Vec<SubscriptionPlan>,
    benefits: Vec<PlanBenefit>,
    subscriptions: Vec<UserSubscription>,
    subscription_transactions: Vec<SubscriptionTransaction>,
}

fn upsert<T>(items: &mut Vec<T>, matches_existing: impl Fn(&T) -> bool, item: T) {
    match items.iter().position(matches_existing) {
        Some(idx) => items[idx] = item,
        None => items.push(item),
    }
}

/// A thread-safe in-memory realization of all four store ports.
///
/// A single `RwLock` guards the dataset, so every compound write runs in
/// one critical section; collections keep insertion order, which is the
/// declaration order configuration was loaded in. Ideal for tests and
/// small deployments where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration entities. Each `add_*` inserts or replaces by
    /// id, keeping the original position on replace.
    pub async fn add_fee_structure(&self, structure: FeeStructure) {
        let mut inner = self.inner.write().await;
        let id = structure.id;
        upsert(&mut inner.fee_structures, |s| s.id == id, structure);
    }

    pub async fn add_fee_rule(&self, rule: FeeRule) {
        let mut inner = self.inner.write().await;
        let id = rule.id;
        upsert(&mut inner.fee_rules, |r| r.id == id, rule);
    }

    pub async fn add_discount_code(&self, code: DiscountCode) {
        let mut inner = self.inner.write().await;
        let id = code.id;
        upsert(&mut inner.discount_codes, |c| c.id == id, code);
    }

    pub async fn add_referral_program(&self, program: ReferralProgram) {
        let mut inner = self.inner.write().await;
        let id = program.id;
        upsert(&mut inner.referral_programs, |p| p.id == id, program);
    }

    pub async fn add_subscription_plan(&self, plan: SubscriptionPlan) {
        let mut inner = self.inner.write().await;
        let id = plan.id;
        upsert(&mut inner.plans, |p| p.id == id, plan);
    }

    pub async fn add_plan_benefit(&self, benefit: PlanBenefit) {
        let mut inner = self.inner.write().await;
        let id = benefit.id;
        upsert(&mut inner.benefits, |b| b.id == id, benefit);
    }
}

#[async_trait]
impl FeeRuleStore for InMemoryStore {
    async fn active_rules(
        &self,
        transaction_type: TransactionType,
        amount: Decimal,
    ) -> Result<Vec<FeeRule>> {
        let inner = self.inner.read().await;
        let mut rules: Vec<FeeRule> = inner
            .fee_rules
            .iter()
            .filter(|rule| {
                inner
                    .fee_structures
                    .iter()
                    .any(|s| s.id == rule.structure_id && s.is_active)
            })
            .filter(|rule| rule.applies_to(transaction_type, amount))
            .cloned()
            .collect();
        // Stable: insertion order survives within one priority.
        rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority));
        Ok(rules)
    }
}

#[async_trait]
impl DiscountStore for InMemoryStore {
    async fn find_code(&self, code: &str) -> Result<Option<DiscountCode>> {
        let inner = self.inner.read().await;
        Ok(inner.discount_codes.iter().find(|c| c.code == code).cloned())
    }

    async fn user_usage_count(&self, code_id: Uuid, user_id: UserId) -> Result<u32> {
        let inner = self.inner.read().await;
        let count = inner
            .discount_usages
            .iter()
            .filter(|u| u.code_id == code_id && u.user_id == user_id)
            .count();
        Ok(count as u32)
    }

    async fn commit_usage(&self, usage: DiscountUsage) -> Result<DiscountUsage> {
        let mut inner = self.inner.write().await;
        let idx = inner
            .discount_codes
            .iter()
            .position(|c| c.id == usage.code_id)
            .ok_or_else(|| {
                MonetizationError::NotFound(format!("discount code {}", usage.code_id))
            })?;

        let code = &inner.discount_codes[idx];
        if let Some(max) = code.max_uses
            && code.uses_count >= max
        {
            return Err(MonetizationError::Ineligible(
                "discount code has no redemptions left".to_string(),
            ));
        }
        if let Some(per_user) = code.max_uses_per_user {
            let prior = inner
                .discount_usages
                .iter()
                .filter(|u| u.code_id == usage.code_id && u.user_id == usage.user_id)
                .count() as u32;
            if prior >= per_user {
                return Err(MonetizationError::Ineligible(
                    "user has reached the usage limit for this code".to_string(),
                ));
            }
        }

        inner.discount_codes[idx].uses_count += 1;
        inner.discount_usages.push(usage.clone());
        Ok(usage)
    }
}

#[async_trait]
impl ReferralStore for InMemoryStore {
    async fn find_program(&self, id: Uuid) -> Result<Option<ReferralProgram>> {
        let inner = self.inner.read().await;
        Ok(inner.referral_programs.iter().find(|p| p.id == id).cloned())
    }

    async fn default_program(&self) -> Result<Option<ReferralProgram>> {
        let inner = self.inner.read().await;
        Ok(inner.referral_programs.iter().find(|p| p.is_active).cloned())
    }

    async fn find_code(&self, code: &str) -> Result<Option<ReferralCode>> {
        let inner = self.inner.read().await;
        Ok(inner.referral_codes.iter().find(|c| c.code == code).cloned())
    }

    async fn code_for_user(
        &self,
        user_id: UserId,
        program_id: Uuid,
    ) -> Result<Option<ReferralCode>> {
        let inner = self.inner.read().await;
        Ok(inner
            .referral_codes
            .iter()
            .find(|c| c.user_id == user_id && c.program_id == program_id && c.is_active)
            .cloned())
    }

    async fn claim_code(&self, candidate: ReferralCode) -> Result<Option<ReferralCode>> {
        let mut inner = self.inner.write().await;
        if inner.referral_codes.iter().any(|c| c.code == candidate.code) {
            return Ok(None);
        }
        inner.referral_codes.push(candidate.clone());
        Ok(Some(candidate))
    }

    async fn find_referral(&self, id: Uuid) -> Result<Option<Referral>> {
        let inner = self.inner.read().await;
        Ok(inner.referrals.iter().find(|r| r.id == id).cloned())
    }

    async fn confirmed_referral_count(
        &self,
        referrer_id: UserId,
        program_id: Uuid,
    ) -> Result<u32> {
        let inner = self.inner.read().await;
        let count = inner
            .referrals
            .iter()
            .filter(|r| {
                r.referrer_id == referrer_id
                    && r.program_id == program_id
                    && r.status.is_confirmed()
            })
            .count();
        Ok(count as u32)
    }

    async fn referee_has_referral(&self, referee_id: UserId) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.referrals.iter().any(|r| r.referee_id == referee_id))
    }

    async fn commit_referral(&self, referral: Referral) -> Result<Referral> {
        let mut inner = self.inner.write().await;
        if inner
            .referrals
            .iter()
            .any(|r| r.referee_id == referral.referee_id)
        {
            return Err(MonetizationError::Ineligible(
                "user has already been referred".to_string(),
            ));
        }
        let code = inner
            .referral_codes
            .iter_mut()
            .find(|c| c.id == referral.code_id)
            .ok_or_else(|| {
                MonetizationError::NotFound(format!("referral code {}", referral.code_id))
            })?;
        code.times_used += 1;
        inner.referrals.push(referral.clone());
        Ok(referral)
    }

    async fn transition_referral(
        &self,
        updated: Referral,
        expected: ReferralStatus,
    ) -> Result<Referral> {
        let mut inner = self.inner.write().await;
        let slot = inner
            .referrals
            .iter_mut()
            .find(|r| r.id == updated.id)
            .ok_or_else(|| MonetizationError::NotFound(format!("referral {}", updated.id)))?;
        if slot.status != expected {
            return Err(MonetizationError::InvalidState(format!(
                "referral status changed (now {:?})",
                slot.status
            )));
        }
        *slot = updated.clone();
        Ok(updated)
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    async fn find_plan(&self, id: Uuid) -> Result<Option<SubscriptionPlan>> {
        let inner = self.inner.read().await;
        Ok(inner.plans.iter().find(|p| p.id == id).cloned())
    }

    async fn available_plans(&self) -> Result<Vec<SubscriptionPlan>> {
        let inner = self.inner.read().await;
        Ok(inner.plans.iter().filter(|p| p.is_active).cloned().collect())
    }

    async fn find_subscription(&self, id: Uuid) -> Result<Option<UserSubscription>> {
        let inner = self.inner.read().await;
        Ok(inner.subscriptions.iter().find(|s| s.id == id).cloned())
    }

    async fn active_subscription(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<UserSubscription>> {
        let inner = self.inner.read().await;
        Ok(inner
            .subscriptions
            .iter()
            .find(|s| s.user_id == user_id && s.is_active_at(now))
            .cloned())
    }

    async fn create_subscription(
        &self,
        subscription: UserSubscription,
        record: SubscriptionTransaction,
        now: DateTime<Utc>,
    ) -> Result<UserSubscription> {
        let mut inner = self.inner.write().await;
        if inner
            .subscriptions
            .iter()
            .any(|s| s.user_id == subscription.user_id && s.is_active_at(now))
        {
            return Err(MonetizationError::Ineligible(
                "user already has an active subscription".to_string(),
            ));
        }
        inner.subscriptions.push(subscription.clone());
        inner.subscription_transactions.push(record);
        Ok(subscription)
    }

    async fn update_subscription(
        &self,
        updated: UserSubscription,
        expected: SubscriptionStatus,
        record: Option<SubscriptionTransaction>,
    ) -> Result<UserSubscription> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let slot = inner
            .subscriptions
            .iter_mut()
            .find(|s| s.id == updated.id)
            .ok_or_else(|| {
                MonetizationError::NotFound(format!("subscription {}", updated.id))
            })?;
        if slot.status != expected {
            return Err(MonetizationError::InvalidState(format!(
                "subscription status changed (now {:?})",
                slot.status
            )));
        }
        *slot = updated.clone();
        if let Some(record) = record {
            inner.subscription_transactions.push(record);
        }
        Ok(updated)
    }

    async fn benefits_for_plan(&self, plan_id: Uuid) -> Result<Vec<PlanBenefit>> {
        let inner = self.inner.read().await;
        Ok(inner
            .benefits
            .iter()
            .filter(|b| b.plan_id == plan_id)
            .cloned()
            .collect())
    }

    async fn transactions_for(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<SubscriptionTransaction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .subscription_transactions
            .iter()
            .filter(|t| t.subscription_id == subscription_id)
            .cloned()
            .collect())
    }
}
