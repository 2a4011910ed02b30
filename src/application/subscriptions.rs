use crate::domain::ids::UserId;
use crate::domain::money::Money;
use crate::domain::ports::SubscriptionStoreBox;
use crate::domain::subscription::{
    BenefitType, BillingCycle, PlanBenefit, SubscriptionEventKind, SubscriptionPlan,
    SubscriptionStatus, SubscriptionTransaction, UserSubscription,
};
use crate::error::{MonetizationError, Result};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

/// Manages the premium subscription lifecycle: enrollment, cancellation,
/// renewal and benefit lookups, with an audit record per billing event.
pub struct SubscriptionEngine {
    store: SubscriptionStoreBox,
}

impl SubscriptionEngine {
    pub fn new(store: SubscriptionStoreBox) -> Self {
        Self { store }
    }

    /// Plans currently open for enrollment.
    pub async fn available_plans(&self) -> Result<Vec<SubscriptionPlan>> {
        self.store.available_plans().await
    }

    pub async fn active_subscription(&self, user: UserId) -> Result<Option<UserSubscription>> {
        self.active_subscription_at(Utc::now(), user).await
    }

    pub async fn active_subscription_at(
        &self,
        now: DateTime<Utc>,
        user: UserId,
    ) -> Result<Option<UserSubscription>> {
        self.store.active_subscription(user, now).await
    }

    pub async fn subscribe(
        &self,
        user: UserId,
        plan_id: Uuid,
        billing_cycle: BillingCycle,
        payment_reference: Option<String>,
    ) -> Result<UserSubscription> {
        self.subscribe_at(Utc::now(), user, plan_id, billing_cycle, payment_reference)
            .await
    }

    /// Enrolls the user in a plan for one billing period starting now.
    pub async fn subscribe_at(
        &self,
        now: DateTime<Utc>,
        user: UserId,
        plan_id: Uuid,
        billing_cycle: BillingCycle,
        payment_reference: Option<String>,
    ) -> Result<UserSubscription> {
        let plan = self
            .store
            .find_plan(plan_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| MonetizationError::NotFound(format!("subscription plan {plan_id}")))?;
        if self.store.active_subscription(user, now).await?.is_some() {
            return Err(MonetizationError::Ineligible(
                "user already has an active subscription".to_string(),
            ));
        }

        let subscription = UserSubscription::open(user, plan.id, billing_cycle, now);
        let record = SubscriptionTransaction::record(
            subscription.id,
            SubscriptionEventKind::New,
            plan.charge_for(billing_cycle),
            payment_reference,
            now,
        );
        let subscription = self.store.create_subscription(subscription, record, now).await?;
        info!(
            user = %user,
            plan = %plan.name,
            cycle = ?billing_cycle,
            "subscription opened"
        );
        Ok(subscription)
    }

    pub async fn cancel(&self, user: UserId, subscription_id: Uuid) -> Result<UserSubscription> {
        self.cancel_at(Utc::now(), user, subscription_id).await
    }

    /// Cancels one of the user's subscriptions. Cancelling an already
    /// cancelled subscription changes nothing and records nothing.
    pub async fn cancel_at(
        &self,
        now: DateTime<Utc>,
        user: UserId,
        subscription_id: Uuid,
    ) -> Result<UserSubscription> {
        let subscription = self
            .store
            .find_subscription(subscription_id)
            .await?
            .filter(|s| s.user_id == user)
            .ok_or_else(|| MonetizationError::NotFound(format!("subscription {subscription_id}")))?;
        self.settle_cancellation(now, subscription).await
    }

    pub async fn cancel_active(&self, user: UserId) -> Result<UserSubscription> {
        self.cancel_active_at(Utc::now(), user).await
    }

    /// Cancels whichever subscription is active for the user at `now`.
    pub async fn cancel_active_at(
        &self,
        now: DateTime<Utc>,
        user: UserId,
    ) -> Result<UserSubscription> {
        let subscription = self
            .store
            .active_subscription(user, now)
            .await?
            .ok_or_else(|| {
                MonetizationError::NotFound("no active subscription found".to_string())
            })?;
        self.settle_cancellation(now, subscription).await
    }

    async fn settle_cancellation(
        &self,
        now: DateTime<Utc>,
        mut subscription: UserSubscription,
    ) -> Result<UserSubscription> {
        loop {
            if subscription.status == SubscriptionStatus::Cancelled {
                return Ok(subscription);
            }
            let plan = self
                .store
                .find_plan(subscription.plan_id)
                .await?
                .ok_or_else(|| {
                    MonetizationError::NotFound(format!(
                        "subscription plan {}",
                        subscription.plan_id
                    ))
                })?;
            let expected = subscription.status;
            let record = SubscriptionTransaction::record(
                subscription.id,
                SubscriptionEventKind::Cancellation,
                Money::zero(plan.monthly_fee.currency()),
                None,
                now,
            );
            match self
                .store
                .update_subscription(subscription.clone().cancelled(), expected, Some(record))
                .await
            {
                Ok(updated) => {
                    info!(
                        subscription = %updated.id,
                        user = %updated.user_id,
                        "subscription cancelled"
                    );
                    return Ok(updated);
                }
                // Lost a race on the status; re-read and settle again.
                Err(MonetizationError::InvalidState(_)) => {
                    subscription = self
                        .store
                        .find_subscription(subscription.id)
                        .await?
                        .ok_or_else(|| {
                            MonetizationError::NotFound(format!(
                                "subscription {}",
                                subscription.id
                            ))
                        })?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn renew(
        &self,
        subscription_id: Uuid,
        payment_reference: Option<String>,
    ) -> Result<UserSubscription> {
        self.renew_at(Utc::now(), subscription_id, payment_reference).await
    }

    /// Opens the next billing period for an active or lapsed subscription.
    pub async fn renew_at(
        &self,
        now: DateTime<Utc>,
        subscription_id: Uuid,
        payment_reference: Option<String>,
    ) -> Result<UserSubscription> {
        loop {
            let subscription = self
                .store
                .find_subscription(subscription_id)
                .await?
                .ok_or_else(|| {
                    MonetizationError::NotFound(format!("subscription {subscription_id}"))
                })?;
            match subscription.status {
                SubscriptionStatus::Active | SubscriptionStatus::Expired => {}
                other => {
                    return Err(MonetizationError::InvalidState(format!(
                        "subscription cannot be renewed (status: {other:?})"
                    )));
                }
            }
            let plan = self
                .store
                .find_plan(subscription.plan_id)
                .await?
                .ok_or_else(|| {
                    MonetizationError::NotFound(format!(
                        "subscription plan {}",
                        subscription.plan_id
                    ))
                })?;
            let expected = subscription.status;
            let renewed = subscription.renewed(now);
            let record = SubscriptionTransaction::record(
                renewed.id,
                SubscriptionEventKind::Renewal,
                plan.charge_for(renewed.billing_cycle),
                payment_reference.clone(),
                now,
            );
            match self.store.update_subscription(renewed, expected, Some(record)).await {
                Ok(updated) => {
                    info!(
                        subscription = %updated.id,
                        end = %updated.end_date,
                        "subscription renewed"
                    );
                    return Ok(updated);
                }
                Err(MonetizationError::InvalidState(_)) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn check_benefit(
        &self,
        user: UserId,
        benefit_type: BenefitType,
    ) -> Result<Option<PlanBenefit>> {
        self.check_benefit_at(Utc::now(), user, benefit_type).await
    }

    /// The first active benefit of the given type on the user's active
    /// plan, if any.
    pub async fn check_benefit_at(
        &self,
        now: DateTime<Utc>,
        user: UserId,
        benefit_type: BenefitType,
    ) -> Result<Option<PlanBenefit>> {
        let Some(subscription) = self.store.active_subscription(user, now).await? else {
            return Ok(None);
        };
        let benefits = self.store.benefits_for_plan(subscription.plan_id).await?;
        Ok(benefits
            .into_iter()
            .find(|b| b.is_active && b.benefit_type == benefit_type))
    }

    /// Billing history for a subscription, oldest first.
    pub async fn billing_history(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<SubscriptionTransaction>> {
        self.store.transactions_for(subscription_id).await
    }
}
