use crate::domain::ids::UserId;
use crate::domain::money::Money;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
    Expired,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Annual,
}

impl BillingCycle {
    /// Fixed-length billing periods: 30 days monthly, 365 days annual.
    pub fn period(&self) -> Duration {
        match self {
            BillingCycle::Monthly => Duration::days(30),
            BillingCycle::Annual => Duration::days(365),
        }
    }
}

/// A premium tier users can subscribe to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub monthly_fee: Money,
    pub annual_fee: Option<Money>,
    pub is_active: bool,
}

impl SubscriptionPlan {
    /// The charge for one period of `cycle`. Plans without an annual price
    /// bill twelve months up front.
    pub fn charge_for(&self, cycle: BillingCycle) -> Money {
        match cycle {
            BillingCycle::Monthly => self.monthly_fee,
            BillingCycle::Annual => self.annual_fee.unwrap_or_else(|| self.monthly_fee.times(12)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BenefitType {
    FeeDiscount,
    TransactionLimit,
    InterestRateBoost,
    FeatureAccess,
    SupportLevel,
}

/// One perk attached to a plan. `value` stays an opaque string whose
/// interpretation belongs to the consuming feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanBenefit {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub benefit_type: BenefitType,
    pub name: String,
    pub description: String,
    pub value: String,
    pub is_active: bool,
}

/// A user's enrollment in a plan over a concrete period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: Uuid,
    pub user_id: UserId,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    pub start_date: DateTime<Utc>,
    /// Inclusive end of the paid period.
    pub end_date: DateTime<Utc>,
    pub auto_renew: bool,
}

impl UserSubscription {
    /// A freshly paid subscription covering one billing period from `now`.
    pub fn open(
        user_id: UserId,
        plan_id: Uuid,
        billing_cycle: BillingCycle,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            plan_id,
            status: SubscriptionStatus::Active,
            billing_cycle,
            start_date: now,
            end_date: now + billing_cycle.period(),
            auto_renew: true,
        }
    }

    /// Active status alone is not enough; the paid window must also cover
    /// `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active
            && self.start_date <= now
            && now <= self.end_date
    }

    pub fn cancelled(mut self) -> Self {
        self.status = SubscriptionStatus::Cancelled;
        self.auto_renew = false;
        self
    }

    /// The next paid period. Starts where the old one ends while that is
    /// still in the future, otherwise restarts at `now` after a lapse.
    pub fn renewed(mut self, now: DateTime<Utc>) -> Self {
        let start = if self.end_date > now { self.end_date } else { now };
        self.status = SubscriptionStatus::Active;
        self.start_date = start;
        self.end_date = start + self.billing_cycle.period();
        self
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionEventKind {
    New,
    Renewal,
    Upgrade,
    Downgrade,
    Cancellation,
}

/// Append-only audit record of a billing event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionTransaction {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub kind: SubscriptionEventKind,
    pub amount: Money,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionTransaction {
    pub fn record(
        subscription_id: Uuid,
        kind: SubscriptionEventKind,
        amount: Money,
        payment_reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subscription_id,
            kind,
            amount,
            payment_reference,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Currency;
    use rust_decimal_macros::dec;

    fn plan() -> SubscriptionPlan {
        SubscriptionPlan {
            id: Uuid::new_v4(),
            name: "premium".to_string(),
            description: "test plan".to_string(),
            monthly_fee: Money::new(dec!(1000), Currency::NGN),
            annual_fee: None,
            is_active: true,
        }
    }

    #[test]
    fn test_annual_charge_falls_back_to_twelve_months() {
        let p = plan();
        assert_eq!(
            p.charge_for(BillingCycle::Annual),
            Money::new(dec!(12000), Currency::NGN)
        );

        let mut discounted = plan();
        discounted.annual_fee = Some(Money::new(dec!(10000), Currency::NGN));
        assert_eq!(
            discounted.charge_for(BillingCycle::Annual),
            Money::new(dec!(10000), Currency::NGN)
        );
    }

    #[test]
    fn test_open_covers_one_period() {
        let now = Utc::now();
        let sub = UserSubscription::open(
            UserId(Uuid::new_v4()),
            Uuid::new_v4(),
            BillingCycle::Monthly,
            now,
        );
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.end_date, now + Duration::days(30));
        assert!(sub.auto_renew);
    }

    #[test]
    fn test_is_active_at_window_bounds() {
        let now = Utc::now();
        let sub = UserSubscription::open(
            UserId(Uuid::new_v4()),
            Uuid::new_v4(),
            BillingCycle::Monthly,
            now,
        );
        assert!(sub.is_active_at(now));
        assert!(sub.is_active_at(now + Duration::days(30)));
        assert!(!sub.is_active_at(now + Duration::days(31)));
        assert!(!sub.is_active_at(now - Duration::seconds(1)));

        let cancelled = sub.cancelled();
        assert!(!cancelled.is_active_at(now));
        assert!(!cancelled.auto_renew);
    }

    #[test]
    fn test_renewal_is_gapless_before_expiry() {
        let now = Utc::now();
        let sub = UserSubscription::open(
            UserId(Uuid::new_v4()),
            Uuid::new_v4(),
            BillingCycle::Monthly,
            now,
        );
        let old_end = sub.end_date;

        let renewed = sub.renewed(now + Duration::days(20));
        assert_eq!(renewed.start_date, old_end);
        assert_eq!(renewed.end_date, old_end + Duration::days(30));
    }

    #[test]
    fn test_renewal_after_lapse_restarts_now() {
        let now = Utc::now();
        let mut sub = UserSubscription::open(
            UserId(Uuid::new_v4()),
            Uuid::new_v4(),
            BillingCycle::Monthly,
            now - Duration::days(90),
        );
        sub.status = SubscriptionStatus::Expired;

        let renewed = sub.renewed(now);
        assert_eq!(renewed.status, SubscriptionStatus::Active);
        assert_eq!(renewed.start_date, now);
        assert_eq!(renewed.end_date, now + Duration::days(30));
    }
}
