use crate::application::discounts::DiscountEngine;
use crate::domain::fee::{AppliedRule, FeeResult, TransactionType};
use crate::domain::ids::UserId;
use crate::domain::money::Money;
use crate::domain::ports::FeeRuleStoreBox;
use crate::error::{MonetizationError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::warn;

/// Prices a transaction: folds every matching fee rule into one fee, then
/// lets an optional discount code reduce it.
///
/// Calculation is pure; nothing is written. Redemptions are booked
/// separately through [`DiscountEngine::record_usage`] once the
/// transaction settles.
pub struct FeeEngine {
    rules: FeeRuleStoreBox,
    discounts: DiscountEngine,
}

impl FeeEngine {
    /// Creates a new `FeeEngine`.
    ///
    /// # Arguments
    ///
    /// * `rules` - The store fee rules are matched against.
    /// * `discounts` - The engine that validates discount codes.
    pub fn new(rules: FeeRuleStoreBox, discounts: DiscountEngine) -> Self {
        Self { rules, discounts }
    }

    pub async fn calculate_fee(
        &self,
        transaction_type: TransactionType,
        amount: Money,
        user: Option<UserId>,
        discount_code: Option<&str>,
    ) -> Result<FeeResult> {
        self.calculate_fee_at(Utc::now(), transaction_type, amount, user, discount_code)
            .await
    }

    /// Same as [`calculate_fee`](Self::calculate_fee) with an explicit
    /// evaluation instant.
    pub async fn calculate_fee_at(
        &self,
        now: DateTime<Utc>,
        transaction_type: TransactionType,
        amount: Money,
        user: Option<UserId>,
        discount_code: Option<&str>,
    ) -> Result<FeeResult> {
        if amount.is_negative() {
            return Err(MonetizationError::Validation(
                "transaction amount cannot be negative".to_string(),
            ));
        }

        let mut rules = self
            .rules
            .active_rules(transaction_type, amount.amount())
            .await?;
        // Stable sort: rules sharing a priority keep their stored order.
        rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority));

        let currency = amount.currency();
        let mut fee = Decimal::ZERO;
        let mut rules_applied = Vec::new();
        for rule in &rules {
            let Some(contribution) = rule.contribution(amount.amount(), fee) else {
                warn!(
                    rule = %rule.name,
                    rule_id = %rule.id,
                    kind = ?rule.kind,
                    "skipping fee rule with incomplete configuration"
                );
                continue;
            };
            if contribution > Decimal::ZERO {
                fee += contribution;
                rules_applied.push(AppliedRule {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    rule_kind: rule.kind,
                    amount: Money::new(contribution, currency),
                });
            }
        }

        let mut discount_applied = false;
        let mut discount_amount = Money::zero(currency);
        if let Some(code) = discount_code
            && fee > Decimal::ZERO
        {
            let discount = self
                .discounts
                .apply_at(now, code, Money::new(fee, currency), user)
                .await?;
            if discount.applied {
                discount_applied = true;
                discount_amount = discount.discount_amount;
                fee = discount.discounted_fee.amount();
            }
        }

        let fee_amount = Money::new(fee, currency);
        let total_amount = amount.add(&fee_amount)?;
        Ok(FeeResult {
            fee_amount,
            original_amount: amount,
            total_amount,
            discount_applied,
            discount_amount,
            rules_applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::discount::{DiscountCode, DiscountKind};
    use crate::domain::fee::{FeeRule, FeeRuleKind, FeeStructure};
    use crate::domain::money::Currency;
    use crate::infrastructure::in_memory::InMemoryStore;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn structure() -> FeeStructure {
        FeeStructure {
            id: Uuid::new_v4(),
            name: "standard fees".to_string(),
            description: "test structure".to_string(),
            is_active: true,
        }
    }

    fn rule(structure_id: Uuid, kind: FeeRuleKind, priority: i32) -> FeeRule {
        FeeRule {
            id: Uuid::new_v4(),
            structure_id,
            name: format!("{kind:?}"),
            kind,
            transaction_type: TransactionType::All,
            fixed_amount: None,
            percentage: None,
            min_amount: None,
            max_amount: None,
            cap_amount: None,
            min_fee: None,
            priority,
            is_active: true,
        }
    }

    fn engine(store: &InMemoryStore) -> FeeEngine {
        FeeEngine::new(
            Box::new(store.clone()),
            DiscountEngine::new(Box::new(store.clone())),
        )
    }

    fn ngn(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::NGN)
    }

    #[tokio::test]
    async fn test_no_rules_means_zero_fee() {
        let store = InMemoryStore::new();
        let result = engine(&store)
            .calculate_fee(TransactionType::Transfer, ngn(dec!(1000)), None, None)
            .await
            .unwrap();

        assert!(result.fee_amount.is_zero());
        assert_eq!(result.total_amount, ngn(dec!(1000)));
        assert!(result.rules_applied.is_empty());
        assert!(!result.discount_applied);
    }

    #[tokio::test]
    async fn test_percentage_topped_up_to_minimum_fee() {
        let store = InMemoryStore::new();
        let s = structure();
        store.add_fee_structure(s.clone()).await;

        let mut pct = rule(s.id, FeeRuleKind::Percentage, 10);
        pct.percentage = Some(dec!(1.5));
        store.add_fee_rule(pct).await;

        let mut floor = rule(s.id, FeeRuleKind::MinimumFee, 0);
        floor.min_fee = Some(dec!(100));
        store.add_fee_rule(floor).await;

        let result = engine(&store)
            .calculate_fee(TransactionType::Transfer, ngn(dec!(1000)), None, None)
            .await
            .unwrap();

        assert_eq!(result.fee_amount, ngn(dec!(100)));
        assert_eq!(result.total_amount, ngn(dec!(1100)));
        assert_eq!(result.rules_applied.len(), 2);
        assert_eq!(result.rules_applied[0].amount, ngn(dec!(15.0)));
        assert_eq!(result.rules_applied[1].amount, ngn(dec!(85.0)));
    }

    #[tokio::test]
    async fn test_capped_percentage_stops_at_cap() {
        let store = InMemoryStore::new();
        let s = structure();
        store.add_fee_structure(s.clone()).await;

        let mut capped = rule(s.id, FeeRuleKind::CappedPercentage, 0);
        capped.percentage = Some(dec!(10));
        capped.cap_amount = Some(dec!(50));
        store.add_fee_rule(capped).await;

        let result = engine(&store)
            .calculate_fee(TransactionType::Withdrawal, ngn(dec!(5000)), None, None)
            .await
            .unwrap();

        assert_eq!(result.fee_amount, ngn(dec!(50)));
    }

    #[tokio::test]
    async fn test_malformed_rule_is_skipped() {
        let store = InMemoryStore::new();
        let s = structure();
        store.add_fee_structure(s.clone()).await;

        // Percentage rule with no percentage configured.
        store.add_fee_rule(rule(s.id, FeeRuleKind::Percentage, 20)).await;

        let mut fixed = rule(s.id, FeeRuleKind::Fixed, 10);
        fixed.fixed_amount = Some(dec!(25));
        store.add_fee_rule(fixed).await;

        let result = engine(&store)
            .calculate_fee(TransactionType::Transfer, ngn(dec!(1000)), None, None)
            .await
            .unwrap();

        assert_eq!(result.fee_amount, ngn(dec!(25)));
        assert_eq!(result.rules_applied.len(), 1);
    }

    #[tokio::test]
    async fn test_inactive_structure_disables_its_rules() {
        let store = InMemoryStore::new();
        let mut s = structure();
        s.is_active = false;
        store.add_fee_structure(s.clone()).await;

        let mut fixed = rule(s.id, FeeRuleKind::Fixed, 0);
        fixed.fixed_amount = Some(dec!(25));
        store.add_fee_rule(fixed).await;

        let result = engine(&store)
            .calculate_fee(TransactionType::Transfer, ngn(dec!(1000)), None, None)
            .await
            .unwrap();

        assert!(result.fee_amount.is_zero());
    }

    #[tokio::test]
    async fn test_waive_fee_discount_clears_fee() {
        let store = InMemoryStore::new();
        let s = structure();
        store.add_fee_structure(s.clone()).await;

        let mut fixed = rule(s.id, FeeRuleKind::Fixed, 0);
        fixed.fixed_amount = Some(dec!(75));
        store.add_fee_rule(fixed).await;

        store
            .add_discount_code(DiscountCode {
                id: Uuid::new_v4(),
                code: "FREEBIE".to_string(),
                description: "waives everything".to_string(),
                kind: DiscountKind::WaiveFee,
                fixed_amount: None,
                percentage: None,
                max_uses: None,
                uses_count: 0,
                max_uses_per_user: None,
                valid_from: Utc::now() - Duration::days(1),
                valid_until: None,
                is_active: true,
            })
            .await;

        let result = engine(&store)
            .calculate_fee(TransactionType::Transfer, ngn(dec!(1000)), None, Some("FREEBIE"))
            .await
            .unwrap();

        assert!(result.discount_applied);
        assert_eq!(result.discount_amount, ngn(dec!(75)));
        assert!(result.fee_amount.is_zero());
        assert_eq!(result.total_amount, ngn(dec!(1000)));
    }

    #[tokio::test]
    async fn test_negative_amount_is_rejected() {
        let store = InMemoryStore::new();
        let err = engine(&store)
            .calculate_fee(TransactionType::Transfer, ngn(dec!(-5)), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MonetizationError::Validation(_)));
    }
}
