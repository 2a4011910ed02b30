#![allow(dead_code)]

use chrono::{Duration, Utc};
use monetization::domain::discount::{DiscountCode, DiscountKind};
use monetization::domain::fee::{FeeRule, FeeRuleKind, FeeStructure, TransactionType};
use monetization::domain::ids::UserId;
use monetization::domain::money::{Currency, Money};
use rust_decimal::Decimal;
use uuid::Uuid;

pub fn ngn(amount: Decimal) -> Money {
    Money::new(amount, Currency::NGN)
}

pub fn user() -> UserId {
    UserId(Uuid::new_v4())
}

pub fn fee_structure(name: &str) -> FeeStructure {
    FeeStructure {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: String::new(),
        is_active: true,
    }
}

pub fn fee_rule(structure_id: Uuid, name: &str, kind: FeeRuleKind, priority: i32) -> FeeRule {
    FeeRule {
        id: Uuid::new_v4(),
        structure_id,
        name: name.to_string(),
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

pub fn discount_code(code: &str, kind: DiscountKind) -> DiscountCode {
    DiscountCode {
        id: Uuid::new_v4(),
        code: code.to_string(),
        description: String::new(),
        kind,
        fixed_amount: None,
        percentage: None,
        max_uses: None,
        uses_count: 0,
        max_uses_per_user: None,
        valid_from: Utc::now() - Duration::days(1),
        valid_until: None,
        is_active: true,
    }
}
