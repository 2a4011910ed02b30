use crate::domain::money::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    All,
    Transfer,
    Deposit,
    Withdrawal,
    Payment,
    Airtime,
    Data,
    BillPayment,
}

impl TransactionType {
    /// Whether a rule declared for `self` applies to a `requested` type.
    pub fn covers(&self, requested: TransactionType) -> bool {
        *self == TransactionType::All || *self == requested
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum FeeRuleKind {
    Fixed,
    Percentage,
    CappedPercentage,
    MinimumFee,
}

/// Named container of fee rules. Deactivating a structure disables all of
/// its rules regardless of their own flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeStructure {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_active: bool,
}

/// One declarative fee clause.
///
/// The amount fields are plain decimals: rule configuration is
/// currency-agnostic and is interpreted in the currency of the transaction
/// being priced. Which fields are meaningful depends on `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeRule {
    pub id: Uuid,
    pub structure_id: Uuid,
    pub name: String,
    pub kind: FeeRuleKind,
    pub transaction_type: TransactionType,
    pub fixed_amount: Option<Decimal>,
    pub percentage: Option<Decimal>,
    /// Inclusive lower bound of the applicability window; unbounded if unset.
    pub min_amount: Option<Decimal>,
    /// Inclusive upper bound of the applicability window; unbounded if unset.
    pub max_amount: Option<Decimal>,
    pub cap_amount: Option<Decimal>,
    pub min_fee: Option<Decimal>,
    /// Higher priority rules are evaluated first.
    pub priority: i32,
    pub is_active: bool,
}

impl FeeRule {
    /// Whether this rule matches the requested transaction type and amount.
    /// Structure activity is checked by the store, not here.
    pub fn applies_to(&self, transaction_type: TransactionType, amount: Decimal) -> bool {
        if !self.is_active || !self.transaction_type.covers(transaction_type) {
            return false;
        }
        if let Some(min) = self.min_amount
            && amount < min
        {
            return false;
        }
        if let Some(max) = self.max_amount
            && amount > max
        {
            return false;
        }
        true
    }

    /// The fee this rule contributes on top of `running_fee` for a
    /// transaction of `amount`.
    ///
    /// Returns `None` when the rule is missing the configuration its kind
    /// requires; such rules are skipped rather than failing the whole
    /// calculation.
    pub fn contribution(&self, amount: Decimal, running_fee: Decimal) -> Option<Decimal> {
        match self.kind {
            FeeRuleKind::Fixed => self.fixed_amount,
            FeeRuleKind::Percentage => {
                let pct = self.percentage?;
                Some(amount * pct / Decimal::ONE_HUNDRED)
            }
            FeeRuleKind::CappedPercentage => {
                let pct = self.percentage?;
                let cap = self.cap_amount?;
                Some((amount * pct / Decimal::ONE_HUNDRED).min(cap))
            }
            FeeRuleKind::MinimumFee => {
                let min_fee = self.min_fee?;
                if running_fee < min_fee {
                    Some(min_fee - running_fee)
                } else {
                    Some(Decimal::ZERO)
                }
            }
        }
    }
}

/// One entry of the audit trace: which rule fired and what it added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedRule {
    pub rule_id: Uuid,
    pub rule_name: String,
    pub rule_kind: FeeRuleKind,
    pub amount: Money,
}

/// Outcome of a fee calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeResult {
    pub fee_amount: Money,
    pub original_amount: Money,
    /// `original_amount + fee_amount`.
    pub total_amount: Money,
    pub discount_applied: bool,
    pub discount_amount: Money,
    /// Contributing rules in application order.
    pub rules_applied: Vec<AppliedRule>,
}
