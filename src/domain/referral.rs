use crate::domain::ids::UserId;
use crate::domain::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    Verified,
    Rewarded,
    Rejected,
}

impl ReferralStatus {
    /// Rewarded and Rejected are final; no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReferralStatus::Rewarded | ReferralStatus::Rejected)
    }

    /// Whether the referral counts toward the referrer's program cap.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ReferralStatus::Verified | ReferralStatus::Rewarded)
    }
}

/// A referral campaign: rewards, per-referrer cap, validity window and
/// fraud screening configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralProgram {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub referrer_reward: Money,
    pub referee_reward: Money,
    /// Confirmed referrals allowed per referrer; zero means unlimited.
    pub max_referrals_per_user: u32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Reject referrals where both parties share an IP address.
    pub ip_address_validation: bool,
    /// Reject referrals where both parties share a device id.
    pub device_validation: bool,
    pub require_kyc_verification: bool,
    pub minimum_activity_days: u32,
    pub minimum_transaction_count: u32,
    pub minimum_transaction_volume: Money,
}

/// A user's shareable code within one program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralCode {
    pub id: Uuid,
    pub program_id: Uuid,
    pub user_id: UserId,
    /// 8 uppercase alphanumeric characters, unique across all codes.
    pub code: String,
    pub times_used: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ReferralCode {
    pub fn new(
        program_id: Uuid,
        user_id: UserId,
        code: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            program_id,
            user_id,
            code,
            times_used: 0,
            is_active: true,
            created_at: now,
        }
    }
}

/// Network and device evidence captured when the referral is created.
/// Verification screens against this snapshot, never against live data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudSignals {
    pub referrer_ip: Option<String>,
    pub referee_ip: Option<String>,
    pub referrer_device_id: Option<String>,
    pub referee_device_id: Option<String>,
}

/// One referee's journey through a program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    pub id: Uuid,
    pub program_id: Uuid,
    pub code_id: Uuid,
    pub referrer_id: UserId,
    pub referee_id: UserId,
    pub status: ReferralStatus,
    pub signals: FraudSignals,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rewarded_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Referral {
    pub fn pending(
        program_id: Uuid,
        code_id: Uuid,
        referrer_id: UserId,
        referee_id: UserId,
        signals: FraudSignals,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            program_id,
            code_id,
            referrer_id,
            referee_id,
            status: ReferralStatus::Pending,
            signals,
            created_at: now,
            verified_at: None,
            rewarded_at: None,
            rejected_at: None,
            rejection_reason: None,
        }
    }

    /// First failing fraud check under the program's screening
    /// configuration, if any. Checks run in a fixed order so the recorded
    /// reason is deterministic.
    pub fn fraud_reason(&self, program: &ReferralProgram) -> Option<&'static str> {
        if self.referrer_id == self.referee_id {
            return Some("Referrer and referee cannot be the same person");
        }
        if program.ip_address_validation
            && let (Some(referrer_ip), Some(referee_ip)) =
                (&self.signals.referrer_ip, &self.signals.referee_ip)
            && referrer_ip == referee_ip
        {
            return Some("Referrer and referee have the same IP address");
        }
        if program.device_validation
            && let (Some(referrer_device), Some(referee_device)) =
                (&self.signals.referrer_device_id, &self.signals.referee_device_id)
            && referrer_device == referee_device
        {
            return Some("Referrer and referee have the same device");
        }
        None
    }

    pub fn verified(mut self, now: DateTime<Utc>) -> Self {
        self.status = ReferralStatus::Verified;
        self.verified_at = Some(now);
        self
    }

    pub fn rejected(mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        self.status = ReferralStatus::Rejected;
        self.rejected_at = Some(now);
        self.rejection_reason = Some(reason.into());
        self
    }

    pub fn rewarded(mut self, now: DateTime<Utc>) -> Self {
        self.status = ReferralStatus::Rewarded;
        self.rewarded_at = Some(now);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Currency;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn program() -> ReferralProgram {
        let reward = Money::new(dec!(500), Currency::NGN);
        ReferralProgram {
            id: Uuid::new_v4(),
            name: "launch".to_string(),
            description: "test program".to_string(),
            referrer_reward: reward,
            referee_reward: reward,
            max_referrals_per_user: 10,
            valid_from: Utc::now() - Duration::days(30),
            valid_until: None,
            is_active: true,
            ip_address_validation: true,
            device_validation: true,
            require_kyc_verification: false,
            minimum_activity_days: 0,
            minimum_transaction_count: 0,
            minimum_transaction_volume: Money::zero(Currency::NGN),
        }
    }

    fn referral(referrer: UserId, referee: UserId, signals: FraudSignals) -> Referral {
        Referral::pending(
            Uuid::new_v4(),
            Uuid::new_v4(),
            referrer,
            referee,
            signals,
            Utc::now(),
        )
    }

    #[test]
    fn test_self_referral_is_flagged_first() {
        let user = UserId(Uuid::new_v4());
        let signals = FraudSignals {
            referrer_ip: Some("10.0.0.1".to_string()),
            referee_ip: Some("10.0.0.1".to_string()),
            ..FraudSignals::default()
        };
        let r = referral(user, user, signals);
        assert_eq!(
            r.fraud_reason(&program()),
            Some("Referrer and referee cannot be the same person")
        );
    }

    #[test]
    fn test_shared_ip_is_flagged_when_validated() {
        let signals = FraudSignals {
            referrer_ip: Some("10.0.0.1".to_string()),
            referee_ip: Some("10.0.0.1".to_string()),
            ..FraudSignals::default()
        };
        let r = referral(UserId(Uuid::new_v4()), UserId(Uuid::new_v4()), signals);
        assert_eq!(
            r.fraud_reason(&program()),
            Some("Referrer and referee have the same IP address")
        );

        let mut lenient = program();
        lenient.ip_address_validation = false;
        assert_eq!(r.fraud_reason(&lenient), None);
    }

    #[test]
    fn test_missing_ip_passes_screening() {
        let signals = FraudSignals {
            referrer_ip: Some("10.0.0.1".to_string()),
            ..FraudSignals::default()
        };
        let r = referral(UserId(Uuid::new_v4()), UserId(Uuid::new_v4()), signals);
        assert_eq!(r.fraud_reason(&program()), None);
    }

    #[test]
    fn test_shared_device_is_flagged_when_validated() {
        let signals = FraudSignals {
            referrer_device_id: Some("device-1".to_string()),
            referee_device_id: Some("device-1".to_string()),
            ..FraudSignals::default()
        };
        let r = referral(UserId(Uuid::new_v4()), UserId(Uuid::new_v4()), signals);
        assert_eq!(
            r.fraud_reason(&program()),
            Some("Referrer and referee have the same device")
        );
    }

    #[test]
    fn test_transitions_stamp_timestamps() {
        let now = Utc::now();
        let r = referral(
            UserId(Uuid::new_v4()),
            UserId(Uuid::new_v4()),
            FraudSignals::default(),
        );

        let verified = r.clone().verified(now);
        assert_eq!(verified.status, ReferralStatus::Verified);
        assert_eq!(verified.verified_at, Some(now));

        let rewarded = verified.rewarded(now);
        assert_eq!(rewarded.status, ReferralStatus::Rewarded);
        assert_eq!(rewarded.rewarded_at, Some(now));
        assert!(rewarded.status.is_terminal());

        let rejected = r.rejected("shared device", now);
        assert_eq!(rejected.status, ReferralStatus::Rejected);
        assert_eq!(rejected.rejected_at, Some(now));
        assert_eq!(rejected.rejection_reason.as_deref(), Some("shared device"));
        assert!(rejected.status.is_terminal());
    }

    #[test]
    fn test_confirmed_statuses() {
        assert!(!ReferralStatus::Pending.is_confirmed());
        assert!(ReferralStatus::Verified.is_confirmed());
        assert!(ReferralStatus::Rewarded.is_confirmed());
        assert!(!ReferralStatus::Rejected.is_confirmed());
    }
}
