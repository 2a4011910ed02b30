use crate::domain::ids::UserId;
use crate::domain::money::Money;
use crate::domain::ports::ReferralStoreBox;
use crate::domain::referral::{FraudSignals, Referral, ReferralCode, ReferralStatus};
use crate::error::{MonetizationError, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

const CODE_LENGTH: usize = 8;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_MINT_ATTEMPTS: usize = 16;

fn random_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Amounts to credit once a referral is rewarded. The crediting itself
/// belongs to the ledger, not to this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralPayout {
    pub referrer: UserId,
    pub referrer_reward: Money,
    pub referee: UserId,
    pub referee_reward: Money,
}

/// Result of a reward request. `payout` is `Some` exactly once per
/// referral; repeating the call returns the referral without amounts.
#[derive(Debug, Clone)]
pub struct RewardOutcome {
    pub referral: Referral,
    pub payout: Option<ReferralPayout>,
}

/// Runs the referral program: issues codes, accepts referrals, screens
/// them for fraud and releases rewards.
pub struct ReferralEngine {
    store: ReferralStoreBox,
}

impl ReferralEngine {
    pub fn new(store: ReferralStoreBox) -> Self {
        Self { store }
    }

    pub async fn generate_code(
        &self,
        user: UserId,
        program: Option<Uuid>,
    ) -> Result<ReferralCode> {
        self.generate_code_at(Utc::now(), user, program).await
    }

    /// Returns the user's existing active code for the program, minting a
    /// fresh one only when none exists.
    pub async fn generate_code_at(
        &self,
        now: DateTime<Utc>,
        user: UserId,
        program: Option<Uuid>,
    ) -> Result<ReferralCode> {
        let program = match program {
            Some(id) => self
                .store
                .find_program(id)
                .await?
                .ok_or_else(|| MonetizationError::NotFound(format!("referral program {id}")))?,
            None => self.store.default_program().await?.ok_or_else(|| {
                MonetizationError::NotFound("no active referral program".to_string())
            })?,
        };

        if let Some(existing) = self.store.code_for_user(user, program.id).await? {
            return Ok(existing);
        }

        for _ in 0..MAX_MINT_ATTEMPTS {
            let candidate = ReferralCode::new(program.id, user, random_code(), now);
            if let Some(code) = self.store.claim_code(candidate).await? {
                info!(user = %user, program = %program.name, code = %code.code, "issued referral code");
                return Ok(code);
            }
        }
        Err(MonetizationError::Internal(
            "could not mint a unique referral code".to_string(),
        ))
    }

    pub async fn process_referral(
        &self,
        code: &str,
        referee: UserId,
        signals: FraudSignals,
    ) -> Result<Referral> {
        self.process_referral_at(Utc::now(), code, referee, signals).await
    }

    /// Accepts a signup against a referral code. The referral stays
    /// Pending until verification screens it.
    pub async fn process_referral_at(
        &self,
        now: DateTime<Utc>,
        code: &str,
        referee: UserId,
        signals: FraudSignals,
    ) -> Result<Referral> {
        let referral_code = self
            .store
            .find_code(code)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| MonetizationError::NotFound(format!("referral code {code}")))?;
        let program = self
            .store
            .find_program(referral_code.program_id)
            .await?
            .ok_or_else(|| {
                MonetizationError::NotFound(format!(
                    "referral program {}",
                    referral_code.program_id
                ))
            })?;

        if !program.is_active {
            return Err(MonetizationError::Ineligible(
                "referral program is not active".to_string(),
            ));
        }
        if let Some(until) = program.valid_until
            && now > until
        {
            return Err(MonetizationError::Ineligible(
                "referral program has expired".to_string(),
            ));
        }
        if program.max_referrals_per_user > 0 {
            let confirmed = self
                .store
                .confirmed_referral_count(referral_code.user_id, program.id)
                .await?;
            if confirmed >= program.max_referrals_per_user {
                return Err(MonetizationError::Ineligible(
                    "referrer has reached maximum referrals limit".to_string(),
                ));
            }
        }
        if self.store.referee_has_referral(referee).await? {
            return Err(MonetizationError::Ineligible(
                "user has already been referred".to_string(),
            ));
        }

        let referral = Referral::pending(
            program.id,
            referral_code.id,
            referral_code.user_id,
            referee,
            signals,
            now,
        );
        let referral = self.store.commit_referral(referral).await?;
        info!(
            referral = %referral.id,
            referrer = %referral.referrer_id,
            referee = %referral.referee_id,
            "referral recorded"
        );
        Ok(referral)
    }

    pub async fn verify_referral(&self, id: Uuid) -> Result<Referral> {
        self.verify_referral_at(Utc::now(), id).await
    }

    /// Screens a pending referral and settles it as Verified or Rejected;
    /// the rejected state comes back as an `Ok` value for the caller to
    /// inspect. Verified and Rewarded referrals come back unchanged, while
    /// re-verifying an already rejected one is an error carrying the
    /// stored reason.
    pub async fn verify_referral_at(&self, now: DateTime<Utc>, id: Uuid) -> Result<Referral> {
        loop {
            let referral = self
                .store
                .find_referral(id)
                .await?
                .ok_or_else(|| MonetizationError::NotFound(format!("referral {id}")))?;
            match referral.status {
                ReferralStatus::Verified | ReferralStatus::Rewarded => return Ok(referral),
                ReferralStatus::Rejected => {
                    let reason = referral
                        .rejection_reason
                        .as_deref()
                        .unwrap_or("unspecified")
                        .to_string();
                    return Err(MonetizationError::InvalidState(format!(
                        "referral was rejected: {reason}"
                    )));
                }
                ReferralStatus::Pending => {
                    let program = self
                        .store
                        .find_program(referral.program_id)
                        .await?
                        .ok_or_else(|| {
                            MonetizationError::NotFound(format!(
                                "referral program {}",
                                referral.program_id
                            ))
                        })?;
                    let settled = match referral.fraud_reason(&program) {
                        Some(reason) => {
                            warn!(referral = %id, reason, "referral failed fraud screening");
                            referral.rejected(reason, now)
                        }
                        None => referral.verified(now),
                    };
                    match self
                        .store
                        .transition_referral(settled, ReferralStatus::Pending)
                        .await
                    {
                        Ok(updated) => {
                            info!(referral = %id, status = ?updated.status, "referral screened");
                            return Ok(updated);
                        }
                        // Lost the race on the status; the next read
                        // settles through the branches above.
                        Err(MonetizationError::InvalidState(_)) => continue,
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    pub async fn process_reward(&self, id: Uuid) -> Result<RewardOutcome> {
        self.process_reward_at(Utc::now(), id).await
    }

    /// Releases the reward for a verified referral. Amounts are handed to
    /// the caller for crediting; repeating the call pays nothing twice.
    pub async fn process_reward_at(
        &self,
        now: DateTime<Utc>,
        id: Uuid,
    ) -> Result<RewardOutcome> {
        loop {
            let referral = self
                .store
                .find_referral(id)
                .await?
                .ok_or_else(|| MonetizationError::NotFound(format!("referral {id}")))?;
            match referral.status {
                ReferralStatus::Rewarded => {
                    return Ok(RewardOutcome { referral, payout: None });
                }
                ReferralStatus::Pending | ReferralStatus::Rejected => {
                    return Err(MonetizationError::InvalidState(format!(
                        "referral is not verified (status: {:?})",
                        referral.status
                    )));
                }
                ReferralStatus::Verified => {
                    let program = self
                        .store
                        .find_program(referral.program_id)
                        .await?
                        .ok_or_else(|| {
                            MonetizationError::NotFound(format!(
                                "referral program {}",
                                referral.program_id
                            ))
                        })?;
                    match self
                        .store
                        .transition_referral(referral.rewarded(now), ReferralStatus::Verified)
                        .await
                    {
                        Ok(updated) => {
                            info!(referral = %id, "referral rewarded");
                            let payout = ReferralPayout {
                                referrer: updated.referrer_id,
                                referrer_reward: program.referrer_reward,
                                referee: updated.referee_id,
                                referee_reward: program.referee_reward,
                            };
                            return Ok(RewardOutcome {
                                referral: updated,
                                payout: Some(payout),
                            });
                        }
                        Err(MonetizationError::InvalidState(_)) => continue,
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }
}
