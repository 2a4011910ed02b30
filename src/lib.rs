//! Monetization building blocks for a payments platform: fee calculation
//! from prioritized rule sets, discount codes, a fraud-screened referral
//! program and premium subscriptions.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
