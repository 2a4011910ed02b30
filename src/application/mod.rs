//! Application layer containing the core business logic orchestration.
//!
//! One engine per monetization concern, each owning the store ports it
//! needs. Engines hold no state of their own; every mutation goes through
//! a single atomic port operation, so they are safe to build per request.

pub mod discounts;
pub mod fees;
pub mod referrals;
pub mod subscriptions;
