//! Domain layer: the monetization model and the ports it is stored through.
//!
//! Everything here is plain data plus pure predicates; effects live behind
//! the traits in [`ports`].

pub mod discount;
pub mod fee;
pub mod ids;
pub mod money;
pub mod ports;
pub mod referral;
pub mod subscription;
