//! TradeQuest Types - Canonical domain types for the league system
//!
//! This crate contains the foundational types shared by the league engine,
//! the persistence layer and the batch job, with zero dependencies on other
//! tradequest crates. It defines:
//!
//! - Identity types (UserId, NotificationId, CycleRunId)
//! - Tier names and cycle anchors
//! - League membership records and the updates applied at cycle close
//! - Notifications emitted to members
//!
//! # Lifecycle of a membership
//!
//! ```text
//! join (lowest tier, score 0) → XP awards during the cycle → cycle close
//!     → new tier, counters updated, score reset → next cycle ...
//! ```

pub mod identity;
pub mod tier;
pub mod cycle;
pub mod membership;
pub mod notification;
pub mod error;

pub use identity::*;
pub use tier::*;
pub use cycle::*;
pub use membership::*;
pub use notification::*;
pub use error::*;
