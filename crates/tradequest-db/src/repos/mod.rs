//! Repository implementations

mod membership;
mod notification;

pub use membership::MembershipRepo;
pub use notification::NotificationRepo;
