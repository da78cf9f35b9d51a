//! Sharing group entities.

pub mod model;
pub mod role;
pub mod split;

pub use model::{GroupMember, SharedSubscription, SharingGroup};
pub use role::GroupRole;
pub use split::{AmountShare, PercentShare, SplitConfig, SplitType};
