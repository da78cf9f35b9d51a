//! Notification domain entities and the event catalog.

pub mod facts;
pub mod kind;
pub mod metadata;
pub mod model;
pub mod priority;

pub use facts::EventFacts;
pub use kind::NotificationKind;
pub use metadata::NotificationMetadata;
pub use model::{Generated, NewNotification, Notification, NotificationFilter};
pub use priority::NotificationPriority;
