//! PostgreSQL implementations of the store traits.

pub mod group;
pub mod job;
pub mod notification;
pub mod payment;
pub mod subscription;
pub mod workflow;

pub use group::GroupRepository;
pub use job::JobRepository;
pub use notification::NotificationRepository;
pub use payment::PaymentRepository;
pub use subscription::SubscriptionRepository;
pub use workflow::WorkflowRepository;
