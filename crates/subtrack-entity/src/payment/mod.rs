//! Shared-cost payment entities.

pub mod model;
pub mod status;
pub mod summary;

pub use model::{CreatePayment, Payment};
pub use status::PaymentStatus;
pub use summary::PaymentSummary;
