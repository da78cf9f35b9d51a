//! Payment-provider webhook intake.

pub mod service;

pub use service::{PaymentWebhookEvent, WebhookOutcome, WebhookService};
