//! HTTP integration tests driving the router against in-memory storage.

mod helpers;

mod health_test;
mod notification_test;
mod payment_test;
mod subscription_test;
mod webhook_test;
