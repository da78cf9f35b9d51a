//! Route handlers organized by domain.

pub mod access;
pub mod group;
pub mod health;
pub mod notification;
pub mod payment;
pub mod subscription;
pub mod webhook;
pub mod workflow;
