//! # subtrack-entity
//!
//! Domain entity models for SubTrack. Every struct in this crate represents
//! a database table row or a domain value object. All entities derive
//! `Debug`, `Clone`, `Serialize`, `Deserialize`, and database entities
//! additionally derive `sqlx::FromRow`.
//!
//! The notification event catalog lives in [`notification::facts`].

pub mod group;
pub mod job;
pub mod notification;
pub mod payment;
pub mod subscription;
pub mod workflow;
