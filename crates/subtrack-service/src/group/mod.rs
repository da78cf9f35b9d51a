//! Sharing group management.

pub mod service;

pub use service::GroupService;
