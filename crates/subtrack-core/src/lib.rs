//! # subtrack-core
//!
//! Core crate for SubTrack. Contains the unified error system, configuration
//! schemas, typed identifiers, pagination types, and the traits describing
//! external collaborators (the delayed-callback scheduler).
//!
//! This crate has **no** internal dependencies on other SubTrack crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
