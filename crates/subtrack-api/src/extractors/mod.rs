//! Custom Axum extractors.

pub mod auth;
pub mod json;
pub mod pagination;
pub mod path;

pub use auth::{AdminUser, AuthUser};
pub use json::{ApiJson, ValidatedJson};
pub use pagination::PaginationParams;
pub use path::{ApiPath, ApiQuery};
