//! Caller-facing services composing the repository layer: search,
//! timeline/profile display, and login sessions. The transport that maps
//! requests onto these calls lives elsewhere.

pub mod error;
pub mod search;
pub mod session;
pub mod timeline;

pub use error::{Result, ServiceError};
