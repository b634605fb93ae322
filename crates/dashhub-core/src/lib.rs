//! # dashhub-core
//!
//! Core crate for the DashHub background scheduler. Contains the collaborator
//! traits (key-value cache, pub/sub), configuration schemas, the clock
//! abstraction, and the unified error system.
//!
//! This crate has **no** internal dependencies on other DashHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
