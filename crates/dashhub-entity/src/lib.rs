//! # dashhub-entity
//!
//! Domain entity models for the DashHub scheduler. Every struct in this
//! crate represents a database table row or a published value object. All
//! entities derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and
//! database entities additionally derive `sqlx::FromRow`.

pub mod job;
pub mod queue;
