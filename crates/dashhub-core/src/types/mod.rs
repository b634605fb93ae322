//! Core type definitions used across the DashHub workspace.

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};
