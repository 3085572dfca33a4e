//! Shared utilities for warden
//!
//! This crate provides:
//! - ID types (ModeKey, SessionId)
//! - Time utilities (monotonic time, calendar bucketing)
//! - The core error type with stable kind strings

mod error;
mod ids;
mod time;

pub use error::*;
pub use ids::*;
pub use time::*;
