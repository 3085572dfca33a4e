//! Activity tracking pipeline for warden
//!
//! This crate contains:
//! - The window observer loop (periodic host snapshots, runtime-adjustable
//!   interval, cancellable)
//! - The session segmenter (sample stream -> bounded usage sessions)
//! - The analytics aggregator (pure derivations over the session/sample log)
//! - The productivity classifier (override > rule > cached AI > unclassified)

pub mod analytics;
mod classify;
mod observer;
mod segmenter;

pub use classify::*;
pub use observer::*;
pub use segmenter::*;
