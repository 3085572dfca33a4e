//! Shared types for the warden core
//!
//! Plain data records that cross crate seams: window samples, usage
//! sessions, mode selectors, timer snapshots, and power actions. These
//! types carry no behavior beyond derivation helpers; the components that
//! own them live in `warden-track` and `warden-core`.

mod sample;
mod session;
mod types;

pub use sample::*;
pub use session::*;
pub use types::*;

/// API version for compatibility checking between the core and its callers
pub const API_VERSION: u32 = 1;
