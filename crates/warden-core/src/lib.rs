//! Core policy engine for warden
//!
//! Holds the mode state machine (active policy, enforcement decisions) and
//! the enforcement timer (budget countdown, warning, power-action dispatch,
//! passcode-gated unlock). Both are driven by the daemon; neither owns a
//! network or UI surface.

mod controller;
mod events;
mod mode;
mod timer;

pub use controller::*;
pub use events::*;
pub use mode::*;
pub use timer::*;
