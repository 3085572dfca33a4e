//! Core events emitted by the mode controller

use std::time::Duration;
use warden_util::ModeKey;

/// Events emitted by the core
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// Mode state committed to a new selector
    ModeSwitched {
        from: Option<ModeKey>,
        to: ModeKey,
        /// How long the previous mode window lasted
        previous_duration: Option<Duration>,
    },

    /// Mode tracking deactivated
    ModeDeactivated {
        key: ModeKey,
        duration: Duration,
    },
}
