//! Host collaborator contracts for the warden core
//!
//! The core never touches the OS directly. Window inspection, app control,
//! notifications, and power actions all go through the [`HostAdapter`]
//! trait, implemented by platform adapters outside this workspace and by
//! [`MockHost`] in tests.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
