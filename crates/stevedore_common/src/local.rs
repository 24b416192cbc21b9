//! Local-item state as observed on the user's machine.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an item on disk / in a process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallState {
    NotInstalled,
    InstalledIdle,
    InstalledRunning,
    Installing,
    Uninstalling,
}

/// Status payload for the host's local-game notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalGame {
    pub game_id: String,
    pub state: InstallState,
}

/// An installed (or installing) item discovered by the local scanner.
///
/// Implemented by the scanner's own objects. `state()` must be a cheap
/// read; the status check polls it every sweep.
pub trait LocalApp: Send + Sync {
    fn id(&self) -> &str;

    /// Current lifecycle state, re-read on every call.
    fn state(&self) -> InstallState;

    /// Launch the item's executable.
    fn run(&self) -> Result<()>;

    /// Start the platform uninstaller.
    fn uninstall(&self) -> Result<()>;
}
