//! Stevedore Common - shared data model for the storefront plugin core.
//!
//! Item and snapshot types, the error taxonomy crossing the host boundary,
//! version tags for config migration, and log redaction.

pub mod error;
pub mod item;
pub mod local;
pub mod redact;
pub mod snapshot;
pub mod version;

pub use error::{Result, StoreError};
pub use item::{DownloadInfo, GameInfo, GameLibrarySettings, OwnedItem, Platform, SourceKind};
pub use local::{InstallState, LocalApp, LocalGame};
pub use snapshot::{diff, Snapshot, SnapshotDiff};
pub use version::VersionTag;
