//! Collaborator contracts.
//!
//! Everything the core consumes but does not implement: the remote
//! storefront resolver, the on-disk scanner, the host's notification
//! callbacks, the frontend (options window / key dialog / browser), and
//! the host's persistence push primitive.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use stevedore_common::{DownloadInfo, GameInfo, LocalApp, LocalGame, OwnedItem, Result};

/// Produces the current owned-items snapshot from the storefront.
#[async_trait]
pub trait OwnedResolver: Send + Sync {
    /// Resolve the ownership universe. With `only_cache` the resolver must
    /// not touch the network and answers from its own cached orders.
    ///
    /// Fails with `AuthenticationRequired` when no session is available,
    /// or `Transport` on remote failures.
    async fn resolve(&self, only_cache: bool) -> Result<HashMap<String, OwnedItem>>;

    /// Obtain a time-limited signed URL for one download descriptor.
    async fn sign_download(&self, item: &OwnedItem, download: &DownloadInfo) -> Result<String>;
}

/// Discovers items on the local filesystem and in the process table.
#[async_trait]
pub trait LocalScanner: Send + Sync {
    /// Scan for the given candidates (id → display title).
    ///
    /// With `search_dirs` set this is a full directory scan and the result
    /// is the complete local set. With `None` the scanner only reports
    /// incremental discoveries (no rescan of untouched entries).
    async fn scan(
        &self,
        candidates: &HashMap<String, String>,
        search_dirs: Option<&[PathBuf]>,
    ) -> Result<HashMap<String, Arc<dyn LocalApp>>>;
}

/// Host notification callbacks, invoked as side effects of checks.
pub trait HostNotifier: Send + Sync {
    fn add_game(&self, game: GameInfo);
    fn remove_game(&self, game_id: &str);
    fn update_local_game_status(&self, status: LocalGame);
}

/// Which view the options window opens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsMode {
    Normal,
    Welcome,
    News,
}

/// The UI edge: options window, key dialog, system browser.
#[async_trait]
pub trait FrontendBridge: Send + Sync {
    async fn show_options(&self, mode: OptionsMode) -> Result<()>;

    /// Show a key-license item's key (revealed or a reveal prompt).
    async fn show_key(&self, item: &OwnedItem) -> Result<()>;

    /// Open a URL in the system browser.
    fn open_url(&self, url: &str);
}

/// The host's persistence push for the flat key → JSON-text cache.
pub trait CacheSink: Send + Sync {
    fn push(&self, entries: &HashMap<String, String>);
}
