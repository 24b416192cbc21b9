//! Reconciliation engine.
//!
//! Three independently paced checks keep the host's view of ownership,
//! installation, and run state in line with reality:
//!
//! - owned: cache-only resolve, diffed against the previous generation,
//!   add/remove notifications for the difference
//! - installed: full directory scan or incremental discovery, gated on an
//!   ownership universe existing at all
//! - status: per-item lifecycle state sweep over a frozen copy
//!
//! The host drives everything through `tick()`, which only starts a check
//! when the previous run of that slot finished and its cool-down elapsed,
//! and never blocks.

use crate::cache::{CacheBridge, KEY_TROVE_GAMES};
use crate::slot::CheckSlot;
use crate::traits::{HostNotifier, LocalScanner, OwnedResolver};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stevedore_common::redact::redact;
use stevedore_common::{
    diff, GameInfo, InstallState, LocalApp, LocalGame, OwnedItem, Platform, Result, Snapshot,
    SourceKind,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Initial delays and cool-downs per check slot.
#[derive(Debug, Clone)]
pub struct CheckCadence {
    pub owned_initial: Duration,
    pub owned_cooldown: Duration,
    pub installed_initial: Duration,
    pub installed_cooldown: Duration,
    pub status_initial: Duration,
    pub status_cooldown: Duration,
}

impl Default for CheckCadence {
    fn default() -> Self {
        CheckCadence {
            owned_initial: Duration::from_secs(8),
            // throttle to protect the host from quick heavy library changes
            owned_cooldown: Duration::from_secs(3),
            installed_initial: Duration::from_secs(4),
            installed_cooldown: Duration::from_secs(4),
            status_initial: Duration::from_secs(4),
            status_cooldown: Duration::from_millis(500),
        }
    }
}

pub struct Reconciler {
    inner: Arc<ReconcilerInner>,
    owned_slot: CheckSlot,
    installed_slot: CheckSlot,
    status_slot: CheckSlot,
}

struct ReconcilerInner {
    resolver: Arc<dyn OwnedResolver>,
    scanner: Arc<dyn LocalScanner>,
    notifier: Arc<dyn HostNotifier>,
    cache: Arc<CacheBridge>,
    /// Current owned generation; replaced wholesale, never mutated.
    owned: RwLock<Snapshot<OwnedItem>>,
    local: RwLock<HashMap<String, Arc<dyn LocalApp>>>,
    /// Last state reported to the host per local item.
    states: RwLock<HashMap<String, InstallState>>,
    /// Exclusive section: at most one owned refresh system-wide,
    /// foreground or background.
    owned_refresh: Mutex<()>,
    rescan_needed: AtomicBool,
}

impl Reconciler {
    pub fn new(
        resolver: Arc<dyn OwnedResolver>,
        scanner: Arc<dyn LocalScanner>,
        notifier: Arc<dyn HostNotifier>,
        cache: Arc<CacheBridge>,
    ) -> Self {
        Self::with_cadence(resolver, scanner, notifier, cache, CheckCadence::default())
    }

    pub fn with_cadence(
        resolver: Arc<dyn OwnedResolver>,
        scanner: Arc<dyn LocalScanner>,
        notifier: Arc<dyn HostNotifier>,
        cache: Arc<CacheBridge>,
        cadence: CheckCadence,
    ) -> Self {
        Reconciler {
            inner: Arc::new(ReconcilerInner {
                resolver,
                scanner,
                notifier,
                cache,
                owned: RwLock::new(Snapshot::default()),
                local: RwLock::new(HashMap::new()),
                states: RwLock::new(HashMap::new()),
                owned_refresh: Mutex::new(()),
                rescan_needed: AtomicBool::new(true),
            }),
            owned_slot: CheckSlot::new("owned", cadence.owned_initial, cadence.owned_cooldown),
            installed_slot: CheckSlot::new(
                "installed",
                cadence.installed_initial,
                cadence.installed_cooldown,
            ),
            status_slot: CheckSlot::new("status", cadence.status_initial, cadence.status_cooldown),
        }
    }

    /// Seed the owned snapshot from persisted state, without notifications.
    pub async fn seed_owned(&self, items: HashMap<String, OwnedItem>) {
        *self.inner.owned.write().await = Snapshot::new(items);
    }

    /// Advance the scheduler. Never blocks, never fails: each due slot is
    /// started as an independent task whose errors are logged inside it.
    /// Must be called from within a tokio runtime.
    pub fn tick(&mut self, library_changed: bool, search_dirs: Vec<PathBuf>) {
        let now = Instant::now();

        if library_changed && self.owned_slot.is_due(now) {
            let inner = Arc::clone(&self.inner);
            self.owned_slot.start(async move {
                if let Err(e) = inner.check_owned().await {
                    warn!("Owned check failed: {}", redact(&e.to_string()));
                }
            });
        }

        if self.installed_slot.is_due(now) {
            let inner = Arc::clone(&self.inner);
            self.installed_slot.start(async move {
                if let Err(e) = inner.check_installed(search_dirs).await {
                    warn!("Installed check failed: {}", redact(&e.to_string()));
                }
            });
        }

        if self.status_slot.is_due(now) {
            let inner = Arc::clone(&self.inner);
            self.status_slot.start(async move {
                inner.check_statuses().await;
            });
        }
    }

    /// Force the next installed check to do a full directory scan.
    pub fn request_rescan(&self) {
        self.inner.rescan_needed.store(true, Ordering::SeqCst);
    }

    /// Foreground refresh: full (non-cache-only) resolve under the same
    /// exclusive section as the background owned check.
    pub async fn refresh_owned_foreground(&self) -> Result<Vec<GameInfo>> {
        self.inner.refresh_owned_foreground().await
    }

    pub async fn owned_item(&self, id: &str) -> Option<OwnedItem> {
        self.inner.owned.read().await.get(id).cloned()
    }

    pub async fn local_app(&self, id: &str) -> Option<Arc<dyn LocalApp>> {
        self.inner.local.read().await.get(id).map(Arc::clone)
    }

    /// Current local items with their live states.
    pub async fn local_games(&self) -> Vec<LocalGame> {
        let local = self.inner.local.read().await;
        let mut games: Vec<LocalGame> = local
            .values()
            .map(|app| LocalGame {
                game_id: app.id().to_string(),
                state: app.state(),
            })
            .collect();
        games.sort_by(|a, b| a.game_id.cmp(&b.game_id));
        games
    }

    /// Cancel in-flight installed and status work. An owned refresh is
    /// left to finish (or be dropped with the process) so the exclusive
    /// section is never abandoned with cached state half-written.
    pub fn shutdown(&mut self) {
        self.status_slot.abort();
        self.installed_slot.abort();
    }
}

impl ReconcilerInner {
    async fn check_owned(&self) -> Result<()> {
        let _guard = self.owned_refresh.lock().await;
        debug!("Periodic owned check");

        let fetched = self.resolver.resolve(true).await?;
        let prev = self.owned.read().await.clone();
        let mut curr = Snapshot::new(fetched);
        let changes = diff(&prev, &curr);

        for id in &changes.removed {
            self.notifier.remove_game(id);
        }

        let mut dropped: Vec<String> = Vec::new();
        for id in &changes.added {
            let Some(item) = curr.get(id) else { continue };
            match item.display() {
                Ok(info) => self.notifier.add_game(info),
                Err(e) => {
                    // keep the rest of the batch; the item retries next refresh
                    warn!("Skipping owned item: {}", e);
                    dropped.push(id.clone());
                }
            }
        }
        if !dropped.is_empty() {
            let kept: HashMap<String, OwnedItem> = curr
                .iter()
                .filter(|(id, _)| !dropped.iter().any(|d| d == id))
                .map(|(id, item)| (id.to_string(), item.clone()))
                .collect();
            curr = Snapshot::new(kept);
        }

        self.persist_trove(&curr);
        *self.owned.write().await = curr;
        Ok(())
    }

    async fn refresh_owned_foreground(&self) -> Result<Vec<GameInfo>> {
        let _guard = self.owned_refresh.lock().await;
        debug!("Getting owned games");

        let fetched = self.resolver.resolve(false).await?;
        let mut kept: HashMap<String, OwnedItem> = HashMap::new();
        let mut infos: Vec<GameInfo> = Vec::new();
        for (id, item) in fetched {
            match item.display() {
                Ok(info) => {
                    infos.push(info);
                    kept.insert(id, item);
                }
                Err(e) => warn!("Skipping owned item: {}", e),
            }
        }
        infos.sort_by(|a, b| a.game_id.cmp(&b.game_id));

        let snapshot = Snapshot::new(kept);
        self.persist_trove(&snapshot);
        *self.owned.write().await = snapshot;
        Ok(infos)
    }

    /// Trove grants survive restarts through the cache so the ownership
    /// universe is not empty before the first remote refresh.
    fn persist_trove(&self, snapshot: &Snapshot<OwnedItem>) {
        let mut troves: Vec<&OwnedItem> = snapshot
            .iter()
            .filter(|(_, item)| item.source == SourceKind::Trove)
            .map(|(_, item)| item)
            .collect();
        troves.sort_by(|a, b| a.id.cmp(&b.id));
        self.cache.save(KEY_TROVE_GAMES, &troves);
    }

    /// Installed detection needs an ownership universe to match against;
    /// without one this run is a no-op.
    async fn check_installed(&self, search_dirs: Vec<PathBuf>) -> Result<()> {
        let owned = self.owned.read().await.clone();
        if owned.is_empty() {
            debug!("Skipping periodic check for local games: no owned items known yet");
            return Ok(());
        }

        let platform = Platform::current();
        let candidates: HashMap<String, String> = owned
            .iter()
            .filter(|(_, item)| item.source != SourceKind::Keys && item.supports(platform))
            .map(|(id, item)| (id.to_string(), item.title.clone()))
            .collect();

        if self.rescan_needed.swap(false, Ordering::SeqCst) {
            debug!("Checking installed games with path scanning in: {:?}", search_dirs);
            match self.scanner.scan(&candidates, Some(&search_dirs)).await {
                Ok(found) => {
                    *self.local.write().await = found;
                }
                Err(e) => {
                    // this run produced no full set; rescan again next time
                    self.rescan_needed.store(true, Ordering::SeqCst);
                    return Err(e);
                }
            }
        } else {
            let found = self.scanner.scan(&candidates, None).await?;
            if !found.is_empty() {
                let mut local = self.local.write().await;
                for (id, app) in found {
                    local.insert(id, app);
                }
            }
        }
        Ok(())
    }

    /// Sweep a frozen copy of the local set and report every state that
    /// moved since the last sweep. The installed check may add items
    /// concurrently; those are picked up next sweep.
    async fn check_statuses(&self) {
        let frozen: Vec<Arc<dyn LocalApp>> =
            self.local.read().await.values().map(Arc::clone).collect();

        for app in frozen {
            let state = app.state();
            let id = app.id().to_string();
            {
                let mut states = self.states.write().await;
                if states.get(&id) == Some(&state) {
                    continue;
                }
                states.insert(id.clone(), state);
            }
            self.notifier
                .update_local_game_status(LocalGame { game_id: id, state });
        }
    }
}
