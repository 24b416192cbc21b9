//! Host-facing plugin facade.
//!
//! Wires the engine, config store, cache bridge, and debounce gate
//! together and exposes the fixed call/callback contract the host drives:
//! a frequent synchronous `tick()`, foreground accessors, and install /
//! launch / uninstall entry points keyed by item id.

use crate::cache::{CacheBridge, KEY_LAST_VERSION, KEY_TROVE_GAMES};
use crate::config::ConfigStore;
use crate::debounce::DebounceGate;
use crate::engine::{CheckCadence, Reconciler};
use crate::traits::{
    CacheSink, FrontendBridge, HostNotifier, LocalScanner, OptionsMode, OwnedResolver,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use stevedore_common::redact::redact;
use stevedore_common::version::is_after_minor_update;
use stevedore_common::{
    GameInfo, GameLibrarySettings, LocalGame, OwnedItem, Platform, Result, SourceKind, StoreError,
};
use tracing::{debug, error, info, warn};

const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

const KEYS_PAGE_URL: &str = "https://www.harborlane.com/account/keys";
const SUBSCRIPTION_URL: &str = "https://www.harborlane.com/subscription/home";

/// Two install calls for the same id inside this window count as a
/// double-click and open the options window instead.
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(500);

pub struct StorePlugin {
    resolver: Arc<dyn OwnedResolver>,
    frontend: Arc<dyn FrontendBridge>,
    engine: Reconciler,
    settings: ConfigStore,
    debounce: DebounceGate,
    under_installation: Mutex<HashSet<String>>,
    show_news: bool,
}

impl StorePlugin {
    /// Wire the plugin against its collaborators and restore persisted
    /// state (previous version tag, cached trove grants).
    pub async fn new(
        resolver: Arc<dyn OwnedResolver>,
        scanner: Arc<dyn LocalScanner>,
        notifier: Arc<dyn HostNotifier>,
        frontend: Arc<dyn FrontendBridge>,
        sink: Arc<dyn CacheSink>,
        stored_cache: HashMap<String, String>,
        config_path: PathBuf,
    ) -> Self {
        Self::with_cadence(
            resolver,
            scanner,
            notifier,
            frontend,
            sink,
            stored_cache,
            config_path,
            CheckCadence::default(),
        )
        .await
    }

    /// Like [`StorePlugin::new`] with explicit check pacing.
    #[allow(clippy::too_many_arguments)]
    pub async fn with_cadence(
        resolver: Arc<dyn OwnedResolver>,
        scanner: Arc<dyn LocalScanner>,
        notifier: Arc<dyn HostNotifier>,
        frontend: Arc<dyn FrontendBridge>,
        sink: Arc<dyn CacheSink>,
        stored_cache: HashMap<String, String>,
        config_path: PathBuf,
        cadence: CheckCadence,
    ) -> Self {
        let cache = Arc::new(CacheBridge::new(stored_cache, sink));

        let prev_version: Option<String> = cache.load(KEY_LAST_VERSION);
        let show_news = is_after_minor_update(prev_version.as_deref(), CURRENT_VERSION);
        cache.save(KEY_LAST_VERSION, &CURRENT_VERSION);
        if let Some(prev) = &prev_version {
            info!("Previous run was version {}", prev);
        }

        let settings = ConfigStore::new(
            config_path,
            CURRENT_VERSION,
            prev_version,
            Arc::clone(&cache),
        );

        let engine = Reconciler::with_cadence(
            Arc::clone(&resolver),
            scanner,
            notifier,
            Arc::clone(&cache),
            cadence,
        );

        // Restore trove grants so installed detection has an ownership
        // universe before the first remote refresh.
        let cached_troves: Vec<serde_json::Value> = cache.load_or(KEY_TROVE_GAMES, Vec::new());
        let mut restored: HashMap<String, OwnedItem> = HashMap::new();
        for raw in cached_troves {
            match serde_json::from_value::<OwnedItem>(raw) {
                Ok(item) => {
                    restored.insert(item.id.clone(), item);
                }
                Err(e) => warn!("Dropping cached trove entry: {}", e),
            }
        }
        if !restored.is_empty() {
            info!("Restored {} cached trove games", restored.len());
            engine.seed_owned(restored).await;
        }

        StorePlugin {
            resolver,
            frontend,
            engine,
            settings,
            debounce: DebounceGate::new(DOUBLE_CLICK_WINDOW),
            under_installation: Mutex::new(HashSet::new()),
            show_news,
        }
    }

    /// True when this run is the first after a minor upgrade. The host
    /// surfaces release notes once based on this.
    pub fn show_news(&self) -> bool {
        self.show_news
    }

    /// Advance the reconciliation engine. Called synchronously and often;
    /// never blocks and never fails.
    pub fn tick(&mut self) {
        self.settings.reload_if_changed(false);

        let library_changed = self.settings.take_library_changed();
        if self.settings.take_installed_changed() {
            self.engine.request_rescan();
        }
        let search_dirs = self.settings.installed().search_dirs.clone();

        self.engine.tick(library_changed, search_dirs);
    }

    /// Foreground full refresh of the owned set.
    pub async fn get_owned_games(&self) -> Result<Vec<GameInfo>> {
        self.engine.refresh_owned_foreground().await
    }

    /// Current local set. Also marks a full rescan as needed, since the
    /// host asking is the one signal that its view went stale.
    pub async fn get_local_games(&self) -> Vec<LocalGame> {
        self.engine.request_rescan();
        self.engine.local_games().await
    }

    /// Install entry point. A rapid second call for the same id is a
    /// double-click proxy and opens the options window instead.
    pub async fn install_game(&self, game_id: &str) -> Result<()> {
        let key = format!("install:{game_id}");
        let real = self.install_inner(game_id);
        let fallback = async {
            self.open_options(OptionsMode::Normal).await;
            Ok(())
        };
        self.debounce.invoke(&key, real, fallback).await
    }

    async fn install_inner(&self, game_id: &str) -> Result<()> {
        {
            let mut under = self
                .under_installation
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !under.insert(game_id.to_string()) {
                return Ok(());
            }
        }
        let result = self.dispatch_install(game_id).await;
        self.under_installation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(game_id);
        if let Err(e) = &result {
            error!("Install {} failed: {}", game_id, e);
        }
        result
    }

    async fn dispatch_install(&self, game_id: &str) -> Result<()> {
        let Some(item) = self.engine.owned_item(game_id).await else {
            // stale id from the host; not worth crashing over
            error!("Install game: {} not found among owned items", game_id);
            return Ok(());
        };

        if item.source == SourceKind::Keys {
            if let Err(e) = self.frontend.show_key(&item).await {
                error!("Key dialog failed: {}", e);
                self.frontend.open_url(KEYS_PAGE_URL);
            }
            return Ok(());
        }

        let download = item.download_for(Platform::current())?;
        match self.resolver.sign_download(&item, download).await {
            Ok(url) => {
                debug!("Opening download {}", redact(&url));
                self.frontend.open_url(&url);
                Ok(())
            }
            Err(StoreError::AuthenticationRequired) if item.source == SourceKind::Trove => {
                info!("Subscription looks expired; opening the subscription page");
                self.frontend.open_url(SUBSCRIPTION_URL);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn launch_game(&self, game_id: &str) {
        match self.engine.local_app(game_id).await {
            None => error!(
                "Launch game: {}",
                StoreError::NotFound(game_id.to_string())
            ),
            Some(app) => {
                if let Err(e) = app.run() {
                    error!("Launching {} failed: {}", game_id, e);
                }
            }
        }
    }

    pub async fn uninstall_game(&self, game_id: &str) {
        match self.engine.local_app(game_id).await {
            None => error!(
                "Uninstall game: {}",
                StoreError::NotFound(game_id.to_string())
            ),
            Some(app) => {
                if let Err(e) = app.uninstall() {
                    error!("Uninstalling {} failed: {}", game_id, e);
                }
            }
        }
    }

    /// Per-game tags for the host's library view.
    pub async fn game_library_settings(&self, game_id: &str) -> GameLibrarySettings {
        let tags = self
            .engine
            .owned_item(game_id)
            .await
            .and_then(|item| item.library_tags());
        GameLibrarySettings {
            game_id: game_id.to_string(),
            tags,
            hidden: None,
        }
    }

    /// Union of platforms the item has downloads for; None for unknown
    /// ids (silent, the host retries after the next owned refresh).
    pub async fn os_compatibility(&self, game_id: &str) -> Option<Vec<Platform>> {
        self.engine
            .owned_item(game_id)
            .await
            .and_then(|item| item.os_compatibility())
    }

    /// Open the options window, best effort.
    pub async fn open_options(&self, mode: OptionsMode) {
        if let Err(e) = self.frontend.show_options(mode).await {
            error!("Opening options failed: {}", e);
        }
    }

    /// Cancel in-flight background work. A running owned refresh is left
    /// to finish naturally.
    pub fn shutdown(&mut self) {
        self.engine.shutdown();
    }
}
