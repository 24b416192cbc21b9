//! Shared fakes for the integration suites: a scriptable resolver and
//! scanner, a recording notifier/frontend/sink, and item builders.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stevedore::engine::CheckCadence;
use stevedore::traits::{
    CacheSink, FrontendBridge, HostNotifier, LocalScanner, OptionsMode, OwnedResolver,
};
use stevedore_common::{
    DownloadInfo, GameInfo, InstallState, LocalApp, LocalGame, OwnedItem, Platform, Result,
    SourceKind, StoreError,
};

/// Owned item with downloads for every platform, so candidate filtering
/// never depends on the machine running the tests.
pub fn owned(id: &str, title: &str, source: SourceKind) -> OwnedItem {
    let downloads = [Platform::Windows, Platform::Mac, Platform::Linux]
        .into_iter()
        .map(|p| {
            (
                p,
                DownloadInfo {
                    machine_name: format!("{}_{:?}", id, p).to_lowercase(),
                    file_size: Some(1024),
                },
            )
        })
        .collect();
    OwnedItem {
        id: id.to_string(),
        title: title.to_string(),
        source,
        downloads,
        key_value: None,
    }
}

pub fn key_item(id: &str, title: &str) -> OwnedItem {
    OwnedItem {
        id: id.to_string(),
        title: title.to_string(),
        source: SourceKind::Keys,
        downloads: HashMap::new(),
        key_value: None,
    }
}

/// Every slot immediately eligible, no cool-downs. Tests drive pacing
/// themselves.
pub fn zero_cadence() -> CheckCadence {
    CheckCadence {
        owned_initial: Duration::ZERO,
        owned_cooldown: Duration::ZERO,
        installed_initial: Duration::ZERO,
        installed_cooldown: Duration::ZERO,
        status_initial: Duration::ZERO,
        status_cooldown: Duration::ZERO,
    }
}

/// Let spawned check tasks run to completion.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// Route check logging through a subscriber when RUST_LOG is set.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
pub struct FakeResolver {
    pub items: Mutex<HashMap<String, OwnedItem>>,
    pub fail_transport: AtomicBool,
    pub fail_sign_auth: AtomicBool,
    pub delay: Mutex<Duration>,
    pub calls: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl FakeResolver {
    pub fn with_items(items: Vec<OwnedItem>) -> Arc<Self> {
        let resolver = Self::default();
        *resolver.items.lock().unwrap() = items.into_iter().map(|i| (i.id.clone(), i)).collect();
        Arc::new(resolver)
    }

    pub fn set_items(&self, items: Vec<OwnedItem>) {
        *self.items.lock().unwrap() = items.into_iter().map(|i| (i.id.clone(), i)).collect();
    }
}

#[async_trait]
impl OwnedResolver for FakeResolver {
    async fn resolve(&self, _only_cache: bool) -> Result<HashMap<String, OwnedItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(running, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_transport.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("connection reset".into()));
        }
        Ok(self.items.lock().unwrap().clone())
    }

    async fn sign_download(&self, _item: &OwnedItem, download: &DownloadInfo) -> Result<String> {
        if self.fail_sign_auth.load(Ordering::SeqCst) {
            return Err(StoreError::AuthenticationRequired);
        }
        Ok(format!(
            "https://dl.harborlane.com/{}?signature=abc123",
            download.machine_name
        ))
    }
}

pub struct FakeApp {
    id: String,
    state: Mutex<InstallState>,
    pub run_calls: AtomicUsize,
    pub uninstall_calls: AtomicUsize,
}

impl FakeApp {
    pub fn new(id: &str, state: InstallState) -> Arc<Self> {
        Arc::new(FakeApp {
            id: id.to_string(),
            state: Mutex::new(state),
            run_calls: AtomicUsize::new(0),
            uninstall_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_state(&self, state: InstallState) {
        *self.state.lock().unwrap() = state;
    }
}

impl LocalApp for FakeApp {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> InstallState {
        *self.state.lock().unwrap()
    }

    fn run(&self) -> Result<()> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn uninstall(&self) -> Result<()> {
        self.uninstall_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeScanner {
    /// Result of a full (search-dirs) scan.
    pub full_results: Mutex<HashMap<String, Arc<dyn LocalApp>>>,
    /// Result of an incremental scan.
    pub incremental_results: Mutex<HashMap<String, Arc<dyn LocalApp>>>,
    pub fail_full: AtomicBool,
    pub full_calls: AtomicUsize,
    pub incremental_calls: AtomicUsize,
    pub last_candidates: Mutex<HashMap<String, String>>,
    pub last_search_dirs: Mutex<Option<Vec<PathBuf>>>,
    pub scan_delay: Mutex<Duration>,
    pub completed_scans: AtomicUsize,
}

impl FakeScanner {
    pub fn set_full(&self, apps: Vec<Arc<FakeApp>>) {
        *self.full_results.lock().unwrap() = apps
            .into_iter()
            .map(|a| (a.id().to_string(), a as Arc<dyn LocalApp>))
            .collect();
    }

    pub fn set_incremental(&self, apps: Vec<Arc<FakeApp>>) {
        *self.incremental_results.lock().unwrap() = apps
            .into_iter()
            .map(|a| (a.id().to_string(), a as Arc<dyn LocalApp>))
            .collect();
    }
}

#[async_trait]
impl LocalScanner for FakeScanner {
    async fn scan(
        &self,
        candidates: &HashMap<String, String>,
        search_dirs: Option<&[PathBuf]>,
    ) -> Result<HashMap<String, Arc<dyn LocalApp>>> {
        *self.last_candidates.lock().unwrap() = candidates.clone();
        *self.last_search_dirs.lock().unwrap() = search_dirs.map(<[PathBuf]>::to_vec);

        let delay = *self.scan_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = match search_dirs {
            Some(_) => {
                self.full_calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_full.load(Ordering::SeqCst) {
                    return Err(StoreError::Unknown("scan blew up".into()));
                }
                self.full_results.lock().unwrap().clone()
            }
            None => {
                self.incremental_calls.fetch_add(1, Ordering::SeqCst);
                self.incremental_results.lock().unwrap().clone()
            }
        };
        self.completed_scans.fetch_add(1, Ordering::SeqCst);
        Ok(result)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub added: Mutex<Vec<GameInfo>>,
    pub removed: Mutex<Vec<String>>,
    pub statuses: Mutex<Vec<LocalGame>>,
}

impl RecordingNotifier {
    pub fn added_ids(&self) -> Vec<String> {
        self.added.lock().unwrap().iter().map(|g| g.game_id.clone()).collect()
    }

    pub fn clear(&self) {
        self.added.lock().unwrap().clear();
        self.removed.lock().unwrap().clear();
        self.statuses.lock().unwrap().clear();
    }
}

impl HostNotifier for RecordingNotifier {
    fn add_game(&self, game: GameInfo) {
        self.added.lock().unwrap().push(game);
    }

    fn remove_game(&self, game_id: &str) {
        self.removed.lock().unwrap().push(game_id.to_string());
    }

    fn update_local_game_status(&self, status: LocalGame) {
        self.statuses.lock().unwrap().push(status);
    }
}

#[derive(Default)]
pub struct FakeFrontend {
    pub options_calls: Mutex<Vec<OptionsMode>>,
    pub shown_keys: Mutex<Vec<String>>,
    pub opened_urls: Mutex<Vec<String>>,
    pub fail_key_dialog: AtomicBool,
}

#[async_trait]
impl FrontendBridge for FakeFrontend {
    async fn show_options(&self, mode: OptionsMode) -> Result<()> {
        self.options_calls.lock().unwrap().push(mode);
        Ok(())
    }

    async fn show_key(&self, item: &OwnedItem) -> Result<()> {
        if self.fail_key_dialog.load(Ordering::SeqCst) {
            return Err(StoreError::Unknown("no display".into()));
        }
        self.shown_keys.lock().unwrap().push(item.id.clone());
        Ok(())
    }

    fn open_url(&self, url: &str) {
        self.opened_urls.lock().unwrap().push(url.to_string());
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub pushes: Mutex<Vec<HashMap<String, String>>>,
}

impl RecordingSink {
    /// Latest pushed value for a cache key, if any push carried it.
    pub fn latest(&self, key: &str) -> Option<String> {
        self.pushes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|m| m.get(key).cloned())
    }
}

impl CacheSink for RecordingSink {
    fn push(&self, entries: &HashMap<String, String>) {
        self.pushes.lock().unwrap().push(entries.clone());
    }
}
