//! Local config file: validation, hot-reload, and version migration.
//!
//! The file is user-edited TOML next to the plugin installation. Checks
//! for changes are stat-based (the host tick polls, nothing watches the
//! file). An invalid file is treated as empty so a typo never takes the
//! plugin down. On the first run after a minor upgrade, settings carried
//! forward in the cache win over the stale on-disk file and the file is
//! rewritten to match; in every other case user edits win.

use crate::cache::{CacheBridge, KEY_CONFIG};
use anyhow::Context;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use stevedore_common::{Result, SourceKind, StoreError, VersionTag};
use toml::{Table, Value};
use tracing::{debug, info, warn};

/// Hand-written comment preamble above this marker survives a rewrite.
const PREAMBLE_MARKER: &str = "# ===";

/// Validated `[library]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LibrarySettings {
    /// Which ownership sources feed the host library view.
    pub sources: Vec<SourceKind>,
    /// Whether already-revealed key licenses stay visible.
    pub show_revealed_keys: bool,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        LibrarySettings {
            sources: SourceKind::ALL.to_vec(),
            show_revealed_keys: false,
        }
    }
}

impl LibrarySettings {
    fn update(&mut self, section: &Table) {
        if let Some(Value::Array(sources)) = section.get("sources") {
            self.sources = sources
                .iter()
                .filter_map(|v| v.as_str().and_then(SourceKind::from_name))
                .collect();
        }
        if let Some(show) = section.get("show_revealed_keys").and_then(Value::as_bool) {
            self.show_revealed_keys = show;
        }
    }

    fn validate(section: &Table) -> Result<()> {
        match section.get("sources") {
            None => {}
            Some(Value::Array(sources)) => {
                for value in sources {
                    let name = value.as_str().ok_or_else(|| {
                        StoreError::Validation(format!("source should be a string, got {}", value))
                    })?;
                    SourceKind::from_name(name).ok_or_else(|| {
                        StoreError::Validation(format!("unknown source '{}'", name))
                    })?;
                }
            }
            Some(other) => {
                return Err(StoreError::Validation(format!(
                    "sources should be a list, got {}",
                    other
                )))
            }
        }
        if let Some(show) = section.get("show_revealed_keys") {
            if !show.is_bool() {
                return Err(StoreError::Validation(format!(
                    "show_revealed_keys should be a boolean (true or false), got {}",
                    show
                )));
            }
        }
        Ok(())
    }
}

/// Validated `[installed]` section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstalledSettings {
    /// Extra directories the full install scan walks.
    pub search_dirs: Vec<PathBuf>,
}

impl InstalledSettings {
    fn update(&mut self, section: &Table) {
        if let Some(Value::Array(dirs)) = section.get("search_dirs") {
            self.search_dirs = dirs
                .iter()
                .filter_map(|v| v.as_str().map(PathBuf::from))
                .collect();
        }
    }

    fn validate(section: &Table) -> Result<()> {
        match section.get("search_dirs") {
            None => Ok(()),
            Some(Value::Array(dirs)) => {
                for value in dirs {
                    if !value.is_str() {
                        return Err(StoreError::Validation(format!(
                            "search_dirs entries should be strings, got {}",
                            value
                        )));
                    }
                }
                Ok(())
            }
            Some(other) => Err(StoreError::Validation(format!(
                "search_dirs should be a list, got {}",
                other
            ))),
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
    curr_version: String,
    prev_version: Option<String>,
    /// Merged config from the previous run, restored from the cache.
    cached_config: Table,
    /// Current effective config (validated sections + free-form passthrough).
    config: Table,
    last_modified: Option<SystemTime>,
    library: LibrarySettings,
    installed: InstalledSettings,
    library_changed: bool,
    installed_changed: bool,
    cache: Arc<CacheBridge>,
}

impl ConfigStore {
    pub fn new(
        path: PathBuf,
        current_version: &str,
        prev_version: Option<String>,
        cache: Arc<CacheBridge>,
    ) -> Self {
        let cached_config: Table = cache.load(KEY_CONFIG).unwrap_or_default();
        let mut store = ConfigStore {
            path,
            curr_version: current_version.to_string(),
            prev_version,
            cached_config,
            config: Table::new(),
            last_modified: None,
            library: LibrarySettings::default(),
            installed: InstalledSettings::default(),
            // the first consumer must see "changed" so initial checks run
            library_changed: true,
            installed_changed: false,
            cache,
        };
        store.reload_if_changed(true);
        store
    }

    pub fn library(&self) -> &LibrarySettings {
        &self.library
    }

    pub fn installed(&self) -> &InstalledSettings {
        &self.installed
    }

    /// Consume the "library section changed" signal.
    pub fn take_library_changed(&mut self) -> bool {
        std::mem::take(&mut self.library_changed)
    }

    /// Consume the "installed section changed" signal.
    pub fn take_installed_changed(&mut self) -> bool {
        std::mem::take(&mut self.installed_changed)
    }

    /// Stat the config file and compare its mtime to the last one seen.
    ///
    /// A missing file resets the in-memory config to defaults and reports
    /// "changed" exactly once (the recorded mtime is consumed). Any other
    /// stat failure reports "unchanged" so transient errors never clobber
    /// the current state.
    fn has_changed(&mut self) -> bool {
        match std::fs::metadata(&self.path).and_then(|m| m.modified()) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "{} not found. Clearing current config to use defaults",
                    self.path.display()
                );
                self.reset_to_defaults();
                self.last_modified.take().is_some()
            }
            Err(e) => {
                warn!("Stating {} failed: {}", self.path.display(), e);
                false
            }
            Ok(modified) => {
                if self.last_modified != Some(modified) {
                    self.last_modified = Some(modified);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Reload the file if its mtime moved, merge it into the effective
    /// config, refresh the validated sections, and persist the merged
    /// result to the cache.
    pub fn reload_if_changed(&mut self, first_run: bool) {
        if !self.has_changed() {
            return;
        }

        let file_config = self.load_config_file();
        debug!("local config: {:?}", file_config);

        if first_run {
            let upgraded = match self.prev_version.as_deref() {
                None => false,
                Some(prev) => VersionTag::parse(&self.curr_version)
                    .minor_newer_than(&VersionTag::parse(prev)),
            };
            if !upgraded {
                // user edits win
                self.config = merge_tables(&self.cached_config, &file_config);
            } else {
                // first run after an upgrade: settings carried forward in
                // the cache win over the stale on-disk file
                self.config = merge_tables(&file_config, &self.cached_config);
                let file_missing_keys = self
                    .config
                    .keys()
                    .any(|key| !file_config.contains_key(key));
                if file_missing_keys {
                    if let Err(e) = self.rewrite_config_file() {
                        warn!("Recreating config file failed: {:#}", e);
                    }
                }
            }
        } else {
            for (key, value) in file_config {
                self.config.insert(key, value);
            }
        }

        self.apply_sections();
        self.cache.save(KEY_CONFIG, &self.config);
    }

    /// Load and validate the file; anything wrong means an empty config.
    fn load_config_file(&self) -> Table {
        let parsed = std::fs::read_to_string(&self.path)
            .map_err(StoreError::from)
            .and_then(|text| {
                text.parse::<Table>()
                    .map_err(|e| StoreError::Validation(e.to_string()))
            })
            .and_then(|table| {
                Self::validate(&table)?;
                Ok(table)
            });
        match parsed {
            Ok(table) => table,
            Err(e) => {
                warn!("Parsing config file failed, treating as empty: {}", e);
                Table::new()
            }
        }
    }

    fn validate(table: &Table) -> Result<()> {
        if let Some(library) = table.get("library") {
            let section = library.as_table().ok_or_else(|| {
                StoreError::Validation("library should be a table".to_string())
            })?;
            LibrarySettings::validate(section)?;
        }
        if let Some(installed) = table.get("installed") {
            let section = installed.as_table().ok_or_else(|| {
                StoreError::Validation("installed should be a table".to_string())
            })?;
            InstalledSettings::validate(section)?;
        }
        Ok(())
    }

    fn apply_sections(&mut self) {
        let library_section = self
            .config
            .get("library")
            .and_then(Value::as_table)
            .cloned()
            .unwrap_or_default();
        let mut library = self.library.clone();
        library.update(&library_section);
        self.set_library(library);

        let installed_section = self
            .config
            .get("installed")
            .and_then(Value::as_table)
            .cloned()
            .unwrap_or_default();
        let mut installed = self.installed.clone();
        installed.update(&installed_section);
        self.set_installed(installed);
    }

    fn set_library(&mut self, library: LibrarySettings) {
        if library != self.library {
            self.library = library;
            self.library_changed = true;
        }
    }

    fn set_installed(&mut self, installed: InstalledSettings) {
        if installed != self.installed {
            self.installed = installed;
            self.installed_changed = true;
        }
    }

    fn reset_to_defaults(&mut self) {
        self.config = Table::new();
        self.set_library(LibrarySettings::default());
        self.set_installed(InstalledSettings::default());
    }

    /// Rewrite the file so it contains every key of the merged config,
    /// keeping the hand-written comment preamble up to the marker line.
    fn rewrite_config_file(&self) -> anyhow::Result<()> {
        info!("Recreating user config file with new entries");
        let mut preamble = String::new();
        if let Ok(existing) = std::fs::read_to_string(&self.path) {
            for line in existing.lines() {
                preamble.push_str(line);
                preamble.push('\n');
                if line.trim() == PREAMBLE_MARKER {
                    break;
                }
            }
        }
        let body = toml::to_string(&self.config).context("serializing merged config")?;
        std::fs::write(&self.path, format!("{preamble}{body}"))
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

fn merge_tables(base: &Table, overlay: &Table) -> Table {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
