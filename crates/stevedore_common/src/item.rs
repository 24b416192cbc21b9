//! Owned-item model.
//!
//! One closed set of source kinds covers everything the storefront can
//! grant: direct DRM-free purchases, rotating subscription (trove) grants,
//! and third-party key licenses. Per-kind behavior (display formatting,
//! download resolution, library tags) is dispatched by matching on the
//! kind, never by inspecting opaque payloads.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Platforms a download can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Mac,
    Linux,
}

impl Platform {
    /// Platform of the machine the plugin runs on.
    pub fn current() -> Platform {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Linux
        }
    }
}

/// Where an owned item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    DrmFree,
    Trove,
    Keys,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::DrmFree, SourceKind::Trove, SourceKind::Keys];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::DrmFree => "drm-free",
            SourceKind::Trove => "trove",
            SourceKind::Keys => "keys",
        }
    }

    /// Parse a config-file source name.
    pub fn from_name(name: &str) -> Option<SourceKind> {
        match name {
            "drm-free" => Some(SourceKind::DrmFree),
            "trove" => Some(SourceKind::Trove),
            "keys" => Some(SourceKind::Keys),
            _ => None,
        }
    }
}

/// One platform's download descriptor for an owned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    /// Storefront identifier used when requesting a signed URL.
    pub machine_name: String,
    /// Download size in bytes when the storefront reports one.
    pub file_size: Option<u64>,
}

/// An item the user owns on the storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedItem {
    /// Stable storefront identifier.
    pub id: String,
    /// Display name.
    pub title: String,
    pub source: SourceKind,
    /// Per-platform download descriptors. Key items carry none.
    #[serde(default)]
    pub downloads: HashMap<Platform, DownloadInfo>,
    /// Revealed key text for key-license items; None means unrevealed.
    #[serde(default)]
    pub key_value: Option<String>,
}

/// Item formatted for the host's add-game notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    pub game_id: String,
    pub title: String,
    pub source: SourceKind,
}

/// Per-game settings payload for the host's library view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLibrarySettings {
    pub game_id: String,
    pub tags: Option<Vec<String>>,
    pub hidden: Option<bool>,
}

impl OwnedItem {
    /// Whether a download exists for the given platform.
    pub fn supports(&self, platform: Platform) -> bool {
        self.downloads.contains_key(&platform)
    }

    /// Union of platforms this item has downloads for; None when it has none.
    pub fn os_compatibility(&self) -> Option<Vec<Platform>> {
        if self.downloads.is_empty() {
            return None;
        }
        let mut platforms: Vec<Platform> = self.downloads.keys().copied().collect();
        platforms.sort();
        Some(platforms)
    }

    /// Download descriptor for the given platform.
    pub fn download_for(&self, platform: Platform) -> Result<&DownloadInfo> {
        self.downloads.get(&platform).ok_or_else(|| {
            let available = self.os_compatibility().unwrap_or_default();
            StoreError::Unknown(format!(
                "{} has only downloads for {:?}",
                self.title, available
            ))
        })
    }

    /// Format for the host. A malformed item is reported as an
    /// `ItemParse` error so the caller can skip it and keep the batch.
    pub fn display(&self) -> Result<GameInfo> {
        if self.id.trim().is_empty() {
            return Err(StoreError::ItemParse {
                id: self.id.clone(),
                reason: "empty id".into(),
            });
        }
        if self.title.trim().is_empty() {
            return Err(StoreError::ItemParse {
                id: self.id.clone(),
                reason: "empty title".into(),
            });
        }
        Ok(GameInfo {
            game_id: self.id.clone(),
            title: self.title.clone(),
            source: self.source,
        })
    }

    /// Library tags for the host's per-game settings call.
    ///
    /// Keys are tagged so users can filter them out; an unrevealed key is
    /// additionally flagged. Trove items get an explicit empty list since
    /// the host renders subscription membership on its own.
    pub fn library_tags(&self) -> Option<Vec<String>> {
        match self.source {
            SourceKind::Keys => {
                let mut tags = vec!["Key".to_string()];
                if self.key_value.is_none() {
                    tags.push("Unrevealed".to_string());
                }
                Some(tags)
            }
            SourceKind::Trove => Some(Vec::new()),
            SourceKind::DrmFree => None,
        }
    }
}
