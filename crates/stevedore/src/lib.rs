//! Stevedore - client-side reconciliation core of a storefront plugin.
//!
//! Keeps the host's view of "what the user owns", "what is installed",
//! and "what is running" synchronized through periodic non-blocking
//! checks driven by a single external `tick()`. Remote resolution, disk
//! scanning, and the UI are collaborators behind the traits in
//! [`traits`]; this crate owns the scheduling, diffing, debouncing, and
//! config/cache state that sits between them and the host.

pub mod cache;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod plugin;
pub mod slot;
pub mod traits;

pub use cache::CacheBridge;
pub use config::{ConfigStore, InstalledSettings, LibrarySettings};
pub use debounce::DebounceGate;
pub use engine::{CheckCadence, Reconciler};
pub use plugin::StorePlugin;
pub use traits::{
    CacheSink, FrontendBridge, HostNotifier, LocalScanner, OptionsMode, OwnedResolver,
};
