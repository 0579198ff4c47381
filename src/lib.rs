//! json-i18n-sync
//!
//! Keeps JSON localization dictionaries in sync: finds the keys a target
//! dictionary is missing, has a translation provider fill them in, and merges
//! the results without touching existing translations.

pub mod cli;
pub mod config;
pub mod diff;
pub mod input;
pub mod merge;
pub mod provider;
pub mod sync;
pub mod types;
pub mod workspace;

#[cfg(test)]
mod test_utils;

pub use diff::find_missing;
pub use merge::merge_translations;
pub use provider::{
    Provider,
    ProviderGateway,
};
pub use sync::{
    SyncOrchestrator,
    SyncRequest,
    SyncResult,
};
