//! Infrastructure for the Insti Chain ledger: storage backends, the
//! [`LedgerStore`] repository, the [`GuardedLedger`] access boundary and
//! configuration.

pub mod config;
pub mod error;
pub mod guard;
pub mod storage;
pub mod store;

#[cfg(test)]
mod integration_tests;

use std::sync::Arc;

use insti_events::{Envelope, InMemoryEventBus};
use insti_ledger::LedgerActivity;
use tracing::info;

pub use config::{ConfigError, LedgerConfig};
pub use error::{LedgerError, LedgerResult};
pub use guard::{GuardedLedger, principal_for};
pub use storage::{
    Backend, FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore, StoreError, Versioned,
};
pub use store::{LedgerKeys, LedgerStore, ProfileUpdate, Registration, TokenIssue};

/// Bus carrying published ledger activity.
pub type ActivityBus = InMemoryEventBus<Envelope<LedgerActivity>>;

/// A store built from configuration.
pub type ConfiguredStore = LedgerStore<Backend, Arc<ActivityBus>>;

/// Open the backend named by `config` and seed it if asked to.
pub fn open_store(config: &LedgerConfig) -> LedgerResult<ConfiguredStore> {
    let backend = match &config.data_dir {
        Some(dir) => Backend::File(FileKeyValueStore::open(dir)?),
        None => Backend::Memory(InMemoryKeyValueStore::new()),
    };
    info!(
        data_dir = ?config.data_dir,
        key_prefix = %config.key_prefix,
        "opening ledger store"
    );

    let store = LedgerStore::new(backend, Arc::new(ActivityBus::new()))
        .with_key_prefix(&config.key_prefix);
    if config.seed_sample_data {
        store.initialize()?;
    }
    Ok(store)
}
