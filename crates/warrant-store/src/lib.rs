//! # warrant-store
//!
//! Durable credential store for Warrant.
//!
//! This crate provides functionality for:
//! - An ordered byte-keyed storage interface ([`KvStore`]) with atomic batches
//! - An in-memory engine ([`MemoryKv`]) and a durable JSON Lines engine ([`FileKv`])
//! - The credential store proper ([`CredentialStore`]): token records plus an
//!   insertion-order index used for stable pagination
//!
//! ## Key Layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `t:<token>` | JSON `{ "seq": u64, "record": TokenRecord }` |
//! | `s:<seq>` | the token string; `seq` is 20-digit zero-padded decimal |
//!
//! Sequence numbers are assigned on insert, strictly increasing, and never
//! reused. Listing scans the `s:` range, so records come back in the order
//! they were inserted regardless of token bytes or creation time.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warrant_core::StoreConfig;
//! use warrant_store::{CredentialStore, open_engine};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = open_engine(&StoreConfig::default(), "/var/lib/warrant/data".as_ref())?;
//! let store = CredentialStore::open(engine)?;
//! for record in store.list(0, 20)? {
//!     println!("{} {}", record.name, record.perm);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod file;
pub mod kv;
pub mod store;

pub use error::{KvError, StoreError};
pub use file::{FileKv, LOG_FILE};
pub use kv::{KvOp, KvStore, MemoryKv};
pub use store::CredentialStore;

use std::path::Path;
use std::sync::Arc;
use warrant_core::{StoreBackend, StoreConfig};

/// Create a storage engine based on configuration.
pub fn open_engine(config: &StoreConfig, data_dir: &Path) -> Result<Arc<dyn KvStore>, KvError> {
    match config.backend {
        StoreBackend::File => Ok(Arc::new(FileKv::open(data_dir, config.sync_writes)?)),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory credential store; tokens will not survive a restart");
            Ok(Arc::new(MemoryKv::new()))
        }
    }
}
