// Copyright (C) 2015-2025 The Neo Project.
//
// lib.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! # Neo3 Persistence
//!
//! The key-value storage abstraction (get/put/delete/prefix-scan), the
//! in-memory and RocksDB backends, and the layered write-through
//! [`DataCache`] that gives block persistence and speculative execution
//! their snapshot isolation.

pub mod data_cache;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_store;
pub mod storage;
pub mod store;

pub use data_cache::{DataCache, TrackState};
#[cfg(feature = "rocksdb")]
pub use rocksdb_store::RocksDbStore;
pub use storage::{StorageItem, StorageKey};
pub use store::{BatchOperation, MemoryStore, ReadStore, SeekDirection, Store};

use thiserror::Error;

/// Errors raised by the storage layer.
///
/// Backend failures are fatal for the ledger domain: the blockchain
/// refuses further mutations once one surfaces.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
