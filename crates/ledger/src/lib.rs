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

//! # Neo3 Ledger
//!
//! Blocks, block/transaction verification, the fee-ordered memory pool,
//! the header cache and the persistence pipeline that drives state
//! transitions through the application engine.

pub mod block;
pub mod blockchain;
pub mod error;
pub mod header_cache;
pub mod mempool;
pub mod state_root;
pub mod verification;

pub use block::{Block, BlockHeader};
pub use blockchain::Blockchain;
pub use error::{LedgerError, LedgerResult, VerifyResult};
pub use header_cache::HeaderCache;
pub use mempool::MemoryPool;
pub use state_root::{StateRoot, StateRootService};
