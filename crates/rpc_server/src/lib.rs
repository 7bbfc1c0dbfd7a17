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

//! # Neo3 RPC
//!
//! The JSON-RPC 2.0 dispatch layer: a stateless method registry over the
//! ledger, session-scoped iterator traversal, and a thin warp server.
//! Dispatch is transport-independent; the HTTP shell stays small.

pub mod methods;
pub mod server;
pub mod types;

pub use methods::RpcHandler;
pub use server::serve;
pub use types::{RpcError, RpcRequest, RpcResponse};
