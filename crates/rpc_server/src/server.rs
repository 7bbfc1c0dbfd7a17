// Copyright (C) 2015-2025 The Neo Project.
//
// server.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The thin HTTP shell over [`crate::RpcHandler`].

use crate::types::{RpcError, RpcRequest, RpcResponse};
use crate::RpcHandler;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use warp::Filter;

/// Serves JSON-RPC on `address` until the process exits. A background
/// sweeper expires idle iterator sessions.
pub async fn serve(handler: Arc<RpcHandler>, address: SocketAddr) {
    let sweeper = Arc::clone(&handler);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(10)).await;
            sweeper.expire_sessions();
        }
    });

    let route = warp::post()
        .and(warp::body::bytes())
        .map(move |body: bytes::Bytes| {
            let reply = handle_body(&handler, &body);
            warp::reply::json(&reply)
        });

    info!(%address, "rpc server listening");
    warp::serve(route).run(address).await;
}

fn handle_body(handler: &RpcHandler, body: &[u8]) -> RpcResponse {
    let request: RpcRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(_) => return RpcResponse::failure(Value::Null, RpcError::Parse),
    };
    if request.method.is_empty() {
        return RpcResponse::failure(request.id, RpcError::InvalidRequest);
    }
    handler.handle(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_config::{ProtocolSettings, RpcConfig};
    use neo3_ledger::Blockchain;
    use neo3_persistence::MemoryStore;

    #[test]
    fn test_handle_body_rejects_junk() {
        let store: Arc<dyn neo3_persistence::Store> = Arc::new(MemoryStore::new());
        let blockchain =
            Arc::new(Blockchain::new(ProtocolSettings::privnet(), store).unwrap());
        let handler = RpcHandler::new(blockchain, None, RpcConfig::default());

        let response = handle_body(&handler, b"{not json");
        assert_eq!(response.error.unwrap().code, -32700);

        let response = handle_body(&handler, br#"{"method":"getblockcount","id":1}"#);
        assert!(response.error.is_none());
    }
}
