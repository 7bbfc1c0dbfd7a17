// Copyright (C) 2015-2025 The Neo Project.
//
// types.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! JSON-RPC 2.0 envelope types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC request.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default)]
    pub id: Value,
}

/// A JSON-RPC response.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
    pub id: Value,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(RpcErrorBody {
                code: error.code(),
                message: error.to_string(),
            }),
            id,
        }
    }
}

/// The error object inside a failed response.
#[derive(Debug, Clone, Serialize)]
pub struct RpcErrorBody {
    pub code: i64,
    pub message: String,
}

/// Dispatch-level errors with their JSON-RPC codes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RpcError {
    #[error("parse error")]
    Parse,

    #[error("invalid request")]
    InvalidRequest,

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("unknown block")]
    UnknownBlock,

    #[error("unknown transaction")]
    UnknownTransaction,

    #[error("unknown contract")]
    UnknownContract,

    #[error("unknown session")]
    UnknownSession,

    #[error("{0}")]
    Server(String),
}

impl RpcError {
    pub fn code(&self) -> i64 {
        match self {
            RpcError::Parse => -32700,
            RpcError::InvalidRequest => -32600,
            RpcError::MethodNotFound(_) => -32601,
            RpcError::InvalidParams(_) => -32602,
            RpcError::UnknownBlock => -101,
            RpcError::UnknownTransaction => -102,
            RpcError::UnknownContract => -103,
            RpcError::UnknownSession => -104,
            RpcError::Server(_) => -32000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_parses_with_defaults() {
        let request: RpcRequest =
            serde_json::from_value(json!({"method": "getblockcount"})).unwrap();
        assert_eq!(request.method, "getblockcount");
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(RpcError::Parse.code(), -32700);
        assert_eq!(RpcError::MethodNotFound("x".into()).code(), -32601);
        assert_eq!(RpcError::Server("timeout".into()).code(), -32000);
    }

    #[test]
    fn test_response_shape() {
        let ok = RpcResponse::success(json!(1), json!(42));
        let text = serde_json::to_string(&ok).unwrap();
        assert!(text.contains("\"result\":42"));
        assert!(!text.contains("error"));

        let err = RpcResponse::failure(json!(1), RpcError::UnknownBlock);
        let text = serde_json::to_string(&err).unwrap();
        assert!(text.contains("-101"));
        assert!(!text.contains("result"));
    }
}
