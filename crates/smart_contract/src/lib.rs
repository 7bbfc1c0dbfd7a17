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

//! # Neo3 Smart Contract
//!
//! The application engine that hosts the VM (gas metering, syscall
//! dispatch, notifications, snapshot-scoped persistence), the contract
//! model (NEF, manifest, contract state) and the native contracts.

pub mod application_engine;
pub mod binary_serializer;
pub mod contract_state;
pub mod error;
pub mod gas;
pub mod helpers;
pub mod interop;
pub mod json_serializer;
pub mod manifest;
pub mod native;
pub mod trigger;

pub use application_engine::{
    ApplicationEngine, ApplicationLog, Container, HostContext, NotificationRecord,
    PersistingBlock, TEST_MODE_GAS,
};
pub use contract_state::{ContractState, MethodToken, NefFile};
pub use error::{ContractError, ContractResult};
pub use manifest::{ContractAbi, ContractManifest, ContractMethod, ContractPermission};
pub use native::NativeRegistry;
pub use trigger::TriggerType;
