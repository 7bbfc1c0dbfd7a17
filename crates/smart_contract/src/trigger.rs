// Copyright (C) 2015-2025 The Neo Project.
//
// trigger.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Execution triggers.

use serde::{Deserialize, Serialize};

/// The mode an application engine runs in; it gates which syscalls and
/// native methods are reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TriggerType {
    /// Native housekeeping before a block's transactions.
    OnPersist = 0x01,
    /// Native housekeeping after a block's transactions.
    PostPersist = 0x02,
    /// Witness verification; read-only.
    Verification = 0x20,
    /// Ordinary transaction execution.
    Application = 0x40,
}

impl TriggerType {
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::OnPersist),
            0x02 => Some(Self::PostPersist),
            0x20 => Some(Self::Verification),
            0x40 => Some(Self::Application),
            _ => None,
        }
    }

    /// The name used in application logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnPersist => "OnPersist",
            Self::PostPersist => "PostPersist",
            Self::Verification => "Verification",
            Self::Application => "Application",
        }
    }
}
