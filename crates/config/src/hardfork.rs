// Copyright (C) 2015-2025 The Neo Project.
//
// hardfork.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Named protocol hardforks and their activation heights.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol hardforks in activation order.
///
/// A hardfork listed in the settings with height `h` is active for every
/// block with index ≥ `h`. Omitted hardforks are never active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hardfork {
    Aspidochelone,
    Basilisk,
    Cockatrice,
    Domovoi,
    Echidna,
}

impl Hardfork {
    /// All known hardforks in activation order.
    pub const ALL: [Hardfork; 5] = [
        Hardfork::Aspidochelone,
        Hardfork::Basilisk,
        Hardfork::Cockatrice,
        Hardfork::Domovoi,
        Hardfork::Echidna,
    ];
}

impl fmt::Display for Hardfork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Hardfork::Aspidochelone => "Aspidochelone",
            Hardfork::Basilisk => "Basilisk",
            Hardfork::Cockatrice => "Cockatrice",
            Hardfork::Domovoi => "Domovoi",
            Hardfork::Echidna => "Echidna",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Hardfork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Settings files may carry the "HF_" prefix used by the protocol
        // configuration schema.
        let name = s.strip_prefix("HF_").unwrap_or(s);
        match name {
            "Aspidochelone" => Ok(Hardfork::Aspidochelone),
            "Basilisk" => Ok(Hardfork::Basilisk),
            "Cockatrice" => Ok(Hardfork::Cockatrice),
            "Domovoi" => Ok(Hardfork::Domovoi),
            "Echidna" => Ok(Hardfork::Echidna),
            other => Err(format!("unknown hardfork: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_prefix() {
        assert_eq!("HF_Basilisk".parse::<Hardfork>().unwrap(), Hardfork::Basilisk);
        assert_eq!("Echidna".parse::<Hardfork>().unwrap(), Hardfork::Echidna);
        assert!("HF_Unknown".parse::<Hardfork>().is_err());
    }

    #[test]
    fn test_ordering_matches_activation_order() {
        assert!(Hardfork::Aspidochelone < Hardfork::Echidna);
        let mut sorted = Hardfork::ALL;
        sorted.sort();
        assert_eq!(sorted, Hardfork::ALL);
    }
}
