// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BoardSnapshot {
    pub board: String,
    pub clock_hz: u32,
    pub peripherals: BTreeMap<String, serde_json::Value>,
    pub gated_writes: u64,
    pub faults: Vec<String>,
}

impl BoardSnapshot {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
