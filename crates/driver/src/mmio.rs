// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::regs::{Register, RegisterAccess};

/// Volatile word access to memory-mapped registers.
#[derive(Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    ///
    /// Every register handed to this backend must be a valid, mapped,
    /// word-aligned peripheral address, and nothing else may drive those
    /// registers while the backend is in use.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterAccess for Mmio {
    fn read(&mut self, reg: Register) -> u32 {
        // SAFETY: address validity and exclusivity are the caller's contract from `Mmio::new`.
        unsafe { core::ptr::read_volatile(reg.address as *const u32) }
    }

    fn write(&mut self, reg: Register, value: u32) {
        // SAFETY: see `read`.
        unsafe { core::ptr::write_volatile(reg.address as *mut u32, value) }
    }
}
