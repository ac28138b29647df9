// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use labwired_usart::stm32f030::rcc;

const CR: u64 = 0x00;
const AHBENR: u64 = rcc::AHBENR as u64;
const APB2ENR: u64 = rcc::APB2ENR as u64;
const APB1ENR: u64 = 0x1C;

/// CR out of reset: HSION | HSIRDY, trim at midpoint.
const CR_RESET: u32 = 0x0000_0083;
/// AHBENR out of reset: SRAM and FLITF clocks enabled.
const AHBENR_RESET: u32 = 0x0000_0014;

/// STM32F0 Reset and Clock Control, limited to the clock-enable registers.
#[derive(Debug, serde::Serialize)]
pub struct Rcc {
    cr: u32,
    ahbenr: u32,
    apb2enr: u32,
    apb1enr: u32,
}

impl Default for Rcc {
    fn default() -> Self {
        Self::new()
    }
}

impl Rcc {
    pub fn new() -> Self {
        Self {
            cr: CR_RESET,
            ahbenr: AHBENR_RESET,
            apb2enr: 0,
            apb1enr: 0,
        }
    }

    pub fn ahbenr(&self) -> u32 {
        self.ahbenr
    }

    pub fn apb2enr(&self) -> u32 {
        self.apb2enr
    }

    fn read_reg(&self, offset: u64) -> u32 {
        match offset {
            CR => self.cr,
            AHBENR => self.ahbenr,
            APB2ENR => self.apb2enr,
            APB1ENR => self.apb1enr,
            _ => 0,
        }
    }

    fn write_reg(&mut self, offset: u64, value: u32) {
        match offset {
            // HSIRDY follows HSION.
            CR => self.cr = (value & !0x2) | ((value & 0x1) << 1),
            AHBENR => self.ahbenr = value,
            APB2ENR => self.apb2enr = value,
            APB1ENR => self.apb1enr = value,
            _ => tracing::debug!("RCC write to unmodelled offset {:#x} ignored", offset),
        }
    }
}

impl crate::Peripheral for Rcc {
    fn read(&mut self, offset: u64) -> SimResult<u32> {
        Ok(self.read_reg(offset))
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        tracing::debug!("RCC[{:#04x}] <= {:#010x}", offset, value);
        self.write_reg(offset, value);
        Ok(())
    }

    fn peek(&self, offset: u64) -> Option<u32> {
        Some(self.read_reg(offset))
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
