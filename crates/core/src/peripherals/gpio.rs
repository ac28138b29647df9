// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use labwired_usart::stm32f030::{afr_field, gpio, moder_field};

const MODER: u64 = gpio::MODER as u64;
const OTYPER: u64 = 0x04;
const OSPEEDR: u64 = 0x08;
const PUPDR: u64 = 0x0C;
const IDR: u64 = 0x10;
const ODR: u64 = 0x14;
const BSRR: u64 = 0x18;
const LCKR: u64 = 0x1C;
const AFRL: u64 = gpio::AFRL as u64;
const AFRH: u64 = gpio::AFRH as u64;
const BRR: u64 = 0x28;

/// GPIOA MODER out of reset: PA13/PA14 in AF mode for SWD.
pub const GPIOA_MODER_RESET: u32 = 0x2800_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinMode {
    Input,
    Output,
    Alternate,
    Analog,
}

impl PinMode {
    fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            gpio::MODE_INPUT => Self::Input,
            gpio::MODE_OUTPUT => Self::Output,
            gpio::MODE_ALTERNATE => Self::Alternate,
            _ => Self::Analog,
        }
    }
}

/// STM32F0 GPIO port.
#[derive(Debug, Default, serde::Serialize)]
pub struct GpioPort {
    moder: u32,   // 0x00: mode register
    otyper: u32,  // 0x04: output type register
    ospeedr: u32, // 0x08: output speed register
    pupdr: u32,   // 0x0C: pull-up/pull-down register
    idr: u32,     // 0x10: input data register
    odr: u32,     // 0x14: output data register
    lckr: u32,    // 0x1C: configuration lock register
    afrl: u32,    // 0x20: alternate function low register
    afrh: u32,    // 0x24: alternate function high register
}

impl GpioPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_moder_reset(moder: u32) -> Self {
        Self {
            moder,
            ..Self::default()
        }
    }

    pub fn moder(&self) -> u32 {
        self.moder
    }

    pub fn afrl(&self) -> u32 {
        self.afrl
    }

    pub fn odr(&self) -> u32 {
        self.odr
    }

    pub fn set_input(&mut self, idr: u32) {
        self.idr = idr & 0xFFFF;
    }

    pub fn pin_mode(&self, pin: u8) -> PinMode {
        PinMode::from_bits(moder_field(pin).extract(self.moder))
    }

    pub fn alternate_function(&self, pin: u8) -> u8 {
        let afr = if pin < 8 { self.afrl } else { self.afrh };
        afr_field(pin).extract(afr) as u8
    }

    fn read_reg(&self, offset: u64) -> u32 {
        match offset {
            MODER => self.moder,
            OTYPER => self.otyper,
            OSPEEDR => self.ospeedr,
            PUPDR => self.pupdr,
            IDR => self.idr,
            ODR => self.odr,
            LCKR => self.lckr,
            AFRL => self.afrl,
            AFRH => self.afrh,
            // BSRR and BRR are write-only.
            _ => 0,
        }
    }

    fn write_reg(&mut self, offset: u64, value: u32) {
        match offset {
            MODER => self.moder = value,
            OTYPER => self.otyper = value & 0xFFFF,
            OSPEEDR => self.ospeedr = value,
            PUPDR => self.pupdr = value,
            ODR => self.odr = value & 0xFFFF,
            BSRR => {
                // Lower 16 bits set, upper 16 bits reset.
                let set = value & 0xFFFF;
                let reset = (value >> 16) & 0xFFFF;
                self.odr |= set;
                self.odr &= !reset;
            }
            LCKR => self.lckr = value,
            AFRL => self.afrl = value,
            AFRH => self.afrh = value,
            BRR => self.odr &= !(value & 0xFFFF),
            _ => {}
        }
    }
}

impl crate::Peripheral for GpioPort {
    fn read(&mut self, offset: u64) -> SimResult<u32> {
        Ok(self.read_reg(offset))
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        tracing::debug!("GPIO[{:#04x}] <= {:#010x}", offset, value);
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
