// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! STM32F030 register map for the blocks the USART driver touches.

use crate::regs::{Field, Register};
use bitflags::bitflags;

/// Internal 8 MHz RC oscillator, the reset clock source.
pub const HSI_HZ: u32 = 8_000_000;

pub const RCC_BASE: u32 = 0x4002_1000;
pub const GPIOA_BASE: u32 = 0x4800_0000;
pub const USART1_BASE: u32 = 0x4001_3800;

pub mod rcc {
    pub const AHBENR: u32 = 0x14;
    pub const APB2ENR: u32 = 0x18;

    pub const AHBENR_IOPAEN: u32 = 1 << 17;
    pub const APB2ENR_USART1EN: u32 = 1 << 14;
}

pub mod gpio {
    pub const MODER: u32 = 0x00;
    pub const AFRL: u32 = 0x20;
    pub const AFRH: u32 = 0x24;

    pub const MODE_INPUT: u32 = 0b00;
    pub const MODE_OUTPUT: u32 = 0b01;
    pub const MODE_ALTERNATE: u32 = 0b10;
    pub const MODE_ANALOG: u32 = 0b11;
}

pub mod usart {
    pub const CR1: u32 = 0x00;
    pub const BRR: u32 = 0x0C;
    pub const ISR: u32 = 0x1C;
    pub const RDR: u32 = 0x24;
    pub const TDR: u32 = 0x28;
}

bitflags! {
    /// USART_CR1 enable bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Cr1: u32 {
        const UE = 1 << 0;
        const RE = 1 << 2;
        const TE = 1 << 3;
    }
}

bitflags! {
    /// USART_ISR status flags the driver polls.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Isr: u32 {
        const RXNE = 1 << 5;
        const TC = 1 << 6;
        const TXE = 1 << 7;
    }
}

/// USART_BRR fields for 16x oversampling.
pub const BRR_DIV_FRACTION: Field = Field::new(0, 4);
pub const BRR_DIV_MANTISSA: Field = Field::new(4, 12);

/// Mode field of `pin` in GPIOx_MODER.
pub const fn moder_field(pin: u8) -> Field {
    Field::new(pin * 2, 2)
}

/// Alternate-function field of `pin` in GPIOx_AFRL/AFRH.
pub const fn afr_field(pin: u8) -> Field {
    Field::new((pin % 8) * 4, 4)
}

/// Silicon description of one USART and the pins routed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsartInstance {
    pub name: &'static str,
    pub rcc_base: u32,
    pub gpio_base: u32,
    pub usart_base: u32,
    /// RCC_AHBENR bit gating the GPIO port.
    pub gpio_clock_enable: u32,
    /// RCC_APB2ENR bit gating the USART.
    pub usart_clock_enable: u32,
    pub tx_pin: u8,
    pub rx_pin: u8,
    pub alternate_function: u8,
    pub reference_clock_hz: u32,
}

/// USART1 on PA2 (TX) / PA3 (RX), AF1, clocked from HSI.
pub const USART1: UsartInstance = UsartInstance {
    name: "usart1",
    rcc_base: RCC_BASE,
    gpio_base: GPIOA_BASE,
    usart_base: USART1_BASE,
    gpio_clock_enable: rcc::AHBENR_IOPAEN,
    usart_clock_enable: rcc::APB2ENR_USART1EN,
    tx_pin: 2,
    rx_pin: 3,
    alternate_function: 1,
    reference_clock_hz: HSI_HZ,
};

impl UsartInstance {
    pub const fn with_reference_clock(self, reference_clock_hz: u32) -> Self {
        Self {
            reference_clock_hz,
            ..self
        }
    }

    pub const fn rcc_ahbenr(&self) -> Register {
        Register::at("RCC_AHBENR", self.rcc_base, rcc::AHBENR)
    }

    pub const fn rcc_apb2enr(&self) -> Register {
        Register::at("RCC_APB2ENR", self.rcc_base, rcc::APB2ENR)
    }

    pub const fn gpio_moder(&self) -> Register {
        Register::at("GPIO_MODER", self.gpio_base, gpio::MODER)
    }

    /// AFRL for pins 0..=7, AFRH for 8..=15.
    pub const fn gpio_afr(&self, pin: u8) -> Register {
        if pin < 8 {
            Register::at("GPIO_AFRL", self.gpio_base, gpio::AFRL)
        } else {
            Register::at("GPIO_AFRH", self.gpio_base, gpio::AFRH)
        }
    }

    pub const fn cr1(&self) -> Register {
        Register::at("USART_CR1", self.usart_base, usart::CR1)
    }

    pub const fn brr(&self) -> Register {
        Register::at("USART_BRR", self.usart_base, usart::BRR)
    }

    pub const fn isr(&self) -> Register {
        Register::at("USART_ISR", self.usart_base, usart::ISR)
    }

    pub const fn rdr(&self) -> Register {
        Register::at("USART_RDR", self.usart_base, usart::RDR)
    }

    pub const fn tdr(&self) -> Register {
        Register::at("USART_TDR", self.usart_base, usart::TDR)
    }
}
