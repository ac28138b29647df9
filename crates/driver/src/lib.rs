// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Minimal polling USART driver for the STM32F030.
//!
//! The driver never touches memory directly. Every register access goes
//! through [`RegisterAccess`], which is implemented by [`Mmio`] on the chip
//! and by the simulated system bus in `labwired-core` on a host.

#![cfg_attr(not(test), no_std)]

pub mod baud;
pub mod demo;
pub mod mmio;
pub mod regs;
pub mod stm32f030;
pub mod usart;


pub use baud::{ConfigError, Divisor, SUPPORTED_BAUD_RATES};
pub use mmio::Mmio;
pub use regs::{Field, Register, RegisterAccess};
pub use stm32f030::{UsartInstance, USART1};
pub use usart::Usart;
