// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod board;
pub mod bus;
pub mod peripherals;
pub mod snapshot;

use std::any::Any;

mod tests;

pub use board::Board;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Unaligned word access at {0:#x}")]
    UnalignedAccess(u64),
    #[error("Peripheral '{0}' is not mapped on this bus")]
    MissingPeripheral(String),
    #[error("Driver configuration rejected: {0}")]
    Driver(#[from] labwired_usart::ConfigError),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait representing a memory-mapped peripheral.
///
/// Offsets are relative to the peripheral's base and word aligned. Reads take
/// `&mut self` because status registers count polls.
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&mut self, offset: u64) -> SimResult<u32>;
    fn write(&mut self, offset: u64, value: u32) -> SimResult<()>;
    /// Side-effect-free read, used for clock-gate checks and debugging.
    fn peek(&self, _offset: u64) -> Option<u32> {
        None
    }
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
