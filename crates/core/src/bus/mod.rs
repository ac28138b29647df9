// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::peripherals::usart::Usart;
use crate::{Peripheral, SimResult, SimulationError};
use labwired_usart::{Register, RegisterAccess};
use std::sync::{Arc, Mutex};

/// RCC enable bit a peripheral needs before it responds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ClockGate {
    /// Absolute address of the RCC enable register.
    pub register: u64,
    pub mask: u32,
}

pub struct PeripheralEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub clock: Option<ClockGate>,
    pub dev: Box<dyn Peripheral>,
}

impl PeripheralEntry {
    fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.base + self.size
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BusWrite {
    pub peripheral: String,
    pub offset: u64,
    pub value: u32,
}

/// Word-addressed peripheral bus.
///
/// Writes to a peripheral whose clock gate is closed are dropped and reads
/// return zero, as on silicon.
#[derive(Default)]
pub struct SystemBus {
    pub peripherals: Vec<PeripheralEntry>,
    /// Faults absorbed by the [`RegisterAccess`] adapter.
    pub faults: Vec<SimulationError>,
    pub gated_writes: u64,
    write_log: Option<Vec<BusWrite>>,
}

impl SystemBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, entry: PeripheralEntry) {
        tracing::debug!(
            "Mapping {} at {:#x}..{:#x}",
            entry.name,
            entry.base,
            entry.base + entry.size
        );
        self.peripherals.push(entry);
    }

    /// Start recording every accepted write, in order.
    pub fn record_writes(&mut self) {
        self.write_log = Some(Vec::new());
    }

    pub fn take_write_log(&mut self) -> Vec<BusWrite> {
        self.write_log
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default()
    }

    fn index_of(&self, addr: u64) -> SimResult<usize> {
        if addr % 4 != 0 {
            return Err(SimulationError::UnalignedAccess(addr));
        }
        self.peripherals
            .iter()
            .position(|p| p.contains(addr))
            .ok_or(SimulationError::MemoryViolation(addr))
    }

    /// Reads without side effects (no poll counting). Unmapped addresses peek as `None`.
    pub fn peek_u32(&self, addr: u64) -> Option<u32> {
        let idx = self.index_of(addr).ok()?;
        let p = &self.peripherals[idx];
        p.dev.peek(addr - p.base)
    }

    fn clock_enabled(&self, idx: usize) -> bool {
        match self.peripherals[idx].clock {
            Some(gate) => self
                .peek_u32(gate.register)
                .is_some_and(|v| v & gate.mask == gate.mask),
            None => true,
        }
    }

    pub fn read_u32(&mut self, addr: u64) -> SimResult<u32> {
        let idx = self.index_of(addr)?;
        if !self.clock_enabled(idx) {
            tracing::warn!(
                "Read of {} at {:#x} with its clock gated",
                self.peripherals[idx].name,
                addr
            );
            return Ok(0);
        }
        let p = &mut self.peripherals[idx];
        p.dev.read(addr - p.base)
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        let idx = self.index_of(addr)?;
        if !self.clock_enabled(idx) {
            self.gated_writes += 1;
            tracing::warn!(
                "Write {:#010x} to {} at {:#x} dropped: clock gated",
                value,
                self.peripherals[idx].name,
                addr
            );
            return Ok(());
        }
        let p = &mut self.peripherals[idx];
        let offset = addr - p.base;
        p.dev.write(offset, value)?;
        if let Some(log) = &mut self.write_log {
            log.push(BusWrite {
                peripheral: p.name.clone(),
                offset,
                value,
            });
        }
        Ok(())
    }

    pub fn device<T: 'static>(&self, name: &str) -> SimResult<&T> {
        self.peripherals
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.dev.as_any())
            .and_then(|any| any.downcast_ref::<T>())
            .ok_or_else(|| SimulationError::MissingPeripheral(name.to_string()))
    }

    pub fn device_mut<T: 'static>(&mut self, name: &str) -> SimResult<&mut T> {
        self.peripherals
            .iter_mut()
            .find(|p| p.name == name)
            .and_then(|p| p.dev.as_any_mut())
            .and_then(|any| any.downcast_mut::<T>())
            .ok_or_else(|| SimulationError::MissingPeripheral(name.to_string()))
    }

    /// Attach a TX capture sink to every USART on this bus.
    ///
    /// When `echo_stdout` is false, USART writes will no longer be printed to stdout.
    pub fn attach_usart_tx_sink(&mut self, sink: Arc<Mutex<Vec<u8>>>, echo_stdout: bool) {
        for p in &mut self.peripherals {
            let Some(any) = p.dev.as_any_mut() else {
                continue;
            };
            let Some(usart) = any.downcast_mut::<Usart>() else {
                continue;
            };
            usart.set_sink(Some(sink.clone()), echo_stdout);
        }
    }

    fn absorb(&mut self, err: SimulationError) {
        tracing::error!("Bus fault: {}", err);
        self.faults.push(err);
    }
}

impl RegisterAccess for SystemBus {
    fn read(&mut self, reg: Register) -> u32 {
        match self.read_u32(reg.address as u64) {
            Ok(value) => value,
            Err(err) => {
                self.absorb(err);
                0
            }
        }
    }

    fn write(&mut self, reg: Register, value: u32) {
        if let Err(err) = self.write_u32(reg.address as u64, value) {
            self.absorb(err);
        }
    }
}
