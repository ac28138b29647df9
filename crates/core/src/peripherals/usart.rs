// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use labwired_usart::stm32f030::{usart, Cr1, Isr};
use labwired_usart::Divisor;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

const CR1: u64 = usart::CR1 as u64;
const CR2: u64 = 0x04;
const CR3: u64 = 0x08;
const BRR: u64 = usart::BRR as u64;
const ISR: u64 = usart::ISR as u64;
const ICR: u64 = 0x20;
const RDR: u64 = usart::RDR as u64;
const TDR: u64 = usart::TDR as u64;

/// Counters for how software drove the port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct UsartStats {
    pub isr_polls: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    /// TDR writes that landed while TXE was clear.
    pub tdr_while_busy: u64,
    /// RDR reads while RXNE was clear.
    pub rdr_while_empty: u64,
    /// TDR writes dropped because the transmitter was not enabled.
    pub tdr_while_disabled: u64,
}

/// STM32F0 USART model without FIFOs.
///
/// TXE is held clear for `tx_ready_after_polls` ISR reads after every TDR
/// write; RXNE asserts `rx_ready_after_polls` ISR reads after a byte becomes
/// pending. A latency of zero gives an always-ready line.
#[derive(Debug, Default, serde::Serialize)]
pub struct Usart {
    cr1: u32,
    cr2: u32,
    cr3: u32,
    brr: u32,
    rx_queue: VecDeque<u8>,
    tx_ready_after_polls: u32,
    rx_ready_after_polls: u32,
    tx_busy: u32,
    rx_wait: u32,
    stats: UsartStats,
    #[serde(skip)]
    sink: Option<Arc<Mutex<Vec<u8>>>>,
    echo_stdout: bool,
}

impl Usart {
    pub fn new() -> Self {
        Self::with_latency(0, 0)
    }

    pub fn with_latency(tx_ready_after_polls: u32, rx_ready_after_polls: u32) -> Self {
        Self {
            tx_ready_after_polls,
            rx_ready_after_polls,
            rx_wait: rx_ready_after_polls,
            echo_stdout: true,
            ..Default::default()
        }
    }

    pub fn set_sink(&mut self, sink: Option<Arc<Mutex<Vec<u8>>>>, echo_stdout: bool) {
        self.sink = sink;
        self.echo_stdout = echo_stdout;
    }

    /// Drains what has been transmitted into the sink so far.
    pub fn take_tx(&mut self) -> Vec<u8> {
        match &self.sink {
            Some(sink) => sink
                .lock()
                .map(|mut guard| std::mem::take(&mut *guard))
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Queues bytes as if they arrived on the RX pin.
    pub fn inject_rx(&mut self, bytes: &[u8]) {
        if self.rx_queue.is_empty() {
            self.rx_wait = self.rx_ready_after_polls;
        }
        self.rx_queue.extend(bytes);
    }

    pub fn rx_pending(&self) -> usize {
        self.rx_queue.len()
    }

    pub fn stats(&self) -> UsartStats {
        self.stats
    }

    pub fn cr1(&self) -> Cr1 {
        Cr1::from_bits_truncate(self.cr1)
    }

    pub fn brr(&self) -> u32 {
        self.brr
    }

    pub fn divisor(&self) -> Divisor {
        Divisor::from_bits(self.brr)
    }

    /// Baud rate the line actually runs at for `kernel_clock_hz`.
    pub fn effective_baud(&self, kernel_clock_hz: u32) -> u32 {
        self.divisor().effective_baud(kernel_clock_hz)
    }

    fn transmitter_enabled(&self) -> bool {
        self.cr1().contains(Cr1::UE | Cr1::TE)
    }

    fn receiver_enabled(&self) -> bool {
        self.cr1().contains(Cr1::UE | Cr1::RE)
    }

    fn rx_ready(&self) -> bool {
        self.receiver_enabled() && !self.rx_queue.is_empty() && self.rx_wait == 0
    }

    fn flags(&self) -> Isr {
        let mut isr = Isr::empty();
        if self.tx_busy == 0 {
            isr |= Isr::TXE | Isr::TC;
        }
        if self.rx_ready() {
            isr |= Isr::RXNE;
        }
        isr
    }

    /// An ISR read is one poll: it reports the current flags, then advances
    /// whichever countdowns are still running.
    fn poll_isr(&mut self) -> u32 {
        self.stats.isr_polls += 1;
        let isr = self.flags();
        if self.tx_busy > 0 {
            self.tx_busy -= 1;
        }
        if self.receiver_enabled() && !self.rx_queue.is_empty() && self.rx_wait > 0 {
            self.rx_wait -= 1;
        }
        tracing::trace!("USART ISR poll -> {:?}", isr);
        isr.bits()
    }

    fn read_rdr(&mut self) -> u32 {
        if !self.rx_ready() {
            self.stats.rdr_while_empty += 1;
            tracing::warn!("USART RDR read while RXNE is clear");
            return 0;
        }
        let byte = self.rx_queue.pop_front().unwrap_or(0);
        self.rx_wait = self.rx_ready_after_polls;
        self.stats.rx_bytes += 1;
        byte as u32
    }

    fn write_tdr(&mut self, value: u32) {
        if !self.transmitter_enabled() {
            self.stats.tdr_while_disabled += 1;
            tracing::warn!("USART TDR write {:#04x} dropped: transmitter disabled", value);
            return;
        }
        if self.tx_busy > 0 {
            self.stats.tdr_while_busy += 1;
            tracing::warn!("USART TDR written while TXE is clear");
        }
        self.tx_busy = self.tx_ready_after_polls;
        self.stats.tx_bytes += 1;
        self.push_tx(value as u8);
    }

    fn push_tx(&mut self, value: u8) {
        if let Some(sink) = &self.sink {
            if let Ok(mut guard) = sink.lock() {
                guard.push(value);
            }
        }

        if self.echo_stdout {
            #[allow(unused_must_use)]
            {
                print!("{}", value as char);
                io::stdout().flush();
            }
        }
    }

    fn read_reg(&self, offset: u64) -> u32 {
        match offset {
            CR1 => self.cr1,
            CR2 => self.cr2,
            CR3 => self.cr3,
            BRR => self.brr,
            ISR => self.flags().bits(),
            _ => 0,
        }
    }
}

impl crate::Peripheral for Usart {
    fn read(&mut self, offset: u64) -> SimResult<u32> {
        Ok(match offset {
            ISR => self.poll_isr(),
            RDR => self.read_rdr(),
            _ => self.read_reg(offset),
        })
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset {
            TDR => self.write_tdr(value & 0x1FF),
            CR1 => {
                tracing::debug!("USART CR1 <= {:?}", Cr1::from_bits_truncate(value));
                self.cr1 = value;
            }
            CR2 => self.cr2 = value,
            CR3 => self.cr3 = value,
            BRR => {
                let divisor = Divisor::from_bits(value);
                tracing::debug!(
                    mantissa = divisor.mantissa,
                    fraction = divisor.fraction,
                    "USART BRR <= {:#06x}",
                    value & 0xFFFF
                );
                self.brr = value & 0xFFFF;
            }
            // No error flags are modelled, so there is nothing to clear.
            ICR => {}
            _ => tracing::debug!("USART write to read-only/unmodelled offset {:#x}", offset),
        }
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

#[cfg(test)]
mod tests {
    use super::Usart;
    use crate::Peripheral;
    use labwired_usart::stm32f030::{Cr1, Isr};
    use std::sync::{Arc, Mutex};

    fn enabled(tx: u32, rx: u32) -> (Usart, Arc<Mutex<Vec<u8>>>) {
        let mut usart = Usart::with_latency(tx, rx);
        let sink = Arc::new(Mutex::new(Vec::new()));
        usart.set_sink(Some(sink.clone()), false);
        usart
            .write(0x00, (Cr1::UE | Cr1::TE | Cr1::RE).bits())
            .unwrap();
        (usart, sink)
    }

    #[test]
    fn test_usart_reset_flags() {
        let mut usart = Usart::new();
        let isr = Isr::from_bits_truncate(usart.read(0x1C).unwrap());
        assert_eq!(isr, Isr::TXE | Isr::TC);
    }

    #[test]
    fn test_usart_tdr_goes_to_sink() {
        let (mut usart, sink) = enabled(0, 0);
        usart.write(0x28, b'A' as u32).unwrap();
        usart.write(0x28, b'B' as u32).unwrap();
        assert_eq!(*sink.lock().unwrap(), b"AB");
        assert_eq!(usart.stats().tx_bytes, 2);
    }

    #[test]
    fn test_usart_tdr_dropped_when_disabled() {
        let mut usart = Usart::new();
        let sink = Arc::new(Mutex::new(Vec::new()));
        usart.set_sink(Some(sink.clone()), false);
        usart.write(0x28, b'A' as u32).unwrap();
        assert!(sink.lock().unwrap().is_empty());
        assert_eq!(usart.stats().tdr_while_disabled, 1);
    }

    #[test]
    fn test_usart_txe_latency() {
        let (mut usart, _sink) = enabled(2, 0);
        usart.write(0x28, b'A' as u32).unwrap();
        assert!(!Isr::from_bits_truncate(usart.read(0x1C).unwrap()).contains(Isr::TXE));
        assert!(!Isr::from_bits_truncate(usart.read(0x1C).unwrap()).contains(Isr::TXE));
        assert!(Isr::from_bits_truncate(usart.read(0x1C).unwrap()).contains(Isr::TXE));
    }

    #[test]
    fn test_usart_counts_overwrite_of_busy_holding_register() {
        let (mut usart, _sink) = enabled(5, 0);
        usart.write(0x28, b'A' as u32).unwrap();
        usart.write(0x28, b'B' as u32).unwrap();
        assert_eq!(usart.stats().tdr_while_busy, 1);
    }

    #[test]
    fn test_usart_rxne_latency_and_order() {
        let (mut usart, _sink) = enabled(0, 1);
        usart.inject_rx(b"xy");
        assert!(!Isr::from_bits_truncate(usart.read(0x1C).unwrap()).contains(Isr::RXNE));
        assert!(Isr::from_bits_truncate(usart.read(0x1C).unwrap()).contains(Isr::RXNE));
        assert_eq!(usart.read(0x24).unwrap(), b'x' as u32);
        assert_eq!(usart.read(0x24).unwrap(), 0);
        assert_eq!(usart.stats().rdr_while_empty, 1);
        usart.read(0x1C).unwrap();
        assert_eq!(usart.read(0x24).unwrap(), b'y' as u32);
        assert_eq!(usart.rx_pending(), 0);
    }

    #[test]
    fn test_usart_receiver_disabled_never_asserts_rxne() {
        let mut usart = Usart::new();
        usart.inject_rx(b"x");
        for _ in 0..4 {
            assert!(!Isr::from_bits_truncate(usart.read(0x1C).unwrap()).contains(Isr::RXNE));
        }
    }

    #[test]
    fn test_usart_brr_decodes_divisor() {
        let mut usart = Usart::new();
        usart.write(0x0C, 0x45).unwrap();
        assert_eq!(usart.divisor().mantissa, 4);
        assert_eq!(usart.divisor().fraction, 5);
        assert_eq!(usart.effective_baud(8_000_000), 115_942);
    }

    #[test]
    fn test_usart_take_tx_drains_sink() {
        let (mut usart, _sink) = enabled(0, 0);
        usart.write(0x28, b'z' as u32).unwrap();
        assert_eq!(usart.take_tx(), b"z");
        assert!(usart.take_tx().is_empty());
    }
}
