// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::baud::{ConfigError, Divisor};
use crate::regs::RegisterAccess;
use crate::stm32f030::{afr_field, gpio, moder_field, Cr1, Isr, UsartInstance};
use core::convert::Infallible;
use core::fmt;

const LINE_FEED: u8 = b'\n';

fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Handle to one USART.
///
/// All operations poll status flags and never time out: if the hardware
/// never reports ready, the call never returns.
#[derive(Debug)]
pub struct Usart<R> {
    regs: R,
    instance: UsartInstance,
}

impl<R: RegisterAccess> Usart<R> {
    pub fn new(regs: R, instance: UsartInstance) -> Self {
        Self { regs, instance }
    }

    pub fn instance(&self) -> &UsartInstance {
        &self.instance
    }

    pub fn regs_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn release(self) -> R {
        self.regs
    }

    /// Brings the port up at `baud`.
    ///
    /// The sequence is fixed: GPIO clock, pin mode, alternate function,
    /// USART clock, divisor, enables. The divisor is validated before the
    /// first write, so an invalid rate leaves every register untouched.
    /// Repeating the call with the same rate rewrites identical values.
    pub fn initialize(&mut self, baud: u32) -> Result<Divisor, ConfigError> {
        let inst = self.instance;
        let divisor = Divisor::checked(inst.reference_clock_hz, baud)?;

        self.regs
            .set_bits(inst.rcc_ahbenr(), inst.gpio_clock_enable);

        let moder = inst.gpio_moder();
        self.regs
            .write_field(moder, moder_field(inst.tx_pin), gpio::MODE_ALTERNATE);
        self.regs
            .write_field(moder, moder_field(inst.rx_pin), gpio::MODE_ALTERNATE);

        let af = inst.alternate_function as u32;
        self.regs
            .write_field(inst.gpio_afr(inst.tx_pin), afr_field(inst.tx_pin), af);
        self.regs
            .write_field(inst.gpio_afr(inst.rx_pin), afr_field(inst.rx_pin), af);

        self.regs
            .set_bits(inst.rcc_apb2enr(), inst.usart_clock_enable);

        self.regs.write(inst.brr(), divisor.bits());

        self.regs
            .set_bits(inst.cr1(), (Cr1::TE | Cr1::RE | Cr1::UE).bits());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            usart = inst.name,
            baud,
            mantissa = divisor.mantissa,
            fraction = divisor.fraction,
            "usart initialized"
        );

        Ok(divisor)
    }

    pub fn status(&mut self) -> Isr {
        Isr::from_bits_truncate(self.regs.read(self.instance.isr()))
    }

    /// Single poll of TXE. TDR is only written once the holding register is empty.
    pub fn try_transmit_byte(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        if !self.status().contains(Isr::TXE) {
            return Err(nb::Error::WouldBlock);
        }
        self.regs.write(self.instance.tdr(), byte as u32);
        Ok(())
    }

    /// Blocks until TXE, then hands `byte` to the holding register.
    /// Returns before the byte has left the shift register.
    pub fn transmit_byte(&mut self, byte: u8) {
        infallible(nb::block!(self.try_transmit_byte(byte)))
    }

    /// Single poll of RXNE.
    pub fn try_receive_byte(&mut self) -> nb::Result<u8, Infallible> {
        if !self.status().contains(Isr::RXNE) {
            return Err(nb::Error::WouldBlock);
        }
        Ok(self.regs.read(self.instance.rdr()) as u8)
    }

    /// Blocks until RXNE, then returns the received byte.
    pub fn receive_byte(&mut self) -> u8 {
        infallible(nb::block!(self.try_receive_byte()))
    }

    /// Blocks until the last byte handed over has been shifted out.
    pub fn flush(&mut self) {
        while !self.status().contains(Isr::TC) {
            core::hint::spin_loop();
        }
    }

    /// Sends `line` up to its first NUL (or its end), then a line feed.
    pub fn transmit_line(&mut self, line: &[u8]) {
        for &byte in line.iter().take_while(|&&b| b != 0) {
            self.transmit_byte(byte);
        }
        self.transmit_byte(LINE_FEED);
    }

    pub fn transmit_str(&mut self, s: &str) {
        for &byte in s.as_bytes() {
            self.transmit_byte(byte);
        }
    }

    pub fn write_decimal(&mut self, value: u32) {
        let mut digits = [0u8; 10];
        let mut len = 0;
        let mut rest = value;
        loop {
            digits[len] = b'0' + (rest % 10) as u8;
            len += 1;
            rest /= 10;
            if rest == 0 {
                break;
            }
        }
        for &digit in digits[..len].iter().rev() {
            self.transmit_byte(digit);
        }
    }

    /// Uppercase, no prefix, no leading zeros.
    pub fn write_hex(&mut self, value: u32) {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        let nibbles = ((32 - value.leading_zeros() + 3) / 4).max(1);
        for i in (0..nibbles).rev() {
            self.transmit_byte(HEX[((value >> (i * 4)) & 0xF) as usize]);
        }
    }
}

impl<R: RegisterAccess> fmt::Write for Usart<R> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.transmit_str(s);
        Ok(())
    }
}
