// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Terminal echo demo shared by the firmware image and the host runner.

use crate::regs::RegisterAccess;
use crate::usart::Usart;

pub const RETURN_MARKER: &[u8] = b"<RETURN>";

/// Prints the banner. The leading `H` goes out as a single byte.
pub fn greet<R: RegisterAccess>(usart: &mut Usart<R>) {
    usart.transmit_byte(b'H');
    usart.transmit_line(b"ello World!");
    usart.transmit_line(b"Now type stuff on the terminal to be echoed...");
}

/// Echoes one received byte. A carriage return is followed by `<RETURN>`.
pub fn echo_once<R: RegisterAccess>(usart: &mut Usart<R>) -> u8 {
    let byte = usart.receive_byte();
    usart.transmit_byte(byte);
    if byte == b'\r' {
        usart.transmit_line(RETURN_MARKER);
    }
    byte
}
