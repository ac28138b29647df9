// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use labwired_usart::{demo, Mmio, Usart, USART1};
use panic_halt as _;

const BAUD: u32 = 115_200;

#[entry]
fn main() -> ! {
    // SAFETY: nothing else in this image touches RCC, GPIOA or USART1.
    let regs = unsafe { Mmio::new() };
    let mut usart = Usart::new(regs, USART1);

    if usart.initialize(BAUD).is_err() {
        // Unreachable with the HSI reference clock.
        loop {
            cortex_m::asm::wfi();
        }
    }

    demo::greet(&mut usart);
    loop {
        demo::echo_once(&mut usart);
    }
}
