// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::{ClockGate, PeripheralEntry, SystemBus};
use crate::peripherals::gpio::{GpioPort, GPIOA_MODER_RESET};
use crate::peripherals::rcc::Rcc;
use crate::peripherals::usart::Usart;
use crate::snapshot::BoardSnapshot;
use crate::SimResult;
use anyhow::Context;
use labwired_config::BoardConfig;
use labwired_usart::stm32f030::{self, rcc, GPIOA_BASE, RCC_BASE, USART1, USART1_BASE};
use labwired_usart::UsartInstance;

pub const RCC: &str = "rcc";
pub const GPIOA: &str = "gpioa";
pub const USART1_NAME: &str = "usart1";

/// STM32F030 with the blocks USART1 depends on.
pub struct Board {
    pub bus: SystemBus,
    config: BoardConfig,
}

impl Board {
    pub fn new(config: &BoardConfig) -> anyhow::Result<Self> {
        config
            .validate()
            .with_context(|| format!("Board '{}' has an invalid configuration", config.name))?;

        let mut bus = SystemBus::new();
        bus.map(PeripheralEntry {
            name: RCC.to_string(),
            base: RCC_BASE as u64,
            size: 0x400,
            clock: None,
            dev: Box::new(Rcc::new()),
        });
        bus.map(PeripheralEntry {
            name: GPIOA.to_string(),
            base: GPIOA_BASE as u64,
            size: 0x400,
            clock: Some(ClockGate {
                register: (RCC_BASE + rcc::AHBENR) as u64,
                mask: rcc::AHBENR_IOPAEN,
            }),
            dev: Box::new(GpioPort::with_moder_reset(GPIOA_MODER_RESET)),
        });

        let mut usart = Usart::with_latency(
            config.usart.tx_ready_after_polls,
            config.usart.rx_ready_after_polls,
        );
        usart.set_sink(None, config.usart.echo_stdout);
        bus.map(PeripheralEntry {
            name: USART1_NAME.to_string(),
            base: USART1_BASE as u64,
            size: 0x400,
            clock: Some(ClockGate {
                register: (RCC_BASE + rcc::APB2ENR) as u64,
                mask: rcc::APB2ENR_USART1EN,
            }),
            dev: Box::new(usart),
        });

        tracing::info!(
            board = %config.name,
            clock_hz = config.clock_hz,
            "Simulated STM32F030 ready"
        );

        Ok(Self {
            bus,
            config: config.clone(),
        })
    }

    /// Board with the default configuration and no stdout echo.
    pub fn stm32f030() -> anyhow::Result<Self> {
        let mut config = BoardConfig::default();
        config.usart.echo_stdout = false;
        Self::new(&config)
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// USART1 as the driver sees it on this board's clock.
    pub fn instance(&self) -> UsartInstance {
        USART1.with_reference_clock(self.config.clock_hz)
    }

    /// Driver handle borrowing this board's bus.
    pub fn driver(&mut self) -> labwired_usart::Usart<&mut SystemBus> {
        let instance = self.instance();
        labwired_usart::Usart::new(&mut self.bus, instance)
    }

    pub fn rcc(&self) -> SimResult<&Rcc> {
        self.bus.device(RCC)
    }

    pub fn gpioa(&self) -> SimResult<&GpioPort> {
        self.bus.device(GPIOA)
    }

    pub fn usart(&self) -> SimResult<&Usart> {
        self.bus.device(USART1_NAME)
    }

    pub fn usart_mut(&mut self) -> SimResult<&mut Usart> {
        self.bus.device_mut(USART1_NAME)
    }

    /// True once the USART is clocked, routed to its pins and enabled.
    pub fn usart_ready(&self) -> bool {
        let inst = self.instance();
        let (Ok(rcc), Ok(gpio), Ok(usart)) = (self.rcc(), self.gpioa(), self.usart()) else {
            return false;
        };
        let pins_routed = [inst.tx_pin, inst.rx_pin].iter().all(|&pin| {
            gpio.pin_mode(pin) == crate::peripherals::gpio::PinMode::Alternate
                && gpio.alternate_function(pin) == inst.alternate_function
        });
        rcc.ahbenr() & inst.gpio_clock_enable != 0
            && rcc.apb2enr() & inst.usart_clock_enable != 0
            && pins_routed
            && usart
                .cr1()
                .contains(stm32f030::Cr1::UE | stm32f030::Cr1::TE | stm32f030::Cr1::RE)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            board: self.config.name.clone(),
            clock_hz: self.config.clock_hz,
            peripherals: self
                .bus
                .peripherals
                .iter()
                .map(|p| (p.name.clone(), p.dev.snapshot()))
                .collect(),
            gated_writes: self.bus.gated_writes,
            faults: self.bus.faults.iter().map(|f| f.to_string()).collect(),
        }
    }
}
