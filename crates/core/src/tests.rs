// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[cfg(test)]
mod integration_tests {
    use crate::board::{GPIOA, RCC, USART1_NAME};
    use crate::bus::BusWrite;
    use crate::peripherals::gpio::PinMode;
    use crate::peripherals::usart::Usart;
    use crate::{Board, SimulationError};
    use labwired_config::{BoardConfig, UsartModelConfig};
    use labwired_usart::stm32f030::Cr1;
    use labwired_usart::{demo, ConfigError};
    use std::sync::{Arc, Mutex};

    fn board_with_latency(tx: u32, rx: u32) -> (Board, Arc<Mutex<Vec<u8>>>) {
        let config = BoardConfig {
            usart: UsartModelConfig {
                tx_ready_after_polls: tx,
                rx_ready_after_polls: rx,
                echo_stdout: false,
            },
            ..BoardConfig::default()
        };
        let mut board = Board::new(&config).unwrap();
        let sink = Arc::new(Mutex::new(Vec::new()));
        board.bus.attach_usart_tx_sink(sink.clone(), false);
        (board, sink)
    }

    fn write(peripheral: &str, offset: u64, value: u32) -> BusWrite {
        BusWrite {
            peripheral: peripheral.to_string(),
            offset,
            value,
        }
    }

    #[test]
    fn test_initialize_programs_every_block() {
        let mut board = Board::stm32f030().unwrap();
        let divisor = board.driver().initialize(115_200).unwrap();
        assert_eq!(divisor.bits(), 0x45);

        assert_eq!(board.rcc().unwrap().ahbenr(), 0x0002_0014);
        assert_eq!(board.rcc().unwrap().apb2enr(), 1 << 14);

        let gpio = board.gpioa().unwrap();
        assert_eq!(gpio.moder(), 0x2800_00A0);
        assert_eq!(gpio.afrl(), 0x0000_1100);
        assert_eq!(gpio.pin_mode(2), PinMode::Alternate);
        assert_eq!(gpio.pin_mode(3), PinMode::Alternate);
        // SWD pins keep their reset mode.
        assert_eq!(gpio.pin_mode(13), PinMode::Alternate);

        let usart = board.usart().unwrap();
        assert_eq!(usart.brr(), 0x45);
        assert_eq!(usart.cr1(), Cr1::UE | Cr1::TE | Cr1::RE);

        assert!(board.usart_ready());
        assert_eq!(board.bus.gated_writes, 0);
        assert!(board.bus.faults.is_empty());
    }

    #[test]
    fn test_initialize_write_order() {
        let mut board = Board::stm32f030().unwrap();
        board.bus.record_writes();
        board.driver().initialize(115_200).unwrap();

        assert_eq!(
            board.bus.take_write_log(),
            vec![
                write(RCC, 0x14, 0x0002_0014),
                write(GPIOA, 0x00, 0x2800_0020),
                write(GPIOA, 0x00, 0x2800_00A0),
                write(GPIOA, 0x20, 0x0000_0100),
                write(GPIOA, 0x20, 0x0000_1100),
                write(RCC, 0x18, 0x0000_4000),
                write(USART1_NAME, 0x0C, 0x45),
                write(USART1_NAME, 0x00, 0x0D),
            ]
        );
    }

    #[test]
    fn test_initialize_twice_is_idempotent() {
        let mut board = Board::stm32f030().unwrap();
        board.driver().initialize(115_200).unwrap();
        let first = board.snapshot();
        board.driver().initialize(115_200).unwrap();
        let second = board.snapshot();
        assert_eq!(first.peripherals, second.peripherals);
    }

    #[test]
    fn test_rejected_baud_touches_nothing() {
        let mut board = Board::stm32f030().unwrap();
        board.bus.record_writes();
        assert_eq!(
            board.driver().initialize(0),
            Err(ConfigError::ZeroBaudRate)
        );
        assert!(board.bus.take_write_log().is_empty());
        assert!(!board.usart_ready());
    }

    #[test]
    fn test_divisor_at_other_reference_clock() {
        let config = BoardConfig {
            clock_hz: 48_000_000,
            usart: UsartModelConfig {
                echo_stdout: false,
                ..UsartModelConfig::default()
            },
            ..BoardConfig::default()
        };
        let mut board = Board::new(&config).unwrap();
        board.driver().initialize(115_200).unwrap();
        assert_eq!(board.usart().unwrap().brr(), 416);
        assert_eq!(board.usart().unwrap().effective_baud(48_000_000), 115_384);
    }

    #[test]
    fn test_greeting_with_slow_transmitter() {
        let (mut board, sink) = board_with_latency(7, 0);
        let mut driver = board.driver();
        driver.initialize(115_200).unwrap();
        demo::greet(&mut driver);
        driver.flush();

        assert_eq!(
            sink.lock().unwrap().as_slice(),
            b"Hello World!\nNow type stuff on the terminal to be echoed...\n"
        );
        let stats = board.usart().unwrap().stats();
        assert_eq!(stats.tdr_while_busy, 0);
        assert_eq!(stats.tdr_while_disabled, 0);
    }

    #[test]
    fn test_echo_with_slow_receiver() {
        let (mut board, sink) = board_with_latency(3, 11);
        let mut driver = board.driver();
        driver.initialize(115_200).unwrap();
        driver
            .regs_mut()
            .device_mut::<Usart>(USART1_NAME)
            .unwrap()
            .inject_rx(b"ok\r");

        let echoed: Vec<u8> = (0..3).map(|_| demo::echo_once(&mut driver)).collect();
        assert_eq!(echoed, b"ok\r");
        assert_eq!(sink.lock().unwrap().as_slice(), b"ok\r<RETURN>\n");

        let stats = board.usart().unwrap().stats();
        assert_eq!(stats.rx_bytes, 3);
        assert_eq!(stats.rdr_while_empty, 0);
        assert_eq!(stats.tdr_while_busy, 0);
    }

    #[test]
    fn test_usart_clock_must_precede_usart_writes() {
        let mut board = Board::stm32f030().unwrap();
        let inst = board.instance();

        board.bus.write_u32(inst.brr().address as u64, 0x45).unwrap();
        assert_eq!(board.bus.gated_writes, 1);
        assert_eq!(board.usart().unwrap().brr(), 0);

        board
            .bus
            .write_u32(inst.rcc_apb2enr().address as u64, inst.usart_clock_enable)
            .unwrap();
        board.bus.write_u32(inst.brr().address as u64, 0x45).unwrap();
        assert_eq!(board.usart().unwrap().brr(), 0x45);
    }

    #[test]
    fn test_missing_board_block_is_reported() {
        let board = Board::stm32f030().unwrap();
        assert_eq!(
            board.bus.device::<Usart>(GPIOA).unwrap_err(),
            SimulationError::MissingPeripheral(GPIOA.to_string())
        );
    }

    #[test]
    fn test_snapshot_lists_board_blocks() {
        let mut board = Board::stm32f030().unwrap();
        board.driver().initialize(9_600).unwrap();
        let snapshot = board.snapshot();
        assert_eq!(snapshot.board, "f030-demo");
        assert_eq!(snapshot.clock_hz, 8_000_000);
        assert_eq!(snapshot.peripherals.len(), 3);
        assert_eq!(snapshot.peripherals[USART1_NAME]["brr"], 833);
        assert!(snapshot.faults.is_empty());
    }
}
