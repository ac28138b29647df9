// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use labwired_usart::stm32f030::HSI_HZ;
use labwired_usart::{Divisor, SUPPORTED_BAUD_RATES};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_name() -> String {
    "f030-demo".to_string()
}

fn default_clock_hz() -> u32 {
    HSI_HZ
}

fn default_baud() -> u32 {
    115_200
}

fn default_true() -> bool {
    true
}

/// Behaviour of the simulated USART1 status flags.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UsartModelConfig {
    /// ISR polls during which TXE stays clear after a TDR write.
    #[serde(default)]
    pub tx_ready_after_polls: u32,
    /// ISR polls before RXNE asserts for a pending byte.
    #[serde(default)]
    pub rx_ready_after_polls: u32,
    /// Mirror transmitted bytes to the process stdout.
    #[serde(default = "default_true")]
    pub echo_stdout: bool,
}

impl Default for UsartModelConfig {
    fn default() -> Self {
        Self {
            tx_ready_after_polls: 0,
            rx_ready_after_polls: 0,
            echo_stdout: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default = "default_name")]
    pub name: String,
    /// USART kernel clock. HSI out of reset.
    #[serde(default = "default_clock_hz")]
    pub clock_hz: u32,
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(default)]
    pub usart: UsartModelConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            name: default_name(),
            clock_hz: default_clock_hz(),
            baud: default_baud(),
            usart: UsartModelConfig::default(),
        }
    }
}

impl BoardConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open board config at {:?}", path))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid board config {:?}", path))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Board Config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.clock_hz == 0 {
            anyhow::bail!("'clock_hz' must be greater than zero");
        }

        let divisor = Divisor::checked(self.clock_hz, self.baud)
            .with_context(|| format!("Unusable 'baud' {} at {} Hz", self.baud, self.clock_hz))?;

        if !SUPPORTED_BAUD_RATES.contains(&self.baud) {
            tracing::warn!(
                baud = self.baud,
                mantissa = divisor.mantissa,
                fraction = divisor.fraction,
                "baud rate outside the documented 300..=460800 range"
            );
        }

        Ok(())
    }

    /// Divisor the driver will program for this board.
    pub fn divisor(&self) -> Result<Divisor> {
        Ok(Divisor::checked(self.clock_hz, self.baud)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BoardConfig::from_yaml_str("name: \"bench\"\n").unwrap();
        assert_eq!(config.name, "bench");
        assert_eq!(config.clock_hz, 8_000_000);
        assert_eq!(config.baud, 115_200);
        assert_eq!(config.usart, UsartModelConfig::default());
        assert!(config.usart.echo_stdout);
    }

    #[test]
    fn test_invalid_version() {
        let err = BoardConfig::from_yaml_str("schema_version: \"2.0\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("Unsupported schema_version"));
    }

    #[test]
    fn test_zero_clock() {
        let err = BoardConfig::from_yaml_str("clock_hz: 0\n").unwrap_err();
        assert!(format!("{:#}", err).contains("clock_hz"));
    }

    #[test]
    fn test_baud_too_high_for_clock() {
        let err = BoardConfig::from_yaml_str("baud: 1000000\n").unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("Unusable 'baud' 1000000"), "{}", msg);
        assert!(msg.contains("mantissa is zero"), "{}", msg);
    }

    #[test]
    fn test_out_of_range_baud_with_valid_divisor_is_accepted() {
        let config = BoardConfig::from_yaml_str("baud: 500000\n").unwrap();
        let divisor = config.divisor().unwrap();
        assert_eq!((divisor.mantissa, divisor.fraction), (1, 0));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(BoardConfig::from_yaml_str("bogus: 1\n").is_err());
    }
}
