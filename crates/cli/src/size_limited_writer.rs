// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::io::{self, Write};

/// Caps how many UART bytes reach the terminal.
///
/// Once `max_bytes` have been written the rest is swallowed and
/// [`SizeLimitedWriter::limit_exceeded`] turns true.
pub struct SizeLimitedWriter<W: Write> {
    inner: W,
    bytes_written: u64,
    max_bytes: Option<u64>,
    limit_exceeded: bool,
}

impl<W: Write> SizeLimitedWriter<W> {
    /// `None` means unlimited.
    pub fn new(inner: W, max_bytes: Option<u64>) -> Self {
        Self {
            inner,
            bytes_written: 0,
            max_bytes,
            limit_exceeded: false,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn limit_exceeded(&self) -> bool {
        self.limit_exceeded
    }
}

impl<W: Write> Write for SizeLimitedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.limit_exceeded {
            return Ok(buf.len());
        }

        let to_write = match self.max_bytes {
            Some(max) => {
                let remaining = max.saturating_sub(self.bytes_written);
                if remaining < buf.len() as u64 {
                    self.limit_exceeded = true;
                }
                buf.len().min(remaining as usize)
            }
            None => buf.len(),
        };

        self.inner.write_all(&buf[..to_write])?;
        self.bytes_written += to_write as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
