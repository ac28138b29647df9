// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::fmt;

/// A named 32-bit register at an absolute bus address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub name: &'static str,
    pub address: u32,
}

impl Register {
    pub const fn new(name: &'static str, address: u32) -> Self {
        Self { name, address }
    }

    /// Register of the same block at `base + offset`.
    pub const fn at(name: &'static str, base: u32, offset: u32) -> Self {
        Self::new(name, base + offset)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#010x}", self.name, self.address)
    }
}

/// A contiguous bit field inside a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub offset: u8,
    pub width: u8,
}

impl Field {
    pub const fn new(offset: u8, width: u8) -> Self {
        assert!(width > 0 && offset as u32 + width as u32 <= 32);
        Self { offset, width }
    }

    /// Largest value the field can hold.
    pub const fn max(self) -> u32 {
        if self.width == 32 {
            u32::MAX
        } else {
            (1 << self.width) - 1
        }
    }

    /// The field's bits in register position.
    pub const fn mask(self) -> u32 {
        self.max() << self.offset
    }

    pub const fn extract(self, register: u32) -> u32 {
        (register & self.mask()) >> self.offset
    }

    /// Replaces the field in `register` with `value`, truncated to the field width.
    pub const fn insert(self, register: u32, value: u32) -> u32 {
        (register & !self.mask()) | ((value & self.max()) << self.offset)
    }
}

/// Word access to a register set.
///
/// Implementations decide what a register address means: volatile memory on
/// the chip, a peripheral model on the host. Accesses are infallible; a
/// backend that can fault has to absorb it.
pub trait RegisterAccess {
    fn read(&mut self, reg: Register) -> u32;

    fn write(&mut self, reg: Register, value: u32);

    fn read_field(&mut self, reg: Register, field: Field) -> u32 {
        field.extract(self.read(reg))
    }

    /// Read-modify-write of a single field. Bits outside the field are preserved.
    fn write_field(&mut self, reg: Register, field: Field, value: u32) {
        let current = self.read(reg);
        self.write(reg, field.insert(current, value));
    }

    /// OR-in `mask`.
    fn set_bits(&mut self, reg: Register, mask: u32) {
        let current = self.read(reg);
        self.write(reg, current | mask);
    }
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &mut T {
    fn read(&mut self, reg: Register) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Register, value: u32) {
        (**self).write(reg, value)
    }
}
