// Copyright (c) 2025 vivo Mobile Communication Co., Ltd.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Register access for the CGU block.

use alloc::sync::Arc;
use core::ptr;

/// 32-bit register window, addressed by byte offset from the block base.
///
/// Each call must be atomic with respect to the bus. Read-modify-write
/// sequences are serialized by the [`Cgu`](crate::Cgu) lock, not here.
pub trait RegisterIo: Send + Sync {
    fn read32(&self, offset: usize) -> u32;

    fn write32(&self, offset: usize, value: u32);

    /// Clears `clear`, then sets `set`, and returns the written value.
    fn modify32(&self, offset: usize, clear: u32, set: u32) -> u32 {
        let value = (self.read32(offset) & !clear) | set;
        self.write32(offset, value);
        value
    }
}

impl<T: RegisterIo + ?Sized> RegisterIo for &T {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value)
    }
}

impl<T: RegisterIo + ?Sized> RegisterIo for Arc<T> {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value)
    }
}

/// Memory mapped register block.
#[derive(Debug, Clone, Copy)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Create a new [`Mmio`] window at `base`.
    ///
    /// ## Safety
    ///
    /// - `base` must be the 4-byte aligned address of a device register block.
    /// - Every offset used through this window must stay inside the block for
    ///   the program duration.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    pub const fn base(&self) -> usize {
        self.base
    }
}

impl RegisterIo for Mmio {
    fn read32(&self, offset: usize) -> u32 {
        // SAFETY: the address lies in the register block promised by the
        // caller of `Mmio::new`.
        unsafe { ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn write32(&self, offset: usize, value: u32) {
        // SAFETY: see `read32`.
        unsafe { ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}

/// A bit field inside a 32-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub shift: u8,
    pub bits: u8,
}

impl Field {
    pub const fn new(shift: u8, bits: u8) -> Self {
        Self { shift, bits }
    }

    /// The field fits inside a 32-bit register.
    pub const fn is_valid(&self) -> bool {
        self.bits > 0 && self.shift as u32 + self.bits as u32 <= 32
    }

    /// Largest value the field can hold.
    pub const fn max(&self) -> u32 {
        if self.bits >= 32 {
            u32::MAX
        } else {
            (1 << self.bits) - 1
        }
    }

    pub const fn mask(&self) -> u32 {
        self.max() << self.shift
    }

    pub const fn get(&self, reg: u32) -> u32 {
        (reg >> self.shift) & self.max()
    }

    pub const fn set(&self, reg: u32, value: u32) -> u32 {
        (reg & !self.mask()) | ((value & self.max()) << self.shift)
    }
}

/// A single bit in a register, given by register offset and bit index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegBit {
    pub reg: usize,
    pub bit: u8,
}

impl RegBit {
    pub const fn new(reg: usize, bit: u8) -> Self {
        Self { reg, bit }
    }

    pub const fn is_valid(&self) -> bool {
        self.bit < 32
    }

    pub const fn mask(&self) -> u32 {
        1 << self.bit
    }

    pub fn is_set(&self, regs: &dyn RegisterIo) -> bool {
        regs.read32(self.reg) & self.mask() != 0
    }

    pub fn write(&self, regs: &dyn RegisterIo, on: bool) {
        if on {
            regs.modify32(self.reg, 0, self.mask());
        } else {
            regs.modify32(self.reg, self.mask(), 0);
        }
    }
}
