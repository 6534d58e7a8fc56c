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

use crate::regs::RegisterIo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePolarity {
    /// Bit set stops the clock.
    SetToGate,
    /// Bit clear stops the clock.
    ClearToGate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateInfo {
    pub reg: usize,
    pub bit: u8,
    pub polarity: GatePolarity,
    /// Settle time after ungating, 0 for none.
    pub delay_us: u32,
}

impl GateInfo {
    pub const fn new(reg: usize, bit: u8) -> Self {
        Self {
            reg,
            bit,
            polarity: GatePolarity::SetToGate,
            delay_us: 0,
        }
    }

    pub const fn clear_to_gate(mut self) -> Self {
        self.polarity = GatePolarity::ClearToGate;
        self
    }

    pub const fn with_delay_us(mut self, delay_us: u32) -> Self {
        self.delay_us = delay_us;
        self
    }

    const fn mask(&self) -> u32 {
        1 << self.bit
    }

    pub fn is_enabled(&self, regs: &dyn RegisterIo) -> bool {
        let set = regs.read32(self.reg) & self.mask() != 0;
        match self.polarity {
            GatePolarity::SetToGate => !set,
            GatePolarity::ClearToGate => set,
        }
    }

    pub(crate) fn set_enabled(&self, regs: &dyn RegisterIo, on: bool) {
        let set_bit = match self.polarity {
            GatePolarity::SetToGate => !on,
            GatePolarity::ClearToGate => on,
        };
        if set_bit {
            regs.modify32(self.reg, 0, self.mask());
        } else {
            regs.modify32(self.reg, self.mask(), 0);
        }
    }
}
