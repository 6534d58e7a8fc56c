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

use crate::regs::{Field, RegisterIo};

/// Parent selector. The field value is the parent slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxInfo {
    pub reg: usize,
    pub field: Field,
}

impl MuxInfo {
    pub const fn new(reg: usize, shift: u8, bits: u8) -> Self {
        Self {
            reg,
            field: Field::new(shift, bits),
        }
    }

    pub fn selected(&self, regs: &dyn RegisterIo) -> usize {
        self.field.get(regs.read32(self.reg)) as usize
    }

    pub(crate) fn select(&self, regs: &dyn RegisterIo, slot: usize) {
        regs.modify32(self.reg, self.field.mask(), self.field.set(0, slot as u32));
    }
}
