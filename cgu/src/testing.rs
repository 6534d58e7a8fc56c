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

//! Register and delay fakes for exercising the CGU off target.

use crate::regs::RegisterIo;
use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicU64, Ordering};
use embedded_hal::delay::DelayNs;
use spin::Mutex;

/// Hardware behaviour emulated on register writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Bits in `mask` read back set after any write to `reg`, e.g. a PLL
    /// lock flag.
    SetOnWrite { reg: usize, mask: u32 },
    /// Bits in `mask` read back set for `reads` reads after a write to
    /// `reg`, then clear, e.g. a divider busy flag.
    BusyAfterWrite { reg: usize, mask: u32, reads: u32 },
}

#[derive(Default)]
struct State {
    values: BTreeMap<usize, u32>,
    writes: Vec<(usize, u32)>,
    rules: Vec<Rule>,
    busy: BTreeMap<usize, (u32, u32)>,
}

/// Sparse register file. Unwritten registers read as zero.
#[derive(Default)]
pub struct FakeRegisters {
    state: Mutex<State>,
}

impl FakeRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presets `reg` without recording a write.
    pub fn with(self, reg: usize, value: u32) -> Self {
        self.set(reg, value);
        self
    }

    pub fn with_rule(self, rule: Rule) -> Self {
        self.state.lock().rules.push(rule);
        self
    }

    /// Changes `reg` behind the CGU's back, without recording a write.
    pub fn set(&self, reg: usize, value: u32) {
        self.state.lock().values.insert(reg, value);
    }

    /// Current stored value, ignoring busy emulation.
    pub fn get(&self, reg: usize) -> u32 {
        self.state.lock().values.get(&reg).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.state.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }
}

impl RegisterIo for FakeRegisters {
    fn read32(&self, offset: usize) -> u32 {
        let mut state = self.state.lock();
        let value = state.values.get(&offset).copied().unwrap_or(0);
        match state.busy.get_mut(&offset) {
            Some((mask, left)) if *left > 0 => {
                *left -= 1;
                value | *mask
            }
            _ => value,
        }
    }

    fn write32(&self, offset: usize, value: u32) {
        let mut state = self.state.lock();
        state.writes.push((offset, value));
        let mut stored = value;
        let rules = state.rules.clone();
        for rule in rules {
            match rule {
                Rule::SetOnWrite { reg, mask } if reg == offset => stored |= mask,
                Rule::BusyAfterWrite { reg, mask, reads } if reg == offset => {
                    stored &= !mask;
                    state.busy.insert(reg, (mask, reads));
                }
                _ => {}
            }
        }
        state.values.insert(offset, stored);
    }
}

/// Delay that only accounts simulated time. Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct FakeDelay {
    elapsed_ns: Arc<AtomicU64>,
}

impl FakeDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns.load(Ordering::Relaxed) / 1_000
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.fetch_add(u64::from(ns), Ordering::Relaxed);
    }
}
