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

//! Divider engine.

use crate::{
    error::ClockError,
    poll::{poll_until, PollTimeout},
    regs::{Field, RegisterIo},
};
use embedded_hal::delay::DelayNs;

/// Integer divider. Without a table the divide ratio is
/// `(field + 1) * scale`; with one it is `table[field]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivInfo {
    pub reg: usize,
    pub field: Field,
    pub scale: u32,
    pub change_enable: Option<u8>,
    pub busy: Option<u8>,
    pub stop: Option<u8>,
    /// Parent slots for which the hardware bypasses the divider.
    pub bypass_mask: u8,
    pub table: Option<&'static [u32]>,
}

impl DivInfo {
    pub const fn new(reg: usize, shift: u8, scale: u32, bits: u8) -> Self {
        Self {
            reg,
            field: Field::new(shift, bits),
            scale,
            change_enable: None,
            busy: None,
            stop: None,
            bypass_mask: 0,
            table: None,
        }
    }

    pub const fn change_enable(mut self, bit: u8) -> Self {
        self.change_enable = Some(bit);
        self
    }

    pub const fn busy(mut self, bit: u8) -> Self {
        self.busy = Some(bit);
        self
    }

    pub const fn stop(mut self, bit: u8) -> Self {
        self.stop = Some(bit);
        self
    }

    pub const fn bypass_mask(mut self, mask: u8) -> Self {
        self.bypass_mask = mask;
        self
    }

    pub const fn table(mut self, table: &'static [u32]) -> Self {
        self.table = Some(table);
        self
    }

    pub fn is_bypassed(&self, parent_slot: usize) -> bool {
        parent_slot < 8 && self.bypass_mask & (1 << parent_slot) != 0
    }

    /// Divide ratio held in `ctl`, `None` when the field has no table entry.
    pub fn divider(&self, ctl: u32, parent_slot: usize) -> Option<u64> {
        if self.is_bypassed(parent_slot) {
            return Some(1);
        }
        let hw = self.field.get(ctl);
        match self.table {
            Some(table) => table.get(hw as usize).map(|d| u64::from(*d)),
            None => Some((u64::from(hw) + 1) * u64::from(self.scale)),
        }
    }

    pub fn recalc_rate(&self, regs: &dyn RegisterIo, parent_rate: u64, parent_slot: usize) -> u64 {
        match self.divider(regs.read32(self.reg), parent_slot) {
            Some(div) if div > 0 => parent_rate / div,
            _ => 0,
        }
    }

    /// Largest ratio the field can express.
    pub fn max_divider(&self) -> u64 {
        match self.table {
            Some(table) => table.iter().copied().max().map_or(0, u64::from),
            None => u64::from(self.scale) << self.field.bits,
        }
    }

    /// Field value and ratio for `rate`, never faster than requested.
    ///
    /// Ratios beyond the field are rejected rather than clamped.
    pub fn calc(&self, parent_rate: u64, rate: u64) -> Result<(u32, u64), ClockError> {
        if rate == 0 || parent_rate == 0 {
            return Err(ClockError::InvalidRate(rate));
        }
        let wanted = parent_rate.div_ceil(rate).max(1);
        if let Some(table) = self.table {
            return table
                .iter()
                .enumerate()
                .filter(|(hw, d)| **d > 0 && u64::from(**d) >= wanted && *hw as u32 <= self.field.max())
                .min_by_key(|(_, d)| **d)
                .map(|(hw, d)| (hw as u32, u64::from(*d)))
                .ok_or(ClockError::UnsupportedDivider);
        }
        let scale = u64::from(self.scale);
        if wanted > self.max_divider() {
            return Err(ClockError::UnsupportedDivider);
        }
        let div = wanted.max(scale).div_ceil(scale) * scale;
        Ok(((div / scale - 1) as u32, div))
    }

    /// Commits field value `hw`: stop, write with change enable, restart,
    /// then wait for the busy flag to drop.
    pub(crate) fn program<D: DelayNs + ?Sized>(
        &self,
        regs: &dyn RegisterIo,
        hw: u32,
        delay: &mut D,
        timeout: PollTimeout,
    ) -> Result<(), ClockError> {
        let mut ctl = regs.read32(self.reg);
        if let Some(stop) = self.stop {
            ctl |= 1 << stop;
            regs.write32(self.reg, ctl);
        }
        ctl = self.field.set(ctl, hw);
        if let Some(ce) = self.change_enable {
            ctl |= 1 << ce;
        }
        regs.write32(self.reg, ctl);
        if let Some(stop) = self.stop {
            ctl &= !(1 << stop);
            regs.write32(self.reg, ctl);
        }
        let Some(busy) = self.busy else {
            return Ok(());
        };
        if poll_until(delay, timeout, || regs.read32(self.reg) & (1 << busy) == 0) {
            Ok(())
        } else {
            Err(ClockError::DividerBusyTimeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRegisters;

    #[test]
    fn ratio_from_field() {
        let regs = FakeRegisters::new().with(0x68, 0x3);
        let div = DivInfo::new(0x68, 0, 2, 8);
        assert_eq!(div.divider(3, 0), Some(8));
        assert_eq!(div.max_divider(), 512);
        assert_eq!(div.recalc_rate(&regs, 800_000_000, 0), 100_000_000);
    }

    #[test]
    fn calc_rounds_toward_slower_clock() {
        let div = DivInfo::new(0, 0, 1, 4);
        assert_eq!(div.calc(1_000, 150), Ok((6, 7)));
        assert_eq!(div.calc(1_000, 250), Ok((3, 4)));
        assert_eq!(div.calc(1_000, 5_000), Ok((0, 1)));
    }

    #[test]
    fn calc_respects_scale() {
        let div = DivInfo::new(0, 0, 2, 8);
        assert_eq!(div.calc(1_000, 400), Ok((1, 4)));
        assert_eq!(div.calc(1_000, 1_000), Ok((0, 2)));
    }

    #[test]
    fn calc_rejects_ratio_beyond_field() {
        let div = DivInfo::new(0, 0, 1, 8);
        assert_eq!(div.calc(300_000, 1_000), Err(ClockError::UnsupportedDivider));
        assert_eq!(div.calc(256_000, 1_000), Ok((255, 256)));
    }

    #[test]
    fn table_picks_smallest_sufficient_ratio() {
        static TABLE: [u32; 4] = [1, 2, 4, 8];
        let div = DivInfo::new(0, 0, 1, 2).table(&TABLE);
        assert_eq!(div.calc(1_000, 300), Ok((2, 4)));
        assert_eq!(div.calc(1_000, 100), Err(ClockError::UnsupportedDivider));
        assert_eq!(div.divider(3, 0), Some(8));
    }

    #[test]
    fn bypass_by_parent_slot() {
        let div = DivInfo::new(0, 0, 1, 4).bypass_mask(0b10);
        assert_eq!(div.divider(0xf, 1), Some(1));
        assert_eq!(div.divider(0xf, 0), Some(16));
    }
}
