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

//! PLL engine.
//!
//! rate = parent * rate_multiplier * M / (N * OD), with M and N stored minus
//! a per-field offset and OD stored through a sparse encoding table.

use crate::{
    error::ClockError,
    poll::{poll_until, PollTimeout},
    regs::{Field, RegBit, RegisterIo},
};
use embedded_hal::delay::DelayNs;

/// Reference frequency the default calculator aims for after the N divider.
const PLL_REF_TARGET: u64 = 10_000_000;

/// Custom M/N/OD search, given the PLL, the requested rate and the parent rate.
pub type PllCalcFn = fn(&PllInfo, u64, u64) -> Result<PllFactors, ClockError>;

/// Effective PLL factors, offsets already applied and OD decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PllFactors {
    pub m: u32,
    pub n: u32,
    pub od: u32,
}

impl PllFactors {
    pub const fn new(m: u32, n: u32, od: u32) -> Self {
        Self { m, n, od }
    }
}

/// Builds an OD encoding table: entry `od - 1` holds the field value for
/// divide factor `od`.
pub const fn od_table<const N: usize>(pairs: &[(usize, u8)]) -> [Option<u8>; N] {
    let mut table = [None; N];
    let mut i = 0;
    while i < pairs.len() {
        let (od, encoded) = pairs[i];
        table[od - 1] = Some(encoded);
        i += 1;
    }
    table
}

#[derive(Clone, Copy)]
pub struct PllInfo {
    pub reg: usize,
    pub rate_multiplier: u32,
    pub m: Field,
    pub m_offset: u32,
    pub n: Field,
    pub n_offset: u32,
    pub od: Option<Field>,
    pub od_encoding: &'static [Option<u8>],
    /// Parent selector living in the PLL control register.
    pub mux: Option<Field>,
    pub bypass: Option<RegBit>,
    pub enable_bit: Option<u8>,
    pub stable_bit: Option<u8>,
    pub calc: Option<PllCalcFn>,
}

impl PllInfo {
    pub const fn new(
        reg: usize,
        rate_multiplier: u32,
        m: Field,
        m_offset: u32,
        n: Field,
        n_offset: u32,
    ) -> Self {
        Self {
            reg,
            rate_multiplier,
            m,
            m_offset,
            n,
            n_offset,
            od: None,
            od_encoding: &[],
            mux: None,
            bypass: None,
            enable_bit: None,
            stable_bit: None,
            calc: None,
        }
    }

    pub const fn with_od(mut self, od: Field, encoding: &'static [Option<u8>]) -> Self {
        self.od = Some(od);
        self.od_encoding = encoding;
        self
    }

    pub const fn with_mux(mut self, mux: Field) -> Self {
        self.mux = Some(mux);
        self
    }

    pub const fn with_bypass(mut self, reg: usize, bit: u8) -> Self {
        self.bypass = Some(RegBit::new(reg, bit));
        self
    }

    pub const fn with_enable(mut self, bit: u8) -> Self {
        self.enable_bit = Some(bit);
        self
    }

    pub const fn with_stable(mut self, bit: u8) -> Self {
        self.stable_bit = Some(bit);
        self
    }

    pub const fn with_calc(mut self, calc: PllCalcFn) -> Self {
        self.calc = Some(calc);
        self
    }

    /// Divide factor stored as `encoded` in the OD field.
    pub fn od_decode(&self, encoded: u32) -> Option<u32> {
        self.od_encoding
            .iter()
            .position(|e| e.map(u32::from) == Some(encoded))
            .map(|i| i as u32 + 1)
    }

    /// Field value for divide factor `od`.
    pub fn od_encode(&self, od: u32) -> Option<u32> {
        let index = usize::try_from(od.checked_sub(1)?).ok()?;
        let field = self.od?;
        self.od_encoding
            .get(index)
            .copied()
            .flatten()
            .map(u32::from)
            .filter(|e| *e <= field.max())
    }

    /// Every divide factor with an encoding, ascending.
    pub fn legal_ods(&self) -> impl Iterator<Item = u32> + '_ {
        let single = self.od.is_none().then_some(1);
        let table = self.od.into_iter().flat_map(move |_| {
            (1..=self.od_encoding.len() as u32).filter(move |od| self.od_encode(*od).is_some())
        });
        single.into_iter().chain(table)
    }

    /// Factors held in a PLL control word, or `None` for a reserved OD value.
    pub fn decode(&self, ctl: u32) -> Option<PllFactors> {
        let od = match self.od {
            Some(field) => self.od_decode(field.get(ctl))?,
            None => 1,
        };
        Some(PllFactors {
            m: self.m.get(ctl) + self.m_offset,
            n: self.n.get(ctl) + self.n_offset,
            od,
        })
    }

    /// Writes `factors` into `ctl`, rejecting values the fields cannot hold.
    pub fn encode(&self, ctl: u32, factors: PllFactors) -> Result<u32, ClockError> {
        if factors.m == 0 || factors.n == 0 {
            return Err(ClockError::InvalidFactors);
        }
        let m = factors
            .m
            .checked_sub(self.m_offset)
            .filter(|m| *m <= self.m.max())
            .ok_or(ClockError::InvalidFactors)?;
        let n = factors
            .n
            .checked_sub(self.n_offset)
            .filter(|n| *n <= self.n.max())
            .ok_or(ClockError::InvalidFactors)?;
        let mut ctl = self.n.set(self.m.set(ctl, m), n);
        match self.od {
            Some(field) => {
                let od = self
                    .od_encode(factors.od)
                    .ok_or(ClockError::UnsupportedDivider)?;
                ctl = field.set(ctl, od);
            }
            None if factors.od != 1 => return Err(ClockError::UnsupportedDivider),
            None => {}
        }
        Ok(ctl)
    }

    pub fn rate(&self, parent_rate: u64, factors: PllFactors) -> u64 {
        let div = u64::from(factors.n) * u64::from(factors.od);
        if div == 0 {
            return 0;
        }
        let rate = u128::from(parent_rate)
            * u128::from(self.rate_multiplier)
            * u128::from(factors.m)
            / u128::from(div);
        u64::try_from(rate).unwrap_or(u64::MAX)
    }

    /// Best factors for `rate`, using the table's calculator when it has one.
    pub fn calc(&self, rate: u64, parent_rate: u64) -> Result<PllFactors, ClockError> {
        if rate == 0 || parent_rate == 0 {
            return Err(ClockError::InvalidRate(rate));
        }
        if let Some(calc) = self.calc {
            return calc(self, rate, parent_rate);
        }

        let n_min = u64::from(self.n_offset.max(1));
        let n_max = u64::from(self.n.max()) + u64::from(self.n_offset);
        let m_min = u64::from(self.m_offset.max(1));
        let m_max = u64::from(self.m.max()) + u64::from(self.m_offset);
        let n = (parent_rate / PLL_REF_TARGET).clamp(n_min, n_max);
        let step = parent_rate.saturating_mul(u64::from(self.rate_multiplier)).max(1);

        let mut best: Option<(u64, PllFactors)> = None;
        for od in self.legal_ods() {
            // Saturates on absurd requests; the clamp then pins M at its maximum.
            let m = (rate.saturating_mul(n).saturating_mul(u64::from(od)) / step)
                .clamp(m_min, m_max);
            let factors = PllFactors {
                m: m as u32,
                n: n as u32,
                od,
            };
            let delta = self.rate(parent_rate, factors).abs_diff(rate);
            if best.map_or(true, |(d, _)| delta < d) {
                best = Some((delta, factors));
            }
        }
        best.map(|(_, f)| f).ok_or(ClockError::UnsupportedDivider)
    }

    pub fn is_bypassed(&self, regs: &dyn RegisterIo) -> bool {
        self.bypass.is_some_and(|bit| bit.is_set(regs))
    }

    /// Running according to the enable bit; always true without one.
    pub fn is_enabled(&self, ctl: u32) -> bool {
        self.enable_bit.map_or(true, |bit| ctl & (1 << bit) != 0)
    }

    pub fn recalc_rate(&self, regs: &dyn RegisterIo, parent_rate: u64) -> u64 {
        if self.is_bypassed(regs) {
            return parent_rate;
        }
        match self.decode(regs.read32(self.reg)) {
            Some(factors) => self.rate(parent_rate, factors),
            None => 0,
        }
    }

    pub fn parent_slot(&self, regs: &dyn RegisterIo) -> usize {
        self.mux
            .map_or(0, |mux| mux.get(regs.read32(self.reg)) as usize)
    }

    pub(crate) fn wait_stable<D: DelayNs + ?Sized>(
        &self,
        regs: &dyn RegisterIo,
        delay: &mut D,
        timeout: PollTimeout,
    ) -> Result<(), ClockError> {
        let Some(bit) = self.stable_bit else {
            return Ok(());
        };
        if poll_until(delay, timeout, || regs.read32(self.reg) & (1 << bit) != 0) {
            Ok(())
        } else {
            Err(ClockError::PllNotStable)
        }
    }

    pub(crate) fn set_enabled<D: DelayNs + ?Sized>(
        &self,
        regs: &dyn RegisterIo,
        on: bool,
        delay: &mut D,
        timeout: PollTimeout,
    ) -> Result<(), ClockError> {
        let Some(bit) = self.enable_bit else {
            return Ok(());
        };
        if on {
            regs.modify32(self.reg, 0, 1 << bit);
            self.wait_stable(regs, delay, timeout)
        } else {
            regs.modify32(self.reg, 1 << bit, 0);
            Ok(())
        }
    }
}
