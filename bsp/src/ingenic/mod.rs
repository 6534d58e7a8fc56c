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

//! Ingenic CGU layouts and the clocks the SoC tables share.

use blue_cgu::{ClockError, ClockId, ClockInfo, CustomClock, DivInfo, GateInfo, RegBit, RegisterIo};
use core::marker::PhantomData;
use tock_registers::{
    interfaces::{ReadWriteable, Readable, Writeable},
    register_bitfields, RegisterLongName,
};

/// Builds a parent slot array. `_` marks a slot the mux cannot select.
macro_rules! parents {
    (@slot _) => { None };
    (@slot $p:ident) => { Some($p) };
    ($a:tt) => { [parents!(@slot $a), None, None, None] };
    ($a:tt, $b:tt) => { [parents!(@slot $a), parents!(@slot $b), None, None] };
    ($a:tt, $b:tt, $c:tt) => {
        [parents!(@slot $a), parents!(@slot $b), parents!(@slot $c), None]
    };
    ($a:tt, $b:tt, $c:tt, $d:tt) => {
        [parents!(@slot $a), parents!(@slot $b), parents!(@slot $c), parents!(@slot $d)]
    };
}

#[cfg(feature = "jz4775")]
pub mod jz4775;
#[cfg(feature = "x1830")]
pub mod x1830;
#[cfg(feature = "x2000")]
pub mod x2000;

pub const CPCCR: usize = 0x00;
pub const LCR: usize = 0x04;
pub const CPPCR: usize = 0x0c;
pub const CLKGR0: usize = 0x20;
pub const OPCR: usize = 0x24;
pub const CLKGR1: usize = 0x28;
pub const DDRCDR: usize = 0x2c;
pub const USBPCR: usize = 0x3c;
pub const USBPCR1: usize = 0x48;
pub const I2SCDR: usize = 0x60;
pub const LPCDR: usize = 0x64;
pub const MSC0CDR: usize = 0x68;
pub const MSC1CDR: usize = 0xa4;

/// Low power mode request, set while the system sleeps.
pub const LOW_POWER: RegBit = RegBit::new(LCR, 0);

/// Every Ingenic PLL below encodes OD as log2(OD); tables differ in range
/// and in whether OD=1 is legal.
pub const OD_POW2: [(usize, u8); 7] = [(1, 0), (2, 1), (4, 2), (8, 3), (16, 4), (32, 5), (64, 6)];

/// Divider with change enable, busy and stop bits at `ce`, `ce - 1` and
/// `ce - 2`, the layout of every Ingenic *CDR register.
pub const fn cdr_div(reg: usize, scale: u32, bits: u8, ce: u8) -> DivInfo {
    DivInfo::new(reg, 0, scale, bits)
        .change_enable(ce)
        .busy(ce - 1)
        .stop(ce - 2)
}

pub const fn gate(name: &'static str, parent: ClockId, reg: usize, bit: u8) -> ClockInfo {
    ClockInfo::gate(name, parent, GateInfo::new(reg, bit))
}

register_bitfields! {u32,
    pub OPCR_REG [
        /// Gates the USB PHY input clock
        GATE_USBPHYCLK OFFSET(23) NUMBITS(1) [],
        /// OTG PHY suspend, active low
        SPENDN0 OFFSET(7) NUMBITS(1) [],
        /// UHC PHY suspend, active low
        SPENDN1 OFFSET(6) NUMBITS(1) []
    ],

    pub USBPCR_REG [
        /// Powers down the PHY analog blocks
        SIDDQ OFFSET(21) NUMBITS(1) [],
        OTG_DISABLE OFFSET(20) NUMBITS(1) []
    ],

    pub USBPCR1_REG [
        /// PHY reference clock frequency
        REFCLKDIV OFFSET(24) NUMBITS(2) [
            Mhz12 = 0,
            Mhz24 = 1,
            Mhz48 = 2,
            Mhz19_2 = 3
        ],
        /// UHC PHY power down, active low
        PDBAR OFFSET(17) NUMBITS(1) [],
        XP OFFSET(12) NUMBITS(2) [],
        SM OFFSET(6) NUMBITS(3) []
    ],

    pub I2SCDR_REG [
        I2PCS OFFSET(30) NUMBITS(2) [],
        CE_I2S OFFSET(29) NUMBITS(1) [],
        I2SDIV_M OFFSET(20) NUMBITS(9) [],
        I2SDIV_N OFFSET(0) NUMBITS(20) []
    ]
}

/// A CGU register reached through [`RegisterIo`], typed by its layout.
pub struct CguRegister<'a, N: RegisterLongName> {
    regs: &'a dyn RegisterIo,
    offset: usize,
    _layout: PhantomData<N>,
}

pub fn reg<N: RegisterLongName>(regs: &dyn RegisterIo, offset: usize) -> CguRegister<'_, N> {
    CguRegister {
        regs,
        offset,
        _layout: PhantomData,
    }
}

impl<N: RegisterLongName> Readable for CguRegister<'_, N> {
    type T = u32;
    type R = N;

    #[inline]
    fn get(&self) -> u32 {
        self.regs.read32(self.offset)
    }
}

impl<N: RegisterLongName> Writeable for CguRegister<'_, N> {
    type T = u32;
    type R = N;

    #[inline]
    fn set(&self, value: u32) {
        self.regs.write32(self.offset, value)
    }
}

/// OTG PHY power sequencing. Newer parts also gate the PHY input clock in
/// OPCR; parts with a USBPCR keep the analog blocks powered down there.
pub struct OtgPhy {
    pub gates_phy_clock: bool,
    pub has_usbpcr: bool,
}

impl OtgPhy {
    pub fn power_on(&self, regs: &dyn RegisterIo) {
        let mut opcr = OPCR_REG::SPENDN0::SET;
        if self.gates_phy_clock {
            opcr += OPCR_REG::GATE_USBPHYCLK::CLEAR;
        }
        reg::<OPCR_REG::Register>(regs, OPCR).modify(opcr);
        if self.has_usbpcr {
            reg::<USBPCR_REG::Register>(regs, USBPCR)
                .modify(USBPCR_REG::OTG_DISABLE::CLEAR + USBPCR_REG::SIDDQ::CLEAR);
        }
    }

    pub fn power_off(&self, regs: &dyn RegisterIo) {
        let mut opcr = OPCR_REG::SPENDN0::CLEAR;
        if self.gates_phy_clock {
            opcr += OPCR_REG::GATE_USBPHYCLK::SET;
        }
        reg::<OPCR_REG::Register>(regs, OPCR).modify(opcr);
        if self.has_usbpcr {
            reg::<USBPCR_REG::Register>(regs, USBPCR)
                .modify(USBPCR_REG::OTG_DISABLE::SET + USBPCR_REG::SIDDQ::SET);
        }
    }

    pub fn is_powered(&self, regs: &dyn RegisterIo) -> bool {
        if !reg::<OPCR_REG::Register>(regs, OPCR).is_set(OPCR_REG::SPENDN0) {
            return false;
        }
        if !self.has_usbpcr {
            return true;
        }
        let usbpcr = reg::<USBPCR_REG::Register>(regs, USBPCR);
        !usbpcr.is_set(USBPCR_REG::SIDDQ) && !usbpcr.is_set(USBPCR_REG::OTG_DISABLE)
    }
}

impl CustomClock for OtgPhy {
    fn enable(&self, regs: &dyn RegisterIo) -> Result<(), ClockError> {
        self.power_on(regs);
        Ok(())
    }

    fn disable(&self, regs: &dyn RegisterIo) -> Result<(), ClockError> {
        self.power_off(regs);
        Ok(())
    }

    fn is_enabled(&self, regs: &dyn RegisterIo) -> bool {
        self.is_powered(regs)
    }
}

const I2S_M_MAX: u64 = (1 << 9) - 1;
const I2S_N_MAX: u64 = (1 << 20) - 1;

/// M/N for the I2S fractional divider, rate = parent * M / N.
///
/// M is 1..=511, N is 2*M..=1048575. Whole ratios use M = 1; otherwise the
/// smallest remainder wins, preferring the larger M on ties.
pub fn i2s_calc_m_n(rate: u64, parent_rate: u64) -> Result<(u32, u32), ClockError> {
    if rate == 0 || parent_rate == 0 {
        return Err(ClockError::InvalidRate(rate));
    }
    let ratio = parent_rate / rate;
    if parent_rate % rate == 0 && (2..=I2S_N_MAX).contains(&ratio) {
        return Ok((1, ratio as u32));
    }

    let mut best: Option<(u64, u64, u64)> = None;
    for m in (1..=I2S_M_MAX).rev() {
        let scaled = parent_rate * m;
        let (n, delta) = (scaled / rate, scaled % rate);
        if n < 2 * m || n > I2S_N_MAX {
            continue;
        }
        if best.map_or(true, |(d, _, _)| delta < d) {
            best = Some((delta, m, n));
        }
        if delta == 0 {
            break;
        }
    }
    best.map(|(_, m, n)| (m as u32, n as u32))
        .ok_or(ClockError::InvalidRate(rate))
}

pub fn i2s_rate(parent_rate: u64, m: u32, n: u32) -> u64 {
    if n == 0 {
        return 0;
    }
    parent_rate * u64::from(m) / u64::from(n)
}
