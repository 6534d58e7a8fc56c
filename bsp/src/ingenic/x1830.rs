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

//! X1830 clock table.

use super::{
    cdr_div, gate, i2s_calc_m_n, i2s_rate, reg, CguRegister, OtgPhy, CLKGR0, CLKGR1, CPCCR,
    CPPCR, DDRCDR, I2SCDR, I2SCDR_REG, LOW_POWER, LPCDR, MSC0CDR, MSC1CDR, OD_POW2, OPCR,
};
use blue_cgu::{
    clock::od_table, Cgu, ClockError, ClockInfo, CompositeInfo, ConfigError, CustomClock,
    DivInfo, Field, GateInfo, MuxInfo, PllInfo, RegisterIo, SocInfo,
};
use embedded_hal::delay::DelayNs;
use log::debug;
use tock_registers::interfaces::{ReadWriteable, Readable};

pub const CPAPCR: usize = 0x10;
pub const CPMPCR: usize = 0x14;
pub const MACCDR: usize = 0x54;
pub const CPEPCR: usize = 0x58;
pub const SSICDR: usize = 0x74;
pub const CIMCDR: usize = 0x7c;
pub const CPVPCR: usize = 0xe0;

pub mod clk {
    use blue_cgu::ClockId;

    pub const EXCLK: ClockId = 0;
    pub const RTCLK: ClockId = 1;
    pub const APLL: ClockId = 2;
    pub const MPLL: ClockId = 3;
    pub const EPLL: ClockId = 4;
    pub const VPLL: ClockId = 5;
    pub const OTGPHY: ClockId = 6;
    pub const I2S: ClockId = 7;
    pub const SCLKA: ClockId = 8;
    pub const CPUMUX: ClockId = 9;
    pub const CPU: ClockId = 10;
    pub const L2CACHE: ClockId = 11;
    pub const AHB0: ClockId = 12;
    pub const AHB2PMUX: ClockId = 13;
    pub const AHB2: ClockId = 14;
    pub const PCLK: ClockId = 15;
    pub const DDR: ClockId = 16;
    pub const MACPHY: ClockId = 17;
    pub const LCD: ClockId = 18;
    pub const MSCMUX: ClockId = 19;
    pub const MSC0: ClockId = 20;
    pub const MSC1: ClockId = 21;
    pub const SSIPLL: ClockId = 22;
    pub const SSIPLL_DIV2: ClockId = 23;
    pub const SSIMUX: ClockId = 24;
    pub const CIM: ClockId = 25;
    pub const EXCLK_DIV512: ClockId = 26;
    pub const RTC: ClockId = 27;
    pub const EMC: ClockId = 28;
    pub const EFUSE: ClockId = 29;
    pub const OTG: ClockId = 30;
    pub const SSI0: ClockId = 31;
    pub const SMB0: ClockId = 32;
    pub const SMB1: ClockId = 33;
    pub const SMB2: ClockId = 34;
    pub const AIC: ClockId = 35;
    pub const DMIC: ClockId = 36;
    pub const UART0: ClockId = 37;
    pub const UART1: ClockId = 38;
    pub const SSI1: ClockId = 39;
    pub const SFC: ClockId = 40;
    pub const PDMA: ClockId = 41;
    pub const TCU: ClockId = 42;
    pub const DTRNG: ClockId = 43;
    pub const MAC: ClockId = 44;
    pub const OST: ClockId = 45;

    pub const COUNT: usize = 46;
}

use clk::*;

static PLL_OD: [Option<u8>; 64] = od_table(&OD_POW2);

/// The I2S clock: a 2-bit parent select, a fractional M/N divider and a
/// change enable bit that doubles as the clock enable, all in I2SCDR.
pub struct I2s;

impl I2s {
    fn cdr(regs: &dyn RegisterIo) -> CguRegister<'_, I2SCDR_REG::Register> {
        reg(regs, I2SCDR)
    }
}

impl CustomClock for I2s {
    fn enable(&self, regs: &dyn RegisterIo) -> Result<(), ClockError> {
        Self::cdr(regs).modify(I2SCDR_REG::CE_I2S::SET);
        Ok(())
    }

    fn disable(&self, regs: &dyn RegisterIo) -> Result<(), ClockError> {
        Self::cdr(regs).modify(I2SCDR_REG::CE_I2S::CLEAR);
        Ok(())
    }

    fn is_enabled(&self, regs: &dyn RegisterIo) -> bool {
        Self::cdr(regs).is_set(I2SCDR_REG::CE_I2S)
    }

    fn recalc_rate(&self, regs: &dyn RegisterIo, parent_rate: u64) -> u64 {
        let cdr = Self::cdr(regs);
        i2s_rate(
            parent_rate,
            cdr.read(I2SCDR_REG::I2SDIV_M),
            cdr.read(I2SCDR_REG::I2SDIV_N),
        )
    }

    fn round_rate(
        &self,
        _regs: &dyn RegisterIo,
        rate: u64,
        parent_rate: u64,
    ) -> Result<u64, ClockError> {
        let (m, n) = i2s_calc_m_n(rate, parent_rate)?;
        Ok(i2s_rate(parent_rate, m, n))
    }

    fn set_rate(
        &self,
        regs: &dyn RegisterIo,
        rate: u64,
        parent_rate: u64,
    ) -> Result<(), ClockError> {
        if parent_rate < rate.saturating_mul(2) {
            return Err(ClockError::InvalidRate(rate));
        }
        let (m, n) = i2s_calc_m_n(rate, parent_rate)?;
        debug!("i2s: M={} N={}", m, n);
        Self::cdr(regs).modify(I2SCDR_REG::I2SDIV_M.val(m) + I2SCDR_REG::I2SDIV_N.val(n));
        Ok(())
    }

    fn parent(&self, regs: &dyn RegisterIo) -> usize {
        Self::cdr(regs).read(I2SCDR_REG::I2PCS) as usize
    }

    fn set_parent(&self, regs: &dyn RegisterIo, slot: usize) -> Result<(), ClockError> {
        let slot = u32::try_from(slot).map_err(|_| ClockError::InvalidParent)?;
        if slot > 3 {
            return Err(ClockError::InvalidParent);
        }
        Self::cdr(regs).modify(I2SCDR_REG::I2PCS.val(slot));
        Ok(())
    }

    fn has_mux(&self) -> bool {
        true
    }
}

static OTG_PHY: OtgPhy = OtgPhy {
    gates_phy_clock: true,
    has_usbpcr: true,
};
static I2S_CLK: I2s = I2s;

const fn pll(ctl: usize, bypass_bit: u8) -> PllInfo {
    PllInfo::new(ctl, 2, Field::new(20, 9), 1, Field::new(14, 6), 1)
        .with_od(Field::new(11, 3), &PLL_OD)
        .with_bypass(CPPCR, bypass_bit)
        .with_enable(0)
        .with_stable(3)
}

pub static CLOCKS: [ClockInfo; COUNT] = [
    ClockInfo::external("ext"),
    ClockInfo::external("rtc"),
    ClockInfo::pll("apll", EXCLK, pll(CPAPCR, 30)),
    ClockInfo::pll("mpll", EXCLK, pll(CPMPCR, 28)),
    ClockInfo::pll("epll", EXCLK, pll(CPEPCR, 24)),
    ClockInfo::pll("vpll", EXCLK, pll(CPVPCR, 26)),
    ClockInfo::custom("otg_phy", parents!(EXCLK), &OTG_PHY),
    ClockInfo::custom("i2s", parents!(SCLKA, MPLL, VPLL, EPLL), &I2S_CLK),
    ClockInfo::mux("sclk_a", parents!(_, EXCLK, APLL, _), MuxInfo::new(CPCCR, 30, 2)),
    ClockInfo::mux("cpu_mux", parents!(_, SCLKA, MPLL, _), MuxInfo::new(CPCCR, 28, 2)),
    ClockInfo::composite(
        "cpu",
        parents!(CPUMUX),
        CompositeInfo::new()
            .div(DivInfo::new(CPCCR, 0, 1, 4).change_enable(22))
            .gate(GateInfo::new(CLKGR1, 15)),
    ),
    ClockInfo::div("l2cache", CPUMUX, DivInfo::new(CPCCR, 4, 1, 4).change_enable(22)),
    ClockInfo::composite(
        "ahb0",
        parents!(_, SCLKA, MPLL, _),
        CompositeInfo::new()
            .mux(MuxInfo::new(CPCCR, 26, 2))
            .div(DivInfo::new(CPCCR, 8, 1, 4).change_enable(21)),
    ),
    ClockInfo::mux("ahb2_apb_mux", parents!(_, SCLKA, MPLL, _), MuxInfo::new(CPCCR, 24, 2)),
    ClockInfo::div("ahb2", AHB2PMUX, DivInfo::new(CPCCR, 12, 1, 4).change_enable(20)),
    ClockInfo::composite(
        "pclk",
        parents!(AHB2PMUX),
        CompositeInfo::new()
            .div(DivInfo::new(CPCCR, 16, 1, 4).change_enable(20))
            .gate(GateInfo::new(CLKGR1, 14)),
    ),
    ClockInfo::composite(
        "ddr",
        parents!(_, SCLKA, MPLL, _),
        CompositeInfo::new()
            .mux(MuxInfo::new(DDRCDR, 30, 2))
            .div(cdr_div(DDRCDR, 1, 4, 29))
            .gate(GateInfo::new(CLKGR0, 31)),
    ),
    ClockInfo::composite(
        "mac_phy",
        parents!(SCLKA, MPLL, VPLL, EPLL),
        CompositeInfo::new()
            .mux(MuxInfo::new(MACCDR, 30, 2))
            .div(cdr_div(MACCDR, 1, 8, 29)),
    ),
    ClockInfo::composite(
        "lcd",
        parents!(SCLKA, MPLL, VPLL, EPLL),
        CompositeInfo::new()
            .mux(MuxInfo::new(LPCDR, 30, 2))
            .div(cdr_div(LPCDR, 1, 8, 28))
            .gate(GateInfo::new(CLKGR1, 9)),
    ),
    ClockInfo::mux("msc_mux", parents!(SCLKA, MPLL, VPLL, EPLL), MuxInfo::new(MSC0CDR, 30, 2)),
    ClockInfo::composite(
        "msc0",
        parents!(MSCMUX),
        CompositeInfo::new()
            .div(cdr_div(MSC0CDR, 2, 8, 29))
            .gate(GateInfo::new(CLKGR0, 4)),
    ),
    ClockInfo::composite(
        "msc1",
        parents!(MSCMUX),
        CompositeInfo::new()
            .div(cdr_div(MSC1CDR, 2, 8, 29))
            .gate(GateInfo::new(CLKGR0, 5)),
    ),
    ClockInfo::composite(
        "ssi_pll",
        parents!(SCLKA, MPLL, VPLL, EPLL),
        CompositeInfo::new()
            .mux(MuxInfo::new(SSICDR, 30, 2))
            .div(cdr_div(SSICDR, 1, 8, 28)),
    ),
    ClockInfo::fixed_divider("ssi_pll_div2", SSIPLL, 2),
    ClockInfo::mux("ssi_mux", parents!(EXCLK, SSIPLL_DIV2), MuxInfo::new(SSICDR, 29, 1)),
    ClockInfo::composite(
        "cim",
        parents!(SCLKA, MPLL, VPLL, EPLL),
        CompositeInfo::new()
            .mux(MuxInfo::new(CIMCDR, 30, 2))
            .div(cdr_div(CIMCDR, 1, 8, 29)),
    ),
    ClockInfo::fixed_divider("exclk_div512", EXCLK, 512),
    ClockInfo::composite(
        "rtc_ercs",
        parents!(EXCLK_DIV512, RTCLK),
        CompositeInfo::new()
            .mux(MuxInfo::new(OPCR, 2, 1))
            .gate(GateInfo::new(CLKGR0, 29)),
    ),
    gate("emc", AHB2, CLKGR0, 0),
    gate("efuse", AHB2, CLKGR0, 1),
    gate("otg", EXCLK, CLKGR0, 3),
    gate("ssi0", SSIMUX, CLKGR0, 6),
    gate("smb0", PCLK, CLKGR0, 7),
    gate("smb1", PCLK, CLKGR0, 8),
    gate("smb2", PCLK, CLKGR0, 9),
    gate("aic", EXCLK, CLKGR0, 11),
    gate("dmic", PCLK, CLKGR0, 12),
    gate("uart0", EXCLK, CLKGR0, 14),
    gate("uart1", EXCLK, CLKGR0, 15),
    gate("ssi1", SSIMUX, CLKGR0, 19),
    gate("sfc", SSIPLL, CLKGR0, 20),
    gate("pdma", EXCLK, CLKGR0, 21),
    gate("tcu", EXCLK, CLKGR0, 30),
    gate("dtrng", PCLK, CLKGR1, 1),
    gate("mac", AHB2, CLKGR1, 4),
    gate("ost", EXCLK, CLKGR1, 11),
];

pub static SOC: SocInfo<'static> = SocInfo {
    name: "x1830",
    clocks: &CLOCKS,
    low_power: Some(LOW_POWER),
};

/// Brings up the X1830 CGU with the board's oscillator rates.
pub fn cgu<R: RegisterIo, D: DelayNs + Send>(regs: R, delay: D) -> Result<Cgu<R, D>, ConfigError> {
    Cgu::new(&SOC, regs, delay, crate::config::default_config())
}
