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

//! JZ4775 clock table.
//!
//! A single gate register (CLKGR) and two PLLs whose bypass bits live in
//! their own control registers.

use super::{
    cdr_div, gate, reg, CguRegister, OtgPhy, USBPCR1_REG, CLKGR0, CPCCR, DDRCDR, I2SCDR,
    LOW_POWER, LPCDR, MSC0CDR, MSC1CDR, OPCR, USBPCR1,
};
use blue_cgu::{
    clock::od_table, Cgu, ClockError, ClockInfo, CompositeInfo, ConfigError, CustomClock,
    DivInfo, Field, GateInfo, MuxInfo, PllInfo, RegisterIo, ResumeHook, SocInfo,
};
use embedded_hal::delay::DelayNs;
use tock_registers::interfaces::{ReadWriteable, Readable};

pub const CPAPCR: usize = 0x10;
pub const CPMPCR: usize = 0x14;
pub const VPUCDR: usize = 0x30;
pub const USBCDR: usize = 0x50;
pub const UHCCDR: usize = 0x6c;
pub const SSICDR: usize = 0x74;
pub const CIM0CDR: usize = 0x7c;
pub const CIM1CDR: usize = 0x80;
pub const PCMCDR: usize = 0x84;
pub const MSC2CDR: usize = 0xa8;
pub const BCHCDR: usize = 0xac;

pub mod clk {
    use blue_cgu::ClockId;

    pub const EXCLK: ClockId = 0;
    pub const RTCLK: ClockId = 1;
    pub const APLL: ClockId = 2;
    pub const MPLL: ClockId = 3;
    pub const OTGPHY: ClockId = 4;
    pub const SCLKA: ClockId = 5;
    pub const UHC: ClockId = 6;
    pub const UHCPHY: ClockId = 7;
    pub const CPUMUX: ClockId = 8;
    pub const CPU: ClockId = 9;
    pub const L2CACHE: ClockId = 10;
    pub const AHB0: ClockId = 11;
    pub const AHB2PMUX: ClockId = 12;
    pub const AHB2: ClockId = 13;
    pub const PCLK: ClockId = 14;
    pub const DDR: ClockId = 15;
    pub const VPU: ClockId = 16;
    pub const OTG: ClockId = 17;
    pub const EXCLK_DIV2: ClockId = 18;
    pub const I2S: ClockId = 19;
    pub const LCD: ClockId = 20;
    pub const MSCMUX: ClockId = 21;
    pub const MSC0: ClockId = 22;
    pub const MSC1: ClockId = 23;
    pub const MSC2: ClockId = 24;
    pub const SSIPLL: ClockId = 25;
    pub const SSIMUX: ClockId = 26;
    pub const CIM0: ClockId = 27;
    pub const CIM1: ClockId = 28;
    pub const PCM: ClockId = 29;
    pub const BCH: ClockId = 30;
    pub const EXCLK_DIV512: ClockId = 31;
    pub const RTC: ClockId = 32;
    pub const NEMC: ClockId = 33;
    pub const SSI: ClockId = 34;
    pub const I2C0: ClockId = 35;
    pub const I2C1: ClockId = 36;
    pub const I2C2: ClockId = 37;
    pub const SADC: ClockId = 38;
    pub const UART0: ClockId = 39;
    pub const UART1: ClockId = 40;
    pub const UART2: ClockId = 41;
    pub const UART3: ClockId = 42;
    pub const PDMA: ClockId = 43;
    pub const MAC: ClockId = 44;

    pub const COUNT: usize = 45;
}

use clk::*;

static PLL_OD: [Option<u8>; 8] = od_table(&[(1, 0), (2, 1), (4, 2), (8, 3)]);

const MHZ: u64 = 1_000_000;

fn usbpcr1(regs: &dyn RegisterIo) -> CguRegister<'_, USBPCR1_REG::Register> {
    reg(regs, USBPCR1)
}

/// OTG PHY: power sequencing plus a reference clock selector that only
/// knows four frequencies.
pub struct OtgPhyRefClk {
    phy: OtgPhy,
}

impl CustomClock for OtgPhyRefClk {
    fn enable(&self, regs: &dyn RegisterIo) -> Result<(), ClockError> {
        self.phy.enable(regs)
    }

    fn disable(&self, regs: &dyn RegisterIo) -> Result<(), ClockError> {
        self.phy.disable(regs)
    }

    fn is_enabled(&self, regs: &dyn RegisterIo) -> bool {
        self.phy.is_enabled(regs)
    }

    fn recalc_rate(&self, regs: &dyn RegisterIo, parent_rate: u64) -> u64 {
        use USBPCR1_REG::REFCLKDIV::Value as RefClk;

        match usbpcr1(regs).read_as_enum(USBPCR1_REG::REFCLKDIV) {
            Some(RefClk::Mhz12) => 12 * MHZ,
            Some(RefClk::Mhz24) => 24 * MHZ,
            Some(RefClk::Mhz48) => 48 * MHZ,
            Some(RefClk::Mhz19_2) => 19_200_000,
            None => parent_rate,
        }
    }

    fn round_rate(
        &self,
        _regs: &dyn RegisterIo,
        rate: u64,
        _parent_rate: u64,
    ) -> Result<u64, ClockError> {
        Ok(match rate {
            r if r < 15_600_000 => 12 * MHZ,
            r if r < 21_600_000 => 19_200_000,
            r if r < 36 * MHZ => 24 * MHZ,
            _ => 48 * MHZ,
        })
    }

    fn set_rate(
        &self,
        regs: &dyn RegisterIo,
        rate: u64,
        _parent_rate: u64,
    ) -> Result<(), ClockError> {
        let refclk = match rate {
            12_000_000 => USBPCR1_REG::REFCLKDIV::Mhz12,
            19_200_000 => USBPCR1_REG::REFCLKDIV::Mhz19_2,
            24_000_000 => USBPCR1_REG::REFCLKDIV::Mhz24,
            48_000_000 => USBPCR1_REG::REFCLKDIV::Mhz48,
            _ => return Err(ClockError::InvalidRate(rate)),
        };
        usbpcr1(regs).modify(refclk);
        Ok(())
    }
}

/// UHC PHY power. Enabling also restores the default transmitter tuning.
pub struct UhcPhy;

impl UhcPhy {
    fn tune(regs: &dyn RegisterIo) {
        usbpcr1(regs).modify(USBPCR1_REG::XP.val(1) + USBPCR1_REG::SM.val(1));
    }
}

impl CustomClock for UhcPhy {
    fn enable(&self, regs: &dyn RegisterIo) -> Result<(), ClockError> {
        usbpcr1(regs)
            .modify(USBPCR1_REG::PDBAR::SET + USBPCR1_REG::XP.val(1) + USBPCR1_REG::SM.val(1));
        Ok(())
    }

    fn disable(&self, regs: &dyn RegisterIo) -> Result<(), ClockError> {
        usbpcr1(regs).modify(USBPCR1_REG::PDBAR::CLEAR);
        Ok(())
    }

    fn is_enabled(&self, regs: &dyn RegisterIo) -> bool {
        usbpcr1(regs).is_set(USBPCR1_REG::PDBAR)
    }
}

/// Reapplies the UHC PHY tuning after suspend when the PHY is powered.
pub struct UhcPhyResume;

impl ResumeHook for UhcPhyResume {
    fn resume(&self, regs: &dyn RegisterIo) -> Result<(), ClockError> {
        if UhcPhy.is_enabled(regs) {
            UhcPhy::tune(regs);
        }
        Ok(())
    }
}

static OTG_PHY: OtgPhyRefClk = OtgPhyRefClk {
    phy: OtgPhy {
        gates_phy_clock: false,
        has_usbpcr: true,
    },
};
static UHC_PHY: UhcPhy = UhcPhy;

const fn pll(ctl: usize, bypass: u8, enable: u8, stable: u8) -> PllInfo {
    PllInfo::new(ctl, 1, Field::new(24, 7), 1, Field::new(18, 5), 1)
        .with_od(Field::new(16, 2), &PLL_OD)
        .with_bypass(ctl, bypass)
        .with_enable(enable)
        .with_stable(stable)
}

const fn cdr_clock(
    name: &'static str,
    parents: [Option<usize>; 4],
    mux: MuxInfo,
    div: DivInfo,
    gate_bit: u8,
) -> ClockInfo {
    ClockInfo::composite(
        name,
        parents,
        CompositeInfo::new()
            .mux(mux)
            .div(div)
            .gate(GateInfo::new(CLKGR0, gate_bit)),
    )
}

pub static CLOCKS: [ClockInfo; COUNT] = [
    ClockInfo::external("ext"),
    ClockInfo::external("rtc"),
    ClockInfo::pll("apll", EXCLK, pll(CPAPCR, 9, 8, 10)),
    ClockInfo::pll("mpll", EXCLK, pll(CPMPCR, 6, 7, 0)),
    ClockInfo::custom("otg_phy", parents!(EXCLK), &OTG_PHY),
    ClockInfo::mux("sclk_a", parents!(_, APLL, EXCLK, RTCLK), MuxInfo::new(CPCCR, 30, 2)),
    cdr_clock(
        "uhc",
        parents!(SCLKA, MPLL, OTGPHY, _),
        MuxInfo::new(UHCCDR, 30, 2),
        cdr_div(UHCCDR, 1, 8, 29),
        22,
    ),
    ClockInfo::custom("uhc_phy", parents!(UHC), &UHC_PHY),
    ClockInfo::mux("cpu_mux", parents!(_, SCLKA, MPLL, _), MuxInfo::new(CPCCR, 28, 2)),
    ClockInfo::div("cpu", CPUMUX, DivInfo::new(CPCCR, 0, 1, 4).change_enable(22)),
    ClockInfo::div("l2cache", CPUMUX, DivInfo::new(CPCCR, 4, 1, 4).change_enable(22)),
    ClockInfo::composite(
        "ahb0",
        parents!(_, SCLKA, MPLL, _),
        CompositeInfo::new()
            .mux(MuxInfo::new(CPCCR, 26, 2))
            .div(DivInfo::new(CPCCR, 8, 1, 4).change_enable(21)),
    ),
    ClockInfo::mux("ahb2_apb_mux", parents!(_, SCLKA, MPLL, RTCLK), MuxInfo::new(CPCCR, 24, 2)),
    ClockInfo::div("ahb2", AHB2PMUX, DivInfo::new(CPCCR, 12, 1, 4).change_enable(20)),
    ClockInfo::div("pclk", AHB2PMUX, DivInfo::new(CPCCR, 16, 1, 4).change_enable(20)),
    cdr_clock(
        "ddr",
        parents!(_, SCLKA, MPLL, _),
        MuxInfo::new(DDRCDR, 30, 2),
        cdr_div(DDRCDR, 1, 4, 29),
        31,
    ),
    cdr_clock(
        "vpu",
        parents!(SCLKA, MPLL),
        MuxInfo::new(VPUCDR, 31, 1),
        cdr_div(VPUCDR, 1, 4, 29),
        19,
    ),
    cdr_clock(
        "otg",
        parents!(EXCLK, _, SCLKA, MPLL),
        MuxInfo::new(USBCDR, 30, 2),
        cdr_div(USBCDR, 1, 8, 29),
        2,
    ),
    ClockInfo::fixed_divider("exclk_div2", EXCLK, 2),
    ClockInfo::composite(
        "i2s",
        parents!(EXCLK_DIV2, _, SCLKA, MPLL),
        CompositeInfo::new()
            .mux(MuxInfo::new(I2SCDR, 30, 2))
            .div(cdr_div(I2SCDR, 1, 8, 29)),
    ),
    cdr_clock(
        "lcd",
        parents!(SCLKA, MPLL),
        MuxInfo::new(LPCDR, 31, 1),
        cdr_div(LPCDR, 1, 8, 28),
        25,
    ),
    ClockInfo::mux("msc_mux", parents!(_, SCLKA, MPLL, _), MuxInfo::new(MSC0CDR, 30, 2)),
    ClockInfo::composite(
        "msc0",
        parents!(MSCMUX),
        CompositeInfo::new()
            .div(cdr_div(MSC0CDR, 2, 8, 29))
            .gate(GateInfo::new(CLKGR0, 3)),
    ),
    ClockInfo::composite(
        "msc1",
        parents!(MSCMUX),
        CompositeInfo::new()
            .div(cdr_div(MSC1CDR, 2, 8, 29))
            .gate(GateInfo::new(CLKGR0, 11)),
    ),
    ClockInfo::composite(
        "msc2",
        parents!(MSCMUX),
        CompositeInfo::new()
            .div(cdr_div(MSC2CDR, 2, 8, 29))
            .gate(GateInfo::new(CLKGR0, 12)),
    ),
    ClockInfo::composite(
        "ssi_pll",
        parents!(SCLKA, MPLL),
        CompositeInfo::new()
            .mux(MuxInfo::new(SSICDR, 30, 1))
            .div(cdr_div(SSICDR, 1, 8, 29)),
    ),
    ClockInfo::mux("ssi_mux", parents!(EXCLK, SSIPLL), MuxInfo::new(SSICDR, 31, 1)),
    cdr_clock(
        "cim0",
        parents!(SCLKA, MPLL),
        MuxInfo::new(CIM0CDR, 31, 1),
        cdr_div(CIM0CDR, 1, 8, 30),
        23,
    ),
    cdr_clock(
        "cim1",
        parents!(SCLKA, MPLL),
        MuxInfo::new(CIM1CDR, 31, 1),
        cdr_div(CIM1CDR, 1, 8, 30),
        24,
    ),
    cdr_clock(
        "pcm",
        parents!(EXCLK_DIV2, _, SCLKA, MPLL),
        MuxInfo::new(PCMCDR, 30, 2),
        cdr_div(PCMCDR, 1, 8, 28),
        13,
    ),
    cdr_clock(
        "bch",
        parents!(_, SCLKA, MPLL, _),
        MuxInfo::new(BCHCDR, 30, 2),
        cdr_div(BCHCDR, 1, 4, 29),
        1,
    ),
    ClockInfo::fixed_divider("exclk_div512", EXCLK, 512),
    // No gate bit for the RTC clock on this part.
    ClockInfo::mux("rtc_ercs", parents!(EXCLK_DIV512, RTCLK), MuxInfo::new(OPCR, 2, 1)),
    gate("nemc", AHB2, CLKGR0, 0),
    gate("ssi", SSIMUX, CLKGR0, 4),
    gate("i2c0", PCLK, CLKGR0, 5),
    gate("i2c1", PCLK, CLKGR0, 6),
    gate("i2c2", PCLK, CLKGR0, 7),
    gate("sadc", EXCLK, CLKGR0, 14),
    gate("uart0", EXCLK, CLKGR0, 15),
    gate("uart1", EXCLK, CLKGR0, 16),
    gate("uart2", EXCLK, CLKGR0, 17),
    gate("uart3", EXCLK, CLKGR0, 18),
    gate("pdma", EXCLK, CLKGR0, 20),
    gate("mac", AHB2, CLKGR0, 21),
];

pub static SOC: SocInfo<'static> = SocInfo {
    name: "jz4775",
    clocks: &CLOCKS,
    low_power: Some(LOW_POWER),
};

/// Brings up the JZ4775 CGU with the board's oscillator rates.
pub fn cgu<R: RegisterIo, D: DelayNs + Send>(regs: R, delay: D) -> Result<Cgu<R, D>, ConfigError> {
    Cgu::new(&SOC, regs, delay, crate::config::default_config())
}
