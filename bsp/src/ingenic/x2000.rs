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

//! X2000 clock table.
//!
//! The four I2S clocks are fractional M/N dividers with a parent select and
//! an enable bit in one register, so they are described as PLLs without an
//! OD stage and a calculator of their own.

use super::{
    cdr_div, gate, i2s_calc_m_n, OtgPhy, CLKGR0, CLKGR1, CPCCR, CPPCR, DDRCDR, LOW_POWER,
    LPCDR, MSC0CDR, MSC1CDR, OPCR,
};
use blue_cgu::{
    clock::od_table, Cgu, ClockError, ClockId, ClockInfo, CompositeInfo, ConfigError, DivInfo,
    Field, GateInfo, MuxInfo, PllFactors, PllInfo, RegisterIo, SocInfo,
};
use embedded_hal::delay::DelayNs;

pub const CPAPCR: usize = 0x10;
pub const CPMPCR: usize = 0x14;
pub const CPEPCR: usize = 0x18;
pub const ISPCDR: usize = 0x30;
pub const MACPTPCDR: usize = 0x4c;
pub const RSACDR: usize = 0x50;
pub const MACCDR: usize = 0x54;
pub const MAC0TXCDR: usize = 0x58;
pub const SSICDR: usize = 0x5c;
pub const I2S0CDR: usize = 0x60;
pub const PWMCDR: usize = 0x6c;
pub const SFCCDR: usize = 0x74;
pub const CIMCDR: usize = 0x78;
pub const I2S1CDR: usize = 0x7c;
pub const I2S2CDR: usize = 0x84;
pub const I2S3CDR: usize = 0x8c;
pub const MSC2CDR: usize = 0xa8;
pub const AUDIOCR: usize = 0xac;
pub const MAC1TXCDR: usize = 0xdc;

pub mod clk {
    use blue_cgu::ClockId;

    pub const EXCLK: ClockId = 0;
    pub const RTCLK: ClockId = 1;
    pub const APLL: ClockId = 2;
    pub const MPLL: ClockId = 3;
    pub const EPLL: ClockId = 4;
    pub const I2S0: ClockId = 5;
    pub const I2S1: ClockId = 6;
    pub const I2S2: ClockId = 7;
    pub const I2S3: ClockId = 8;
    pub const OTGPHY: ClockId = 9;
    pub const SCLKA: ClockId = 10;
    pub const CPUMUX: ClockId = 11;
    pub const CPU: ClockId = 12;
    pub const L2CACHE: ClockId = 13;
    pub const AHB0: ClockId = 14;
    pub const AHB2PMUX: ClockId = 15;
    pub const AHB2: ClockId = 16;
    pub const PCLK: ClockId = 17;
    pub const DDR: ClockId = 18;
    pub const ISP: ClockId = 19;
    pub const MACPTP: ClockId = 20;
    pub const MACPHY: ClockId = 21;
    pub const MAC0TX: ClockId = 22;
    pub const MAC1TX: ClockId = 23;
    pub const RSA: ClockId = 24;
    pub const SSIPLL: ClockId = 25;
    pub const LCD: ClockId = 26;
    pub const MSC0: ClockId = 27;
    pub const MSC1: ClockId = 28;
    pub const MSC2: ClockId = 29;
    pub const PWM: ClockId = 30;
    pub const SFC: ClockId = 31;
    pub const CIM: ClockId = 32;
    pub const DMIC_EXCLK: ClockId = 33;
    pub const DMIC: ClockId = 34;
    pub const EXCLK_DIV512: ClockId = 35;
    pub const RTC: ClockId = 36;
    pub const EMC: ClockId = 37;
    pub const EFUSE: ClockId = 38;
    pub const OTG: ClockId = 39;
    pub const SCC: ClockId = 40;
    pub const I2C0: ClockId = 41;
    pub const I2C1: ClockId = 42;
    pub const I2C2: ClockId = 43;
    pub const I2C3: ClockId = 44;
    pub const SADC: ClockId = 45;
    pub const UART0: ClockId = 46;
    pub const UART1: ClockId = 47;
    pub const UART2: ClockId = 48;
    pub const DTRNG: ClockId = 49;
    pub const TCU: ClockId = 50;
    pub const SSI0: ClockId = 51;
    pub const OST: ClockId = 52;
    pub const PDMA: ClockId = 53;
    pub const SSI1: ClockId = 54;
    pub const I2C4: ClockId = 55;
    pub const I2C5: ClockId = 56;
    pub const ISP0: ClockId = 57;
    pub const ISP1: ClockId = 58;
    pub const HASH: ClockId = 59;
    pub const UART3: ClockId = 60;
    pub const UART4: ClockId = 61;
    pub const UART5: ClockId = 62;
    pub const UART6: ClockId = 63;
    pub const UART7: ClockId = 64;
    pub const UART8: ClockId = 65;
    pub const UART9: ClockId = 66;
    pub const MAC0: ClockId = 67;
    pub const MAC1: ClockId = 68;
    pub const INTC: ClockId = 69;
    pub const CSI: ClockId = 70;
    pub const DSI: ClockId = 71;

    pub const COUNT: usize = 72;
}

use clk::*;

// OD = 1 is not encodable on this part.
static PLL_OD: [Option<u8>; 64] =
    od_table(&[(2, 1), (4, 2), (8, 3), (16, 4), (32, 5), (64, 6)]);

static OTG_PHY: OtgPhy = OtgPhy {
    gates_phy_clock: true,
    has_usbpcr: false,
};

const fn pll(ctl: usize, m_bits: u8, bypass_bit: u8) -> PllInfo {
    PllInfo::new(ctl, 2, Field::new(20, m_bits), 1, Field::new(14, 6), 1)
        .with_od(Field::new(11, 3), &PLL_OD)
        .with_bypass(CPPCR, bypass_bit)
        .with_enable(0)
        .with_stable(3)
}

fn i2s_calc(_pll: &PllInfo, rate: u64, parent_rate: u64) -> Result<PllFactors, ClockError> {
    let (m, n) = i2s_calc_m_n(rate, parent_rate)?;
    Ok(PllFactors::new(m, n, 1))
}

const fn i2s(name: &'static str, cdr: usize) -> ClockInfo {
    ClockInfo::pll_muxed(
        name,
        parents!(SCLKA, EPLL),
        PllInfo::new(cdr, 1, Field::new(20, 9), 0, Field::new(0, 20), 0)
            .with_mux(Field::new(30, 1))
            .with_enable(29)
            .with_calc(i2s_calc),
    )
}

const fn cdr_clock(
    name: &'static str,
    parents: [Option<ClockId>; 4],
    cdr: usize,
    bits: u8,
    gate: Option<GateInfo>,
) -> ClockInfo {
    let mut info = CompositeInfo::new()
        .mux(MuxInfo::new(cdr, 30, 2))
        .div(cdr_div(cdr, 1, bits, 29));
    if let Some(gate) = gate {
        info = info.gate(gate);
    }
    ClockInfo::composite(name, parents, info)
}

const fn msc(name: &'static str, cdr: usize, gate: GateInfo) -> ClockInfo {
    ClockInfo::composite(
        name,
        parents!(SCLKA, MPLL, EXCLK, _),
        CompositeInfo::new()
            .mux(MuxInfo::new(cdr, 30, 2))
            .div(cdr_div(cdr, 2, 8, 29))
            .gate(gate),
    )
}

pub static CLOCKS: [ClockInfo; COUNT] = [
    ClockInfo::external("ext"),
    ClockInfo::external("rtc"),
    ClockInfo::pll("apll", EXCLK, pll(CPAPCR, 9, 30)),
    ClockInfo::pll("mpll", EXCLK, pll(CPMPCR, 10, 28)),
    ClockInfo::pll("epll", EXCLK, pll(CPEPCR, 10, 26)),
    i2s("i2s0", I2S0CDR),
    i2s("i2s1", I2S1CDR),
    i2s("i2s2", I2S2CDR),
    i2s("i2s3", I2S3CDR),
    ClockInfo::custom("otg_phy", parents!(EXCLK), &OTG_PHY),
    ClockInfo::mux("sclk_a", parents!(_, EXCLK, APLL, _), MuxInfo::new(CPCCR, 30, 2)),
    ClockInfo::mux("cpu_mux", parents!(_, SCLKA, MPLL, _), MuxInfo::new(CPCCR, 28, 2)),
    ClockInfo::div("cpu", CPUMUX, DivInfo::new(CPCCR, 0, 1, 4).change_enable(22)),
    ClockInfo::div("l2cache", CPUMUX, DivInfo::new(CPCCR, 4, 1, 4).change_enable(22)),
    ClockInfo::composite(
        "ahb0",
        parents!(_, SCLKA, MPLL, _),
        CompositeInfo::new()
            .mux(MuxInfo::new(CPCCR, 26, 2))
            .div(DivInfo::new(CPCCR, 8, 1, 4).change_enable(21))
            .gate(GateInfo::new(CLKGR0, 29)),
    ),
    ClockInfo::mux("ahb2_apb_mux", parents!(_, SCLKA, MPLL, _), MuxInfo::new(CPCCR, 24, 2)),
    ClockInfo::div("ahb2", AHB2PMUX, DivInfo::new(CPCCR, 12, 1, 4).change_enable(20)),
    ClockInfo::composite(
        "pclk",
        parents!(AHB2PMUX),
        CompositeInfo::new()
            .div(DivInfo::new(CPCCR, 16, 1, 4).change_enable(20))
            .gate(GateInfo::new(CLKGR0, 28)),
    ),
    cdr_clock(
        "ddr",
        parents!(_, SCLKA, MPLL, _),
        DDRCDR,
        4,
        Some(GateInfo::new(CLKGR0, 31)),
    ),
    cdr_clock("isp", parents!(SCLKA, MPLL, EPLL, _), ISPCDR, 4, None),
    cdr_clock("mac_ptp", parents!(SCLKA, MPLL, EPLL, _), MACPTPCDR, 8, None),
    cdr_clock("mac_phy", parents!(SCLKA, MPLL, EPLL, _), MACCDR, 8, None),
    cdr_clock("mac0_tx", parents!(SCLKA, MPLL, EPLL, _), MAC0TXCDR, 8, None),
    cdr_clock("mac1_tx", parents!(SCLKA, MPLL, EPLL, _), MAC1TXCDR, 8, None),
    cdr_clock(
        "rsa",
        parents!(SCLKA, MPLL, EXCLK, _),
        RSACDR,
        4,
        Some(GateInfo::new(CLKGR0, 25)),
    ),
    cdr_clock("ssi_pll", parents!(SCLKA, MPLL, EPLL, _), SSICDR, 8, None),
    cdr_clock(
        "lcd",
        parents!(SCLKA, MPLL, EXCLK, _),
        LPCDR,
        8,
        Some(GateInfo::new(CLKGR0, 23)),
    ),
    msc("msc0", MSC0CDR, GateInfo::new(CLKGR0, 4)),
    msc("msc1", MSC1CDR, GateInfo::new(CLKGR0, 5)),
    msc("msc2", MSC2CDR, GateInfo::new(CLKGR1, 25)),
    cdr_clock(
        "pwm",
        parents!(SCLKA, MPLL, EPLL, _),
        PWMCDR,
        4,
        Some(GateInfo::new(CLKGR1, 5)),
    ),
    cdr_clock(
        "sfc",
        parents!(SCLKA, MPLL, EPLL, _),
        SFCCDR,
        8,
        Some(GateInfo::new(CLKGR0, 2)),
    ),
    cdr_clock(
        "cim",
        parents!(SCLKA, MPLL, EPLL, _),
        CIMCDR,
        8,
        Some(GateInfo::new(CLKGR0, 22)),
    ),
    gate("dmic_exclk", EXCLK, AUDIOCR, 31),
    ClockInfo::composite(
        "dmic",
        parents!(DMIC_EXCLK, I2S3),
        CompositeInfo::new()
            .mux(MuxInfo::new(AUDIOCR, 0, 1))
            .gate(GateInfo::new(CLKGR1, 13)),
    ),
    ClockInfo::fixed_divider("exclk_div512", EXCLK, 512),
    ClockInfo::composite(
        "rtc_ercs",
        parents!(EXCLK_DIV512, RTCLK),
        CompositeInfo::new()
            .mux(MuxInfo::new(OPCR, 2, 1))
            .gate(GateInfo::new(CLKGR0, 27)),
    ),
    gate("emc", AHB2, CLKGR0, 0),
    gate("efuse", AHB2, CLKGR0, 1),
    gate("otg", EXCLK, CLKGR0, 3),
    gate("scc", EXCLK, CLKGR0, 6),
    gate("i2c0", PCLK, CLKGR0, 7),
    gate("i2c1", PCLK, CLKGR0, 8),
    gate("i2c2", PCLK, CLKGR0, 9),
    gate("i2c3", PCLK, CLKGR0, 10),
    gate("sadc", EXCLK, CLKGR0, 13),
    gate("uart0", EXCLK, CLKGR0, 14),
    gate("uart1", EXCLK, CLKGR0, 15),
    gate("uart2", EXCLK, CLKGR0, 16),
    gate("dtrng", PCLK, CLKGR0, 17),
    gate("tcu", EXCLK, CLKGR0, 18),
    gate("ssi0", SSIPLL, CLKGR0, 19),
    gate("ost", EXCLK, CLKGR0, 20),
    gate("pdma", EXCLK, CLKGR0, 21),
    gate("ssi1", SSIPLL, CLKGR0, 26),
    gate("i2c4", PCLK, CLKGR1, 0),
    gate("i2c5", PCLK, CLKGR1, 1),
    gate("isp0", ISP, CLKGR1, 2),
    gate("isp1", ISP, CLKGR1, 3),
    gate("hash", AHB2, CLKGR1, 6),
    gate("uart3", EXCLK, CLKGR1, 16),
    gate("uart4", EXCLK, CLKGR1, 17),
    gate("uart5", EXCLK, CLKGR1, 18),
    gate("uart6", EXCLK, CLKGR1, 19),
    gate("uart7", EXCLK, CLKGR1, 20),
    gate("uart8", EXCLK, CLKGR1, 21),
    gate("uart9", EXCLK, CLKGR1, 22),
    gate("mac0", AHB2, CLKGR1, 23),
    gate("mac1", AHB2, CLKGR1, 24),
    gate("intc", AHB2, CLKGR1, 26),
    gate("csi", AHB0, CLKGR1, 28),
    gate("dsi", AHB0, CLKGR1, 29),
];

pub static SOC: SocInfo<'static> = SocInfo {
    name: "x2000",
    clocks: &CLOCKS,
    low_power: Some(LOW_POWER),
};

/// Brings up the X2000 CGU with the board's oscillator rates.
pub fn cgu<R: RegisterIo, D: DelayNs + Send>(regs: R, delay: D) -> Result<Cgu<R, D>, ConfigError> {
    Cgu::new(&SOC, regs, delay, crate::config::default_config())
}
