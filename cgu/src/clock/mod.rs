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

//! Static clock descriptors and the per-kind engines.

mod custom;
mod div;
mod gate;
mod mux;
mod pll;

pub use custom::CustomClock;
pub use div::DivInfo;
pub use gate::{GateInfo, GatePolarity};
pub use mux::MuxInfo;
pub use pll::{od_table, PllCalcFn, PllFactors, PllInfo};

use crate::regs::RegBit;
use bitflags::bitflags;
use core::fmt;

/// Index of a clock in its SoC table.
pub type ClockId = usize;

pub const MAX_PARENTS: usize = 4;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClockCaps: u32 {
        const EXT = 1 << 0;
        const PLL = 1 << 1;
        const GATE = 1 << 2;
        const DIV = 1 << 3;
        const FIXDIV = 1 << 4;
        const MUX = 1 << 5;
        const CUSTOM = 1 << 6;
    }
}

/// Mux, divider and gate stages of one clock. Any subset may be present.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeInfo {
    pub mux: Option<MuxInfo>,
    pub div: Option<DivInfo>,
    pub gate: Option<GateInfo>,
}

impl CompositeInfo {
    pub const fn new() -> Self {
        Self {
            mux: None,
            div: None,
            gate: None,
        }
    }

    pub const fn mux(mut self, mux: MuxInfo) -> Self {
        self.mux = Some(mux);
        self
    }

    pub const fn div(mut self, div: DivInfo) -> Self {
        self.div = Some(div);
        self
    }

    pub const fn gate(mut self, gate: GateInfo) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[derive(Clone, Copy)]
pub enum ClockKind {
    /// Fixed-rate oscillator; its rate comes from [`CguConfig`](crate::CguConfig).
    External,
    Pll(PllInfo),
    FixedDivider(u32),
    Custom(&'static dyn CustomClock),
    Composite(CompositeInfo),
}

impl fmt::Debug for ClockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockKind::External => f.write_str("External"),
            ClockKind::Pll(pll) => f.debug_tuple("Pll").field(&pll.reg).finish(),
            ClockKind::FixedDivider(div) => f.debug_tuple("FixedDivider").field(div).finish(),
            ClockKind::Custom(_) => f.write_str("Custom"),
            ClockKind::Composite(info) => f.debug_tuple("Composite").field(info).finish(),
        }
    }
}

/// One entry of a SoC clock table.
///
/// `parents` lists the selectable sources by table index. For a mux the
/// slot number is the value written to the mux field, so unused encodings
/// stay `None`.
#[derive(Debug, Clone, Copy)]
pub struct ClockInfo {
    pub name: &'static str,
    pub parents: [Option<ClockId>; MAX_PARENTS],
    pub kind: ClockKind,
}

const fn single(parent: ClockId) -> [Option<ClockId>; MAX_PARENTS] {
    [Some(parent), None, None, None]
}

impl ClockInfo {
    pub const fn external(name: &'static str) -> Self {
        Self {
            name,
            parents: [None; MAX_PARENTS],
            kind: ClockKind::External,
        }
    }

    pub const fn pll(name: &'static str, parent: ClockId, pll: PllInfo) -> Self {
        Self::pll_muxed(name, single(parent), pll)
    }

    /// A PLL-shaped clock with its parent selector in the PLL register.
    pub const fn pll_muxed(
        name: &'static str,
        parents: [Option<ClockId>; MAX_PARENTS],
        pll: PllInfo,
    ) -> Self {
        Self {
            name,
            parents,
            kind: ClockKind::Pll(pll),
        }
    }

    pub const fn fixed_divider(name: &'static str, parent: ClockId, div: u32) -> Self {
        Self {
            name,
            parents: single(parent),
            kind: ClockKind::FixedDivider(div),
        }
    }

    pub const fn custom(
        name: &'static str,
        parents: [Option<ClockId>; MAX_PARENTS],
        ops: &'static dyn CustomClock,
    ) -> Self {
        Self {
            name,
            parents,
            kind: ClockKind::Custom(ops),
        }
    }

    pub const fn mux(
        name: &'static str,
        parents: [Option<ClockId>; MAX_PARENTS],
        mux: MuxInfo,
    ) -> Self {
        Self::composite(name, parents, CompositeInfo::new().mux(mux))
    }

    pub const fn div(name: &'static str, parent: ClockId, div: DivInfo) -> Self {
        Self::composite(name, single(parent), CompositeInfo::new().div(div))
    }

    pub const fn gate(name: &'static str, parent: ClockId, gate: GateInfo) -> Self {
        Self::composite(name, single(parent), CompositeInfo::new().gate(gate))
    }

    pub const fn composite(
        name: &'static str,
        parents: [Option<ClockId>; MAX_PARENTS],
        info: CompositeInfo,
    ) -> Self {
        Self {
            name,
            parents,
            kind: ClockKind::Composite(info),
        }
    }

    pub fn caps(&self) -> ClockCaps {
        match &self.kind {
            ClockKind::External => ClockCaps::EXT,
            ClockKind::Pll(pll) if pll.mux.is_some() => ClockCaps::PLL | ClockCaps::MUX,
            ClockKind::Pll(_) => ClockCaps::PLL,
            ClockKind::FixedDivider(_) => ClockCaps::FIXDIV,
            ClockKind::Custom(_) => ClockCaps::CUSTOM,
            ClockKind::Composite(info) => {
                let mut caps = ClockCaps::empty();
                caps.set(ClockCaps::MUX, info.mux.is_some());
                caps.set(ClockCaps::DIV, info.div.is_some());
                caps.set(ClockCaps::GATE, info.gate.is_some());
                caps
            }
        }
    }

    /// Slot of `parent` among the declared candidates.
    pub fn parent_slot(&self, parent: ClockId) -> Option<usize> {
        self.parents.iter().position(|p| *p == Some(parent))
    }
}

/// The clock table of one chip, plus SoC-wide control bits.
#[derive(Debug, Clone, Copy)]
pub struct SocInfo<'a> {
    pub name: &'static str,
    pub clocks: &'a [ClockInfo],
    /// Set on suspend to let the CGU enter its low power mode.
    pub low_power: Option<RegBit>,
}
