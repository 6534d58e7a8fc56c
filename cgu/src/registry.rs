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

//! The clock graph registry.
//!
//! All nodes live in one table and reference each other by index. Rates are
//! never cached: every query walks the live parent chain and re-reads the
//! registers, since firmware or another core may reprogram them.

use crate::{
    clock::{
        ClockCaps, ClockId, ClockInfo, ClockKind, CompositeInfo, PllFactors, PllInfo, SocInfo,
    },
    config::CguConfig,
    error::{ClockError, ConfigError},
    notify::Subscription,
    pm::ResumeHook,
    regs::{Field, RegBit, RegisterIo},
    sync::SpinLock,
};
use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};

/// A clock named either by table index or by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockRef<'a> {
    Id(ClockId),
    Name(&'a str),
}

impl From<ClockId> for ClockRef<'_> {
    fn from(id: ClockId) -> Self {
        ClockRef::Id(id)
    }
}

impl<'a> From<&'a str> for ClockRef<'a> {
    fn from(name: &'a str) -> Self {
        ClockRef::Name(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSummary {
    pub id: ClockId,
    pub name: &'static str,
    pub rate: u64,
    pub enabled: bool,
    pub parent: Option<ClockId>,
}

struct ClockNode {
    info: ClockInfo,
    ext_rate: u64,
}

/// State that only changes with the lock held.
pub(crate) struct CguInner<D> {
    pub delay: D,
    pub subscriptions: Vec<Subscription>,
    pub resume_hooks: Vec<Arc<dyn ResumeHook>>,
}

pub struct Cgu<R, D> {
    soc: &'static str,
    nodes: Vec<ClockNode>,
    names: BTreeMap<&'static str, ClockId>,
    pub(crate) regs: R,
    pub(crate) inner: SpinLock<CguInner<D>>,
    config: CguConfig,
    pub(crate) low_power: Option<RegBit>,
}

fn validate(info: &ClockInfo, count: usize) -> Result<(), ConfigError> {
    let clock = info.name;
    let invalid = |what| Err(ConfigError::InvalidField { clock, what });

    if let Some(parent) = info.parents.iter().flatten().find(|p| **p >= count) {
        return Err(ConfigError::ParentOutOfRange {
            clock,
            parent: *parent,
        });
    }
    let highest_slot = info.parents.iter().rposition(Option::is_some);
    if highest_slot.is_none() && !matches!(info.kind, ClockKind::External) {
        return Err(ConfigError::NoParent { clock });
    }
    let mux_fits =
        |field: Field| field.is_valid() && field.max() as usize >= highest_slot.unwrap_or(0);
    let bit_ok = |bit: Option<u8>| bit.map_or(true, |b| b < 32);

    match &info.kind {
        ClockKind::External | ClockKind::Custom(_) => {}
        ClockKind::FixedDivider(0) => return invalid("divisor"),
        ClockKind::FixedDivider(_) => {}
        ClockKind::Pll(pll) => {
            if !pll.m.is_valid() || !pll.n.is_valid() {
                return invalid("M/N field");
            }
            if pll.rate_multiplier == 0 {
                return invalid("rate multiplier");
            }
            if pll.od.is_some_and(|od| !od.is_valid()) || pll.legal_ods().next().is_none() {
                return invalid("OD field");
            }
            if pll.mux.is_some_and(|mux| !mux_fits(mux)) {
                return invalid("mux field");
            }
            if pll.bypass.is_some_and(|b| !b.is_valid())
                || !bit_ok(pll.enable_bit)
                || !bit_ok(pll.stable_bit)
            {
                return invalid("PLL control bit");
            }
        }
        ClockKind::Composite(c) => {
            if c.mux.is_none() && c.div.is_none() && c.gate.is_none() {
                return invalid("composite");
            }
            if c.mux.is_some_and(|mux| !mux_fits(mux.field)) {
                return invalid("mux field");
            }
            if let Some(div) = c.div {
                if !div.field.is_valid() || div.scale == 0 {
                    return invalid("divider field");
                }
                if !bit_ok(div.change_enable) || !bit_ok(div.busy) || !bit_ok(div.stop) {
                    return invalid("divider control bit");
                }
                if div.table.is_some_and(|t| t.is_empty() || t.contains(&0)) {
                    return invalid("divider table");
                }
            }
            if c.gate.is_some_and(|g| g.bit >= 32) {
                return invalid("gate bit");
            }
        }
    }
    Ok(())
}

impl<R: RegisterIo, D: DelayNs + Send> Cgu<R, D> {
    /// Builds the registry for `soc` and validates its table.
    ///
    /// Besides the per-entry checks, the graph formed by the current mux
    /// selections must be acyclic. Unselected mux candidates may point
    /// anywhere; [`set_parent`](Self::set_parent) guards those at runtime.
    pub fn new(
        soc: &SocInfo<'_>,
        regs: R,
        delay: D,
        config: CguConfig,
    ) -> Result<Self, ConfigError> {
        let count = soc.clocks.len();
        let mut nodes = Vec::with_capacity(count);
        let mut names = BTreeMap::new();
        for info in soc.clocks {
            if names.insert(info.name, nodes.len()).is_some() {
                return Err(ConfigError::DuplicateName { clock: info.name });
            }
            validate(info, count).inspect_err(|e| error!("{}: {}", soc.name, e))?;
            let ext_rate = match info.kind {
                ClockKind::External => config
                    .external_rate(info.name)
                    .ok_or(ConfigError::MissingRate { clock: info.name })?,
                _ => 0,
            };
            nodes.push(ClockNode {
                info: *info,
                ext_rate,
            });
        }
        for (name, _) in &config.external_rates {
            let external = names
                .get(name)
                .is_some_and(|id: &ClockId| matches!(nodes[*id].info.kind, ClockKind::External));
            if !external {
                return Err(ConfigError::UnknownExternal { clock: *name });
            }
        }
        if let Some(bit) = soc.low_power.filter(|b| !b.is_valid()) {
            error!("{}: low power bit {} out of range", soc.name, bit.bit);
            return Err(ConfigError::InvalidField {
                clock: soc.name,
                what: "low power bit",
            });
        }

        let cgu = Self {
            soc: soc.name,
            nodes,
            names,
            regs,
            inner: SpinLock::new(CguInner {
                delay,
                subscriptions: Vec::new(),
                resume_hooks: Vec::new(),
            }),
            config,
            low_power: soc.low_power,
        };
        cgu.check_live_graph()?;
        info!("{}: {} clocks registered", cgu.soc, count);
        Ok(cgu)
    }

    fn check_live_graph(&self) -> Result<(), ConfigError> {
        for id in 0..self.nodes.len() {
            let mut cur = id;
            let mut steps = 0;
            while let Some(parent) = self.parent_of(cur) {
                steps += 1;
                if steps > self.nodes.len() {
                    error!("{}: clock {} sits on a parent cycle", self.soc, self.nodes[id].info.name);
                    return Err(ConfigError::Cycle {
                        clock: self.nodes[id].info.name,
                    });
                }
                cur = parent;
            }
            if !matches!(self.nodes[cur].info.kind, ClockKind::External) && cur == id {
                warn!("{}: clock {} has no selected parent", self.soc, self.nodes[id].info.name);
            }
        }
        Ok(())
    }

    pub fn soc_name(&self) -> &'static str {
        self.soc
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn resolve(&self, clk: ClockRef<'_>) -> Result<ClockId, ClockError> {
        match clk {
            ClockRef::Id(id) if id < self.nodes.len() => Ok(id),
            ClockRef::Id(_) => Err(ClockError::UnknownClock),
            ClockRef::Name(name) => self
                .names
                .get(name)
                .copied()
                .ok_or(ClockError::UnknownClock),
        }
    }

    pub fn lookup(&self, name: &str) -> Result<ClockId, ClockError> {
        self.resolve(ClockRef::Name(name))
    }

    pub fn name<'a>(&self, clk: impl Into<ClockRef<'a>>) -> Result<&'static str, ClockError> {
        let id = self.resolve(clk.into())?;
        Ok(self.nodes[id].info.name)
    }

    pub fn caps<'a>(&self, clk: impl Into<ClockRef<'a>>) -> Result<ClockCaps, ClockError> {
        let id = self.resolve(clk.into())?;
        Ok(self.nodes[id].info.caps())
    }

    /// Slot currently selected by the node's mux, 0 for single-parent nodes.
    fn parent_slot(&self, id: ClockId) -> usize {
        match &self.nodes[id].info.kind {
            ClockKind::Pll(pll) => pll.parent_slot(&self.regs),
            ClockKind::Custom(ops) => ops.parent(&self.regs),
            ClockKind::Composite(CompositeInfo { mux: Some(mux), .. }) => {
                mux.selected(&self.regs)
            }
            _ => 0,
        }
    }

    fn parent_of(&self, id: ClockId) -> Option<ClockId> {
        let node = &self.nodes[id];
        if matches!(node.info.kind, ClockKind::External) {
            return None;
        }
        node.info
            .parents
            .get(self.parent_slot(id))
            .copied()
            .flatten()
    }

    fn has_mux(&self, id: ClockId) -> bool {
        match &self.nodes[id].info.kind {
            ClockKind::Pll(pll) => pll.mux.is_some(),
            ClockKind::Custom(ops) => ops.has_mux(),
            ClockKind::Composite(info) => info.mux.is_some(),
            _ => false,
        }
    }

    /// Rate of `id` given the rate of its selected parent.
    fn recalc(&self, id: ClockId, parent_rate: u64, slot: usize) -> u64 {
        let node = &self.nodes[id];
        match &node.info.kind {
            ClockKind::External => node.ext_rate,
            ClockKind::Pll(pll) => pll.recalc_rate(&self.regs, parent_rate),
            ClockKind::FixedDivider(div) => parent_rate / u64::from(*div),
            ClockKind::Custom(ops) => ops.recalc_rate(&self.regs, parent_rate),
            ClockKind::Composite(CompositeInfo { div: Some(div), .. }) => {
                div.recalc_rate(&self.regs, parent_rate, slot)
            }
            ClockKind::Composite(_) => parent_rate,
        }
    }

    /// Walks up to the root, then folds the transforms back down. A node
    /// whose mux selects an empty slot is an orphan and runs at 0 Hz.
    pub(crate) fn rate_locked(&self, id: ClockId) -> Result<u64, ClockError> {
        let mut chain: Vec<(ClockId, usize)> = Vec::new();
        let mut cur = id;
        let mut rate = loop {
            let node = &self.nodes[cur];
            if matches!(node.info.kind, ClockKind::External) {
                break node.ext_rate;
            }
            if chain.len() >= self.nodes.len() {
                error!("{}: parent loop above {}", self.soc, self.nodes[id].info.name);
                return Err(ClockError::WouldCreateCycle);
            }
            let slot = self.parent_slot(cur);
            match node.info.parents.get(slot).copied().flatten() {
                Some(parent) => {
                    chain.push((cur, slot));
                    cur = parent;
                }
                None => {
                    debug!("{}: {} is orphaned", self.soc, node.info.name);
                    break 0;
                }
            }
        };
        for (node, slot) in chain.into_iter().rev() {
            rate = self.recalc(node, rate, slot);
        }
        Ok(rate)
    }

    /// `rate_locked` for reporting paths that cannot fail; a loop reads as 0.
    pub(crate) fn rate_or_zero_locked(&self, id: ClockId) -> u64 {
        self.rate_locked(id).unwrap_or_else(|e| {
            warn!("{}: {} rate unknown: {}", self.soc, self.nodes[id].info.name, e);
            0
        })
    }

    fn parent_rate_locked(&self, id: ClockId) -> Result<u64, ClockError> {
        match self.parent_of(id) {
            Some(parent) => self.rate_locked(parent),
            None => Ok(0),
        }
    }

    fn pll(&self, id: ClockId) -> Result<&PllInfo, ClockError> {
        match &self.nodes[id].info.kind {
            ClockKind::Pll(pll) => Ok(pll),
            _ => Err(ClockError::NotSupported),
        }
    }

    /// Runs `op` under the lock, then tells subscribers whose clock changed
    /// rate. Partial writes of a failed `op` are reported as well.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut CguInner<D>) -> Result<T, ClockError>,
    ) -> Result<T, ClockError> {
        let mut inner = self.inner.irqsave_lock();
        let before = self.snapshot(&inner.subscriptions);
        let result = op(&mut inner);
        let changes = self.changes_since(&inner.subscriptions, before);
        drop(inner);
        for (notifier, change) in changes {
            notifier.rate_changed(&change);
        }
        result
    }

    /// Current rate in Hz.
    pub fn rate<'a>(&self, clk: impl Into<ClockRef<'a>>) -> Result<u64, ClockError> {
        let id = self.resolve(clk.into())?;
        let _guard = self.inner.irqsave_lock();
        self.rate_locked(id)
    }

    /// Currently selected parent, `None` for roots and orphans.
    pub fn parent<'a>(&self, clk: impl Into<ClockRef<'a>>) -> Result<Option<ClockId>, ClockError> {
        let id = self.resolve(clk.into())?;
        let _guard = self.inner.irqsave_lock();
        Ok(self.parent_of(id))
    }

    /// Switches a mux to `parent`, which must be one of its declared
    /// candidates and must not have the mux among its own ancestors.
    pub fn set_parent<'a, 'b>(
        &self,
        clk: impl Into<ClockRef<'a>>,
        parent: impl Into<ClockRef<'b>>,
    ) -> Result<(), ClockError> {
        let id = self.resolve(clk.into())?;
        let parent = self.resolve(parent.into())?;
        self.mutate(|_| self.set_parent_locked(id, parent))
    }

    fn set_parent_locked(&self, id: ClockId, parent: ClockId) -> Result<(), ClockError> {
        let node = &self.nodes[id];
        if !self.has_mux(id) {
            return Err(ClockError::InvalidParent);
        }
        let slot = node
            .info
            .parent_slot(parent)
            .ok_or(ClockError::InvalidParent)?;

        // Only this node's edge changes, so the rest of the chain is live.
        let mut cur = Some(parent);
        let mut steps = 0;
        while let Some(ancestor) = cur {
            if ancestor == id || steps > self.nodes.len() {
                return Err(ClockError::WouldCreateCycle);
            }
            steps += 1;
            cur = self.parent_of(ancestor);
        }

        match &node.info.kind {
            ClockKind::Pll(PllInfo {
                reg, mux: Some(mux), ..
            }) => {
                self.regs.modify32(*reg, mux.mask(), mux.set(0, slot as u32));
            }
            ClockKind::Composite(CompositeInfo { mux: Some(mux), .. }) => {
                mux.select(&self.regs, slot);
            }
            ClockKind::Custom(ops) => ops.set_parent(&self.regs, slot)?,
            _ => return Err(ClockError::InvalidParent),
        }
        debug!(
            "{}: {} parent -> {}",
            self.soc, node.info.name, self.nodes[parent].info.name
        );
        Ok(())
    }

    /// Rate `set_rate` would produce for `rate`, without touching hardware.
    pub fn round_rate<'a>(&self, clk: impl Into<ClockRef<'a>>, rate: u64) -> Result<u64, ClockError> {
        let id = self.resolve(clk.into())?;
        let _guard = self.inner.irqsave_lock();
        let parent_rate = self.parent_rate_locked(id)?;
        match &self.nodes[id].info.kind {
            ClockKind::Pll(pll) => {
                let factors = pll.calc(rate, parent_rate)?;
                Ok(pll.rate(parent_rate, factors))
            }
            ClockKind::Composite(CompositeInfo { div: Some(div), .. }) => {
                if div.is_bypassed(self.parent_slot(id)) {
                    return Err(ClockError::NotSupported);
                }
                let (_, ratio) = div.calc(parent_rate, rate)?;
                Ok(parent_rate / ratio)
            }
            ClockKind::Custom(ops) => ops.round_rate(&self.regs, rate, parent_rate),
            _ => Err(ClockError::NotSupported),
        }
    }

    /// Programs the closest achievable rate and returns what the hardware
    /// now produces, which is also what [`rate`](Self::rate) will report.
    pub fn set_rate<'a>(&self, clk: impl Into<ClockRef<'a>>, rate: u64) -> Result<u64, ClockError> {
        let id = self.resolve(clk.into())?;
        self.mutate(|inner| self.set_rate_locked(inner, id, rate))
    }

    fn set_rate_locked(
        &self,
        inner: &mut CguInner<D>,
        id: ClockId,
        rate: u64,
    ) -> Result<u64, ClockError> {
        if rate == 0 {
            return Err(ClockError::InvalidRate(rate));
        }
        let name = self.nodes[id].info.name;
        let parent_rate = self.parent_rate_locked(id)?;
        match &self.nodes[id].info.kind {
            ClockKind::Pll(pll) => {
                let factors = pll.calc(rate, parent_rate)?;
                self.commit_pll(inner, id, pll, factors)?;
            }
            ClockKind::Composite(CompositeInfo { div: Some(div), .. }) => {
                if div.is_bypassed(self.parent_slot(id)) {
                    return Err(ClockError::NotSupported);
                }
                let (hw, ratio) = div.calc(parent_rate, rate)?;
                let programmed = div.program(&self.regs, hw, &mut inner.delay, self.config.div_busy);
                debug!("{}: {} divider -> {}", self.soc, name, ratio);
                programmed.inspect_err(|_| error!("{}: {} divider stuck busy", self.soc, name))?;
            }
            ClockKind::Custom(ops) => {
                let rounded = ops.round_rate(&self.regs, rate, parent_rate)?;
                ops.set_rate(&self.regs, rounded, parent_rate)?;
            }
            _ => return Err(ClockError::NotSupported),
        }
        let actual = self.rate_locked(id)?;
        if actual != rate {
            info!("{}: {} requested {} Hz, got {} Hz", self.soc, name, rate, actual);
        }
        Ok(actual)
    }

    fn commit_pll(
        &self,
        inner: &mut CguInner<D>,
        id: ClockId,
        pll: &PllInfo,
        factors: PllFactors,
    ) -> Result<(), ClockError> {
        let ctl = pll.encode(self.regs.read32(pll.reg), factors)?;
        self.regs.write32(pll.reg, ctl);
        debug!(
            "{}: {} M={} N={} OD={}",
            self.soc, self.nodes[id].info.name, factors.m, factors.n, factors.od
        );
        if !pll.is_enabled(ctl) {
            return Ok(());
        }
        pll.wait_stable(&self.regs, &mut inner.delay, self.config.pll_stable)
            .inspect_err(|_| error!("{}: {} failed to lock", self.soc, self.nodes[id].info.name))
    }

    /// Programs explicit PLL factors and returns the resulting rate.
    pub fn set_pll_factors<'a>(
        &self,
        clk: impl Into<ClockRef<'a>>,
        factors: PllFactors,
    ) -> Result<u64, ClockError> {
        let id = self.resolve(clk.into())?;
        let pll = self.pll(id)?;
        self.mutate(|inner| {
            self.commit_pll(inner, id, pll, factors)?;
            self.rate_locked(id)
        })
    }

    /// Current PLL factors, `None` while the OD field holds a reserved value.
    pub fn pll_factors<'a>(
        &self,
        clk: impl Into<ClockRef<'a>>,
    ) -> Result<Option<PllFactors>, ClockError> {
        let id = self.resolve(clk.into())?;
        let pll = self.pll(id)?;
        let _guard = self.inner.irqsave_lock();
        Ok(pll.decode(self.regs.read32(pll.reg)))
    }

    /// Routes the parent straight to the output, or back through the PLL.
    /// Independent of the enable bit.
    pub fn set_pll_bypass<'a>(
        &self,
        clk: impl Into<ClockRef<'a>>,
        bypass: bool,
    ) -> Result<u64, ClockError> {
        let id = self.resolve(clk.into())?;
        let bit = self.pll(id)?.bypass.ok_or(ClockError::NotSupported)?;
        self.mutate(|_| {
            bit.write(&self.regs, bypass);
            debug!("{}: {} bypass {}", self.soc, self.nodes[id].info.name, bypass);
            self.rate_locked(id)
        })
    }

    pub fn is_pll_bypassed<'a>(&self, clk: impl Into<ClockRef<'a>>) -> Result<bool, ClockError> {
        let id = self.resolve(clk.into())?;
        let pll = self.pll(id)?;
        let _guard = self.inner.irqsave_lock();
        Ok(pll.is_bypassed(&self.regs))
    }

    /// Turns the clock on. Clocks without a gate succeed without effect.
    ///
    /// This does not count: two enables followed by one disable leave the
    /// clock off. Consumers sharing a clock go through
    /// [`Clocks`](crate::Clocks).
    pub fn enable<'a>(&self, clk: impl Into<ClockRef<'a>>) -> Result<(), ClockError> {
        let id = self.resolve(clk.into())?;
        let mut inner = self.inner.irqsave_lock();
        self.set_enabled_locked(&mut inner, id, true)
    }

    pub fn disable<'a>(&self, clk: impl Into<ClockRef<'a>>) -> Result<(), ClockError> {
        let id = self.resolve(clk.into())?;
        let mut inner = self.inner.irqsave_lock();
        self.set_enabled_locked(&mut inner, id, false)
    }

    fn set_enabled_locked(
        &self,
        inner: &mut CguInner<D>,
        id: ClockId,
        on: bool,
    ) -> Result<(), ClockError> {
        let name = self.nodes[id].info.name;
        match &self.nodes[id].info.kind {
            ClockKind::Pll(pll) => pll
                .set_enabled(&self.regs, on, &mut inner.delay, self.config.pll_stable)
                .inspect_err(|_| error!("{}: {} failed to lock", self.soc, name))?,
            ClockKind::Custom(ops) if on => ops.enable(&self.regs)?,
            ClockKind::Custom(ops) => ops.disable(&self.regs)?,
            ClockKind::Composite(CompositeInfo {
                gate: Some(gate), ..
            }) => {
                gate.set_enabled(&self.regs, on);
                if on && gate.delay_us > 0 {
                    inner.delay.delay_us(gate.delay_us);
                }
            }
            _ => return Ok(()),
        }
        debug!("{}: {} {}", self.soc, name, if on { "on" } else { "off" });
        Ok(())
    }

    pub fn is_enabled<'a>(&self, clk: impl Into<ClockRef<'a>>) -> Result<bool, ClockError> {
        let id = self.resolve(clk.into())?;
        let _guard = self.inner.irqsave_lock();
        Ok(self.is_enabled_locked(id))
    }

    fn is_enabled_locked(&self, id: ClockId) -> bool {
        match &self.nodes[id].info.kind {
            ClockKind::Pll(pll) => pll.is_enabled(self.regs.read32(pll.reg)),
            ClockKind::Custom(ops) => ops.is_enabled(&self.regs),
            ClockKind::Composite(CompositeInfo {
                gate: Some(gate), ..
            }) => gate.is_enabled(&self.regs),
            _ => true,
        }
    }

    /// Rate, state and parent of every clock, read under one lock hold.
    pub fn summary(&self) -> Vec<ClockSummary> {
        let _guard = self.inner.irqsave_lock();
        (0..self.nodes.len())
            .map(|id| ClockSummary {
                id,
                name: self.nodes[id].info.name,
                rate: self.rate_or_zero_locked(id),
                enabled: self.is_enabled_locked(id),
                parent: self.parent_of(id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::{od_table, CustomClock, DivInfo, GateInfo, MuxInfo},
        notify::{RateChange, RateNotifier},
        poll::PollTimeout,
        testing::{FakeDelay, FakeRegisters, Rule},
    };
    use std::sync::Mutex;

    const EXT: ClockId = 0;
    const RTC: ClockId = 1;
    const PLL: ClockId = 2;
    const SCLK: ClockId = 3;
    const CPU: ClockId = 4;
    const DDR: ClockId = 5;
    const MSC: ClockId = 6;
    const ALT: ClockId = 7;
    const ALT_DIV2: ClockId = 8;
    const PHY: ClockId = 9;
    const G0: ClockId = 10;

    const CPCCR: usize = 0x00;
    const LCR: usize = 0x04;
    const CPPCR: usize = 0x0c;
    const APLL: usize = 0x10;
    const CLKGR0: usize = 0x20;
    const CLKGR1: usize = 0x28;
    const DDRCDR: usize = 0x2c;
    const USBPCR1: usize = 0x48;
    const MSCCDR: usize = 0x68;
    const SSICDR: usize = 0x74;

    static OD: [Option<u8>; 64] =
        od_table(&[(1, 0), (2, 1), (4, 2), (8, 3), (16, 4), (32, 5), (64, 6)]);

    struct TestPhy;

    impl CustomClock for TestPhy {
        fn enable(&self, regs: &dyn RegisterIo) -> Result<(), ClockError> {
            regs.modify32(USBPCR1, 0, 1);
            Ok(())
        }

        fn disable(&self, regs: &dyn RegisterIo) -> Result<(), ClockError> {
            regs.modify32(USBPCR1, 1, 0);
            Ok(())
        }

        fn is_enabled(&self, regs: &dyn RegisterIo) -> bool {
            regs.read32(USBPCR1) & 1 != 0
        }

        fn recalc_rate(&self, _regs: &dyn RegisterIo, _parent_rate: u64) -> u64 {
            12_000_000
        }
    }

    static TEST_PHY: TestPhy = TestPhy;

    static CLOCKS: [ClockInfo; 14] = [
        ClockInfo::external("ext"),
        ClockInfo::external("rtc"),
        ClockInfo::pll(
            "apll",
            EXT,
            PllInfo::new(APLL, 2, Field::new(20, 9), 1, Field::new(14, 6), 1)
                .with_od(Field::new(11, 3), &OD)
                .with_bypass(CPPCR, 30)
                .with_enable(0)
                .with_stable(3),
        ),
        ClockInfo::mux(
            "sclk_a",
            [None, Some(EXT), Some(PLL), None],
            MuxInfo::new(CPCCR, 30, 2),
        ),
        ClockInfo::composite(
            "cpu",
            [Some(SCLK), None, None, None],
            CompositeInfo::new()
                .div(DivInfo::new(CPCCR, 0, 1, 4).change_enable(22))
                .gate(GateInfo::new(CLKGR1, 15)),
        ),
        ClockInfo::composite(
            "ddr",
            [None, Some(SCLK), Some(PLL), None],
            CompositeInfo::new()
                .mux(MuxInfo::new(DDRCDR, 30, 2))
                .div(
                    DivInfo::new(DDRCDR, 0, 1, 4)
                        .change_enable(29)
                        .busy(28)
                        .stop(27),
                )
                .gate(GateInfo::new(CLKGR0, 31)),
        ),
        ClockInfo::div(
            "msc",
            PLL,
            DivInfo::new(MSCCDR, 0, 1, 8)
                .change_enable(29)
                .busy(28)
                .stop(27),
        ),
        ClockInfo::mux(
            "alt",
            [Some(EXT), Some(ALT_DIV2), None, None],
            MuxInfo::new(SSICDR, 29, 1),
        ),
        ClockInfo::fixed_divider("alt_div2", ALT, 2),
        ClockInfo::custom("phy", [Some(EXT), None, None, None], &TEST_PHY),
        ClockInfo::gate("g0", EXT, GateInfo::new(CLKGR0, 0)),
        ClockInfo::gate("g1", EXT, GateInfo::new(CLKGR0, 1)),
        ClockInfo::gate("g2", EXT, GateInfo::new(CLKGR0, 2)),
        ClockInfo::gate("g3", EXT, GateInfo::new(CLKGR0, 3).clear_to_gate()),
    ];

    static SOC: SocInfo<'static> = SocInfo {
        name: "test",
        clocks: &CLOCKS,
        low_power: Some(RegBit::new(LCR, 0)),
    };

    type TestCgu = Cgu<Arc<FakeRegisters>, FakeDelay>;

    fn config() -> CguConfig {
        CguConfig::new()
            .with_external("ext", 24_000_000)
            .with_external("rtc", 32_768)
            .with_pll_stable_timeout(PollTimeout::new(10, 10))
            .with_div_busy_timeout(PollTimeout::new(10, 10))
    }

    /// sclk_a on the PLL, PLL at 2016 MHz (M=41+1, N=0+1, OD=1), cpu /4.
    fn reference_regs() -> FakeRegisters {
        FakeRegisters::new()
            .with(CPCCR, (2 << 30) | 3)
            .with(APLL, (41 << 20) | 1 | (1 << 3))
            .with(DDRCDR, (1 << 30) | 1)
            .with(MSCCDR, 7)
    }

    fn build(regs: FakeRegisters) -> (TestCgu, Arc<FakeRegisters>, FakeDelay) {
        let regs = Arc::new(regs);
        let delay = FakeDelay::new();
        let cgu = Cgu::new(&SOC, regs.clone(), delay.clone(), config()).unwrap();
        (cgu, regs, delay)
    }

    #[derive(Default)]
    struct Recorder {
        changes: Mutex<Vec<RateChange>>,
    }

    impl RateNotifier for Recorder {
        fn rate_changed(&self, change: &RateChange) {
            self.changes.lock().unwrap().push(*change);
        }
    }

    #[test]
    fn reference_chain_rate() {
        let (cgu, regs, _) = build(reference_regs());
        assert_eq!(cgu.rate(PLL), Ok(2_016_000_000));
        assert_eq!(cgu.rate(CPU), Ok(504_000_000));
        assert_eq!(cgu.rate("cpu"), Ok(504_000_000));
        assert_eq!(cgu.rate(MSC), Ok(252_000_000));
        assert_eq!(cgu.rate(ALT_DIV2), Ok(12_000_000));
        assert_eq!(regs.write_count(), 0);
    }

    #[test]
    fn chain_rate_matches_closed_form_across_fields() {
        let (cgu, regs, _) = build(reference_regs());
        let ods: Vec<(u64, u32)> = OD
            .iter()
            .enumerate()
            .filter_map(|(i, enc)| enc.map(|enc| (i as u64 + 1, u32::from(enc))))
            .collect();
        assert_eq!(ods.len(), 7);
        for m in (1..=512u64).step_by(17).chain([512]) {
            for n in (1..=64u64).step_by(7) {
                for &(od, od_enc) in &ods {
                    let ctl = ((m as u32 - 1) << 20) | ((n as u32 - 1) << 14) | (od_enc << 11);
                    regs.set(APLL, ctl | 1 | (1 << 3));
                    for div in 1..=16u64 {
                        regs.set(CPCCR, (2 << 30) | (div as u32 - 1));
                        let expected = 24_000_000 * 2 * m / (n * od) / div;
                        assert_eq!(cgu.rate(CPU), Ok(expected), "M={m} N={n} OD={od} div={div}");
                    }
                }
            }
        }
    }

    #[test]
    fn unknown_clock() {
        let (cgu, _, _) = build(reference_regs());
        assert_eq!(cgu.rate("nope"), Err(ClockError::UnknownClock));
        assert_eq!(cgu.rate(99usize), Err(ClockError::UnknownClock));
        assert_eq!(cgu.set_parent("sclk_a", "nope"), Err(ClockError::UnknownClock));
        assert_eq!(cgu.lookup("ddr"), Ok(DDR));
        assert_eq!(cgu.name(MSC), Ok("msc"));
    }

    #[test]
    fn set_parent_rejects_non_mux_and_foreign_parent() {
        let (cgu, regs, _) = build(reference_regs());
        assert_eq!(cgu.set_parent(CPU, EXT), Err(ClockError::InvalidParent));
        assert_eq!(cgu.set_parent(PLL, EXT), Err(ClockError::InvalidParent));
        assert_eq!(cgu.set_parent(SCLK, RTC), Err(ClockError::InvalidParent));
        assert_eq!(regs.write_count(), 0);
    }

    #[test]
    fn set_parent_rejects_cycle() {
        let (cgu, regs, _) = build(reference_regs());
        assert_eq!(
            cgu.set_parent(ALT, ALT_DIV2),
            Err(ClockError::WouldCreateCycle)
        );
        assert_eq!(regs.write_count(), 0);
        assert_eq!(cgu.parent(ALT), Ok(Some(EXT)));
    }

    #[test]
    fn set_parent_is_idempotent() {
        let (cgu, regs, _) = build(reference_regs());
        cgu.set_parent(SCLK, EXT).unwrap();
        let after_first = regs.get(CPCCR);
        cgu.set_parent(SCLK, EXT).unwrap();
        assert_eq!(regs.get(CPCCR), after_first);
        assert_eq!(after_first >> 30, 1);
        assert_eq!(after_first & 0xf, 3);
        assert_eq!(cgu.parent(SCLK), Ok(Some(EXT)));
        assert_eq!(cgu.rate(CPU), Ok(6_000_000));
    }

    #[test]
    fn set_rate_matches_following_rate() {
        let (cgu, regs, _) = build(reference_regs());
        let actual = cgu.set_rate(CPU, 500_000_000).unwrap();
        assert_eq!(actual, 403_200_000);
        assert_eq!(cgu.rate(CPU), Ok(actual));
        assert_eq!(regs.get(CPCCR) & 0xf, 4);
        assert_ne!(regs.get(CPCCR) & (1 << 22), 0);
    }

    #[test]
    fn round_rate_does_not_write() {
        let (cgu, regs, _) = build(reference_regs());
        assert_eq!(cgu.round_rate(CPU, 500_000_000), Ok(403_200_000));
        assert_eq!(cgu.round_rate(SCLK, 1_000), Err(ClockError::NotSupported));
        assert_eq!(regs.write_count(), 0);
    }

    #[test]
    fn divider_overflow_is_rejected() {
        let (cgu, regs, _) = build(reference_regs());
        // 2016 MHz / 300 needs a ratio past the 8-bit field.
        assert_eq!(
            cgu.set_rate(MSC, 6_720_000),
            Err(ClockError::UnsupportedDivider)
        );
        assert_eq!(regs.write_count(), 0);
        assert_eq!(cgu.set_rate(MSC, 7_875_000), Ok(7_875_000));
    }

    #[test]
    fn divider_sequence_stops_writes_and_restarts() {
        let (cgu, regs, delay) = build(reference_regs().with_rule(Rule::BusyAfterWrite {
            reg: DDRCDR,
            mask: 1 << 28,
            reads: 3,
        }));
        assert_eq!(cgu.rate(DDR), Ok(1_008_000_000));
        cgu.set_parent(DDR, PLL).unwrap();
        regs.clear_writes();
        assert_eq!(cgu.set_rate(DDR, 504_000_000), Ok(504_000_000));
        let writes = regs.writes();
        assert_eq!(writes.len(), 3);
        assert_ne!(writes[0].1 & (1 << 27), 0);
        assert_eq!(writes[1].1 & 0xf, 3);
        assert_ne!(writes[1].1 & (1 << 29), 0);
        assert_eq!(writes[2].1 & (1 << 27), 0);
        assert!(delay.elapsed_us() > 0);
    }

    #[test]
    fn divider_busy_timeout() {
        let (cgu, _, delay) = build(reference_regs().with(DDRCDR, (1 << 30) | (1 << 28) | 1));
        assert_eq!(
            cgu.set_rate(DDR, 504_000_000),
            Err(ClockError::DividerBusyTimeout)
        );
        assert_eq!(delay.elapsed_us(), 100);
    }

    #[test]
    fn pll_reserved_od_leaves_registers_alone() {
        let (cgu, regs, _) = build(reference_regs());
        assert_eq!(
            cgu.set_pll_factors(PLL, PllFactors::new(42, 1, 5)),
            Err(ClockError::UnsupportedDivider)
        );
        assert_eq!(
            cgu.set_pll_factors(PLL, PllFactors::new(600, 1, 1)),
            Err(ClockError::InvalidFactors)
        );
        assert_eq!(regs.write_count(), 0);
        assert_eq!(cgu.rate(PLL), Ok(2_016_000_000));
    }

    #[test]
    fn pll_factors_set_and_read_back() {
        let (cgu, _, _) = build(reference_regs());
        assert_eq!(
            cgu.set_pll_factors(PLL, PllFactors::new(50, 1, 2)),
            Ok(1_200_000_000)
        );
        assert_eq!(cgu.pll_factors(PLL), Ok(Some(PllFactors::new(50, 1, 2))));
        assert_eq!(cgu.pll_factors(CPU), Err(ClockError::NotSupported));
    }

    #[test]
    fn pll_set_rate_waits_for_lock() {
        let regs = reference_regs()
            .with(APLL, (41 << 20) | 1)
            .with_rule(Rule::SetOnWrite {
                reg: APLL,
                mask: 1 << 3,
            });
        let (cgu, _, _) = build(regs);
        let actual = cgu.set_rate(PLL, 1_200_000_000).unwrap();
        assert_eq!(actual, 1_200_000_000);
        assert_eq!(cgu.rate(PLL), Ok(actual));
    }

    #[test]
    fn pll_huge_request_clamps_to_max_multiplier() {
        let (cgu, regs, _) = build(reference_regs());
        assert_eq!(cgu.round_rate(PLL, u64::MAX), Ok(12_288_000_000));
        assert_eq!(cgu.set_rate(SCLK, u64::MAX), Err(ClockError::NotSupported));
        assert_eq!(regs.write_count(), 0);

        assert_eq!(cgu.set_rate(PLL, u64::MAX), Ok(12_288_000_000));
        let ctl = regs.get(APLL);
        assert_eq!((ctl >> 20) & 0x1ff, 511);
        assert_eq!((ctl >> 14) & 0x3f, 1);
        assert_eq!((ctl >> 11) & 0x7, 0);
        assert_eq!(cgu.rate(PLL), Ok(12_288_000_000));
    }

    #[test]
    fn pll_not_stable() {
        let (cgu, _, delay) = build(reference_regs().with(APLL, (41 << 20) | 1));
        assert_eq!(
            cgu.set_rate(PLL, 1_200_000_000),
            Err(ClockError::PllNotStable)
        );
        assert_eq!(delay.elapsed_us(), 100);
        assert_eq!(cgu.enable(PLL), Err(ClockError::PllNotStable));
    }

    #[test]
    fn bypass_and_enable_are_independent() {
        let (cgu, regs, _) = build(reference_regs());
        assert_eq!(cgu.set_pll_bypass(PLL, true), Ok(24_000_000));
        assert_eq!(cgu.rate(CPU), Ok(6_000_000));
        assert_eq!(cgu.is_enabled(PLL), Ok(true));
        cgu.disable(PLL).unwrap();
        assert_eq!(cgu.is_pll_bypassed(PLL), Ok(true));
        assert_eq!(regs.get(APLL) & 1, 0);
        assert_eq!(cgu.set_pll_bypass(PLL, false), Ok(2_016_000_000));
        assert_eq!(cgu.set_pll_bypass(CPU, true), Err(ClockError::NotSupported));
    }

    #[test]
    fn enable_does_not_count() {
        let (cgu, regs, _) = build(reference_regs().with(CLKGR1, 1 << 15));
        assert_eq!(cgu.is_enabled(CPU), Ok(false));
        cgu.enable(CPU).unwrap();
        cgu.enable(CPU).unwrap();
        cgu.disable(CPU).unwrap();
        assert_eq!(cgu.is_enabled(CPU), Ok(false));
        assert_eq!(regs.get(CLKGR1), 1 << 15);
    }

    #[test]
    fn enable_without_gate_is_noop() {
        let (cgu, regs, _) = build(reference_regs());
        cgu.enable(SCLK).unwrap();
        cgu.disable(ALT_DIV2).unwrap();
        assert_eq!(regs.write_count(), 0);
        assert_eq!(cgu.is_enabled(SCLK), Ok(true));
    }

    #[test]
    fn custom_clock_dispatch() {
        let (cgu, regs, _) = build(reference_regs());
        assert_eq!(cgu.rate(PHY), Ok(12_000_000));
        cgu.enable(PHY).unwrap();
        assert_eq!(regs.get(USBPCR1), 1);
        assert_eq!(cgu.is_enabled(PHY), Ok(true));
        assert_eq!(cgu.set_rate(PHY, 24_000_000), Err(ClockError::NotSupported));
        assert_eq!(cgu.set_parent(PHY, EXT), Err(ClockError::InvalidParent));
        assert_eq!(cgu.caps(PHY), Ok(ClockCaps::CUSTOM));
    }

    #[test]
    fn orphan_runs_at_zero() {
        let (cgu, regs, _) = build(reference_regs());
        regs.set(CPCCR, 3);
        assert_eq!(cgu.parent(SCLK), Ok(None));
        assert_eq!(cgu.rate(SCLK), Ok(0));
        assert_eq!(cgu.rate(CPU), Ok(0));
    }

    #[test]
    fn loop_created_behind_our_back_is_reported() {
        let (cgu, regs, _) = build(reference_regs());
        regs.set(SSICDR, 1 << 29);
        assert_eq!(cgu.rate(ALT), Err(ClockError::WouldCreateCycle));
    }

    #[test]
    fn reporting_survives_a_loop() {
        let (cgu, regs, _) = build(reference_regs());
        let alt = Arc::new(Recorder::default());
        cgu.register_notifier(ALT_DIV2, alt.clone()).unwrap();
        regs.set(SSICDR, 1 << 29);

        let summary = cgu.summary();
        assert_eq!(summary[ALT].rate, 0);
        assert_eq!(summary[ALT_DIV2].rate, 0);
        assert_eq!(summary[CPU].rate, 504_000_000);

        cgu.set_parent(SCLK, EXT).unwrap();
        assert!(alt.changes.lock().unwrap().is_empty());
    }

    #[test]
    fn notifiers_see_descendant_changes() {
        let (cgu, _, _) = build(reference_regs());
        let cpu = Arc::new(Recorder::default());
        let msc = Arc::new(Recorder::default());
        cgu.register_notifier(CPU, cpu.clone()).unwrap();
        cgu.register_notifier("msc", msc.clone()).unwrap();
        cgu.set_parent(SCLK, EXT).unwrap();
        assert_eq!(
            *cpu.changes.lock().unwrap(),
            [RateChange {
                clock: CPU,
                old_rate: 504_000_000,
                new_rate: 6_000_000,
            }]
        );
        assert!(msc.changes.lock().unwrap().is_empty());

        let handle: Arc<dyn RateNotifier> = cpu.clone();
        cgu.unregister_notifier(CPU, &handle).unwrap();
        cgu.set_parent(SCLK, PLL).unwrap();
        assert_eq!(cpu.changes.lock().unwrap().len(), 1);
    }

    #[test]
    fn summary_lists_every_clock() {
        let (cgu, _, _) = build(reference_regs());
        let summary = cgu.summary();
        assert_eq!(summary.len(), CLOCKS.len());
        assert_eq!(summary[CPU].rate, 504_000_000);
        assert_eq!(summary[CPU].parent, Some(SCLK));
        assert_eq!(summary[EXT].parent, None);
    }

    #[test]
    fn gates_sharing_a_register_under_contention() {
        let (cgu, regs, _) = build(reference_regs());
        let cgu = Arc::new(cgu);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cgu = cgu.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        cgu.enable(G0 + i).unwrap();
                        cgu.disable(G0 + i).unwrap();
                    }
                    cgu.enable(G0 + i).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // g0..g2 clear to run, g3 sets to run.
        assert_eq!(regs.get(CLKGR0) & 0xf, 1 << 3);
        for i in 0..4 {
            assert_eq!(cgu.is_enabled(G0 + i), Ok(true));
        }
    }

    #[test]
    fn init_rejects_bad_tables() {
        let regs = Arc::new(reference_regs());
        let mut table = CLOCKS.to_vec();
        table[CPU].parents[0] = Some(40);
        let soc = SocInfo {
            clocks: &table,
            ..SOC
        };
        assert_eq!(
            Cgu::new(&soc, regs.clone(), FakeDelay::new(), config()).err(),
            Some(ConfigError::ParentOutOfRange {
                clock: "cpu",
                parent: 40
            })
        );

        let mut table = CLOCKS.to_vec();
        table[ALT_DIV2] = ClockInfo::fixed_divider("alt_div2", ALT, 0);
        let soc = SocInfo {
            clocks: &table,
            ..SOC
        };
        assert!(matches!(
            Cgu::new(&soc, regs.clone(), FakeDelay::new(), config()),
            Err(ConfigError::InvalidField {
                clock: "alt_div2",
                ..
            })
        ));

        let mut table = CLOCKS.to_vec();
        table[G0].name = "g1";
        let soc = SocInfo {
            clocks: &table,
            ..SOC
        };
        assert_eq!(
            Cgu::new(&soc, regs.clone(), FakeDelay::new(), config()).err(),
            Some(ConfigError::DuplicateName { clock: "g1" })
        );

        let missing = CguConfig::new().with_external("ext", 24_000_000);
        assert_eq!(
            Cgu::new(&SOC, regs.clone(), FakeDelay::new(), missing).err(),
            Some(ConfigError::MissingRate { clock: "rtc" })
        );

        let stray = config().with_external("cpu", 1);
        assert_eq!(
            Cgu::new(&SOC, regs, FakeDelay::new(), stray).err(),
            Some(ConfigError::UnknownExternal { clock: "cpu" })
        );
    }

    #[test]
    fn init_rejects_live_cycle() {
        let regs = Arc::new(reference_regs().with(SSICDR, 1 << 29));
        assert!(matches!(
            Cgu::new(&SOC, regs, FakeDelay::new(), config()),
            Err(ConfigError::Cycle { .. })
        ));
    }

    #[test]
    fn init_rejects_narrow_mux() {
        let regs = Arc::new(reference_regs());
        let mut table = CLOCKS.to_vec();
        table[SCLK] = ClockInfo::mux(
            "sclk_a",
            [None, Some(EXT), Some(PLL), None],
            MuxInfo::new(CPCCR, 30, 1),
        );
        let soc = SocInfo {
            clocks: &table,
            ..SOC
        };
        assert!(matches!(
            Cgu::new(&soc, regs, FakeDelay::new(), config()),
            Err(ConfigError::InvalidField {
                clock: "sclk_a",
                what: "mux field"
            })
        ));
    }
}
