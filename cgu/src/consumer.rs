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

//! Reference-counted clock handles for device drivers.
//!
//! The [`Cgu`] itself does not count enables. Drivers sharing a clock take a
//! [`Clk`] from [`Clocks`] instead: hardware is switched on by the first
//! enable and off by the last disable.

use crate::{
    clock::ClockId,
    error::ClockError,
    registry::{Cgu, ClockRef},
    regs::RegisterIo,
    sync::SpinLock,
};
use alloc::{sync::Arc, vec, vec::Vec};
use embedded_hal::delay::DelayNs;
use log::warn;

pub struct Clocks<R, D> {
    cgu: Arc<Cgu<R, D>>,
    counts: SpinLock<Vec<usize>>,
}

impl<R: RegisterIo, D: DelayNs + Send> Clocks<R, D> {
    pub fn new(cgu: Arc<Cgu<R, D>>) -> Arc<Self> {
        let counts = SpinLock::new(vec![0; cgu.len()]);
        Arc::new(Self { cgu, counts })
    }

    pub fn cgu(&self) -> &Arc<Cgu<R, D>> {
        &self.cgu
    }

    /// Handle to `clk`. Getting a handle does not enable anything.
    pub fn get<'a>(self: &Arc<Self>, clk: impl Into<ClockRef<'a>>) -> Result<Clk<R, D>, ClockError> {
        let id = self.cgu.resolve(clk.into())?;
        Ok(Clk {
            clocks: self.clone(),
            id,
            enabled: 0,
        })
    }

    /// Outstanding enables of `clk` over all handles.
    pub fn enable_count<'a>(&self, clk: impl Into<ClockRef<'a>>) -> Result<usize, ClockError> {
        let id = self.cgu.resolve(clk.into())?;
        Ok(self.counts.irqsave_lock()[id])
    }

    fn enable(&self, id: ClockId) -> Result<(), ClockError> {
        let mut counts = self.counts.irqsave_lock();
        if counts[id] == 0 {
            self.cgu.enable(id)?;
        }
        counts[id] += 1;
        Ok(())
    }

    fn disable(&self, id: ClockId) -> Result<(), ClockError> {
        let mut counts = self.counts.irqsave_lock();
        match counts[id] {
            0 => {
                warn!("{}: unbalanced disable of {}", self.cgu.soc_name(), id);
                Ok(())
            }
            1 => {
                self.cgu.disable(id)?;
                counts[id] = 0;
                Ok(())
            }
            _ => {
                counts[id] -= 1;
                Ok(())
            }
        }
    }
}

/// A driver's reference to one clock.
pub struct Clk<R: RegisterIo, D: DelayNs + Send> {
    clocks: Arc<Clocks<R, D>>,
    id: ClockId,
    enabled: usize,
}

impl<R: RegisterIo, D: DelayNs + Send> Clk<R, D> {
    pub fn id(&self) -> ClockId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.clocks.cgu.name(self.id).unwrap_or("?")
    }

    pub fn prepare_enable(&mut self) -> Result<(), ClockError> {
        self.clocks.enable(self.id)?;
        self.enabled += 1;
        Ok(())
    }

    /// Drops one enable taken through this handle; extra calls only warn.
    pub fn disable_unprepare(&mut self) -> Result<(), ClockError> {
        if self.enabled == 0 {
            warn!("{}: disable without enable", self.name());
            return Ok(());
        }
        self.clocks.disable(self.id)?;
        self.enabled -= 1;
        Ok(())
    }

    pub fn is_enabled(&self) -> Result<bool, ClockError> {
        self.clocks.cgu.is_enabled(self.id)
    }

    pub fn rate(&self) -> Result<u64, ClockError> {
        self.clocks.cgu.rate(self.id)
    }

    pub fn round_rate(&self, rate: u64) -> Result<u64, ClockError> {
        self.clocks.cgu.round_rate(self.id, rate)
    }

    pub fn set_rate(&self, rate: u64) -> Result<u64, ClockError> {
        self.clocks.cgu.set_rate(self.id, rate)
    }

    pub fn parent(&self) -> Result<Option<ClockId>, ClockError> {
        self.clocks.cgu.parent(self.id)
    }

    pub fn set_parent<'a>(&self, parent: impl Into<ClockRef<'a>>) -> Result<(), ClockError> {
        self.clocks.cgu.set_parent(self.id, parent)
    }
}

impl<R: RegisterIo, D: DelayNs + Send> Drop for Clk<R, D> {
    fn drop(&mut self) {
        if self.enabled == 0 {
            return;
        }
        warn!("{}: handle dropped with {} enables", self.name(), self.enabled);
        while self.enabled > 0 {
            if self.clocks.disable(self.id).is_err() {
                break;
            }
            self.enabled -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::{ClockInfo, GateInfo, SocInfo},
        config::CguConfig,
        testing::{FakeDelay, FakeRegisters},
    };

    static CLOCKS: [ClockInfo; 3] = [
        ClockInfo::external("ext"),
        ClockInfo::gate("uart0", 0, GateInfo::new(0x20, 14)),
        ClockInfo::gate("uart1", 0, GateInfo::new(0x20, 15)),
    ];

    fn clocks() -> (Arc<Clocks<Arc<FakeRegisters>, FakeDelay>>, Arc<FakeRegisters>) {
        let regs = Arc::new(FakeRegisters::new().with(0x20, 0xc000));
        let soc = SocInfo {
            name: "test",
            clocks: &CLOCKS,
            low_power: None,
        };
        let config = CguConfig::new().with_external("ext", 24_000_000);
        let cgu = Cgu::new(&soc, regs.clone(), FakeDelay::new(), config).unwrap();
        (Clocks::new(Arc::new(cgu)), regs)
    }

    #[test]
    fn last_disable_gates() {
        let (clocks, regs) = clocks();
        let mut a = clocks.get("uart0").unwrap();
        let mut b = clocks.get(1usize).unwrap();
        a.prepare_enable().unwrap();
        b.prepare_enable().unwrap();
        b.prepare_enable().unwrap();
        assert_eq!(clocks.enable_count("uart0"), Ok(3));
        assert_eq!(regs.get(0x20) & (1 << 14), 0);

        a.disable_unprepare().unwrap();
        b.disable_unprepare().unwrap();
        assert_eq!(b.is_enabled(), Ok(true));
        b.disable_unprepare().unwrap();
        assert_eq!(b.is_enabled(), Ok(false));
        assert_eq!(regs.get(0x20), 0xc000);
    }

    #[test]
    fn extra_disable_is_ignored() {
        let (clocks, regs) = clocks();
        let mut a = clocks.get("uart1").unwrap();
        a.disable_unprepare().unwrap();
        assert_eq!(regs.write_count(), 0);
        assert_eq!(clocks.enable_count("uart1"), Ok(0));
    }

    #[test]
    fn drop_releases_enables() {
        let (clocks, regs) = clocks();
        let mut other = clocks.get("uart0").unwrap();
        other.prepare_enable().unwrap();
        {
            let mut a = clocks.get("uart0").unwrap();
            a.prepare_enable().unwrap();
            a.prepare_enable().unwrap();
        }
        assert_eq!(clocks.enable_count("uart0"), Ok(1));
        assert_eq!(regs.get(0x20) & (1 << 14), 0);
        drop(other);
        assert_eq!(regs.get(0x20) & (1 << 14), 1 << 14);
    }

    #[test]
    fn handle_forwards_queries() {
        let (clocks, _) = clocks();
        let clk = clocks.get("uart0").unwrap();
        assert_eq!(clk.name(), "uart0");
        assert_eq!(clk.rate(), Ok(24_000_000));
        assert_eq!(clk.parent(), Ok(Some(0)));
        assert_eq!(clk.set_rate(1_000), Err(ClockError::NotSupported));
        assert!(clocks.get("nope").is_err());
    }
}
