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

//! Whole-table scenarios on the Ingenic SoCs, driven through fake registers.

use blue_bsp::ingenic::{jz4775, x1830, x2000, CLKGR0, CPCCR, LCR, USBPCR1};
use blue_cgu::{
    testing::{FakeDelay, FakeRegisters},
    Cgu, Clocks, ClockError, PmEvent, RateChange, RateNotifier,
};
use std::sync::{Arc, Mutex};

type FakeCgu = Cgu<Arc<FakeRegisters>, FakeDelay>;

/// APLL at 2016 MHz: M = 42, N = 1, OD = 1, locked.
const APLL_2016M: u32 = (41 << 20) | (1 << 3) | 1;

fn x1830_booted() -> (FakeCgu, Arc<FakeRegisters>) {
    let regs = Arc::new(
        FakeRegisters::new()
            .with(x1830::CPAPCR, APLL_2016M)
            .with(CPCCR, (2 << 30) | (1 << 28) | 3)
            .with(CLKGR0, 0xffff_ffff),
    );
    let cgu = x1830::cgu(regs.clone(), FakeDelay::new()).unwrap();
    (cgu, regs)
}

#[derive(Default)]
struct Recorder(Mutex<Vec<RateChange>>);

impl RateNotifier for Recorder {
    fn rate_changed(&self, change: &RateChange) {
        self.0.lock().unwrap().push(*change);
    }
}

#[test]
fn x1830_cpu_runs_at_504mhz() {
    use x1830::clk::*;

    let (cgu, _) = x1830_booted();
    assert_eq!(cgu.rate(APLL), Ok(2_016_000_000));
    assert_eq!(cgu.parent(SCLKA), Ok(Some(APLL)));
    assert_eq!(cgu.parent(CPUMUX), Ok(Some(SCLKA)));
    assert_eq!(cgu.rate("cpu"), Ok(504_000_000));
    assert_eq!(cgu.rate(UART0), Ok(24_000_000));
    assert_eq!(cgu.rate(EXCLK_DIV512), Ok(24_000_000 / 512));
}

#[test]
fn x1830_cpu_reclock_and_reparent() {
    use x1830::clk::*;

    let (cgu, _) = x1830_booted();
    let recorder = Arc::new(Recorder::default());
    cgu.register_notifier(CPU, recorder.clone()).unwrap();

    assert_eq!(cgu.set_rate(CPU, 1_008_000_000), Ok(1_008_000_000));
    assert_eq!(cgu.rate(CPU), Ok(1_008_000_000));

    // MPLL is still at its reset value: M = 1, N = 1, OD = 1.
    cgu.set_parent(CPUMUX, MPLL).unwrap();
    assert_eq!(cgu.rate(CPU), Ok(24_000_000));

    let changes = recorder.0.lock().unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].old_rate, 504_000_000);
    assert_eq!(changes[1].new_rate, 24_000_000);
}

#[test]
fn shared_uart_gate_through_handles() {
    let (cgu, regs) = x1830_booted();
    let clocks = Clocks::new(Arc::new(cgu));
    let mut console = clocks.get("uart0").unwrap();
    let mut tty = clocks.get(x1830::clk::UART0).unwrap();

    console.prepare_enable().unwrap();
    tty.prepare_enable().unwrap();
    assert_eq!(regs.get(CLKGR0) & (1 << 14), 0);
    console.disable_unprepare().unwrap();
    assert_eq!(tty.is_enabled(), Ok(true));
    tty.disable_unprepare().unwrap();
    assert_eq!(regs.get(CLKGR0) & (1 << 14), 1 << 14);
}

#[test]
fn x1830_low_power_across_suspend() {
    let (cgu, regs) = x1830_booted();
    cgu.notify_pm(PmEvent::Enter).unwrap();
    assert_eq!(regs.get(LCR) & 1, 1);
    cgu.notify_pm(PmEvent::Exit).unwrap();
    assert_eq!(regs.get(LCR) & 1, 0);
}

#[test]
fn jz4775_usb_phys() {
    use jz4775::clk::*;

    let regs = Arc::new(FakeRegisters::new());
    let cgu = jz4775::cgu(regs.clone(), FakeDelay::new()).unwrap();
    assert_eq!(cgu.rate(OTGPHY), Ok(12_000_000));
    assert_eq!(cgu.round_rate(OTGPHY, 20_000_000), Ok(19_200_000));
    assert_eq!(cgu.set_rate(OTGPHY, 20_000_000), Ok(19_200_000));
    assert_eq!(regs.get(USBPCR1) >> 24, 3);

    assert_eq!(cgu.is_enabled(UHCPHY), Ok(false));
    cgu.enable("uhc_phy").unwrap();
    assert_eq!(cgu.is_enabled(UHCPHY), Ok(true));
    assert_eq!(regs.get(USBPCR1) & (1 << 17), 1 << 17);
}

#[test]
fn jz4775_resume_retunes_uhc_phy() {
    let regs = Arc::new(FakeRegisters::new());
    let cgu = jz4775::cgu(regs.clone(), FakeDelay::new()).unwrap();
    cgu.register_resume_hook(Arc::new(jz4775::UhcPhyResume));
    cgu.enable(jz4775::clk::UHCPHY).unwrap();

    // Tuning lost while asleep.
    regs.set(USBPCR1, regs.get(USBPCR1) & !((3 << 12) | (7 << 6)));
    cgu.on_suspend();
    cgu.on_resume().unwrap();
    assert_eq!(regs.get(USBPCR1), (1 << 17) | (1 << 12) | (1 << 6));
    assert_eq!(regs.get(LCR), 0);
}

#[test]
fn x2000_summary_covers_every_clock() {
    let cgu = x2000::cgu(FakeRegisters::new(), FakeDelay::new()).unwrap();
    let summary = cgu.summary();
    assert_eq!(summary.len(), x2000::clk::COUNT);
    let uart9 = &summary[x2000::clk::UART9];
    assert_eq!(uart9.name, "uart9");
    assert_eq!(uart9.rate, 24_000_000);
    assert_eq!(uart9.parent, Some(x2000::clk::EXCLK));
    // Reset value of CLKGR1 leaves every gate open.
    assert!(uart9.enabled);
}

#[test]
fn unknown_names_are_rejected() {
    let cgu = x2000::cgu(FakeRegisters::new(), FakeDelay::new()).unwrap();
    assert_eq!(cgu.rate("uart10"), Err(ClockError::UnknownClock));
    assert_eq!(cgu.set_rate("i2s0", 0), Err(ClockError::InvalidRate(0)));
}
