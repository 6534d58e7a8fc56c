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

//! Suspend and resume of the CGU.

use crate::{error::ClockError, registry::Cgu, regs::RegisterIo};
use alloc::sync::Arc;
use embedded_hal::delay::DelayNs;
use log::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmEvent {
    /// The system is about to suspend.
    Enter,
    /// A suspend attempt was aborted after [`Enter`](Self::Enter).
    EnterFailed,
    Exit,
}

/// Restores SoC state the CGU loses across suspend, such as USB PHY
/// configuration.
pub trait ResumeHook: Send + Sync {
    fn resume(&self, regs: &dyn RegisterIo) -> Result<(), ClockError>;
}

impl<R: RegisterIo, D: DelayNs + Send> Cgu<R, D> {
    pub fn register_resume_hook(&self, hook: Arc<dyn ResumeHook>) {
        self.inner.irqsave_lock().resume_hooks.push(hook);
    }

    /// Puts the CGU into low power mode. A no-op on SoCs without one.
    pub fn on_suspend(&self) {
        let _guard = self.inner.irqsave_lock();
        if let Some(bit) = self.low_power {
            bit.write(&self.regs, true);
            debug!("{}: low power on", self.soc_name());
        }
    }

    /// Leaves low power mode and runs every resume hook. All hooks run even
    /// if one fails; the first failure is returned.
    pub fn on_resume(&self) -> Result<(), ClockError> {
        let inner = self.inner.irqsave_lock();
        if let Some(bit) = self.low_power {
            bit.write(&self.regs, false);
            debug!("{}: low power off", self.soc_name());
        }
        let mut result = Ok(());
        for hook in &inner.resume_hooks {
            if let Err(e) = hook.resume(&self.regs) {
                error!("{}: resume hook failed: {}", self.soc_name(), e);
                result = result.and(Err(e));
            }
        }
        result
    }

    pub fn notify_pm(&self, event: PmEvent) -> Result<(), ClockError> {
        match event {
            PmEvent::Enter => {
                self.on_suspend();
                Ok(())
            }
            PmEvent::EnterFailed => {
                warn!("{}: suspend aborted", self.soc_name());
                self.on_resume()
            }
            PmEvent::Exit => self.on_resume(),
        }
    }
}
