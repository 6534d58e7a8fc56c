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

use crate::{error::ClockError, regs::RegisterIo};

/// Operations of a clock that does not fit the PLL/mux/divider/gate model.
///
/// Every method runs with the CGU lock held and gets direct register access.
/// The defaults describe an always-on pass-through clock with a single
/// parent.
pub trait CustomClock: Sync {
    fn enable(&self, _regs: &dyn RegisterIo) -> Result<(), ClockError> {
        Ok(())
    }

    fn disable(&self, _regs: &dyn RegisterIo) -> Result<(), ClockError> {
        Ok(())
    }

    fn is_enabled(&self, _regs: &dyn RegisterIo) -> bool {
        true
    }

    fn recalc_rate(&self, _regs: &dyn RegisterIo, parent_rate: u64) -> u64 {
        parent_rate
    }

    fn round_rate(
        &self,
        _regs: &dyn RegisterIo,
        _rate: u64,
        _parent_rate: u64,
    ) -> Result<u64, ClockError> {
        Err(ClockError::NotSupported)
    }

    /// Called with a rate previously returned by [`round_rate`](Self::round_rate).
    fn set_rate(
        &self,
        _regs: &dyn RegisterIo,
        _rate: u64,
        _parent_rate: u64,
    ) -> Result<(), ClockError> {
        Err(ClockError::NotSupported)
    }

    /// Currently selected parent slot.
    fn parent(&self, _regs: &dyn RegisterIo) -> usize {
        0
    }

    fn set_parent(&self, _regs: &dyn RegisterIo, _slot: usize) -> Result<(), ClockError> {
        Err(ClockError::InvalidParent)
    }

    /// Whether [`set_parent`](Self::set_parent) is implemented.
    fn has_mux(&self) -> bool {
        false
    }
}
