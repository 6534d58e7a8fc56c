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

//! Rate change notification.
//!
//! Subscribers are told after the CGU lock is released, so a notifier may
//! call back into the [`Cgu`](crate::Cgu).

use crate::{
    clock::ClockId,
    error::ClockError,
    regs::RegisterIo,
    registry::{Cgu, ClockRef},
};
use alloc::{sync::Arc, vec::Vec};
use embedded_hal::delay::DelayNs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateChange {
    pub clock: ClockId,
    pub old_rate: u64,
    pub new_rate: u64,
}

pub trait RateNotifier: Send + Sync {
    fn rate_changed(&self, change: &RateChange);
}

pub(crate) struct Subscription {
    pub clock: ClockId,
    pub notifier: Arc<dyn RateNotifier>,
}

/// Rates of every watched clock, in subscription order.
pub(crate) struct Snapshot(Vec<u64>);

impl<R: RegisterIo, D: DelayNs + Send> Cgu<R, D> {
    /// Subscribes `notifier` to rate changes of `clk`, including changes
    /// caused by reconfiguring any of its ancestors.
    pub fn register_notifier<'a>(
        &self,
        clk: impl Into<ClockRef<'a>>,
        notifier: Arc<dyn RateNotifier>,
    ) -> Result<(), ClockError> {
        let clock = self.resolve(clk.into())?;
        self.inner
            .irqsave_lock()
            .subscriptions
            .push(Subscription { clock, notifier });
        Ok(())
    }

    /// Drops every subscription of `notifier` to `clk`.
    pub fn unregister_notifier<'a>(
        &self,
        clk: impl Into<ClockRef<'a>>,
        notifier: &Arc<dyn RateNotifier>,
    ) -> Result<(), ClockError> {
        let clock = self.resolve(clk.into())?;
        self.inner
            .irqsave_lock()
            .subscriptions
            .retain(|s| !(s.clock == clock && Arc::ptr_eq(&s.notifier, notifier)));
        Ok(())
    }

    pub(crate) fn snapshot(&self, subscriptions: &[Subscription]) -> Snapshot {
        Snapshot(
            subscriptions
                .iter()
                .map(|s| self.rate_or_zero_locked(s.clock))
                .collect(),
        )
    }

    /// Pairs each subscriber whose clock changed rate since `before` with
    /// the change.
    pub(crate) fn changes_since(
        &self,
        subscriptions: &[Subscription],
        before: Snapshot,
    ) -> Vec<(Arc<dyn RateNotifier>, RateChange)> {
        subscriptions
            .iter()
            .zip(before.0)
            .filter_map(|(s, old_rate)| {
                let new_rate = self.rate_or_zero_locked(s.clock);
                (new_rate != old_rate).then(|| {
                    (
                        s.notifier.clone(),
                        RateChange {
                            clock: s.clock,
                            old_rate,
                            new_rate,
                        },
                    )
                })
            })
            .collect()
    }
}
