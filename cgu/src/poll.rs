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

use embedded_hal::delay::DelayNs;

/// Bounded wait: at most `attempts` sleeps of `interval_us` each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimeout {
    pub attempts: u32,
    pub interval_us: u32,
}

impl PollTimeout {
    pub const fn new(attempts: u32, interval_us: u32) -> Self {
        Self {
            attempts,
            interval_us,
        }
    }

    pub const fn total_us(&self) -> u64 {
        self.attempts as u64 * self.interval_us as u64
    }
}

/// Polls `cond` until it holds or the budget runs out.
///
/// `cond` is checked once up front and once after every sleep, so a zero
/// budget still gives the hardware one look.
pub fn poll_until<D, F>(delay: &mut D, timeout: PollTimeout, mut cond: F) -> bool
where
    D: DelayNs + ?Sized,
    F: FnMut() -> bool,
{
    for _ in 0..timeout.attempts {
        if cond() {
            return true;
        }
        delay.delay_us(timeout.interval_us);
    }
    cond()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDelay;

    #[test]
    fn returns_early_when_ready() {
        let mut delay = FakeDelay::new();
        assert!(poll_until(&mut delay, PollTimeout::new(10, 5), || true));
        assert_eq!(delay.elapsed_us(), 0);
    }

    #[test]
    fn gives_up_after_budget() {
        let mut delay = FakeDelay::new();
        let mut checks = 0;
        let ok = poll_until(&mut delay, PollTimeout::new(4, 25), || {
            checks += 1;
            false
        });
        assert!(!ok);
        assert_eq!(checks, 5);
        assert_eq!(delay.elapsed_us(), 100);
    }

    #[test]
    fn succeeds_on_last_check() {
        let mut delay = FakeDelay::new();
        let mut checks = 0;
        let ok = poll_until(&mut delay, PollTimeout::new(3, 1), || {
            checks += 1;
            checks == 4
        });
        assert!(ok);
    }
}
