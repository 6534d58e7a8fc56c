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

use crate::poll::PollTimeout;
use alloc::vec::Vec;

/// PLL lock wait: 1000 polls, 100us apart.
pub const PLL_STABLE_POLL: PollTimeout = PollTimeout::new(1000, 100);
/// Divider busy wait: 1000 polls, 100us apart.
pub const DIV_BUSY_POLL: PollTimeout = PollTimeout::new(1000, 100);

/// Runtime parameters handed to [`Cgu::new`](crate::Cgu::new).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CguConfig {
    /// Fixed rate of every external oscillator, keyed by clock name.
    pub external_rates: Vec<(&'static str, u64)>,
    pub pll_stable: PollTimeout,
    pub div_busy: PollTimeout,
}

impl CguConfig {
    pub fn new() -> Self {
        Self {
            external_rates: Vec::new(),
            pll_stable: PLL_STABLE_POLL,
            div_busy: DIV_BUSY_POLL,
        }
    }

    /// Sets the rate of external clock `name`, replacing an earlier entry.
    pub fn with_external(mut self, name: &'static str, rate: u64) -> Self {
        self.external_rates.retain(|(n, _)| *n != name);
        self.external_rates.push((name, rate));
        self
    }

    pub fn with_pll_stable_timeout(mut self, timeout: PollTimeout) -> Self {
        self.pll_stable = timeout;
        self
    }

    pub fn with_div_busy_timeout(mut self, timeout: PollTimeout) -> Self {
        self.div_busy = timeout;
        self
    }

    pub fn external_rate(&self, name: &str) -> Option<u64> {
        self.external_rates
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, rate)| *rate)
    }
}

impl Default for CguConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_external_rate_wins() {
        let config = CguConfig::new()
            .with_external("ext", 12_000_000)
            .with_external("ext", 24_000_000);
        assert_eq!(config.external_rate("ext"), Some(24_000_000));
        assert_eq!(config.external_rates.len(), 1);
        assert_eq!(config.external_rate("rtc"), None);
    }

    #[test]
    fn defaults() {
        let config = CguConfig::default();
        assert_eq!(config.pll_stable.total_us(), 100_000);
        assert_eq!(config.div_busy, DIV_BUSY_POLL);
    }
}
