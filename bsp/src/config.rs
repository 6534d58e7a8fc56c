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

use blue_cgu::CguConfig;

/// Main crystal feeding EXCLK.
pub const EXCLK_FREQ: u64 = 24_000_000;
/// RTC crystal.
pub const RTCLK_FREQ: u64 = 32_768;

pub fn default_config() -> CguConfig {
    CguConfig::new()
        .with_external("ext", EXCLK_FREQ)
        .with_external("rtc", RTCLK_FREQ)
}
