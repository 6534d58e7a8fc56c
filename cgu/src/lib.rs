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

//! Clock generation unit core.
//!
//! A [`Cgu`] owns the clock nodes of one SoC, described by a static
//! [`SocInfo`] table, and serializes every register access behind a single
//! interrupt-safe lock. Nodes refer to each other by index only.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod clock;
pub mod config;
pub mod consumer;
pub mod error;
pub mod logger;
pub mod notify;
pub mod pm;
pub mod poll;
pub mod registry;
pub mod regs;
pub mod sync;

cfg_if::cfg_if! {
    if #[cfg(any(test, feature = "testing"))] {
        pub mod testing;
    }
}

pub use clock::{
    ClockCaps, ClockId, ClockInfo, ClockKind, CompositeInfo, CustomClock, DivInfo, GateInfo,
    GatePolarity, MuxInfo, PllFactors, PllInfo, SocInfo, MAX_PARENTS,
};
pub use config::CguConfig;
pub use consumer::{Clk, Clocks};
pub use error::{ClockError, ConfigError};
pub use notify::{RateChange, RateNotifier};
pub use pm::{PmEvent, ResumeHook};
pub use poll::PollTimeout;
pub use registry::{Cgu, ClockRef, ClockSummary};
pub use regs::{Field, Mmio, RegBit, RegisterIo};
