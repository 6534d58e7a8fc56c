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

use thiserror::Error;

/// Recoverable errors returned by clock operations.
///
/// None of these leave the clock graph in an inconsistent state, though a
/// timeout means the register write was committed and the hardware did not
/// confirm it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("Unknown clock")]
    UnknownClock,
    #[error("Invalid parent")]
    InvalidParent,
    #[error("Parent selection would create a cycle")]
    WouldCreateCycle,
    #[error("Unsupported divider")]
    UnsupportedDivider,
    #[error("PLL did not report stable")]
    PllNotStable,
    #[error("Divider change did not complete")]
    DividerBusyTimeout,
    #[error("Rate {0} Hz cannot be produced")]
    InvalidRate(u64),
    #[error("PLL factors out of range")]
    InvalidFactors,
    #[error("Operation not supported by this clock")]
    NotSupported,
}

/// Fatal errors found while validating a descriptor table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{clock}: parent index {parent} out of range")]
    ParentOutOfRange { clock: &'static str, parent: usize },
    #[error("{clock}: no parent declared")]
    NoParent { clock: &'static str },
    #[error("{clock}: part of a parent cycle")]
    Cycle { clock: &'static str },
    #[error("{clock}: duplicate clock name")]
    DuplicateName { clock: &'static str },
    #[error("{clock}: no rate configured for external clock")]
    MissingRate { clock: &'static str },
    #[error("{clock}: rate configured for a clock that is not external")]
    UnknownExternal { clock: &'static str },
    #[error("{clock}: invalid {what}")]
    InvalidField {
        clock: &'static str,
        what: &'static str,
    },
}
