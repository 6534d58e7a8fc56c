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

use crate::sync::SpinLock;
use core::fmt;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use spin::Once;

static LOGGER_MUTEX: SpinLock<()> = SpinLock::new(());
static CONSOLE: Once<&'static dyn Console> = Once::new();

/// Output sink for log lines, usually the board's debug UART.
pub trait Console: Sync {
    fn write_line(&self, args: fmt::Arguments<'_>);
}

struct Logger;

pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

///set max log level
pub fn set_max_level(level: LogLevel) {
    match level {
        LogLevel::Trace => log::set_max_level(LevelFilter::Trace),
        LogLevel::Debug => log::set_max_level(LevelFilter::Debug),
        LogLevel::Info => log::set_max_level(LevelFilter::Info),
        LogLevel::Warn => log::set_max_level(LevelFilter::Warn),
        LogLevel::Error => log::set_max_level(LevelFilter::Error),
    }
}

/// log init
pub fn logger_init(console: &'static dyn Console) -> Result<(), SetLoggerError> {
    static LOGGER: Logger = Logger {};
    CONSOLE.call_once(|| console);
    log::set_logger(&LOGGER)?;
    #[cfg(debug_assertions)]
    log::set_max_level(LevelFilter::Trace);
    #[cfg(not(debug_assertions))]
    log::set_max_level(LevelFilter::Warn);
    Ok(())
}

///impl log for Logger
impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(console) = CONSOLE.get() else {
            return;
        };
        let _guard = LOGGER_MUTEX.irqsave_lock();
        console.write_line(format_args!(
            "[{}][{}] {}",
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{string::String, sync::Mutex, vec::Vec};

    struct Capture {
        lines: Mutex<Vec<String>>,
    }

    impl Console for Capture {
        fn write_line(&self, args: fmt::Arguments<'_>) {
            self.lines.lock().unwrap().push(std::format!("{}", args));
        }
    }

    static CAPTURE: Capture = Capture {
        lines: Mutex::new(Vec::new()),
    };

    #[test]
    fn records_reach_console() {
        logger_init(&CAPTURE).unwrap();
        log::warn!(target: "cgu-test", "pll lost lock");
        let lines = CAPTURE.lines.lock().unwrap();
        assert!(lines
            .iter()
            .any(|l| l == "[WARN][cgu-test] pll lost lock"));
    }
}
