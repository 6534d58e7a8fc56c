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

use core::{
    ops::{Deref, DerefMut},
    sync::atomic::{compiler_fence, Ordering},
};
use spin::{Mutex, MutexGuard, Once};

/// Local interrupt control supplied by the platform.
pub trait IrqOps: Sync {
    /// Masks local interrupts and returns the previous state.
    fn disable_local_irq_save(&self) -> usize;

    fn enable_local_irq_restore(&self, old: usize);
}

struct NoIrq;

impl IrqOps for NoIrq {
    fn disable_local_irq_save(&self) -> usize {
        0
    }

    fn enable_local_irq_restore(&self, _old: usize) {}
}

static NO_IRQ: NoIrq = NoIrq;
static IRQ_OPS: Once<&'static dyn IrqOps> = Once::new();

/// Installs the platform interrupt control. Only the first call has effect.
pub fn set_irq_ops(ops: &'static dyn IrqOps) {
    IRQ_OPS.call_once(|| ops);
}

fn irq_ops() -> &'static dyn IrqOps {
    match IRQ_OPS.get() {
        Some(ops) => *ops,
        None => &NO_IRQ,
    }
}

#[derive(Debug)]
pub struct DisableInterruptGuard {
    old: usize,
}

impl DisableInterruptGuard {
    #[inline]
    pub fn new() -> Self {
        Self {
            old: irq_ops().disable_local_irq_save(),
        }
    }
}

impl Default for DisableInterruptGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DisableInterruptGuard {
    #[inline]
    fn drop(&mut self) {
        irq_ops().enable_local_irq_restore(self.old);
    }
}

#[derive(Debug)]
pub struct SpinLock<T: ?Sized> {
    lock: Mutex<T>,
}

// See https://doc.rust-lang.org/reference/destructors.html#r-destructors.operation for dropping orders.
#[derive(Debug)]
pub struct SpinLockGuard<'a, T: ?Sized> {
    mutex_guard: MutexGuard<'a, T>,
    irq_guard: Option<DisableInterruptGuard>,
}

impl<'a, T: 'a + ?Sized> Deref for SpinLockGuard<'a, T> {
    type Target = T;
    #[inline]
    fn deref(&self) -> &T {
        self.mutex_guard.deref()
    }
}

impl<'a, T: 'a + ?Sized> DerefMut for SpinLockGuard<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        self.mutex_guard.deref_mut()
    }
}

impl<T> SpinLock<T> {
    pub const fn new(val: T) -> Self {
        Self {
            lock: Mutex::new(val),
        }
    }
}

impl<T: ?Sized> SpinLock<T> {
    pub fn try_irqsave_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        let irq_guard = DisableInterruptGuard::new();
        compiler_fence(Ordering::SeqCst);
        let mut guard = self.try_lock()?;
        debug_assert!(guard.irq_guard.is_none());
        guard.irq_guard = Some(irq_guard);
        Some(guard)
    }

    /// Spins with local interrupts masked until the lock is taken.
    pub fn irqsave_lock(&self) -> SpinLockGuard<'_, T> {
        loop {
            let Some(l) = self.try_irqsave_lock() else {
                core::hint::spin_loop();
                continue;
            };
            return l;
        }
    }

    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        let mutex_guard = self.lock.try_lock()?;
        Some(SpinLockGuard {
            irq_guard: None,
            mutex_guard,
        })
    }

    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        loop {
            let Some(l) = self.try_lock() else {
                core::hint::spin_loop();
                continue;
            };
            return l;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    struct CountingIrq {
        saved: AtomicUsize,
        restored: AtomicUsize,
    }

    impl IrqOps for CountingIrq {
        fn disable_local_irq_save(&self) -> usize {
            self.saved.fetch_add(1, Ordering::SeqCst);
            0x80
        }

        fn enable_local_irq_restore(&self, _old: usize) {
            self.restored.fetch_add(1, Ordering::SeqCst);
        }
    }

    static COUNTING: CountingIrq = CountingIrq {
        saved: AtomicUsize::new(0),
        restored: AtomicUsize::new(0),
    };

    #[test]
    fn irqsave_lock_masks_and_restores() {
        set_irq_ops(&COUNTING);
        let lock = SpinLock::new(5u32);
        let saved = COUNTING.saved.load(Ordering::SeqCst);
        let restored = COUNTING.restored.load(Ordering::SeqCst);
        {
            let mut guard = lock.irqsave_lock();
            *guard += 1;
            assert!(COUNTING.saved.load(Ordering::SeqCst) > saved);
        }
        assert!(COUNTING.restored.load(Ordering::SeqCst) > restored);
        assert_eq!(*lock.lock(), 6);
    }

    #[test]
    fn try_lock_fails_while_held() {
        let lock = SpinLock::new(());
        let _guard = lock.irqsave_lock();
        assert!(lock.try_lock().is_none());
        assert!(lock.try_irqsave_lock().is_none());
    }

    #[test]
    fn serializes_threads() {
        let lock = Arc::new(SpinLock::new(0usize));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = lock.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        *lock.irqsave_lock() += 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*lock.lock(), 4000);
    }
}
