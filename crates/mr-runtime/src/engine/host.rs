use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

static NEXT_HOST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct HostRuntime {
    id: u64,
    lock: Mutex<()>,
}

impl HostRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_HOST_ID.fetch_add(1, Ordering::Relaxed),
            lock: Mutex::new(()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn enter(&self) -> HostGuard<'_> {
        HostGuard {
            runtime: self,
            guard: self.lock.lock(),
        }
    }

    pub fn try_enter(&self) -> Option<HostGuard<'_>> {
        self.lock.try_lock().map(|guard| HostGuard {
            runtime: self,
            guard,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }
}

pub struct HostGuard<'a> {
    runtime: &'a HostRuntime,
    guard: MutexGuard<'a, ()>,
}

impl HostGuard<'_> {
    pub fn runtime(&self) -> &HostRuntime {
        self.runtime
    }

    pub fn without_lock<R>(&mut self, f: impl FnOnce() -> R) -> R {
        MutexGuard::unlocked(&mut self.guard, f)
    }
}
