//! Per-instance execution lock.
//!
//! Ownership is tracked per thread so a host callback running deep inside an
//! evaluation can hand the lock back for the duration of the host call and
//! take it again afterwards, without access to the guard that acquired it.

use std::marker::PhantomData;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Ownership {
    owner: Option<ThreadId>,
    depth: usize,
}

#[derive(Debug, Default)]
pub(crate) struct ExecLock {
    state: Mutex<Ownership>,
    released: Condvar,
}

impl ExecLock {
    pub(crate) fn acquire(&self) -> ExecGuard<'_> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    break;
                }
                Some(owner) if owner == me => {
                    state.depth += 1;
                    break;
                }
                Some(_) => self.released.wait(&mut state),
            }
        }
        ExecGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    pub(crate) fn is_held_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    pub(crate) fn unlocked<R>(&self, f: impl FnOnce() -> R) -> R {
        let me = thread::current().id();
        let depth = {
            let mut state = self.state.lock();
            if state.owner != Some(me) {
                drop(state);
                tracing::warn!("execution lock released by a thread that does not own it");
                return f();
            }
            let depth = state.depth;
            state.owner = None;
            state.depth = 0;
            depth
        };
        self.released.notify_all();

        let _restore = Restore { lock: self, depth };
        f()
    }

    fn reacquire(&self, depth: usize) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        while state.owner.is_some() {
            self.released.wait(&mut state);
        }
        state.owner = Some(me);
        state.depth = depth;
    }

    fn release_one(&self) {
        let mut state = self.state.lock();
        debug_assert_eq!(state.owner, Some(thread::current().id()));
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.released.notify_all();
        }
    }
}

struct Restore<'a> {
    lock: &'a ExecLock,
    depth: usize,
}

impl Drop for Restore<'_> {
    fn drop(&mut self) {
        self.lock.reacquire(self.depth);
    }
}

pub(crate) struct ExecGuard<'a> {
    lock: &'a ExecLock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ExecGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_one();
    }
}
