//! AML `Mutex` and `Event` objects.
//!
//! Both are built on a [`Blocker`] supplied by the kernel: the scheduler's
//! block/wake primitive plus a millisecond clock. Internal state lives under
//! a short spin lock that is always released before the calling thread
//! blocks.
//!
//! `Blocker` must have park/unpark semantics: an `unblock` delivered before
//! the target thread reaches `block_*` makes that next `block_*` return
//! immediately. Spurious returns are allowed; both objects re-check their
//! state in a loop.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use spin::Mutex as SpinMutex;

use crate::error::AmlError;

/// Timeout value meaning "wait forever".
pub const WAIT_FOREVER: u16 = 0xFFFF;

/// Identity of a kernel thread, as understood by the [`Blocker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(pub u64);

/// The scheduler seam used by [`AmlMutex`] and [`AmlEvent`].
pub trait Blocker {
    /// Returns the identity of the calling thread.
    fn current_thread(&self) -> ThreadId;

    /// Blocks the calling thread until another thread calls
    /// [`unblock`](Self::unblock) on it.
    fn block_indefinite(&self);

    /// Blocks the calling thread until it is unblocked or `ms` milliseconds
    /// pass.
    fn block_with_timeout_ms(&self, ms: u64);

    /// Wakes `thread` if it is blocked, or makes its next block return
    /// immediately.
    fn unblock(&self, thread: ThreadId);

    /// Milliseconds since boot.
    fn ms_since_boot(&self) -> u64;
}

/// Outcome of a blocking wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// The mutex was acquired or the event consumed.
    Completed,
    /// The timeout elapsed first.
    TimedOut,
}

/// Tracks the deadline of a single wait.
struct Deadline(Option<u64>);

impl Deadline {
    fn new(blocker: &impl Blocker, timeout_ms: u16) -> Self {
        if timeout_ms == WAIT_FOREVER {
            Self(None)
        } else {
            Self(Some(blocker.ms_since_boot() + u64::from(timeout_ms)))
        }
    }

    /// Blocks until woken or the deadline passes. Returns `false` if the
    /// deadline had already passed.
    fn block(&self, blocker: &impl Blocker) -> bool {
        match self.0 {
            None => {
                blocker.block_indefinite();
                true
            }
            Some(deadline) => {
                let now = blocker.ms_since_boot();
                if now >= deadline {
                    return false;
                }
                blocker.block_with_timeout_ms(deadline - now);
                true
            }
        }
    }

    fn expired(&self, blocker: &impl Blocker) -> bool {
        self.0.is_some_and(|d| blocker.ms_since_boot() >= d)
    }
}

struct MutexState {
    owner: Option<ThreadId>,
    depth: u32,
    waiters: VecDeque<ThreadId>,
}

/// A recursive AML mutex owned by a thread.
pub struct AmlMutex {
    sync_level: u8,
    state: SpinMutex<MutexState>,
}

impl AmlMutex {
    /// Creates an unowned mutex.
    #[must_use]
    pub const fn new(sync_level: u8) -> Self {
        Self {
            sync_level,
            state: SpinMutex::new(MutexState {
                owner: None,
                depth: 0,
                waiters: VecDeque::new(),
            }),
        }
    }

    /// Declared synchronization level.
    #[must_use]
    pub fn sync_level(&self) -> u8 {
        self.sync_level
    }

    /// Returns the owner and recursion depth, if held.
    #[must_use]
    pub fn holder(&self) -> Option<(ThreadId, u32)> {
        let state = self.state.lock();
        state.owner.map(|owner| (owner, state.depth))
    }

    /// Acquires the mutex for the calling thread.
    ///
    /// Re-acquiring a mutex already held by the caller only bumps the
    /// recursion depth. `timeout_ms == 0xFFFF` waits forever.
    pub fn acquire(&self, blocker: &impl Blocker, timeout_ms: u16) -> WaitStatus {
        let me = blocker.current_thread();
        let deadline = Deadline::new(blocker, timeout_ms);

        loop {
            {
                let mut state = self.state.lock();
                match state.owner {
                    None => {
                        state.owner = Some(me);
                        state.depth = 1;
                        state.waiters.retain(|&t| t != me);
                        return WaitStatus::Completed;
                    }
                    Some(owner) if owner == me => {
                        state.depth += 1;
                        return WaitStatus::Completed;
                    }
                    Some(_) => {
                        if timeout_ms == 0 || deadline.expired(blocker) {
                            state.waiters.retain(|&t| t != me);
                            return WaitStatus::TimedOut;
                        }
                        if !state.waiters.contains(&me) {
                            state.waiters.push_back(me);
                        }
                    }
                }
            }

            if !deadline.block(blocker) {
                self.state.lock().waiters.retain(|&t| t != me);
                // One last attempt: the holder may have released just now.
                let mut state = self.state.lock();
                if state.owner.is_none() {
                    state.owner = Some(me);
                    state.depth = 1;
                    return WaitStatus::Completed;
                }
                return WaitStatus::TimedOut;
            }
        }
    }

    /// Releases one level of ownership.
    ///
    /// When the depth reaches zero the mutex becomes free and the oldest
    /// waiter is woken.
    pub fn release(&self, blocker: &impl Blocker) -> Result<(), AmlError> {
        let me = blocker.current_thread();
        let wake = {
            let mut state = self.state.lock();
            if state.owner != Some(me) {
                return Err(AmlError::NotMutexOwner);
            }
            state.depth -= 1;
            if state.depth > 0 {
                return Ok(());
            }
            state.owner = None;
            state.waiters.pop_front()
        };
        if let Some(thread) = wake {
            blocker.unblock(thread);
        }
        Ok(())
    }
}

impl core::fmt::Debug for AmlMutex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AmlMutex")
            .field("sync_level", &self.sync_level)
            .field("holder", &self.holder())
            .finish()
    }
}

struct EventState {
    signal_count: u64,
    waiters: Vec<ThreadId>,
}

/// An AML event: a counting signal with blocking waiters.
pub struct AmlEvent {
    state: SpinMutex<EventState>,
}

impl AmlEvent {
    /// Creates an unsignaled event.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SpinMutex::new(EventState {
                signal_count: 0,
                waiters: Vec::new(),
            }),
        }
    }

    /// Number of pending signals.
    #[must_use]
    pub fn signal_count(&self) -> u64 {
        self.state.lock().signal_count
    }

    /// Adds one signal and wakes every waiter.
    pub fn signal(&self, blocker: &impl Blocker) {
        let waiters = {
            let mut state = self.state.lock();
            state.signal_count += 1;
            core::mem::take(&mut state.waiters)
        };
        for thread in waiters {
            blocker.unblock(thread);
        }
    }

    /// Discards all pending signals.
    pub fn reset(&self) {
        self.state.lock().signal_count = 0;
    }

    /// Consumes one signal, blocking until one is available or the timeout
    /// elapses. `timeout_ms == 0xFFFF` waits forever.
    pub fn wait(&self, blocker: &impl Blocker, timeout_ms: u16) -> WaitStatus {
        let me = blocker.current_thread();
        let deadline = Deadline::new(blocker, timeout_ms);

        loop {
            {
                let mut state = self.state.lock();
                if state.signal_count > 0 {
                    state.signal_count -= 1;
                    state.waiters.retain(|&t| t != me);
                    return WaitStatus::Completed;
                }
                if timeout_ms == 0 || deadline.expired(blocker) {
                    state.waiters.retain(|&t| t != me);
                    return WaitStatus::TimedOut;
                }
                if !state.waiters.contains(&me) {
                    state.waiters.push(me);
                }
            }

            if !deadline.block(blocker) {
                let mut state = self.state.lock();
                state.waiters.retain(|&t| t != me);
                if state.signal_count > 0 {
                    state.signal_count -= 1;
                    return WaitStatus::Completed;
                }
                return WaitStatus::TimedOut;
            }
        }
    }
}

impl Default for AmlEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for AmlEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AmlEvent")
            .field("signal_count", &self.signal_count())
            .finish()
    }
}
