//! The time-synchronization rendezvous handle.
//!
//! ```text
//!  source thread                handle                 sink thread
//!       │                                                    │
//!       │── grant(Δ) ──────────►  Idle → Granted             │
//!       │                                                    │
//!       │                         Granted ◄──── request() ───┤
//!       │                           (returns (true, Δ);            │
//!       │                            sink leaves the critical       │
//!       │                            section and works)             │
//!       │                                                    │
//!       │                        Granted ◄── continue(used) ─┤  (clean end of quantum)
//!       │                         or                         │
//!       │                        Granted ◄──── break(used) ──┤  (sink wants to resync)
//!       │                           → Reported                      │
//!       │                                                    │
//!       │◄── wait() ── Reported → Idle                       │
//!       │    (done, unblocked_recently, residual)             │
//! ```
//!
//! Everything above happens under one [`Mutex`] with two [`Condvar`]s
//! (`source_cv` for [`TimeHandle::wait`], `sink_cv` for
//! [`TimeHandle::request`] and a latched [`TimeHandle::set_enabled`]).
//! [`TimeHandle::continue_quantum`]/[`TimeHandle::break_quantum`] and the
//! external controls (`set_enabled`, `set_source_side_active`, `latch`,
//! `unlatch`, `dispose`) never block except where documented.
//!
//! ## Cyclic ownership
//!
//! A handle is logically owned by the time source that created it (the
//! source holds a strong `Arc<TimeHandle>` in its own collection of
//! handles); the handle only holds a [`Weak`] back-reference to the source,
//! used solely to invoke the three [`TimeSource`] callbacks. Nothing here
//! owns the sink — the sink side is just "whoever calls `request`".

mod state;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};

use crossbeam_utils::CachePadded;

use crate::interval::TimeInterval;
use crate::outcome::{RequestOutcome, WaitOutcome};
use crate::source::TimeSource;
use state::{LastReport, Phase, State};

struct Inner {
    state: Mutex<State>,
    /// Waited on by `wait`; signaled by `continue_quantum`/`break_quantum`
    /// and by every external transition that can unblock a waiting source.
    source_cv: Condvar,
    /// Waited on by `request` and by a latched `set_enabled(true)`; signaled
    /// by `grant`, `unlatch`, and every external transition that can unblock
    /// a waiting sink or controller.
    sink_cv: Condvar,
    source: Weak<dyn TimeSource>,
    unblock_count: CachePadded<AtomicU64>,
}

/// A shared handle attaching one sink to one time source.
///
/// Cheap to clone (an `Arc` bump): the source, the sink, and any external
/// controller each hold their own clone and call the methods relevant to
/// their role (see §6 of the crate-level contract for the full split).
pub struct TimeHandle {
    inner: Arc<Inner>,
}

impl Clone for TimeHandle {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl TimeHandle {
    /// Creates a new handle, idle and enabled, attached to `source`.
    ///
    /// `source` is stored as a [`Weak`] reference: the handle never keeps
    /// its time source alive (see the module docs on cyclic ownership).
    pub fn new(source: Weak<dyn TimeSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::new()),
                source_cv: Condvar::new(),
                sink_cv: Condvar::new(),
                source,
                unblock_count: CachePadded::new(AtomicU64::new(0)),
            }),
        }
    }

    // ---- source-side ----------------------------------------------------

    /// Offers a quantum of virtual time to the sink. Non-blocking.
    ///
    /// # Panics
    ///
    /// Asserts (§4.2 of the protocol) that the handle is `Idle`, not
    /// disposed, and that `interval` is non-empty. These are programming
    /// errors in the source, never reported as a runtime error (§7).
    pub fn grant(&self, interval: TimeInterval) {
        assert!(!interval.is_empty(), "grant requires a non-empty interval");
        let mut state = self.inner.state.lock().unwrap();
        assert!(!state.disposed, "grant called on a disposed TimeHandle");
        assert!(
            matches!(state.phase, Phase::Idle),
            "grant called while a quantum is still outstanding (phase={:?})",
            state.phase
        );
        state.interval_granted = interval;
        state.time_used_by_sink = TimeInterval::EMPTY;
        state.last_report = LastReport::None;
        state.phase = Phase::Granted { requested: false };
        drop(state);
        self.inner.sink_cv.notify_all();
        self.notify_handle_active();
    }

    /// Collects the outcome of the quantum currently in flight. May block
    /// (see the module docs) until the sink reports in.
    ///
    /// # Panics
    ///
    /// Asserts that a grant actually preceded this call — grants and waits
    /// must strictly alternate on the source side (§3, invariant 5).
    pub fn wait(&self) -> WaitOutcome {
        let mut state = self.inner.state.lock().unwrap();
        loop {
            match state.phase {
                Phase::Idle => {
                    panic!("wait() called with no grant outstanding; grant and wait must alternate");
                }
                Phase::Granted { requested } => {
                    if state.disposed || !state.enabled || !state.source_side_active {
                        // Disabled-path: the grant stays on offer, nothing to
                        // collect yet. Still consume any pending unblock
                        // signal — it's owed to the caller regardless of
                        // which branch of `wait` reports it (§4.1.3).
                        let unblocked_recently = state.recently_unblocked;
                        state.recently_unblocked = false;
                        return WaitOutcome::new(false, unblocked_recently, TimeInterval::EMPTY);
                    }
                    if !requested {
                        // 4.1.1: nothing to wait for if the sink hasn't even picked it up.
                        let unblocked_recently = state.recently_unblocked;
                        state.recently_unblocked = false;
                        return WaitOutcome::new(false, unblocked_recently, TimeInterval::EMPTY);
                    }
                    state = self.inner.source_cv.wait(state).unwrap();
                }
                Phase::Reported => {
                    let done = state.last_report == LastReport::Continue;
                    let residual = state.interval_granted.saturating_sub(state.time_used_by_sink);
                    let unblocked_recently = state.recently_unblocked;
                    state.recently_unblocked = false;
                    state.phase = Phase::Idle;
                    state.interval_granted = TimeInterval::EMPTY;
                    state.time_used_by_sink = TimeInterval::EMPTY;
                    state.last_report = LastReport::None;
                    return WaitOutcome::new(done, unblocked_recently, residual);
                }
                Phase::Draining => {
                    // Disposed: unblock with a "done" outcome, per the handle's lifecycle.
                    return WaitOutcome::new(true, false, TimeInterval::EMPTY);
                }
            }
        }
    }

    /// Pauses external enable/disable transitions until a matching
    /// [`TimeHandle::unlatch`]. Non-blocking.
    pub fn latch(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.latch_count += 1;
    }

    /// Resumes external enable/disable transitions. Wakes any caller parked
    /// in `set_enabled(true)` exactly when the count reaches zero.
    ///
    /// # Panics
    ///
    /// Asserts against an unbalanced `unlatch` (more unlatches than latches).
    pub fn unlatch(&self) {
        let mut state = self.inner.state.lock().unwrap();
        assert!(state.latch_count > 0, "unlatch called without a matching latch");
        state.latch_count -= 1;
        let reached_zero = state.latch_count == 0;
        drop(state);
        if reached_zero {
            self.inner.sink_cv.notify_all();
        }
    }

    /// `true` iff the handle is not disposed, is currently idle, and is not
    /// in the middle of the "blocking handle" window after a break. This is
    /// advisory for a source deciding whether it *should* grant; it is a
    /// stricter check than what `grant` itself asserts (see DESIGN.md).
    pub fn is_ready_for_new_time_grant(&self) -> bool {
        self.inner.state.lock().unwrap().is_ready_for_new_time_grant()
    }

    /// Current value of the externally-controlled "source side active" flag.
    pub fn source_side_active(&self) -> bool {
        self.inner.state.lock().unwrap().source_side_active
    }

    /// Current value of the externally-controlled "enabled" flag.
    pub fn enabled(&self) -> bool {
        self.inner.state.lock().unwrap().enabled
    }

    /// Number of times `request` has invoked the source's `unblock_handle`
    /// callback. Diagnostic only; never consulted by the protocol itself.
    pub fn unblock_count(&self) -> u64 {
        self.inner.unblock_count.load(Ordering::Relaxed)
    }

    // ---- sink-side --------------------------------------------------------

    /// Fetches the quantum currently on offer, blocking until one arrives
    /// (see the module docs for the exact wake conditions).
    pub fn request(&self) -> RequestOutcome {
        let mut state = self.inner.state.lock().unwrap();
        loop {
            if state.disposed {
                return RequestOutcome::NOT_GRANTED;
            }
            if !state.enabled {
                return RequestOutcome::NOT_GRANTED;
            }
            if !state.source_side_active {
                return RequestOutcome::NOT_GRANTED;
            }
            if let Phase::Granted { requested } = &mut state.phase {
                *requested = true;
                let interval = state.interval_granted;
                if state.is_blocking {
                    state.is_blocking = false;
                    state.recently_unblocked = true;
                    // Invoked with the lock held: the contract requires this
                    // to complete before `request` returns, and forbids the
                    // callback from re-entering the handle (§5).
                    if let Some(source) = self.inner.source.upgrade() {
                        source.unblock_handle(self);
                    }
                    self.inner.unblock_count.fetch_add(1, Ordering::Relaxed);
                }
                return RequestOutcome::granted(interval);
            }
            state = self.inner.sink_cv.wait(state).unwrap();
        }
    }

    /// Reports a clean end of the quantum: the sink consumed `used` ticks
    /// and is ready for the next grant immediately. Non-blocking.
    ///
    /// # Panics
    ///
    /// Asserts that a quantum is actually outstanding and hasn't already
    /// been reported on (§4.2): a second `continue_quantum`/`break_quantum`
    /// in the same cycle is a programming error. Debug builds also assert
    /// `used <= interval_granted` (§3, invariant 1).
    pub fn continue_quantum(&self, used: TimeInterval) {
        let mut state = self.inner.state.lock().unwrap();
        if state.disposed {
            // Disposal race: the report arrived after the handle was torn
            // down. Not a caller bug — just drop it (§7.3).
            return;
        }
        assert!(
            matches!(state.phase, Phase::Granted { .. }) && state.last_report == LastReport::None,
            "continue_quantum called outside an unreported granted quantum (phase={:?}, last_report={:?})",
            state.phase,
            state.last_report
        );
        debug_assert!(
            used <= state.interval_granted,
            "continue_quantum reported used={:?} exceeding the granted interval={:?}",
            used,
            state.interval_granted
        );
        state.time_used_by_sink = used;
        state.last_report = LastReport::Continue;
        state.phase = Phase::Reported;
        drop(state);
        self.notify_time_progress(used);
        self.inner.source_cv.notify_all();
    }

    /// Reports that the sink voluntarily broke out of the quantum after
    /// consuming `used` ticks, and needs the source to resynchronize before
    /// granting again. Non-blocking.
    ///
    /// # Panics
    ///
    /// Same preconditions as [`TimeHandle::continue_quantum`].
    pub fn break_quantum(&self, used: TimeInterval) {
        let mut state = self.inner.state.lock().unwrap();
        if state.disposed {
            return;
        }
        assert!(
            matches!(state.phase, Phase::Granted { .. }) && state.last_report == LastReport::None,
            "break_quantum called outside an unreported granted quantum (phase={:?}, last_report={:?})",
            state.phase,
            state.last_report
        );
        debug_assert!(
            used <= state.interval_granted,
            "break_quantum reported used={:?} exceeding the granted interval={:?}",
            used,
            state.interval_granted
        );
        state.time_used_by_sink = used;
        state.last_report = LastReport::Break;
        state.is_blocking = true;
        state.phase = Phase::Reported;
        drop(state);
        self.notify_time_progress(used);
        self.inner.source_cv.notify_all();
    }

    // ---- external / controller ---------------------------------------------

    /// Toggles whether the source side intends to grant time. Non-blocking.
    ///
    /// Turning this off wakes a sink blocked in `request` (with the
    /// disabled-path result) and a source blocked in `wait` (same). Turning
    /// it back on has no immediate effect beyond the flag (§4.4: a later
    /// grant+request cycle behaves as if nothing happened).
    pub fn set_source_side_active(&self, active: bool) {
        let mut state = self.inner.state.lock().unwrap();
        state.source_side_active = active;
        drop(state);
        if !active {
            self.inner.sink_cv.notify_all();
            self.inner.source_cv.notify_all();
        }
    }

    /// Toggles whether the sink side participates at all.
    ///
    /// Disabling is non-blocking and immediately wakes any blocked
    /// `request`/`wait` with their disabled-path result. Re-enabling blocks
    /// while [`TimeHandle::latch`] has any outstanding count, and wakes
    /// exactly when the matching [`TimeHandle::unlatch`] drops it to zero.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.inner.state.lock().unwrap();
        if !enabled {
            state.enabled = false;
            drop(state);
            self.inner.sink_cv.notify_all();
            self.inner.source_cv.notify_all();
            return;
        }
        while state.latch_count > 0 {
            state = self.inner.sink_cv.wait(state).unwrap();
        }
        state.enabled = true;
    }

    /// Idempotently tears the handle down: rejects all future grants and
    /// wakes every blocked caller with its disabled-path result. Non-blocking.
    pub fn dispose(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.phase = Phase::Draining;
        drop(state);
        self.inner.sink_cv.notify_all();
        self.inner.source_cv.notify_all();
    }

    /// `true` once [`TimeHandle::dispose`] has run; monotonic.
    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().unwrap().disposed
    }

    fn notify_handle_active(&self) {
        if let Some(source) = self.inner.source.upgrade() {
            source.report_handle_active(self);
        }
    }

    fn notify_time_progress(&self, used: TimeInterval) {
        if let Some(source) = self.inner.source.upgrade() {
            source.report_time_progress(self, used);
        }
    }
}

impl std::fmt::Debug for TimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock().unwrap();
        f.debug_struct("TimeHandle")
            .field("phase", &state.phase)
            .field("enabled", &state.enabled)
            .field("source_side_active", &state.source_side_active)
            .field("is_blocking", &state.is_blocking)
            .field("disposed", &state.disposed)
            .finish_non_exhaustive()
    }
}
