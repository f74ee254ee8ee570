//! A blocking rendezvous handle between a virtual-time source and a time sink.
//!
//! This crate implements the synchronization primitive at the heart of a
//! full-system emulator's clock: a [`TimeHandle`] attaches exactly one time
//! sink (an emulated CPU, a peripheral with its own clock, a sub-emulation)
//! to a central virtual-time source. The source hands out quanta of virtual
//! time via [`TimeHandle::grant`]; the sink consumes as much as it can and
//! reports back via [`TimeHandle::continue_quantum`] or
//! [`TimeHandle::break_quantum`]; external controllers may
//! [`TimeHandle::set_enabled`], [`TimeHandle::set_source_side_active`],
//! [`TimeHandle::latch`]/[`TimeHandle::unlatch`], or
//! [`TimeHandle::dispose`] the handle at any time.
//!
//! ```
//! use std::sync::{Arc, Weak};
//! use quantum_handle::{TimeHandle, TimeInterval, TimeSource};
//!
//! struct NullSource;
//! impl TimeSource for NullSource {
//!     fn unblock_handle(&self, _handle: &TimeHandle) -> bool { true }
//!     fn report_handle_active(&self, _handle: &TimeHandle) {}
//!     fn report_time_progress(&self, _handle: &TimeHandle, _used: TimeInterval) {}
//! }
//!
//! let source: Arc<dyn TimeSource> = Arc::new(NullSource);
//! let handle = TimeHandle::new(Arc::downgrade(&source));
//!
//! handle.grant(TimeInterval::from_ticks(1000));
//! let request = handle.request();
//! assert!(request.granted);
//!
//! handle.continue_quantum(request.interval);
//! let outcome = handle.wait();
//! assert!(outcome.done);
//! ```
//!
//! What this crate is explicitly *not*: it does not schedule work, does not
//! measure wall-clock time, and does not implement a quantum-allocation
//! policy across many handles. Those belong to the time source, which owns
//! a `TimeHandle` per sink and is out of scope here.

mod handle;
mod interval;
mod outcome;
mod source;

pub use handle::TimeHandle;
pub use interval::TimeInterval;
pub use outcome::{RequestOutcome, WaitOutcome};
pub use source::TimeSource;
