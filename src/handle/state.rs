use crate::interval::TimeInterval;

/// Where a handle's quantum cycle currently sits.
///
/// `Granted` carries whether the sink has already picked the quantum up via
/// [`request`](super::TimeHandle::request): a source calling
/// [`wait`](super::TimeHandle::wait) before the sink ever requested must not
/// block (the grant simply stays on offer), while a source waiting after the
/// sink has started working does block until a report arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
    Idle,
    Granted { requested: bool },
    Reported,
    /// Terminal: the handle has been disposed. Distinct from `Idle` so a
    /// disposed handle is never mistaken for a live, idle one.
    Draining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LastReport {
    None,
    Continue,
    Break,
}

/// All mutable handle state, guarded by a single mutex (see the module docs).
pub(super) struct State {
    pub(super) phase: Phase,
    pub(super) interval_granted: TimeInterval,
    pub(super) time_used_by_sink: TimeInterval,
    pub(super) last_report: LastReport,
    /// True from the moment a sink calls `break_quantum` until the next
    /// `request` that finds a grant waiting for it (the "blocking handle"
    /// window — see the glossary in the crate docs).
    pub(super) is_blocking: bool,
    pub(super) enabled: bool,
    pub(super) source_side_active: bool,
    pub(super) latch_count: u32,
    pub(super) disposed: bool,
    pub(super) recently_unblocked: bool,
}

impl State {
    pub(super) fn new() -> Self {
        Self {
            phase: Phase::Idle,
            interval_granted: TimeInterval::EMPTY,
            time_used_by_sink: TimeInterval::EMPTY,
            last_report: LastReport::None,
            is_blocking: false,
            enabled: true,
            source_side_active: true,
            latch_count: 0,
            disposed: false,
            recently_unblocked: false,
        }
    }

    /// Mirrors the `is_ready_for_new_time_grant` query from the protocol:
    /// advisory for a source deciding *whether it should* grant, distinct
    /// from the harder invariants `grant` itself asserts (see DESIGN.md for
    /// why `is_blocking` is advisory here but not an assertion in `grant`).
    pub(super) fn is_ready_for_new_time_grant(&self) -> bool {
        !self.disposed && matches!(self.phase, Phase::Idle) && !self.is_blocking
    }
}
