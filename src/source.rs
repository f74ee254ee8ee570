use crate::handle::TimeHandle;

/// The callback surface a [`TimeHandle`] invokes on its owning time source.
///
/// The handle only ever holds a weak, non-owning reference to its source
/// (see the module docs on cyclic ownership): the source owns its handles,
/// not the other way around. Implementations must return promptly and must
/// not call back into the handle that invoked them — `unblock_handle` in
/// particular runs with the handle's internal mutex held.
pub trait TimeSource: Send + Sync {
    /// Invoked exactly when a [`request`](TimeHandle::request) call succeeds
    /// on a handle that was `is_blocking` (i.e. had previously broken out of
    /// a quantum and not yet been offered a new one). Returns whatever the
    /// source wants recorded; the handle itself ignores the return value
    /// beyond requiring the call to complete.
    fn unblock_handle(&self, handle: &TimeHandle) -> bool;

    /// Informational: fires on every [`grant`](TimeHandle::grant), not just
    /// the first after a period of inactivity — callers that only care about
    /// activity edges can de-duplicate on their own.
    fn report_handle_active(&self, handle: &TimeHandle);

    /// Informational: the sink reported (via `continue_quantum`/`break_quantum`)
    /// how much of the last granted quantum it consumed.
    fn report_time_progress(&self, handle: &TimeHandle, used: crate::interval::TimeInterval);
}
