//! Admission decisions: pure functions of the room's current state.

/// Result of evaluating a join attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    /// The room is at its limit.
    Full,
    /// The room is closed and not full (an operator closed it).
    Closed,
}

/// `true` when a positive `limit` has been reached.
pub fn is_full(size: usize, limit: usize) -> bool {
    limit > 0 && size >= limit
}

/// Decides a join attempt. Fullness wins over the open flag so a peer
/// knocking on a room that auto-closed at capacity is told it is full.
pub fn check(open: bool, size: usize, limit: usize) -> Admission {
    if is_full(size, limit) {
        Admission::Full
    } else if !open {
        Admission::Closed
    } else {
        Admission::Admit
    }
}

pub fn is_admissible(open: bool, size: usize, limit: usize) -> bool {
    check(open, size, limit) == Admission::Admit
}
