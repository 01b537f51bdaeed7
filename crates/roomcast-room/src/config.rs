//! Room configuration and the two lifecycle state machines.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Per-registry settings shared by every room it spawns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Frames buffered per peer before further frames to that peer are
    /// dropped. A slow peer never stalls the room.
    pub peer_queue_capacity: usize,

    /// Commands buffered per room actor. Callers wait when it is full.
    pub command_channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            peer_queue_capacity: 256,
            command_channel_size: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// AdmissionState
// ---------------------------------------------------------------------------

/// Why a room stopped admitting peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// The room filled up. Cleared automatically once a peer leaves.
    Capacity,
    /// An operator closed it. Only an operator can reopen it.
    Admin,
}

/// Whether a room admits new peers.
///
/// ```text
///            join fills room            leave drops below limit
///   Open ───────────────────→ Closed(Capacity) ───────────────→ Open
///     │  ↑                          │
///     │  └──── set_open(true) ──────┤
///     └──── set_open(false) ──→ Closed(Admin)   (sticky)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionState {
    Open,
    Closed(CloseReason),
}

impl AdmissionState {
    /// Returns `true` if the room is not closed for any reason.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Applies an administrative toggle.
    pub fn set_open(self, open: bool) -> Self {
        if open {
            Self::Open
        } else {
            Self::Closed(CloseReason::Admin)
        }
    }

    /// The room just reached its limit. An already closed room keeps its
    /// reason so an admin close stays sticky.
    pub fn close_at_capacity(self) -> Self {
        match self {
            Self::Open => Self::Closed(CloseReason::Capacity),
            closed => closed,
        }
    }

    /// The room dropped below its limit. Only a capacity close is undone.
    pub fn reopen_below_capacity(self) -> Self {
        match self {
            Self::Closed(CloseReason::Capacity) => Self::Open,
            other => other,
        }
    }
}

impl std::fmt::Display for AdmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Closed(CloseReason::Capacity) => write!(f, "Closed(Capacity)"),
            Self::Closed(CloseReason::Admin) => write!(f, "Closed(Admin)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Population
// ---------------------------------------------------------------------------

/// How many peers a room has had, coarsely.
///
/// ```text
/// Empty → Active → TornDown
/// ```
///
/// A freshly created room is `Empty` and stays alive until somebody joins.
/// Once `Active`, the room is torn down the moment its last peer leaves;
/// `TornDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Population {
    Empty,
    Active,
    TornDown,
}

impl Population {
    /// State after a successful join.
    pub fn joined(self) -> Self {
        match self {
            Self::TornDown => Self::TornDown,
            _ => Self::Active,
        }
    }

    /// State after a leave that left `remaining` peers behind.
    pub fn left(self, remaining: usize) -> Self {
        match self {
            Self::Active if remaining == 0 => Self::TornDown,
            other => other,
        }
    }

    pub fn is_torn_down(self) -> bool {
        matches!(self, Self::TornDown)
    }
}
