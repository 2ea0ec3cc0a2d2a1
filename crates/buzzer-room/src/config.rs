//! Room configuration and the round phase machine.

use std::fmt;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Limits applied to every room.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Maximum players in a room, not counting the host.
    pub max_players: usize,

    /// Maximum players per team.
    pub team_capacity: usize,

    /// Maximum images a round may carry.
    pub max_images: usize,

    /// Capacity of each room actor's command queue. Senders wait when
    /// it is full.
    pub command_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 4,
            team_capacity: 2,
            max_images: 4,
            command_buffer: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// RoundPhase
// ---------------------------------------------------------------------------

/// Where a room is in its round lifecycle.
///
/// ```text
///            stage            launch          buzz
/// NoRound ─────────→ Staged ─────────→ Live ←───────→ Buzzed
///    ↑                 ↑ (stage replaces     judge ✗ /   │
///    │                 │  any round)         unblock     │ judge ✓
///    │                                                   ↓ / skip
///    └──────────────── new round ─────────────────── Resolved
/// ```
///
/// `skip` also leads from `Live` straight to `Resolved`. The phase is
/// derived from the current round rather than stored, so it can never
/// disagree with the round's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No round is staged or running.
    NoRound,
    /// The host has installed images and an answer; players see nothing yet.
    Staged,
    /// Players can buzz.
    Live,
    /// One player holds the buzz lock; the host has to judge.
    Buzzed,
    /// The answer has been revealed (judged correct or skipped).
    Resolved,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRound => write!(f, "NoRound"),
            Self::Staged => write!(f, "Staged"),
            Self::Live => write!(f, "Live"),
            Self::Buzzed => write!(f, "Buzzed"),
            Self::Resolved => write!(f, "Resolved"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_phase_display() {
        assert_eq!(RoundPhase::NoRound.to_string(), "NoRound");
        assert_eq!(RoundPhase::Buzzed.to_string(), "Buzzed");
    }

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.max_players, 4);
        assert_eq!(config.team_capacity, 2);
        assert_eq!(config.max_images, 4);
    }
}
