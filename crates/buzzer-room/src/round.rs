//! A single picture-puzzle round and the actions that drive it.

use std::collections::BTreeSet;

use buzzer_protocol::{ImageRef, PlayerId, Team};

use crate::RoundPhase;

/// Who currently holds the buzz lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buzz {
    pub player_id: PlayerId,
    pub player_name: String,
    pub team: Team,
}

/// One round: the images, the correct answer, and the buzz state.
///
/// Owned by its room. Staging a new round replaces the old one outright;
/// nothing carries over.
#[derive(Debug, Clone)]
pub struct Round {
    images: Vec<ImageRef>,
    answer: String,
    buzzed_by: Option<Buzz>,
    revealed: bool,
    blocked_teams: BTreeSet<Team>,
    launched: bool,
}

impl Round {
    /// A staged (not yet launched) round. The answer is trimmed.
    pub fn new(images: Vec<ImageRef>, answer: &str) -> Self {
        Self {
            images,
            answer: answer.trim().to_owned(),
            buzzed_by: None,
            revealed: false,
            blocked_teams: BTreeSet::new(),
            launched: false,
        }
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn buzzed_by(&self) -> Option<&Buzz> {
        self.buzzed_by.as_ref()
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }

    pub fn is_blocked(&self, team: Team) -> bool {
        self.blocked_teams.contains(&team)
    }

    /// Blocked teams in a stable order (red before blue).
    pub fn blocked_teams(&self) -> Vec<Team> {
        self.blocked_teams.iter().copied().collect()
    }

    pub fn phase(&self) -> RoundPhase {
        if !self.launched {
            RoundPhase::Staged
        } else if self.revealed {
            RoundPhase::Resolved
        } else if self.buzzed_by.is_some() {
            RoundPhase::Buzzed
        } else {
            RoundPhase::Live
        }
    }

    /// Staged → Live. Returns `false` if already launched.
    pub(crate) fn launch(&mut self) -> bool {
        if self.launched {
            return false;
        }
        self.launched = true;
        self.buzzed_by = None;
        self.revealed = false;
        self.blocked_teams.clear();
        true
    }

    /// Compare-and-set on the buzz lock. Succeeds only while the round is
    /// live, nobody holds the lock, and `buzz.team` isn't blocked.
    pub(crate) fn try_buzz(&mut self, buzz: Buzz) -> Result<(), BuzzRejected> {
        if !self.launched {
            return Err(BuzzRejected::NotLive);
        }
        if self.revealed {
            return Err(BuzzRejected::Revealed);
        }
        if self.buzzed_by.is_some() {
            return Err(BuzzRejected::AlreadyBuzzed);
        }
        if self.is_blocked(buzz.team) {
            return Err(BuzzRejected::TeamBlocked);
        }
        self.buzzed_by = Some(buzz);
        Ok(())
    }

    /// Releases the buzz lock, returning who held it.
    pub(crate) fn take_buzz(&mut self) -> Option<Buzz> {
        self.buzzed_by.take()
    }

    /// Ends the round. Clears any buzz since nothing is left to judge.
    pub(crate) fn reveal(&mut self) {
        self.revealed = true;
        self.buzzed_by = None;
    }

    pub(crate) fn block(&mut self, team: Team) {
        self.blocked_teams.insert(team);
    }

    /// Lifts the block on `team` and drops any pending buzz.
    pub(crate) fn unblock(&mut self, team: Team) {
        self.blocked_teams.remove(&team);
        self.buzzed_by = None;
    }
}

/// Why a buzz lost. Only ever logged; the buzzer gets no reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzRejected {
    NoRound,
    NotLive,
    Revealed,
    AlreadyBuzzed,
    TeamBlocked,
    NotAPlayer,
}

/// A host or player request against a room's round.
///
/// The connection layer builds these from client events and sends them,
/// together with the caller's session, to the room actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundAction {
    /// Host: install a round without showing it.
    Stage {
        answer: String,
        images: Vec<ImageRef>,
    },
    /// Host: launch the staged round, staging `answer`/`images` first
    /// when both are given.
    Start {
        answer: Option<String>,
        images: Option<Vec<ImageRef>>,
    },
    /// Player: claim the answer.
    Buzz,
    /// Host: rule on the current buzz.
    Judge { correct: bool },
    /// Host: let `team` buzz again.
    UnblockTeam(Team),
    /// Host: reveal without scoring.
    Skip,
    /// Host: drop the current round.
    NewRound,
}
