//! Room state and the round state machine.
//!
//! Everything here is plain synchronous data: a [`Room`] is mutated by one
//! method call at a time and each call returns the broadcast (if any) that
//! the change produced. The room actor is what guarantees "one call at a
//! time"; these types can be driven directly in tests.
//!
//! Every host-only transition checks the caller against the room's host
//! and silently does nothing for anyone else. Out-of-order requests
//! (judging with nothing buzzed, buzzing a resolved round, ...) are also
//! silent no-ops. Neither case is an error a client gets to see.

use buzzer_protocol::{
    ImageRef, PlayerId, PlayerView, RoomCode, RoomSnapshot, Scores, ServerEvent, Team,
    TeamRosters,
};
use buzzer_session::Session;

use crate::round::{Buzz, BuzzRejected, Round, RoundAction};
use crate::{JoinError, RoomConfig, RoundPhase};

/// Name given to a host who didn't pick one.
pub const DEFAULT_HOST_NAME: &str = "Host";

/// A member playing on a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,
}

impl Player {
    fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            team: self.team,
        }
    }
}

/// Team membership, by player ID, in join order.
#[derive(Debug, Clone, Default)]
struct TeamSlots {
    red: Vec<PlayerId>,
    blue: Vec<PlayerId>,
}

impl TeamSlots {
    fn get(&self, team: Team) -> &Vec<PlayerId> {
        match team {
            Team::Red => &self.red,
            Team::Blue => &self.blue,
        }
    }

    fn get_mut(&mut self, team: Team) -> &mut Vec<PlayerId> {
        match team {
            Team::Red => &mut self.red,
            Team::Blue => &mut self.blue,
        }
    }
}

/// One game session: host, players, scores and the current round.
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    host: PlayerId,
    host_name: String,
    config: RoomConfig,
    /// In join order.
    players: Vec<Player>,
    teams: TeamSlots,
    scores: Scores,
    round_number: u32,
    current_round: Option<Round>,
    started: bool,
}

impl Room {
    /// An empty room owned by `host`.
    pub fn new(code: RoomCode, host: PlayerId, host_name: Option<&str>, config: RoomConfig) -> Self {
        Self {
            code,
            host,
            host_name: non_empty(host_name).unwrap_or(DEFAULT_HOST_NAME).to_owned(),
            config,
            players: Vec::new(),
            teams: TeamSlots::default(),
            scores: Scores::default(),
            round_number: 0,
            current_round: None,
            started: false,
        }
    }

    // -- Accessors --------------------------------------------------------

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn host(&self) -> PlayerId {
        self.host
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn team_count(&self, team: Team) -> usize {
        self.teams.get(team).len()
    }

    pub fn scores(&self) -> Scores {
        self.scores
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn current_round(&self) -> Option<&Round> {
        self.current_round.as_ref()
    }

    pub fn phase(&self) -> RoundPhase {
        self.current_round
            .as_ref()
            .map_or(RoundPhase::NoRound, Round::phase)
    }

    /// Returns `true` if `caller` is this room's host.
    pub fn is_host(&self, caller: &Session) -> bool {
        caller.is_host() && caller.player_id == self.host && caller.room_code == self.code
    }

    /// The lobby view broadcast as `room-update`.
    pub fn snapshot(&self) -> RoomSnapshot {
        let roster = |team: Team| {
            self.teams
                .get(team)
                .iter()
                .filter_map(|id| self.player(*id))
                .map(Player::view)
                .collect()
        };
        RoomSnapshot {
            players: self.players.iter().map(Player::view).collect(),
            teams: TeamRosters {
                red: roster(Team::Red),
                blue: roster(Team::Blue),
            },
            scores: self.scores,
            started: self.started,
        }
    }

    // -- Roster -----------------------------------------------------------

    /// Adds a player. Checks, in order: room full, team missing/unknown,
    /// team full.
    ///
    /// An empty `name` becomes "لاعب N" (player N), N counting the new
    /// player.
    pub fn join(
        &mut self,
        id: PlayerId,
        name: Option<&str>,
        team: Option<&str>,
    ) -> Result<Player, JoinError> {
        if id == self.host || self.player(id).is_some() {
            return Err(JoinError::AlreadyJoined);
        }
        if self.players.len() >= self.config.max_players {
            return Err(JoinError::RoomFull);
        }
        let team: Team = team
            .and_then(|t| t.parse().ok())
            .ok_or(JoinError::InvalidTeam)?;
        if self.team_count(team) >= self.config.team_capacity {
            return Err(JoinError::TeamFull);
        }

        let name = match non_empty(name) {
            Some(name) => name.to_owned(),
            None => format!("لاعب {}", self.players.len() + 1),
        };
        let player = Player { id, name, team };
        self.players.push(player.clone());
        self.teams.get_mut(team).push(id);
        Ok(player)
    }

    /// Removes a player from the roster and their team. `None` if they
    /// weren't in the room.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == id)?;
        let player = self.players.remove(index);
        self.teams.get_mut(player.team).retain(|p| *p != id);
        Some(player)
    }

    // -- Round transitions --------------------------------------------------

    /// Dispatches a [`RoundAction`] to the matching transition.
    pub fn apply(&mut self, caller: &Session, action: RoundAction) -> Option<ServerEvent> {
        match action {
            RoundAction::Stage { answer, images } => {
                self.stage_round(caller, &answer, images);
                None
            }
            RoundAction::Start {
                answer: Some(answer),
                images: Some(images),
            } => {
                if self.stage_round(caller, &answer, images) {
                    self.launch_round(caller)
                } else {
                    None
                }
            }
            RoundAction::Start { .. } => self.launch_round(caller),
            RoundAction::Buzz => self.buzz(caller),
            RoundAction::Judge { correct } => self.judge(caller, correct),
            RoundAction::UnblockTeam(team) => self.unblock_team(caller, team),
            RoundAction::Skip => self.skip_round(caller),
            RoundAction::NewRound => self.new_round(caller),
        }
    }

    /// Host: installs a new, unlaunched round, replacing whatever was
    /// there. Needs between 1 and `max_images` images. Nothing is
    /// broadcast: players must not see a round before it launches.
    pub fn stage_round(&mut self, caller: &Session, answer: &str, images: Vec<ImageRef>) -> bool {
        if !self.is_host(caller) {
            return false;
        }
        if images.is_empty() || images.len() > self.config.max_images {
            tracing::debug!(
                room = %self.code,
                count = images.len(),
                "stage rejected: bad image count"
            );
            return false;
        }
        tracing::info!(room = %self.code, images = images.len(), "round staged");
        self.current_round = Some(Round::new(images, answer));
        true
    }

    /// Host: shows the staged round to everyone and opens buzzing.
    pub fn launch_round(&mut self, caller: &Session) -> Option<ServerEvent> {
        if !self.is_host(caller) {
            return None;
        }
        let round = self.current_round.as_mut()?;
        if !round.launch() {
            return None;
        }
        self.round_number += 1;
        self.started = true;
        tracing::info!(room = %self.code, round = self.round_number, "round launched");

        Some(ServerEvent::RoundStarted {
            round_number: self.round_number,
            images: round.images().to_vec(),
            image_count: round.images().len(),
        })
    }

    /// Player: first valid buzz takes the lock; everyone else is ignored.
    pub fn buzz(&mut self, caller: &Session) -> Option<ServerEvent> {
        match self.try_buzz(caller) {
            Ok(event) => Some(event),
            Err(reason) => {
                tracing::debug!(
                    room = %self.code,
                    player_id = %caller.player_id,
                    ?reason,
                    "buzz ignored"
                );
                None
            }
        }
    }

    fn try_buzz(&mut self, caller: &Session) -> Result<ServerEvent, BuzzRejected> {
        let team = caller.team().ok_or(BuzzRejected::NotAPlayer)?;
        if caller.room_code != self.code || self.player(caller.player_id).is_none() {
            return Err(BuzzRejected::NotAPlayer);
        }
        let round = self.current_round.as_mut().ok_or(BuzzRejected::NoRound)?;
        round.try_buzz(Buzz {
            player_id: caller.player_id,
            player_name: caller.name.clone(),
            team,
        })?;
        tracing::info!(room = %self.code, player_id = %caller.player_id, %team, "buzz accepted");

        Ok(ServerEvent::PlayerBuzzed {
            player_name: caller.name.clone(),
            team,
        })
    }

    /// Host: rules on the current buzz.
    ///
    /// Correct: the buzzing team scores one point and the round ends.
    /// Wrong: the buzzing team is blocked and the round stays live for
    /// the other team.
    pub fn judge(&mut self, caller: &Session, correct: bool) -> Option<ServerEvent> {
        if !self.is_host(caller) {
            return None;
        }
        let round = self.current_round.as_mut()?;
        let buzz = round.take_buzz()?;

        if correct {
            round.reveal();
            self.scores.award(buzz.team);
            tracing::info!(room = %self.code, team = %buzz.team, "judged correct");
            Some(ServerEvent::RoundResult {
                winner_team: buzz.team,
                answer: round.answer().to_owned(),
                scores: self.scores,
                guesser: buzz.player_name,
            })
        } else {
            round.block(buzz.team);
            tracing::info!(room = %self.code, team = %buzz.team, "judged wrong, team blocked");
            Some(ServerEvent::BuzzWrong {
                player_name: buzz.player_name,
                team: buzz.team,
            })
        }
    }

    /// Host: gives a blocked team another go.
    pub fn unblock_team(&mut self, caller: &Session, team: Team) -> Option<ServerEvent> {
        if !self.is_host(caller) {
            return None;
        }
        let round = self.current_round.as_mut().filter(|r| r.is_launched())?;
        round.unblock(team);
        tracing::info!(room = %self.code, %team, "team unblocked");
        Some(ServerEvent::TeamUnblocked { team })
    }

    /// Host: reveals the answer without scoring.
    pub fn skip_round(&mut self, caller: &Session) -> Option<ServerEvent> {
        if !self.is_host(caller) {
            return None;
        }
        let round = self
            .current_round
            .as_mut()
            .filter(|r| r.is_launched() && !r.is_revealed())?;
        round.reveal();
        tracing::info!(room = %self.code, round = self.round_number, "round skipped");
        Some(ServerEvent::RoundSkipped {
            answer: round.answer().to_owned(),
            scores: self.scores,
        })
    }

    /// Host: drops the current round and announces the next round number.
    pub fn new_round(&mut self, caller: &Session) -> Option<ServerEvent> {
        if !self.is_host(caller) {
            return None;
        }
        self.current_round = None;
        Some(ServerEvent::NewRoundReady {
            round_number: self.round_number + 1,
            scores: self.scores,
        })
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

// =========================================================================
// Tests
// =========================================================================
