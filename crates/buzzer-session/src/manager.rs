//! The session manager: tracks which connection is bound to which room.
//!
//! # Concurrency note
//!
//! `SessionManager` is a plain `HashMap` wrapper. The server keeps it
//! behind a mutex and holds that lock only for the map operation itself.

use std::collections::HashMap;

use buzzer_protocol::{PlayerId, RoomCode};

use crate::{Session, SessionError};

/// Registry of live connection → room bindings.
///
/// ```text
/// create-room / join-room ──→ bind() ──→ [bound]
///                                           │
///        leave-room / disconnect ──→ unbind()
///        host leaves (room closed) ──→ unbind_room()
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<PlayerId, Session>,
}

impl SessionManager {
    /// Creates an empty session manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new binding.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyBound`] if this connection already
    /// has a session; the existing one is left untouched.
    pub fn bind(&mut self, session: Session) -> Result<&Session, SessionError> {
        if let Some(existing) = self.sessions.get(&session.player_id) {
            return Err(SessionError::AlreadyBound(
                session.player_id,
                existing.room_code.clone(),
            ));
        }

        let player_id = session.player_id;
        tracing::debug!(
            %player_id,
            room = %session.room_code,
            host = session.is_host(),
            "session bound"
        );
        Ok(self.sessions.entry(player_id).or_insert(session))
    }

    /// Removes and returns a connection's session, if it has one.
    pub fn unbind(&mut self, player_id: PlayerId) -> Option<Session> {
        let session = self.sessions.remove(&player_id)?;
        tracing::debug!(%player_id, room = %session.room_code, "session unbound");
        Some(session)
    }

    /// Removes every session bound to `room_code` (host and players).
    ///
    /// Called when a room closes so its former players are free to join
    /// another one. Returns the removed player IDs.
    pub fn unbind_room(&mut self, room_code: &RoomCode) -> Vec<PlayerId> {
        let mut removed = Vec::new();
        self.sessions.retain(|player_id, session| {
            if &session.room_code == room_code {
                removed.push(*player_id);
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            tracing::debug!(room = %room_code, count = removed.len(), "room sessions unbound");
        }
        removed
    }

    /// Looks up a connection's session.
    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// Returns the number of bound connections.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no connection is bound.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use buzzer_protocol::Team;

    use crate::Role;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn code(s: &str) -> RoomCode {
        RoomCode::parse(s).unwrap()
    }

    #[test]
    fn test_bind_host_returns_session() {
        let mut mgr = SessionManager::new();
        let session = mgr.bind(Session::host(pid(1), code("A7F3"), "Host")).unwrap();
        assert!(session.is_host());
        assert_eq!(session.team(), None);
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn test_bind_player_keeps_team() {
        let mut mgr = SessionManager::new();
        let session = mgr
            .bind(Session::player(pid(2), code("A7F3"), "A", Team::Red))
            .unwrap();
        assert_eq!(session.role, Role::Player(Team::Red));
        assert_eq!(session.team(), Some(Team::Red));
    }

    #[test]
    fn test_bind_twice_returns_already_bound() {
        let mut mgr = SessionManager::new();
        mgr.bind(Session::host(pid(1), code("A7F3"), "Host")).unwrap();

        let result = mgr.bind(Session::player(pid(1), code("B8G4"), "A", Team::Blue));
        assert!(matches!(
            result,
            Err(SessionError::AlreadyBound(p, ref c)) if p == pid(1) && c.as_str() == "A7F3"
        ));
        // The first binding survives.
        assert!(mgr.get(&pid(1)).unwrap().is_host());
    }

    #[test]
    fn test_unbind_removes_session() {
        let mut mgr = SessionManager::new();
        mgr.bind(Session::player(pid(2), code("A7F3"), "A", Team::Red))
            .unwrap();

        let removed = mgr.unbind(pid(2)).unwrap();
        assert_eq!(removed.name, "A");
        assert!(mgr.get(&pid(2)).is_none());
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_unbind_unknown_is_none() {
        let mut mgr = SessionManager::new();
        assert!(mgr.unbind(pid(99)).is_none());
    }

    #[test]
    fn test_unbind_room_only_touches_that_room() {
        let mut mgr = SessionManager::new();
        mgr.bind(Session::host(pid(1), code("A7F3"), "Host")).unwrap();
        mgr.bind(Session::player(pid(2), code("A7F3"), "A", Team::Red))
            .unwrap();
        mgr.bind(Session::player(pid(3), code("B8G4"), "C", Team::Blue))
            .unwrap();

        let mut removed = mgr.unbind_room(&code("A7F3"));
        removed.sort();
        assert_eq!(removed, vec![pid(1), pid(2)]);
        assert_eq!(mgr.len(), 1);
        assert!(mgr.get(&pid(3)).is_some());
    }

    #[test]
    fn test_rebind_after_unbind() {
        let mut mgr = SessionManager::new();
        mgr.bind(Session::player(pid(2), code("A7F3"), "A", Team::Red))
            .unwrap();
        mgr.unbind_room(&code("A7F3"));

        assert!(
            mgr.bind(Session::player(pid(2), code("B8G4"), "A", Team::Blue))
                .is_ok()
        );
    }
}
