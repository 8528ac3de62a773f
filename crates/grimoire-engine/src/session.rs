//! In-memory conversation history keyed by session id.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use grimoire_core::traits::SessionStore;
use grimoire_core::types::Turn;

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Vec<Turn>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn history(&self, session_id: &str) -> Vec<Turn> {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.get(session_id).cloned().unwrap_or_default()
    }

    fn append(&self, session_id: &str, turn: Turn) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.entry(session_id.to_string()).or_default().push(turn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grimoire_core::types::Role;

    #[test]
    fn sessions_are_isolated() {
        let store = InMemorySessionStore::new();
        store.append("alice", Turn::user("how far can I move?"));
        store.append("alice", Turn::assistant("Your speed, usually 30 feet."));
        store.append("bob", Turn::user("what is a bonus action?"));

        let alice = store.history("alice");
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[0].role, Role::User);
        assert_eq!(alice[1].role, Role::Assistant);
        assert_eq!(store.history("bob").len(), 1);
        assert!(store.history("carol").is_empty());
    }
}
