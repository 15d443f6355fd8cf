use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SessionError;
use crate::identity::{session_id, unix_now};
use crate::session::{Session, SessionSettings};
use crate::transport::ChatTransport;

/// Registry holding at most one live session per user identity.
///
/// Acquiring replaces whatever session the user had; there is no release.
pub struct SessionPool<T> {
    transport: Arc<T>,
    settings: SessionSettings,
    sessions: HashMap<String, Session<T>>,
    generation: u64,
}

impl<T: ChatTransport> SessionPool<T> {
    pub fn new(transport: Arc<T>, settings: SessionSettings) -> Self {
        Self {
            transport,
            settings,
            sessions: HashMap::new(),
            generation: 0,
        }
    }

    /// Create a fresh session for `user`, replacing any previous one.
    ///
    /// The session streams by default, carries `user` as the end-user id and
    /// has its history restored when the settings ask for it. If creation or
    /// restore fails, the previous session stays registered.
    pub fn acquire(&mut self, user: &str) -> Result<&mut Session<T>, SessionError> {
        self.generation += 1;
        let id = session_id(user, unix_now(), self.generation);
        let mut session = Session::new(id, user, Arc::clone(&self.transport), &self.settings)?;
        if self.settings.restore_history {
            session.restore()?;
        }
        tracing::info!(user, session = session.id(), "session created");

        Ok(match self.sessions.entry(user.to_owned()) {
            Entry::Occupied(mut entry) => {
                let previous = entry.insert(session);
                tracing::debug!(user, previous = previous.id(), "replaced session");
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(session),
        })
    }

    pub fn get(&self, user: &str) -> Option<&Session<T>> {
        self.sessions.get(user)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
