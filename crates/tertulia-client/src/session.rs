//! Per sign-in session state.
//!
//! Created empty at start, filled by login and wiped by logout.  Nothing in
//! here is persisted: a reload starts with no selection and no pending reply.

use std::sync::{Mutex, MutexGuard};

use tertulia_shared::{ReplyRef, User, UserId};

use crate::error::{ClientError, Result};
use crate::selection::{transition, SelectTarget, Selection};

#[derive(Debug, Default)]
struct SessionState {
    user: Option<User>,
    selection: Selection,
    reply: Option<ReplyRef>,
}

#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn begin(&self, user: User) {
        let mut state = self.lock();
        *state = SessionState {
            user: Some(user),
            ..SessionState::default()
        };
    }

    /// Tear the session down, returning the user that was signed in.
    pub fn end(&self) -> Option<User> {
        let mut state = self.lock();
        std::mem::take(&mut *state).user
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub fn current_uid(&self) -> Option<UserId> {
        self.lock().user.as_ref().map(|u| u.uid.clone())
    }

    pub fn require_user(&self) -> Result<User> {
        self.current_user().ok_or(ClientError::NotSignedIn)
    }

    /// Replace the cached profile after a write the session made itself.
    pub fn refresh_user(&self, user: User) {
        let mut state = self.lock();
        if state.user.as_ref().map(|u| &u.uid) == Some(&user.uid) {
            state.user = Some(user);
        }
    }

    pub fn selection(&self) -> Selection {
        self.lock().selection.clone()
    }

    /// Apply a selection.  Returns the new state and whether it changed.
    /// A change drops any reply in progress.
    pub fn select(&self, target: SelectTarget) -> (Selection, bool) {
        let mut state = self.lock();
        let uid = state.user.as_ref().map(|u| u.uid.clone());
        let next = transition(uid.as_ref(), &state.selection, target);
        let changed = next != state.selection;
        if changed {
            state.selection = next.clone();
            state.reply = None;
        }
        (next, changed)
    }

    pub fn pending_reply(&self) -> Option<ReplyRef> {
        self.lock().reply.clone()
    }

    pub fn set_reply(&self, reply: Option<ReplyRef>) {
        self.lock().reply = reply;
    }

    /// Clear the pending reply if it is still `reply`.
    pub fn consume_reply(&self, reply: &ReplyRef) {
        let mut state = self.lock();
        if state.reply.as_ref() == Some(reply) {
            state.reply = None;
        }
    }
}
