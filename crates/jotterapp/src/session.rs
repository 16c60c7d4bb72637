//! The logged-in user and their bearer credential.
//!
//! The session is the only holder of the credential. It is discarded on
//! logout and on any authorization failure; the UI then sends the user back
//! to the login screen.

use crate::error::{JotterError, Result};
use crate::model::{ItemId, User};
use crate::remote::{AuthToken, LoginResponse};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: AuthToken,
    pub user: User,
}

impl From<LoginResponse> for Session {
    fn from(login: LoginResponse) -> Self {
        Self {
            token: login.token,
            user: login.user,
        }
    }
}

/// Shared slot holding the current session, if any.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot(Arc<RwLock<Option<Session>>>);

impl SessionSlot {
    pub fn new(session: Option<Session>) -> Self {
        Self(Arc::new(RwLock::new(session)))
    }

    pub fn get(&self) -> Option<Session> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, session: Option<Session>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    pub fn take(&self) -> Option<Session> {
        self.0.write().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn token(&self) -> Result<AuthToken> {
        self.get().map(|s| s.token).ok_or(JotterError::NotLoggedIn)
    }

    pub fn user_id(&self) -> Option<ItemId> {
        self.get().map(|s| s.user.id)
    }

    pub fn is_logged_in(&self) -> bool {
        self.get().is_some()
    }

    pub fn autosave(&self) -> bool {
        self.get().is_some_and(|s| s.user.autosave)
    }

    /// Replaces the cached user record; the credential stays.
    pub fn set_user(&self, user: User) {
        if let Some(session) = self.0.write().unwrap_or_else(PoisonError::into_inner).as_mut() {
            session.user = user;
        }
    }

    pub fn set_autosave(&self, enabled: bool) {
        if let Some(session) = self.0.write().unwrap_or_else(PoisonError::into_inner).as_mut() {
            session.user.autosave = enabled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            token: AuthToken::new("tok"),
            user: User {
                id: ItemId::new("u1"),
                firstname: "Ada".into(),
                lastname: "L".into(),
                email: "ada@example.com".into(),
                autosave: false,
            },
        }
    }

    #[test]
    fn empty_slot_is_not_logged_in() {
        let slot = SessionSlot::default();
        assert!(matches!(slot.token(), Err(JotterError::NotLoggedIn)));
        assert!(!slot.autosave());
    }

    #[test]
    fn session_round_trips_through_json() {
        let json = serde_json::to_string(&session()).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session());
    }

    #[test]
    fn autosave_updates_in_place() {
        let slot = SessionSlot::new(Some(session()));
        slot.set_autosave(true);
        assert!(slot.autosave());
        assert!(slot.take().is_some());
        assert!(!slot.is_logged_in());
    }

    #[test]
    fn new_user_record_keeps_the_token() {
        let slot = SessionSlot::new(Some(session()));
        let mut user = session().user;
        user.firstname = "Augusta".into();

        slot.set_user(user);

        assert_eq!(slot.get().unwrap().user.firstname, "Augusta");
        assert_eq!(slot.token().unwrap(), AuthToken::new("tok"));
        SessionSlot::default().set_user(session().user);
    }
}
