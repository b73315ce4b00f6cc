//! The logged in user's identity, and the operations which create and
//! destroy it.

mod storage;

pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};

use crate::{
    endpoints::{self, Gateway, Registration},
    error::{ApiError, Failure},
};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fmt::{self, Debug, Formatter},
    sync::{Arc, PoisonError, RwLock},
};

/// The identity of a logged in user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub token: String,
}

impl Session {
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Session {
            user_id: user_id.into(),
            email: email.into(),
            token: token.into(),
        }
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Shared, persisted state holding the current [`Session`] (if any).
///
/// Clones refer to the same session. The user id, email, and token are only
/// ever replaced or removed together.
#[derive(Debug, Clone)]
pub struct SessionContext {
    current: Arc<RwLock<Option<Session>>>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionContext {
    /// Create a context backed by `storage`, restoring any session it already
    /// holds.
    ///
    /// A corrupt session is discarded rather than treated as an error, the
    /// user will just need to log in again.
    pub fn new<S>(storage: S) -> Result<SessionContext, StorageError>
    where
        S: SessionStorage + 'static,
    {
        let current = match storage.load() {
            Ok(session) => session,
            Err(StorageError::Corrupt { path, inner }) => {
                log::warn!(
                    "Discarding the corrupt session at {}: {}",
                    path.display(),
                    inner
                );
                storage.clear()?;
                None
            },
            Err(other) => return Err(other),
        };

        if let Some(session) = &current {
            log::debug!("Restored the session for {}", session.email);
        }

        Ok(SessionContext {
            current: Arc::new(RwLock::new(current)),
            storage: Arc::new(storage),
        })
    }

    /// A context which only lives as long as the process.
    pub fn in_memory() -> SessionContext {
        SessionContext {
            current: Arc::new(RwLock::new(None)),
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    /// Replace the current session.
    pub fn set(&self, session: Session) -> Result<(), StorageError> {
        let mut current =
            self.current.write().unwrap_or_else(PoisonError::into_inner);
        self.storage.save(&session)?;
        *current = Some(session);

        Ok(())
    }

    /// Forget the current session.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut current =
            self.current.write().unwrap_or_else(PoisonError::into_inner);
        self.storage.clear()?;
        *current = None;

        Ok(())
    }

    /// Forget the current session, but only if it still uses `token`.
    /// Returns whether anything was cleared.
    pub fn clear_if_token(&self, token: &str) -> Result<bool, StorageError> {
        let mut current =
            self.current.write().unwrap_or_else(PoisonError::into_inner);

        match &*current {
            Some(session) if session.token == token => {
                self.storage.clear()?;
                *current = None;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Is there a token for the current user?
    pub fn is_authenticated(&self) -> bool {
        self.read(|session| !session.token.is_empty())
            .unwrap_or(false)
    }

    pub fn user_id(&self) -> Option<String> {
        self.read(|session| session.user_id.clone())
    }

    pub fn email(&self) -> Option<String> {
        self.read(|session| session.email.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.read(|session| session.token.clone())
    }

    fn read<F, T>(&self, func: F) -> Option<T>
    where
        F: FnOnce(&Session) -> T,
    {
        let current =
            self.current.read().unwrap_or_else(PoisonError::into_inner);
        current.as_ref().map(func)
    }
}

/// The result of a successful [`SessionStore::login()`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedIn {
    pub session: Session,
    /// Everything the backend sent back.
    pub payload: Value,
}

const LOGIN_FAILED: &str = "Login failed";
const LOGOUT_FAILED: &str = "Logout failed";

/// Authentication operations backed by a [`SessionContext`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    gateway: Gateway,
    session: SessionContext,
}

impl SessionStore {
    pub fn new(gateway: Gateway, session: SessionContext) -> Self {
        SessionStore { gateway, session }
    }

    pub fn gateway(&self) -> &Gateway { &self.gateway }

    pub fn session(&self) -> &SessionContext { &self.session }

    /// Is somebody logged in? This never touches the network.
    pub fn is_authenticated(&self) -> bool { self.session.is_authenticated() }

    pub fn user_id(&self) -> Option<String> { self.session.user_id() }

    pub fn email(&self) -> Option<String> { self.session.email() }

    pub fn token(&self) -> Option<String> { self.session.token() }

    /// Log in, persisting the new [`Session`] when the backend accepts our
    /// credentials.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoggedIn, ApiError> {
        let logged_in = endpoints::login(&self.gateway, email, password).await?;

        self.session
            .set(logged_in.session.clone())
            .map_err(|e| Failure::from(e).into_api_error(LOGIN_FAILED))?;

        log::info!("Logged in as {}", logged_in.session.email);
        Ok(logged_in)
    }

    /// Tell the backend to end the current session, then forget it locally.
    ///
    /// If the backend can't be reached or rejects the request, the local
    /// session is left untouched so the caller can retry (or [`forget()`] it).
    ///
    /// [`forget()`]: SessionStore::forget
    pub async fn logout(&self) -> Result<(), ApiError> {
        let token = match self.session.token() {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Err(Failure::MissingToken.into_api_error(LOGOUT_FAILED))
            },
        };

        endpoints::logout(&self.gateway, &token).await?;

        let cleared = self
            .session
            .clear_if_token(&token)
            .map_err(|e| Failure::from(e).into_api_error(LOGOUT_FAILED))?;

        if cleared {
            log::info!("Logged out");
        } else {
            log::debug!("The session changed while logging out, keeping it");
        }

        Ok(())
    }

    /// Drop the local session without telling the backend.
    pub fn forget(&self) -> Result<(), ApiError> {
        self.session
            .clear()
            .map_err(|e| Failure::from(e).into_api_error(LOGOUT_FAILED))
    }

    /// Create a new account. This doesn't log the new user in.
    pub async fn register(
        &self,
        registration: &Registration<'_>,
    ) -> Result<Value, ApiError> {
        endpoints::register(&self.gateway, registration).await
    }
}
