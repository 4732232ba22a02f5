//! Sign-up, login and cookie sessions.
//!
//! Passwords are stored as Argon2 PHC strings. A session token has the shape
//! `<session id>_<secret>`; only the SHA-256 digest of the secret is stored,
//! and lookups compare digests in constant time.
//!
//! Argon2 runs on the blocking pool. Logins for unknown usernames still pay
//! for one verification against a throwaway hash.

use std::sync::{Arc, OnceLock};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{
    CreateSessionParams, CreateUserParams, RepoError, SessionsRepo, UsersRepo,
};
use crate::domain::accounts::{LoginForm, SignupForm};
use crate::domain::entities::UserRecord;
use crate::domain::forms::FieldErrors;

const MIN_SECRET_LEN: usize = 32;

static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// Field name used for errors that concern the form as a whole.
pub const FORM_ERRORS: &str = "form";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: UserRecord,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug)]
pub enum AuthOutcome {
    SignedIn(IssuedSession),
    Invalid(FieldErrors),
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    /// Registers a user and signs them in.
    pub async fn signup(&self, form: &SignupForm) -> Result<AuthOutcome, AccountError> {
        let draft = match form.validate() {
            Ok(draft) => draft,
            Err(errors) => return Ok(AuthOutcome::Invalid(errors)),
        };

        let username_taken = || {
            let mut errors = FieldErrors::new();
            errors.push("username", "A user with that username already exists.");
            AuthOutcome::Invalid(errors)
        };

        if self.users.find_by_username(&draft.username).await?.is_some() {
            return Ok(username_taken());
        }

        let password = draft.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|err| AccountError::Hashing(err.to_string()))??;
        let user = match self
            .users
            .create_user(CreateUserParams {
                username: draft.username,
                password_hash,
            })
            .await
        {
            Ok(user) => user,
            Err(RepoError::Duplicate { .. }) => return Ok(username_taken()),
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "postboard::application::accounts",
            username = %user.username,
            "user registered"
        );
        let session = self.issue_session(user).await?;
        Ok(AuthOutcome::SignedIn(session))
    }

    pub async fn login(&self, form: &LoginForm) -> Result<AuthOutcome, AccountError> {
        if let Err(errors) = form.validate() {
            return Ok(AuthOutcome::Invalid(errors));
        }

        let user = self.users.find_by_username(form.username.trim()).await?;
        let stored = match &user {
            Some(user) => user.password_hash.clone(),
            None => dummy_password_hash().to_string(),
        };
        let password = form.password.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|err| AccountError::Hashing(err.to_string()))?;

        let Some(user) = user.filter(|_| verified) else {
            let mut errors = FieldErrors::new();
            errors.push(
                FORM_ERRORS,
                "Please enter a correct username and password. Note that both fields may be case-sensitive.",
            );
            return Ok(AuthOutcome::Invalid(errors));
        };

        let session = self.issue_session(user).await?;
        Ok(AuthOutcome::SignedIn(session))
    }

    /// Ends the session identified by `token`. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        if let Some((id, _)) = parse_token(token) {
            self.sessions.delete_session(id).await?;
        }
        Ok(())
    }

    /// Resolves the user behind a session cookie value.
    pub async fn authenticate(&self, token: &str) -> Result<Option<UserRecord>, AccountError> {
        let Some((id, secret)) = parse_token(token) else {
            return Ok(None);
        };
        let Some(session) = self.sessions.find_session(id).await? else {
            return Ok(None);
        };

        if session.expires_at <= OffsetDateTime::now_utc() {
            debug!(
                target = "postboard::application::accounts",
                session_id = %id,
                "expired session presented"
            );
            self.sessions.delete_session(id).await?;
            return Ok(None);
        }

        if session.token_hash.ct_eq(&hash_secret(secret)).unwrap_u8() == 0 {
            return Ok(None);
        }

        Ok(self.users.find_by_id(session.user_id).await?)
    }

    /// Drops every session past its expiry; returns how many were removed.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AccountError> {
        Ok(self
            .sessions
            .delete_expired(OffsetDateTime::now_utc())
            .await?)
    }

    async fn issue_session(&self, user: UserRecord) -> Result<IssuedSession, AccountError> {
        let id = Uuid::new_v4();
        let secret = generate_secret();
        let expires_at = OffsetDateTime::now_utc() + self.session_ttl;

        self.sessions
            .create_session(CreateSessionParams {
                id,
                user_id: user.id,
                token_hash: hash_secret(&secret),
                expires_at,
            })
            .await?;

        Ok(IssuedSession {
            token: format!("{}_{secret}", id.simple()),
            expires_at,
            user,
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccountError::Hashing(err.to_string()))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// PHC string of a random password, used so unknown usernames cost as much
/// as a wrong password. Empty if hashing ever fails, which verifies nothing.
pub fn dummy_password_hash() -> &'static str {
    DUMMY_HASH.get_or_init(|| hash_password(&generate_secret()).unwrap_or_default())
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn parse_token(token: &str) -> Option<(Uuid, &str)> {
    let (id, secret) = token.split_once('_')?;
    if secret.len() < MIN_SECRET_LEN {
        return None;
    }
    let id = Uuid::parse_str(id).ok()?;
    Some((id, secret))
}
