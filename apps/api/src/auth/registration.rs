//! Registration with a one-time passcode, and password login.
//!
//! A registration request creates an unverified student account and a
//! pending record `{code, expires_at}` keyed by lowercased email. A later
//! request for the same email overwrites the record: while the account is
//! still unverified, asking again with the same password issues a fresh code
//! and supersedes the old one. Verification consumes
//! the record under the map's entry lock, so two verifications racing on one
//! email cannot both succeed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password_async, verify_password_async, PasswordHashError};
use crate::auth::token::{TokenCodec, TokenError};
use crate::models::user::{PublicUser, Role, User, UserPatch};
use crate::store::{Store, StoreError};

pub const OTP_TTL_MINUTES: i64 = 10;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("an account with this email already exists")]
    DuplicateAccount,

    #[error("no pending registration for this email")]
    NoPendingRequest,

    #[error("registration code expired")]
    Expired,

    #[error("registration code does not match")]
    InvalidCode,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is not verified")]
    NotVerified,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Hash(#[from] PasswordHashError),
}

/// Delivers a registration code to its owner.
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send(&self, email: &str, code: &str);
}

/// Writes the code to the log. Stands in for an email provider.
pub struct TracingOtpSender;

#[async_trait]
impl OtpSender for TracingOtpSender {
    async fn send(&self, email: &str, code: &str) {
        warn!(%email, %code, "registration code delivered to log only");
    }
}

#[derive(Debug, Clone)]
struct PendingRegistration {
    code: String,
    expires_at: DateTime<Utc>,
}

/// A successful verification or login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: PublicUser,
}

pub struct RegistrationFlow {
    store: Arc<dyn Store>,
    tokens: Arc<TokenCodec>,
    sender: Arc<dyn OtpSender>,
    pending: DashMap<String, PendingRegistration>,
}

impl RegistrationFlow {
    pub fn new(store: Arc<dyn Store>, tokens: Arc<TokenCodec>, sender: Arc<dyn OtpSender>) -> Self {
        Self {
            store,
            tokens,
            sender,
            pending: DashMap::new(),
        }
    }

    pub async fn request_registration(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        self.request_registration_at(name, email, password, Utc::now())
            .await
    }

    pub(crate) async fn request_registration_at(
        &self,
        name: &str,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let email = email.trim();
        if let Some(existing) = self.store.find_by_email(email).await? {
            if existing.is_verified
                || !verify_password_async(password, &existing.password_hash).await
            {
                return Err(AuthError::DuplicateAccount);
            }
            self.issue_code(&existing.email, now).await;
            info!(%email, "registration code reissued");
            return Ok(());
        }

        let user = User {
            id: format!("student_{}", Uuid::new_v4().simple()),
            name: name.trim().to_string(),
            email: email.to_string(),
            password_hash: hash_password_async(password).await?,
            role: Role::Student,
            enrolled_course_ids: vec![],
            external_accounts: vec![],
            is_verified: false,
        };

        // The store re-checks the email atomically; a racing request loses here.
        match self.store.create(user).await {
            Ok(_) => {}
            Err(StoreError::Conflict(_)) => return Err(AuthError::DuplicateAccount),
            Err(e) => return Err(e.into()),
        }

        self.issue_code(email, now).await;
        info!(%email, "registration requested");
        Ok(())
    }

    /// Stores a fresh code for `email`, replacing any earlier one, and sends it.
    async fn issue_code(&self, email: &str, now: DateTime<Utc>) {
        let code = generate_code();
        self.pending.insert(
            pending_key(email),
            PendingRegistration {
                code: code.clone(),
                expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
            },
        );
        self.sender.send(email, &code).await;
    }

    pub async fn verify_registration(&self, email: &str, code: &str) -> Result<AuthSession, AuthError> {
        self.verify_registration_at(email, code, Utc::now()).await
    }

    pub(crate) async fn verify_registration_at(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthSession, AuthError> {
        let key = pending_key(email);
        let claimed = match self.pending.entry(key.clone()) {
            Entry::Vacant(_) => return Err(AuthError::NoPendingRequest),
            Entry::Occupied(entry) => {
                if now >= entry.get().expires_at {
                    entry.remove();
                    return Err(AuthError::Expired);
                }
                if entry.get().code != code.trim() {
                    return Err(AuthError::InvalidCode);
                }
                entry.remove()
            }
        };

        let user = match self.store.find_by_email(email.trim()).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(%email, "pending registration has no account");
                return Err(AuthError::NoPendingRequest);
            }
            Err(e) => {
                self.restore(key, claimed);
                return Err(e.into());
            }
        };

        let verified = match self.store.mutate(&user.id, UserPatch::verified()).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(AuthError::NoPendingRequest),
            Err(e) => {
                self.restore(key, claimed);
                return Err(e.into());
            }
        };

        let token = self.tokens.issue(&verified)?;
        info!(user_id = %verified.id, "registration verified");
        Ok(AuthSession {
            token,
            user: verified.to_public(),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let user = self
            .store
            .find_by_email(email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password_async(password, &user.password_hash).await {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_verified {
            return Err(AuthError::NotVerified);
        }

        let token = self.tokens.issue(&user)?;
        info!(user_id = %user.id, "login");
        Ok(AuthSession {
            token,
            user: user.to_public(),
        })
    }

    /// Puts a consumed record back after a store failure, unless a newer
    /// request has replaced it in the meantime.
    fn restore(&self, key: String, record: PendingRegistration) {
        self.pending.entry(key).or_insert(record);
    }
}

fn pending_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}
