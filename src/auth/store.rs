use std::sync::Arc;

use anyhow::Context;
use tracing::{error, warn};

use super::error::AuthError;
use super::password::Argon2Hasher;
use super::repo::{InMemoryUserRepository, UserRepository};
use super::repo_types::{NewUser, User, UserId};

// Verified against when the email is unknown.
const DUMMY_PASSWORD: &str = "unknown-account-placeholder";

/// Owns the user accounts. Nothing else writes to the repository.
#[derive(Clone)]
pub struct CredentialStore {
    repo: Arc<dyn UserRepository>,
    hasher: Argon2Hasher,
    dummy_hash: Arc<str>,
}

impl CredentialStore {
    /// Hashes a placeholder once at the configured cost, so an unknown email
    /// costs the same Argon2 work as a wrong password.
    pub fn new(repo: Arc<dyn UserRepository>, hasher: Argon2Hasher) -> anyhow::Result<Self> {
        let dummy_hash = hasher
            .hash_password(DUMMY_PASSWORD)
            .context("hash placeholder password")?;
        Ok(Self {
            repo,
            hasher,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn in_memory(hasher: Argon2Hasher) -> anyhow::Result<Self> {
        Self::new(Arc::new(InMemoryUserRepository::new()), hasher)
    }

    /// Creates an account and returns its id.
    ///
    /// Hashing happens before the repository lock is taken; the repository
    /// re-checks the email when it writes, so a racing registration still
    /// loses with [`AuthError::DuplicateAccount`].
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<UserId, AuthError> {
        if password != confirm_password {
            warn!(email = %email, "registration passwords do not match");
            return Err(AuthError::PasswordMismatch);
        }

        // Skip the expensive hash when the answer is already known.
        if self.repo.find_by_email(email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AuthError::DuplicateAccount);
        }

        let password_hash = self.hash(password).await?;
        let user = self
            .repo
            .insert(NewUser {
                name: name.to_owned(),
                email: email.to_owned(),
                password_hash,
            })
            .await
            .inspect_err(|e| {
                if matches!(e, AuthError::DuplicateAccount) {
                    warn!(email = %email, "email registered concurrently");
                }
            })?;
        Ok(user.id)
    }

    pub async fn lookup_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        self.repo.find_by_email(email).await
    }

    /// Unknown email and wrong password both yield [`AuthError::InvalidCredentials`]
    /// after one Argon2 verification.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self.repo.find_by_email(email).await?;

        let hasher = self.hasher.clone();
        let plain = password.to_owned();
        let stored = match &user {
            Some(user) => Arc::from(user.password_hash.as_str()),
            None => self.dummy_hash.clone(),
        };
        let verified = tokio::task::spawn_blocking(move || hasher.verify_password(&plain, &stored))
            .await
            .context("password verification task")?;

        let Some(user) = user else {
            warn!(email = %email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        match verified {
            Ok(true) => Ok(user),
            Ok(false) => {
                warn!(email = %email, user_id = user.id, "login invalid password");
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                error!(error = %e, user_id = user.id, "stored password hash is unreadable");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    // Argon2 is CPU-bound; keep it off the async workers.
    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let plain = password.to_owned();
        let hash = tokio::task::spawn_blocking(move || hasher.hash_password(&plain))
            .await
            .context("password hashing task")??;
        Ok(hash)
    }
}
