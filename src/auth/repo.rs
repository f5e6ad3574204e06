use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::AuthError;
use super::repo_types::{NewUser, User, UserId};

/// Storage seam for user accounts.
///
/// `insert` must check for an existing email and write the record as one
/// atomic step: of two concurrent inserts for the same email, exactly one
/// succeeds and the other gets [`AuthError::DuplicateAccount`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn insert(&self, new: NewUser) -> Result<User, AuthError>;
}

#[derive(Debug)]
struct Users {
    by_email: HashMap<String, User>,
    next_id: UserId,
}

/// Process-lifetime store. Readers share the lock; an insert holds it
/// exclusively for the duplicate check and the write only.
#[derive(Debug)]
pub struct InMemoryUserRepository {
    inner: RwLock<Users>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Users {
                by_email: HashMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let users = self.inner.read().await;
        Ok(users.by_email.get(email).cloned())
    }

    async fn insert(&self, new: NewUser) -> Result<User, AuthError> {
        let mut users = self.inner.write().await;
        if users.by_email.contains_key(&new.email) {
            return Err(AuthError::DuplicateAccount);
        }

        let user = User {
            id: users.next_id,
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
        };
        users.next_id += 1;
        users.by_email.insert(user.email.clone(), user.clone());
        Ok(user)
    }
}
