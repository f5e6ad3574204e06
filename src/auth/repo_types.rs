use serde::Serialize;

pub type UserId = u64;

/// Stored user account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,                   // sequential, starts at 1
    pub name: String,                 // display name
    pub email: String,                // unique lookup key, case-sensitive
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 hash, not exposed in JSON
}

/// Fields supplied by the caller when inserting an account; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}
