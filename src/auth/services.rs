use tracing::{info, warn};

use super::dto::{PublicUser, TokenResponse, TokenType};
use super::error::AuthError;
use super::jwt::TokenService;
use super::repo_types::UserId;
use super::store::CredentialStore;

/// Register, login and who-am-i, composed from the credential store and the
/// token service.
#[derive(Clone)]
pub struct AuthService {
    credentials: CredentialStore,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(credentials: CredentialStore, tokens: TokenService) -> Self {
        Self {
            credentials,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<UserId, AuthError> {
        let id = self
            .credentials
            .register(name, email, password, confirm_password)
            .await?;
        info!(user_id = id, email = %email, "user registered");
        Ok(id)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, AuthError> {
        let user = self.credentials.verify_credentials(email, password).await?;
        let access_token = self.tokens.issue(&user.email, None)?;
        info!(user_id = user.id, email = %user.email, "user logged in");
        Ok(TokenResponse {
            access_token,
            token_type: TokenType::Bearer,
        })
    }

    /// Resolves a bearer token to the account it names. A valid token whose
    /// account no longer exists fails as [`AuthError::InvalidCredentials`].
    pub async fn who_am_i(&self, token: &str) -> Result<PublicUser, AuthError> {
        let email = self.tokens.verify(token)?;
        match self.credentials.lookup_by_email(&email).await? {
            Some(user) => Ok(user.into()),
            None => {
                warn!(email = %email, "token subject has no account");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}
