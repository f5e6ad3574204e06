use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every way an auth operation can fail.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("an account with this email already exists")]
    DuplicateAccount,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("token is malformed or its signature is invalid")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token carries no subject")]
    MissingSubject,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// True for the failures that answer 401 and ask the client to re-authenticate.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::Malformed
                | AuthError::Expired
                | AuthError::MissingSubject
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::PasswordMismatch | AuthError::DuplicateAccount => StatusCode::BAD_REQUEST,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        // All 401s share one body so a caller cannot tell an unknown account
        // from a bad password or a bad token.
        let detail = match &self {
            AuthError::PasswordMismatch | AuthError::DuplicateAccount => self.to_string(),
            AuthError::Internal(e) => {
                error!(error = %e, "internal auth error");
                "internal server error".to_string()
            }
            _ => "could not validate credentials".to_string(),
        };

        let mut res = (status, Json(json!({ "detail": detail }))).into_response();
        if self.is_authentication_failure() {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res
    }
}
