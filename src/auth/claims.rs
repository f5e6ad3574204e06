use serde::{Deserialize, Serialize};

/// JWT payload for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>, // subject email
    pub iat: i64,            // issued at (unix timestamp)
    pub exp: i64,            // expires at (unix timestamp)
    pub iss: String,         // issuer
    pub aud: String,         // audience
}
