//! Access tokens.
//!
//! After a successful login or registration, the server hands out an HS256-signed JWT carrying the user's id, name and
//! role. Clients present it in the `Authorization: Bearer <token>` header. The [ACL middleware](crate::middleware)
//! validates the token once per request and stores the [`JwtClaims`] in the request extensions, from where handlers
//! pick them up by declaring a `JwtClaims` argument.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::Duration;
use jwt_compact::{
    alg::{Hs256, Hs256Key},
    AlgorithmExt,
    Claims,
    Header,
    TimeOptions,
    UntrustedToken,
};
use log::*;
use serde::{Deserialize, Serialize};
use topup_engine::{db_types::Role, order_objects::Caller};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtClaims {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl JwtClaims {
    pub fn new<S: Into<String>>(user_id: i64, username: S, role: Role) -> Self {
        Self { user_id, username: username.into(), role }
    }

    pub fn caller(&self) -> Caller {
        Caller::new(self.user_id, self.role)
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned().ok_or_else(|| {
            warn!("🔐️ No JWT claims found in request extensions. Is the route wrapped in the ACL middleware?");
            ServerError::AuthenticationError(AuthError::MissingToken)
        });
        ready(claims)
    }
}

//--------------------------------------------   TokenIssuer  ----------------------------------------------------------
pub struct TokenIssuer {
    key: Hs256Key,
    expiry: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let key = Hs256Key::new(config.jwt_secret.reveal().as_bytes());
        Self { key, expiry: config.jwt_expiry }
    }

    pub fn issue_token(&self, claims: JwtClaims, expiry: Option<Duration>) -> Result<String, ServerError> {
        let header = Header::empty().with_token_type("JWT");
        let duration = expiry.unwrap_or(self.expiry);
        let claims = Claims::new(claims).set_duration_and_issuance(&TimeOptions::default(), duration);
        let token = Hs256
            .token(&header, &claims, &self.key)
            .map_err(|e| ServerError::CouldNotSerializeAccessToken(e.to_string()))?;
        trace!("🔐️ Issued access token for user #{}, valid for {} hrs", claims.custom.user_id, duration.num_hours());
        Ok(token)
    }
}

//--------------------------------------------  TokenValidator  --------------------------------------------------------
pub struct TokenValidator {
    key: Hs256Key,
}

impl TokenValidator {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: Hs256Key::new(config.jwt_secret.reveal().as_bytes()) }
    }

    /// Checks the signature and expiry of the token and returns the claims it carries.
    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let untrusted = UntrustedToken::new(token).map_err(|e| {
            debug!("🔐️ Access token is not in the correct format. {e}");
            AuthError::InvalidToken(e.to_string())
        })?;
        let token = Hs256.validator::<JwtClaims>(&self.key).validate(&untrusted).map_err(|e| {
            debug!("🔐️ Access token failed validation. {e}");
            AuthError::InvalidToken(e.to_string())
        })?;
        let claims = token.claims().validate_expiration(&TimeOptions::default()).map_err(|e| {
            debug!("🔐️ Access token has expired. {e}");
            AuthError::InvalidToken(e.to_string())
        })?;
        Ok(claims.custom.clone())
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
