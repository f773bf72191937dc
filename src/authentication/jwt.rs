use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::config::Config;
use crate::error::ActionError;
use crate::schema::{User, UserRole, Uuid};

use super::permissions::ActionType;

/// Signing key and token lifetime shared by every session operation.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], lifetime_hours: i64) -> Result<Self, ActionError> {
        let key = Hmac::new_from_slice(secret)
            .map_err(|_| ActionError::validation("Invalid session secret"))?;

        Ok(Self {
            key,
            lifetime: Duration::hours(lifetime_hours),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ActionError> {
        Self::new(
            config.session_secret.as_bytes(),
            config.session_lifetime_hours,
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub username: String,
    pub user_role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            user_role: role,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Utc::now().timestamp()).is_negative()
    }
}

/// The `current_user` every action receives from the session layer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub user_role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ActionError> {
        if !action.authenticate(self) {
            return Err(ActionError::permission(
                "You don't have permission to perform this action",
            ));
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            is_admin: value.user_role == UserRole::Admin,
            user_role: value.user_role,
        }
    }
}

impl From<&User> for SessionData {
    fn from(user: &User) -> Self {
        SessionData {
            user_id: user.id,
            username: user.username.to_owned(),
            user_role: user.role.to_owned(),
            is_admin: user.role == UserRole::Admin,
        }
    }
}

pub fn generate_jwt_session(user: &User, keys: &SessionKeys) -> Result<String, ActionError> {
    let claims = JwtSessionData::new(
        user.id,
        user.username.to_owned(),
        user.role.to_owned(),
        keys.lifetime,
    );

    claims.sign_with_key(&keys.key).map_err(|e| {
        log::error!("Failed to sign session: {e}");
        ActionError::permission("Could not create session")
    })
}

pub fn verify_jwt_session(token: &str, keys: &SessionKeys) -> Result<JwtSessionData, ActionError> {
    let session: JwtSessionData = token
        .verify_with_key(&keys.key)
        .map_err(|_| ActionError::permission("Invalid Session; Invalid token"))?;

    if session.is_expired() {
        return Err(ActionError::permission("Invalid session; Token expired"));
    }

    Ok(session)
}
