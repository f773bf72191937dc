use warp::{
    reject::{self, Rejection},
    Filter,
};

use super::jwt::{verify_jwt_session, SessionData, SessionKeys};

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug)]
pub struct Unauthorized;

impl reject::Reject for Unauthorized {}

pub fn with_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::cookie::cookie::<String>(SESSION_COOKIE).and_then(move |session: String| {
        let keys = keys.clone();
        async move {
            match verify_jwt_session(&session, &keys) {
                Ok(data) => Ok(SessionData::from(data)),
                Err(_) => Err(reject::custom(Unauthorized)),
            }
        }
    })
}

/// Resolves to `None` for anonymous viewers and for stale or forged cookies.
pub fn with_possible_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).and_then(move |session: Option<String>| {
        let session = session
            .and_then(|token| verify_jwt_session(&token, &keys).ok())
            .map(SessionData::from);
        async move { Ok::<_, Rejection>(session) }
    })
}
