//! Cookie sessions: who is making the request, and the login redirect.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{Uri, request::Parts},
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::warn;
use url::form_urlencoded::byte_serialize;

use crate::application::accounts::IssuedSession;
use crate::domain::entities::UserRecord;

use super::HttpState;

pub const LOGIN_PATH: &str = "/auth/login/";

/// The signed-in user, if any. Resolved once per request.
#[derive(Clone, Debug, Default)]
pub struct Viewer(pub Option<UserRecord>);

impl Viewer {
    pub fn user(&self) -> Option<&UserRecord> {
        self.0.as_ref()
    }
}

impl FromRequestParts<HttpState> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(viewer) = parts.extensions.get::<Viewer>() {
            return Ok(viewer.clone());
        }

        let jar = CookieJar::from_headers(&parts.headers);
        let user = match jar.get(&state.session_cookie) {
            Some(cookie) => match state.accounts.authenticate(cookie.value()).await {
                Ok(user) => user,
                Err(err) => {
                    warn!(
                        target = "postboard::http::session",
                        error = %err,
                        "session lookup failed; treating request as anonymous"
                    );
                    None
                }
            },
            None => None,
        };

        let viewer = Viewer(user);
        parts.extensions.insert(viewer.clone());
        Ok(viewer)
    }
}

/// A signed-in user. Anonymous requests are redirected to the login page.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub UserRecord);

impl FromRequestParts<HttpState> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        let viewer = match Viewer::from_request_parts(parts, state).await {
            Ok(viewer) => viewer,
            Err(never) => match never {},
        };
        match viewer.0 {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(login_redirect(&parts.uri)),
        }
    }
}

pub fn login_redirect(uri: &Uri) -> Redirect {
    let next = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let encoded: String = byte_serialize(next.as_bytes()).collect();
    Redirect::to(&format!("{LOGIN_PATH}?next={encoded}"))
}

/// Accepts only local absolute paths as post-login destinations.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|path| path.starts_with('/') && !path.starts_with("//") && !path.contains('\\'))
}

pub fn session_cookie(name: &str, session: &IssuedSession) -> Cookie<'static> {
    Cookie::build((name.to_owned(), session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .expires(session.expires_at)
        .build()
}

pub fn expired_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_owned(), String::new()))
        .path("/")
        .build()
}
