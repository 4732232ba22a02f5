//! Sign-up, login and logout pages.

use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::warn;

use crate::{
    application::accounts::AuthOutcome,
    domain::{
        accounts::{LoginForm, SignupForm},
        forms::FieldErrors,
    },
    presentation::views::{
        LayoutChrome, LayoutContext, LoginContext, LoginTemplate, SignupContext, SignupTemplate,
        render_template_response,
    },
};

use super::{
    HttpState, Viewer, error_response,
    session::{expired_session_cookie, safe_next, session_cookie},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginSubmission {
    username: String,
    password: String,
    next: Option<String>,
}

fn render_login(viewer: &Viewer, content: LoginContext) -> Response {
    let view = LayoutContext::new(LayoutChrome::new("Log in", viewer.user()), content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

fn render_signup(viewer: &Viewer, content: SignupContext) -> Response {
    let view = LayoutContext::new(LayoutChrome::new("Sign up", viewer.user()), content);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

pub(super) async fn signup_form(viewer: Viewer) -> Response {
    render_signup(&viewer, SignupContext::default())
}

pub(super) async fn signup_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Response {
    match state.accounts.signup(&form).await {
        Ok(AuthOutcome::SignedIn(session)) => {
            let jar = jar.add(session_cookie(&state.session_cookie, &session));
            (jar, Redirect::to("/")).into_response()
        }
        Ok(AuthOutcome::Invalid(errors)) => render_signup(
            &viewer,
            SignupContext {
                username: form.username,
                errors,
            },
        ),
        Err(err) => error_response(err, viewer.user()),
    }
}

pub(super) async fn login_form(viewer: Viewer, Query(query): Query<NextQuery>) -> Response {
    let next = safe_next(query.next.as_deref()).map(str::to_owned);
    render_login(
        &viewer,
        LoginContext {
            username: String::new(),
            next,
            errors: FieldErrors::new(),
        },
    )
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    jar: CookieJar,
    Form(submission): Form<LoginSubmission>,
) -> Response {
    let LoginSubmission {
        username,
        password,
        next,
    } = submission;
    let next = safe_next(next.as_deref()).map(str::to_owned);
    let form = LoginForm { username, password };

    match state.accounts.login(&form).await {
        Ok(AuthOutcome::SignedIn(session)) => {
            let jar = jar.add(session_cookie(&state.session_cookie, &session));
            let target = next.as_deref().unwrap_or("/");
            (jar, Redirect::to(target)).into_response()
        }
        Ok(AuthOutcome::Invalid(errors)) => render_login(
            &viewer,
            LoginContext {
                username: form.username,
                next,
                errors,
            },
        ),
        Err(err) => error_response(err, viewer.user()),
    }
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(&state.session_cookie)
        && let Err(err) = state.accounts.logout(cookie.value()).await
    {
        warn!(
            target = "postboard::http::auth",
            error = %err,
            "failed to delete session on logout"
        );
    }

    let jar = jar.remove(expired_session_cookie(&state.session_cookie));
    (jar, Redirect::to("/")).into_response()
}
