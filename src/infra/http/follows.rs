use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};

use super::{CurrentUser, HttpState, error_response};

pub(super) async fn profile_follow(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Response {
    match state.follows.follow(&user, &username).await {
        Ok(_) => Redirect::to(&format!("/profile/{username}/")).into_response(),
        Err(err) => error_response(err, Some(&user)),
    }
}

/// Missing edges surface as 404 rather than a silent redirect.
pub(super) async fn profile_unfollow(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Response {
    match state.follows.unfollow(&user, &username).await {
        Ok(()) => Redirect::to(&format!("/profile/{username}/")).into_response(),
        Err(err) => error_response(err, Some(&user)),
    }
}
