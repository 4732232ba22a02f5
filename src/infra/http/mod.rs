//! HTTP surface: shared state, router and handlers.

mod auth;
mod authoring;
mod follows;
mod middleware;
mod public;
mod session;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    application::{
        accounts::AccountService,
        error::{ErrorReport, HttpError},
        feed::FeedService,
        follows::FollowService,
        groups::GroupService,
        posts::PostService,
        repos::{HealthRepo, RepoError},
    },
    cache::{PageCacheState, page_cache_layer},
    domain::entities::UserRecord,
    infra::uploads::UploadStorage,
    presentation::views::{LayoutChrome, render_not_found_response},
};

pub use middleware::{RequestContext, log_responses, set_request_context};
pub use session::{CurrentUser, LOGIN_PATH, Viewer};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub groups: Arc<GroupService>,
    pub accounts: Arc<AccountService>,
    pub health: Arc<dyn HealthRepo>,
    pub uploads: Arc<UploadStorage>,
    pub cache: PageCacheState,
    pub session_cookie: String,
    pub upload_limit: usize,
}

pub fn build_router(state: HttpState) -> Router {
    // Only the index page is cached; everything else renders per request.
    let cached_routes = Router::new()
        .route("/", get(public::index))
        .route_layer(from_fn_with_state(state.cache.clone(), page_cache_layer));

    let routes = Router::new()
        .route("/group/create/", get(authoring::group_form).post(authoring::group_create))
        .route("/group/{slug}/", get(public::group_posts))
        .route("/profile/{username}/", get(public::profile))
        .route(
            "/profile/{username}/follow/",
            get(follows::profile_follow).post(follows::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(follows::profile_unfollow).post(follows::profile_unfollow),
        )
        .route("/follow/", get(public::follow_index))
        .route("/create/", get(authoring::create_form).post(authoring::create_submit))
        .route("/posts/{id}/", get(public::post_detail))
        .route(
            "/posts/{id}/edit/",
            get(authoring::edit_form).post(authoring::edit_submit),
        )
        .route("/posts/{id}/delete/", post(authoring::delete))
        .route("/posts/{id}/comment/", post(authoring::add_comment))
        .route("/auth/signup/", get(auth::signup_form).post(auth::signup_submit))
        .route("/auth/login/", get(auth::login_form).post(auth::login_submit))
        .route("/auth/logout/", post(auth::logout))
        .route("/media/{*path}", get(public::serve_media))
        .route("/_health/db", get(public::health));

    let upload_limit = state.upload_limit;
    cached_routes
        .merge(routes)
        .fallback(public::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(from_fn(log_responses))
        .layer(from_fn(set_request_context))
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Renders missing resources as the HTML 404 page and anything else as a plain error.
fn error_response(error: impl Into<HttpError>, viewer: Option<&UserRecord>) -> Response {
    let error = error.into();
    if error.status() != StatusCode::NOT_FOUND {
        return error.into_response();
    }

    let mut response = render_not_found_response(LayoutChrome::new("Not found", viewer));
    error.into_report().attach(&mut response);
    response
}
