use std::io::ErrorKind;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::{error::HttpError, pagination::parse_page_param},
    domain::error::DomainError,
    infra::uploads::UploadStorageError,
    presentation::views::{
        FeedView, FollowTemplate, GroupContext, GroupTemplate, IndexContext, IndexTemplate,
        LayoutChrome, LayoutContext, PostCard, PostDetailContext, PostDetailTemplate,
        ProfileContext, ProfileTemplate, render_not_found_response, render_template_response,
    },
};

use super::{CurrentUser, HttpState, Viewer, db_health_response, error_response};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    fn number(&self) -> Option<i64> {
        parse_page_param(self.page.as_deref())
    }
}

/// Path ids that are not numbers name no post.
pub(super) fn parse_post_id(raw: &str) -> Result<i64, DomainError> {
    raw.parse::<i64>()
        .map_err(|_| DomainError::not_found("post", raw))
}

pub(super) async fn index(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.index(query.number()).await {
        Ok(page) => {
            let content = IndexContext {
                feed: FeedView::from_page(&page),
            };
            let view = LayoutContext::new(LayoutChrome::new("Latest posts", viewer.user()), content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_response(err, viewer.user()),
    }
}

pub(super) async fn group_posts(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.group_feed(&slug, query.number()).await {
        Ok(feed) => {
            let content = GroupContext::new(&feed.group, FeedView::from_page(&feed.page));
            let chrome = LayoutChrome::new(feed.group.to_string(), viewer.user());
            let view = LayoutContext::new(chrome, content);
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_response(err, viewer.user()),
    }
}

pub(super) async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state
        .feed
        .profile(&username, query.number(), viewer.user())
        .await
    {
        Ok(profile) => {
            let can_follow = viewer
                .user()
                .is_some_and(|user| user.id != profile.author.id);
            let content = ProfileContext {
                username: profile.author.username.clone(),
                post_count: profile.post_count,
                following: profile.following,
                can_follow,
                feed: FeedView::from_page(&profile.page),
            };
            let chrome = LayoutChrome::new(
                format!("Profile of {}", profile.author.username),
                viewer.user(),
            );
            let view = LayoutContext::new(chrome, content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_response(err, viewer.user()),
    }
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(raw_id): Path<String>,
) -> Response {
    let id = match parse_post_id(&raw_id) {
        Ok(id) => id,
        Err(err) => return error_response(err, viewer.user()),
    };

    match state.feed.post_detail(id).await {
        Ok(detail) => {
            let can_edit = viewer
                .user()
                .is_some_and(|user| user.id == detail.post.author_id);
            let content = PostDetailContext {
                post: PostCard::from(&detail.post),
                author_post_count: detail.author_post_count,
                comments: detail.comments.iter().map(Into::into).collect(),
                can_edit,
                can_comment: viewer.user().is_some(),
            };
            let chrome = LayoutChrome::new(format!("Post {}", detail.post), viewer.user());
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_response(err, viewer.user()),
    }
}

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.follow_feed(&user, query.number()).await {
        Ok(page) => {
            let content = IndexContext {
                feed: FeedView::from_page(&page),
            };
            let view = LayoutContext::new(LayoutChrome::new("Following", Some(&user)), content);
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_response(err, Some(&user)),
    }
}

pub(super) async fn serve_media(
    State(state): State<HttpState>,
    Path(path): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.uploads.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored media"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read media file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    // Stored names embed a fresh uuid, so a path never changes content.
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

pub(super) async fn health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}

pub(super) async fn not_found(viewer: Viewer) -> Response {
    render_not_found_response(LayoutChrome::new("Not found", viewer.user()))
}
