use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};
use crate::domain::forms::FieldErrors;

const DISPLAY_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:long] [year]");
const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Page-independent bits of the layout: the title and who is signed in.
#[derive(Clone, Debug, Default)]
pub struct LayoutChrome {
    pub title: String,
    pub viewer: Option<String>,
}

impl LayoutChrome {
    pub fn new(title: impl Into<String>, viewer: Option<&UserRecord>) -> Self {
        Self {
            title: title.into(),
            viewer: viewer.map(|user| user.username.clone()),
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub title: String,
    pub viewer: Option<String>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            title: chrome.title,
            viewer: chrome.viewer,
            content,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GroupBadge {
    pub slug: String,
    pub title: String,
}

#[derive(Clone, Debug)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub headline: String,
    pub author: String,
    pub published: String,
    pub iso_date: String,
    pub group: Option<GroupBadge>,
    pub image_url: Option<String>,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            text: post.text.clone(),
            headline: post.headline(),
            author: post.author_username.clone(),
            published: format_date(post.created_at, DISPLAY_DATE),
            iso_date: format_date(post.created_at, ISO_DATE),
            group: post.group.as_ref().map(|group| GroupBadge {
                slug: group.slug.clone(),
                title: group.title.clone(),
            }),
            image_url: post.image.as_ref().map(|path| format!("/media/{path}")),
        }
    }
}

fn format_date(value: OffsetDateTime, format: &[BorrowedFormatItem<'_>]) -> String {
    value.format(format).unwrap_or_default()
}

#[derive(Clone, Debug)]
pub struct PageLink {
    pub number: u64,
    pub current: bool,
}

/// Page links for a paginated listing.
#[derive(Clone, Debug)]
pub struct PaginatorView {
    pub number: u64,
    pub num_pages: u64,
    pub previous: Option<u64>,
    pub next: Option<u64>,
    pub links: Vec<PageLink>,
}

impl PaginatorView {
    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }
}

pub struct FeedView {
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

impl FeedView {
    pub fn from_page(page: &Page<PostRecord>) -> Self {
        Self {
            posts: page.items.iter().map(PostCard::from).collect(),
            paginator: PaginatorView {
                number: page.number,
                num_pages: page.num_pages,
                previous: page.previous_page_number(),
                next: page.next_page_number(),
                links: page
                    .page_range()
                    .map(|number| PageLink {
                        number,
                        current: number == page.number,
                    })
                    .collect(),
            },
        }
    }
}

pub struct IndexContext {
    pub feed: FeedView,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexContext>,
}

pub struct GroupContext {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub feed: FeedView,
}

impl GroupContext {
    pub fn new(group: &GroupRecord, feed: FeedView) -> Self {
        Self {
            title: group.title.clone(),
            slug: group.slug.clone(),
            description: group.description.clone(),
            feed,
        }
    }
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupContext>,
}

pub struct ProfileContext {
    pub username: String,
    pub post_count: u64,
    pub following: bool,
    /// Whether the follow controls are shown: a signed-in viewer looking at someone else.
    pub can_follow: bool,
    pub feed: FeedView,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContext>,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<IndexContext>,
}

#[derive(Clone, Debug)]
pub struct CommentView {
    pub author: String,
    pub text: String,
    pub published: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author: comment.author_username.clone(),
            text: comment.text.clone(),
            published: format_date(comment.created_at, DISPLAY_DATE),
        }
    }
}

pub struct PostDetailContext {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub can_comment: bool,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

#[derive(Clone, Debug)]
pub struct GroupOption {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

pub struct PostFormContext {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub current_image: Option<String>,
    pub errors: FieldErrors,
}

impl PostFormContext {
    pub fn new(action: String, groups: &[GroupRecord], selected: Option<i64>) -> Self {
        Self {
            is_edit: false,
            action,
            text: String::new(),
            groups: groups
                .iter()
                .map(|group| GroupOption {
                    id: group.id,
                    title: group.title.clone(),
                    selected: Some(group.id) == selected,
                })
                .collect(),
            current_image: None,
            errors: FieldErrors::new(),
        }
    }
}

#[derive(Template)]
#[template(path = "create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

#[derive(Default)]
pub struct GroupFormContext {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "create_group.html")]
pub struct GroupFormTemplate {
    pub view: LayoutContext<GroupFormContext>,
}

pub struct LoginContext {
    pub username: String,
    pub next: Option<String>,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContext>,
}

#[derive(Default)]
pub struct SignupContext {
    pub username: String,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupContext>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
