//! Signed-in writes: posts, comments and groups.

use axum::{
    Form,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    application::{
        error::HttpError,
        groups::GroupOutcome,
        posts::{CommentOutcome, EditOutcome, SubmitOutcome},
    },
    domain::{
        entities::{PostRecord, UserRecord},
        forms::FieldErrors,
        groups::GroupForm,
        posts::{CommentForm, ImageUpload, PostForm},
    },
    presentation::views::{
        GroupFormContext, GroupFormTemplate, LayoutChrome, LayoutContext, PostFormContext,
        PostFormTemplate, render_template_response,
    },
};

use super::{CurrentUser, HttpState, error_response, public::parse_post_id};

fn profile_path(user: &UserRecord) -> String {
    format!("/profile/{}/", user.username)
}

fn detail_path(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}

fn multipart_error(error: MultipartError) -> HttpError {
    HttpError::new(
        "infra::http::authoring::read_post_form",
        error.status(),
        "Invalid form submission",
        error.body_text(),
    )
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, HttpError> {
    let mut form = PostForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("text") => form.text = field.text().await.map_err(multipart_error)?,
            Some("group") => form.group = Some(field.text().await.map_err(multipart_error)?),
            Some("image") => {
                let filename = field.file_name().map(str::to_owned).unwrap_or_default();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty part when no file was chosen.
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

/// Re-renders the post form after a failed submission, keeping what was typed.
fn render_post_form(
    user: &UserRecord,
    mut content: PostFormContext,
    form: Option<&PostForm>,
    errors: FieldErrors,
) -> Response {
    if let Some(form) = form {
        content.text = form.text.clone();
        let selected = form.group.as_deref().and_then(|raw| raw.trim().parse::<i64>().ok());
        for option in &mut content.groups {
            option.selected = Some(option.id) == selected;
        }
    }
    content.errors = errors;

    let title = if content.is_edit { "Edit post" } else { "New post" };
    let view = LayoutContext::new(LayoutChrome::new(title, Some(user)), content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

async fn post_form_context(
    state: &HttpState,
    user: &UserRecord,
    existing: Option<&PostRecord>,
) -> Result<PostFormContext, Response> {
    let groups = match state.feed.groups().await {
        Ok(groups) => groups,
        Err(err) => return Err(error_response(err, Some(user))),
    };

    Ok(match existing {
        Some(post) => {
            let mut content = PostFormContext::new(
                format!("/posts/{}/edit/", post.id),
                &groups,
                post.group.as_ref().map(|group| group.id),
            );
            content.is_edit = true;
            content.text = post.text.clone();
            content.current_image = post.image.as_ref().map(|path| format!("/media/{path}"));
            content
        }
        None => PostFormContext::new("/create/".to_string(), &groups, None),
    })
}

pub(super) async fn create_form(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
) -> Response {
    match post_form_context(&state, &user, None).await {
        Ok(content) => render_post_form(&user, content, None, FieldErrors::new()),
        Err(response) => response,
    }
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Response {
    let form = match read_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };

    match state.posts.create(&user, &form).await {
        Ok(SubmitOutcome::Saved(_)) => Redirect::to(&profile_path(&user)).into_response(),
        Ok(SubmitOutcome::Invalid(errors)) => {
            match post_form_context(&state, &user, None).await {
                Ok(content) => render_post_form(&user, content, Some(&form), errors),
                Err(response) => response,
            }
        }
        Err(err) => error_response(err, Some(&user)),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
) -> Response {
    let post_id = match parse_post_id(&raw_id) {
        Ok(id) => id,
        Err(err) => return error_response(err, Some(&user)),
    };

    let post = match state.posts.editable(&user, post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => return Redirect::to(&detail_path(post_id)).into_response(),
        Err(err) => return error_response(err, Some(&user)),
    };

    match post_form_context(&state, &user, Some(&post)).await {
        Ok(content) => render_post_form(&user, content, None, FieldErrors::new()),
        Err(response) => response,
    }
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
    multipart: Multipart,
) -> Response {
    let post_id = match parse_post_id(&raw_id) {
        Ok(id) => id,
        Err(err) => return error_response(err, Some(&user)),
    };
    let form = match read_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };

    match state.posts.edit(&user, post_id, &form).await {
        Ok(EditOutcome::Updated(_)) | Ok(EditOutcome::NotAuthor) => {
            Redirect::to(&detail_path(post_id)).into_response()
        }
        Ok(EditOutcome::Invalid(errors)) => {
            let post = match state.posts.editable(&user, post_id).await {
                Ok(Some(post)) => post,
                Ok(None) => return Redirect::to(&detail_path(post_id)).into_response(),
                Err(err) => return error_response(err, Some(&user)),
            };
            match post_form_context(&state, &user, Some(&post)).await {
                Ok(content) => render_post_form(&user, content, Some(&form), errors),
                Err(response) => response,
            }
        }
        Err(err) => error_response(err, Some(&user)),
    }
}

pub(super) async fn delete(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
) -> Response {
    let post_id = match parse_post_id(&raw_id) {
        Ok(id) => id,
        Err(err) => return error_response(err, Some(&user)),
    };

    match state.posts.delete(&user, post_id).await {
        Ok(_) => Redirect::to(&profile_path(&user)).into_response(),
        Err(err) => error_response(err, Some(&user)),
    }
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let post_id = match parse_post_id(&raw_id) {
        Ok(id) => id,
        Err(err) => return error_response(err, Some(&user)),
    };

    match state.posts.comment(&user, post_id, &form).await {
        Ok(CommentOutcome::Added(_)) | Ok(CommentOutcome::Invalid(_)) => {
            Redirect::to(&detail_path(post_id)).into_response()
        }
        Err(err) => error_response(err, Some(&user)),
    }
}

fn render_group_form(user: &UserRecord, content: GroupFormContext) -> Response {
    let view = LayoutContext::new(LayoutChrome::new("New group", Some(user)), content);
    render_template_response(GroupFormTemplate { view }, StatusCode::OK)
}

pub(super) async fn group_form(CurrentUser(user): CurrentUser) -> Response {
    render_group_form(&user, GroupFormContext::default())
}

pub(super) async fn group_create(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<GroupForm>,
) -> Response {
    match state.groups.create(&form).await {
        Ok(GroupOutcome::Created(_)) => Redirect::to(&profile_path(&user)).into_response(),
        Ok(GroupOutcome::Invalid(errors)) => render_group_form(
            &user,
            GroupFormContext {
                title: form.title,
                slug: form.slug,
                description: form.description,
                errors,
            },
        ),
        Err(err) => error_response(err, Some(&user)),
    }
}
