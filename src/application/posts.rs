//! Post authoring: create, edit, delete and comment.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, PostRecord, UserRecord};
use crate::domain::error::DomainError;
use crate::domain::forms::FieldErrors;
use crate::domain::posts::{CommentForm, PostDraft, PostForm, ValidImage};
use crate::infra::uploads::{UploadStorage, UploadStorageError};

#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("image storage failed: {0}")]
    Storage(#[from] UploadStorageError),
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Saved(PostRecord),
    Invalid(FieldErrors),
}

#[derive(Debug)]
pub enum EditOutcome {
    Updated(PostRecord),
    /// The actor is not the author; nothing changed.
    NotAuthor,
    Invalid(FieldErrors),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotAuthor,
}

#[derive(Debug)]
pub enum CommentOutcome {
    Added(CommentRecord),
    Invalid(FieldErrors),
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    uploads: Arc<UploadStorage>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        uploads: Arc<UploadStorage>,
    ) -> Self {
        Self {
            posts,
            writer,
            groups,
            comments,
            uploads,
        }
    }

    /// Loads a post the actor may edit. `Ok(None)` means the actor is not its author.
    pub async fn editable(
        &self,
        actor: &UserRecord,
        post_id: i64,
    ) -> Result<Option<PostRecord>, PostError> {
        let post = self.load(post_id).await?;
        Ok((post.author_id == actor.id).then_some(post))
    }

    pub async fn create(
        &self,
        author: &UserRecord,
        form: &PostForm,
    ) -> Result<SubmitOutcome, PostError> {
        let draft = match self.validate(form).await? {
            Ok(draft) => draft,
            Err(errors) => return Ok(SubmitOutcome::Invalid(errors)),
        };

        let image = self.store_image(draft.image.as_ref()).await?;
        let created = self
            .writer
            .create_post(CreatePostParams {
                author_id: author.id,
                text: draft.text,
                group_id: draft.group_id,
                image: image.clone(),
            })
            .await;

        match created {
            Ok(post) => {
                info!(
                    target = "postboard::application::posts",
                    post_id = post.id,
                    author = %author.username,
                    "post created"
                );
                Ok(SubmitOutcome::Saved(post))
            }
            Err(err) => {
                self.discard_image(image.as_deref()).await;
                Err(err.into())
            }
        }
    }

    pub async fn edit(
        &self,
        actor: &UserRecord,
        post_id: i64,
        form: &PostForm,
    ) -> Result<EditOutcome, PostError> {
        let Some(post) = self.editable(actor, post_id).await? else {
            return Ok(EditOutcome::NotAuthor);
        };

        let draft = match self.validate(form).await? {
            Ok(draft) => draft,
            Err(errors) => return Ok(EditOutcome::Invalid(errors)),
        };

        let image = self.store_image(draft.image.as_ref()).await?;
        let updated = self
            .writer
            .update_post(UpdatePostParams {
                id: post.id,
                text: draft.text,
                group_id: draft.group_id,
                image: image.clone(),
            })
            .await;

        match updated {
            Ok(updated) => {
                if image.is_some() {
                    self.discard_image(post.image.as_deref()).await;
                }
                Ok(EditOutcome::Updated(updated))
            }
            Err(err) => {
                self.discard_image(image.as_deref()).await;
                Err(err.into())
            }
        }
    }

    /// Deletes a post (and through storage its comments) when the actor wrote it.
    pub async fn delete(
        &self,
        actor: &UserRecord,
        post_id: i64,
    ) -> Result<DeleteOutcome, PostError> {
        let Some(post) = self.editable(actor, post_id).await? else {
            return Ok(DeleteOutcome::NotAuthor);
        };

        self.writer.delete_post(post.id).await?;
        self.discard_image(post.image.as_deref()).await;
        info!(
            target = "postboard::application::posts",
            post_id = post.id,
            author = %actor.username,
            "post deleted"
        );
        Ok(DeleteOutcome::Deleted)
    }

    pub async fn comment(
        &self,
        actor: &UserRecord,
        post_id: i64,
        form: &CommentForm,
    ) -> Result<CommentOutcome, PostError> {
        let post = self.load(post_id).await?;
        let text = match form.validate() {
            Ok(text) => text,
            Err(errors) => return Ok(CommentOutcome::Invalid(errors)),
        };

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: actor.id,
                text,
            })
            .await?;
        Ok(CommentOutcome::Added(comment))
    }

    async fn load(&self, post_id: i64) -> Result<PostRecord, PostError> {
        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id).into())
    }

    async fn validate(&self, form: &PostForm) -> Result<Result<PostDraft, FieldErrors>, PostError> {
        let draft = match form.validate() {
            Ok(draft) => draft,
            Err(errors) => return Ok(Err(errors)),
        };

        if let Some(group_id) = draft.group_id
            && self.groups.find_by_id(group_id).await?.is_none()
        {
            let mut errors = FieldErrors::new();
            errors.push(
                "group",
                "Select a valid choice. That choice is not one of the available choices.",
            );
            return Ok(Err(errors));
        }

        Ok(Ok(draft))
    }

    async fn store_image(&self, image: Option<&ValidImage>) -> Result<Option<String>, PostError> {
        match image {
            Some(image) => Ok(Some(
                self.uploads
                    .store_post_image(&image.filename, image.format.extension(), &image.bytes)
                    .await?,
            )),
            None => Ok(None),
        }
    }

    async fn discard_image(&self, stored_path: Option<&str>) {
        let Some(stored_path) = stored_path else {
            return;
        };
        if let Err(err) = self.uploads.delete(stored_path).await {
            warn!(
                target = "postboard::application::posts",
                error = %err,
                stored_path,
                "failed to remove post image"
            );
        }
    }
}
