//! In-memory repositories and service wiring shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;

use postboard::application::accounts::AccountService;
use postboard::application::feed::FeedService;
use postboard::application::follows::FollowService;
use postboard::application::groups::GroupService;
use postboard::application::pagination::Paginator;
use postboard::application::posts::PostService;
use postboard::application::repos::{
    CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, CreateSessionParams,
    CreateUserParams, FollowOutcome, FollowsRepo, GroupsRepo, HealthRepo, PageWindow, PostScope,
    PostsRepo, PostsWriteRepo, RepoError, SessionsRepo, UpdatePostParams, UsersRepo,
};
use postboard::cache::{PageCacheConfig, PageCacheState};
use postboard::domain::entities::{
    CommentRecord, FollowRecord, GroupRecord, GroupRef, PostRecord, SessionRecord, UserRecord,
};
use postboard::infra::http::HttpState;
use postboard::infra::uploads::UploadStorage;

pub const SESSION_COOKIE: &str = "postboard_session";

#[derive(Default)]
struct State {
    next_id: i64,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    follows: Vec<FollowRecord>,
    sessions: Vec<SessionRecord>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn group_ref(&self, id: Option<i64>) -> Option<GroupRef> {
        let id = id?;
        self.groups
            .iter()
            .find(|group| group.id == id)
            .map(|group| GroupRef {
                id: group.id,
                slug: group.slug.clone(),
                title: group.title.clone(),
            })
    }

    fn in_scope(&self, post: &PostRecord, scope: PostScope) -> bool {
        match scope {
            PostScope::All => true,
            PostScope::Group(id) => post.group.as_ref().is_some_and(|group| group.id == id),
            PostScope::Author(id) => post.author_id == id,
            PostScope::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|edge| edge.user_id == user_id && edge.author_id == post.author_id),
        }
    }
}

/// Every repository trait over one mutex-guarded state, mirroring the Postgres schema rules.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn follow_count(&self) -> usize {
        self.state.lock().await.follows.len()
    }

    pub async fn comment_count(&self) -> usize {
        self.state.lock().await.comments.len()
    }

    pub async fn post_count(&self) -> usize {
        self.state.lock().await.posts.len()
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".into(),
            });
        }
        let user = UserRecord {
            id: state.next_id(),
            username: params.username,
            password_hash: params.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl GroupsRepo for MemoryStore {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".into(),
            });
        }
        let group = GroupRecord {
            id: state.next_id(),
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.groups.iter().find(|group| group.slug == slug).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.state.lock().await.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn list_posts(
        &self,
        scope: PostScope,
        window: PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut posts: Vec<PostRecord> = state
            .posts
            .iter()
            .filter(|post| state.in_scope(post, scope))
            .cloned()
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(posts
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .collect())
    }

    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .posts
            .iter()
            .filter(|post| state.in_scope(post, scope))
            .count() as u64)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.posts.iter().find(|post| post.id == id).cloned())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let author = state
            .users
            .iter()
            .find(|user| user.id == params.author_id)
            .cloned()
            .ok_or(RepoError::Integrity {
                message: "posts_author_id_fkey".into(),
            })?;
        let post = PostRecord {
            id: state.next_id(),
            text: params.text,
            created_at: OffsetDateTime::now_utc(),
            author_id: author.id,
            author_username: author.username,
            group: state.group_ref(params.group_id),
            image: params.image,
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let group = state.group_ref(params.group_id);
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group = group;
        if params.image.is_some() {
            post.image = params.image;
        }
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let before = state.posts.len();
        state.posts.retain(|post| post.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        state.comments.retain(|comment| comment.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        let author_username = state
            .users
            .iter()
            .find(|user| user.id == params.author_id)
            .map(|user| user.username.clone())
            .ok_or(RepoError::Integrity {
                message: "comments_author_id_fkey".into(),
            })?;
        if !state.posts.iter().any(|post| post.id == params.post_id) {
            return Err(RepoError::Integrity {
                message: "comments_post_id_fkey".into(),
            });
        }
        let comment = CommentRecord {
            id: state.next_id(),
            post_id: params.post_id,
            author_id: params.author_id,
            author_username,
            text: params.text,
            created_at: OffsetDateTime::now_utc(),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FollowsRepo for MemoryStore {
    async fn follow(&self, user_id: i64, author_id: i64) -> Result<FollowOutcome, RepoError> {
        let mut state = self.state.lock().await;
        if state
            .follows
            .iter()
            .any(|edge| edge.user_id == user_id && edge.author_id == author_id)
        {
            return Ok(FollowOutcome::Existing);
        }
        let id = state.next_id();
        state.follows.push(FollowRecord {
            id,
            user_id,
            author_id,
        });
        Ok(FollowOutcome::Created)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.lock().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|edge| !(edge.user_id == user_id && edge.author_id == author_id));
        Ok(state.follows.len() != before)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .follows
            .iter()
            .any(|edge| edge.user_id == user_id && edge.author_id == author_id))
    }
}

#[async_trait]
impl SessionsRepo for MemoryStore {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let mut state = self.state.lock().await;
        let session = SessionRecord {
            id: params.id,
            user_id: params.user_id,
            token_hash: params.token_hash,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.sessions.iter().find(|session| session.id == id).cloned())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), RepoError> {
        self.state
            .lock()
            .await
            .sessions
            .retain(|session| session.id != id);
        Ok(())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|session| session.expires_at > now);
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Application services wired over one in-memory store.
pub struct Services {
    pub store: Arc<MemoryStore>,
    pub uploads: Arc<UploadStorage>,
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub groups: Arc<GroupService>,
    pub accounts: Arc<AccountService>,
}

pub fn services(store: Arc<MemoryStore>, media_root: &Path) -> Services {
    let uploads = Arc::new(UploadStorage::new(media_root.to_path_buf()).expect("media root"));
    let feed = FeedService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Paginator::default(),
    );
    let posts = PostService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        uploads.clone(),
    );
    Services {
        feed: Arc::new(feed),
        posts: Arc::new(posts),
        follows: Arc::new(FollowService::new(store.clone(), store.clone())),
        groups: Arc::new(GroupService::new(store.clone())),
        accounts: Arc::new(AccountService::new(
            store.clone(),
            store.clone(),
            Duration::days(1),
        )),
        uploads,
        store,
    }
}

pub fn http_state(services: &Services, cache: PageCacheConfig) -> HttpState {
    HttpState {
        feed: services.feed.clone(),
        posts: services.posts.clone(),
        follows: services.follows.clone(),
        groups: services.groups.clone(),
        accounts: services.accounts.clone(),
        health: services.store.clone(),
        uploads: services.uploads.clone(),
        cache: PageCacheState::new(cache),
        session_cookie: SESSION_COOKIE.to_string(),
        upload_limit: 5 * 1024 * 1024,
    }
}

/// Creates a user without hashing a real password.
pub async fn user(store: &MemoryStore, username: &str) -> UserRecord {
    UsersRepo::create_user(
        store,
        CreateUserParams {
            username: username.to_string(),
            password_hash: "unusable".to_string(),
        },
    )
    .await
    .expect("create user")
}

pub async fn group(store: &MemoryStore, title: &str, slug: &str) -> GroupRecord {
    GroupsRepo::create_group(
        store,
        CreateGroupParams {
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("All about {title}"),
        },
    )
    .await
    .expect("create group")
}

pub async fn post(
    store: &MemoryStore,
    author: &UserRecord,
    text: &str,
    group: Option<&GroupRecord>,
) -> PostRecord {
    store
        .create_post(CreatePostParams {
            author_id: author.id,
            text: text.to_string(),
            group_id: group.map(|group| group.id),
            image: None,
        })
        .await
        .expect("create post")
}

/// Stores a session for `user` and returns the cookie value that identifies it.
pub async fn session_token(store: &MemoryStore, user: &UserRecord) -> String {
    let id = Uuid::new_v4();
    let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    store
        .create_session(CreateSessionParams {
            id,
            user_id: user.id,
            token_hash: Sha256::digest(secret.as_bytes()).to_vec(),
            expires_at: OffsetDateTime::now_utc() + Duration::days(1),
        })
        .await
        .expect("create session");
    format!("{}_{secret}", id.simple())
}

/// Smallest valid GIF: one transparent pixel.
pub const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];
