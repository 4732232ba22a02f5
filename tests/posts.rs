mod common;

use common::{MemoryStore, PIXEL_GIF, group, post, services, user};
use postboard::application::posts::{
    CommentOutcome, DeleteOutcome, EditOutcome, PostError, SubmitOutcome,
};
use postboard::application::repos::PostsRepo;
use postboard::domain::error::DomainError;
use postboard::domain::posts::{CommentForm, ImageUpload, PostForm};
use tempfile::tempdir;

fn form(text: &str, group: Option<i64>) -> PostForm {
    PostForm {
        text: text.to_string(),
        group: group.map(|id| id.to_string()),
        image: None,
    }
}

#[tokio::test]
async fn create_saves_post_with_group_and_image() {
    let store = MemoryStore::new();
    let dir = tempdir().unwrap();
    let app = services(store.clone(), dir.path());
    let author = user(&store, "leo").await;
    let cats = group(&store, "Cats", "cats").await;

    let mut submitted = form("A picture of a cat", Some(cats.id));
    submitted.image = Some(ImageUpload {
        filename: "pixel.gif".into(),
        bytes: PIXEL_GIF.to_vec(),
    });

    let SubmitOutcome::Saved(saved) = app.posts.create(&author, &submitted).await.unwrap() else {
        panic!("expected the post to be saved");
    };
    assert_eq!(saved.author_id, author.id);
    assert_eq!(saved.group.as_ref().map(|g| g.slug.as_str()), Some("cats"));
    let image = saved.image.expect("stored image path");
    assert!(image.starts_with("posts/"));
    assert_eq!(app.uploads.read(&image).await.unwrap().as_ref(), PIXEL_GIF);
}

#[tokio::test]
async fn invalid_forms_write_nothing() {
    let store = MemoryStore::new();
    let dir = tempdir().unwrap();
    let app = services(store.clone(), dir.path());
    let author = user(&store, "leo").await;

    let SubmitOutcome::Invalid(errors) = app.posts.create(&author, &form("   ", None)).await.unwrap()
    else {
        panic!("blank text must be rejected");
    };
    assert!(errors.has("text"));

    let SubmitOutcome::Invalid(errors) =
        app.posts.create(&author, &form("hello", Some(404))).await.unwrap()
    else {
        panic!("unknown group must be rejected");
    };
    assert!(errors.has("group"));

    let mut not_an_image = form("hello", None);
    not_an_image.image = Some(ImageUpload {
        filename: "notes.txt".into(),
        bytes: b"plain text".to_vec(),
    });
    let SubmitOutcome::Invalid(errors) = app.posts.create(&author, &not_an_image).await.unwrap()
    else {
        panic!("non-image upload must be rejected");
    };
    assert!(errors.has("image"));

    assert_eq!(store.post_count().await, 0);
}

#[tokio::test]
async fn only_the_author_can_edit() {
    let store = MemoryStore::new();
    let dir = tempdir().unwrap();
    let app = services(store.clone(), dir.path());
    let author = user(&store, "leo").await;
    let stranger = user(&store, "mia").await;
    let original = post(&store, &author, "original text", None).await;

    let outcome = app
        .posts
        .edit(&stranger, original.id, &form("defaced", None))
        .await
        .unwrap();
    assert!(matches!(outcome, EditOutcome::NotAuthor));
    let unchanged = store.find_by_id(original.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "original text");

    let EditOutcome::Updated(updated) = app
        .posts
        .edit(&author, original.id, &form("revised text", None))
        .await
        .unwrap()
    else {
        panic!("author edit should succeed");
    };
    assert_eq!(updated.text, "revised text");
    assert_eq!(updated.author_id, author.id);
}

#[tokio::test]
async fn deleting_a_post_removes_its_comments() {
    let store = MemoryStore::new();
    let dir = tempdir().unwrap();
    let app = services(store.clone(), dir.path());
    let author = user(&store, "leo").await;
    let reader = user(&store, "mia").await;
    let doomed = post(&store, &author, "short lived", None).await;
    let kept = post(&store, &author, "kept", None).await;
    for target in [&doomed, &kept] {
        app.posts
            .comment(
                &reader,
                target.id,
                &CommentForm {
                    text: "nice".into(),
                },
            )
            .await
            .unwrap();
    }

    assert_eq!(
        app.posts.delete(&reader, doomed.id).await.unwrap(),
        DeleteOutcome::NotAuthor
    );
    assert_eq!(store.post_count().await, 2);

    assert_eq!(
        app.posts.delete(&author, doomed.id).await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(store.post_count().await, 1);
    assert_eq!(store.comment_count().await, 1);
}

#[tokio::test]
async fn blank_comments_are_ignored() {
    let store = MemoryStore::new();
    let dir = tempdir().unwrap();
    let app = services(store.clone(), dir.path());
    let author = user(&store, "leo").await;
    let target = post(&store, &author, "discuss", None).await;

    let outcome = app
        .posts
        .comment(&author, target.id, &CommentForm { text: "  ".into() })
        .await
        .unwrap();
    assert!(matches!(outcome, CommentOutcome::Invalid(_)));
    assert_eq!(store.comment_count().await, 0);

    let err = app
        .posts
        .comment(&author, target.id + 1000, &CommentForm { text: "hi".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, PostError::Domain(DomainError::NotFound { .. })));
}
