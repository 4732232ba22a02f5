mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

use common::{
    MemoryStore, PIXEL_GIF, SESSION_COOKIE, Services, group, http_state, post, services,
    session_token, user,
};
use postboard::application::repos::PostsRepo;
use postboard::cache::PageCacheConfig;
use postboard::infra::http::build_router;

struct TestApp {
    _media: TempDir,
    services: Services,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        Self::with_cache(PageCacheConfig::default())
    }

    fn with_cache(cache: PageCacheConfig) -> Self {
        let media = tempdir().unwrap();
        let services = services(MemoryStore::new(), media.path());
        let router = build_router(http_state(&services, cache));
        Self {
            _media: media,
            services,
            router,
        }
    }

    fn store(&self) -> &MemoryStore {
        &self.services.store
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        let mut request = Request::get(uri);
        if let Some(token) = token {
            request = request.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, token: Option<&str>, body: &str) -> Response {
        let mut request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(token) = token {
            request = request.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
        }
        self.send(request.body(Body::from(body.to_string())).unwrap())
            .await
    }
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

const BOUNDARY: &str = "postboard-test-boundary";

fn multipart_body(text: &str, group: &str, image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in [("text", text), ("group", group)] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: image/gif\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::COOKIE, format!("{SESSION_COOKIE}={token}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn index_lists_posts_with_pagination() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    for n in 0..11 {
        post(app.store(), &leo, &format!("entry number {n}"), None).await;
    }

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert_eq!(html.matches("class=\"post-card\"").count(), 10);
    assert!(html.contains("href=\"?page=2\""));

    let html = body_text(app.get("/?page=2", None).await).await;
    assert_eq!(html.matches("class=\"post-card\"").count(), 1);
    assert!(html.contains("entry number 0"));
}

#[tokio::test]
async fn missing_resources_render_the_not_found_page() {
    let app = TestApp::new();

    for uri in ["/group/nope/", "/profile/ghost/", "/posts/999/", "/posts/abc/", "/nowhere"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        assert!(body_text(response).await.contains("Page Not Found"));
    }
}

#[tokio::test]
async fn group_page_shows_only_group_posts() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    let cats = group(app.store(), "Cats", "cats").await;
    let dogs = group(app.store(), "Dogs", "dogs").await;
    post(app.store(), &leo, "meow meow", Some(&cats)).await;
    post(app.store(), &leo, "woof woof", Some(&dogs)).await;

    let html = body_text(app.get("/group/cats/", None).await).await;
    assert!(html.contains("meow meow"));
    assert!(!html.contains("woof woof"));
}

#[tokio::test]
async fn anonymous_writes_redirect_to_login() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    let target = post(app.store(), &leo, "discuss", None).await;

    let response = app.get("/create/", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/?next=%2Fcreate%2F");

    let uri = format!("/posts/{}/comment/", target.id);
    let response = app.post_form(&uri, None, "text=sneaky").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/auth/login/?next="));
    assert_eq!(app.store().comment_count().await, 0);

    let response = app.get("/follow/", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn signed_in_comment_adds_exactly_one() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    let mia = user(app.store(), "mia").await;
    let token = session_token(app.store(), &mia).await;
    let target = post(app.store(), &leo, "discuss", None).await;

    let uri = format!("/posts/{}/comment/", target.id);
    let response = app.post_form(&uri, Some(&token), "text=great+post").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", target.id));
    assert_eq!(app.store().comment_count().await, 1);

    let html = body_text(app.get(&format!("/posts/{}/", target.id), None).await).await;
    assert!(html.contains("great post"));
}

#[tokio::test]
async fn non_author_edit_redirects_without_changes() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    let mia = user(app.store(), "mia").await;
    let token = session_token(app.store(), &mia).await;
    let target = post(app.store(), &leo, "leo wrote this", None).await;
    let uri = format!("/posts/{}/edit/", target.id);

    let response = app.get(&uri, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", target.id));

    let response = app
        .send(multipart_request(
            &uri,
            &token,
            multipart_body("mia was here", "", None),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let stored = app.store().find_by_id(target.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "leo wrote this");
}

#[tokio::test]
async fn create_post_with_image_redirects_to_profile() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    let cats = group(app.store(), "Cats", "cats").await;
    let token = session_token(app.store(), &leo).await;

    let form = app.get("/create/", Some(&token)).await;
    assert_eq!(form.status(), StatusCode::OK);
    assert!(body_text(form).await.contains("Cats"));

    let body = multipart_body(
        "a cat picture",
        &cats.id.to_string(),
        Some(("pixel.gif", PIXEL_GIF)),
    );
    let response = app.send(multipart_request("/create/", &token, body)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/leo/");

    let html = body_text(app.get("/group/cats/", None).await).await;
    assert!(html.contains("a cat picture"));
    let start = html.find("/media/posts/").expect("image link");
    let end = start + html[start..].find('"').unwrap();
    let media = app.get(&html[start..end], None).await;
    assert_eq!(media.status(), StatusCode::OK);
    assert_eq!(media.headers()[header::CONTENT_TYPE], "image/gif");
}

#[tokio::test]
async fn uploaded_images_are_served_by_sniffed_format() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    let token = session_token(app.store(), &leo).await;

    let mut payload = PIXEL_GIF.to_vec();
    payload.extend_from_slice(b"<script>document.title = 'owned'</script>");
    let body = multipart_body("polyglot", "", Some(("evil.html", &payload)));
    let response = app.send(multipart_request("/create/", &token, body)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = body_text(app.get("/profile/leo/", None).await).await;
    let start = html.find("/media/posts/").expect("image link");
    let end = start + html[start..].find('"').unwrap();
    let media_path = &html[start..end];
    assert!(media_path.ends_with("-evil.gif"), "stored as {media_path}");

    let media = app.get(media_path, None).await;
    assert_eq!(media.status(), StatusCode::OK);
    assert_eq!(media.headers()[header::CONTENT_TYPE], "image/gif");
    assert_eq!(media.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
}

#[tokio::test]
async fn invalid_post_form_is_rerendered_with_errors() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    let token = session_token(app.store(), &leo).await;

    let response = app
        .send(multipart_request("/create/", &token, multipart_body("", "", None)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("field-error"));
    assert_eq!(app.store().post_count().await, 0);
}

#[tokio::test]
async fn follow_and_unfollow_through_profiles() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    let mia = user(app.store(), "mia").await;
    let token = session_token(app.store(), &mia).await;
    post(app.store(), &leo, "hello followers", None).await;

    let response = app.post_form("/profile/leo/follow/", Some(&token), "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/leo/");
    app.get("/profile/leo/follow/", Some(&token)).await;
    assert_eq!(app.store().follow_count().await, 1);

    let html = body_text(app.get("/follow/", Some(&token)).await).await;
    assert!(html.contains("hello followers"));

    let response = app.post_form("/profile/leo/unfollow/", Some(&token), "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.store().follow_count().await, 0);

    let response = app.post_form("/profile/leo/unfollow/", Some(&token), "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

}

#[tokio::test]
async fn self_follow_redirects_without_an_edge() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    let token = session_token(app.store(), &leo).await;

    let response = app.get("/profile/leo/follow/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.store().follow_count().await, 0);
}

#[tokio::test]
async fn author_delete_removes_post() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    let token = session_token(app.store(), &leo).await;
    let target = post(app.store(), &leo, "short lived", None).await;

    let uri = format!("/posts/{}/delete/", target.id);
    let response = app.post_form(&uri, Some(&token), "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/leo/");
    assert_eq!(app.store().post_count().await, 0);
}

#[tokio::test]
async fn index_is_served_from_cache_until_ttl() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    post(app.store(), &leo, "first post", None).await;

    let before = body_text(app.get("/", None).await).await;
    assert!(before.contains("first post"));

    post(app.store(), &leo, "fresh post", None).await;
    let cached = body_text(app.get("/", None).await).await;
    assert_eq!(cached, before);
    assert!(!cached.contains("fresh post"));

    // A different cookie varies the cache key.
    let token = session_token(app.store(), &leo).await;
    let signed_in = body_text(app.get("/", Some(&token)).await).await;
    assert!(signed_in.contains("fresh post"));
}

#[tokio::test]
async fn disabled_cache_shows_new_posts_immediately() {
    let app = TestApp::with_cache(PageCacheConfig {
        enabled: false,
        ..Default::default()
    });
    let leo = user(app.store(), "leo").await;
    post(app.store(), &leo, "first post", None).await;
    body_text(app.get("/", None).await).await;

    post(app.store(), &leo, "fresh post", None).await;
    assert!(body_text(app.get("/", None).await).await.contains("fresh post"));
}

#[tokio::test]
async fn index_larger_than_cache_limit_still_renders() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    let long_text = "x".repeat(1_200_000);
    post(app.store(), &leo, &long_text, None).await;

    for _ in 0..2 {
        let response = app.get("/", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(&long_text));
    }
}

#[tokio::test]
async fn group_creation_validates_and_redirects() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    let token = session_token(app.store(), &leo).await;

    let response = app
        .post_form(
            "/group/create/",
            Some(&token),
            "title=Cats&slug=cats&description=All+cats",
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/leo/");

    let response = app
        .post_form(
            "/group/create/",
            Some(&token),
            "title=More+cats&slug=cats&description=Again",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("already exists"));
}

#[tokio::test]
async fn logout_clears_the_session() {
    let app = TestApp::new();
    let leo = user(app.store(), "leo").await;
    let token = session_token(app.store(), &leo).await;

    let response = app.post_form("/auth/logout/", Some(&token), "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.starts_with(&format!("{SESSION_COOKIE}=")));
    assert_eq!(app.store().session_count().await, 0);

    let response = app.get("/create/", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn login_page_keeps_safe_next_only() {
    let app = TestApp::new();

    let html = body_text(app.get("/auth/login/?next=%2Fcreate%2F", None).await).await;
    assert!(html.contains("name=\"next\" value=\"/create/\""));

    let html = body_text(app.get("/auth/login/?next=https%3A%2F%2Fevil.example", None).await).await;
    assert!(!html.contains("name=\"next\""));
}

#[tokio::test]
async fn health_reports_no_content() {
    let app = TestApp::new();
    let response = app.get("/_health/db", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
