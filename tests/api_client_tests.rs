//! Backend client tests against a mock PistonPost backend
//!
//! These tests pin down the HTTP contract: paths, methods, bearer
//! credentials, multipart field names and the error-message fallback.

use pistonpost::models::post_path;
use pistonpost::{
    Attachment, BackendClient, PistonError, PostComposer, PostEditor, PostType, SessionIdentity,
    SubmissionState, UploadProgress,
};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn post_json(id: &str, post_type: &str) -> Value {
    json!({
        "postId": id,
        "title": "Hello",
        "type": post_type,
        "content": "Body",
        "images": [{"id": "img1", "extension": "png"}],
        "authorData": {"id": "u1", "name": "Alice", "avatar": "a.png", "roles": ["admin"]},
        "tags": ["cats"],
        "timestamp": 1_700_000_000_000_i64,
        "unlisted": false
    })
}

fn session() -> SessionIdentity {
    SessionIdentity::new("abc").expect("non-empty token")
}

async fn setup() -> (MockServer, BackendClient) {
    let server = MockServer::start().await;
    let client = BackendClient::with_url(&server.uri()).expect("valid mock URL");
    (server, client)
}

/// Body of the single request the mock received
async fn only_request_body(server: &MockServer) -> String {
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    String::from_utf8_lossy(&requests[0].body).into_owned()
}

#[tokio::test]
async fn test_home_posts_decodes_feed() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([post_json("a", "TEXT"), post_json("b", "IMAGES")])),
        )
        .mount(&server)
        .await;

    let posts = client.home_posts(None).await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].post_id, "a");
    assert_eq!(posts[1].post_type, PostType::Images);
    assert_eq!(posts[1].author_data.roles, vec!["admin".to_string()]);
}

#[tokio::test]
async fn test_tag_posts_empty_list() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/tag/cats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let posts = client.tag_posts("cats", None).await.unwrap();
    assert!(posts.is_empty());
}

#[tokio::test]
async fn test_create_text_post_sends_multipart_and_returns_id() {
    let (server, client) = setup().await;
    Mock::given(method("PUT"))
        .and(path("/post"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"postId": "abc123"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut composer = PostComposer::new();
    composer.title = "The worst puns on the internet".to_string();
    composer.content = "A bo'oh'o'wa'er".to_string();
    composer.tags.add("Comedy").unwrap();
    composer.tags.add("Puns").unwrap();
    composer.unlisted = true;

    let created = client
        .create_post(composer.into_payload().unwrap(), &session(), None)
        .await
        .unwrap();
    assert_eq!(post_path(&created.post_id), "/post/abc123");

    let body = only_request_body(&server).await;
    assert!(body.contains("name=\"title\""));
    assert!(body.contains("The worst puns on the internet"));
    assert!(body.contains("name=\"type\""));
    assert!(body.contains("TEXT"));
    assert!(body.contains("name=\"content\""));
    assert!(body.contains("Comedy,Puns"));
    assert!(body.contains("name=\"unlisted\""));
    assert!(!body.contains("name=\"image\""));
}

#[tokio::test]
async fn test_create_image_post_repeats_image_field_and_tracks_progress() {
    let (server, client) = setup().await;
    Mock::given(method("PUT"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"postId": "img-post"})))
        .mount(&server)
        .await;

    let mut composer = PostComposer::new();
    composer.title = "Cats".to_string();
    composer.mode = PostType::Images;
    composer.content = "ignored in image mode".to_string();
    composer
        .select_images(vec![
            Attachment::new("a.png", Some("image/png".to_string()), vec![1u8; 100_000]),
            Attachment::new("b.png", Some("image/png".to_string()), vec![2u8; 50_000]),
        ])
        .unwrap();

    let payload = composer.into_payload().unwrap();
    let progress = UploadProgress::new(payload.attachment_bytes());
    let created = client
        .create_post(payload, &session(), Some(progress.clone()))
        .await
        .unwrap();
    assert_eq!(created.post_id, "img-post");
    assert_eq!(progress.sent(), 150_000);
    assert_eq!(progress.state(), SubmissionState::Idle);

    let body = only_request_body(&server).await;
    assert_eq!(body.matches("name=\"image\"").count(), 2);
    assert!(body.contains("filename=\"a.png\""));
    assert!(body.contains("filename=\"b.png\""));
    assert!(!body.contains("name=\"content\""));
    assert!(!body.contains("ignored in image mode"));
}

#[tokio::test]
async fn test_error_message_field_is_surfaced() {
    let (server, client) = setup().await;
    Mock::given(method("PUT"))
        .and(path("/post"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Title is too long"})),
        )
        .mount(&server)
        .await;

    let mut composer = PostComposer::new();
    composer.title = "Hi".to_string();
    composer.content = "there".to_string();
    let err = client
        .create_post(composer.into_payload().unwrap(), &session(), None)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Title is too long");
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_error_without_message_falls_back_to_raw_body() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/post/p1"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client.post("p1", None).await.unwrap_err();
    assert!(matches!(err, PistonError::Backend { status: 502, .. }));
    assert_eq!(err.user_message(), "upstream unavailable");
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client.home_posts(None).await.unwrap_err();
    assert!(matches!(err, PistonError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_edit_sends_fields_without_media() {
    let (server, client) = setup().await;
    Mock::given(method("PUT"))
        .and(path("/post/p1"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let post = serde_json::from_value(post_json("p1", "IMAGES")).unwrap();
    let mut editor = PostEditor::from_post(&post);
    editor.title = "Renamed".to_string();
    client
        .edit_post("p1", editor.to_payload().unwrap(), &session())
        .await
        .unwrap();

    let body = only_request_body(&server).await;
    assert!(body.contains("Renamed"));
    assert!(body.contains("name=\"tags\""));
    assert!(!body.contains("name=\"content\""));
    assert!(!body.contains("name=\"image\""));
}

#[tokio::test]
async fn test_delete_issues_one_request() {
    let (server, client) = setup().await;
    Mock::given(method("DELETE"))
        .and(path("/post/p1"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_post("p1", &session()).await.unwrap();
}

#[tokio::test]
async fn test_user_data_uses_bearer_token() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/userdata"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "Alice", "avatar": "url", "email": "a@b.c"})),
        )
        .mount(&server)
        .await;

    let profile = client.user_data(&session()).await.unwrap();
    assert_eq!(profile.name, "Alice");
    assert_eq!(profile.avatar, "url");
}

#[tokio::test]
async fn test_user_page_and_settings() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/user/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "name": "Alice",
            "avatar": "a.png",
            "roles": [],
            "bio": "Hello",
            "website": "",
            "location": "",
            "posts": [post_json("a", "TEXT")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/account/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Alice",
            "email": "alice@example.com",
            "settings": null
        })))
        .mount(&server)
        .await;

    let page = client.user_page("u1", None).await.unwrap();
    assert_eq!(page.bio, "Hello");
    assert_eq!(page.posts.len(), 1);

    let account = client.account_settings(&session()).await.unwrap();
    assert_eq!(account.email, "alice@example.com");
    assert!(account.settings.is_none());
}

#[tokio::test]
async fn test_health_report() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "database": {
                "healthy": true,
                "message": "ok",
                "duration": 1.5,
                "timestamp": "2024-01-01T00:00:00Z"
            }
        })))
        .mount(&server)
        .await;

    let report = client.health().await.unwrap();
    assert!(report["database"].healthy);
}
