// tests/post_tests.rs

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use blogicum::{
    notify::{Notice, Notifier, NotifyError},
    store::{BlogStore, PostQuery},
};
use chrono::{Duration, Utc};
use common::{location, post_form, spawn_app, spawn_app_with_notifier};

fn new_post_body(title: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "text": "Body <script>alert(1)</script>",
        "pub_date": (Utc::now() - Duration::minutes(1)).to_rfc3339(),
    })
}

#[tokio::test]
async fn create_post_redirects_to_profile() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;

    let response = app
        .client
        .post(app.url("/posts"))
        .header("Authorization", author.bearer())
        .json(&new_post_body("Hello"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), format!("/profile/{}", author.username));

    let posts = app
        .store
        .fetch_posts(
            &PostQuery::new().by_author(author.id),
            blogicum::policy::PageWindow {
                number: 1,
                offset: 0,
                limit: 10,
            },
        )
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].author_id, author.id);
    assert!(!posts[0].text.contains("<script>"));
}

#[tokio::test]
async fn create_post_requires_login() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/posts"))
        .json(&new_post_body("Hello"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/auth/login?next=%2Fposts");
}

#[tokio::test]
async fn invalid_post_form_is_400_with_field_errors() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;

    let response = app
        .client
        .post(app.url("/posts"))
        .header("Authorization", author.bearer())
        .json(&serde_json::json!({
            "title": "   ",
            "text": "Body",
            "pub_date": Utc::now().to_rfc3339(),
            "category_id": 9999,
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"]["title"].is_array());
    assert!(body["errors"]["category_id"].is_array());
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _notice: &Notice) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected("smtp down".to_string()))
    }
}

#[tokio::test]
async fn failing_notification_does_not_fail_creation() {
    let app = spawn_app_with_notifier(Arc::new(FailingNotifier)).await;
    let author = app.create_user("author").await;

    let response = app
        .client
        .post(app.url("/posts"))
        .header("Authorization", author.bearer())
        .json(&new_post_body("Still here"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(app.store.count_posts(&PostQuery::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn non_owner_cannot_edit_or_delete_post() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let intruder = app.create_user("intruder").await;

    let post_id = app
        .seed_post(author.id, &post_form("Original", Utc::now() - Duration::days(1)))
        .await;
    let detail = format!("/posts/{}", post_id);

    let edit = app
        .client
        .put(app.url(&format!("/posts/{}/edit", post_id)))
        .header("Authorization", intruder.bearer())
        .json(&new_post_body("Hijacked"))
        .send()
        .await
        .unwrap();
    assert_eq!(edit.status().as_u16(), 303);
    assert_eq!(location(&edit), detail);

    let delete = app
        .client
        .delete(app.url(&detail))
        .header("Authorization", intruder.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status().as_u16(), 303);
    assert_eq!(location(&delete), detail);

    let post = app.store.find_post(post_id).await.unwrap().unwrap();
    assert_eq!(post.title, "Original");
}

#[tokio::test]
async fn anonymous_edit_goes_to_login() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let post_id = app
        .seed_post(author.id, &post_form("Post", Utc::now() - Duration::days(1)))
        .await;

    let response = app
        .client
        .get(app.url(&format!("/posts/{}/edit", post_id)))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 303);
    assert!(location(&response).starts_with("/auth/login?next="));
}

#[tokio::test]
async fn owner_edits_post() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let post_id = app
        .seed_post(author.id, &post_form("Before", Utc::now() - Duration::days(1)))
        .await;

    let form: serde_json::Value = app
        .client
        .get(app.url(&format!("/posts/{}/edit", post_id)))
        .header("Authorization", author.bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(form["form"]["title"], "Before");

    let response = app
        .client
        .post(app.url(&format!("/posts/{}/edit", post_id)))
        .header("Authorization", author.bearer())
        .json(&new_post_body("After"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), format!("/posts/{}", post_id));
    let post = app.store.find_post(post_id).await.unwrap().unwrap();
    assert_eq!(post.title, "After");
}

#[tokio::test]
async fn deleting_post_removes_its_comments() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let reader = app.create_user("reader").await;

    let post_id = app
        .seed_post(author.id, &post_form("Doomed", Utc::now() - Duration::days(1)))
        .await;
    let comment = app
        .store
        .create_comment(post_id, reader.id, "nice")
        .await
        .unwrap();

    let response = app
        .client
        .post(app.url(&format!("/posts/{}/delete", post_id)))
        .header("Authorization", author.bearer())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), format!("/profile/{}", author.username));
    assert!(app.store.find_post(post_id).await.unwrap().is_none());
    assert!(
        app.store
            .find_comment(post_id, comment.id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn comment_on_visible_post() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let reader = app.create_user("reader").await;
    let post_id = app
        .seed_post(author.id, &post_form("Post", Utc::now() - Duration::days(1)))
        .await;

    let response = app
        .client
        .post(app.url(&format!("/posts/{}/comments", post_id)))
        .header("Authorization", reader.bearer())
        .json(&serde_json::json!({ "text": "Great read" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), format!("/posts/{}", post_id));

    let comments = app.store.list_comments(post_id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].author_id, reader.id);
}

#[tokio::test]
async fn comment_on_hidden_post_is_404() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let reader = app.create_user("reader").await;

    let mut draft = post_form("Draft", Utc::now() - Duration::days(1));
    draft.is_published = false;
    let post_id = app.seed_post(author.id, &draft).await;

    let response = app
        .client
        .post(app.url(&format!("/posts/{}/comments", post_id)))
        .header("Authorization", reader.bearer())
        .json(&serde_json::json!({ "text": "Sneaky" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
    assert!(app.store.list_comments(post_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn non_owner_cannot_delete_comment() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let intruder = app.create_user("intruder").await;

    let post_id = app
        .seed_post(author.id, &post_form("Post", Utc::now() - Duration::days(1)))
        .await;
    let comment = app
        .store
        .create_comment(post_id, author.id, "mine")
        .await
        .unwrap();

    let response = app
        .client
        .delete(app.url(&format!("/posts/{}/comments/{}", post_id, comment.id)))
        .header("Authorization", intruder.bearer())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), format!("/posts/{}", post_id));
    assert!(
        app.store
            .find_comment(post_id, comment.id)
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn comment_must_belong_to_post_in_path() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;

    let yesterday = Utc::now() - Duration::days(1);
    let first = app.seed_post(author.id, &post_form("First", yesterday)).await;
    let second = app.seed_post(author.id, &post_form("Second", yesterday)).await;
    let comment = app.store.create_comment(first, author.id, "on first").await.unwrap();

    let response = app
        .client
        .get(app.url(&format!("/posts/{}/comments/{}", second, comment.id)))
        .header("Authorization", author.bearer())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn owner_edits_comment() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let post_id = app
        .seed_post(author.id, &post_form("Post", Utc::now() - Duration::days(1)))
        .await;
    let comment = app.store.create_comment(post_id, author.id, "tpyo").await.unwrap();

    let response = app
        .client
        .post(app.url(&format!("/posts/{}/comments/{}/edit", post_id, comment.id)))
        .header("Authorization", author.bearer())
        .json(&serde_json::json!({ "text": "typo" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 303);
    let stored = app
        .store
        .find_comment(post_id, comment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.text, "typo");
}

#[tokio::test]
async fn non_owner_edit_is_redirected_before_the_body_is_read() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let intruder = app.create_user("intruder").await;
    let post_id = app
        .seed_post(author.id, &post_form("Original", Utc::now() - Duration::days(1)))
        .await;
    let edit_url = app.url(&format!("/posts/{}/edit", post_id));

    let empty_json = app
        .client
        .put(&edit_url)
        .header("Authorization", intruder.bearer())
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(empty_json.status().as_u16(), 303);
    assert_eq!(location(&empty_json), format!("/posts/{}", post_id));

    let no_body = app
        .client
        .post(&edit_url)
        .header("Authorization", intruder.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(no_body.status().as_u16(), 303);
    assert_eq!(location(&no_body), format!("/posts/{}", post_id));

    let post = app.store.find_post(post_id).await.unwrap().unwrap();
    assert_eq!(post.title, "Original");
}

#[tokio::test]
async fn anonymous_edit_without_body_goes_to_login() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let post_id = app
        .seed_post(author.id, &post_form("Post", Utc::now() - Duration::days(1)))
        .await;

    let response = app
        .client
        .post(app.url(&format!("/posts/{}/edit", post_id)))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 303);
    assert!(location(&response).starts_with("/auth/login?next="));
}

#[tokio::test]
async fn missing_fields_are_field_errors() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;

    let response = app
        .client
        .post(app.url("/posts"))
        .header("Authorization", author.bearer())
        .json(&serde_json::json!({ "text": "body" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"]["title"].is_array());
    assert!(body["errors"]["pub_date"].is_array());

    // An unreadable body is a form error too, once the author is known.
    let garbage = app
        .client
        .post(app.url("/posts"))
        .header("Authorization", author.bearer())
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status().as_u16(), 400);
    let body: serde_json::Value = garbage.json().await.unwrap();
    assert!(body["errors"]["__all__"].is_array());
    assert_eq!(app.store.count_posts(&PostQuery::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn non_owner_cannot_edit_comment() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let intruder = app.create_user("intruder").await;
    let post_id = app
        .seed_post(author.id, &post_form("Post", Utc::now() - Duration::days(1)))
        .await;
    let comment = app.store.create_comment(post_id, author.id, "mine").await.unwrap();
    let comment_url = app.url(&format!("/posts/{}/comments/{}", post_id, comment.id));

    let response = app
        .client
        .put(&comment_url)
        .header("Authorization", intruder.bearer())
        .json(&serde_json::json!({ "text": "defaced" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), format!("/posts/{}", post_id));

    // Same answer without a body.
    let empty = app
        .client
        .put(&comment_url)
        .header("Authorization", intruder.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status().as_u16(), 303);

    let stored = app
        .store
        .find_comment(post_id, comment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.text, "mine");
}

fn image_form(title: &str, file_name: &str, bytes: &[u8]) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
    reqwest::multipart::Form::new()
        .text("title", title.to_string())
        .text("text", "Look at this")
        .text("pub_date", (Utc::now() - Duration::minutes(1)).to_rfc3339())
        .part("image", part)
}

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-data";

#[tokio::test]
async fn multipart_post_stores_and_serves_the_image() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;

    let response = app
        .client
        .post(app.url("/posts"))
        .header("Authorization", author.bearer())
        .multipart(image_form("With picture", "cat.png", PNG_BYTES))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), format!("/profile/{}", author.username));

    let posts = app
        .store
        .fetch_posts(
            &PostQuery::new().by_author(author.id),
            blogicum::policy::PageWindow {
                number: 1,
                offset: 0,
                limit: 10,
            },
        )
        .await
        .unwrap();
    let image = posts[0].image.clone().expect("image path stored");
    assert!(image.starts_with("post_images/"));
    assert!(image.ends_with(".png"));

    let served = app
        .client
        .get(app.url(&format!("/media/{}", image)))
        .send()
        .await
        .unwrap();
    assert_eq!(served.status().as_u16(), 200);
    assert_eq!(served.bytes().await.unwrap().as_ref(), PNG_BYTES);

    // A multipart edit without a file keeps the picture.
    let edit = reqwest::multipart::Form::new()
        .text("title", "Renamed")
        .text("text", "Look at this")
        .text("pub_date", (Utc::now() - Duration::minutes(1)).to_rfc3339());
    let response = app
        .client
        .post(app.url(&format!("/posts/{}/edit", posts[0].id)))
        .header("Authorization", author.bearer())
        .multipart(edit)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);

    let post = app.store.find_post(posts[0].id).await.unwrap().unwrap();
    assert_eq!(post.title, "Renamed");
    assert_eq!(post.image.as_deref(), Some(image.as_str()));
}

#[tokio::test]
async fn upload_must_be_an_image() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;

    let response = app
        .client
        .post(app.url("/posts"))
        .header("Authorization", author.bearer())
        .multipart(image_form("Sneaky", "page.html", b"<script>alert(1)</script>"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"]["image"].is_array());
    assert_eq!(app.store.count_posts(&PostQuery::new()).await.unwrap(), 0);
    assert!(
        !std::path::Path::new(&app.config.media_root)
            .join("post_images")
            .exists()
    );
}
