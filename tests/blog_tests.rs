// tests/blog_tests.rs

mod common;

use blogicum::store::BlogStore;
use chrono::{Duration, Utc};
use common::{post_form, spawn_app};

#[tokio::test]
async fn unknown_route_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["template"], "pages/404.html");
}

#[tokio::test]
async fn scheduled_post_is_visible_to_its_author_only() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let reader = app.create_user("reader").await;

    let tomorrow = Utc::now() + Duration::days(1);
    let post_id = app.seed_post(author.id, &post_form("Tomorrow", tomorrow)).await;
    let detail = app.url(&format!("/posts/{}", post_id));

    // Anonymous and other users get the same answer as for a missing post.
    let anon = app.client.get(&detail).send().await.unwrap();
    assert_eq!(anon.status().as_u16(), 404);
    let anon_body: serde_json::Value = anon.json().await.unwrap();
    assert_eq!(anon_body["template"], "pages/404.html");

    let other = app
        .client
        .get(&detail)
        .header("Authorization", reader.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(other.status().as_u16(), 404);

    let own = app
        .client
        .get(&detail)
        .header("Authorization", author.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(own.status().as_u16(), 200);
    let body: serde_json::Value = own.json().await.unwrap();
    assert_eq!(body["post"]["title"], "Tomorrow");

    // Absent from the public home page.
    let home: serde_json::Value = app
        .client
        .get(app.url("/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(home["page_obj"]["count"], 0);

    // Listed on the author's own profile, not when somebody else looks.
    let profile = app.url(&format!("/profile/{}", author.username));
    let own_profile: serde_json::Value = app
        .client
        .get(&profile)
        .header("Authorization", author.bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own_profile["page_obj"]["count"], 1);
    assert_eq!(own_profile["is_owner"], true);

    let foreign_profile: serde_json::Value = app
        .client
        .get(&profile)
        .header("Authorization", reader.bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(foreign_profile["page_obj"]["count"], 0);
}

#[tokio::test]
async fn unpublished_category_hides_its_posts() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let category_id = app.create_category("hidden", false).await;

    let yesterday = Utc::now() - Duration::days(1);
    for i in 0..3 {
        let mut form = post_form(&format!("Hidden {}", i), yesterday);
        form.category_id = Some(category_id);
        app.seed_post(author.id, &form).await;
    }

    let category = app.client.get(app.url("/category/hidden")).send().await.unwrap();
    assert_eq!(category.status().as_u16(), 404);

    let home: serde_json::Value = app
        .client
        .get(app.url("/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(home["page_obj"]["count"], 0);
    assert_eq!(home["page_obj"]["object_list"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn category_page_lists_only_its_posts() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let travel = app.create_category("travel", true).await;

    let yesterday = Utc::now() - Duration::days(1);
    let mut in_category = post_form("Trip", yesterday);
    in_category.category_id = Some(travel);
    app.seed_post(author.id, &in_category).await;
    app.seed_post(author.id, &post_form("Elsewhere", yesterday)).await;

    let response = app.client.get(app.url("/category/travel")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["category"]["slug"], "travel");
    assert_eq!(body["page_obj"]["count"], 1);
    assert_eq!(body["page_obj"]["object_list"][0]["title"], "Trip");
}

#[tokio::test]
async fn home_paginates_and_clamps_page_numbers() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;

    let base = Utc::now() - Duration::days(1);
    for i in 0..25 {
        // Post 24 is the newest.
        let form = post_form(&format!("Post {}", i), base + Duration::minutes(i));
        app.seed_post(author.id, &form).await;
    }

    let page = |raw: &'static str| {
        let client = app.client.clone();
        let url = app.url(&format!("/?page={}", raw));
        async move {
            client
                .get(url)
                .send()
                .await
                .unwrap()
                .json::<serde_json::Value>()
                .await
                .unwrap()
        }
    };

    let first = page("1").await;
    assert_eq!(first["page_obj"]["num_pages"], 3);
    assert_eq!(first["page_obj"]["object_list"].as_array().unwrap().len(), 10);
    assert_eq!(first["page_obj"]["object_list"][0]["title"], "Post 24");
    assert_eq!(first["page_obj"]["has_previous"], false);

    let third = page("3").await;
    assert_eq!(third["page_obj"]["object_list"].as_array().unwrap().len(), 5);
    assert_eq!(third["page_obj"]["object_list"][4]["title"], "Post 0");

    let beyond = page("4").await;
    assert_eq!(beyond["page_obj"]["number"], 3);
    assert_eq!(beyond["page_obj"]["object_list"].as_array().unwrap().len(), 5);

    let garbage = page("abc").await;
    assert_eq!(garbage["page_obj"]["number"], 1);

    let last = page("last").await;
    assert_eq!(last["page_obj"]["number"], 3);
}

#[tokio::test]
async fn listing_carries_comment_counts() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;
    let reader = app.create_user("reader").await;

    let yesterday = Utc::now() - Duration::days(1);
    let busy = app.seed_post(author.id, &post_form("Busy", yesterday)).await;
    app.seed_post(author.id, &post_form("Quiet", yesterday - Duration::hours(1)))
        .await;

    for text in ["one", "two", "three"] {
        app.store.create_comment(busy, reader.id, text).await.unwrap();
    }

    let home: serde_json::Value = app
        .client
        .get(app.url("/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let posts = home["page_obj"]["object_list"].as_array().unwrap();
    assert_eq!(posts[0]["title"], "Busy");
    assert_eq!(posts[0]["comment_count"], 3);
    assert_eq!(posts[1]["comment_count"], 0);
}

#[tokio::test]
async fn detail_lists_comments_oldest_first() {
    let app = spawn_app().await;
    let author = app.create_user("author").await;

    let post_id = app
        .seed_post(author.id, &post_form("Post", Utc::now() - Duration::days(1)))
        .await;
    app.store.create_comment(post_id, author.id, "first").await.unwrap();
    app.store.create_comment(post_id, author.id, "second").await.unwrap();

    let body: serde_json::Value = app
        .client
        .get(app.url(&format!("/posts/{}", post_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["comments"][0]["text"], "first");
    assert_eq!(body["comments"][1]["text"], "second");
    assert_eq!(body["comments"][0]["author_username"], author.username);
    // Anonymous visitors get no comment form.
    assert!(body["form"].is_null());
}

#[tokio::test]
async fn static_pages_render() {
    let app = spawn_app().await;

    for path in ["/pages/about", "/pages/rules"] {
        let response = app.client.get(app.url(path)).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }
}
