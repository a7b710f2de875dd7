//! Canonical paths of the blog pages.

pub fn post_detail(post_id: i64) -> String {
    format!("/posts/{}", post_id)
}

pub fn profile(username: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{}", encoded)
}
