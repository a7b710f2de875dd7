// src/routes.rs

use std::any::Any;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::{
    error,
    handlers::{admin, auth, blog, comments, pages, posts, profile},
    state::AppState,
    utils::{
        csrf::{CSRF_HEADER, csrf_middleware},
        jwt::{admin_middleware, auth_middleware, session_middleware},
    },
};

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal Server Error",
            "template": "pages/500.html",
        })),
    )
        .into_response()
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static(CSRF_HEADER),
        ])
        .allow_credentials(true)
}

/// Assembles the main application router.
///
/// * Blog pages (posts, comments, categories, profiles), auth, static pages, media.
/// * Admin JSON API under `/admin`, guarded by auth + admin middleware.
/// * Every request passes the session layer first, then the CSRF check.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    let blog_routes = Router::new()
        .route("/", get(blog::index))
        .route("/category/{slug}", get(blog::category_posts))
        .route("/posts", post(posts::create_post))
        .route("/posts/create", get(posts::create_form))
        .route(
            "/posts/{post_id}",
            get(blog::post_detail).delete(posts::delete_post),
        )
        .route(
            "/posts/{post_id}/edit",
            get(posts::edit_form)
                .post(posts::edit_post)
                .put(posts::edit_post),
        )
        .route(
            "/posts/{post_id}/delete",
            get(posts::delete_form).post(posts::delete_post),
        )
        .route("/posts/{post_id}/comments", post(comments::add_comment))
        .route(
            "/posts/{post_id}/comments/{comment_id}",
            get(comments::edit_form)
                .put(comments::edit_comment)
                .delete(comments::delete_comment),
        )
        .route(
            "/posts/{post_id}/comments/{comment_id}/edit",
            post(comments::edit_comment),
        )
        .route(
            "/posts/{post_id}/comments/{comment_id}/delete",
            post(comments::delete_comment),
        );

    let profile_routes = Router::new()
        .route("/", get(profile::own_profile))
        .route("/edit", get(profile::edit_form).post(profile::edit_profile))
        .route("/{username}", get(profile::view_profile));

    let auth_routes = Router::new()
        .route("/registration", post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout));

    let page_routes = Router::new()
        .route("/about", get(pages::about))
        .route("/rules", get(pages::rules));

    let admin_routes = Router::new()
        .route(
            "/categories",
            get(admin::list_categories).post(admin::create_category),
        )
        .route(
            "/categories/{id}",
            put(admin::update_category).delete(admin::delete_category),
        )
        .route(
            "/locations",
            get(admin::list_locations).post(admin::create_location),
        )
        .route(
            "/locations/{id}",
            put(admin::update_location).delete(admin::delete_location),
        )
        .route("/posts/{id}/publish", put(admin::set_post_published))
        .route("/comments/{id}/publish", put(admin::set_comment_published))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn(auth_middleware));

    Router::new()
        .merge(blog_routes)
        .nest("/profile", profile_routes)
        .nest("/auth", auth_routes)
        .nest("/pages", page_routes)
        .nest("/admin", admin_routes)
        .nest_service("/media", ServeDir::new(&state.config.media_root))
        .fallback(error::not_found)
        // Global Middleware (applied from outside in: session -> csrf -> handler)
        .layer(middleware::from_fn_with_state(state.clone(), csrf_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
        .layer(cors)
        .with_state(state)
}
