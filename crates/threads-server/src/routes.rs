use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::{auth_middleware, require_onboarded};
use crate::directory::Directory;
use crate::handlers::{
    communities as community_handlers, events as event_handlers, threads as thread_handlers,
    users as user_handlers,
};
use crate::Config;

#[derive(Clone)]
pub struct AppState {
    pub directory: Directory,
    pub config: Config,
}

pub fn create_router(directory: Directory, config: Config) -> Router {
    let state = AppState { directory, config };

    // Authenticated, profile may still be missing
    let account_routes = Router::new()
        .route("/me", get(user_handlers::me).put(user_handlers::update_profile))
        .route("/me/events", get(event_handlers::invalidations));

    // Authenticated and onboarded
    let member_routes = Router::new()
        .route("/me/activity", get(thread_handlers::activity))
        .route("/users", get(user_handlers::search_users))
        .route("/users/:external_id", get(user_handlers::get_user))
        .route(
            "/users/:external_id/threads",
            get(user_handlers::get_user_threads),
        )
        .route("/threads", post(thread_handlers::create_thread))
        .route(
            "/threads/:thread_id/replies",
            post(thread_handlers::add_reply),
        )
        .route("/communities", get(community_handlers::list_communities))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_onboarded,
        ));

    // Auth layer wraps both groups and runs before the onboarding check
    let api_routes = Router::new()
        .merge(account_routes)
        .merge(member_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::Claims;
    use crate::store::MemoryStore;

    const SECRET: &str = "test-secret";

    fn test_config() -> Config {
        Config {
            database_url: "postgres://unused".to_string(),
            database_max_connections: 1,
            identity_jwt_secret: SECRET.to_string(),
            port: 0,
        }
    }

    fn app() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let directory = Directory::new(store.clone());
        (create_router(directory, test_config()), store)
    }

    fn bearer(external_id: &str) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: external_id.to_string(),
            exp: (now + Duration::minutes(5)).timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        format!("Bearer {token}")
    }

    fn request(
        method: Method,
        uri: &str,
        external_id: Option<&str>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = external_id {
            builder = builder.header(header::AUTHORIZATION, bearer(id));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn onboard(app: &Router, external_id: &str, username: &str) {
        let response = app
            .clone()
            .oneshot(request(
                Method::PUT,
                "/api/v1/me",
                Some(external_id),
                Some(json!({
                    "username": username,
                    "display_name": username,
                    "bio": "hello",
                    "image_url": "https://img.test/a.png",
                    "path": "/onboarding",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::GET, "/health", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_requires_token() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::GET, "/api/v1/me", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_is_null_before_onboarding() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::GET, "/api/v1/me", Some("u1"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, Value::Null);
    }

    #[tokio::test]
    async fn member_routes_redirect_to_onboarding() {
        let (app, _) = app();
        let response = app
            .oneshot(request(Method::GET, "/api/v1/communities", Some("u1"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["redirect"], "/onboarding");
    }

    #[tokio::test]
    async fn profile_update_validates_fields() {
        let (app, _) = app();
        let response = app
            .oneshot(request(
                Method::PUT,
                "/api/v1/me",
                Some("u1"),
                Some(json!({
                    "username": "alice",
                    "display_name": "",
                    "bio": "hello",
                    "image_url": "img.png",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn onboarding_then_search_excludes_caller() {
        let (app, _) = app();
        onboard(&app, "u1", "Alice").await;
        onboard(&app, "u2", "bob").await;

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/me", Some("u1"), None))
            .await
            .unwrap();
        let me = json_body(response).await;
        assert_eq!(me["username"], "alice");
        assert_eq!(me["onboarded"], true);

        let response = app
            .oneshot(request(Method::GET, "/api/v1/users?q=&page=1", Some("u1"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = json_body(response).await;
        let users = page["users"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["external_id"], "u2");
        assert_eq!(page["has_next"], false);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let (app, _) = app();
        onboard(&app, "u1", "alice").await;

        let response = app
            .oneshot(request(Method::GET, "/api/v1/users/ghost", Some("u1"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn replies_show_up_in_activity() {
        let (app, _) = app();
        onboard(&app, "u1", "alice").await;
        onboard(&app, "u2", "bob").await;

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/v1/threads",
                Some("u1"),
                Some(json!({ "body": "first post" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let thread = json_body(response).await;
        let thread_id = thread["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                &format!("/api/v1/threads/{thread_id}/replies"),
                Some("u2"),
                Some(json!({ "body": "nice" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/me/activity", Some("u1"), None))
            .await
            .unwrap();
        let activity = json_body(response).await;
        assert_eq!(activity.as_array().unwrap().len(), 1);
        assert_eq!(activity[0]["body"], "nice");

        let response = app
            .oneshot(request(
                Method::GET,
                "/api/v1/users/u1/threads",
                Some("u2"),
                None,
            ))
            .await
            .unwrap();
        let posts = json_body(response).await;
        assert_eq!(posts["threads"][0]["replies"][0]["author"]["external_id"], "u2");
    }

    #[tokio::test]
    async fn store_failures_surface_directory_message() {
        let (app, store) = app();
        store.set_unavailable(true);

        let response = app
            .oneshot(request(
                Method::PUT,
                "/api/v1/me",
                Some("u1"),
                Some(json!({
                    "username": "alice",
                    "display_name": "Alice",
                    "bio": "bio",
                    "image_url": "img.png",
                    "path": "/profile/edit",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("failed to create/update user"));
    }
}
