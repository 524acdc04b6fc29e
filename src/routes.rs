use crate::{
    handlers, // Import handlers module
    AppState, // Use the AppState defined in main.rs
};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route(
            "/allArtifacts",
            get(handlers::list_artifacts).post(handlers::create_artifact),
        )
        .route("/allArtifacts/{id}", delete(handlers::delete_artifact))
        .route("/featuredArtifacts", get(handlers::featured_artifacts))
        .route("/dailyArtifact", get(handlers::daily_artifact))
        .route(
            "/artifact/{id}",
            get(handlers::get_artifact).patch(handlers::toggle_artifact_like),
        )
        .route("/liked-artifacts", get(handlers::liked_artifacts))
        .route("/myArtifacts", get(handlers::my_artifacts))
        .route("/updateArtifact/{id}", patch(handlers::update_artifact))
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state) // Pass the application state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        tests::{mint_token, TEST_SECRET},
        JwtVerifier,
    };
    use crate::memory::{InMemoryArtifactRepository, InMemoryDailyPickRepository};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use chrono::Duration;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let state = Arc::new(AppState {
            artifact_repo: Arc::new(InMemoryArtifactRepository::new()),
            pick_repo: Arc::new(InMemoryDailyPickRepository::new()),
            verifier: Arc::new(JwtVerifier::new(TEST_SECRET, None)),
            featured_limit: 2,
        });
        create_router(state)
    }

    fn bearer(email: &str) -> String {
        format!("Bearer {}", mint_token(TEST_SECRET, email, Duration::hours(1)))
    }

    async fn send(app: &Router, method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn create(app: &Router, name: &str, owner: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/allArtifacts",
            None,
            Some(json!({ "name": name, "ownerEmail": owner, "era": "Classical" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn liveness_text() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Welcome to Histo Track");
    }

    #[tokio::test]
    async fn create_then_list_sorted_and_fetch() {
        let app = app();
        let b = create(&app, "Bust of Nefertiti", "o@x.com").await;
        let a = create(&app, "Antikythera Mechanism", "o@x.com").await;

        let (status, body) = send(&app, Method::GET, "/allArtifacts?sort=name-asc", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<_> = body.as_array().unwrap().iter().map(|a| a["_id"].as_str().unwrap().to_string()).collect();
        assert_eq!(ids, [a.clone(), b.clone()]);

        // Unknown sort key keeps insertion order.
        let (_, body) = send(&app, Method::GET, "/allArtifacts?sort=oldest", None, None).await;
        assert_eq!(body[0]["_id"], b.as_str());

        let (status, body) = send(&app, Method::GET, &format!("/artifact/{}", a), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["era"], "Classical");
        assert_eq!(body["totalLiked"], 0);
    }

    #[tokio::test]
    async fn create_accepts_arbitrary_body() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/allArtifacts",
            None,
            Some(json!({ "era": "Iron", "material": "bronze" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["material"], "bronze");
        assert_eq!(body["totalLiked"], 0);
        assert!(body["_id"].is_string());
    }

    #[tokio::test]
    async fn malformed_json_bodies_are_400() {
        let app = app();
        let (status, body) = send(&app, Method::POST, "/allArtifacts", None, Some(json!([1, 2]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let id = create(&app, "Lamp", "o@x.com").await;
        let uri = format!("/artifact/{}", id);
        let (status, body) = send(&app, Method::PATCH, &uri, None, Some(json!({ "userEmail": 7 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/allArtifacts")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids() {
        let app = app();
        let (status, _) = send(&app, Method::GET, &format!("/artifact/{}", uuid::Uuid::new_v4()), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::GET, "/artifact/not-a-uuid", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn like_toggle_round_trip_and_featured_order() {
        let app = app();
        let quiet = create(&app, "Quiet", "o@x.com").await;
        let popular = create(&app, "Popular", "o@x.com").await;
        let _third = create(&app, "Third", "o@x.com").await;

        let uri = format!("/artifact/{}", popular);
        let (status, body) = send(&app, Method::PATCH, &uri, None, Some(json!({ "userEmail": "u@x.com" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalLiked"], 1);
        assert_eq!(body["likedBy"], json!(["u@x.com"]));

        let (_, body) = send(&app, Method::GET, "/featuredArtifacts", None, None).await;
        let featured = body.as_array().unwrap();
        assert_eq!(featured.len(), 2);
        assert_eq!(featured[0]["_id"], popular.as_str());

        let (_, body) = send(&app, Method::PATCH, &uri, None, Some(json!({ "userEmail": "u@x.com" }))).await;
        assert_eq!(body["totalLiked"], 0);
        assert_eq!(body["likedBy"], json!([]));

        let (status, _) = send(&app, Method::PATCH, &format!("/artifact/{}", quiet), None, Some(json!({ "userEmail": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn daily_artifact_is_stable_and_404_when_empty() {
        let app = app();
        let (status, _) = send(&app, Method::GET, "/dailyArtifact", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        for name in ["a", "b", "c", "d"] {
            create(&app, name, "o@x.com").await;
        }
        let (status, first) = send(&app, Method::GET, "/dailyArtifact", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, second) = send(&app, Method::GET, "/dailyArtifact", None, None).await;
        assert_eq!(first["_id"], second["_id"]);
    }

    #[tokio::test]
    async fn per_user_lists_require_matching_identity() {
        let app = app();
        let mine = create(&app, "Mine", "u@x.com").await;
        create(&app, "Theirs", "v@x.com").await;
        send(&app, Method::PATCH, &format!("/artifact/{}", mine), None, Some(json!({ "userEmail": "u@x.com" }))).await;

        let (status, _) = send(&app, Method::GET, "/myArtifacts?email=u@x.com", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, Method::GET, "/myArtifacts?email=u@x.com", Some("Bearer garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = bearer("u@x.com");
        let (status, _) = send(&app, Method::GET, "/myArtifacts?email=v@x.com", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, Method::GET, "/myArtifacts?email=u@x.com", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["_id"], mine.as_str());

        let (status, body) = send(&app, Method::GET, "/liked-artifacts?email=u@x.com", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_is_owner_gated() {
        let app = app();
        let id = create(&app, "Codex", "owner@x.com").await;
        let uri = format!("/updateArtifact/{}", id);

        let (status, _) = send(&app, Method::PATCH, &uri, Some(&bearer("other@x.com")), Some(json!({ "name": "Stolen" }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (_, body) = send(&app, Method::GET, &format!("/artifact/{}", id), None, None).await;
        assert_eq!(body["name"], "Codex");

        let (status, body) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(&bearer("owner@x.com")),
            Some(json!({ "name": "Codex Sinaiticus", "totalLiked": 50 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Codex Sinaiticus");
        assert_eq!(body["era"], "Classical");
        assert_eq!(body["totalLiked"], 0);

        let (status, body) = send(&app, Method::PATCH, &uri, Some(&bearer("owner@x.com")), Some(json!({ "name": 42 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        let (_, body) = send(&app, Method::GET, &format!("/artifact/{}", id), None, None).await;
        assert_eq!(body["name"], "Codex Sinaiticus");

        let missing = format!("/updateArtifact/{}", uuid::Uuid::new_v4());
        let (status, _) = send(&app, Method::PATCH, &missing, Some(&bearer("owner@x.com")), Some(json!({ "name": "x" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_reports_count_without_ownership_check() {
        let app = app();
        let id = create(&app, "Amphora", "owner@x.com").await;
        let uri = format!("/allArtifacts/{}", id);

        let (status, body) = send(&app, Method::DELETE, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deletedCount"], 1);

        let (_, body) = send(&app, Method::DELETE, &uri, None, None).await;
        assert_eq!(body["deletedCount"], 0);
    }
}
