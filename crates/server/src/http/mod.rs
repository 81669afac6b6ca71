use axum::{
    Router,
    http::Method,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{AppState, routes};

mod auth;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let authed_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .merge(routes::tasks::router(&state))
        .layer(from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/auth/signup", post(routes::auth::signup))
        .route("/auth/login", post(routes::auth::login))
        .merge(authed_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use config::ServerConfig;
    use db::DBService;
    use insights::InsightsService;
    use serde_json::{Value, json};
    use test_support::{env::EnvGuard, tempfile::TempDir};
    use tower::ServiceExt;
    use utils_jwt::TokenService;

    use crate::AppState;

    const GOOD_PASSWORD: &str = "Sup3r-secret";

    /// Router over a throwaway sqlite file. The guard serializes tests and
    /// restores the environment on drop; no AI key is configured, so insight
    /// requests exercise the fallback path without touching the network.
    async fn setup_app() -> (EnvGuard, TempDir, Router) {
        let root = test_support::temp_dir();
        let database_url = test_support::sqlite_url(root.path(), "db.sqlite");
        let guard = EnvGuard::set(&[
            ("TICKLIST_ASSET_DIR", Some(root.path().to_str().unwrap())),
            ("DATABASE_URL", Some(database_url.as_str())),
            ("TICKLIST_TOKEN_SECRET", Some("test-signing-secret")),
            ("TICKLIST_AI_API_KEY", None),
            ("ANTHROPIC_API_KEY", None),
            ("TICKLIST_AI_BASE_URL", None),
            ("TICKLIST_AI_MODEL", None),
        ]);

        let config = ServerConfig::load().expect("test config should load");
        let db = DBService::connect(&config.database_url)
            .await
            .expect("test database should connect");
        let tokens = TokenService::new(config.token_secret.as_bytes());
        let insights = InsightsService::new(
            config.insights.api_key,
            config.insights.base_url,
            config.insights.model,
        );

        let state = AppState::new(db, tokens, insights);
        (guard, root, super::router(state))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
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
        // Not every response carries JSON (204s, extractor rejections).
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn signup(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({"email": email, "password": GOOD_PASSWORD})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body.pointer("/data/token")
            .and_then(Value::as_str)
            .expect("signup response carries a token")
            .to_string()
    }

    async fn create_task(app: &Router, token: &str, payload: Value) -> Value {
        let (status, body) = send(app, Method::POST, "/tasks", Some(token), Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED);
        body.get("data").cloned().expect("created task in envelope")
    }

    #[tokio::test]
    async fn health_is_public() {
        let (_guard, _root, app) = setup_app().await;

        let (status, body) = send(&app, Method::GET, "/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get("success").and_then(Value::as_bool), Some(true));
        assert_eq!(body.get("data").and_then(Value::as_str), Some("OK"));
    }

    #[tokio::test]
    async fn signup_returns_token_and_sanitized_user() {
        let (_guard, _root, app) = setup_app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({"email": "  New.User@Example.COM ", "password": GOOD_PASSWORD})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.get("success").and_then(Value::as_bool), Some(true));
        assert!(
            body.pointer("/data/token")
                .and_then(Value::as_str)
                .is_some_and(|token| !token.is_empty())
        );
        assert_eq!(
            body.pointer("/data/user/email").and_then(Value::as_str),
            Some("new.user@example.com")
        );
        assert!(body.pointer("/data/user/id").is_some());
        assert!(body.pointer("/data/user/createdAt").is_some());
        assert!(body.pointer("/data/user/password").is_none());
        assert!(body.pointer("/data/user/passwordHash").is_none());
    }

    #[tokio::test]
    async fn signup_validates_email_and_password() {
        let (_guard, _root, app) = setup_app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({"email": "not-an-email", "password": GOOD_PASSWORD})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body.get("message").and_then(Value::as_str),
            Some("Invalid email address")
        );

        // Missing uppercase, digit and symbol.
        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({"email": "weak@example.com", "password": "abcdefgh"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body.get("message")
                .and_then(Value::as_str)
                .is_some_and(|message| message.starts_with("Password must be"))
        );

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({"password": GOOD_PASSWORD})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body.get("message").and_then(Value::as_str),
            Some("Email is required")
        );
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_email_case_insensitively() {
        let (_guard, _root, app) = setup_app().await;
        signup(&app, "taken@example.com").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({"email": "TAKEN@example.com", "password": GOOD_PASSWORD})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body.get("message").and_then(Value::as_str),
            Some("Email already registered")
        );
    }

    #[tokio::test]
    async fn login_round_trips_signup_credentials() {
        let (_guard, _root, app) = setup_app().await;
        signup(&app, "login@example.com").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "Login@Example.com", "password": GOOD_PASSWORD})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(
            body.pointer("/data/token")
                .and_then(Value::as_str)
                .is_some_and(|token| !token.is_empty())
        );
        assert_eq!(
            body.pointer("/data/user/email").and_then(Value::as_str),
            Some("login@example.com")
        );
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (_guard, _root, app) = setup_app().await;
        signup(&app, "present@example.com").await;

        let mut bodies = Vec::new();
        for payload in [
            json!({"email": "present@example.com", "password": "Wrong-pass1"}),
            json!({"email": "absent@example.com", "password": GOOD_PASSWORD}),
        ] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(Method::POST)
                        .uri("/auth/login")
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from(payload.to_string()))
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            bodies.push(to_bytes(response.into_body(), usize::MAX).await.unwrap());
        }

        // Wrong password and unknown email must be byte-identical.
        assert_eq!(bodies[0], bodies[1]);
        let json: Value = serde_json::from_slice(&bodies[0]).unwrap();
        assert_eq!(
            json.get("message").and_then(Value::as_str),
            Some("Invalid credentials")
        );
    }

    #[tokio::test]
    async fn protected_routes_require_a_valid_token() {
        let (_guard, _root, app) = setup_app().await;

        let (status, body) = send(&app, Method::GET, "/tasks", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.get("success").and_then(Value::as_bool), Some(false));
        assert_eq!(
            body.get("message").and_then(Value::as_str),
            Some("Unauthorized. Please sign in again.")
        );

        let (status, _) = send(&app, Method::GET, "/auth/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            Method::POST,
            "/tasks/insights",
            None,
            Some(json!({"tasks": []})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_returns_the_token_subject() {
        let (_guard, _root, app) = setup_app().await;
        let token = signup(&app, "me@example.com").await;

        let (status, body) = send(&app, Method::GET, "/auth/me", Some(&token), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body.pointer("/data/email").and_then(Value::as_str),
            Some("me@example.com")
        );
    }

    #[tokio::test]
    async fn create_task_promotes_extras_and_applies_defaults() {
        let (_guard, _root, app) = setup_app().await;
        let token = signup(&app, "alice@example.com").await;

        let task = create_task(
            &app,
            &token,
            json!({
                "title": "  Ship the release  ",
                "description": "cut and tag",
                "extras": {
                    "priority": "high",
                    "dueDate": "2026-09-01",
                    "tags": ["work", "release"],
                    "status": "custom-status",
                    "color": "red"
                }
            }),
        )
        .await;

        assert_eq!(task.get("title").and_then(Value::as_str), Some("Ship the release"));
        assert_eq!(task.get("status").and_then(Value::as_str), Some("pending"));
        assert_eq!(task.get("priority").and_then(Value::as_str), Some("high"));
        assert_eq!(task.get("dueDate").and_then(Value::as_str), Some("2026-09-01"));
        assert_eq!(task.get("tags"), Some(&json!(["work", "release"])));
        // Reserved keys are gone; "status" is not reserved and stays custom.
        assert_eq!(
            task.get("extras"),
            Some(&json!({"status": "custom-status", "color": "red"}))
        );
    }

    #[tokio::test]
    async fn top_level_fields_beat_extras_duplicates() {
        let (_guard, _root, app) = setup_app().await;
        let token = signup(&app, "bob@example.com").await;

        let task = create_task(
            &app,
            &token,
            json!({
                "title": "Prioritized",
                "priority": "low",
                "extras": {"priority": "high", "tags": ["from-extras"]}
            }),
        )
        .await;

        assert_eq!(task.get("priority").and_then(Value::as_str), Some("low"));
        assert_eq!(task.get("tags"), Some(&json!(["from-extras"])));
        assert_eq!(task.get("extras"), Some(&json!({})));
    }

    #[tokio::test]
    async fn invalid_create_payloads_are_rejected() {
        let (_guard, _root, app) = setup_app().await;
        let token = signup(&app, "strict@example.com").await;

        let cases = [
            (json!({"title": "   "}), "title is required"),
            (json!({"title": "x".repeat(256)}), "title cannot exceed"),
            (json!({"title": "ok", "status": "bogus"}), "status must be one of"),
            (json!({"title": "ok", "priority": "urgent"}), "priority must be one of"),
            (json!({"title": "ok", "dueDate": "not-a-date"}), "dueDate must be"),
            (json!({"title": "ok", "tags": ["fine", 5]}), "tags must be"),
            (json!({"title": "ok", "extras": []}), "extras must be"),
        ];

        for (payload, expected) in cases {
            let (status, body) =
                send(&app, Method::POST, "/tasks", Some(&token), Some(payload.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {payload}");
            assert!(
                body.get("message")
                    .and_then(Value::as_str)
                    .is_some_and(|message| message.contains(expected)),
                "payload: {payload}, body: {body}"
            );
        }
    }

    #[tokio::test]
    async fn task_list_is_newest_first() {
        let (_guard, _root, app) = setup_app().await;
        let token = signup(&app, "lister@example.com").await;

        for title in ["first", "second", "third"] {
            create_task(&app, &token, json!({"title": title})).await;
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let (status, body) = send(&app, Method::GET, "/tasks", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let titles: Vec<&str> = body
            .get("data")
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .filter_map(|task| task.get("title").and_then(Value::as_str))
            .collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn update_patches_fields_and_merges_extras() {
        let (_guard, _root, app) = setup_app().await;
        let token = signup(&app, "editor@example.com").await;

        let task = create_task(
            &app,
            &token,
            json!({
                "title": "Draft report",
                "dueDate": "2026-10-01",
                "extras": {"color": "red"}
            }),
        )
        .await;
        let id = task.get("id").and_then(Value::as_str).unwrap();
        let uri = format!("/tasks/{id}");

        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({"status": "in-progress", "extras": {"mood": "good"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let updated = body.get("data").unwrap();
        assert_eq!(updated.get("title").and_then(Value::as_str), Some("Draft report"));
        assert_eq!(updated.get("status").and_then(Value::as_str), Some("in-progress"));
        assert_eq!(updated.get("dueDate").and_then(Value::as_str), Some("2026-10-01"));
        assert_eq!(
            updated.get("extras"),
            Some(&json!({"color": "red", "mood": "good"}))
        );

        // Explicit null clears the due date; everything else stays put.
        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({"dueDate": null})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let updated = body.get("data").unwrap();
        assert!(updated.get("dueDate").unwrap().is_null());
        assert_eq!(updated.get("status").and_then(Value::as_str), Some("in-progress"));
    }

    #[tokio::test]
    async fn update_without_recognized_fields_is_rejected() {
        let (_guard, _root, app) = setup_app().await;
        let token = signup(&app, "noop@example.com").await;

        let task = create_task(&app, &token, json!({"title": "stable"})).await;
        let uri = format!("/tasks/{}", task.get("id").and_then(Value::as_str).unwrap());

        for payload in [json!({}), json!({"favorite": true})] {
            let (status, body) = send(&app, Method::PUT, &uri, Some(&token), Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(
                body.get("message")
                    .and_then(Value::as_str)
                    .is_some_and(|message| message.contains("at least one recognized field"))
            );
        }
    }

    #[tokio::test]
    async fn tasks_are_scoped_to_their_owner() {
        let (_guard, _root, app) = setup_app().await;
        let owner = signup(&app, "owner@example.com").await;
        let other = signup(&app, "other@example.com").await;

        let task = create_task(&app, &owner, json!({"title": "private"})).await;
        let uri = format!("/tasks/{}", task.get("id").and_then(Value::as_str).unwrap());

        let (status, body) = send(&app, Method::GET, "/tasks", Some(&other), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get("data"), Some(&json!([])));

        let (status, body) = send(&app, Method::GET, &uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body.get("message").and_then(Value::as_str),
            Some("Task not found")
        );

        let (status, _) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&other),
            Some(json!({"title": "hijacked"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // The owner is unaffected by the failed attempts.
        let (status, body) = send(&app, Method::GET, &uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body.pointer("/data/title").and_then(Value::as_str),
            Some("private")
        );
    }

    #[tokio::test]
    async fn delete_answers_204_and_removes_the_task() {
        let (_guard, _root, app) = setup_app().await;
        let token = signup(&app, "deleter@example.com").await;

        let task = create_task(&app, &token, json!({"title": "doomed"})).await;
        let uri = format!("/tasks/{}", task.get("id").and_then(Value::as_str).unwrap());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(&uri)
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());

        let (status, _) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, Method::GET, "/tasks", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get("data"), Some(&json!([])));
    }

    #[tokio::test]
    async fn malformed_task_ids_are_bad_requests() {
        let (_guard, _root, app) = setup_app().await;
        let token = signup(&app, "uuid@example.com").await;

        let (status, _) = send(&app, Method::GET, "/tasks/not-a-uuid", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn insights_fall_back_without_an_api_key() {
        let (_guard, _root, app) = setup_app().await;
        let token = signup(&app, "coach@example.com").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/tasks/insights",
            Some(&token),
            Some(json!({
                "tasks": [
                    {"status": "pending", "priority": "high", "dueDate": "2020-01-01"},
                    {"status": "done", "priority": "low"}
                ]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get("success").and_then(Value::as_bool), Some(true));
        assert_eq!(
            body.pointer("/data/insight").and_then(Value::as_str),
            Some(insights::FALLBACK_INSIGHT)
        );
    }
}
