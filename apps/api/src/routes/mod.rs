pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::catalog::handlers as catalog;
use crate::enrollment::handlers as enrollment;
use crate::gateway::handlers as ai;
use crate::state::AppState;
use crate::users::handlers as users;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/auth/register", post(auth::handle_register))
        .route("/api/v1/auth/verify", post(auth::handle_verify))
        .route("/api/v1/auth/login", post(auth::handle_login))
        // Catalog
        .route(
            "/api/v1/courses",
            get(catalog::handle_list_courses).post(catalog::handle_add_course),
        )
        .route("/api/v1/courses/:id", get(catalog::handle_get_course))
        .route("/api/v1/tags", get(catalog::handle_list_tags))
        .route("/api/v1/resources", get(catalog::handle_list_resources))
        .route("/api/v1/problems", get(catalog::handle_list_problems))
        .route("/api/v1/leaderboard", get(catalog::handle_leaderboard))
        // Account
        .route(
            "/api/v1/users/me",
            get(users::handle_me).patch(users::handle_update_me),
        )
        .route(
            "/api/v1/users/me/transactions",
            get(users::handle_my_transactions),
        )
        .route(
            "/api/v1/users/me/accounts/:platform/sync",
            post(users::handle_sync_account),
        )
        .route("/api/v1/enrollments", post(enrollment::handle_enroll))
        // AI
        .route("/api/v1/ai/roadmap", post(ai::handle_roadmap))
        .route("/api/v1/ai/career-path", post(ai::handle_career_path))
        .route("/api/v1/ai/resume", post(ai::handle_resume))
        .route("/api/v1/ai/trends", post(ai::handle_trends))
        .route("/api/v1/ai/hint", post(ai::handle_hint))
        .route("/api/v1/ai/jobs", post(ai::handle_jobs))
        .route("/api/v1/ai/chat", post(ai::handle_chat))
        .route("/api/v1/ai/speech", post(ai::handle_speech))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::registration::{RegistrationFlow, TracingOtpSender};
    use crate::auth::token::TokenCodec;
    use crate::config::Config;
    use crate::enrollment::EnrollmentRecorder;
    use crate::gateway::conversation::ConversationRegistry;
    use crate::gateway::fake::ScriptedBackend;
    use crate::gateway::AiGateway;
    use crate::llm_client::DEFAULT_API_URL;
    use crate::store::{InMemoryStore, Store};
    use crate::users::{AccountSyncer, SimulatedStatsSource};

    fn test_config() -> Config {
        Config {
            port: 0,
            rust_log: "info".to_string(),
            database_url: None,
            gemini_api_key: None,
            gemini_api_url: DEFAULT_API_URL.to_string(),
            model_timeout: Duration::from_secs(5),
            token_secret: Some("router-test-secret".to_string()),
            chat_capacity: 10,
            chat_idle_ttl: Duration::from_secs(3600),
        }
    }

    fn app(backend: ScriptedBackend) -> Router {
        let config = test_config();
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::seeded().unwrap());
        let tokens = Arc::new(TokenCodec::new(b"router-test-secret"));
        let gateway = AiGateway::new(
            Arc::new(backend),
            ConversationRegistry::new(config.chat_capacity, config.chat_idle_ttl),
            config.model_timeout,
        );
        build_router(AppState {
            registration: Arc::new(RegistrationFlow::new(
                store.clone(),
                tokens.clone(),
                Arc::new(TracingOtpSender),
            )),
            enrollment: Arc::new(EnrollmentRecorder::new(store.clone())),
            accounts: Arc::new(AccountSyncer::new(
                store.clone(),
                Arc::new(SimulatedStatsSource),
            )),
            gateway: Arc::new(gateway),
            config,
            store,
            tokens,
        })
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
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn login(app: &Router, email: &str, password: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(ScriptedBackend::new());
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
        assert_eq!(body["aiConfigured"], false);
    }

    #[tokio::test]
    async fn test_course_listing_filters() {
        let app = app(ScriptedBackend::new());
        let (status, body) = send(&app, Method::GET, "/api/v1/courses?price=free", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let courses = body["courses"].as_array().unwrap();
        assert!(!courses.is_empty());
        assert!(courses.iter().all(|c| c["type"] == "free"));

        let (status, body) = send(&app, Method::GET, "/api/v1/courses/c404", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "NotFound");
    }

    #[tokio::test]
    async fn test_login_returns_user_without_credential() {
        let app = app(ScriptedBackend::new());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "alex@eduflux.ai", "password": "alex" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["id"], "student01");
        assert!(body["user"].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_bad_login_kind() {
        let app = app(ScriptedBackend::new());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "alex@eduflux.ai", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "InvalidCredentials");
    }

    #[tokio::test]
    async fn test_register_and_wrong_code() {
        let app = app(ScriptedBackend::new());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "name": "Ana", "email": "ana@x.io", "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        // Codes are six digits from 100000, so this one never matches.
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/verify",
            None,
            Some(json!({ "email": "ana@x.io", "code": "000000" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "InvalidCode");
    }

    #[tokio::test]
    async fn test_protected_routes_need_token() {
        let app = app(ScriptedBackend::new());
        let (status, body) = send(&app, Method::GET, "/api/v1/users/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "Unauthorized");

        let (status, body) =
            send(&app, Method::GET, "/api/v1/users/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "DecodeError");
    }

    #[tokio::test]
    async fn test_me_and_profile_patch() {
        let app = app(ScriptedBackend::new());
        let token = login(&app, "alex@eduflux.ai", "alex").await;

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/api/v1/users/me",
            Some(&token),
            Some(json!({ "name": "Alex J.", "role": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["name"], "Alex J.");
        assert_eq!(body["user"]["role"], "student");

        let (_, body) = send(&app, Method::GET, "/api/v1/users/me", Some(&token), None).await;
        assert_eq!(body["user"]["name"], "Alex J.");
    }

    #[tokio::test]
    async fn test_enrollment_then_transactions() {
        let app = app(ScriptedBackend::new());
        let token = login(&app, "alex@eduflux.ai", "alex").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/enrollments",
            Some(&token),
            Some(json!({ "courseId": "c2", "amount": 59.99, "paymentId": "pay_9" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["user"]["enrolledCourses"]
            .as_array()
            .unwrap()
            .contains(&json!("c2")));

        let (_, body) = send(
            &app,
            Method::GET,
            "/api/v1/users/me/transactions",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(body["transactions"][0]["transactionId"], "pay_9");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/enrollments",
            Some(&token),
            Some(json!({ "courseId": "c404", "amount": 1.0, "paymentId": "pay_x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "UnknownCourse");
    }

    #[tokio::test]
    async fn test_add_course_is_admin_only() {
        let app = app(ScriptedBackend::new());
        let course = json!({
            "title": "Rust Systems Programming",
            "description": "Ownership to async.",
            "instructor": "Ferris",
            "price": 29.0,
            "tags": ["Rust"],
            "type": "paid"
        });

        let student = login(&app, "alex@eduflux.ai", "alex").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/courses",
            Some(&student),
            Some(course.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "Forbidden");

        let admin = login(&app, "admin@eduflux.ai", "admin").await;
        let (status, body) =
            send(&app, Method::POST, "/api/v1/courses", Some(&admin), Some(course)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["course"]["id"].as_str().unwrap().to_string();

        let (_, body) = send(&app, Method::GET, "/api/v1/courses", None, None).await;
        assert_eq!(body["courses"][0]["id"], id.as_str());
    }

    #[tokio::test]
    async fn test_ai_hint_and_unavailable() {
        let app = app(ScriptedBackend::new().text("Use two pointers.").failure());
        let token = login(&app, "alex@eduflux.ai", "alex").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/ai/hint",
            Some(&token),
            Some(json!({ "problemTitle": "Two Sum" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hint"], "Use two pointers.");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/ai/hint",
            Some(&token),
            Some(json!({ "problemTitle": "Two Sum" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "GatewayUnavailable");
        assert!(!body.to_string().contains("sk-secret"));
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected_before_model_call() {
        let app = app(ScriptedBackend::new());
        let token = login(&app, "alex@eduflux.ai", "alex").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/ai/roadmap",
            Some(&token),
            Some(json!({ "topic": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "Validation");
    }

    #[tokio::test]
    async fn test_speech_unavailable_is_null_audio() {
        let app = app(ScriptedBackend::new().failure());
        let token = login(&app, "alex@eduflux.ai", "alex").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/ai/speech",
            Some(&token),
            Some(json!({ "text": "Hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["audio"].is_null());
    }

    #[tokio::test]
    async fn test_malformed_body_gets_error_envelope() {
        let app = app(ScriptedBackend::new());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email": "alex@eduflux.ai""#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "Validation");
        assert!(!body["message"].as_str().unwrap().contains("line 1"));

        // Well-formed JSON with a missing field.
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "alex@eduflux.ai" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "Validation");
    }

    #[tokio::test]
    async fn test_bad_query_gets_error_envelope() {
        let app = app(ScriptedBackend::new());
        let (status, body) =
            send(&app, Method::GET, "/api/v1/courses?price=cheap", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "Validation");
    }

    #[tokio::test]
    async fn test_huge_solved_counts_are_rejected_and_leaderboard_survives() {
        let app = app(ScriptedBackend::new());
        let token = login(&app, "alex@eduflux.ai", "alex").await;
        let account = |platform: &str, solved: u32| {
            json!({
                "platform": platform,
                "username": "alex_j",
                "profileUrl": "#",
                "stats": { "solvedCount": solved, "ranking": 1 },
                "lastSynced": "2024-07-28T10:00:00Z"
            })
        };

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/api/v1/users/me",
            Some(&token),
            Some(json!({
                "externalAccounts": [account("LeetCode", u32::MAX), account("HackerRank", 1)]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "Validation");

        let (status, body) = send(&app, Method::GET, "/api/v1/leaderboard", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["leaderboard"][0]["totalSolved"], 235);
    }

    #[tokio::test]
    async fn test_sync_linked_account() {
        let app = app(ScriptedBackend::new());
        let token = login(&app, "alex@eduflux.ai", "alex").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/users/me/accounts/LeetCode/sync",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["account"]["platform"], "LeetCode");
        assert!(body["account"]["stats"]["solvedCount"].as_u64().unwrap() >= 150);
        assert_ne!(body["account"]["lastSynced"], "2024-07-28T10:00:00Z");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/users/me/accounts/CodeChef/sync",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "UnknownAccount");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/users/me/accounts/Codewars/sync",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "Validation");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/users/me/accounts/LeetCode/sync",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
