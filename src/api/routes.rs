//! API routes configuration module

use crate::api::cors::cors_layer;
use crate::api::handlers::{
    generate, get_task, health, index, not_found, stats, tasks_all, themes, words_batch,
};
use crate::config::ServiceConfig;
use crate::core::TaskEngine;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Creates and configures the API router with all routes
///
/// # Arguments
/// * `engine` - Task engine shared across handlers
/// * `config` - Service configuration, used for the CORS policy
///
/// # Returns
/// * `Router` - Configured router with all API endpoints and middleware
pub fn app(engine: Arc<TaskEngine>, config: &ServiceConfig) -> Router {
    let api = Router::new()
        .route("/newspaper/generate", post(generate))
        .route("/newspaper/task/:task_id", get(get_task))
        .route("/newspaper/themes", get(themes))
        .route("/newspaper/words/batch", post(words_batch))
        .route("/tasks/all", get(tasks_all))
        .route("/stats", get(stats))
        .route("/health", get(health));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .nest("/api/v1", api)
        .fallback(not_found)
        .layer(Extension(engine))
        .layer(cors_layer(&config.allowed_origins, config.is_production()))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PollPolicy, PromptBuilder, Task};
    use crate::store::InMemoryTaskStore;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn engine(mock: bool) -> Arc<TaskEngine> {
        Arc::new(TaskEngine::new(
            Arc::new(InMemoryTaskStore::new()),
            None,
            PromptBuilder::default(),
            PollPolicy {
                interval: Duration::from_millis(1),
                max_attempts: 3,
            },
            mock,
        ))
    }

    fn router(engine: Arc<TaskEngine>) -> Router {
        app(engine, &ServiceConfig::default())
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn generate_then_poll_until_completed() {
        let engine = engine(true);
        let (status, body) = send(
            router(engine.clone()),
            post_json(
                "/api/v1/newspaper/generate",
                json!({"theme": "超市", "title": "快乐购物"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "processing");
        assert_eq!(body["estimated_time"], 5);
        let task_id = body["task_id"].as_str().unwrap().to_string();

        let mut last = Value::Null;
        for _ in 0..200 {
            let (status, body) = send(
                router(engine.clone()),
                get(&format!("/api/v1/newspaper/task/{}", task_id)),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            last = body;
            if last["status"] == "completed" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(last["status"], "completed");
        assert!(last["result"]["image_url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/svg+xml"));
        assert!(last["result"]["word_list"]["core"].is_array());
        assert!(last["result"]["prompt_used"].as_str().unwrap().contains("快乐购物"));
        assert!(last.get("completed_at").is_some());
        assert!(last.get("estimated_time").is_none());
    }

    #[tokio::test]
    async fn generate_validates_input() {
        let (status, body) = send(
            router(engine(true)),
            post_json("/api/v1/newspaper/generate", json!({"theme": "超市"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);

        let (status, _) = send(
            router(engine(true)),
            post_json(
                "/api/v1/newspaper/generate",
                json!({"theme": "火星", "title": "t"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generate_accepts_custom_words_for_new_theme() {
        let (status, body) = send(
            router(engine(true)),
            post_json(
                "/api/v1/newspaper/generate",
                json!({"theme": "动物园", "title": "t", "custom_words": {"core": ["dòng wù 动物"]}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "processing");
    }

    #[tokio::test]
    async fn generate_without_provider_is_unavailable() {
        let (status, body) = send(
            router(engine(false)),
            post_json(
                "/api/v1/newspaper/generate",
                json!({"theme": "超市", "title": "t"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], 503);
    }

    #[tokio::test]
    async fn unknown_task_is_404() {
        let (status, body) =
            send(router(engine(true)), get("/api/v1/newspaper/task/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);
    }

    #[tokio::test]
    async fn pending_task_reports_estimated_time() {
        let engine = engine(true);
        let task = Task::new(
            "pending".to_string(),
            "超市".to_string(),
            "t".to_string(),
            "prompt".to_string(),
            None,
            15,
        );
        engine.store().set(task);

        let (status, body) = send(router(engine), get("/api/v1/newspaper/task/pending")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "processing");
        assert_eq!(body["estimated_time"], 15);
        assert!(body.get("result").is_none());
    }

    #[tokio::test]
    async fn themes_lists_builtin_vocabulary() {
        let (status, body) = send(router(engine(true)), get("/api/v1/newspaper/themes")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        let names: Vec<&str> = body["themes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"超市"));
        assert_eq!(body["themes"][0]["sample_words"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn words_batch_adds_theme() {
        let shared = engine(true);
        let (status, body) = send(
            router(shared.clone()),
            post_json(
                "/api/v1/newspaper/words/batch",
                json!({"theme": "动物园", "words": {"core": ["lǎo hǔ 老虎"], "items": ["xióng māo 熊猫"]}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["theme"], "动物园");

        let (_, body) = send(router(shared), get("/api/v1/newspaper/themes")).await;
        assert_eq!(body["total"], 4);

        let (status, _) = send(
            router(engine(true)),
            post_json("/api/v1/newspaper/words/batch", json!({"theme": "动物园"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_served_at_both_paths() {
        for path in ["/health", "/api/v1/health"] {
            let (status, body) = send(router(engine(true)), get(path)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "healthy");
            assert_eq!(body["mock_image_generation"], true);
            assert_eq!(body["kie_api_configured"], false);
            assert_eq!(body["active_tasks"], 0);
            assert!(body["quota"].is_null());
        }

        let (_, body) = send(router(engine(false)), get("/health")).await;
        assert_eq!(body["status"], "degraded");
    }

    #[tokio::test]
    async fn admin_views() {
        let engine = engine(true);
        let mut done = Task::new(
            "a".to_string(),
            "超市".to_string(),
            "t".to_string(),
            "p".to_string(),
            None,
            5,
        );
        done.complete("https://cdn/a.png".to_string(), None);
        engine.store().set(done);

        let (status, body) = send(router(engine.clone()), get("/api/v1/tasks/all")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["completed"], 1);
        assert_eq!(body["activeUsers"], 0);

        let (status, body) = send(router(engine), get("/api/v1/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], 1);
        assert_eq!(body["topThemes"][0]["name"], "超市");
    }

    #[tokio::test]
    async fn index_and_fallback() {
        let (status, body) = send(router(engine(true)), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["endpoints"].is_object());

        let (status, body) = send(router(engine(true)), get("/api/v1/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().contains("/api/v1/nope"));
    }

    #[tokio::test]
    async fn cors_rejects_unlisted_origin() {
        let config = ServiceConfig {
            allowed_origins: vec!["http://localhost:5173".to_string()],
            ..ServiceConfig::default()
        };
        let request = |origin: &str| {
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, origin)
                .body(Body::empty())
                .unwrap()
        };

        let response = app(engine(true), &config)
            .oneshot(request("http://127.0.0.1:5173"))
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://127.0.0.1:5173"
        );

        let response = app(engine(true), &config)
            .oneshot(request("https://evil.example.com"))
            .await
            .unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
