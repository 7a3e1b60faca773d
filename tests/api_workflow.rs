use axum::{http::StatusCode as StubStatus, routing::post, Json, Router};
use mindmap_api::config::AppConfig;
use mindmap_api::generator::{IdeaGenerator, WebhookGenerator};
use mindmap_api::{build_app, MemoryStore};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(&format!("{}{}", self.base_url, path))
            .header("user-agent", "integration-test")
            .json(&json)
            .send()
            .await
    }

    async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(&format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    async fn delete(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .delete(&format!("{}{}", self.base_url, path))
            .send()
            .await
    }
}

/// Serve `app` on an ephemeral port, with peer addresses available to extractors
async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    format!("http://{}", address)
}

/// A stand-in for the workflow webhook that mirrors the idea back with a fixed tree.
/// Ideas starting with "fail" get an HTTP 500, ideas starting with "junk" a malformed body,
/// ideas starting with "ordered" a hand-written body with non-alphabetical keys.
fn stub_webhook() -> Router {
    Router::new().route(
        "/webhook",
        post(|Json(body): Json<Value>| async move {
            let idea = body["idea"].as_str().unwrap_or_default().to_string();
            if idea.starts_with("fail") {
                return (StubStatus::INTERNAL_SERVER_ERROR, json!({"message": "workflow error"}).to_string());
            }
            if idea.starts_with("junk") {
                return (StubStatus::OK, json!({"idea": idea, "nodes": [{"title": "no id"}]}).to_string());
            }
            if idea.starts_with("ordered") {
                return (StubStatus::OK, ordered_body(&idea));
            }
            (
                StubStatus::OK,
                json!({
                    "idea": idea,
                    "nodes": [
                        {"id": 1, "title": "Design", "children": [{"id": 2, "title": "UI", "children": []}]},
                        {"id": 3, "title": "Backend", "children": []}
                    ]
                })
                .to_string(),
            )
        }),
    )
}

fn ordered_body(idea: &str) -> String {
    format!(
        r#"{{"nodes":[{{"title":"Root","id":7,"children":[]}}],"idea":{}}}"#,
        Value::from(idea)
    )
}

async fn start_api() -> TestClient {
    let webhook_url = format!("{}/webhook", spawn(stub_webhook()).await);
    let generator: Arc<dyn IdeaGenerator> = Arc::new(
        WebhookGenerator::new(webhook_url, Duration::from_secs(5), Duration::from_secs(2)).unwrap(),
    );
    let app = build_app(Arc::new(MemoryStore::new()), generator, &AppConfig::default());
    TestClient::new(spawn(app).await)
}

#[tokio::test]
async fn test_health() {
    let client = start_api().await;
    let response = client.get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "mindmap-api");
}

#[tokio::test]
async fn test_generate_fetch_and_list_workflow() {
    let client = start_api().await;

    println!("1. Generating a mind map...");
    let response = client
        .post("/generate", json!({"idea": "Build a chatbot", "session_id": "workflow-session"}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created: Value = response.json().await.unwrap();

    assert_eq!(created["idea"], "Build a chatbot");
    assert_eq!(created["session_id"], "workflow-session");
    assert_eq!(created["node_count"], 3);
    assert_eq!(created["raw_data"]["nodes"][1]["title"], "Backend");
    let roots = created["nodes"].as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["title"], "Design");
    assert_eq!(roots[0]["level"], 0);
    assert_eq!(roots[0]["order_index"], 0);
    assert_eq!(roots[1]["title"], "Backend");
    assert_eq!(roots[1]["order_index"], 1);
    assert_eq!(roots[0]["children"][0]["title"], "UI");
    assert_eq!(roots[0]["children"][0]["level"], 1);
    assert_eq!(roots[0]["children"][0]["parent_id"], roots[0]["id"]);

    println!("2. Fetching it back...");
    let id = created["id"].as_i64().unwrap();
    let fetched: Value = client
        .get(&format!("/mindmap/{}", id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, created);

    println!("3. Listing session and recent mind maps...");
    client
        .post("/generate", json!({"idea": "Launch a bakery", "session_id": "workflow-session"}))
        .await
        .unwrap();

    let listed: Vec<Value> = client
        .get("/session/workflow-session/mindmaps?skip=0&limit=10")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["idea"], "Build a chatbot");
    assert_eq!(listed[0]["node_count"], 3);
    assert_eq!(listed[0]["session_id"], "workflow-session");

    let paged: Vec<Value> = client
        .get("/session/workflow-session/mindmaps?skip=1&limit=1")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0]["idea"], "Launch a bakery");

    let recent: Vec<Value> = client.get("/recent").await.unwrap().json().await.unwrap();
    assert_eq!(recent[0]["idea"], "Launch a bakery");
    assert_eq!(recent[1]["idea"], "Build a chatbot");

    println!("4. Session statistics...");
    let stats: Value = client
        .get("/session/workflow-session/stats")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["session_id"], "workflow-session");
    assert_eq!(stats["total_queries"], 2);
    assert_eq!(stats["mindmap_count"], 2);

    println!("5. Global analytics...");
    let analytics: Value = client.get("/analytics").await.unwrap().json().await.unwrap();
    assert_eq!(analytics["total_mindmaps"], 2);
    assert_eq!(analytics["total_sessions"], 1);
    assert_eq!(analytics["total_nodes"], 6);
    assert_eq!(analytics["average_nodes_per_mindmap"], 3.0);
    assert_eq!(
        analytics["top_idea_keywords"],
        json!([["build", 1], ["chatbot", 1], ["launch", 1], ["bakery", 1]])
    );

    println!("6. Deleting the first mind map...");
    let response = client.delete(&format!("/mindmap/{}", id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = client.get(&format!("/mindmap/{}", id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let analytics: Value = client.get("/analytics").await.unwrap().json().await.unwrap();
    assert_eq!(analytics["total_nodes"], 3);
}

#[tokio::test]
async fn test_generate_without_session_creates_one() {
    let client = start_api().await;

    let created: Value = client
        .post("/generate", json!({"idea": "Build a chatbot"}))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let session_id = created["session_id"].as_str().unwrap().to_string();
    assert!(!session_id.is_empty());

    let stats: Value = client
        .get(&format!("/session/{}/stats", session_id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_queries"], 1);
}

#[tokio::test]
async fn test_webhook_failure_does_not_persist() {
    let client = start_api().await;

    let response = client
        .post("/generate", json!({"idea": "fail please", "session_id": "broken"}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("500"));

    let response = client
        .post("/generate", json!({"idea": "junk output", "session_id": "broken"}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let stats: Value = client
        .get("/session/broken/stats")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_queries"], 0);
    assert_eq!(stats["mindmap_count"], 0);

    let analytics: Value = client.get("/analytics").await.unwrap().json().await.unwrap();
    assert_eq!(analytics["total_mindmaps"], 0);
    assert_eq!(analytics["average_nodes_per_mindmap"], 0.0);
    assert_eq!(analytics["top_idea_keywords"], json!([]));
}

#[tokio::test]
async fn test_unreachable_webhook_is_503() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let generator: Arc<dyn IdeaGenerator> = Arc::new(
        WebhookGenerator::new(
            format!("http://{}/webhook", address),
            Duration::from_secs(5),
            Duration::from_secs(1),
        )
        .unwrap(),
    );
    let app = build_app(Arc::new(MemoryStore::new()), generator, &AppConfig::default());
    let client = TestClient::new(spawn(app).await);

    let response = client
        .post("/generate", json!({"idea": "Build a chatbot"}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let probe: Value = client
        .post("/test-webhook", json!({}))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(probe["status"], "error");
}

#[tokio::test]
async fn test_not_found_and_bad_requests() {
    let client = start_api().await;

    assert_eq!(client.get("/mindmap/424242").await.unwrap().status(), StatusCode::NOT_FOUND);
    assert_eq!(
        client.get("/session/nobody/stats").await.unwrap().status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(client.delete("/mindmap/424242").await.unwrap().status(), StatusCode::NOT_FOUND);

    let response = client.post("/generate", json!({"idea": "   "})).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let empty: Vec<Value> = client
        .get("/session/nobody/mindmaps")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_raw_data_is_served_as_received() {
    let client = start_api().await;

    let created: Value = client
        .post("/generate", json!({"idea": "ordered keys"}))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();

    let text = client
        .get(&format!("/mindmap/{}", id))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains(&format!(r#""raw_data":{}"#, ordered_body("ordered keys"))));
}

#[tokio::test]
async fn test_overlong_session_id_is_bad_request() {
    let client = start_api().await;

    let response = client
        .post("/generate", json!({"idea": "Build a chatbot", "session_id": "s".repeat(101)}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let analytics: Value = client.get("/analytics").await.unwrap().json().await.unwrap();
    assert_eq!(analytics["total_sessions"], 0);
}

#[tokio::test]
async fn test_probe_reaches_stub_webhook() {
    let client = start_api().await;
    let probe: Value = client
        .post("/test-webhook", json!({}))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(probe["status"], "success");
    assert_eq!(probe["webhook_status_code"], 200);
    assert!(probe["response_preview"].as_str().unwrap().contains("Test connection"));
}
