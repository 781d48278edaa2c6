use std::sync::Arc;

use arena_api::app::{build_app, AppServices};
use arena_infra::{PipelineConfig, PipelineHandle};
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
    _workers: PipelineHandle,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router and pipeline as prod, bound to an ephemeral port.
        let services = Arc::new(AppServices::in_memory(PipelineConfig::default()));
        let workers = services.start();
        let app = build_app(services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            handle,
            _workers: workers,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn register(client: &reqwest::Client, srv: &TestServer, body: Value) -> String {
    let res = client
        .post(srv.url("/participants"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

/// Dispatch runs off the change feed, so poll until `done` holds.
async fn battle_eventually(
    client: &reqwest::Client,
    srv: &TestServer,
    id: &str,
    done: impl Fn(&Value) -> bool,
) -> Value {
    for _ in 0..200 {
        let res = client
            .get(srv.url(&format!("/battles/{}", id)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        if done(&body) {
            return body;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    panic!("battle {id} did not reach the expected state in time");
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn battle_runs_through_rating_and_artifact() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let strong = register(
        &client,
        &srv,
        json!({"name": "Aria", "score": 90, "originName": "Valoria", "regionName": "North Reach"}),
    )
    .await;
    let weak = register(&client, &srv, json!({"name": "Bram", "score": 10})).await;

    let res = client
        .post(srv.url("/battles"))
        .json(&json!({
            "participantA": weak,
            "participantB": strong,
            "artifactEligible": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["status"], "queued");
    let id = created["id"].as_str().unwrap().to_string();

    let job = battle_eventually(&client, &srv, &id, |b| {
        b["eloApplied"] == true && b["artifactStatus"] == "done"
    })
    .await;

    assert_eq!(job["status"], "done");
    assert_eq!(job["finished"], true);
    assert_eq!(job["winnerId"], strong.as_str());
    assert_eq!(job["loserId"], weak.as_str());
    assert!(job["artifact"]["winner"].as_str().is_some());

    let winner: Value = client
        .get(srv.url(&format!("/participants/{}", strong)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(winner["rating"].as_i64().unwrap() > 1000);
    assert_eq!(winner["battleCount"], 1);

    let listed: Value = client
        .get(srv.url("/battles?status=done"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.as_array().unwrap().iter().any(|b| b["id"] == id.as_str()));
}

#[tokio::test]
async fn invalid_requests_map_to_json_errors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/participants"))
        .json(&json!({"name": "  ", "score": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let res = client
        .post(srv.url("/participants"))
        .json(&json!({"name": "Titan", "score": 1, "rating": i64::MAX}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/battles/not-an-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let only = register(&client, &srv, json!({"name": "Solo", "score": 3})).await;
    let res = client
        .post(srv.url("/battles"))
        .json(&json!({"participantA": only, "participantB": only}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/battles?status=finished"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn artifact_retry_requires_failed_artifact() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let a = register(&client, &srv, json!({"name": "Aria", "score": 5})).await;
    let b = register(&client, &srv, json!({"name": "Bram", "score": 4})).await;
    let created: Value = client
        .post(srv.url("/battles"))
        .json(&json!({"participantA": a, "participantB": b}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    battle_eventually(&client, &srv, &id, |b| b["status"] == "done").await;

    let res = client
        .post(srv.url(&format!("/battles/{}/artifact/retry", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn stats_report_status_counts() {
    let srv = TestServer::spawn().await;
    let body: Value = reqwest::get(srv.url("/stats")).await.unwrap().json().await.unwrap();
    assert_eq!(body["jobs"]["queued"], 0);
    assert_eq!(body["admissionCeiling"], 8);
}
