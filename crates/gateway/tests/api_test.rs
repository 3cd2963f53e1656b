//! HTTP-level tests driving the router with `oneshot`

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use fieldnotes_common::{
    auth::{JwtManager, Principal},
    config::AppConfig,
    db::{models::UserRole, schema, DbPool, NewUser, Repository},
    storage::LocalBlobStore,
};
use fieldnotes_gateway::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    jwt: Arc<JwtManager>,
    _uploads: TempDir,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

const ADMIN: (i32, UserRole) = (1, UserRole::Admin);
const ALICE: (i32, UserRole) = (2, UserRole::Researcher);
const BOB: (i32, UserRole) = (3, UserRole::Researcher);

async fn spawn_app() -> TestApp {
    let pool = DbPool::connect_single("sqlite::memory:").await.unwrap();
    schema::create_all(pool.write()).await.unwrap();

    let repo = Repository::new(pool.clone());
    let admin = Principal::new(ADMIN.0, ADMIN.1);
    for (name, role) in [
        ("admin", UserRole::Admin),
        ("alice", UserRole::Researcher),
        ("bob", UserRole::Researcher),
    ] {
        repo.create_user(
            &admin,
            NewUser {
                username: name.into(),
                email: format!("{}@example.org", name),
                full_name: None,
                role,
                is_active: true,
            },
        )
        .await
        .unwrap();
    }

    let mut config = AppConfig::default();
    config.rate_limit.enabled = false;

    let uploads = tempfile::tempdir().unwrap();
    let jwt = Arc::new(JwtManager::new("test_secret", 3600));
    let state = AppState {
        config: Arc::new(config),
        db: pool,
        jwt: jwt.clone(),
        blobs: Arc::new(LocalBlobStore::new(uploads.path())),
        metrics: None,
    };

    TestApp {
        router: create_router(state).unwrap(),
        jwt,
        _uploads: uploads,
    }
}

impl TestApp {
    fn token(&self, who: (i32, UserRole)) -> String {
        self.jwt.generate_token(who.0, who.1).unwrap()
    }

    async fn send(&self, method: Method, uri: &str, who: Option<(i32, UserRole)>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(who) = who {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(who)));
        }
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        Reply { status, headers, body }
    }

    async fn get(&self, uri: &str, who: (i32, UserRole)) -> Reply {
        self.send(Method::GET, uri, Some(who), None).await
    }

    async fn post(&self, uri: &str, who: (i32, UserRole), body: Value) -> Reply {
        self.send(Method::POST, uri, Some(who), Some(body)).await
    }

    async fn put(&self, uri: &str, who: (i32, UserRole), body: Value) -> Reply {
        self.send(Method::PUT, uri, Some(who), Some(body)).await
    }

    async fn create_record(&self, who: (i32, UserRole), body: Value) -> i64 {
        let reply = self.post("/api/v1/records", who, body).await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text());
        reply.json()["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = spawn_app().await;
    let reply = app.send(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["status"], "healthy");

    let reply = app.send(Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["checks"]["database"]["status"], "up");
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = spawn_app().await;
    let reply = app.send(Method::GET, "/api/v1/records", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()["error"]["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/api/v1/records")
        .header(header::AUTHORIZATION, "Bearer not.a.token")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn end_to_end_interview_listing_and_csv_export() {
    let app = spawn_app().await;

    let field = app
        .post("/api/v1/fields", ALICE, json!({"region": "North", "location": "Harbour"}))
        .await;
    assert_eq!(field.status, StatusCode::CREATED);
    assert_eq!(field.json()["full_location"], "North - Harbour");
    let field_id = field.json()["id"].as_i64().unwrap();

    let participant = app
        .post("/api/v1/participants", ALICE, json!({"name_or_code": "P-01"}))
        .await;
    assert_eq!(participant.status, StatusCode::CREATED);
    let participant_id = participant.json()["id"].as_i64().unwrap();

    let category = app
        .post("/api/v1/tags/categories", ADMIN, json!({"name": "Themes", "type": "theme"}))
        .await;
    assert_eq!(category.status, StatusCode::CREATED);
    let category_id = category.json()["id"].as_i64().unwrap();

    let tag = app
        .post("/api/v1/tags", ALICE, json!({"name": "kinship", "category_id": category_id}))
        .await;
    assert_eq!(tag.status, StatusCode::CREATED);
    let tag_id = tag.json()["id"].as_i64().unwrap();

    let record_id = app
        .create_record(
            ALICE,
            json!({
                "title": "Talk with the harbour master",
                "type": "interview",
                "status": "draft",
                "record_date": "2024-05-02T10:00:00Z",
                "field_id": field_id,
                "participant_ids": [participant_id],
                "tag_ids": [tag_id],
                "content": {"interview_outline": "Boats", "qa_records": [{"q": "Why?", "a": "Tides"}]}
            }),
        )
        .await;
    app.create_record(
        ALICE,
        json!({"title": "Morning walk", "type": "field_note", "record_date": "2024-05-03T07:00:00Z"}),
    )
    .await;

    let listed = app.get("/api/v1/records?type=interview", ALICE).await;
    assert_eq!(listed.status, StatusCode::OK);
    let body = listed.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["id"].as_i64(), Some(record_id));
    assert_eq!(body["items"][0]["field"]["full_location"], "North - Harbour");
    assert_eq!(body["items"][0]["participants"][0]["name_or_code"], "P-01");

    let export = app.get("/api/v1/export/records/csv", ALICE).await;
    assert_eq!(export.status, StatusCode::OK);
    assert!(export.headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let disposition = export.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"field_records_export_"));
    assert!(disposition.contains("filename*=UTF-8''"));

    let text = export.text();
    assert!(text.starts_with('\u{feff}'));
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 3);

    let selected = app
        .get(&format!("/api/v1/export/records/csv?record_ids={}", record_id), ALICE)
        .await;
    let text = selected.text();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("\"North - Harbour\""));
    assert!(lines[1].contains("\"P-01\""));
    assert!(lines[1].contains("\"Interview\""));
}

#[tokio::test]
async fn researchers_only_see_their_own_records() {
    let app = spawn_app().await;
    let mine = app
        .create_record(ALICE, json!({"title": "A", "type": "other", "record_date": "2024-01-01T00:00:00Z"}))
        .await;
    app.create_record(BOB, json!({"title": "B", "type": "other", "record_date": "2024-01-02T00:00:00Z"}))
        .await;

    assert_eq!(app.get("/api/v1/records", ALICE).await.json()["total"], 1);
    assert_eq!(app.get("/api/v1/records", ADMIN).await.json()["total"], 2);

    let reply = app.get(&format!("/api/v1/records/{}", mine), BOB).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let stats = app.get("/api/v1/stats/overview", BOB).await.json();
    assert_eq!(stats["records_count"], 1);

    // Bob cannot pull Alice's record into an export by id
    let reply = app
        .get(&format!("/api/v1/export/records/json?record_ids={}", mine), BOB)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json()["error"]["code"], "NO_DATA");
}

#[tokio::test]
async fn pagination_and_id_list_validation() {
    let app = spawn_app().await;
    for day in 1..=3 {
        app.create_record(
            ALICE,
            json!({"title": format!("Day {}", day), "type": "observation", "record_date": format!("2024-03-0{}T12:00:00Z", day)}),
        )
        .await;
    }

    let page = app.get("/api/v1/records?skip=1&limit=1", ALICE).await.json();
    assert_eq!(page["total"], 3);
    assert_eq!(page["skip"], 1);
    assert_eq!(page["items"][0]["title"], "Day 2");

    let past_end = app.get("/api/v1/records?skip=10&limit=5", ALICE).await.json();
    assert_eq!(past_end["total"], 3);
    assert_eq!(past_end["items"].as_array().unwrap().len(), 0);

    assert_eq!(
        app.get("/api/v1/records?limit=0", ALICE).await.status,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.get("/api/v1/records?limit=1001", ALICE).await.status,
        StatusCode::BAD_REQUEST
    );

    // Lenient in list filters, strict in export selection
    let lenient = app.get("/api/v1/records?tag_ids=1,abc", ALICE).await;
    assert_eq!(lenient.status, StatusCode::OK);
    assert_eq!(lenient.json()["total"], 3);

    let strict = app.get("/api/v1/export/records/csv?record_ids=1,abc", ALICE).await;
    assert_eq!(strict.status, StatusCode::BAD_REQUEST);

    let unknown = app.get("/api/v1/export/records/xml", ALICE).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn json_and_markdown_exports() {
    let app = spawn_app().await;
    let content = json!({"description": "Quiet | calm", "reflection": "Line one\nline two", "mood": 3});
    app.create_record(
        ALICE,
        json!({"title": "Dusk", "type": "field_note", "record_date": "2024-02-01T18:00:00Z", "content": content}),
    )
    .await;

    let reply = app.get("/api/v1/export/records/json", ALICE).await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["records"][0]["content_raw"], content);

    let reply = app.get("/api/v1/export/records/markdown", ALICE).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/markdown"));
    assert!(reply.headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains(".md"));
    assert!(reply.text().contains("Dusk"));
}

#[tokio::test]
async fn conditional_update_conflicts_on_stale_version() {
    let app = spawn_app().await;
    let id = app
        .create_record(ALICE, json!({"title": "Draft", "type": "other", "record_date": "2024-04-01T00:00:00Z"}))
        .await;
    let uri = format!("/api/v1/records/{}", id);

    let first = app.put(&uri, ALICE, json!({"status": "completed", "version": 1})).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.json()["version"], 2);

    let stale = app.put(&uri, ALICE, json!({"title": "Late", "version": 1})).await;
    assert_eq!(stale.status, StatusCode::CONFLICT);
    assert_eq!(stale.json()["error"]["code"], "VERSION_CONFLICT");

    let reply = app.send(Method::DELETE, &uri, Some(ALICE), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&uri, ALICE).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tag_rules_over_http() {
    let app = spawn_app().await;
    let category = app
        .post("/api/v1/tags/categories", ALICE, json!({"name": "Methods", "type": "analysis"}))
        .await
        .json();
    let category_id = category["id"].as_i64().unwrap();

    let body = json!({"name": "coding", "category_id": category_id});
    assert_eq!(app.post("/api/v1/tags", ALICE, body.clone()).await.status, StatusCode::CREATED);
    assert_eq!(app.post("/api/v1/tags", BOB, body).await.status, StatusCode::BAD_REQUEST);

    let categories = app.get("/api/v1/tags/categories", BOB).await.json();
    assert_eq!(categories[0]["tag_count"], 1);
    assert_eq!(categories[0]["type"], "analysis");

    let uri = format!("/api/v1/tags/categories/{}", category_id);
    let reply = app.send(Method::DELETE, &uri, Some(ALICE), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = app.send(Method::DELETE, &uri, Some(ADMIN), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.json()["error"]["message"]
        .as_str()
        .unwrap()
        .contains("1 tag(s)"));
}

#[tokio::test]
async fn users_endpoints() {
    let app = spawn_app().await;
    let me = app.get("/api/v1/users/me", ALICE).await.json();
    assert_eq!(me["username"], "alice");
    assert_eq!(me["role"], "researcher");

    assert_eq!(app.get("/api/v1/users", ALICE).await.status, StatusCode::FORBIDDEN);
    let users = app.get("/api/v1/users?role=researcher", ADMIN).await.json();
    assert_eq!(users["total"], 2);

    let created = app
        .post(
            "/api/v1/users",
            ADMIN,
            json!({"username": "carol", "email": "carol@example.org", "role": "researcher"}),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["is_active"], true);
}

#[tokio::test]
async fn malformed_query_values_get_json_errors() {
    let app = spawn_app().await;
    for uri in [
        "/api/v1/records?type=bogus",
        "/api/v1/records?limit=abc",
        "/api/v1/records?created_by=x",
        "/api/v1/export/records/csv?status=lost",
        "/api/v1/participants?is_anonymous=maybe",
        "/api/v1/stats/recent-activities?limit=ten",
    ] {
        let reply = app.get(uri, ALICE).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(reply.json()["error"]["code"], "INVALID_FORMAT", "{}", uri);
    }
}

#[tokio::test]
async fn recent_activities_feed() {
    let app = spawn_app().await;
    let reply = app
        .post("/api/v1/participants", ALICE, json!({"name_or_code": "P-07"}))
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    app.create_record(
        ALICE,
        json!({"title": "Harbour dawn", "type": "field_note", "record_date": "2024-04-01T05:00:00Z"}),
    )
    .await;
    app.create_record(
        BOB,
        json!({"title": "Bob's walk", "type": "field_note", "record_date": "2024-04-02T05:00:00Z"}),
    )
    .await;

    let feed = app.get("/api/v1/stats/recent-activities", ALICE).await;
    assert_eq!(feed.status, StatusCode::OK);
    let feed = feed.json();
    assert_eq!(feed["total"], 2);
    let kinds: Vec<_> = feed["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["type"].as_str().unwrap().to_string())
        .collect();
    assert!(kinds.contains(&"record".to_string()));
    assert!(kinds.contains(&"participant".to_string()));
    assert!(feed["items"].as_array().unwrap().iter().all(|a| a["creator_name"] == "alice"));

    let everything = app.get("/api/v1/stats/recent-activities?limit=50", ADMIN).await.json();
    assert_eq!(everything["total"], 3);

    let reply = app.get("/api/v1/stats/recent-activities?limit=51", ADMIN).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn records_cannot_borrow_another_researchers_participant() {
    let app = spawn_app().await;
    let secret = app
        .post("/api/v1/participants", ALICE, json!({"name_or_code": "Informant"}))
        .await
        .json()["id"]
        .as_i64()
        .unwrap();

    let id = app
        .create_record(
            BOB,
            json!({"title": "Borrowed", "type": "interview", "record_date": "2024-04-01T05:00:00Z", "participant_ids": [secret]}),
        )
        .await;

    let detail = app.get(&format!("/api/v1/records/{}", id), BOB).await.json();
    assert_eq!(detail["participants"].as_array().unwrap().len(), 0);

    let csv = app.get("/api/v1/export/records/csv", BOB).await.text();
    assert!(!csv.contains("Informant"));
}
