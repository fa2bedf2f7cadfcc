//! Integration tests. Build the router over an in-memory store and drive it
//! with `oneshot` requests.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use chrono::Duration;
use reliable_api::config::ApiConfig;
use reliable_api::policy::{Access, ROUTE_POLICIES};
use reliable_api::{AppState, router};
use reliable_core::auth::jwt::issue_token;
use reliable_core::models::document::{Document, DocumentId, Fields};
use reliable_core::store::{
    Collection, DeleteAck, DocumentStore, Filter, InsertAck, MemoryStore, StoreGateway,
    StoreResult, UpdateAck,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

fn app() -> (Router, StoreGateway) {
    let store = StoreGateway::in_memory();
    let state = AppState {
        store: store.clone(),
        config: ApiConfig::with_secret(SECRET),
    };
    (router(state), store)
}

fn token_for(email: &str) -> String {
    issue_token(email, SECRET.as_bytes(), Duration::hours(1)).expect("issue token")
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

async fn seed_user(store: &StoreGateway, email: &str, extra: Value) {
    let set: Fields = extra.as_object().cloned().expect("object");
    store
        .users()
        .upsert_one(&Filter::eq("email", email), set)
        .await
        .expect("seed user");
}

async fn place_order(app: &Router, customer: &str, part: &str) {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/order",
            None,
            Some(json!({"customer": customer, "part": part, "quantity": 2})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["insertedId"].is_string());
}

/// Concrete URI for a route template.
fn concrete(path: &str) -> String {
    path.replace("{id}", "not-an-id")
        .replace("{email}", "someone@x.com")
}

// ---------------------------------------------------------------------------
// Liveness
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_returns_liveness_banner() {
    let (app, _) = app();
    let (status, body) = send(&app, request(Method::GET, "/", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("Running reliable parts server"));
}

#[tokio::test]
async fn health_reports_store_connected() {
    let (app, _) = app();
    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "storeConnected": true}));
}

// ---------------------------------------------------------------------------
// Authorization gate
// ---------------------------------------------------------------------------

const PROTECTED: [(&str, &str); 3] = [
    ("GET", "/order?customer=alice@x.com"),
    ("GET", "/user"),
    ("PUT", "/user/admin/bob@x.com"),
];

#[tokio::test]
async fn protected_routes_without_header_are_unauthenticated() {
    let (app, _) = app();
    for (method, uri) in PROTECTED {
        let method = Method::from_bytes(method.as_bytes()).unwrap();
        let (status, body) = send(&app, request(method, uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "unauthenticated");
    }
}

#[tokio::test]
async fn wrong_signature_and_expired_tokens_are_forbidden() {
    let (app, store) = app();
    seed_user(&store, "alice@x.com", json!({"role": "admin"})).await;

    let forged = issue_token("alice@x.com", b"not-the-secret", Duration::hours(1)).unwrap();
    let expired = issue_token("alice@x.com", SECRET.as_bytes(), Duration::seconds(-120)).unwrap();

    for token in [forged.as_str(), expired.as_str(), "garbage"] {
        for (method, uri) in PROTECTED {
            let method = Method::from_bytes(method.as_bytes()).unwrap();
            let (status, body) = send(&app, request(method, uri, Some(token), None)).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
            assert_eq!(body["message"], "Forbidden access");
        }
    }
}

#[tokio::test]
async fn header_without_bearer_token_is_forbidden() {
    let (app, _) = app();
    let req = Request::builder()
        .uri("/user")
        .header(AUTHORIZATION, "Bearer")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn head_on_protected_route_requires_token() {
    let (app, _) = app();
    let (status, _) = send(&app, request(Method::HEAD, "/user", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn every_policy_entry_is_routed_with_its_check() {
    let (app, _) = app();
    for policy in &ROUTE_POLICIES {
        let uri = concrete(policy.path);
        let (status, _) = send(&app, request(policy.method.clone(), &uri, None, None)).await;
        assert_ne!(status, StatusCode::NOT_FOUND, "{} {uri}", policy.method);
        assert_ne!(status, StatusCode::METHOD_NOT_ALLOWED, "{} {uri}", policy.method);
        match policy.access {
            Access::Public => {
                assert_ne!(status, StatusCode::UNAUTHORIZED, "{} {uri}", policy.method)
            }
            _ => assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {uri}", policy.method),
        }
    }
}

#[tokio::test]
async fn methods_outside_the_table_are_not_allowed() {
    let (app, _) = app();
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::PATCH,
    ];
    for policy in &ROUTE_POLICIES {
        for method in &methods {
            let listed = ROUTE_POLICIES
                .iter()
                .any(|p| p.path == policy.path && p.method == *method);
            if listed {
                continue;
            }
            let uri = concrete(policy.path);
            let (status, _) = send(&app, request(method.clone(), &uri, None, None)).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
        }
    }
}

// ---------------------------------------------------------------------------
// Orders: ownership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn customer_lists_only_own_orders() {
    let (app, _) = app();
    place_order(&app, "alice@x.com", "rotor").await;
    place_order(&app, "bob@x.com", "caliper").await;
    place_order(&app, "alice@x.com", "pad").await;

    let (status, body) = send(
        &app,
        request(Method::PUT, "/user/alice@x.com", None, Some(json!({"name": "Alice"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().expect("token").to_string();

    let (status, body) = send(
        &app,
        request(Method::GET, "/order?customer=alice@x.com", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let orders = body.as_array().expect("array");
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o["customer"] == "alice@x.com"));
    let parts: Vec<_> = orders.iter().map(|o| o["part"].clone()).collect();
    assert_eq!(parts, [json!("rotor"), json!("pad")]);

    let (status, body) = send(
        &app,
        request(Method::GET, "/order?customer=bob@x.com", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!body.is_array());
    assert!(!body.to_string().contains("caliper"));
}

#[tokio::test]
async fn order_listing_without_customer_is_forbidden() {
    let (app, _) = app();
    let token = token_for("alice@x.com");
    let (status, _) = send(&app, request(Method::GET, "/order", Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upsert_user_is_idempotent_and_issues_token() {
    let (app, store) = app();
    let profile = json!({"name": "Alice", "phone": "555-0100"});

    let (status, first) = send(
        &app,
        request(Method::PUT, "/user/alice@x.com", None, Some(profile.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["result"]["upsertedCount"], 1);
    let after_first = store.users().find_all().await.unwrap();

    let (status, second) = send(
        &app,
        request(Method::PUT, "/user/alice@x.com", None, Some(profile)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["result"]["matchedCount"], 1);
    assert_eq!(second["result"]["modifiedCount"], 0);
    assert_eq!(store.users().find_all().await.unwrap(), after_first);

    let token = second["token"].as_str().unwrap();
    let (status, users) = send(&app, request(Method::GET, "/user", Some(token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "alice@x.com");
    assert_eq!(users[0]["name"], "Alice");
}

#[tokio::test]
async fn upsert_cannot_self_escalate() {
    let (app, _) = app();
    let (status, _) = send(
        &app,
        request(
            Method::PUT,
            "/user/mallory@x.com",
            None,
            Some(json!({"role": "admin", "email": "alice@x.com"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, request(Method::GET, "/admin/mallory@x.com", None, None)).await;
    assert_eq!(body, json!({"admin": false}));
    let (_, body) = send(&app, request(Method::GET, "/admin/alice@x.com", None, None)).await;
    assert_eq!(body, json!({"admin": false}));
}

#[tokio::test]
async fn upsert_rejects_non_object_body() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        request(Method::PUT, "/user/alice@x.com", None, Some(json!([1, 2]))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn grant_admin_requires_exact_admin_role() {
    let (app, store) = app();
    seed_user(&store, "bob@x.com", json!({})).await;

    for role in [json!(null), json!("user"), json!("Admin"), json!(["admin"])] {
        let requester = "carol@x.com";
        let mut set = json!({"name": "Carol"});
        if !role.is_null() {
            set["role"] = role.clone();
        }
        seed_user(&store, requester, set).await;

        let (status, _) = send(
            &app,
            request(Method::PUT, "/user/admin/bob@x.com", Some(&token_for(requester)), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "role {role}");
    }

    let (_, body) = send(&app, request(Method::GET, "/admin/bob@x.com", None, None)).await;
    assert_eq!(body, json!({"admin": false}));

    seed_user(&store, "root@x.com", json!({"role": "admin"})).await;
    let (status, body) = send(
        &app,
        request(Method::PUT, "/user/admin/bob@x.com", Some(&token_for("root@x.com")), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matchedCount"], 1);
    assert_eq!(body["modifiedCount"], 1);

    let (_, body) = send(&app, request(Method::GET, "/admin/bob@x.com", None, None)).await;
    assert_eq!(body, json!({"admin": true}));
}

#[tokio::test]
async fn grant_admin_with_unknown_requester_is_not_found() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        request(Method::PUT, "/user/admin/bob@x.com", Some(&token_for("ghost@x.com")), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn check_admin_for_unknown_user_is_false() {
    let (app, _) = app();
    let (status, body) = send(&app, request(Method::GET, "/admin/nobody@x.com", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"admin": false}));
}

// ---------------------------------------------------------------------------
// Parts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn part_create_get_delete_roundtrip() {
    let (app, _) = app();
    let part = json!({"name": "Brake rotor", "price": 49.5, "stock": 12, "supplier": "Acme"});

    let (status, ack) = send(&app, request(Method::POST, "/part", None, Some(part.clone()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["acknowledged"], true);
    let id = ack["insertedId"].as_str().unwrap().to_string();

    let (status, fetched) =
        send(&app, request(Method::GET, &format!("/part/{id}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["_id"], id.as_str());
    for (key, value) in part.as_object().unwrap() {
        assert_eq!(&fetched[key], value, "{key}");
    }

    let (_, list) = send(&app, request(Method::GET, "/part", None, None)).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, ack) =
        send(&app, request(Method::DELETE, &format!("/part/{id}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"acknowledged": true, "deletedCount": 1}));

    let (status, body) =
        send(&app, request(Method::GET, &format!("/part/{id}"), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn malformed_part_id_is_invalid_identifier() {
    let (app, _) = app();
    for method in [Method::GET, Method::DELETE] {
        let (status, body) =
            send(&app, request(method, "/part/62a1b2c3d4e5f6a7b8c9d0e1", None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_identifier");
    }
}

#[tokio::test]
async fn client_supplied_id_is_ignored() {
    let (app, _) = app();
    let (_, ack) = send(
        &app,
        request(Method::POST, "/part", None, Some(json!({"_id": "mine", "name": "x"}))),
    )
    .await;
    let id = ack["insertedId"].as_str().unwrap();
    assert_ne!(id, "mine");
    let (status, _) = send(&app, request(Method::GET, &format!("/part/{id}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reviews_are_recorded_and_listed() {
    let (app, _) = app();
    for rating in [5, 3] {
        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/review",
                None,
                Some(json!({"name": "Dana", "rating": rating, "text": "solid"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&app, request(Method::GET, "/review", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let ratings: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["rating"].clone())
        .collect();
    assert_eq!(ratings, [json!(5), json!(3)]);
}

#[tokio::test]
async fn undecodable_path_segment_is_a_json_error() {
    let (app, _) = app();
    let cases = [
        (Method::GET, "/part/%FF", None),
        (Method::DELETE, "/part/%FF", None),
        (Method::GET, "/admin/%FF", None),
        (Method::PUT, "/user/%FF", Some(json!({"name": "A"}))),
    ];
    for (method, uri, body) in cases {
        let (status, body) = send(&app, request(method.clone(), uri, None, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
        assert_eq!(body["error"], "validation_error", "{method} {uri}");
        assert!(body["message"].is_string(), "{method} {uri}");
    }
}

#[tokio::test]
async fn unrepresentable_token_lifetime_is_an_internal_error() {
    let store = StoreGateway::in_memory();
    let config = ApiConfig {
        token_ttl_secs: i64::MAX,
        ..ApiConfig::with_secret(SECRET)
    };
    let app = router(AppState {
        store: store.clone(),
        config,
    });

    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            "/user/alice@x.com",
            None,
            Some(json!({"name": "Alice"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert!(store.users().find_all().await.expect("users").is_empty());
}

/// Memory store whose reads stall, for exercising the request timeout.
struct StalledStore {
    inner: MemoryStore,
    delay: StdDuration,
}

#[async_trait]
impl DocumentStore for StalledStore {
    async fn find(
        &self,
        collection: Collection,
        filter: Option<&Filter>,
    ) -> StoreResult<Vec<Document>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find(collection, filter).await
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        self.inner.find_one(collection, filter).await
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> StoreResult<Option<Document>> {
        self.inner.find_by_id(collection, id).await
    }

    async fn insert_one(&self, collection: Collection, fields: Fields) -> StoreResult<InsertAck> {
        self.inner.insert_one(collection, fields).await
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Fields,
        upsert: bool,
    ) -> StoreResult<UpdateAck> {
        self.inner.update_one(collection, filter, set, upsert).await
    }

    async fn delete_by_id(&self, collection: Collection, id: DocumentId) -> StoreResult<DeleteAck> {
        self.inner.delete_by_id(collection, id).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn requests_exceeding_the_timeout_get_408() {
    let store = StoreGateway::new(Arc::new(StalledStore {
        inner: MemoryStore::new(),
        delay: StdDuration::from_secs(5),
    }));
    let config = ApiConfig {
        request_timeout_secs: 1,
        ..ApiConfig::with_secret(SECRET)
    };
    let app = router(AppState { store, config });

    let (status, _) = send(&app, request(Method::GET, "/part", None, None)).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

    let (status, _) = send(&app, request(Method::GET, "/", None, None)).await;
    assert_eq!(status, StatusCode::OK);
}
