// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    attestation::{AttestedFetch, Report, ReportStats},
    auth::MintedToken,
    error::ApiError,
    models::{
        FetchRequest, HealthResponse, KeyResponse, PutRecordRequest, PutStoreRequest,
        RecordListResponse, RecordValueResponse, StatsResponse, StoreKeysResponse,
        StoreValueResponse, TokenKind, TokenRequest, WriteResponse,
    },
    state::AppState,
    stats::StatsSnapshot,
    storage::SealedRecordEntry,
};

pub mod attestation;
pub mod extract;
pub mod health;
pub mod records;
pub mod store;
pub mod token;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/stats", get(health::stats))
        .route("/key", get(health::key))
        .route("/report", get(attestation::report))
        .route("/fetch", post(attestation::fetch))
        .route(
            "/records",
            get(records::get_records).post(records::put_record),
        )
        .route("/store", get(store::list_keys).post(store::put_value))
        .route("/store/{key}", get(store::get_value))
        .route("/token", post(token::mint_token))
        .with_state(state);

    routes
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(unknown_route)
        .method_not_allowed_fallback(unsupported_method)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn unknown_route() -> ApiError {
    ApiError::not_found("not found")
}

async fn unsupported_method() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::stats,
        health::key,
        attestation::fetch,
        attestation::report,
        records::put_record,
        records::get_records,
        store::put_value,
        store::list_keys,
        store::get_value,
        token::mint_token
    ),
    components(
        schemas(
            HealthResponse,
            StatsResponse,
            StatsSnapshot,
            KeyResponse,
            FetchRequest,
            AttestedFetch,
            Report,
            ReportStats,
            WriteResponse,
            PutStoreRequest,
            StoreKeysResponse,
            StoreValueResponse,
            PutRecordRequest,
            RecordValueResponse,
            RecordListResponse,
            SealedRecordEntry,
            TokenKind,
            TokenRequest,
            MintedToken
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Service", description = "Liveness, counters and public identity"),
        (name = "Attestation", description = "Quote-backed reports and fetches"),
        (name = "Store", description = "Sealed key/value store"),
        (name = "Records", description = "Per-user sealed records"),
        (name = "Tokens", description = "Demo token minting")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::{canonical_json, sha256_hex, AttestedFetcher, Attester};
    use crate::auth::{TokenGate, TokenIssuer};
    use crate::crypto::{seal, RootKey};
    use crate::storage::{LocalStore, RecordDatabase, RecordStore};
    use crate::tee::{derive_key, SimulatedBackend, TeeBackend};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use serde_json::{json, Value};
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const SECRET: &[u8] = b"router-secret";

    struct Harness {
        app: Router,
        token: String,
        sim: SimulatedBackend,
        _dir: TempDir,
    }

    async fn harness_with(configure: impl FnOnce(AppState, RootKey, &TempDir) -> AppState) -> Harness {
        let dir = TempDir::new().unwrap();
        let sim = SimulatedBackend::new("router-tests");
        let tee = TeeBackend::Simulated(sim.clone());
        let root = derive_key(&tee, "/oracle", "signing").await.unwrap().root().clone();

        let state = AppState::new(
            Attester::new(tee, "/oracle", "signing"),
            AttestedFetcher::new(Duration::from_secs(2)).unwrap(),
            TokenGate::new(SECRET),
        );
        let state = configure(state, root, &dir);

        let token = TokenIssuer::new(SECRET)
            .mint("tester", Duration::from_secs(300))
            .unwrap()
            .token;

        Harness {
            app: router(state),
            token,
            sim,
            _dir: dir,
        }
    }

    async fn harness() -> Harness {
        harness_with(|state, root, dir| {
            let store = LocalStore::open(dir.path().join("store.enc"), root.clone()).unwrap();
            let db = RecordDatabase::open(&dir.path().join("records.redb")).unwrap();
            state
                .with_local_store(store)
                .with_records(RecordStore::new(root, db))
        })
        .await
    }

    impl Harness {
        async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, body)
        }

        async fn get(&self, uri: &str, authed: bool) -> (StatusCode, Value) {
            let mut builder = Request::builder().method("GET").uri(uri);
            if authed {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token));
            }
            self.send(builder.body(Body::empty()).unwrap()).await
        }

        async fn post(&self, uri: &str, body: Value, authed: bool) -> (StatusCode, Value) {
            let mut builder = Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json");
            if authed {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token));
            }
            self.send(builder.body(Body::from(body.to_string())).unwrap())
                .await
        }
    }

    #[test]
    fn openapi_document_builds() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(doc["paths"]["/records"].is_object());
        assert!(doc["components"]["securitySchemes"]["bearer"].is_object());
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let h = harness().await;
        let (status, body) = h.get("/health", false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["backend"], "simulator");
        assert_eq!(body["degraded"], json!([]));
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let h = harness().await;
        for uri in ["/store", "/store/x", "/records?userId=alice"] {
            let (status, body) = h.get(uri, false).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["error_code"], "missing_token");
        }
        let (status, _) = h.post("/store", json!({"key": "x", "value": 1}), false).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = h
            .post("/records", json!({"userId": "a", "key": "k", "value": "v"}), false)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = h.post("/fetch", json!({"url": "https://example.com"}), false).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn store_round_trip() {
        let h = harness().await;

        let (status, body) = h.post("/store", json!({"key": "x", "value": 42}), true).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true, "key": "x"}));

        let (status, body) = h.get("/store/x", true).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"key": "x", "value": 42}));

        let (status, body) = h.get("/store", true).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"keys": ["x"], "count": 1}));

        let (status, body) = h.get("/store/missing", true).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn store_validates_body() {
        let h = harness().await;
        let (status, _) = h.post("/store", json!({"key": "", "value": 1}), true).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = h.post("/store", json!({"key": "x"}), true).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = h.post("/store", json!({"value": 1}), true).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn records_end_to_end() {
        let h = harness().await;

        let (status, body) = h
            .post("/records", json!({"userId": "alice", "key": "color", "value": "blue"}), true)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true, "key": "color"}));

        let (status, body) = h.get("/records?userId=alice&key=color", true).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"key": "color", "value": "blue"}));

        let (status, _) = h.get("/records?userId=bob&key=color", true).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = h.get("/records?userId=alice", true).await;
        assert_eq!(status, StatusCode::OK);
        let listed = body["records"].as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["key"], "color");
        assert!(!listed[0]["ciphertext"].as_str().unwrap().contains("blue"));

        let (status, body) = h.get("/records?key=color", true).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "userId required");

        let (_, stats) = h.get("/stats", false).await;
        assert_eq!(stats["totalUsers"], 1);
        assert_eq!(stats["totalRecords"], 1);
        assert_eq!(stats["requests"]["recordWrites"], 1);
        assert_eq!(stats["requests"]["recordReads"], 3);
    }

    #[tokio::test]
    async fn unknown_routes_and_methods_answer_with_json_errors() {
        let h = harness().await;

        let (status, body) = h.get("/nope", false).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "not found"}));

        let request = Request::builder()
            .method("DELETE")
            .uri("/store")
            .body(Body::empty())
            .unwrap();
        let (status, body) = h.send(request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "method not allowed");
    }

    #[tokio::test]
    async fn malformed_record_query_is_json_bad_request() {
        let h = harness().await;
        let (status, body) = h.get("/records?userId=alice&userId=bob", true).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn relabelled_record_is_server_error_not_missing() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("records.redb");
        let h = harness_with(|state, root, _| {
            let db = RecordDatabase::open(&db_path).unwrap();
            let alice = seal(&root, b"blue", b"alice:color").unwrap();
            db.upsert("bob", "color", &alice.to_json().unwrap()).unwrap();
            state.with_records(RecordStore::new(root, db))
        })
        .await;

        let (status, body) = h.get("/records?userId=bob&key=color", true).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("blue"));
    }

    #[tokio::test]
    async fn missing_stores_are_unavailable_after_auth() {
        let h = harness_with(|state, _, _| state.with_degraded("key unavailable: test")).await;

        let (status, _) = h.get("/store", false).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = h.get("/store", true).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = h.get("/records?userId=alice&key=color", true).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = h.get("/health", false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["degraded"], json!(["key unavailable: test"]));

        let (status, stats) = h.get("/stats", false).await;
        assert_eq!(status, StatusCode::OK);
        assert!(stats.get("totalUsers").is_none());
    }

    #[tokio::test]
    async fn key_exposes_only_public_material() {
        let h = harness().await;
        let (status, body) = h.get("/key", false).await;
        assert_eq!(status, StatusCode::OK);

        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(body["publicKey"].as_str().unwrap().starts_with("0x0"));
        assert_eq!(body["signatureChain"].as_array().unwrap().len(), 2);

        let raw = h.sim.get_key("/oracle", "signing").unwrap().key;
        assert!(!body.to_string().contains(&raw));
    }

    #[tokio::test]
    async fn report_matches_its_hash() {
        let h = harness().await;
        h.post("/store", json!({"key": "a", "value": true}), true).await;
        h.post("/store", json!({"key": "b", "value": [1, 2]}), true).await;

        let (status, report) = h.get("/report", false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["type"], "tee-exit-report");
        assert_eq!(report["stats"]["kvEntries"], 2);
        assert_eq!(report["stats"]["storeWrites"], 2);

        let canonical = canonical_json(&report["stats"]).unwrap();
        assert_eq!(report["hash"], sha256_hex(&canonical));
        assert!(report["quote"].as_str().unwrap().ends_with(report["hash"].as_str().unwrap()));
    }

    #[tokio::test]
    async fn backend_outage_fails_attestation() {
        let h = harness().await;
        h.sim.set_available(false);

        let (status, body) = h.get("/report", false).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.get("quote").is_none());

        let (status, _) = h.get("/key", false).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        // Sealed storage keeps working on the key derived at startup.
        let (status, _) = h.post("/store", json!({"key": "x", "value": 1}), true).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn fetch_rejects_plain_http() {
        let h = harness().await;
        let (status, body) = h.post("/fetch", json!({"url": "http://example.com"}), true).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "url must start with https://");

        let (_, stats) = h.get("/stats", false).await;
        assert_eq!(stats["requests"]["fetchRequests"], 0);
    }

    #[tokio::test]
    async fn token_minting_is_disabled_by_default() {
        let h = harness().await;
        let (status, _) = h.post("/token", json!({}), false).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn minted_demo_token_opens_the_store() {
        let dir = TempDir::new().unwrap();
        let store_path = dir.path().join("store.enc");
        let h = harness_with(|state, root, _| {
            state
                .with_local_store(LocalStore::open(&store_path, root).unwrap())
                .with_issuer(TokenIssuer::new(SECRET))
        })
        .await;

        let request = Request::builder()
            .method("POST")
            .uri("/token")
            .body(Body::empty())
            .unwrap();
        let (status, minted) = h.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(minted["subject"].as_str().unwrap().starts_with("demo-user-"));

        let request = Request::builder()
            .method("GET")
            .uri("/store")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", minted["token"].as_str().unwrap()),
            )
            .body(Body::empty())
            .unwrap();
        let (status, body) = h.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let h = harness().await;
        let expired = TokenIssuer::new(SECRET).mint("tester", Duration::ZERO).unwrap();
        let request = Request::builder()
            .method("GET")
            .uri("/store")
            .header(header::AUTHORIZATION, format!("Bearer {}", expired.token))
            .body(Body::empty())
            .unwrap();
        let (status, body) = h.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "token_expired");
    }
}
