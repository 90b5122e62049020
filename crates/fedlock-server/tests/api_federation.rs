use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use fedlock_crypto::{checksum, encrypt_value, open, seal, test_keys};
use fedlock_crypto::{FederationPrivateKey, FederationPublicKey};
use fedlock_federation::{
    Collaborators, ConfigClient, ContentStore, FederationEngine, FederationSettings, KeyService,
    LicenseClient, MemoryFederationCache, ServiceError, SrvLookupError, SrvResolver,
};
use fedlock_server::{app, AppState};
use fedlock_types::{
    ContentPostObject, FederationDirectoryConfig, KeyField, SrvTarget, UserKeyData,
    FEDERATION_CHECKSUM_HEADER,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

// --- stub collaborators ---

struct NodeServices {
    private_key: String,
    directory: String,
    stored: Mutex<Vec<ContentPostObject>>,
}

impl NodeServices {
    fn new(private_key: String, directory: String) -> Arc<Self> {
        Arc::new(Self {
            private_key,
            directory,
            stored: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LicenseClient for NodeServices {
    async fn private_key(&self) -> Result<String, ServiceError> {
        Ok(self.private_key.clone())
    }

    async fn license_checksum(&self) -> Result<String, ServiceError> {
        Ok("license-sum".to_string())
    }
}

#[async_trait]
impl ConfigClient for NodeServices {
    async fn federation_config(&self) -> Result<FederationDirectoryConfig, ServiceError> {
        Ok(FederationDirectoryConfig {
            public_federation_service: self.directory.clone(),
        })
    }
}

#[async_trait]
impl ContentStore for NodeServices {
    async fn create_content_from_federation(
        &self,
        content: &ContentPostObject,
    ) -> Result<(), ServiceError> {
        self.stored.lock().unwrap().push(content.clone());
        Ok(())
    }

    async fn load_content_from_federation(&self, checksum: &str) -> Result<Value, ServiceError> {
        match checksum {
            "c1" => Ok(json!({ "checksum": "c1", "data": "blob" })),
            _ => Err(ServiceError::new("content", "not found")),
        }
    }
}

#[async_trait]
impl KeyService for NodeServices {
    async fn load_users_key_by_email(&self, email: &str) -> Result<UserKeyData, ServiceError> {
        match email {
            "bob@peer.example" => Ok(UserKeyData(json!({ "publicKey": "bob-key" }))),
            _ => Err(ServiceError::new("key", "unknown user")),
        }
    }
}

struct FixedResolver(Option<SrvTarget>);

#[async_trait]
impl SrvResolver for FixedResolver {
    async fn lookup_srv(&self, name: &str) -> Result<Vec<SrvTarget>, SrvLookupError> {
        self.0.clone().map(|t| vec![t]).ok_or_else(|| SrvLookupError {
            name: name.to_string(),
            message: "NXDOMAIN".to_string(),
        })
    }
}

// --- helpers ---

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn engine(services: Arc<NodeServices>, resolver: FixedResolver) -> FederationEngine {
    FederationEngine::new(
        FederationSettings {
            peer_scheme: "http".into(),
            directory_scheme: "http".into(),
            ..FederationSettings::default()
        },
        Collaborators {
            license: services.clone(),
            config: services.clone(),
            content: services.clone(),
            keys: services,
        },
        Arc::new(MemoryFederationCache::new(None)),
        Arc::new(resolver),
    )
    .unwrap()
}

/// Directory that lists `peer.example` under the peer's public key. The
/// directory's own key pair is the home pair.
async fn serve_directory() -> SocketAddr {
    let router = Router::new()
        .route(
            "/api/v1/publickey",
            get(|| async { Json(json!({ "publickey": test_keys::home().public_key })) }),
        )
        .route(
            "/api/v1/federation",
            post(|Json(body): Json<Value>| async move {
                let key = FederationPrivateKey::from_encoded(&test_keys::home().private_key).unwrap();
                let plain: Value = open(&key, body.as_object().unwrap()).unwrap();
                if plain["domain"] == "peer.example" {
                    Json(json!([{ "domain": "peer.example", "publicKey": test_keys::peer().public_key }]))
                } else {
                    Json(json!([]))
                }
            }),
        );
    serve(router).await
}

async fn call(router: &Router, uri: &str, body: Value, checksum: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(sum) = checksum {
        request = request.header(FEDERATION_CHECKSUM_HEADER, sum);
    }
    let response = router
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
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

fn peer_router() -> (Router, Arc<NodeServices>) {
    let services = NodeServices::new(test_keys::peer().private_key, "unused".into());
    let router = app(AppState {
        engine: engine(services.clone(), FixedResolver(None)),
    });
    (router, services)
}

fn peer_public_key() -> FederationPublicKey {
    FederationPublicKey::from_encoded(&test_keys::peer().public_key).unwrap()
}

// --- tests ---

#[tokio::test]
async fn health_check_returns_ok() {
    let (router, _) = peer_router();
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn community_post_is_relayed_and_ingested_by_peer() {
    let (peer_router, peer_services) = peer_router();
    let peer_addr = serve(peer_router).await;
    let directory_addr = serve_directory().await;

    let home_services = NodeServices::new(test_keys::home().private_key, directory_addr.to_string());
    let home = app(AppState {
        engine: engine(
            home_services,
            FixedResolver(Some(SrvTarget::new("127.0.0.1", peer_addr.port()))),
        ),
    });

    let key = "k".repeat(600);
    let (status, body) = call(
        &home,
        "/federation/content/community",
        json!({
            "checksum": "c1",
            "key": key,
            "domain": "peer.example",
            "sendingDomain": "home.example",
            "liveTime": 60
        }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let stored = peer_services.stored.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].key, KeyField::Single(key));
    assert_eq!(stored[0].domain.as_deref(), Some("home.example"));
    assert_eq!(stored[0].live_time, Some(60));
}

#[tokio::test]
async fn content_request_is_delivered_by_peer() {
    let (peer_router, _) = peer_router();
    let peer_addr = serve(peer_router).await;
    let directory_addr = serve_directory().await;

    let home = app(AppState {
        engine: engine(
            NodeServices::new(test_keys::home().private_key, directory_addr.to_string()),
            FixedResolver(Some(SrvTarget::new("127.0.0.1", peer_addr.port()))),
        ),
    });

    let (status, body) = call(
        &home,
        "/federation/content/request",
        json!({ "checksum": "c1", "domain": "peer.example" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"], "blob");

    let (status, body) = call(
        &home,
        "/federation/remote",
        json!({ "email": "bob@peer.example" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["publicKey"], "bob-key");
}

#[tokio::test]
async fn peer_routes_require_matching_checksum() {
    let (router, services) = peer_router();
    let post = ContentPostObject {
        checksum: "c1".into(),
        key: KeyField::Single(String::new()),
        domain: Some("peer.example".into()),
        sending_domain: "home.example".into(),
        live_time: None,
        max_open: None,
    };
    let envelope = Value::Object(seal(&peer_public_key(), &post).unwrap());

    let (status, body) = call(&router, "/api/v1/federation/content", envelope.clone(), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "AUTHENTICATION_ERROR");

    let (status, _) = call(
        &router,
        "/federation/remote/content",
        envelope.clone(),
        Some("0000"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(services.stored.lock().unwrap().is_empty());

    let sum = checksum(&envelope);
    let (status, body) = call(&router, "/federation/remote/content", envelope, Some(&sum)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
    assert_eq!(services.stored.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn user_route_decrypts_email() {
    let (router, _) = peer_router();
    let body = json!({
        "encryptedEmail": encrypt_value(&peer_public_key(), "bob@peer.example").unwrap(),
        "encryptedDomain": encrypt_value(&peer_public_key(), "peer.example").unwrap(),
    });
    let sum = checksum(&body);
    let (status, keys) = call(&router, "/federation/user", body, Some(&sum)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(keys["publicKey"], "bob-key");
}

#[tokio::test]
async fn validate_route_answers_200_or_403() {
    let (router, _) = peer_router();
    let inner = json!({ "checksum": "abc", "domain": "def" });

    let (status, _) = call(
        &router,
        "/federation/validate",
        json!({ "checksum": checksum(&inner), "body": inner }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &router,
        "/federation/validate",
        json!({ "checksum": "deadbeef", "body": inner }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "AUTHENTICATION_ERROR");
}

#[tokio::test]
async fn lookup_without_srv_record_is_404() {
    let (router, _) = peer_router();
    let (status, body) = call(
        &router,
        "/federation/lookup",
        json!({ "domain": "nowhere.example" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let router = app(AppState {
        engine: engine(
            NodeServices::new(test_keys::home().private_key, "unused".into()),
            FixedResolver(Some(SrvTarget::new("fed.peer.example", 8443))),
        ),
    });
    let (status, body) = call(
        &router,
        "/federation/lookup",
        json!({ "domain": "peer.example" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["target"], "fed.peer.example");
    assert_eq!(body[0]["port"], 8443);
}

#[tokio::test]
async fn post_without_domain_is_a_validation_error() {
    let (router, _) = peer_router();
    let (status, body) = call(
        &router,
        "/federation/content",
        json!({ "checksum": "c1", "key": "k1", "sendingDomain": "home.example" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
