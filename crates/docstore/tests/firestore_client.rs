//! Firestore client tests against a local server standing in for Google's
//! token endpoint and the Firestore REST API.

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::post,
};
use docstore::{
    AuthenticationError, DocumentStore, Fields, FirestoreConfig, WriteError, connect,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const TEST_KEY_PEM: &str = include_str!("fixtures/test_key.pem");
const ISSUED_TOKEN: &str = "ya29.test-access-token";

#[derive(Debug, Clone)]
struct ReceivedDocument {
    project: String,
    database: String,
    collection: String,
    document_id: Option<String>,
    authorization: Option<String>,
    body: Value,
}

struct FakeGoogle {
    reject_token: AtomicBool,
    expires_in: AtomicI64,
    reject_writes: bool,
    token_requests: Mutex<Vec<HashMap<String, String>>>,
    documents: Mutex<Vec<ReceivedDocument>>,
}

impl Default for FakeGoogle {
    fn default() -> Self {
        Self {
            reject_token: AtomicBool::new(false),
            expires_in: AtomicI64::new(3599),
            reject_writes: false,
            token_requests: Mutex::new(Vec::new()),
            documents: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGoogle {
    fn token_request_count(&self) -> usize {
        self.token_requests.lock().unwrap().len()
    }

    fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }
}

async fn token(
    State(state): State<Arc<FakeGoogle>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_requests.lock().unwrap().push(form);
    if state.reject_token.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Invalid JWT Signature."})),
        )
            .into_response();
    }
    Json(json!({
        "access_token": ISSUED_TOKEN,
        "expires_in": state.expires_in.load(Ordering::SeqCst),
        "token_type": "Bearer"
    }))
    .into_response()
}

async fn create_document(
    State(state): State<Arc<FakeGoogle>>,
    Path((project, database, collection)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if state.reject_writes {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {
                "code": 403,
                "message": "Missing or insufficient permissions.",
                "status": "PERMISSION_DENIED"
            }})),
        )
            .into_response();
    }

    let document_id = query.get("documentId").cloned();
    let name = format!(
        "projects/{project}/databases/{database}/documents/{collection}/{}",
        document_id.clone().unwrap_or_else(|| "serverAssignedId".to_string())
    );
    let fields = body.get("fields").cloned().unwrap_or(Value::Null);

    state.documents.lock().unwrap().push(ReceivedDocument {
        project,
        database,
        collection,
        document_id,
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    Json(json!({
        "name": name,
        "fields": fields,
        "createTime": "2025-01-01T00:00:00.000000Z",
        "updateTime": "2025-01-01T00:00:00.000000Z"
    }))
    .into_response()
}

async fn spawn_fake_google(state: Arc<FakeGoogle>) -> SocketAddr {
    let app = Router::new()
        .route("/token", post(token))
        .route(
            "/v1/projects/{project}/databases/{database}/documents/{collection}",
            post(create_document),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });
    addr
}

/// Writes a service account key whose token endpoint is the fake server.
fn write_key_file(dir: &TempDir, addr: SocketAddr) -> std::path::PathBuf {
    let key = json!({
        "type": "service_account",
        "project_id": "hospital-management",
        "private_key_id": "test-key-id",
        "private_key": TEST_KEY_PEM,
        "client_email": "seeder@hospital-management.iam.gserviceaccount.com",
        "client_id": "1234567890",
        "token_uri": format!("http://{addr}/token")
    });
    let path = dir.path().join("serviceAccountKey.json");
    std::fs::write(&path, serde_json::to_string_pretty(&key).unwrap())
        .expect("Failed to write key file");
    path
}

fn config_for(addr: SocketAddr) -> FirestoreConfig {
    FirestoreConfig {
        base_url: Some(format!("http://{addr}")),
        ..FirestoreConfig::default()
    }
}

fn doctor(name: &str, specialty: &str) -> Fields {
    Fields::from([
        ("name".to_string(), name.to_string()),
        ("specialty".to_string(), specialty.to_string()),
    ])
}

#[tokio::test]
async fn test_service_account_flow_creates_documents() {
    let state = Arc::new(FakeGoogle::default());
    let addr = spawn_fake_google(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let key_path = write_key_file(&dir, addr);

    let client = connect(&key_path, &config_for(addr))
        .await
        .expect("connect failed");
    assert_eq!(client.project_id(), "hospital-management");

    {
        let requests = state.token_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].get("grant_type").map(String::as_str),
            Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
        );
        let assertion = requests[0].get("assertion").expect("no assertion");
        let header = jsonwebtoken::decode_header(assertion).expect("assertion is not a JWT");
        assert_eq!(header.alg, jsonwebtoken::Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("test-key-id"));
    }

    let first = client
        .create_record("doctors", &doctor("Dr. John Smith", "General Medicine"))
        .await
        .expect("first write failed");
    let second = client
        .create_record("doctors", &doctor("Dr. Alice Brown", "Cardiology"))
        .await
        .expect("second write failed");

    let documents = state.documents.lock().unwrap().clone();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].project, "hospital-management");
    assert_eq!(documents[0].database, "(default)");
    assert_eq!(documents[0].collection, "doctors");
    assert_eq!(documents[0].document_id.as_deref(), Some(first.as_str()));
    assert_eq!(documents[1].document_id.as_deref(), Some(second.as_str()));
    assert_eq!(
        documents[0].authorization.as_deref(),
        Some(format!("Bearer {ISSUED_TOKEN}").as_str())
    );
    assert_eq!(
        documents[1].body,
        json!({"fields": {
            "name": {"stringValue": "Dr. Alice Brown"},
            "specialty": {"stringValue": "Cardiology"}
        }})
    );

    // The cached token is reused for later writes.
    assert_eq!(state.token_requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejected_credential_fails_connect() {
    let state = Arc::new(FakeGoogle {
        reject_token: AtomicBool::new(true),
        ..FakeGoogle::default()
    });
    let addr = spawn_fake_google(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let key_path = write_key_file(&dir, addr);

    let err = connect(&key_path, &config_for(addr)).await.err().unwrap();
    match err {
        AuthenticationError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("invalid_grant"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(state.documents.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_write_surfaces_status() {
    let state = Arc::new(FakeGoogle {
        reject_writes: true,
        ..FakeGoogle::default()
    });
    let addr = spawn_fake_google(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let key_path = write_key_file(&dir, addr);

    let client = connect(&key_path, &config_for(addr)).await.unwrap();
    let err = client
        .create_record("users", &doctor("Dr. John Smith", "General Medicine"))
        .await
        .unwrap_err();

    match err {
        WriteError::Rejected { status, message } => {
            assert_eq!(status, 403);
            assert!(message.starts_with("PERMISSION_DENIED"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_emulator_skips_credentials() {
    let state = Arc::new(FakeGoogle::default());
    let addr = spawn_fake_google(state.clone()).await;
    let config = FirestoreConfig {
        project_id: Some("demo-hospital".to_string()),
        emulator_host: Some(addr.to_string()),
        ..FirestoreConfig::default()
    };

    let client = connect("/nonexistent/serviceAccountKey.json", &config)
        .await
        .expect("emulator connect failed");
    client
        .create_record("doctors", &doctor("Dr. Emily Chen", "Pediatrics"))
        .await
        .unwrap();

    assert!(state.token_requests.lock().unwrap().is_empty());
    let documents = state.documents.lock().unwrap().clone();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].project, "demo-hospital");
    assert_eq!(documents[0].authorization.as_deref(), Some("Bearer owner"));
}

#[tokio::test]
async fn test_collection_name_is_escaped_in_path() {
    let state = Arc::new(FakeGoogle::default());
    let addr = spawn_fake_google(state.clone()).await;
    let config = FirestoreConfig {
        project_id: Some("demo-hospital".to_string()),
        emulator_host: Some(addr.to_string()),
        ..FirestoreConfig::default()
    };
    let client = connect("/nonexistent/serviceAccountKey.json", &config)
        .await
        .unwrap();

    client
        .create_record("doctors#archive", &doctor("Dr. David Lee", "Neurology"))
        .await
        .unwrap();
    client
        .create_record("doctors?page=2", &doctor("Dr. Fatima Noor", "Psychiatry"))
        .await
        .unwrap();

    let collections: Vec<String> = state
        .documents
        .lock()
        .unwrap()
        .iter()
        .map(|d| d.collection.clone())
        .collect();
    assert_eq!(collections, vec!["doctors#archive", "doctors?page=2"]);
}

#[tokio::test]
async fn test_empty_collection_name_rejected_without_request() {
    let state = Arc::new(FakeGoogle::default());
    let addr = spawn_fake_google(state.clone()).await;
    let config = FirestoreConfig {
        project_id: Some("demo-hospital".to_string()),
        emulator_host: Some(addr.to_string()),
        ..FirestoreConfig::default()
    };
    let client = connect("unused.json", &config).await.unwrap();

    let err = client
        .create_record("", &doctor("Dr. David Lee", "Neurology"))
        .await
        .unwrap_err();

    assert!(matches!(err, WriteError::InvalidCollection(_)));
    assert_eq!(state.document_count(), 0);
}

#[tokio::test]
async fn test_short_lived_token_is_refetched_before_each_write() {
    let state = Arc::new(FakeGoogle::default());
    // Inside the 60 second margin, so never considered fresh.
    state.expires_in.store(30, Ordering::SeqCst);
    let addr = spawn_fake_google(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let key_path = write_key_file(&dir, addr);

    let client = connect(&key_path, &config_for(addr)).await.unwrap();
    assert_eq!(state.token_request_count(), 1);

    client
        .create_record("doctors", &doctor("Dr. John Smith", "General Medicine"))
        .await
        .unwrap();
    assert_eq!(state.token_request_count(), 2);
    assert_eq!(state.document_count(), 1);

    // The refresh before the next write is rejected.
    state.reject_token.store(true, Ordering::SeqCst);
    let err = client
        .create_record("doctors", &doctor("Dr. Alice Brown", "Cardiology"))
        .await
        .unwrap_err();

    match err {
        WriteError::Unauthorized(AuthenticationError::Rejected { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.contains("invalid_grant"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(state.token_request_count(), 3);
    assert_eq!(state.document_count(), 1);
}

#[tokio::test]
async fn test_oversized_expires_in_is_tolerated() {
    let state = Arc::new(FakeGoogle::default());
    state.expires_in.store(i64::MAX, Ordering::SeqCst);
    let addr = spawn_fake_google(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let key_path = write_key_file(&dir, addr);

    let client = connect(&key_path, &config_for(addr))
        .await
        .expect("connect failed");
    client
        .create_record("doctors", &doctor("Dr. Ahmed Hassan", "Radiology"))
        .await
        .unwrap();

    // Clamped to a day, so the first token is still cached.
    assert_eq!(state.token_request_count(), 1);
    assert_eq!(state.document_count(), 1);
}
