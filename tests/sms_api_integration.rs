//! Integration tests for the SMS REST API and both vendor clients.
//!
//! Each test spins up the service on a random port plus local stand-ins for
//! the iProgTech and Semaphore APIs. The stand-ins record every request, so
//! "no vendor call was made" is checked by an empty log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use osca_notify::config::{IProgTechConfig, SemaphoreConfig, SmsConfig};
use osca_notify::sms::{SmsDispatcher, SmsState, sms_routes};
use osca_notify::store::{LibSqlBackend, NewSenior, RecipientStore};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

// ── Vendor stand-ins ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RecordedRequest {
    path: String,
    body: Value,
}

#[derive(Clone)]
struct VendorStub {
    log: Arc<Mutex<Vec<RecordedRequest>>>,
    reply: Arc<Mutex<(StatusCode, Value)>>,
    balance: Value,
}

impl VendorStub {
    fn new(reply: Value, balance: Value) -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            reply: Arc::new(Mutex::new((StatusCode::OK, reply))),
            balance,
        }
    }

    fn set_reply(&self, status: StatusCode, body: Value) {
        *self.reply.lock().unwrap() = (status, body);
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().unwrap().clone()
    }

    fn sends(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| !r.path.contains("account"))
            .collect()
    }
}

async fn record_post(
    State(stub): State<VendorStub>,
    uri: Uri,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    stub.log.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        body,
    });
    let (status, reply) = stub.reply.lock().unwrap().clone();
    (status, Json(reply))
}

async fn record_get(
    State(stub): State<VendorStub>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    stub.log.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        body: json!(query),
    });
    Json(stub.balance.clone())
}

async fn serve(app: Router) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    port
}

async fn start_iprogtech() -> (u16, VendorStub) {
    let stub = VendorStub::new(
        json!({
            "status": 200,
            "message": "SMS successfully queued for delivery.",
            "data": {"message_id": "iSms-0001"}
        }),
        json!({"status": 200, "data": {"load_balance": 150}}),
    );
    let app = Router::new()
        .route("/api/v1/sms_messages", post(record_post))
        .route("/api/v1/sms_messages/send_bulk", post(record_post))
        .route("/api/v1/account/sms_credits", get(record_get))
        .with_state(stub.clone());
    (serve(app).await, stub)
}

async fn start_semaphore() -> (u16, VendorStub) {
    let stub = VendorStub::new(
        json!([{"message_id": 9001, "recipient": "639171234567", "status": "Pending"}]),
        json!({"account_id": 1, "account_name": "OSCA", "credit_balance": "2,500"}),
    );
    let app = Router::new()
        .route("/api/v4/messages", post(record_post))
        .route("/api/v4/account", get(record_get))
        .with_state(stub.clone());
    (serve(app).await, stub)
}

// ── Service harness ─────────────────────────────────────────────────────

struct Harness {
    port: u16,
    iprogtech: VendorStub,
    semaphore: VendorStub,
    store: Arc<LibSqlBackend>,
}

impl Harness {
    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = reqwest::Client::new()
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = reqwest::get(self.url(path)).await.unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.json().await.unwrap())
    }

    fn vendor_requests(&self) -> usize {
        self.iprogtech.requests().len() + self.semaphore.requests().len()
    }
}

fn sms_config(iprog_port: u16, sema_port: u16) -> SmsConfig {
    SmsConfig {
        default_provider: "iprogtech".into(),
        iprogtech: IProgTechConfig {
            api_token: Some(SecretString::from("iprog-token")),
            api_url: format!("http://127.0.0.1:{iprog_port}/api/v1"),
            sms_provider: 0,
        },
        semaphore: SemaphoreConfig {
            api_key: Some(SecretString::from("sema-key")),
            sender_name: "OSCA".into(),
            api_url: format!("http://127.0.0.1:{sema_port}/api/v4/messages"),
            account_url: format!("http://127.0.0.1:{sema_port}/api/v4/account"),
        },
    }
}

async fn start_service_with(config: SmsConfig, iprogtech: VendorStub, semaphore: VendorStub) -> Harness {
    let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let dispatcher = Arc::new(SmsDispatcher::from_config(&config));
    let app = sms_routes(SmsState {
        dispatcher,
        store: Some(Arc::clone(&store) as Arc<dyn RecipientStore>),
    });
    let port = serve(app).await;

    // Give the servers a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    Harness {
        port,
        iprogtech,
        semaphore,
        store,
    }
}

async fn start_service() -> Harness {
    let (iport, iprogtech) = start_iprogtech().await;
    let (sport, semaphore) = start_semaphore().await;
    start_service_with(sms_config(iport, sport), iprogtech, semaphore).await
}

fn senior(first: &str, last: &str, barangay: &str, phone: &str) -> NewSenior {
    NewSenior {
        first_name: first.into(),
        last_name: last.into(),
        barangay: barangay.into(),
        contact_number: Some(phone.into()),
        ..Default::default()
    }
}

// ── Send: validation ────────────────────────────────────────────────────

#[tokio::test]
async fn send_with_no_recipients_is_rejected_without_vendor_call() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;

        let (status, body) = h
            .post("/api/sms/send", json!({"recipients": [], "message": "hello"}))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "EMPTY_RECIPIENTS");
        assert_eq!(h.vendor_requests(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn send_with_only_invalid_numbers_is_rejected_without_vendor_call() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;

        let (status, body) = h
            .post(
                "/api/sms/send",
                json!({"recipients": ["not-a-number"], "message": "hello"}),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "INVALID_NUMBERS");
        assert_eq!(body["dropped"], 1);
        assert_eq!(h.vendor_requests(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn send_with_blank_message_is_rejected() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;

        let (status, body) = h
            .post(
                "/api/sms/send",
                json!({"recipients": ["09171234567"], "message": "  "}),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "EMPTY_MESSAGE");
        assert_eq!(h.vendor_requests(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn send_with_mistyped_body_is_rejected_as_json() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;

        for bad in [
            json!({"recipients": [9171234567u64], "message": "hi"}),
            json!({"recipients": "09171234567", "message": "hi"}),
            json!({"recipients": ["09171234567"], "message": null}),
        ] {
            let (status, body) = h.post("/api/sms/send", bad).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "INVALID_REQUEST");
            assert!(!body["message"].as_str().unwrap().is_empty());
        }
        assert_eq!(h.vendor_requests(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn announce_with_mistyped_body_is_rejected_as_json() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;

        let (status, body) = h
            .post("/api/sms/announce", json!({"title": 42, "barangay": []}))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_REQUEST");
        assert_eq!(h.vendor_requests(), 0);
    })
    .await
    .expect("test timed out");
}

// ── Send: iProgTech ─────────────────────────────────────────────────────

#[tokio::test]
async fn iprogtech_single_send_uses_single_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;

        let (status, body) = h
            .post(
                "/api/sms/send",
                json!({"recipients": [{"number": "0917-123-4567"}], "message": "Payout on Friday"}),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["messageId"], "iSms-0001");
        assert_eq!(body["credits"], 150.0);
        assert_eq!(body["provider"], "iprogtech");

        let sends = h.iprogtech.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].path, "/api/v1/sms_messages");
        assert_eq!(sends[0].body["api_token"], "iprog-token");
        assert_eq!(sends[0].body["phone_number"], "639171234567");
        assert_eq!(sends[0].body["message"], "Payout on Friday");
        assert_eq!(sends[0].body["sms_provider"], 0);

        // Balance lookup follows a successful send.
        let balance_calls: Vec<_> = h
            .iprogtech
            .requests()
            .into_iter()
            .filter(|r| r.path == "/api/v1/account/sms_credits")
            .collect();
        assert_eq!(balance_calls.len(), 1);
        assert_eq!(balance_calls[0].body["api_token"], "iprog-token");
        assert!(h.semaphore.requests().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn iprogtech_multi_send_uses_bulk_endpoint_and_drops_invalid() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;

        let (status, body) = h
            .post(
                "/api/sms/send",
                json!({
                    "recipients": ["09171234567", "12345", {"number": "9181234567", "name": "Lolo Ben"}],
                    "message": "Medical mission tomorrow"
                }),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["sentTo"], 2);
        assert_eq!(body["dropped"], 1);

        let sends = h.iprogtech.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].path, "/api/v1/sms_messages/send_bulk");
        assert_eq!(sends[0].body["phone_number"], "639171234567,639181234567");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn iprogtech_reported_failure_surfaces_vendor_message() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;
        h.iprogtech.set_reply(
            StatusCode::OK,
            json!({"status": 500, "message": "Insufficient SMS credits"}),
        );

        let (status, body) = h
            .post(
                "/api/sms/send",
                json!({"recipients": ["09171234567"], "message": "hello"}),
            )
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "PROVIDER_ERROR");
        assert!(body["message"].as_str().unwrap().contains("Insufficient SMS credits"));
        assert!(body.get("messageId").is_none());
    })
    .await
    .expect("test timed out");
}

// ── Send: Semaphore ─────────────────────────────────────────────────────

#[tokio::test]
async fn semaphore_send_returns_message_id() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;

        let (status, body) = h
            .post(
                "/api/sms/send",
                json!({
                    "recipients": ["09171234567", "09181234567"],
                    "message": "Hello from OSCA",
                    "provider": "semaphore"
                }),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["messageId"], "9001");
        assert_eq!(body["provider"], "semaphore");

        let sends = h.semaphore.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].path, "/api/v4/messages");
        assert_eq!(sends[0].body["apikey"], "sema-key");
        assert_eq!(sends[0].body["number"], "639171234567,639181234567");
        assert_eq!(sends[0].body["sendername"], "OSCA");
        assert!(h.iprogtech.requests().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn semaphore_without_message_id_is_failure() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;
        h.semaphore.set_reply(
            StatusCode::OK,
            json!({"sendername": ["The selected sendername is invalid."]}),
        );

        let (status, body) = h
            .post(
                "/api/sms/send",
                json!({"recipients": ["09171234567"], "message": "hi", "provider": "semaphore"}),
            )
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .contains("The selected sendername is invalid.")
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn semaphore_http_error_is_failure() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;
        h.semaphore.set_reply(
            StatusCode::UNAUTHORIZED,
            json!({"message": "Invalid API key"}),
        );

        let (status, body) = h
            .post(
                "/api/sms/send",
                json!({"recipients": ["09171234567"], "message": "hi", "provider": "semaphore"}),
            )
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "PROVIDER_ERROR");
        assert!(body["message"].as_str().unwrap().contains("Invalid API key"));
    })
    .await
    .expect("test timed out");
}

// ── Send: configuration and transport ───────────────────────────────────

#[tokio::test]
async fn missing_credential_is_config_error() {
    timeout(TEST_TIMEOUT, async {
        let (iport, iprogtech) = start_iprogtech().await;
        let (sport, semaphore) = start_semaphore().await;
        let mut config = sms_config(iport, sport);
        config.semaphore.api_key = None;
        let h = start_service_with(config, iprogtech, semaphore).await;

        let (status, body) = h
            .post(
                "/api/sms/send",
                json!({"recipients": ["09171234567"], "message": "hi", "provider": "semaphore"}),
            )
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "PROVIDER_NOT_CONFIGURED");
        assert!(body["message"].as_str().unwrap().contains("semaphore"));
        assert_eq!(h.vendor_requests(), 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unreachable_vendor_is_network_error() {
    timeout(TEST_TIMEOUT, async {
        // Reserve a port, then close it so connections are refused.
        let closed_port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let (_, iprogtech) = start_iprogtech().await;
        let (sport, semaphore) = start_semaphore().await;
        let h = start_service_with(sms_config(closed_port, sport), iprogtech, semaphore).await;

        let (status, body) = h
            .post(
                "/api/sms/send",
                json!({"recipients": ["09171234567"], "message": "hi"}),
            )
            .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "NETWORK_ERROR");
    })
    .await
    .expect("test timed out");
}

// ── Announcements ───────────────────────────────────────────────────────

#[tokio::test]
async fn announcement_goes_to_active_seniors_in_barangay() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;
        let mut with_emergency = senior("Remedios", "Santos", "San Isidro", "09170000001");
        with_emergency.emergency_contact_number = Some("09189999999".into());
        h.store.insert_senior(&with_emergency).await.unwrap();
        h.store
            .insert_senior(&senior("Pedro", "Reyes", "San Isidro", "09170000002"))
            .await
            .unwrap();
        h.store
            .insert_senior(&senior("Ana", "Cruz", "Poblacion", "09170000003"))
            .await
            .unwrap();

        let (status, body) = h
            .post(
                "/api/sms/announce",
                json!({
                    "title": "Social Pension Payout",
                    "description": "Bring your OSCA ID to the barangay hall.",
                    "date": "October 25, 2026",
                    "barangay": "San Isidro"
                }),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["sentTo"], 2);

        let sends = h.iprogtech.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].path, "/api/v1/sms_messages/send_bulk");
        // Ordered by last name: Reyes, then Santos (emergency number wins).
        assert_eq!(sends[0].body["phone_number"], "639170000002,639189999999");
        let message = sends[0].body["message"].as_str().unwrap();
        assert!(message.contains("Social Pension Payout"));
        assert!(message.contains("Bring your OSCA ID to the barangay hall."));
        assert!(message.contains("Date: October 25, 2026"));
        assert!(!message.contains("Location:"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn announcement_with_no_matching_seniors_is_rejected() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;

        let (status, body) = h
            .post(
                "/api/sms/announce",
                json!({"title": "t", "description": "d", "barangay": "Nowhere"}),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "EMPTY_RECIPIENTS");
        assert_eq!(h.vendor_requests(), 0);
    })
    .await
    .expect("test timed out");
}

// ── Birthdays ───────────────────────────────────────────────────────────

#[tokio::test]
async fn birthday_greetings_are_personalised() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;
        let mut nena = senior("Nena", "Aquino", "Poblacion", "09171111111");
        nena.birth_date = NaiveDate::from_ymd_opt(1945, 10, 18);
        h.store.insert_senior(&nena).await.unwrap();
        let mut ben = senior("Ben", "Aquino", "Poblacion", "09172222222");
        ben.birth_date = NaiveDate::from_ymd_opt(1950, 1, 2);
        h.store.insert_senior(&ben).await.unwrap();

        let (status, body) = h
            .post("/api/sms/birthdays", json!({"date": "2026-10-18"}))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["celebrants"], 1);
        assert_eq!(body["sent"], 1);
        assert_eq!(body["failed"], 0);

        let sends = h.iprogtech.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].body["phone_number"], "639171111111");
        assert!(
            sends[0].body["message"]
                .as_str()
                .unwrap()
                .contains("Happy 81st birthday, Nena Aquino!")
        );
    })
    .await
    .expect("test timed out");
}

// ── Balance, preview, health ────────────────────────────────────────────

#[tokio::test]
async fn balance_reads_semaphore_account() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;

        let (status, body) = h.get("/api/sms/balance?provider=semaphore").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["credits"], 2500.0);

        let requests = h.semaphore.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, "/api/v4/account");
        assert_eq!(requests[0].body["apikey"], "sema-key");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn balance_defaults_to_iprogtech() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;

        let (status, body) = h.get("/api/sms/balance").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"], "iprogtech");
        assert_eq!(body["credits"], 150.0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn preview_reports_segments_and_truncation() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;

        let (status, body) = h
            .post("/api/sms/preview", json!({"message": "a".repeat(161)}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["info"]["length"], 161);
        assert_eq!(body["info"]["smsCount"], 2);
        assert_eq!(body["info"]["isValid"], true);
        assert_eq!(body["truncated"], false);

        let (_, body) = h
            .post("/api/sms/preview", json!({"message": "b".repeat(1700)}))
            .await;
        assert_eq!(body["info"]["isValid"], false);
        assert_eq!(body["truncated"], true);
        let message = body["message"].as_str().unwrap();
        assert_eq!(message.chars().count(), 1600);
        assert!(message.ends_with("..."));

        let (_, body) = h.post("/api/sms/preview", json!({"message": ""})).await;
        assert_eq!(body["info"], json!({"length": 0, "smsCount": 0, "isValid": false}));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn health_lists_configured_providers() {
    timeout(TEST_TIMEOUT, async {
        let h = start_service().await;

        let (status, body) = h.get("/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "osca-notify");
        assert_eq!(body["defaultProvider"], "iprogtech");
        assert_eq!(body["providers"], json!(["iprogtech", "semaphore"]));
    })
    .await
    .expect("test timed out");
}
