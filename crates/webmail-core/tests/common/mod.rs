//! In-process mail server for controller tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use futures::channel::oneshot;
use serde_json::{Value, json};
use webmail_core::{
    ApiRequest, ApiResponse, ClientConfig, Email, KeySummary, MemorySurface, Method, Transport,
    ViewController, WebmailError, WebmailResult,
};

pub const ME: &str = "me@mail.test";
pub const PASSPHRASE: &str = "correct horse";
pub const SECRET_BODY: &str = "Meet at the usual place.";

#[derive(Debug, Default)]
struct State {
    emails: Vec<Email>,
    keys: Vec<KeySummary>,
    key_details: HashMap<String, Value>,
    requests: Vec<ApiRequest>,
    held: HashMap<String, oneshot::Receiver<()>>,
    offline: bool,
    fail_mark_read: bool,
    generate_error: Option<String>,
}

/// Answers the endpoints the frontend uses, from memory.
#[derive(Debug, Default)]
pub struct FakeServer {
    state: RefCell<State>,
}

pub fn email(id: i64, sender: &str, recipients: &[&str], subject: &str, body: &str) -> Email {
    Email {
        id,
        sender: sender.to_string(),
        recipients: recipients.iter().map(ToString::to_string).collect(),
        subject: subject.to_string(),
        body: body.to_string(),
        timestamp: "Jan 02 2024, 10:30 AM".to_string(),
        read: false,
        archived: false,
        encrypted: false,
    }
}

impl FakeServer {
    /// A mailbox with one plain, one encrypted, one sent and one archived message.
    pub fn seeded() -> Self {
        let server = Self::default();
        {
            let mut state = server.state.borrow_mut();
            state.emails = vec![
                email(1, "alice@mail.test", &[ME], "Lunch?", "Are you free at noon?"),
                Email {
                    encrypted: true,
                    ..email(2, "bob@mail.test", &[ME], "Plans", "-----BEGIN PGP MESSAGE-----")
                },
                email(3, ME, &["alice@mail.test"], "Re: Lunch?", "Sure."),
                Email {
                    archived: true,
                    read: true,
                    ..email(4, "carol@mail.test", &[ME], "Old news", "Nothing new.")
                },
            ];
            state.keys = vec![KeySummary {
                key_id: "K1".to_string(),
                expire_date: "Never".to_string(),
                encrypt: true,
                sign: true,
                key_size: Some(2048),
                default_key: true,
                created: "Jan 01 2024".to_string(),
            }];
            state.key_details.insert(
                "K1".to_string(),
                json!({"key_id": "K1", "key_size": 2048, "private_key": true}),
            );
        }
        server
    }

    pub fn push_email(&self, email: Email) {
        self.state.borrow_mut().emails.push(email);
    }

    pub fn email(&self, id: i64) -> Option<Email> {
        self.state.borrow().emails.iter().find(|e| e.id == id).cloned()
    }

    pub fn key_ids(&self) -> Vec<String> {
        self.state.borrow().keys.iter().map(|k| k.key_id.clone()).collect()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.borrow().requests.clone()
    }

    pub fn count(&self, method: Method, path: &str, body: Option<Value>) -> usize {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path && (body.is_none() || r.body == body))
            .count()
    }

    pub fn clear_requests(&self) {
        self.state.borrow_mut().requests.clear();
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    pub fn fail_mark_read(&self) {
        self.state.borrow_mut().fail_mark_read = true;
    }

    pub fn reject_generate(&self, message: &str) {
        self.state.borrow_mut().generate_error = Some(message.to_string());
    }

    /// Hold the next request for `path` until the returned sender fires.
    pub fn hold(&self, path: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.borrow_mut().held.insert(path.to_string(), rx);
        tx
    }

    fn route(&self, request: &ApiRequest) -> ApiResponse {
        let mut state = self.state.borrow_mut();
        let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();
        let body = request.body.clone().unwrap_or(Value::Null);

        match (request.method, segments.as_slice()) {
            (Method::Get, ["emails", "inbox"]) => list(&state.emails, |e| {
                e.recipients.iter().any(|r| r == ME) && !e.archived
            }),
            (Method::Get, ["emails", "sent"]) => list(&state.emails, |e| e.sender == ME),
            (Method::Get, ["emails", "archive"]) => list(&state.emails, |e| {
                e.recipients.iter().any(|r| r == ME) && e.archived
            }),
            (Method::Get, ["emails", id]) => match find(&state.emails, id) {
                Some(email) => ok(&json!(email)),
                None => error(404, "Email not found."),
            },
            (Method::Put, ["emails", id]) => {
                if body.get("read").is_some() && state.fail_mark_read {
                    return ApiResponse::new(500, "");
                }
                let Some(email) = id
                    .parse::<i64>()
                    .ok()
                    .and_then(|id| state.emails.iter_mut().find(|e| e.id == id))
                else {
                    return error(404, "Email not found.");
                };
                if let Some(read) = body.get("read").and_then(Value::as_bool) {
                    email.read = read;
                }
                if let Some(archived) = body.get("archived").and_then(Value::as_bool) {
                    email.archived = archived;
                }
                ApiResponse::new(204, "")
            }
            (Method::Post, ["emails"]) => {
                let recipients = body["recipients"].as_str().unwrap_or_default().to_string();
                if let Some(unknown) = recipients
                    .split(", ")
                    .find(|r| r.starts_with("nobody"))
                {
                    return error(400, &format!("User with email {unknown} does not exist."));
                }
                let id = state.emails.iter().map(|e| e.id).max().unwrap_or(0) + 1;
                let recipients: Vec<&str> = recipients.split(", ").collect();
                state.emails.push(email(
                    id,
                    ME,
                    &recipients,
                    body["subject"].as_str().unwrap_or_default(),
                    body["body"].as_str().unwrap_or_default(),
                ));
                ApiResponse::new(201, json!({"message": "Email sent successfully."}).to_string())
            }
            (Method::Post, ["emails", "decrypt", id]) => {
                if body["passphrase"] != PASSPHRASE {
                    return error(400, "Invalid passphrase");
                }
                match find(&state.emails, id) {
                    Some(mut email) => {
                        email.body = SECRET_BODY.to_string();
                        ok(&json!({ "data": email }))
                    }
                    None => error(404, "Email not found."),
                }
            }
            (Method::Get, ["api", "security", "keys"]) => ok(&json!(state.keys)),
            (Method::Get, ["api", "security", "keys", id]) => match state.key_details.get(*id) {
                Some(detail) => ok(detail),
                None => error(404, "Key not found."),
            },
            (Method::Delete, ["api", "security", "keys", id]) => {
                let before = state.keys.len();
                state.keys.retain(|k| k.key_id != *id);
                if state.keys.len() == before {
                    return error(404, "Key not found.");
                }
                ok(&json!({"message": "Key deleted."}))
            }
            (Method::Post, ["api", "security", "generate"]) => {
                if let Some(message) = state.generate_error.take() {
                    return error(400, &message);
                }
                let key_id = format!("K{}", state.keys.len() + 1);
                state.keys.push(KeySummary {
                    key_id,
                    expire_date: "Never".to_string(),
                    encrypt: true,
                    sign: true,
                    key_size: body["key_size"].as_u64().and_then(|s| u32::try_from(s).ok()),
                    default_key: false,
                    created: "Jan 03 2024".to_string(),
                });
                ok(&json!({"message": "Key generated."}))
            }
            _ => ApiResponse::new(404, "not found"),
        }
    }
}

fn list(emails: &[Email], keep: impl Fn(&Email) -> bool) -> ApiResponse {
    let matching: Vec<&Email> = emails.iter().filter(|e| keep(e)).collect();
    ok(&json!(matching))
}

fn find(emails: &[Email], id: &str) -> Option<Email> {
    let id = id.parse::<i64>().ok()?;
    emails.iter().find(|e| e.id == id).cloned()
}

fn ok(body: &Value) -> ApiResponse {
    ApiResponse::new(200, body.to_string())
}

fn error(status: u16, message: &str) -> ApiResponse {
    ApiResponse::new(status, json!({ "error": message }).to_string())
}

impl Transport for &FakeServer {
    async fn send(&self, request: ApiRequest) -> WebmailResult<ApiResponse> {
        let (offline, held) = {
            let mut state = self.state.borrow_mut();
            state.requests.push(request.clone());
            (state.offline, state.held.remove(&request.path))
        };
        if let Some(gate) = held {
            let _ = gate.await;
        }
        if offline {
            return Err(WebmailError::Transport("connection refused".to_string()));
        }
        Ok(self.route(&request))
    }
}

pub type Controller<'a> = ViewController<&'a FakeServer, MemorySurface>;

/// Route core logs to the test harness; `RUST_LOG=debug` shows requests.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Controller signed in as [`ME`] with the default configuration.
pub fn controller(server: &FakeServer) -> Controller<'_> {
    controller_with(server, ClientConfig::default())
}

pub fn controller_with(server: &FakeServer, config: ClientConfig) -> Controller<'_> {
    init_logging();
    ViewController::new(
        server,
        MemorySurface::with_cookie(format!("csrftoken=abc; user_email=\"{ME}\"")),
        config,
    )
}
