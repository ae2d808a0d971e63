//! Typed client for the mail and key-management endpoints.
//!
//! The client is generic over a [`Transport`] so the browser can plug in
//! `fetch` while tests plug in an in-process fake server. Every endpoint
//! surfaces an `{"error": "..."}` body the same way: as [`Error::Rejected`].

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{
    ComposeRequest, DecryptRequest, DecryptResponse, Email, EmailUpdate, GenerateKeyRequest,
    KeyDetail, KeySummary, Mailbox,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// A request ready for the wire. `path` excludes the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Raw response: status plus the undecoded body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// The `error` member of a JSON object body, if there is one.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match serde_json::from_str::<Value>(&self.body).ok()? {
            Value::Object(map) => match map.get("error")? {
                Value::String(message) => Some(message.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            },
            _ => None,
        }
    }
}

/// Moves one request to the server and back.
///
/// Implementations report network failures as [`Error::Transport`] and
/// return every HTTP response, whatever its status, as `Ok`.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Typed calls for every endpoint the frontend consumes.
#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    transport: T,
}

impl<T: Transport> ApiClient<T> {
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// `GET /emails/{mailbox}`
    pub async fn list_mailbox(&self, mailbox: Mailbox) -> Result<Vec<Email>> {
        self.get_json(format!("/emails/{mailbox}")).await
    }

    /// `GET /emails/{id}`
    pub async fn get_email(&self, id: i64) -> Result<Email> {
        self.get_json(format!("/emails/{id}")).await
    }

    /// `POST /emails`
    pub async fn send_email(&self, request: &ComposeRequest) -> Result<()> {
        self.post_json::<_, Value>("/emails".to_string(), request)
            .await
            .map(drop)
    }

    /// `PUT /emails/{id}` with a single flag.
    pub async fn update_email(&self, id: i64, update: EmailUpdate) -> Result<()> {
        let body = serde_json::to_value(update)?;
        self.expect_ok(Method::Put, format!("/emails/{id}"), Some(body))
            .await
    }

    /// `POST /emails/decrypt/{id}`
    pub async fn decrypt_email(&self, id: i64, passphrase: &str) -> Result<Email> {
        let request = DecryptRequest {
            passphrase: passphrase.to_string(),
        };
        let response: DecryptResponse = self
            .post_json(format!("/emails/decrypt/{id}"), &request)
            .await?;
        Ok(response.data)
    }

    /// `GET /api/security/keys`
    pub async fn list_keys(&self) -> Result<Vec<KeySummary>> {
        self.get_json("/api/security/keys".to_string()).await
    }

    /// `GET /api/security/keys/{id}`
    pub async fn get_key(&self, key_id: &str) -> Result<KeyDetail> {
        self.get_json(key_path(key_id)).await
    }

    /// `DELETE /api/security/keys/{id}`
    pub async fn delete_key(&self, key_id: &str) -> Result<()> {
        self.expect_ok(Method::Delete, key_path(key_id), None).await
    }

    /// `POST /api/security/generate`
    pub async fn generate_key(&self, request: &GenerateKeyRequest) -> Result<()> {
        self.post_json::<_, Value>("/api/security/generate".to_string(), request)
            .await
            .map(drop)
    }

    // ──────────────────────────────────────────────────────────────────────
    // Plumbing
    // ──────────────────────────────────────────────────────────────────────

    async fn exchange(
        &self,
        method: Method,
        path: String,
        body: Option<Value>,
    ) -> Result<ApiResponse> {
        tracing::debug!(method = method.as_str(), path = %path, "api request");
        let response = self
            .transport
            .send(ApiRequest {
                method,
                path: path.clone(),
                body,
            })
            .await
            .inspect_err(|e| {
                tracing::error!(method = method.as_str(), path = %path, "transport failed: {e}");
            })?;

        if let Some(message) = response.error_message() {
            tracing::warn!(
                method = method.as_str(),
                path = %path,
                status = response.status,
                "server rejected request: {message}"
            );
            return Err(Error::Rejected(message));
        }
        if !response.is_success() {
            tracing::error!(
                method = method.as_str(),
                path = %path,
                status = response.status,
                "unexpected status"
            );
            return Err(Error::Status {
                method: method.as_str(),
                path,
                status: response.status,
            });
        }
        Ok(response)
    }

    async fn get_json<R: DeserializeOwned>(&self, path: String) -> Result<R> {
        let response = self.exchange(Method::Get, path, None).await?;
        Ok(serde_json::from_str(&response.body)?)
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(&self, path: String, body: &B) -> Result<R> {
        let body = serde_json::to_value(body)?;
        let response = self.exchange(Method::Post, path, Some(body)).await?;
        if response.body.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Object(serde_json::Map::new()))?);
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    async fn expect_ok(&self, method: Method, path: String, body: Option<Value>) -> Result<()> {
        self.exchange(method, path, body).await.map(drop)
    }
}

fn key_path(key_id: &str) -> String {
    format!(
        "/api/security/keys/{}",
        utf8_percent_encode(key_id, NON_ALPHANUMERIC)
    )
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use futures::executor::block_on;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct Scripted {
        responses: RefCell<VecDeque<Result<ApiResponse>>>,
        seen: RefCell<Vec<ApiRequest>>,
    }

    impl Scripted {
        fn reply(self, status: u16, body: &str) -> Self {
            self.responses
                .borrow_mut()
                .push_back(Ok(ApiResponse::new(status, body)));
            self
        }
    }

    impl Transport for Scripted {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
            self.seen.borrow_mut().push(request);
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Transport("no scripted response".into())))
        }
    }

    #[test]
    fn error_payload_becomes_rejected_even_on_200() {
        let client = ApiClient::new(Scripted::default().reply(200, r#"{"error":"nope"}"#));
        let err = block_on(client.list_keys()).unwrap_err();
        assert!(matches!(err, Error::Rejected(ref m) if m == "nope"));
    }

    #[test]
    fn bad_status_without_payload_is_status_error() {
        let client = ApiClient::new(Scripted::default().reply(500, "<html>oops</html>"));
        let err = block_on(client.get_email(3)).unwrap_err();
        assert!(matches!(err, Error::Status { status: 500, .. }));
    }

    #[test]
    fn put_accepts_empty_body() {
        let client = ApiClient::new(Scripted::default().reply(204, ""));
        block_on(client.update_email(9, EmailUpdate::Archived(true))).unwrap();
        let seen = client.transport().seen.borrow();
        assert_eq!(seen[0].method, Method::Put);
        assert_eq!(seen[0].path, "/emails/9");
        assert_eq!(seen[0].body, Some(json!({"archived": true})));
    }

    #[test]
    fn decrypt_unwraps_data_envelope() {
        let body = json!({"data": {
            "id": 4, "sender": "a@mail.test", "recipients": ["b@mail.test"],
            "subject": "s", "body": "plain", "timestamp": "t",
            "read": false, "archived": false, "encrypted": true
        }})
        .to_string();
        let client = ApiClient::new(Scripted::default().reply(200, &body));
        let email = block_on(client.decrypt_email(4, "pw")).unwrap();
        assert_eq!(email.body, "plain");
        let seen = client.transport().seen.borrow();
        assert_eq!(seen[0].path, "/emails/decrypt/4");
        assert_eq!(seen[0].body, Some(json!({"passphrase": "pw"})));
    }

    #[test]
    fn key_ids_are_percent_encoded() {
        let client = ApiClient::new(Scripted::default().reply(200, "{}"));
        block_on(client.delete_key("AB CD/12")).unwrap();
        assert_eq!(
            client.transport().seen.borrow()[0].path,
            "/api/security/keys/AB%20CD%2F12"
        );
    }

    #[test]
    fn transport_failure_propagates() {
        let client = ApiClient::new(Scripted::default());
        let err = block_on(client.list_mailbox(Mailbox::Inbox)).unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn key_detail_keeps_server_field_order() {
        let client = ApiClient::new(
            Scripted::default().reply(200, r#"{"key_id":"K1","private_key":"p","key_size":2048}"#),
        );
        let detail = block_on(client.get_key("K1")).unwrap();
        let names: Vec<_> = detail.keys().map(String::as_str).collect();
        assert_eq!(names, ["key_id", "private_key", "key_size"]);
    }
}
