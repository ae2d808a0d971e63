//! Records exchanged with the mail server.
//!
//! The server owns every record; the client holds a read-only copy for the
//! lifetime of the panel that displays it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A single message as serialized by `GET /emails/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub id: i64,
    pub sender: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    /// Preformatted by the server, e.g. `Jan 02 2024, 10:30 AM`.
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub encrypted: bool,
}

impl Email {
    /// Recipients joined for display.
    #[must_use]
    pub fn recipients_display(&self) -> String {
        self.recipients.join(", ")
    }
}

/// Named message collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mailbox {
    Inbox,
    Sent,
    Archive,
}

impl Mailbox {
    pub const ALL: [Self; 3] = [Self::Inbox, Self::Sent, Self::Archive];

    /// Path segment used by `GET /emails/{mailbox}`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Sent => "sent",
            Self::Archive => "archive",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Inbox => "Inbox",
            Self::Sent => "Sent",
            Self::Archive => "Archive",
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mailbox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inbox" => Ok(Self::Inbox),
            "sent" => Ok(Self::Sent),
            "archive" | "archived" => Ok(Self::Archive),
            other => Err(Error::InvalidInput(format!("Unknown mailbox: {other}"))),
        }
    }
}

/// One row of `GET /api/security/keys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySummary {
    pub key_id: String,
    #[serde(default)]
    pub expire_date: String,
    #[serde(default)]
    pub encrypt: bool,
    #[serde(default)]
    pub sign: bool,
    #[serde(default)]
    pub key_size: Option<u32>,
    #[serde(default)]
    pub default_key: bool,
    #[serde(default)]
    pub created: String,
}

/// `GET /api/security/keys/{id}` kept as the raw object.
///
/// Field order follows the server so the detail table lists fields the
/// way they were serialized, including ones this client does not know.
pub type KeyDetail = serde_json::Map<String, serde_json::Value>;

/// Asymmetric algorithms offered by the generate form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "DSA")]
    Dsa,
    #[serde(rename = "ECDSA")]
    Ecdsa,
}

impl KeyType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::Dsa => "DSA",
            Self::Ecdsa => "ECDSA",
        }
    }

    /// Key sizes the server accepts for this algorithm.
    #[must_use]
    pub const fn allowed_sizes(self) -> &'static [u32] {
        match self {
            Self::Rsa | Self::Dsa => &[1024, 2048, 4096],
            Self::Ecdsa => &[256, 384, 521],
        }
    }

    /// Types listed in the generate form.
    #[must_use]
    pub fn offered(allow_ecdsa: bool) -> Vec<Self> {
        let mut types = vec![Self::Rsa, Self::Dsa];
        if allow_ecdsa {
            types.push(Self::Ecdsa);
        }
        types
    }
}

impl FromStr for KeyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RSA" => Ok(Self::Rsa),
            "DSA" => Ok(Self::Dsa),
            "ECDSA" => Ok(Self::Ecdsa),
            _ => Err(Error::InvalidInput("Invalid key type.".to_string())),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Request bodies
// ──────────────────────────────────────────────────────────────────────────────

/// `POST /emails`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeRequest {
    /// Comma-separated addresses, split by the server.
    pub recipients: String,
    pub subject: String,
    pub body: String,
    pub encrypt: bool,
    pub sign: bool,
    pub passphrase: String,
}

/// `PUT /emails/{id}`: exactly one flag per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailUpdate {
    Read(bool),
    Archived(bool),
}

/// `POST /emails/decrypt/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptRequest {
    pub passphrase: String,
}

/// Success payload of `POST /emails/decrypt/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DecryptResponse {
    pub data: Email,
}

/// `POST /api/security/generate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateKeyRequest {
    pub key_type: KeyType,
    pub key_size: u32,
    /// Days until expiry; `null` when the form field was left empty.
    pub expire: Option<u32>,
    pub passphrase: String,
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_deserializes_server_payload() {
        let json = r#"{
            "id": 7,
            "sender": "alice@mail.test",
            "recipients": ["bob@mail.test", "carol@mail.test"],
            "subject": "Hello",
            "body": "Hi there",
            "timestamp": "Jan 02 2024, 10:30 AM",
            "read": false,
            "archived": true,
            "encrypted": false
        }"#;
        let email: Email = serde_json::from_str(json).unwrap();
        assert_eq!(email.id, 7);
        assert!(email.archived);
        assert_eq!(email.recipients_display(), "bob@mail.test, carol@mail.test");
    }

    #[test]
    fn email_update_serializes_single_flag() {
        let json = serde_json::to_string(&EmailUpdate::Read(true)).unwrap();
        assert_eq!(json, r#"{"read":true}"#);
        let json = serde_json::to_string(&EmailUpdate::Archived(false)).unwrap();
        assert_eq!(json, r#"{"archived":false}"#);
    }

    #[test]
    fn mailbox_parses_nav_names() {
        assert_eq!("inbox".parse::<Mailbox>().unwrap(), Mailbox::Inbox);
        assert_eq!("archived".parse::<Mailbox>().unwrap(), Mailbox::Archive);
        assert!("spam".parse::<Mailbox>().is_err());
        assert_eq!(Mailbox::Sent.title(), "Sent");
    }

    #[test]
    fn generate_request_uses_wire_names() {
        let req = GenerateKeyRequest {
            key_type: KeyType::Rsa,
            key_size: 2048,
            expire: None,
            passphrase: "pw".to_string(),
            comment: String::new(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["key_type"], "RSA");
        assert_eq!(value["key_size"], 2048);
        assert!(value["expire"].is_null());
    }

    #[test]
    fn key_type_sizes() {
        assert!(KeyType::Dsa.allowed_sizes().contains(&4096));
        assert!(!KeyType::Ecdsa.allowed_sizes().contains(&2048));
        assert_eq!(KeyType::offered(false).len(), 2);
        assert_eq!(KeyType::offered(true).last(), Some(&KeyType::Ecdsa));
    }
}
