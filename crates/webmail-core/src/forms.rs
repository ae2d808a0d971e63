//! Compose and key-generation forms.
//!
//! Forms are captured as the raw strings the user typed. `validate` catches
//! the gaps that would only earn a server round-trip and turns the rest into
//! request bodies.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{ComposeRequest, Email, GenerateKeyRequest, KeyType};

const REPLY_PREFIX: &str = "Re:";

/// Values of the compose form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeForm {
    pub recipients: String,
    pub subject: String,
    pub body: String,
    pub encrypt: bool,
    pub sign: bool,
    /// Only meaningful when `sign` is set.
    pub passphrase: String,
}

impl ComposeForm {
    pub fn validate(&self) -> Result<ComposeRequest> {
        let recipients = self
            .recipients
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        if recipients.is_empty() {
            return Err(Error::InvalidInput(
                "At least one recipient required.".to_string(),
            ));
        }
        if self.sign && self.passphrase.is_empty() {
            return Err(Error::InvalidInput(
                "Passphrase is required to sign the message.".to_string(),
            ));
        }
        Ok(ComposeRequest {
            recipients,
            subject: self.subject.clone(),
            body: self.body.clone(),
            encrypt: self.encrypt,
            sign: self.sign,
            passphrase: if self.sign {
                self.passphrase.clone()
            } else {
                String::new()
            },
        })
    }
}

/// Prefix `subject` with `Re: ` unless it already carries one.
#[must_use]
pub fn reply_subject(subject: &str) -> String {
    if subject.starts_with(REPLY_PREFIX) {
        subject.to_string()
    } else {
        format!("{REPLY_PREFIX} {subject}")
    }
}

/// Quote `email` for the reply body.
#[must_use]
pub fn quote_body(email: &Email) -> String {
    format!("On {} {} wrote:\n{}\n", email.timestamp, email.sender, email.body)
}

/// Compose form prefilled to answer `email`.
#[must_use]
pub fn reply_draft(email: &Email) -> ComposeForm {
    ComposeForm {
        recipients: email.sender.clone(),
        subject: reply_subject(&email.subject),
        body: quote_body(email),
        ..ComposeForm::default()
    }
}

/// Values of the key generation form, exactly as typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateKeyForm {
    pub key_type: String,
    pub key_size: String,
    /// Days; empty means no expiration.
    pub expiration: String,
    pub passphrase: String,
    pub comment: String,
}

impl Default for GenerateKeyForm {
    fn default() -> Self {
        Self {
            key_type: KeyType::Rsa.as_str().to_string(),
            key_size: "2048".to_string(),
            expiration: String::new(),
            passphrase: String::new(),
            comment: String::new(),
        }
    }
}

impl GenerateKeyForm {
    pub fn validate(&self, allow_ecdsa: bool) -> Result<GenerateKeyRequest> {
        let key_type: KeyType = self.key_type.parse()?;
        if key_type == KeyType::Ecdsa && !allow_ecdsa {
            return Err(Error::InvalidInput("Invalid key type.".to_string()));
        }

        let key_size = self
            .key_size
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|size| key_type.allowed_sizes().contains(size))
            .ok_or_else(|| Error::InvalidInput("Invalid key size.".to_string()))?;

        let expiration = self.expiration.trim();
        let expire = if expiration.is_empty() {
            None
        } else {
            Some(
                expiration
                    .parse::<u32>()
                    .map_err(|_| Error::InvalidInput("Invalid expiration value.".to_string()))?,
            )
        };

        if self.passphrase.is_empty() {
            return Err(Error::InvalidInput("Passphrase is required.".to_string()));
        }

        Ok(GenerateKeyRequest {
            key_type,
            key_size,
            expire,
            passphrase: self.passphrase.clone(),
            comment: self.comment.trim().to_string(),
        })
    }
}
