//! Browser bindings for the PGP webmail frontend.
//!
//! This crate wires `webmail-core` to the page: `fetch` for transport, the
//! DOM for rendering and event handling, and a small JS-facing API.
//!
//! # Building
//!
//! ```bash
//! wasm-pack build crates/webmail-wasm --target web
//! ```
//!
//! # Usage
//!
//! ```javascript
//! import init, { WebmailApp } from './webmail_wasm.js';
//!
//! async function main() {
//!     await init();
//!     const app = new WebmailApp();
//!     await app.start();
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;

// ──────────────────────────────────────────────────────────────────────────────
// Shared types (WASM-compatible)
// ──────────────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};
use webmail_core::{ClientConfig, Session, Trigger, View};

/// Crate version reported to the page.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// DOM event a binding trigger listens for.
#[must_use]
pub const fn event_name(trigger: Trigger) -> &'static str {
    match trigger {
        Trigger::Click => "click",
        Trigger::Submit => "submit",
        Trigger::Change => "change",
    }
}

/// Full request URL for an API path.
#[must_use]
pub fn request_url(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

/// Parse the configuration embedded in the page. Blank input means defaults.
pub fn parse_config(json: &str) -> Result<ClientConfig, String> {
    if json.trim().is_empty() {
        return Ok(ClientConfig::default());
    }
    ClientConfig::from_json(json).map_err(|e| e.to_string())
}

/// What `WebmailApp::snapshot` hands to JavaScript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSnapshot {
    pub version: String,
    pub view: View,
    pub user_email: Option<String>,
}

impl AppSnapshot {
    #[must_use]
    pub fn new(view: View, session: &Session) -> Self {
        Self {
            version: VERSION.to_string(),
            view,
            user_email: session.user_email().map(ToString::to_string),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use webmail_core::Mailbox;

    #[test]
    fn request_url_joins_without_double_slash() {
        assert_eq!(request_url("", "/emails/inbox"), "/emails/inbox");
        assert_eq!(
            request_url("https://mail.test/", "/emails/3"),
            "https://mail.test/emails/3"
        );
    }

    #[test]
    fn blank_config_uses_defaults() {
        assert_eq!(parse_config("  ").unwrap(), ClientConfig::default());
        assert!(parse_config("{\"preview_chars\": 0}").is_err());
    }

    #[test]
    fn snapshot_serializes_view_tag() {
        let snapshot = AppSnapshot::new(
            View::Email {
                id: 7,
                mailbox: Mailbox::Sent,
            },
            &Session::for_user("me@mail.test"),
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["view"]["view"], "email");
        assert_eq!(json["view"]["params"]["id"], 7);
        assert_eq!(json["user_email"], "me@mail.test");
    }

    #[test]
    fn every_trigger_has_an_event() {
        for trigger in [Trigger::Click, Trigger::Submit, Trigger::Change] {
            assert!(!event_name(trigger).is_empty());
        }
    }
}
