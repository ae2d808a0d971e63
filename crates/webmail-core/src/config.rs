//! Client configuration.
//!
//! The page embeds the configuration as JSON; every field has a default so
//! an empty object `{}` is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::USER_COOKIE;
use crate::view::Panel;

/// Default number of body characters shown on a mailbox card.
pub const DEFAULT_PREVIEW_CHARS: usize = 99;

/// Which party of an encrypted message may read it without a passphrase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnershipRule {
    /// The sender's copy is stored in clear; everyone else is gated.
    #[default]
    Sender,
    /// Listed recipients read freely; everyone else is gated.
    Recipient,
}

/// CSS selectors of the four top-level panel containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSelectors {
    pub mailbox: String,
    pub email: String,
    pub compose: String,
    pub security: String,
}

impl Default for PanelSelectors {
    fn default() -> Self {
        Self {
            mailbox: "#emails-view".to_string(),
            email: "#email-view".to_string(),
            compose: "#compose-view".to_string(),
            security: "#security-view".to_string(),
        }
    }
}

impl PanelSelectors {
    #[must_use]
    pub fn selector(&self, panel: Panel) -> &str {
        match panel {
            Panel::Mailbox => &self.mailbox,
            Panel::Email => &self.email,
            Panel::Compose => &self.compose,
            Panel::Security => &self.security,
        }
    }
}

/// Frontend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Prefix for every API path (e.g., `https://mail.example.com`); empty
    /// means same origin.
    pub base_url: String,
    /// Cookie holding the signed-in address.
    pub user_cookie: String,
    /// Characters of body shown on a mailbox card before "more".
    pub preview_chars: usize,
    /// Encrypted-placeholder predicate used by every view.
    pub ownership_rule: OwnershipRule,
    /// Offer ECDSA in the generate form.
    pub allow_ecdsa: bool,
    pub panels: PanelSelectors,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            user_cookie: USER_COOKIE.to_string(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
            ownership_rule: OwnershipRule::default(),
            allow_ecdsa: false,
            panels: PanelSelectors::default(),
        }
    }
}

impl ClientConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.preview_chars == 0 {
            return Err(Error::Config("preview_chars must be positive".to_string()));
        }
        if self.user_cookie.trim().is_empty() {
            return Err(Error::Config("user_cookie must not be empty".to_string()));
        }
        for panel in Panel::ALL {
            if self.panels.selector(panel).trim().is_empty() {
                return Err(Error::Config(format!(
                    "selector for the {} panel must not be empty",
                    panel.as_str()
                )));
            }
        }
        Ok(())
    }
}
