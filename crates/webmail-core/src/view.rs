//! View state machine and the declarative event table.
//!
//! A [`View`] is what the user is looking at; a [`Panel`] is the top-level
//! container that hosts it. Exactly one panel is visible at a time. Every
//! view owns a static binding table that the surface re-applies after each
//! render, so handlers never pile up on re-rendered markup.

use serde::{Deserialize, Serialize};

use crate::forms::{ComposeForm, GenerateKeyForm};
use crate::models::Mailbox;

/// Mutually exclusive top-level containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    Mailbox,
    Email,
    Compose,
    Security,
}

impl Panel {
    pub const ALL: [Self; 4] = [Self::Mailbox, Self::Email, Self::Compose, Self::Security];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mailbox => "mailbox",
            Self::Email => "email",
            Self::Compose => "compose",
            Self::Security => "security",
        }
    }
}

/// Everything the user can be looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", content = "params", rename_all = "snake_case")]
pub enum View {
    Mailbox(Mailbox),
    Email { id: i64, mailbox: Mailbox },
    Compose,
    Security,
    KeyDetail(String),
    GenerateKeyForm,
    PassphrasePrompt { id: i64, mailbox: Mailbox },
}

impl Default for View {
    fn default() -> Self {
        Self::Mailbox(Mailbox::Inbox)
    }
}

impl View {
    /// The container hosting this view.
    #[must_use]
    pub const fn panel(&self) -> Panel {
        match self {
            Self::Mailbox(_) => Panel::Mailbox,
            Self::Email { .. } | Self::PassphrasePrompt { .. } => Panel::Email,
            Self::Compose => Panel::Compose,
            Self::Security | Self::KeyDetail(_) | Self::GenerateKeyForm => Panel::Security,
        }
    }

    /// Handlers attached to the panel's markup after every render.
    #[must_use]
    pub const fn bindings(&self) -> &'static [Binding] {
        match self {
            Self::Mailbox(_) => MAILBOX_BINDINGS,
            Self::Email { .. } => EMAIL_BINDINGS,
            Self::PassphrasePrompt { .. } => PASSPHRASE_BINDINGS,
            Self::Compose => COMPOSE_BINDINGS,
            Self::Security => SECURITY_BINDINGS,
            Self::KeyDetail(_) => KEY_DETAIL_BINDINGS,
            Self::GenerateKeyForm => GENERATE_KEY_BINDINGS,
        }
    }

    /// Parse the short names used by navigation links (`inbox`, `compose`, ...).
    #[must_use]
    pub fn from_nav_name(name: &str) -> Option<Self> {
        match name {
            "compose" => Some(Self::Compose),
            "security" => Some(Self::Security),
            "generate-key" => Some(Self::GenerateKeyForm),
            other => other.parse().ok().map(Self::Mailbox),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Element ids shared by templates, bindings and the surface
// ──────────────────────────────────────────────────────────────────────────────

/// Ids of replaceable regions inside a panel.
pub mod slots {
    pub const MAILBOX_ITEMS: &str = "mailbox-items";
    pub const MAILBOX_ERROR: &str = "mailbox-error";
    pub const EMAIL_ACTIONS: &str = "email-actions";
    pub const EMAIL_STATUS: &str = "email-status";
    pub const PASSPHRASE_ERROR: &str = "error-email-passphrase";
    pub const COMPOSE_ERROR: &str = "compose-error";
    pub const COMPOSE_PASSPHRASE: &str = "passphrase-input";
    pub const SECURITY_KEYS: &str = "security-keys";
    pub const SECURITY_ERROR: &str = "security-error";
    pub const GENERATE_ERROR: &str = "error-generate-key";
}

/// Ids of form controls read when a form is submitted.
pub mod fields {
    pub const COMPOSE_RECIPIENTS: &str = "compose-recipients";
    pub const COMPOSE_SUBJECT: &str = "compose-subject";
    pub const COMPOSE_BODY: &str = "compose-body";
    pub const COMPOSE_ENCRYPT: &str = "compose-encrypt";
    pub const COMPOSE_SIGN: &str = "compose-sign";
    pub const COMPOSE_PASSPHRASE: &str = "compose-passphrase";
    pub const EMAIL_PASSPHRASE: &str = "email-secured-passphrase";
    pub const GENERATE_KEY_TYPE: &str = "generate-key-type";
    pub const GENERATE_KEY_SIZE: &str = "generate-key-size";
    pub const GENERATE_EXPIRATION: &str = "generate-expiration";
    pub const GENERATE_PASSPHRASE: &str = "generate-passphrase";
    pub const GENERATE_COMMENT: &str = "generate-comment";
}

/// Data attributes carried by actionable elements.
pub mod attrs {
    pub const EMAIL_ID: &str = "data-email-id";
    pub const MAILBOX: &str = "data-mailbox";
    pub const KEY_ID: &str = "data-key-id";
}

// ──────────────────────────────────────────────────────────────────────────────
// Bindings
// ──────────────────────────────────────────────────────────────────────────────

/// DOM event a binding listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Click,
    Submit,
    Change,
}

/// One row of a panel's event table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// Selector evaluated inside the panel container.
    pub selector: &'static str,
    pub trigger: Trigger,
    pub action: ActionKind,
}

const fn bind(selector: &'static str, trigger: Trigger, action: ActionKind) -> Binding {
    Binding {
        selector,
        trigger,
        action,
    }
}

/// Navigation bar; bound once on the document, outside every panel.
pub const NAV_BINDINGS: &[Binding] = &[
    bind("#inbox", Trigger::Click, ActionKind::OpenMailbox(Mailbox::Inbox)),
    bind("#sent", Trigger::Click, ActionKind::OpenMailbox(Mailbox::Sent)),
    bind("#archived", Trigger::Click, ActionKind::OpenMailbox(Mailbox::Archive)),
    bind("#compose", Trigger::Click, ActionKind::OpenCompose),
    bind("#security", Trigger::Click, ActionKind::OpenSecurity),
];

const MAILBOX_BINDINGS: &[Binding] = &[bind(
    "[data-action='open-email']",
    Trigger::Click,
    ActionKind::OpenEmail,
)];

const EMAIL_BINDINGS: &[Binding] = &[
    bind("[data-action='toggle-archive']", Trigger::Click, ActionKind::ToggleArchive),
    bind("[data-action='reply']", Trigger::Click, ActionKind::Reply),
    bind(
        "[data-action='reveal-encrypted']",
        Trigger::Click,
        ActionKind::RevealEncrypted,
    ),
];

const PASSPHRASE_BINDINGS: &[Binding] = &[bind(
    "[data-action='submit-passphrase']",
    Trigger::Click,
    ActionKind::SubmitPassphrase,
)];

const COMPOSE_BINDINGS: &[Binding] = &[
    bind("#compose-sign", Trigger::Change, ActionKind::ToggleSign),
    bind("#compose-form", Trigger::Submit, ActionKind::SendEmail),
];

const SECURITY_BINDINGS: &[Binding] = &[
    bind("[data-action='key-detail']", Trigger::Click, ActionKind::ShowKeyDetail),
    bind("[data-action='delete-key']", Trigger::Click, ActionKind::DeleteKey),
    bind(
        "[data-action='generate-key-form']",
        Trigger::Click,
        ActionKind::ShowGenerateKeyForm,
    ),
];

const KEY_DETAIL_BINDINGS: &[Binding] = &[bind(
    "[data-action='back-to-security']",
    Trigger::Click,
    ActionKind::OpenSecurity,
)];

const GENERATE_KEY_BINDINGS: &[Binding] = &[
    bind("#generate-key-form", Trigger::Submit, ActionKind::GenerateKey),
    bind(
        "[data-action='back-to-security']",
        Trigger::Click,
        ActionKind::OpenSecurity,
    ),
];

// ──────────────────────────────────────────────────────────────────────────────
// Actions
// ──────────────────────────────────────────────────────────────────────────────

/// Read access to the element that fired and to the document's form controls.
pub trait FieldSource {
    /// Attribute of the element the binding fired on.
    fn attr(&self, name: &str) -> Option<String>;
    /// Current value of the control with this element id.
    fn value(&self, id: &str) -> Option<String>;
    /// Checked state of the checkbox with this element id.
    fn checked(&self, id: &str) -> bool;
}

/// What a binding does, before its payload is read from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    OpenMailbox(Mailbox),
    OpenCompose,
    OpenSecurity,
    OpenEmail,
    ToggleArchive,
    Reply,
    RevealEncrypted,
    SubmitPassphrase,
    ToggleSign,
    SendEmail,
    ShowKeyDetail,
    DeleteKey,
    ShowGenerateKeyForm,
    GenerateKey,
}

/// A fully resolved user intent, ready for the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ShowMailbox(Mailbox),
    ShowEmail { id: i64, mailbox: Mailbox },
    ShowCompose,
    ShowSecurity,
    ToggleArchive { id: i64 },
    Reply { id: i64 },
    ShowPassphrasePrompt { id: i64 },
    SubmitPassphrase { id: i64, passphrase: String },
    ToggleSign { checked: bool },
    SendEmail(ComposeForm),
    ShowKeyDetail { key_id: String },
    DeleteKey { key_id: String },
    ShowGenerateKeyForm,
    GenerateKey(GenerateKeyForm),
}

impl ActionKind {
    /// Build the action from the fired element and the current form values.
    ///
    /// Returns `None` when a required attribute is missing or malformed.
    pub fn resolve(self, source: &dyn FieldSource) -> Option<Action> {
        let email_id = || source.attr(attrs::EMAIL_ID)?.trim().parse::<i64>().ok();
        let key_id = || source.attr(attrs::KEY_ID).filter(|id| !id.is_empty());
        let value = |id: &str| source.value(id).unwrap_or_default();

        let action = match self {
            Self::OpenMailbox(mailbox) => Action::ShowMailbox(mailbox),
            Self::OpenCompose => Action::ShowCompose,
            Self::OpenSecurity => Action::ShowSecurity,
            Self::OpenEmail => {
                let mailbox = source
                    .attr(attrs::MAILBOX)
                    .and_then(|m| m.parse().ok())
                    .unwrap_or(Mailbox::Inbox);
                Action::ShowEmail {
                    id: email_id()?,
                    mailbox,
                }
            }
            Self::ToggleArchive => Action::ToggleArchive { id: email_id()? },
            Self::Reply => Action::Reply { id: email_id()? },
            Self::RevealEncrypted => Action::ShowPassphrasePrompt { id: email_id()? },
            Self::SubmitPassphrase => Action::SubmitPassphrase {
                id: email_id()?,
                passphrase: value(fields::EMAIL_PASSPHRASE),
            },
            Self::ToggleSign => Action::ToggleSign {
                checked: source.checked(fields::COMPOSE_SIGN),
            },
            Self::SendEmail => Action::SendEmail(ComposeForm {
                recipients: value(fields::COMPOSE_RECIPIENTS),
                subject: value(fields::COMPOSE_SUBJECT),
                body: value(fields::COMPOSE_BODY),
                encrypt: source.checked(fields::COMPOSE_ENCRYPT),
                sign: source.checked(fields::COMPOSE_SIGN),
                passphrase: value(fields::COMPOSE_PASSPHRASE),
            }),
            Self::ShowKeyDetail => Action::ShowKeyDetail { key_id: key_id()? },
            Self::DeleteKey => Action::DeleteKey { key_id: key_id()? },
            Self::ShowGenerateKeyForm => Action::ShowGenerateKeyForm,
            Self::GenerateKey => Action::GenerateKey(GenerateKeyForm {
                key_type: value(fields::GENERATE_KEY_TYPE),
                key_size: value(fields::GENERATE_KEY_SIZE),
                expiration: value(fields::GENERATE_EXPIRATION),
                passphrase: value(fields::GENERATE_PASSPHRASE),
                comment: value(fields::GENERATE_COMMENT),
            }),
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;

    #[derive(Default)]
    struct Fields {
        attrs: HashMap<&'static str, &'static str>,
        values: HashMap<&'static str, &'static str>,
        checked: HashSet<&'static str>,
    }

    impl FieldSource for Fields {
        fn attr(&self, name: &str) -> Option<String> {
            self.attrs.get(name).map(ToString::to_string)
        }
        fn value(&self, id: &str) -> Option<String> {
            self.values.get(id).map(ToString::to_string)
        }
        fn checked(&self, id: &str) -> bool {
            self.checked.contains(id)
        }
    }

    #[test]
    fn every_view_maps_to_one_panel() {
        assert_eq!(View::Mailbox(Mailbox::Sent).panel(), Panel::Mailbox);
        assert_eq!(
            View::PassphrasePrompt {
                id: 1,
                mailbox: Mailbox::Inbox
            }
            .panel(),
            Panel::Email
        );
        assert_eq!(View::KeyDetail("k".into()).panel(), Panel::Security);
        assert_eq!(View::GenerateKeyForm.panel(), Panel::Security);
        assert_eq!(View::Compose.panel(), Panel::Compose);
    }

    #[test]
    fn nav_names_resolve() {
        assert_eq!(View::from_nav_name("sent"), Some(View::Mailbox(Mailbox::Sent)));
        assert_eq!(View::from_nav_name("compose"), Some(View::Compose));
        assert_eq!(View::from_nav_name("bogus"), None);
    }

    #[test]
    fn view_serializes_with_tag() {
        let json = serde_json::to_string(&View::Email {
            id: 3,
            mailbox: Mailbox::Archive,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"view":"email","params":{"id":3,"mailbox":"archive"}}"#
        );
    }

    #[test]
    fn open_email_reads_id_and_mailbox() {
        let mut source = Fields::default();
        source.attrs.insert(attrs::EMAIL_ID, "42");
        source.attrs.insert(attrs::MAILBOX, "sent");
        assert_eq!(
            ActionKind::OpenEmail.resolve(&source),
            Some(Action::ShowEmail {
                id: 42,
                mailbox: Mailbox::Sent
            })
        );
    }

    #[test]
    fn missing_id_resolves_to_nothing() {
        let source = Fields::default();
        assert_eq!(ActionKind::ToggleArchive.resolve(&source), None);
        assert_eq!(ActionKind::DeleteKey.resolve(&source), None);
    }

    #[test]
    fn send_email_collects_form() {
        let mut source = Fields::default();
        source.values.insert(fields::COMPOSE_RECIPIENTS, "bob@mail.test");
        source.values.insert(fields::COMPOSE_SUBJECT, "Hi");
        source.values.insert(fields::COMPOSE_BODY, "Body");
        source.checked.insert(fields::COMPOSE_SIGN);
        source.values.insert(fields::COMPOSE_PASSPHRASE, "pw");

        let Some(Action::SendEmail(form)) = ActionKind::SendEmail.resolve(&source) else {
            panic!("expected SendEmail");
        };
        assert_eq!(form.recipients, "bob@mail.test");
        assert!(form.sign);
        assert!(!form.encrypt);
        assert_eq!(form.passphrase, "pw");
    }

    #[test]
    fn binding_tables_are_unique_per_trigger() {
        let views = [
            View::Mailbox(Mailbox::Inbox),
            View::Email {
                id: 1,
                mailbox: Mailbox::Inbox,
            },
            View::Compose,
            View::Security,
            View::KeyDetail("k".into()),
            View::GenerateKeyForm,
            View::PassphrasePrompt {
                id: 1,
                mailbox: Mailbox::Inbox,
            },
        ];
        for view in views {
            let mut seen = HashSet::new();
            for binding in view.bindings() {
                assert!(
                    seen.insert((binding.selector, binding.trigger)),
                    "duplicate binding {binding:?} in {view:?}"
                );
            }
        }
    }
}
