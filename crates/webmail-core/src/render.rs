//! Markup for every view.
//!
//! Records are first mapped to small serializable page models (all display
//! decisions happen here, in plain Rust), then rendered through Jinja
//! templates embedded at compile time. Templates ending in `.html` are
//! auto-escaped, so server strings never reach the document as markup.

use std::sync::LazyLock;

use include_dir::{Dir, include_dir};
use minijinja::{AutoEscape, Environment};
use serde::Serialize;
use serde_json::Value;

use crate::config::OwnershipRule;
use crate::error::Result;
use crate::forms::{ComposeForm, GenerateKeyForm};
use crate::models::{Email, KeyDetail, KeySummary, KeyType, Mailbox};
use crate::session::Session;

static TEMPLATE_DIR: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates");

static ENV: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();

    env.set_auto_escape_callback(|name| {
        let is_html = std::path::Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
        if is_html {
            AutoEscape::Html
        } else {
            AutoEscape::None
        }
    });

    for file in TEMPLATE_DIR.files() {
        let Some(name) = file.path().to_str() else {
            continue;
        };
        let contents =
            std::str::from_utf8(file.contents()).unwrap_or("<!-- invalid utf-8 template -->");
        if let Err(err) = env.add_template(name, contents) {
            tracing::error!(template = name, error = %err, "failed to load template");
        }
    }

    env
});

pub fn render_template<T: Serialize>(name: &str, ctx: T) -> Result<String> {
    let tpl = ENV.get_template(name)?;
    Ok(tpl.render(ctx)?)
}

// ──────────────────────────────────────────────────────────────────────────────
// Display helpers
// ──────────────────────────────────────────────────────────────────────────────

/// First `limit` characters of `body`, and whether anything was cut.
#[must_use]
pub fn preview(body: &str, limit: usize) -> (String, bool) {
    match body.char_indices().nth(limit) {
        Some((cut, _)) => (body[..cut].to_string(), true),
        None => (body.to_string(), false),
    }
}

/// Upper-case the first letter of every word (`true` → `True`).
#[must_use]
pub fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        let is_word = c.is_alphanumeric() || c == '_';
        if is_word && at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !is_word;
    }
    out
}

/// Human label for a key detail field; unknown fields keep their name.
#[must_use]
pub fn key_field_label(name: &str) -> &str {
    match name {
        "key_id" => "Key ID",
        "private_key" => "Private Key",
        "public_key" => "Public Key",
        "expire_date" => "Expire Date",
        "encrypt" => "Encrypt",
        "sign" => "Sign",
        "key_size" => "Key Size",
        "passphrase" => "Passphrase",
        "default_key" => "Default Key",
        "created" => "Created",
        other => other,
    }
}

/// Whether `email` must stay behind the passphrase gate for this viewer.
///
/// The single ownership check used by both the mailbox list and the
/// single-message view.
#[must_use]
pub fn requires_passphrase(email: &Email, viewer: &Session, rule: OwnershipRule) -> bool {
    if !email.encrypted {
        return false;
    }
    match rule {
        OwnershipRule::Sender => !viewer.is(&email.sender),
        OwnershipRule::Recipient => !email.recipients.iter().any(|r| viewer.is(r)),
    }
}

/// Inbox cards dim once read; other mailboxes always render as unread.
#[must_use]
pub const fn read_class(mailbox: Mailbox, email: &Email) -> &'static str {
    match mailbox {
        Mailbox::Inbox if email.read => "read",
        _ => "unread",
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => capitalize_words(&b.to_string()),
        other => other.to_string(),
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Mailbox list
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MailboxCard {
    pub id: i64,
    pub mailbox: Mailbox,
    pub subject: String,
    pub sender: String,
    pub recipients: String,
    pub timestamp: String,
    pub read_class: &'static str,
    pub locked: bool,
    pub preview: String,
    pub truncated: bool,
}

impl MailboxCard {
    #[must_use]
    pub fn build(
        mailbox: Mailbox,
        email: &Email,
        viewer: &Session,
        rule: OwnershipRule,
        preview_chars: usize,
    ) -> Self {
        let locked = requires_passphrase(email, viewer, rule);
        let (preview, truncated) = if locked {
            (String::new(), false)
        } else {
            preview(&email.body, preview_chars)
        };
        Self {
            id: email.id,
            mailbox,
            subject: email.subject.clone(),
            sender: email.sender.clone(),
            recipients: email.recipients_display(),
            timestamp: email.timestamp.clone(),
            read_class: read_class(mailbox, email),
            locked,
            preview,
            truncated,
        }
    }
}

/// Panel skeleton: title plus an empty card list.
pub fn mailbox_page(mailbox: Mailbox) -> Result<String> {
    #[derive(Serialize)]
    struct Ctx {
        title: &'static str,
        mailbox: Mailbox,
    }
    render_template(
        "mailbox.html",
        Ctx {
            title: mailbox.title(),
            mailbox,
        },
    )
}

pub fn mailbox_cards(cards: &[MailboxCard]) -> Result<String> {
    #[derive(Serialize)]
    struct Ctx<'a> {
        cards: &'a [MailboxCard],
    }
    render_template("mailbox_cards.html", Ctx { cards })
}

// ──────────────────────────────────────────────────────────────────────────────
// Single message
// ──────────────────────────────────────────────────────────────────────────────

/// Archive toggle and reply button under an unlocked message.
#[derive(Debug, Clone, Serialize)]
pub struct EmailActions {
    pub id: i64,
    pub archived: bool,
    pub show_archive: bool,
}

impl EmailActions {
    #[must_use]
    pub fn build(mailbox: Mailbox, email: &Email) -> Self {
        Self {
            id: email.id,
            archived: email.archived,
            show_archive: mailbox != Mailbox::Sent,
        }
    }

    #[must_use]
    pub const fn archive_label(&self) -> &'static str {
        if self.archived { "Unarchive" } else { "Archive" }
    }
}

pub fn email_actions(actions: &EmailActions) -> Result<String> {
    #[derive(Serialize)]
    struct Ctx<'a> {
        actions: &'a EmailActions,
        archive_label: &'static str,
    }
    render_template(
        "email_actions.html",
        Ctx {
            actions,
            archive_label: actions.archive_label(),
        },
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailPage {
    pub email: Email,
    pub recipients: String,
    pub locked: bool,
    /// The body was revealed through the passphrase gate.
    pub decrypted: bool,
    pub actions: Option<EmailActions>,
}

impl EmailPage {
    #[must_use]
    pub fn build(mailbox: Mailbox, email: Email, locked: bool, decrypted: bool) -> Self {
        let actions = (!locked).then(|| EmailActions::build(mailbox, &email));
        Self {
            recipients: email.recipients_display(),
            email,
            locked,
            decrypted,
            actions,
        }
    }
}

pub fn email_page(page: &EmailPage) -> Result<String> {
    let actions = page.actions.as_ref().map(email_actions).transpose()?;
    #[derive(Serialize)]
    struct Ctx<'a> {
        page: &'a EmailPage,
        actions_html: Option<String>,
    }
    render_template(
        "email.html",
        Ctx {
            page,
            actions_html: actions,
        },
    )
}

pub fn passphrase_prompt(id: i64) -> Result<String> {
    #[derive(Serialize)]
    struct Ctx {
        id: i64,
    }
    render_template("passphrase.html", Ctx { id })
}

// ──────────────────────────────────────────────────────────────────────────────
// Compose
// ──────────────────────────────────────────────────────────────────────────────

pub fn compose_page(form: &ComposeForm) -> Result<String> {
    #[derive(Serialize)]
    struct Ctx<'a> {
        form: &'a ComposeForm,
    }
    render_template("compose.html", Ctx { form })
}

/// The passphrase field that appears while "sign" is checked.
pub fn compose_passphrase(sign: bool) -> Result<String> {
    #[derive(Serialize)]
    struct Ctx {
        form: ComposeForm,
    }
    render_template(
        "compose_passphrase.html",
        Ctx {
            form: ComposeForm {
                sign,
                ..ComposeForm::default()
            },
        },
    )
}

// ──────────────────────────────────────────────────────────────────────────────
// Security panel
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct KeyRow {
    pub index: usize,
    pub key_id: String,
    pub default_key: bool,
    pub expire_date: String,
    pub encrypt: bool,
    pub encrypt_label: String,
    pub sign: bool,
    pub sign_label: String,
    pub key_size: String,
    pub created: String,
}

impl KeyRow {
    #[must_use]
    pub fn build(index: usize, key: &KeySummary) -> Self {
        Self {
            index: index + 1,
            key_id: key.key_id.clone(),
            default_key: key.default_key,
            expire_date: key.expire_date.clone(),
            encrypt: key.encrypt,
            encrypt_label: capitalize_words(&key.encrypt.to_string()),
            sign: key.sign,
            sign_label: capitalize_words(&key.sign.to_string()),
            key_size: key.key_size.map(|s| s.to_string()).unwrap_or_default(),
            created: key.created.clone(),
        }
    }
}

/// Saved recipient key shown in the lower table.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RecipientKeyRow {
    pub user: &'static str,
    pub email: &'static str,
    pub public_key: &'static str,
    pub expire: &'static str,
}

/// Placeholder rows until recipient keys are served by the API.
pub const DEMO_RECIPIENT_KEYS: &[RecipientKeyRow] = &[
    RecipientKeyRow {
        user: "John Doe",
        email: "john@mail.com",
        public_key: "ankoaidjoajd-12kj1kkad",
        expire: "12 July 2024",
    },
    RecipientKeyRow {
        user: "Jane Roe",
        email: "jane@mail.com",
        public_key: "pq81nd0a9sd-77fj2mmzq",
        expire: "03 March 2025",
    },
];

pub fn security_page() -> Result<String> {
    #[derive(Serialize)]
    struct Ctx {
        recipient_keys: &'static [RecipientKeyRow],
    }
    render_template(
        "security.html",
        Ctx {
            recipient_keys: DEMO_RECIPIENT_KEYS,
        },
    )
}

pub fn key_table(keys: &[KeySummary]) -> Result<String> {
    #[derive(Serialize)]
    struct Ctx {
        rows: Vec<KeyRow>,
    }
    let rows = keys
        .iter()
        .enumerate()
        .map(|(i, key)| KeyRow::build(i, key))
        .collect();
    render_template("security_keys.html", Ctx { rows })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRow {
    pub label: String,
    pub value: String,
}

#[must_use]
pub fn key_detail_rows(detail: &KeyDetail) -> Vec<DetailRow> {
    detail
        .iter()
        .map(|(name, value)| DetailRow {
            label: key_field_label(name).to_string(),
            value: display_value(value),
        })
        .collect()
}

pub fn key_detail_page(detail: &KeyDetail) -> Result<String> {
    #[derive(Serialize)]
    struct Ctx {
        rows: Vec<DetailRow>,
    }
    render_template(
        "key_detail.html",
        Ctx {
            rows: key_detail_rows(detail),
        },
    )
}

pub fn generate_key_page(form: &GenerateKeyForm, allow_ecdsa: bool) -> Result<String> {
    #[derive(Serialize)]
    struct Ctx<'a> {
        form: &'a GenerateKeyForm,
        key_types: Vec<&'static str>,
    }
    render_template(
        "generate_key.html",
        Ctx {
            form,
            key_types: KeyType::offered(allow_ecdsa)
                .into_iter()
                .map(KeyType::as_str)
                .collect(),
        },
    )
}

// ──────────────────────────────────────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────────────────────────────────────

/// Error text for an inline error slot.
pub fn inline_error(message: &str) -> Result<String> {
    #[derive(Serialize)]
    struct Ctx<'a> {
        message: &'a str,
    }
    render_template("inline_error.html", Ctx { message })
}

/// Whole-panel notice used when a view could not load at all.
pub fn notice(message: &str) -> Result<String> {
    #[derive(Serialize)]
    struct Ctx<'a> {
        message: &'a str,
    }
    render_template("notice.html", Ctx { message })
}
