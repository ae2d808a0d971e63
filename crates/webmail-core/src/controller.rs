//! View controller: owns which view is showing and wires user actions to
//! API calls and renders.
//!
//! Every navigation bumps a navigation epoch. Work that awaits the network
//! captures the epoch first and re-checks it before touching the surface,
//! so a slow response can never paint over a view the user already left.

use std::cell::{Cell, RefCell};

use crate::api::{ApiClient, Transport};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::forms::{ComposeForm, GenerateKeyForm, reply_draft};
use crate::models::{Email, EmailUpdate, Mailbox};
use crate::render::{self, EmailActions, EmailPage, MailboxCard, requires_passphrase};
use crate::session::Session;
use crate::surface::Surface;
use crate::view::{Action, Panel, View, slots};

/// How an operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The target view (or fragment) was drawn.
    Rendered,
    /// A server or validation error was shown inline; nothing else changed.
    Rejected(String),
    /// The user navigated away while the request was in flight; the result
    /// was dropped.
    Stale,
}

/// Navigation epoch captured when an operation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

/// The single message on screen, kept for the archive toggle and reply.
#[derive(Debug, Clone)]
struct OpenEmail {
    email: Email,
    mailbox: Mailbox,
    /// An archive update for this message is awaiting the server.
    archiving: bool,
}

/// Drives the panels: navigation, bound user actions and the fragments they
/// render onto the [`Surface`].
///
/// Every server-backed operation captures the navigation [`Epoch`] before
/// awaiting, and a result that arrives after the user has moved on returns
/// [`Outcome::Stale`] without touching the surface.
pub struct ViewController<T, S> {
    api: ApiClient<T>,
    surface: S,
    config: ClientConfig,
    view: RefCell<View>,
    open_email: RefCell<Option<OpenEmail>>,
    epoch: Cell<u64>,
}

impl<T: Transport, S: Surface> ViewController<T, S> {
    pub fn new(transport: T, surface: S, config: ClientConfig) -> Self {
        Self {
            api: ApiClient::new(transport),
            surface,
            config,
            view: RefCell::new(View::default()),
            open_email: RefCell::new(None),
            epoch: Cell::new(0),
        }
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }

    pub const fn api(&self) -> &ApiClient<T> {
        &self.api
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn current_view(&self) -> View {
        self.view.borrow().clone()
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        Epoch(self.epoch.get())
    }

    #[must_use]
    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.epoch.get() == epoch.0
    }

    /// Identity of the viewer, re-read from the cookie on every call.
    #[must_use]
    pub fn session(&self) -> Session {
        Session::from_cookie_header(&self.surface.cookie_header(), &self.config.user_cookie)
    }

    // ──────────────────────────────────────────────────────────────────────
    // Dispatch
    // ──────────────────────────────────────────────────────────────────────

    /// Render dispatcher keyed on the view.
    pub async fn open(&self, view: View) -> Result<Outcome> {
        match view {
            View::Mailbox(mailbox) => self.show_mailbox(mailbox).await,
            View::Email { id, mailbox } => self.show_email(id, mailbox).await,
            View::Compose => self.show_compose(),
            View::Security => self.show_security().await,
            View::KeyDetail(key_id) => self.show_key_detail(&key_id).await,
            View::GenerateKeyForm => self.show_generate_key_form(),
            View::PassphrasePrompt { id, .. } => self.show_passphrase_prompt(id),
        }
    }

    /// Entry point for every bound event.
    pub async fn dispatch(&self, action: Action) -> Result<Outcome> {
        tracing::debug!(?action, "dispatch");
        match action {
            Action::ShowMailbox(mailbox) => self.show_mailbox(mailbox).await,
            Action::ShowEmail { id, mailbox } => self.show_email(id, mailbox).await,
            Action::ShowCompose => self.show_compose(),
            Action::ShowSecurity => self.show_security().await,
            Action::ToggleArchive { id } => self.toggle_archive(id).await,
            Action::Reply { id } => self.reply(id).await,
            Action::ShowPassphrasePrompt { id } => self.show_passphrase_prompt(id),
            Action::SubmitPassphrase { id, passphrase } => {
                self.submit_passphrase(id, &passphrase).await
            }
            Action::ToggleSign { checked } => self.toggle_sign(checked),
            Action::SendEmail(form) => self.send_email(&form).await,
            Action::ShowKeyDetail { key_id } => self.show_key_detail(&key_id).await,
            Action::DeleteKey { key_id } => self.delete_key(&key_id).await,
            Action::ShowGenerateKeyForm => self.show_generate_key_form(),
            Action::GenerateKey(form) => self.generate_key(&form).await,
        }
    }

    // ──────────────────────────────────────────────────────────────────────
    // Mailboxes and messages
    // ──────────────────────────────────────────────────────────────────────

    pub async fn show_mailbox(&self, mailbox: Mailbox) -> Result<Outcome> {
        let view = View::Mailbox(mailbox);
        let epoch = self.begin(&view);
        self.surface
            .replace_panel(Panel::Mailbox, &render::mailbox_page(mailbox)?);

        let result = self.api.list_mailbox(mailbox).await;
        if !self.is_current(epoch) {
            return Ok(Outcome::Stale);
        }
        let emails = match result {
            Ok(emails) => emails,
            Err(err) => return self.fail(slots::MAILBOX_ERROR, err),
        };

        let session = self.session();
        let cards: Vec<MailboxCard> = emails
            .iter()
            .map(|email| {
                MailboxCard::build(
                    mailbox,
                    email,
                    &session,
                    self.config.ownership_rule,
                    self.config.preview_chars,
                )
            })
            .collect();
        self.surface
            .set_slot(slots::MAILBOX_ITEMS, &render::mailbox_cards(&cards)?);
        self.rebind(&view);
        tracing::debug!(mailbox = %mailbox, count = cards.len(), "mailbox rendered");
        Ok(Outcome::Rendered)
    }

    pub async fn show_email(&self, id: i64, mailbox: Mailbox) -> Result<Outcome> {
        let view = View::Email { id, mailbox };
        let epoch = self.begin(&view);
        self.surface.replace_panel(Panel::Email, "");

        let result = self.api.get_email(id).await;
        if !self.is_current(epoch) {
            return Ok(Outcome::Stale);
        }
        let email = match result {
            Ok(email) => email,
            Err(err) => return self.fail_panel(Panel::Email, err),
        };

        let locked = requires_passphrase(&email, &self.session(), self.config.ownership_rule);
        self.present_email(epoch, &view, mailbox, email, locked, false)
            .await
    }

    /// Flip `archived` on the open message and redraw its action bar.
    pub async fn toggle_archive(&self, id: i64) -> Result<Outcome> {
        let epoch = self.epoch();
        let target = self
            .open_email
            .borrow_mut()
            .as_mut()
            .filter(|open| open.email.id == id)
            .map(|open| {
                if open.archiving {
                    None
                } else {
                    open.archiving = true;
                    Some(!open.email.archived)
                }
            });
        let archived = match target {
            Some(Some(archived)) => archived,
            Some(None) => {
                return self.fail(
                    slots::EMAIL_STATUS,
                    Error::InvalidInput("An archive update is already in progress.".to_string()),
                );
            }
            None => {
                return self.fail(
                    slots::EMAIL_STATUS,
                    Error::InvalidInput("This message is no longer open.".to_string()),
                );
            }
        };

        let result = self
            .api
            .update_email(id, EmailUpdate::Archived(archived))
            .await;
        if !self.is_current(epoch) {
            return Ok(Outcome::Stale);
        }

        let actions = {
            let mut held = self.open_email.borrow_mut();
            let Some(open) = held.as_mut().filter(|open| open.email.id == id) else {
                return Ok(Outcome::Stale);
            };
            open.archiving = false;
            if result.is_ok() {
                open.email.archived = archived;
            }
            EmailActions::build(open.mailbox, &open.email)
        };
        if let Err(err) = result {
            return self.fail(slots::EMAIL_STATUS, err);
        }
        self.surface
            .set_slot(slots::EMAIL_ACTIONS, &render::email_actions(&actions)?);
        self.surface.set_slot(slots::EMAIL_STATUS, "");
        self.rebind(&self.current_view());
        tracing::debug!(id, archived, "archive toggled");
        Ok(Outcome::Rendered)
    }

    /// Open the compose form answering message `id`.
    pub async fn reply(&self, id: i64) -> Result<Outcome> {
        let email = match self.open_email_with_id(id) {
            Some(open) => open.email,
            None => {
                let epoch = self.epoch();
                let result = self.api.get_email(id).await;
                if !self.is_current(epoch) {
                    return Ok(Outcome::Stale);
                }
                match result {
                    Ok(email) => email,
                    Err(err) => return self.fail(slots::EMAIL_STATUS, err),
                }
            }
        };
        self.show_reply(&reply_draft(&email))
    }

    pub fn show_passphrase_prompt(&self, id: i64) -> Result<Outcome> {
        let mailbox = match self.current_view() {
            View::Email { mailbox, .. } | View::PassphrasePrompt { mailbox, .. } => mailbox,
            _ => Mailbox::Inbox,
        };
        let view = View::PassphrasePrompt { id, mailbox };
        self.begin(&view);
        self.surface
            .replace_panel(Panel::Email, &render::passphrase_prompt(id)?);
        self.rebind(&view);
        Ok(Outcome::Rendered)
    }

    /// Ask the server to decrypt message `id` and show it.
    pub async fn submit_passphrase(&self, id: i64, passphrase: &str) -> Result<Outcome> {
        if passphrase.is_empty() {
            return self.fail(
                slots::PASSPHRASE_ERROR,
                Error::InvalidInput("Passphrase is required".to_string()),
            );
        }

        let epoch = self.epoch();
        let result = self.api.decrypt_email(id, passphrase).await;
        if !self.is_current(epoch) {
            return Ok(Outcome::Stale);
        }
        let email = match result {
            Ok(email) => email,
            Err(err) => {
                tracing::warn!(id, error_type = err.error_type(), "decrypt failed: {err}");
                return self.fail(
                    slots::PASSPHRASE_ERROR,
                    Error::InvalidInput("Invalid passphrase".to_string()),
                );
            }
        };

        let mailbox = match self.current_view() {
            View::PassphrasePrompt { mailbox, .. } => mailbox,
            _ => Mailbox::Inbox,
        };
        let view = View::Email { id, mailbox };
        let epoch = self.begin(&view);
        self.present_email(epoch, &view, mailbox, email, false, true)
            .await
    }

    /// Draw a message, then mark it read once if its body is visible.
    async fn present_email(
        &self,
        epoch: Epoch,
        view: &View,
        mailbox: Mailbox,
        email: Email,
        locked: bool,
        decrypted: bool,
    ) -> Result<Outcome> {
        let id = email.id;
        let page = EmailPage::build(mailbox, email.clone(), locked, decrypted);
        self.surface
            .replace_panel(Panel::Email, &render::email_page(&page)?);
        self.rebind(view);
        if locked {
            return Ok(Outcome::Rendered);
        }

        *self.open_email.borrow_mut() = Some(OpenEmail {
            email,
            mailbox,
            archiving: false,
        });
        let result = self.api.update_email(id, EmailUpdate::Read(true)).await;
        if !self.is_current(epoch) {
            return Ok(Outcome::Rendered);
        }
        match result {
            Ok(()) => {
                if let Some(open) = self.open_email.borrow_mut().as_mut() {
                    open.email.read = true;
                }
            }
            Err(err) => {
                tracing::warn!(id, error_type = err.error_type(), "mark as read failed: {err}");
                self.surface.set_slot(
                    slots::EMAIL_STATUS,
                    &render::inline_error("Could not mark the message as read.")?,
                );
            }
        }
        Ok(Outcome::Rendered)
    }

    // ──────────────────────────────────────────────────────────────────────
    // Compose
    // ──────────────────────────────────────────────────────────────────────

    pub fn show_compose(&self) -> Result<Outcome> {
        self.show_reply(&ComposeForm::default())
    }

    /// Compose form prefilled with `draft`.
    pub fn show_reply(&self, draft: &ComposeForm) -> Result<Outcome> {
        let view = View::Compose;
        self.begin(&view);
        self.surface
            .replace_panel(Panel::Compose, &render::compose_page(draft)?);
        self.rebind(&view);
        Ok(Outcome::Rendered)
    }

    /// Show or hide the passphrase field as "sign" is toggled.
    pub fn toggle_sign(&self, checked: bool) -> Result<Outcome> {
        if self.current_view() != View::Compose {
            return Ok(Outcome::Stale);
        }
        self.surface
            .set_slot(slots::COMPOSE_PASSPHRASE, &render::compose_passphrase(checked)?);
        Ok(Outcome::Rendered)
    }

    pub async fn send_email(&self, form: &ComposeForm) -> Result<Outcome> {
        let request = match form.validate() {
            Ok(request) => request,
            Err(err) => return self.fail(slots::COMPOSE_ERROR, err),
        };

        let epoch = self.epoch();
        let result = self.api.send_email(&request).await;
        if !self.is_current(epoch) {
            return Ok(Outcome::Stale);
        }
        if let Err(err) = result {
            return self.fail(slots::COMPOSE_ERROR, err);
        }

        tracing::info!(encrypt = request.encrypt, sign = request.sign, "email sent");
        self.surface.clear_local_store();
        self.show_mailbox(Mailbox::Sent).await
    }

    // ──────────────────────────────────────────────────────────────────────
    // Security panel
    // ──────────────────────────────────────────────────────────────────────

    pub async fn show_security(&self) -> Result<Outcome> {
        let view = View::Security;
        let epoch = self.begin(&view);
        self.surface
            .replace_panel(Panel::Security, &render::security_page()?);
        self.rebind(&view);

        let result = self.api.list_keys().await;
        if !self.is_current(epoch) {
            return Ok(Outcome::Stale);
        }
        match result {
            Ok(keys) => {
                self.surface
                    .set_slot(slots::SECURITY_KEYS, &render::key_table(&keys)?);
                self.rebind(&view);
                Ok(Outcome::Rendered)
            }
            Err(err) => {
                self.surface.set_slot(slots::SECURITY_KEYS, "");
                self.fail(slots::SECURITY_ERROR, err)
            }
        }
    }

    pub async fn show_key_detail(&self, key_id: &str) -> Result<Outcome> {
        let view = View::KeyDetail(key_id.to_string());
        let epoch = self.begin(&view);
        self.surface.replace_panel(Panel::Security, "");

        let result = self.api.get_key(key_id).await;
        if !self.is_current(epoch) {
            return Ok(Outcome::Stale);
        }
        let detail = match result {
            Ok(detail) => detail,
            Err(err) => return self.fail_panel(Panel::Security, err),
        };
        self.surface
            .replace_panel(Panel::Security, &render::key_detail_page(&detail)?);
        self.rebind(&view);
        Ok(Outcome::Rendered)
    }

    /// Delete a key, then reload the panel from a fresh fetch.
    pub async fn delete_key(&self, key_id: &str) -> Result<Outcome> {
        let epoch = self.epoch();
        let result = self.api.delete_key(key_id).await;
        if !self.is_current(epoch) {
            return Ok(Outcome::Stale);
        }
        if let Err(err) = result {
            return self.fail(slots::SECURITY_ERROR, err);
        }
        tracing::info!(key_id, "key deleted");
        self.show_security().await
    }

    pub fn show_generate_key_form(&self) -> Result<Outcome> {
        let view = View::GenerateKeyForm;
        self.begin(&view);
        self.surface.replace_panel(
            Panel::Security,
            &render::generate_key_page(&GenerateKeyForm::default(), self.config.allow_ecdsa)?,
        );
        self.rebind(&view);
        Ok(Outcome::Rendered)
    }

    pub async fn generate_key(&self, form: &GenerateKeyForm) -> Result<Outcome> {
        let request = match form.validate(self.config.allow_ecdsa) {
            Ok(request) => request,
            Err(err) => return self.fail(slots::GENERATE_ERROR, err),
        };

        let epoch = self.epoch();
        let result = self.api.generate_key(&request).await;
        if !self.is_current(epoch) {
            return Ok(Outcome::Stale);
        }
        if let Err(err) = result {
            return self.fail(slots::GENERATE_ERROR, err);
        }

        tracing::info!(key_type = request.key_type.as_str(), key_size = request.key_size, "key generated");
        self.surface.clear_local_store();
        self.show_security().await
    }

    // ──────────────────────────────────────────────────────────────────────
    // Helpers
    // ──────────────────────────────────────────────────────────────────────

    /// Switch to `view`: new epoch, only its panel visible.
    fn begin(&self, view: &View) -> Epoch {
        let epoch = self.epoch.get().wrapping_add(1);
        self.epoch.set(epoch);
        *self.view.borrow_mut() = view.clone();
        *self.open_email.borrow_mut() = None;
        self.surface.show_panel(view.panel());
        tracing::debug!(?view, epoch, "view switched");
        Epoch(epoch)
    }

    fn rebind(&self, view: &View) {
        self.surface.bind(view.panel(), view.bindings());
    }

    fn open_email_with_id(&self, id: i64) -> Option<OpenEmail> {
        self.open_email
            .borrow()
            .as_ref()
            .filter(|open| open.email.id == id)
            .cloned()
    }

    /// Show a user-facing error in `slot`; log and return anything else.
    fn fail(&self, slot: &str, err: Error) -> Result<Outcome> {
        if err.is_user_facing() {
            let message = err.to_string();
            self.surface
                .set_slot(slot, &render::inline_error(&message)?);
            return Ok(Outcome::Rejected(message));
        }
        tracing::error!(error_type = err.error_type(), "{err}");
        Err(err)
    }

    /// Like [`Self::fail`] for views that have nothing to show without data.
    fn fail_panel(&self, panel: Panel, err: Error) -> Result<Outcome> {
        if err.is_user_facing() {
            let message = err.to_string();
            self.surface.replace_panel(panel, &render::notice(&message)?);
            return Ok(Outcome::Rejected(message));
        }
        tracing::error!(error_type = err.error_type(), "{err}");
        Err(err)
    }
}
