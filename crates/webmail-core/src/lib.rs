//! View routing, rendering and API client for the PGP webmail frontend
//!
//! This crate provides:
//! - The typed API client (`ApiClient`) over a pluggable `Transport`
//! - HTML fragment rendering from embedded templates
//! - The view state machine and declarative event table
//! - The view controller that ties navigation, actions and rendering together
//! - Cookie-based session lookup and client configuration

#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod forms;
pub mod models;
pub mod render;
pub mod session;
pub mod surface;
pub mod view;

// Re-export key types for convenience
pub use api::{ApiClient, ApiRequest, ApiResponse, Method, Transport};
pub use config::{ClientConfig, OwnershipRule, PanelSelectors};
pub use controller::{Epoch, Outcome, ViewController};
pub use error::{Error as WebmailError, Result as WebmailResult};
pub use forms::{ComposeForm, GenerateKeyForm};
pub use models::{Email, EmailUpdate, KeyDetail, KeySummary, KeyType, Mailbox};
pub use session::Session;
pub use surface::{MemorySurface, Surface};
pub use view::{Action, ActionKind, Binding, FieldSource, NAV_BINDINGS, Panel, Trigger, View};
