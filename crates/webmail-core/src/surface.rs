//! The document the controller draws on.
//!
//! [`Surface`] is the narrow set of document operations the controller
//! needs. The browser crate implements it over the DOM; [`MemorySurface`]
//! keeps everything in memory for tests and headless embedders.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::view::{Binding, Panel};

pub trait Surface {
    /// Make `panel` the only visible top-level container.
    fn show_panel(&self, panel: Panel);
    /// Replace the whole content of `panel`.
    fn replace_panel(&self, panel: Panel, html: &str);
    /// Replace the content of the element with id `slot`.
    fn set_slot(&self, slot: &str, html: &str);
    /// Attach `bindings` to the panel's current markup, dropping every
    /// handler previously attached to that panel.
    fn bind(&self, panel: Panel, bindings: &[Binding]);
    /// Raw `document.cookie` style header.
    fn cookie_header(&self) -> String;
    /// Wipe the browser-local key/value store (cache-bust marker).
    fn clear_local_store(&self);
}

#[derive(Debug, Default, Clone)]
struct MemoryState {
    visible: HashMap<Panel, bool>,
    content: HashMap<Panel, String>,
    slots: HashMap<String, String>,
    bindings: HashMap<Panel, Vec<Binding>>,
    cookie: String,
    store_clears: usize,
}

/// In-memory [`Surface`].
///
/// Slots are tracked by id. Replacing a panel forgets the slots whose
/// elements lived in its old markup; slots of other panels are kept.
#[derive(Debug, Default)]
pub struct MemorySurface {
    state: RefCell<MemoryState>,
}

impl MemorySurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cookie(cookie: impl Into<String>) -> Self {
        let surface = Self::default();
        surface.state.borrow_mut().cookie = cookie.into();
        surface
    }

    pub fn set_cookie(&self, cookie: impl Into<String>) {
        self.state.borrow_mut().cookie = cookie.into();
    }

    #[must_use]
    pub fn visible_panels(&self) -> Vec<Panel> {
        let state = self.state.borrow();
        Panel::ALL
            .into_iter()
            .filter(|p| state.visible.get(p).copied().unwrap_or(false))
            .collect()
    }

    #[must_use]
    pub fn is_visible(&self, panel: Panel) -> bool {
        self.state.borrow().visible.get(&panel).copied().unwrap_or(false)
    }

    /// Panel markup with every slot written since the last replace.
    #[must_use]
    pub fn content(&self, panel: Panel) -> String {
        let state = self.state.borrow();
        let mut html = state.content.get(&panel).cloned().unwrap_or_default();
        let mut slots: Vec<_> = state.slots.iter().collect();
        slots.sort();
        for (id, slot_html) in slots {
            if html.contains(&format!("id=\"{id}\"")) {
                html.push_str(slot_html);
            }
        }
        html
    }

    #[must_use]
    pub fn slot(&self, id: &str) -> Option<String> {
        self.state.borrow().slots.get(id).cloned()
    }

    #[must_use]
    pub fn bindings(&self, panel: Panel) -> Vec<Binding> {
        self.state
            .borrow()
            .bindings
            .get(&panel)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn store_clears(&self) -> usize {
        self.state.borrow().store_clears
    }
}

impl Surface for MemorySurface {
    fn show_panel(&self, panel: Panel) {
        let mut state = self.state.borrow_mut();
        for p in Panel::ALL {
            state.visible.insert(p, p == panel);
        }
    }

    fn replace_panel(&self, panel: Panel, html: &str) {
        let mut state = self.state.borrow_mut();
        let old = state.content.insert(panel, html.to_string()).unwrap_or_default();
        state
            .slots
            .retain(|id, _| !old.contains(&format!("id=\"{id}\"")));
        state.bindings.remove(&panel);
    }

    fn set_slot(&self, slot: &str, html: &str) {
        self.state
            .borrow_mut()
            .slots
            .insert(slot.to_string(), html.to_string());
    }

    fn bind(&self, panel: Panel, bindings: &[Binding]) {
        self.state
            .borrow_mut()
            .bindings
            .insert(panel, bindings.to_vec());
    }

    fn cookie_header(&self) -> String {
        self.state.borrow().cookie.clone()
    }

    fn clear_local_store(&self) {
        self.state.borrow_mut().store_clears += 1;
    }
}
