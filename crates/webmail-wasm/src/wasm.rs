//! WASM-specific implementation using wasm-bindgen.
//!
//! This module provides the JavaScript-facing API for the webmail client:
//! a `fetch` transport, a DOM surface and the `WebmailApp` entry point.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise, spawn_local};
use web_sys::{
    Document, Event, HtmlDocument, HtmlElement, HtmlInputElement, HtmlSelectElement,
    HtmlTextAreaElement, Request, RequestCredentials, RequestInit, Response, console,
};
use webmail_core::{
    Action, ApiRequest, ApiResponse, Binding, ClientConfig, FieldSource, Mailbox, NAV_BINDINGS,
    Outcome, Panel, PanelSelectors, Surface, Transport, Trigger, View, ViewController,
    WebmailError, WebmailResult,
};

use crate::{AppSnapshot, VERSION, event_name, parse_config, request_url};

type Dispatcher = Rc<dyn Fn(Action)>;
type Handler = Closure<dyn FnMut(Event)>;
type Controller = ViewController<FetchTransport, DomSurface>;

// ──────────────────────────────────────────────────────────────────────────────
// Initialization
// ──────────────────────────────────────────────────────────────────────────────

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn wasm_init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console-panic")]
    console_error_panic_hook::set_once();

    console::log_1(&format!("webmail {VERSION} initialized").into());
}

// ──────────────────────────────────────────────────────────────────────────────
// Transport
// ──────────────────────────────────────────────────────────────────────────────

/// `window.fetch` with same-origin credentials, so the session cookie rides
/// along with every call.
pub struct FetchTransport {
    base_url: String,
}

impl FetchTransport {
    #[must_use]
    pub const fn new(base_url: String) -> Self {
        Self { base_url }
    }
}

fn js_error(value: JsValue) -> WebmailError {
    WebmailError::Transport(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

impl Transport for FetchTransport {
    async fn send(&self, request: ApiRequest) -> WebmailResult<ApiResponse> {
        let window =
            web_sys::window().ok_or_else(|| WebmailError::Transport("No window".to_string()))?;

        let init = RequestInit::new();
        init.set_method(request.method.as_str());
        init.set_credentials(RequestCredentials::SameOrigin);
        if let Some(body) = &request.body {
            init.set_body(&JsValue::from_str(&body.to_string()));
        }

        let url = request_url(&self.base_url, &request.path);
        let fetch_request = Request::new_with_str_and_init(&url, &init).map_err(js_error)?;
        if request.body.is_some() {
            fetch_request
                .headers()
                .set("Content-Type", "application/json")
                .map_err(js_error)?;
        }

        let response: Response = JsFuture::from(window.fetch_with_request(&fetch_request))
            .await
            .map_err(js_error)?
            .dyn_into()
            .map_err(js_error)?;
        let text = JsFuture::from(response.text().map_err(js_error)?)
            .await
            .map_err(js_error)?;

        Ok(ApiResponse::new(
            response.status(),
            text.as_string().unwrap_or_default(),
        ))
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// DOM surface
// ──────────────────────────────────────────────────────────────────────────────

/// Renders into the page's four panel containers.
///
/// Handlers are attached through the `on*` properties, so rebinding an
/// element overwrites its previous handler instead of stacking another.
pub struct DomSurface {
    document: Document,
    panels: PanelSelectors,
    dispatcher: Rc<RefCell<Option<Dispatcher>>>,
    handlers: RefCell<HashMap<Panel, Vec<Handler>>>,
    nav_handlers: RefCell<Vec<Handler>>,
}

impl DomSurface {
    #[must_use]
    pub fn new(document: Document, panels: PanelSelectors) -> Self {
        Self {
            document,
            panels,
            dispatcher: Rc::new(RefCell::new(None)),
            handlers: RefCell::new(HashMap::new()),
            nav_handlers: RefCell::new(Vec::new()),
        }
    }

    /// Where resolved actions go. Handlers attached earlier pick it up too.
    pub fn set_dispatcher(&self, dispatcher: Dispatcher) {
        *self.dispatcher.borrow_mut() = Some(dispatcher);
    }

    /// Attach the navigation bar handlers. Call once.
    pub fn bind_nav(&self) {
        let mut handlers = Vec::new();
        for binding in NAV_BINDINGS {
            let Some(element) = self
                .document
                .query_selector(binding.selector)
                .ok()
                .flatten()
                .and_then(|e| e.dyn_into::<HtmlElement>().ok())
            else {
                console::warn_1(&format!("nav element {} not found", binding.selector).into());
                continue;
            };
            handlers.push(self.attach(&element, *binding));
        }
        *self.nav_handlers.borrow_mut() = handlers;
    }

    fn panel_element(&self, panel: Panel) -> Option<HtmlElement> {
        self.document
            .query_selector(self.panels.selector(panel))
            .ok()
            .flatten()
            .and_then(|e| e.dyn_into::<HtmlElement>().ok())
    }

    fn attach(&self, element: &HtmlElement, binding: Binding) -> Handler {
        let dispatcher = Rc::clone(&self.dispatcher);
        let document = self.document.clone();
        let target = element.clone();
        let handler = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            if binding.trigger != Trigger::Change {
                event.prevent_default();
            }
            let fields = DomFields {
                element: &target,
                document: &document,
            };
            let Some(action) = binding.action.resolve(&fields) else {
                console::warn_1(
                    &format!(
                        "ignored {} on {}: missing data",
                        event_name(binding.trigger),
                        binding.selector
                    )
                    .into(),
                );
                return;
            };
            let dispatch = dispatcher.borrow().clone();
            if let Some(dispatch) = dispatch {
                dispatch(action);
            }
        });

        let callback = Some(handler.as_ref().unchecked_ref());
        match binding.trigger {
            Trigger::Click => element.set_onclick(callback),
            Trigger::Submit => element.set_onsubmit(callback),
            Trigger::Change => element.set_onchange(callback),
        }
        handler
    }
}

impl Surface for DomSurface {
    fn show_panel(&self, panel: Panel) {
        for candidate in Panel::ALL {
            let Some(element) = self.panel_element(candidate) else {
                continue;
            };
            let display = if candidate == panel { "block" } else { "none" };
            if let Err(err) = element.style().set_property("display", display) {
                console::error_2(&"failed to toggle panel".into(), &err);
            }
        }
    }

    fn replace_panel(&self, panel: Panel, html: &str) {
        if let Some(element) = self.panel_element(panel) {
            element.set_inner_html(html);
        }
        // Old markup is detached; its handlers can no longer fire.
        self.handlers.borrow_mut().remove(&panel);
    }

    fn set_slot(&self, slot: &str, html: &str) {
        match self.document.get_element_by_id(slot) {
            Some(element) => element.set_inner_html(html),
            None => console::warn_1(&format!("slot #{slot} not in document").into()),
        }
    }

    fn bind(&self, panel: Panel, bindings: &[Binding]) {
        let Some(container) = self.panel_element(panel) else {
            return;
        };
        let mut handlers = Vec::new();
        for binding in bindings {
            let Ok(nodes) = container.query_selector_all(binding.selector) else {
                continue;
            };
            for index in 0..nodes.length() {
                let Some(element) = nodes
                    .item(index)
                    .and_then(|node| node.dyn_into::<HtmlElement>().ok())
                else {
                    continue;
                };
                handlers.push(self.attach(&element, *binding));
            }
        }
        // New handlers are installed before the old ones drop.
        self.handlers.borrow_mut().insert(panel, handlers);
    }

    fn cookie_header(&self) -> String {
        self.document
            .dyn_ref::<HtmlDocument>()
            .and_then(|doc| doc.cookie().ok())
            .unwrap_or_default()
    }

    fn clear_local_store(&self) {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if let Some(storage) = storage {
            if let Err(err) = storage.clear() {
                console::error_2(&"failed to clear localStorage".into(), &err);
            }
        }
    }
}

/// Form controls and the fired element, as seen by action resolution.
struct DomFields<'a> {
    element: &'a HtmlElement,
    document: &'a Document,
}

impl FieldSource for DomFields<'_> {
    fn attr(&self, name: &str) -> Option<String> {
        self.element.get_attribute(name)
    }

    fn value(&self, id: &str) -> Option<String> {
        let element = self.document.get_element_by_id(id)?;
        if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            return Some(input.value());
        }
        if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
            return Some(textarea.value());
        }
        element
            .dyn_ref::<HtmlSelectElement>()
            .map(HtmlSelectElement::value)
    }

    fn checked(&self, id: &str) -> bool {
        self.document
            .get_element_by_id(id)
            .and_then(|e| e.dyn_into::<HtmlInputElement>().ok())
            .is_some_and(|input| input.checked())
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Main Application
// ──────────────────────────────────────────────────────────────────────────────

/// Webmail client for the browser.
///
/// # Example
///
/// ```javascript
/// const app = WebmailApp.from_config('{"allow_ecdsa": true}');
/// await app.start();
/// await app.navigate('security');
/// ```
#[wasm_bindgen]
pub struct WebmailApp {
    controller: Rc<Controller>,
}

#[wasm_bindgen]
impl WebmailApp {
    /// Create an application with the default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WebmailApp, JsValue> {
        Self::build(ClientConfig::default())
    }

    /// Create with full configuration.
    #[wasm_bindgen]
    pub fn from_config(config_json: &str) -> Result<WebmailApp, JsValue> {
        let config = parse_config(config_json).map_err(|e| JsValue::from_str(&e))?;
        Self::build(config)
    }

    /// Bind the navigation bar and load the inbox.
    #[wasm_bindgen]
    pub fn start(&self) -> js_sys::Promise {
        let controller = Rc::clone(&self.controller);
        future_to_promise(async move {
            controller.surface().bind_nav();
            settle(controller.show_mailbox(Mailbox::Inbox).await)
        })
    }

    /// Switch to a view by its navigation name (`inbox`, `compose`, ...).
    #[wasm_bindgen]
    pub fn navigate(&self, name: &str) -> js_sys::Promise {
        let controller = Rc::clone(&self.controller);
        let view = View::from_nav_name(name);
        let name = name.to_string();
        future_to_promise(async move {
            let view = view.ok_or_else(|| JsValue::from_str(&format!("Unknown view: {name}")))?;
            settle(controller.open(view).await)
        })
    }

    /// Current view and signed-in address.
    #[wasm_bindgen]
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        let snapshot = AppSnapshot::new(self.controller.current_view(), &self.controller.session());
        serde_wasm_bindgen::to_value(&snapshot).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen]
    pub fn version() -> String {
        VERSION.to_string()
    }
}

impl WebmailApp {
    fn build(config: ClientConfig) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or("No window")?;
        let document = window.document().ok_or("No document")?;

        let surface = DomSurface::new(document, config.panels.clone());
        let transport = FetchTransport::new(config.base_url.clone());
        let controller = Rc::new(ViewController::new(transport, surface, config));

        let weak = Rc::downgrade(&controller);
        controller.surface().set_dispatcher(Rc::new(move |action| {
            let Some(controller) = weak.upgrade() else {
                return;
            };
            spawn_local(async move {
                if let Err(err) = settle(controller.dispatch(action).await) {
                    console::error_1(&err);
                }
            });
        }));

        Ok(Self { controller })
    }
}

fn settle(result: WebmailResult<Outcome>) -> Result<JsValue, JsValue> {
    match result {
        Ok(Outcome::Rendered) => Ok(JsValue::from_str("rendered")),
        Ok(Outcome::Stale) => Ok(JsValue::from_str("stale")),
        Ok(Outcome::Rejected(message)) => {
            console::warn_1(&message.clone().into());
            Ok(JsValue::from_str(&message))
        }
        Err(err) => Err(JsValue::from_str(&format!("[{}] {err}", err.error_type()))),
    }
}
