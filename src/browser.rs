//! Browser implementations of the editor's collaborators: `sessionStorage`,
//! the task form, the submit button and `fetch`.

use futures::future::LocalBoxFuture;
use gloo_utils::document;
use log::{debug, warn};
use serde_json::{Map, Value};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{FormData, HtmlButtonElement, HtmlFormElement, Request, RequestInit, Response, Storage};

use crate::config::{BDP_FORM_ID, DATA_ELEMENT_ID, TASK_FORM_PREFIX, WRITE_BDP_BUTTON_ID};
use crate::error::EditorError;
use crate::persist::KeyValueStore;
use crate::submit::{ControlToggle, FormSource, SubmitCommand, SubmitEndpoint};
use crate::table::{TableLoad, TableViewModel};

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// `window.sessionStorage`.
pub struct SessionStore {
    storage: Storage,
}

impl SessionStore {
    pub fn open() -> Result<Self, EditorError> {
        let window = web_sys::window()
            .ok_or_else(|| EditorError::StorageUnavailable("no window".to_string()))?;
        let storage = window
            .session_storage()
            .map_err(|e| EditorError::StorageUnavailable(describe(&e)))?
            .ok_or_else(|| EditorError::StorageUnavailable("sessionStorage disabled".to_string()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for SessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), EditorError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| EditorError::StorageUnavailable(describe(&e)))
    }

    fn clear(&self) -> Result<(), EditorError> {
        self.storage
            .clear()
            .map_err(|e| EditorError::StorageUnavailable(describe(&e)))
    }
}

/// An HTML form whose named controls become payload fields.
pub struct DomForm {
    form: HtmlFormElement,
}

impl DomForm {
    pub fn by_id(id: &str) -> Result<Self, EditorError> {
        let form = document()
            .get_element_by_id(id)
            .ok_or_else(|| EditorError::MissingElement(id.to_string()))?
            .dyn_into::<HtmlFormElement>()
            .map_err(|_| EditorError::MissingElement(format!("{} (not a form)", id)))?;
        Ok(Self { form })
    }

    /// URL the form posts to.
    pub fn action(&self) -> String {
        self.form.action()
    }
}

impl FormSource for DomForm {
    /// Text entries only; a repeated name keeps its last value.
    fn fields(&self) -> Result<Map<String, Value>, EditorError> {
        let data = FormData::new_with_form(&self.form)
            .map_err(|e| EditorError::Payload(describe(&e)))?;
        let mut fields = Map::new();
        let entries = js_sys::try_iter(&data)
            .map_err(|e| EditorError::Payload(describe(&e)))?
            .ok_or_else(|| EditorError::Payload("form data is not iterable".to_string()))?;
        for entry in entries {
            let entry = js_sys::Array::from(&entry.map_err(|e| EditorError::Payload(describe(&e)))?);
            if let (Some(name), Some(value)) = (entry.get(0).as_string(), entry.get(1).as_string()) {
                fields.insert(name, Value::String(value));
            }
        }
        Ok(fields)
    }
}

/// A `<button>` located by id each time it is toggled.
pub struct DomButton {
    id: String,
}

impl DomButton {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl ControlToggle for DomButton {
    fn set_enabled(&self, enabled: bool) {
        match document()
            .get_element_by_id(&self.id)
            .and_then(|el| el.dyn_into::<HtmlButtonElement>().ok())
        {
            Some(button) => button.set_disabled(!enabled),
            None => warn!("Button '{}' not found", self.id),
        }
    }
}

/// POSTs the JSON body with `fetch`.
pub struct FetchEndpoint {
    url: String,
}

impl FetchEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl SubmitEndpoint for FetchEndpoint {
    fn send(&self, body: String) -> LocalBoxFuture<'_, Result<String, EditorError>> {
        Box::pin(async move {
            let init = RequestInit::new();
            init.set_method("POST");
            init.set_body(&JsValue::from_str(&body));
            let request = Request::new_with_str_and_init(&self.url, &init)
                .map_err(|e| EditorError::Transport(describe(&e)))?;
            request
                .headers()
                .set("Content-Type", "application/json")
                .map_err(|e| EditorError::Transport(describe(&e)))?;

            let window =
                web_sys::window().ok_or_else(|| EditorError::Transport("no window".to_string()))?;
            let response: Response = JsFuture::from(window.fetch_with_request(&request))
                .await
                .map_err(|e| EditorError::Transport(describe(&e)))?
                .dyn_into()
                .map_err(|e| EditorError::Transport(describe(&e)))?;
            if !response.ok() {
                return Err(EditorError::Rejected {
                    status: response.status(),
                });
            }
            let text = response
                .text()
                .map_err(|e| EditorError::Transport(describe(&e)))?;
            let text = JsFuture::from(text)
                .await
                .map_err(|e| EditorError::Transport(describe(&e)))?;
            Ok(text.as_string().unwrap_or_default())
        })
    }
}

/// Read the load payload from `window.lineidData`, falling back to the JSON
/// text of the `<script id="lineid-data">` element.
pub fn read_table_load() -> Result<TableLoad, EditorError> {
    if let Some(window) = web_sys::window() {
        if let Ok(value) = js_sys::Reflect::get(&window, &JsValue::from_str("lineidData")) {
            if !value.is_undefined() && !value.is_null() {
                debug!("Reading line table from window.lineidData");
                return serde_wasm_bindgen::from_value(value)
                    .map_err(|e| EditorError::InvalidTable(e.to_string()));
            }
        }
    }
    let element = document()
        .get_element_by_id(DATA_ELEMENT_ID)
        .ok_or_else(|| EditorError::MissingElement(DATA_ELEMENT_ID.to_string()))?;
    TableLoad::from_json(&element.text_content().unwrap_or_default())
}

/// Submit using the page's own form and button for `command`.
pub async fn submit_from_page(
    model: &TableViewModel,
    command: SubmitCommand,
) -> Result<String, EditorError> {
    let form_id = match command {
        SubmitCommand::ForceReject => format!("{}{}", TASK_FORM_PREFIX, model.taskid()),
        SubmitCommand::LineListBdp => BDP_FORM_ID.to_string(),
    };
    let form = DomForm::by_id(&form_id)?;
    let endpoint = FetchEndpoint::new(form.action());
    let button = DomButton::new(WRITE_BDP_BUTTON_ID);
    let control: Option<&dyn ControlToggle> = match command {
        SubmitCommand::LineListBdp => Some(&button),
        SubmitCommand::ForceReject => None,
    };
    model.submit(command, &form, &endpoint, control).await
}
