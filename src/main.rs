//! Browser entry point for the line-ID table editor.
//! Opens session storage, loads the table handed over by the page and mounts
//! the Yew components.

use std::rc::Rc;

use lineid_editor::browser::{read_table_load, SessionStore};
use lineid_editor::config::MOUNT_ELEMENT_ID;
use lineid_editor::{KeyValueStore, MemoryStore, TableViewModel};
use log::{info, warn};
use yew::prelude::*;

mod components;
mod hooks;

use components::TableEditor;

#[derive(Properties)]
pub struct AppProps {
    pub model: Rc<TableViewModel>,
}

impl PartialEq for AppProps {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.model, &other.model)
    }
}

#[function_component]
pub fn App(props: &AppProps) -> Html {
    html! {
        <div class="lineid-app">
            <h3>{ format!("Line identifications (task {})", props.model.taskid()) }</h3>
            <TableEditor model={Rc::clone(&props.model)} />
        </div>
    }
}

/// Session storage, or an in-memory store when the browser refuses it.
fn open_store() -> Rc<dyn KeyValueStore> {
    match SessionStore::open() {
        Ok(store) => Rc::new(store),
        Err(e) => {
            warn!("{}; edits will not survive a reload", e);
            Rc::new(MemoryStore::new())
        }
    }
}

fn main() {
    console_error_panic_hook::set_once();

    let model = Rc::new(TableViewModel::new(open_store()));
    match read_table_load() {
        Ok(load) => model.initialize(load),
        Err(e) => warn!("Starting with an empty table: {}", e),
    }
    info!("Line-ID editor ready with {} rows", model.row_count());

    let props = AppProps { model };
    match gloo_utils::document().get_element_by_id(MOUNT_ELEMENT_ID) {
        Some(root) => {
            yew::Renderer::<App>::with_root_and_props(root, props).render();
        }
        None => {
            yew::Renderer::<App>::with_props(props).render();
        }
    }
}
