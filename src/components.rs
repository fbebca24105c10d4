//! Yew view components for the line-ID table editor.
//!
//! Components hold no table state of their own: they read the view-model's
//! observables through hooks and write user input straight back into the
//! row fields.

use std::rc::Rc;

use lineid_editor::browser::submit_from_page;
use lineid_editor::config::WRITE_BDP_BUTTON_ID;
use lineid_editor::table::ValidationIssue;
use lineid_editor::{Disposition, HeaderColumn, LineRow, SubmitCommand, TableViewModel};
use log::warn;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::hooks::{use_observable, use_row_changes};

/// Columns rendered as text inputs; every other column is read-only.
const EDITABLE_COLUMNS: [&str; 7] = [
    "uid",
    "formula",
    "name",
    "transition",
    "velocity",
    "startchan",
    "endchan",
];

/// Synthetic accept/force/reject columns are the only ones without a unit.
fn disposition_column(col: &HeaderColumn) -> Option<Disposition> {
    if col.unit.is_empty() {
        Disposition::from_label(&col.name)
    } else {
        None
    }
}

#[derive(Properties)]
pub struct TableEditorProps {
    pub model: Rc<TableViewModel>,
}

impl PartialEq for TableEditorProps {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.model, &other.model)
    }
}

/// Full editor: header, one row per line, and the action buttons.
#[function_component(TableEditor)]
pub fn table_editor(props: &TableEditorProps) -> Html {
    let model = &props.model;
    let rows = use_observable(&model.rows);
    let header = Rc::new(use_observable(&model.header));
    let visible = Rc::new(use_observable(&model.visible));
    let issues = use_state(Vec::<ValidationIssue>::new);

    let on_add = {
        let model = Rc::clone(model);
        Callback::from(move |_: MouseEvent| {
            model.add();
        })
    };
    let on_reset = {
        let model = Rc::clone(model);
        let issues = issues.clone();
        Callback::from(move |_: MouseEvent| {
            model.reset();
            issues.set(Vec::new());
        })
    };
    let on_validate = {
        let model = Rc::clone(model);
        let issues = issues.clone();
        Callback::from(move |_: MouseEvent| issues.set(model.validate().issues))
    };
    let on_toggle_hidden = {
        let model = Rc::clone(model);
        Callback::from(move |_: MouseEvent| {
            model.toggle_hidden();
        })
    };
    let submit = |command: SubmitCommand| {
        let model = Rc::clone(model);
        Callback::from(move |_: MouseEvent| {
            let model = Rc::clone(&model);
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = submit_from_page(&model, command).await {
                    warn!("{}", e);
                }
            });
        })
    };

    html! {
        <div class="lineid-editor">
            <table class="lineid-table">
                <thead>
                    <tr>
                        { for header.iter().zip(visible.iter()).filter(|(_, shown)| **shown).map(|(col, _)| html! {
                            <th>{ col.name.clone() }<br/>{ col.unit.clone() }</th>
                        }) }
                    </tr>
                </thead>
                <tbody>
                    { for rows.iter().map(|row| html! {
                        <RowEditor
                            key={row.ordinal}
                            row={Rc::clone(row)}
                            header={Rc::clone(&header)}
                            visible={Rc::clone(&visible)}
                        />
                    }) }
                </tbody>
            </table>
            <div class="lineid-actions">
                <button type="button" onclick={on_add}>{ "Add line" }</button>
                <button type="button" onclick={on_reset}>{ "Reset" }</button>
                <button type="button" onclick={on_toggle_hidden}>{ "Show/hide columns" }</button>
                <button type="button" onclick={on_validate}>{ "Validate" }</button>
                <button type="button" onclick={submit(SubmitCommand::ForceReject)}>
                    { "Apply force/reject" }
                </button>
                <button type="button" id={WRITE_BDP_BUTTON_ID} onclick={submit(SubmitCommand::LineListBdp)}>
                    { "Write line list" }
                </button>
            </div>
            if !issues.is_empty() {
                <ul class="validation-issues">
                    { for issues.iter().map(|issue| html! { <li>{ issue.to_string() }</li> }) }
                </ul>
            }
        </div>
    }
}

#[derive(Properties)]
pub struct RowEditorProps {
    pub row: Rc<LineRow>,
    pub header: Rc<Vec<HeaderColumn>>,
    pub visible: Rc<Vec<bool>>,
}

impl PartialEq for RowEditorProps {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.row, &other.row)
            && self.header == other.header
            && self.visible == other.visible
    }
}

/// One table row: radio buttons for the disposition, then the data cells.
#[function_component(RowEditor)]
pub fn row_editor(props: &RowEditorProps) -> Html {
    use_row_changes(&props.row);
    let row = &props.row;
    let current = row.disposition();

    let cells = props
        .header
        .iter()
        .zip(props.visible.iter())
        .filter(|(_, shown)| **shown)
        .map(|(col, _)| {
            if let Some(choice) = disposition_column(col) {
                let onchange = {
                    let row = Rc::clone(row);
                    Callback::from(move |_: Event| row.set_disposition(choice))
                };
                return html! {
                    <td class="disposition">
                        <input
                            type="radio"
                            name={row.group_token().to_string()}
                            value={choice.label()}
                            checked={current == choice}
                            {onchange}
                        />
                    </td>
                };
            }

            let text = row.cell_text(&col.name).unwrap_or_default();
            if EDITABLE_COLUMNS.contains(&col.name.as_str()) {
                let onchange = {
                    let row = Rc::clone(row);
                    let column = col.name.clone();
                    Callback::from(move |e: Event| {
                        let input: HtmlInputElement = e.target_unchecked_into();
                        row.edit_cell(&column, &input.value());
                    })
                };
                html! { <td><input type="text" value={text} {onchange} /></td> }
            } else {
                html! { <td>{ text }</td> }
            }
        });

    html! {
        <tr class={classes!(current.label())}>
            { for cells }
        </tr>
    }
}
