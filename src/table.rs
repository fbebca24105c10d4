//! The line-ID table view-model: rows, header metadata and the load / edit /
//! reset / submit lifecycle.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{DISPOSITION_COLUMNS, HIDDEN_COLUMNS};
use crate::error::EditorError;
use crate::persist::KeyValueStore;
use crate::reactive::Observable;
use crate::row::{Disposition, LineRecord, LineRow};
use crate::submit::{build_payload, ControlToggle, FormSource, SubmitCommand, SubmitEndpoint};

/// The line table as produced by the pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineTable {
    pub columns: Vec<String>,
    pub units: Vec<String>,
    pub lines: Vec<LineRecord>,
}

/// Everything the page hands over when the editor starts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableLoad {
    pub taskid: i64,
    #[serde(default = "unset")]
    pub naxis3: i64,
    pub linetable: LineTable,
}

fn unset() -> i64 {
    -1
}

impl TableLoad {
    pub fn from_json(text: &str) -> Result<Self, EditorError> {
        serde_json::from_str(text).map_err(|e| EditorError::InvalidTable(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderColumn {
    pub name: String,
    pub unit: String,
    pub hidden: bool,
}

/// Snapshot of the row collection. Equality is row identity, so a reload with
/// identical data still counts as a change.
#[derive(Clone, Default)]
pub struct RowList(Rc<Vec<Rc<LineRow>>>);

impl RowList {
    fn new(rows: Vec<Rc<LineRow>>) -> Self {
        RowList(Rc::new(rows))
    }
}

impl Deref for RowList {
    type Target = [Rc<LineRow>];

    fn deref(&self) -> &[Rc<LineRow>] {
        &self.0
    }
}

impl PartialEq for RowList {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(other.0.iter()).all(|(a, b)| Rc::ptr_eq(a, b))
    }
}

impl fmt::Debug for RowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Problems found by [`TableViewModel::validate`]. Ordinals identify the rows.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    /// Two forced lines claim overlapping channel ranges.
    OverlappingChannels { first: u64, second: u64 },
    /// Two kept rows share uid and channel range.
    DuplicateEntry { first: u64, second: u64 },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::OverlappingChannels { first, second } => write!(
                f,
                "Forced rows {} and {} have overlapping channel ranges",
                first, second
            ),
            ValidationIssue::DuplicateEntry { first, second } => {
                write!(f, "Rows {} and {} are duplicate entries", first, second)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Findings are advisory; submission is never blocked.
    pub fn permits_submission(&self) -> bool {
        true
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

pub struct TableViewModel {
    store: Rc<dyn KeyValueStore>,
    taskid: Cell<i64>,
    naxis3: Cell<i64>,
    rowcounter: Cell<u64>,
    origdata: RefCell<Option<LineTable>>,
    showing_hidden: Cell<bool>,
    pub rows: Observable<RowList>,
    pub header: Observable<Vec<HeaderColumn>>,
    pub visible: Observable<Vec<bool>>,
    pub origvisible: Observable<Vec<bool>>,
}

impl TableViewModel {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            taskid: Cell::new(-1),
            naxis3: Cell::new(-1),
            rowcounter: Cell::new(0),
            origdata: RefCell::new(None),
            showing_hidden: Cell::new(false),
            rows: Observable::new(RowList::default()),
            header: Observable::new(Vec::new()),
            visible: Observable::new(Vec::new()),
            origvisible: Observable::new(Vec::new()),
        }
    }

    pub fn initialize(&self, load: TableLoad) {
        info!(
            "Loading line table for task {} ({} lines, naxis3 = {})",
            load.taskid,
            load.linetable.lines.len(),
            load.naxis3
        );
        self.taskid.set(load.taskid);
        self.naxis3.set(load.naxis3);
        let table = load.linetable;
        self.set_header(&table.columns, &table.units);
        self.update(&table);
        *self.origdata.borrow_mut() = Some(table);
    }

    /// Rebuild the header: the three disposition columns, then one entry per
    /// column. Non-editable columns start hidden.
    pub fn set_header(&self, columns: &[String], units: &[String]) {
        let mut header: Vec<HeaderColumn> = DISPOSITION_COLUMNS
            .iter()
            .map(|name| HeaderColumn {
                name: name.to_string(),
                unit: String::new(),
                hidden: false,
            })
            .collect();
        let mut visible = vec![true; DISPOSITION_COLUMNS.len()];

        for (i, column) in columns.iter().enumerate() {
            let hidden = HIDDEN_COLUMNS.contains(&column.as_str());
            let unit = units.get(i).map(String::as_str).unwrap_or("");
            header.push(HeaderColumn {
                name: column.clone(),
                unit: format!("[{}]", unit),
                hidden,
            });
            visible.push(!hidden);
        }

        self.header.set(header);
        self.origvisible.set(visible.clone());
        self.visible.set(visible);
    }

    /// Remove the accept/force/reject columns for the read-only summary table.
    pub fn strip_disposition_columns(&self) {
        let synthetic = self.header.with(|h| {
            h.iter()
                .take(DISPOSITION_COLUMNS.len())
                .zip(DISPOSITION_COLUMNS.iter())
                .filter(|(col, name)| col.name == **name && col.unit.is_empty())
                .count()
        });
        if synthetic == 0 {
            return;
        }
        let drop_front = |v: Vec<bool>| v.into_iter().skip(synthetic).collect::<Vec<_>>();
        self.header.set(self.header.get().into_iter().skip(synthetic).collect());
        self.visible.set(drop_front(self.visible.get()));
        self.origvisible.set(drop_front(self.origvisible.get()));
    }

    /// Replace every row with fresh rows built from `table`.
    ///
    /// Ordinals keep counting from the previous load so radio group names are
    /// never reused within a session.
    pub fn update(&self, table: &LineTable) {
        let rows: Vec<Rc<LineRow>> = table
            .lines
            .iter()
            .map(|line| Rc::new(LineRow::new(line, self.next_ordinal(), Rc::clone(&self.store))))
            .collect();
        debug!("Rebuilt table with {} rows", rows.len());
        self.rows.set(RowList::new(rows));
    }

    /// Drop every session edit and reload the table as first received.
    pub fn reset(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Could not clear session storage: {}", e);
        }
        let original = self.origdata.borrow().clone().unwrap_or_default();
        info!("Resetting line table to {} original lines", original.lines.len());
        self.update(&original);
    }

    /// Append one blank row, marked rejected until the user fills it in.
    pub fn add(&self) -> Rc<LineRow> {
        let row = Rc::new(LineRow::new(
            &LineRecord::blank(),
            self.next_ordinal(),
            Rc::clone(&self.store),
        ));
        row.set_disposition(Disposition::Reject);

        let mut rows: Vec<Rc<LineRow>> = self.rows.with(|list| list.to_vec());
        rows.push(Rc::clone(&row));
        self.rows.set(RowList::new(rows));
        row
    }

    /// Send the table to the service.
    ///
    /// The row snapshots carry raw values. For [`SubmitCommand::LineListBdp`]
    /// the control is disabled before sending; it is re-enabled once the
    /// request completes, whatever the outcome. Nothing is retried.
    pub async fn submit(
        &self,
        command: SubmitCommand,
        form: &dyn FormSource,
        endpoint: &dyn SubmitEndpoint,
        control: Option<&dyn ControlToggle>,
    ) -> Result<String, EditorError> {
        let snapshots: Vec<_> = self.rows.with(|rows| rows.iter().map(|r| r.snapshot()).collect());
        let payload = build_payload(command, self.taskid(), form.fields()?, &snapshots)?;
        let body = serde_json::to_string(&payload)?;
        debug!("Submitting {} for task {}: {}", command.as_str(), self.taskid(), body);

        if command.locks_control() {
            if let Some(control) = control {
                control.set_enabled(false);
            }
        }

        let result = endpoint.send(body).await;

        if let Some(control) = control {
            control.set_enabled(true);
        }
        match &result {
            Ok(_) => info!("{} submitted for task {}", command.as_str(), self.taskid()),
            Err(e) => warn!("{} for task {} failed: {}", command.as_str(), self.taskid(), e),
        }
        result
    }

    /// Check forced rows for overlapping channel ranges and kept rows for
    /// duplicates. The report never blocks submission.
    pub fn validate(&self) -> ValidationReport {
        let rows = self.rows.get();
        let mut issues = Vec::new();

        for (i, a) in rows.iter().enumerate() {
            for b in rows.iter().skip(i + 1) {
                if a.is_rejected() || b.is_rejected() {
                    continue;
                }
                let (a_lo, a_hi) = a.channel_range();
                let (b_lo, b_hi) = b.channel_range();
                let uid = a.uid.get();
                if !uid.trim().is_empty() && uid == b.uid.get() && a_lo == b_lo && a_hi == b_hi {
                    issues.push(ValidationIssue::DuplicateEntry {
                        first: a.ordinal,
                        second: b.ordinal,
                    });
                } else if a.is_forced() && b.is_forced() && a_lo <= b_hi && b_lo <= a_hi {
                    issues.push(ValidationIssue::OverlappingChannels {
                        first: a.ordinal,
                        second: b.ordinal,
                    });
                }
            }
        }

        for issue in &issues {
            warn!("{}", issue);
        }
        ValidationReport { issues }
    }

    /// Show every column, or go back to the default visibility.
    pub fn toggle_hidden(&self) -> bool {
        let showing = !self.showing_hidden.get();
        self.showing_hidden.set(showing);
        if showing {
            let len = self.visible.with(Vec::len);
            self.visible.set(vec![true; len]);
        } else {
            self.restore_visibility();
        }
        showing
    }

    /// Flip one column's visibility; false if `index` is out of range.
    pub fn toggle_column(&self, index: usize) -> bool {
        let mut visible = self.visible.get();
        match visible.get_mut(index) {
            Some(flag) => {
                *flag = !*flag;
                self.visible.set(visible);
                true
            }
            None => false,
        }
    }

    pub fn restore_visibility(&self) {
        self.visible.set(self.origvisible.get());
    }

    pub fn taskid(&self) -> i64 {
        self.taskid.get()
    }

    pub fn naxis3(&self) -> i64 {
        self.naxis3.get()
    }

    pub fn row_count(&self) -> usize {
        self.rows.with(|rows| rows.len())
    }

    fn next_ordinal(&self) -> u64 {
        let next = self.rowcounter.get() + 1;
        self.rowcounter.set(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStore;
    use crate::scalar::Scalar;
    use futures::executor::block_on;
    use futures::future::{self, LocalBoxFuture};
    use serde_json::{json, Map, Value};

    fn model() -> (MemoryStore, TableViewModel) {
        let mem = MemoryStore::new();
        let vm = TableViewModel::new(Rc::new(mem.clone()));
        (mem, vm)
    }

    fn load(lines: Value) -> TableLoad {
        serde_json::from_value(json!({
            "taskid": 3,
            "naxis3": 512,
            "linetable": {
                "columns": ["frequency", "uid", "velocity", "El", "startchan", "endchan", "force"],
                "units": ["GHz", "", "km/s", "K", "", "", ""],
                "lines": lines
            }
        }))
        .unwrap()
    }

    struct Recorder {
        bodies: RefCell<Vec<String>>,
        fail: bool,
        // Control log to sample when a request goes out.
        control: Option<Rc<RefCell<Vec<bool>>>>,
        enabled_at_send: RefCell<Vec<Option<bool>>>,
    }

    impl Recorder {
        fn new(fail: bool) -> Self {
            Self {
                bodies: RefCell::new(Vec::new()),
                fail,
                control: None,
                enabled_at_send: RefCell::new(Vec::new()),
            }
        }

        fn watching(fail: bool, button: &Button) -> Self {
            Self {
                control: Some(Rc::clone(&button.states)),
                ..Self::new(fail)
            }
        }
    }

    impl SubmitEndpoint for Recorder {
        fn send(&self, body: String) -> LocalBoxFuture<'_, Result<String, EditorError>> {
            self.bodies.borrow_mut().push(body);
            if let Some(states) = &self.control {
                let last = states.borrow().last().copied();
                self.enabled_at_send.borrow_mut().push(last);
            }
            let result = if self.fail {
                Err(EditorError::Transport("connection refused".into()))
            } else {
                Ok("ok".to_string())
            };
            Box::pin(future::ready(result))
        }
    }

    #[derive(Default)]
    struct Button {
        states: Rc<RefCell<Vec<bool>>>,
    }

    impl ControlToggle for Button {
        fn set_enabled(&self, enabled: bool) {
            self.states.borrow_mut().push(enabled);
        }
    }

    #[test]
    fn initialize_loads_header_rows_and_task() {
        let (_mem, vm) = model();
        vm.initialize(load(json!([
            {"uid": "L1", "force": "True", "startchan": 5, "endchan": 10, "velocity": 12.34567},
            {"uid": "L2", "force": "False"}
        ])));
        assert_eq!(vm.taskid(), 3);
        assert_eq!(vm.naxis3(), 512);
        assert_eq!(vm.row_count(), 2);

        let rows = vm.rows.get();
        assert_eq!(rows[0].disposition(), Disposition::Force);
        assert_eq!(rows[0].velocity.read(), "12.3457");
        assert_eq!(rows[0].velocity.read_raw(), Scalar::Number(12.34567));
        assert_eq!(rows[1].disposition(), Disposition::Accept);

        let header = vm.header.get();
        assert_eq!(header.len(), 3 + 7);
        assert_eq!(header[3].unit, "[GHz]");
        assert!(header[6].hidden);
        assert!(header[9].hidden);
    }

    #[test]
    fn set_header_marks_denylisted_columns() {
        let (_mem, vm) = model();
        vm.set_header(&["El".to_string()], &["K".to_string()]);
        let header = vm.header.get();
        assert_eq!(header.len(), 4);
        assert_eq!(header[0].name, "accept");
        assert!(header[3].hidden);
        assert_eq!(vm.visible.get(), vec![true, true, true, false]);
        assert_eq!(vm.origvisible.get(), vm.visible.get());
    }

    #[test]
    fn set_header_rebuilds_rather_than_appends() {
        let (_mem, vm) = model();
        vm.set_header(&["uid".to_string()], &["".to_string()]);
        vm.set_header(&["uid".to_string(), "fwhm".to_string()], &["".to_string()]);
        assert_eq!(vm.header.with(Vec::len), 5);
        assert_eq!(vm.header.get()[4].unit, "[]");
        assert_eq!(vm.visible.get(), vec![true, true, true, true, false]);
    }

    #[test]
    fn strip_disposition_columns_keeps_lockstep() {
        let (_mem, vm) = model();
        vm.set_header(&["uid".to_string(), "El".to_string()], &[]);
        vm.strip_disposition_columns();
        assert_eq!(vm.header.with(|h| h[0].name.clone()), "uid");
        assert_eq!(vm.visible.get(), vec![true, false]);
        vm.strip_disposition_columns();
        assert_eq!(vm.header.with(Vec::len), 2);
    }

    #[test]
    fn update_rebuilds_rows_and_keeps_counting() {
        let (_mem, vm) = model();
        let table = load(json!([{"uid": "A"}, {"uid": "B"}])).linetable;
        vm.update(&table);
        let first = vm.rows.get();
        vm.update(&table);
        let second = vm.rows.get();

        assert_ne!(first, second);
        assert!(!Rc::ptr_eq(&first[0], &second[0]));
        assert_eq!(first.iter().map(|r| r.ordinal).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(second.iter().map(|r| r.ordinal).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(second[0].group_token(), "buttonGroup3");
        assert_ne!(first[0].storage_token(), second[0].storage_token());
    }

    #[test]
    fn add_after_empty_update_gives_one_rejected_row() {
        let (_mem, vm) = model();
        vm.update(&LineTable::default());
        let row = vm.add();
        assert_eq!(vm.row_count(), 1);
        assert!(row.is_rejected());
        assert_eq!(vm.rows.get()[0].disposition(), Disposition::Reject);
    }

    #[test]
    fn add_keeps_existing_rows_and_ignores_force_hint() {
        let (_mem, vm) = model();
        vm.initialize(load(json!([{"uid": "L1", "force": "True"}])));
        let before = vm.rows.get();
        let added = vm.add();
        let after = vm.rows.get();
        assert_eq!(after.len(), 2);
        assert!(Rc::ptr_eq(&before[0], &after[0]));
        assert!(Rc::ptr_eq(&added, &after[1]));
        assert_eq!(added.ordinal, 2);
        assert!(added.is_rejected());
    }

    #[test]
    fn reset_restores_original_values_and_drops_edited_keys() {
        let (mem, vm) = model();
        vm.initialize(load(json!([
            {"uid": "L1", "velocity": 1.5, "startchan": 5, "endchan": 10}
        ])));
        let edited = vm.rows.get()[0].clone();
        edited.edit_cell("velocity", "9.99");
        edited.edit_cell("startchan", "42");
        edited.set_disposition(Disposition::Reject);
        vm.add();
        let stale_token = edited.storage_token().to_string();
        mem.set("unrelated", "1").unwrap();

        vm.reset();

        let rows = vm.rows.get();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].velocity.read_raw(), Scalar::Number(1.5));
        assert_eq!(rows[0].startchan.get(), 5.0);
        assert!(rows[0].is_accepted());
        assert!(mem.keys().iter().all(|k| !k.ends_with(&stale_token)));
        assert!(!mem.contains_key("unrelated"));
    }

    #[test]
    fn submit_sends_raw_values_and_form_fields() {
        let (_mem, vm) = model();
        vm.initialize(load(json!([{"uid": "L1", "velocity": 12.34567, "force": "True"}])));
        let endpoint = Recorder::new(false);
        let mut form = Map::new();
        form.insert("projectdir".into(), json!("/tmp/p"));

        let result = block_on(vm.submit(SubmitCommand::ForceReject, &form, &endpoint, None));
        assert!(result.is_ok());

        let sent: Value = serde_json::from_str(&endpoint.bodies.borrow()[0]).unwrap();
        assert_eq!(sent["command"], "forcereject");
        assert_eq!(sent["taskid"], 3);
        assert_eq!(sent["projectdir"], "/tmp/p");
        assert_eq!(sent["rows"][0]["velocity"], 12.34567);
        assert_eq!(sent["rows"][0]["velocity_raw"], 12.34567);
        assert_eq!(sent["rows"][0]["disposition"], "force");
    }

    #[test]
    fn linelist_submit_locks_control_until_completion_even_on_failure() {
        let (_mem, vm) = model();
        vm.initialize(load(json!([{"uid": "L1"}])));
        let button = Button::default();
        let endpoint = Recorder::watching(true, &button);

        let result = block_on(vm.submit(
            SubmitCommand::LineListBdp,
            &Map::new(),
            &endpoint,
            Some(&button),
        ));
        assert!(matches!(result, Err(EditorError::Transport(_))));
        assert_eq!(*endpoint.enabled_at_send.borrow(), vec![Some(false)]);
        assert_eq!(*button.states.borrow(), vec![false, true]);
        assert_eq!(endpoint.bodies.borrow().len(), 1);
    }

    #[test]
    fn force_reject_submit_does_not_lock_control() {
        let (_mem, vm) = model();
        let button = Button::default();
        let endpoint = Recorder::watching(false, &button);
        block_on(vm.submit(SubmitCommand::ForceReject, &Map::new(), &endpoint, Some(&button)))
            .unwrap();
        assert_eq!(*endpoint.enabled_at_send.borrow(), vec![None]);
        assert_eq!(*button.states.borrow(), vec![true]);
    }

    #[test]
    fn validate_reports_overlaps_and_duplicates_but_permits() {
        let (_mem, vm) = model();
        vm.initialize(load(json!([
            {"uid": "A", "force": "True", "startchan": 10, "endchan": 20},
            {"uid": "B", "force": "True", "startchan": 18, "endchan": 30},
            {"uid": "C", "force": "True", "startchan": 40, "endchan": 35},
            {"uid": "D", "startchan": 50, "endchan": 60},
            {"uid": "D", "startchan": 60, "endchan": 50}
        ])));
        let report = vm.validate();
        assert!(report.permits_submission());
        assert_eq!(
            report.issues,
            vec![
                ValidationIssue::OverlappingChannels { first: 1, second: 2 },
                ValidationIssue::DuplicateEntry { first: 4, second: 5 },
            ]
        );

        vm.rows.get()[1].set_disposition(Disposition::Reject);
        vm.rows.get()[4].set_disposition(Disposition::Reject);
        assert!(vm.validate().is_clean());
    }

    #[test]
    fn visibility_toggles() {
        let (_mem, vm) = model();
        vm.set_header(&["uid".to_string(), "fwhm".to_string()], &[]);
        assert!(vm.toggle_hidden());
        assert_eq!(vm.visible.get(), vec![true; 5]);
        assert!(!vm.toggle_hidden());
        assert_eq!(vm.visible.get(), vm.origvisible.get());
        assert!(vm.toggle_column(3));
        assert!(!vm.visible.get()[3]);
        assert!(!vm.toggle_column(99));
        vm.restore_visibility();
        assert!(vm.visible.get()[3]);
    }

    #[test]
    fn bad_payload_is_reported() {
        assert!(matches!(
            TableLoad::from_json("{\"taskid\": 1}"),
            Err(EditorError::InvalidTable(_))
        ));
    }
}
