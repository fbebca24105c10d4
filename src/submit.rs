//! Submission of the edited table to the processing service.
//!
//! The view-model only assembles the payload; everything that touches the
//! page or the network sits behind the traits below so it can be replaced in
//! tests and in non-browser hosts.

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{FORCE_REJECT_COMMAND, LINELIST_BDP_COMMAND};
use crate::error::EditorError;
use crate::row::RowSnapshot;

/// Which action the service should take with the submitted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitCommand {
    /// Append forced/rejected lines to the line-identification task's keywords.
    #[serde(rename = "forcereject")]
    ForceReject,
    /// Overwrite the line list product with the kept rows.
    #[serde(rename = "linelistbdp")]
    LineListBdp,
}

impl SubmitCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitCommand::ForceReject => FORCE_REJECT_COMMAND,
            SubmitCommand::LineListBdp => LINELIST_BDP_COMMAND,
        }
    }

    /// Whether the triggering control is disabled while the request is in flight.
    pub fn locks_control(&self) -> bool {
        matches!(self, SubmitCommand::LineListBdp)
    }
}

/// Ambient form fields submitted alongside the rows.
pub trait FormSource {
    fn fields(&self) -> Result<Map<String, Value>, EditorError>;
}

/// Plain map of fields, for hosts without a DOM form.
impl FormSource for Map<String, Value> {
    fn fields(&self) -> Result<Map<String, Value>, EditorError> {
        Ok(self.clone())
    }
}

/// Delivers a JSON body and resolves with the response text.
pub trait SubmitEndpoint {
    fn send(&self, body: String) -> LocalBoxFuture<'_, Result<String, EditorError>>;
}

/// A UI control that can be switched off while a submission runs.
pub trait ControlToggle {
    fn set_enabled(&self, enabled: bool);
}

/// Merge `form` with the command, task id and row snapshots. The fixed keys
/// win over form fields of the same name.
pub fn build_payload(
    command: SubmitCommand,
    taskid: i64,
    form: Map<String, Value>,
    rows: &[RowSnapshot],
) -> Result<Map<String, Value>, EditorError> {
    let mut payload = form;
    payload.insert("command".to_string(), Value::from(command.as_str()));
    payload.insert("taskid".to_string(), Value::from(taskid));
    payload.insert("rows".to_string(), serde_json::to_value(rows)?);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fixed_keys_override_form_fields() {
        let form = json!({"command": "stale", "projectdir": "/data/p1"});
        let form = form.as_object().cloned().unwrap();
        let payload = build_payload(SubmitCommand::ForceReject, 7, form, &[]).unwrap();
        assert_eq!(payload["command"], "forcereject");
        assert_eq!(payload["taskid"], 7);
        assert_eq!(payload["projectdir"], "/data/p1");
        assert_eq!(payload["rows"], json!([]));
    }

    #[test]
    fn only_linelist_locks_the_control() {
        assert!(SubmitCommand::LineListBdp.locks_control());
        assert!(!SubmitCommand::ForceReject.locks_control());
        assert_eq!(
            serde_json::to_value(SubmitCommand::LineListBdp).unwrap(),
            "linelistbdp"
        );
    }
}
