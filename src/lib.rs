//! Reactive data layer for the line-identification table editor.
//!
//! The editor shows candidate spectral-line identifications from the
//! pipeline, lets the user accept, force or reject each line and adjust a few
//! numeric fields, and posts the edited table back to the processing service.
//!
//! Layering, bottom-up:
//! - [`reactive`]: observable cells with subscribe/notify
//! - [`precision`]: numeric fields with a display precision
//! - [`persist`]: session-storage mirroring of fields
//! - [`row`]: one editable line
//! - [`table`]: the view-model owning rows and header metadata
//! - [`submit`] / [`browser`]: the collaborators around the view-model

pub mod browser;
pub mod config;
pub mod error;
pub mod persist;
pub mod precision;
pub mod reactive;
pub mod row;
pub mod scalar;
pub mod submit;
pub mod table;
pub mod utils;

pub use error::EditorError;
pub use persist::{KeyValueStore, MemoryStore, PersistentField};
pub use precision::{FormattedValue, RoundedField};
pub use reactive::{Notify, Observable, Subscription};
pub use row::{Disposition, LineRecord, LineRow, RowSnapshot};
pub use scalar::Scalar;
pub use submit::SubmitCommand;
pub use table::{HeaderColumn, LineTable, TableLoad, TableViewModel, ValidationReport};
